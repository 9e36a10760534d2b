use quickplan::algorithm::{all_dependents, assign_importance, is_dependent, DependencyGraph};
use quickplan::models::{Catalog, Course};
use quickplan::PlannerError;

/// MATH111 -> MATH112 -> {COSC211, MATH220}; COSC211 -> COSC320; COSC102 -> COSC211.
fn catalog() -> Catalog {
    Catalog::new(vec![
        Course::new("MATH111", "Calculus I", 4),
        Course::new("MATH112", "Calculus II", 4).with_prerequisites(["MATH111"]),
        Course::new("COSC102", "Programming", 3),
        Course::new("COSC211", "Data Structures", 3).with_prerequisites(["MATH112", "COSC102"]),
        Course::new("MATH220", "Discrete Math", 3).with_prerequisites(["MATH112"]),
        Course::new("COSC320", "Algorithms", 3).with_prerequisites(["COSC211"]),
        Course::new("HUMA101", "Humanities", 3),
    ])
    .unwrap()
}

#[test]
fn test_importance_counts_transitive_dependents() {
    let c = catalog();
    let scores = assign_importance(&c);
    for code in c.codes() {
        let dependents = c.codes().filter(|d| is_dependent(d, code, &c)).count() as u32;
        assert_eq!(scores.get(code), dependents + 1, "{code}");
    }
    assert_eq!(scores.get("MATH111"), 5);
    assert_eq!(scores.get("COSC102"), 3);
    assert_eq!(scores.get("HUMA101"), 1);
}

#[test]
fn test_more_dependents_means_higher_importance() {
    let c = catalog();
    let scores = assign_importance(&c);
    for a in c.codes() {
        for b in c.codes() {
            if all_dependents(a, &c).len() > all_dependents(b, &c).len() {
                assert!(scores.get(a) > scores.get(b), "{a} vs {b}");
            }
        }
    }
}

#[test]
fn test_is_dependent_properties() {
    let c = catalog();
    for code in c.codes() {
        assert!(!is_dependent(code, code, &c));
    }
    // transitividad
    assert!(is_dependent("COSC211", "MATH112", &c));
    assert!(is_dependent("MATH112", "MATH111", &c));
    assert!(is_dependent("COSC211", "MATH111", &c));
    assert!(is_dependent("COSC320", "MATH111", &c));
    assert!(!is_dependent("MATH220", "COSC102", &c));

    let graph = DependencyGraph::from_catalog(&c);
    assert_eq!(graph.all_dependents("COSC102"), all_dependents("COSC102", &c));
}

#[test]
fn test_cycle_rejected_at_load() {
    let err = Catalog::new(vec![
        Course::new("A", "A", 3).with_prerequisites(["C"]),
        Course::new("B", "B", 3).with_prerequisites(["A"]),
        Course::new("C", "C", 3).with_prerequisites(["B"]),
    ])
    .unwrap_err();
    match err {
        PlannerError::PrerequisiteCycle { cycle } => {
            assert_eq!(cycle.first(), cycle.last());
            assert!(cycle.contains(&"B".to_string()));
        }
        other => panic!("unexpected {other:?}"),
    }

    let self_loop = Catalog::new(vec![Course::new("A", "A", 3).with_prerequisites(["A"])]);
    assert!(matches!(self_loop, Err(PlannerError::PrerequisiteCycle { .. })));
}

#[test]
fn test_dangling_prerequisite_is_tolerated() {
    let c = Catalog::new(vec![Course::new("B", "B", 3).with_prerequisites(["OLD100"])]).unwrap();
    assert_eq!(assign_importance(&c).get("B"), 1);
    assert!(is_dependent("B", "OLD100", &c));
}
