use std::time::{Duration, Instant};

use quickplan::algorithm::{assign_importance, CreditBounds, FullPlanModel, FullPlanOptions, PlanWeights};
use quickplan::models::{academic_year, is_summer, Catalog, Course, FixedOverride, PlanAssignment, StudentProgress, Term};
use quickplan::solver::GoodLpBackend;
use quickplan::{OutcomeStatus, PlannerError};

fn options(total: u32, min: u32, max: u32) -> FullPlanOptions {
    FullPlanOptions {
        total_semesters: total,
        credits: CreditBounds::new(min, max).unwrap(),
        ..FullPlanOptions::default()
    }
}

fn solve(catalog: &Catalog, completed: &[&str], opts: FullPlanOptions, fixed: Vec<FixedOverride>) -> quickplan::Result<PlanAssignment> {
    let progress = StudentProgress::for_catalog(catalog, completed.iter().copied());
    let importance = assign_importance(catalog);
    FullPlanModel::new(catalog, &progress, &importance, opts)
        .with_fixed(fixed)
        .solve(&GoodLpBackend::new())
}

fn credits_in(plan: &PlanAssignment, s: u32) -> u32 {
    plan.semester(s).map_or(0, |p| p.total_credits)
}

fn a_then_b() -> Catalog {
    Catalog::new(vec![
        Course::new("A", "Intro", 3),
        Course::new("B", "Follow-up", 3).with_prerequisites(["A"]),
    ])
    .unwrap()
}

#[test]
fn test_prerequisite_strictly_before() {
    let plan = solve(&a_then_b(), &[], options(4, 0, 18), vec![]).unwrap();
    let a = plan.semester_of("A").unwrap();
    let b = plan.semester_of("B").unwrap();
    assert!(b > a, "A in {a}, B in {b}");
    assert_eq!(plan.stats.total_courses, 2);
    assert_eq!(plan.stats.total_credits, 6);
}

#[test]
fn test_every_course_once_and_credit_bounds() {
    let courses: Vec<Course> = (1..=8).map(|i| Course::new(format!("C{i}"), format!("Course {i}"), 3)).collect();
    let catalog = Catalog::new(courses).unwrap();
    let plan = solve(&catalog, &[], options(5, 6, 9), vec![]).unwrap();

    for code in catalog.codes() {
        let hits = plan.semesters.iter().filter(|s| s.courses.iter().any(|c| c.code == code)).count();
        assert_eq!(hits, 1, "{code}");
    }
    for s in 1..=5 {
        let credits = credits_in(&plan, s);
        if is_summer(s) {
            assert!(credits <= 6, "summer {s}: {credits}");
        } else {
            assert!((6..=9).contains(&credits), "semester {s}: {credits}");
        }
    }
    assert_eq!(plan.stats.total_credits, 24);
}

#[test]
fn test_availability_by_term() {
    let catalog = Catalog::new(vec![
        Course::new("SPR1", "Spring only", 3).available_in([Term::Spring]),
        Course::new("ANY1", "Always", 3),
    ])
    .unwrap();
    let plan = solve(&catalog, &[], options(6, 0, 18), vec![]).unwrap();
    let s = plan.semester_of("SPR1").unwrap();
    assert_eq!(Term::of_semester(s), Term::Spring);
    assert_eq!(plan.semester(s).unwrap().term, Term::Spring);
}

#[test]
fn test_restricted_course_needs_credits_from_earlier_semesters() {
    let catalog = Catalog::new(vec![
        Course::new("P1", "P1", 3),
        Course::new("P2", "P2", 3),
        Course::new("P3", "P3", 3),
        Course::new("P4", "P4", 3),
        Course::new("CAP", "Capstone", 3).with_min_credits(12),
    ])
    .unwrap();
    // P4 ya aprobado: 3 créditos de partida
    let plan = solve(&catalog, &["P4"], options(4, 0, 18), vec![]).unwrap();
    let cap = plan.semester_of("CAP").unwrap();
    let before: u32 = plan.semesters.iter().filter(|s| s.number < cap).map(|s| s.total_credits).sum();
    assert!(before + 3 >= 12, "capstone in {cap} with {before} credits before");
    assert!(plan.semester_of("P4").is_none());
}

#[test]
fn test_internship_takes_whole_semester() {
    let catalog = Catalog::new(vec![
        Course::new("ENGR399", "Internship", 3),
        Course::new("COOP300", "Co-op", 3).as_internship(),
        Course::new("X1", "X1", 3),
        Course::new("X2", "X2", 3),
        Course::new("X3", "X3", 3),
    ])
    .unwrap();
    let plan = solve(&catalog, &[], options(5, 0, 18), vec![]).unwrap();
    for code in ["ENGR399", "COOP300"] {
        let s = plan.semester_of(code).unwrap();
        let courses = &plan.semester(s).unwrap().courses;
        assert_eq!(courses.len(), 1, "{code} shares semester {s}");
    }
}

#[test]
fn test_fixed_override_is_honoured() {
    let plan = solve(&a_then_b(), &[], options(4, 0, 18), vec![FixedOverride::new("B", 4)]).unwrap();
    assert_eq!(plan.semester_of("B"), Some(4));

    // overrides de cursos ya aprobados o fuera del horizonte se ignoran
    let plan = solve(
        &a_then_b(),
        &["A"],
        options(4, 0, 18),
        vec![FixedOverride::new("A", 2), FixedOverride::new("B", 9)],
    )
    .unwrap();
    assert!(plan.semester_of("B").is_some());

    let err = solve(&a_then_b(), &[], options(4, 0, 18), vec![FixedOverride::new("ZZZ9", 2)]).unwrap_err();
    assert!(err.is_input_error());
}

#[test]
fn test_infeasible_is_reported_distinctly() {
    // dos semestres regulares con mínimo 12 y sólo 6 créditos pendientes
    let err = solve(&a_then_b(), &[], options(2, 12, 18), vec![]).unwrap_err();
    assert!(matches!(err, PlannerError::Infeasible { .. }));
    assert_eq!(err.status(), OutcomeStatus::Infeasible);
}

#[test]
fn test_starting_semester_and_stats() {
    let mut opts = options(6, 0, 18);
    opts.starting_semester = 4;
    let plan = solve(&a_then_b(), &[], opts, vec![]).unwrap();
    assert!(plan.semesters.iter().all(|s| s.number >= 4));
    assert_eq!(plan.stats.first_semester_courses, plan.semesters[0].courses);
    let expected = (6.0 / plan.stats.total_semesters as f64 * 100.0).round() / 100.0;
    assert_eq!(plan.stats.avg_credits_per_semester, expected);
    assert!(plan.objective.workload_variance >= 0.0);

    let a = plan.semesters.iter().flat_map(|s| &s.courses).find(|c| c.code == "A").unwrap();
    assert_eq!(a.unlocks, vec!["B".to_string()]);
}

#[test]
fn test_past_horizon_and_nothing_left() {
    let mut opts = options(4, 0, 18);
    opts.starting_semester = 6;
    let err = solve(&a_then_b(), &[], opts.clone(), vec![]).unwrap_err();
    assert!(err.is_input_error());

    let plan = solve(&a_then_b(), &["A", "B"], opts, vec![]).unwrap();
    assert!(plan.semesters.is_empty());
    assert_eq!(plan.stats.total_courses, 0);
}

fn weighted(total: u32, max: u32, alpha: f64, beta: f64, gamma: f64, delta: f64) -> FullPlanOptions {
    FullPlanOptions { weights: PlanWeights { alpha, beta, gamma, delta }, ..options(total, 0, max) }
}

fn independent(n: usize) -> Catalog {
    Catalog::new((1..=n).map(|i| Course::new(format!("C{i}"), format!("Course {i}"), 3))).unwrap()
}

#[test]
fn test_importance_term_pulls_unlocking_course_first() {
    let catalog = Catalog::new(vec![
        Course::new("HUB", "Unlocks two", 3),
        Course::new("D1", "D1", 3).with_prerequisites(["HUB"]),
        Course::new("D2", "D2", 3).with_prerequisites(["HUB"]),
        Course::new("LEAF", "Unlocks nothing", 3),
    ])
    .unwrap();
    // un curso por semestre: el orden lo decide α·importancia·s
    let plan = solve(&catalog, &[], weighted(5, 3, 1.0, 0.0, 0.0, 0.0), vec![]).unwrap();
    assert_eq!(plan.semester_of("HUB"), Some(1));
    assert!(plan.semester_of("HUB") < plan.semester_of("LEAF"));
}

#[test]
fn test_year_term_places_course_in_its_catalog_year() {
    let catalog = Catalog::new(vec![
        Course::new("Y2", "Second year", 3).with_year(2),
        Course::new("FREE", "Any year", 3),
    ])
    .unwrap();
    let plan = solve(&catalog, &[], weighted(6, 18, 0.0, 0.0, 1.0, 0.0), vec![]).unwrap();
    let s = plan.semester_of("Y2").unwrap();
    assert_eq!(academic_year(s), 2, "Y2 in semester {s}");
    assert_eq!(plan.objective.year_penalty, 0.0);
}

#[test]
fn test_no_minimum_credits_after_nominal_horizon() {
    let catalog = independent(1);
    let mut opts = options(15, 12, 18);
    opts.starting_semester = 13;
    let plan = solve(&catalog, &[], opts.clone(), vec![]).unwrap();
    let s = plan.semester_of("C1").unwrap();
    assert!(s > 12);
    assert_eq!(credits_in(&plan, s), 3);

    // con el horizonte nominal en 15 los semestres 13 y 14 exigen el mínimo
    opts.nominal_semesters = 15;
    let err = solve(&catalog, &[], opts, vec![]).unwrap_err();
    assert!(matches!(err, PlannerError::Infeasible { .. }));
}

#[test]
fn test_overrun_term_keeps_courses_inside_nominal_horizon() {
    let mut opts = weighted(15, 3, 0.0, 0.0, 0.0, 1.0);
    opts.starting_semester = 10;

    // 10 y 11 admiten un curso, el verano 12 admite dos
    let plan = solve(&independent(4), &[], opts.clone(), vec![]).unwrap();
    assert!(plan.semesters.iter().all(|s| s.number <= 12));
    assert_eq!(plan.objective.overrun_penalty, 0.0);

    // el quinto curso tiene que salir del horizonte, y lo hace lo antes posible
    let plan = solve(&independent(5), &[], opts, vec![]).unwrap();
    let late: Vec<_> = plan.semesters.iter().filter(|s| s.number > 12).collect();
    assert_eq!(late.len(), 1);
    assert_eq!(late[0].number, 13);
    assert_eq!(late[0].courses.len(), 1);
    assert_eq!(plan.objective.overrun_penalty, 13.0);
}

#[test]
fn test_workload_term_minimises_variance() {
    let catalog = Catalog::new(vec![
        Course::new("W3", "Heavy", 1).with_weight(3.0),
        Course::new("W2", "Medium", 1).with_weight(2.0),
        Course::new("W1", "Light", 1).with_weight(1.0),
    ])
    .unwrap();
    let mut opts = weighted(4, 18, 0.0, 1.0, 0.0, 0.0);
    opts.summer_cap = 0;
    let plan = solve(&catalog, &[], opts, vec![]).unwrap();

    // semestres regulares 1, 2 y 4 con cargas {3, 2, 1}: varianza 2; (3, 3, 0) daría 6
    for s in [1, 2, 4] {
        assert_eq!(plan.semester(s).map(|p| p.courses.len()), Some(1), "semester {s}");
    }
    assert_eq!(plan.objective.workload_variance, 2.0);
    assert_eq!(plan.objective.mean_workload, 2.0);
}

// tres cadenas de diez cursos con pesos distintos
fn three_chains() -> Catalog {
    Catalog::new((1..=30).map(|i| {
        let c = Course::new(format!("C{i}"), format!("Course {i}"), 3).with_weight((i % 4 + 1) as f64);
        if i > 3 { c.with_prerequisites([format!("C{}", i - 3)]) } else { c }
    }))
    .unwrap()
}

#[test]
fn test_time_limit_without_incumbent_is_a_timeout() {
    let mut opts = options(12, 0, 18);
    opts.time_limit = Some(Duration::ZERO);
    let err = solve(&three_chains(), &[], opts, vec![]).unwrap_err();
    assert!(matches!(err, PlannerError::Timeout { .. }), "{err:?}");
    assert_eq!(err.status(), OutcomeStatus::TimedOut);
}

#[test]
fn test_time_limit_bounds_a_weighted_plan() {
    let mut opts = options(12, 0, 18);
    assert!(opts.weights.beta > 0.0);
    opts.time_limit = Some(Duration::from_secs(1));

    let started = Instant::now();
    match solve(&three_chains(), &[], opts, vec![]) {
        Ok(plan) => assert_eq!(plan.stats.total_courses, 30),
        Err(err) => assert!(matches!(err, PlannerError::Timeout { .. }), "{err:?}"),
    }
    assert!(started.elapsed() < Duration::from_secs(30), "took {:?}", started.elapsed());
}
