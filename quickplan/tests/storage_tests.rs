use std::fs;
use std::sync::Arc;
use std::thread;

use chrono::Utc;
use quickplan::models::{FixedOverride, PlanAssignment, PlanRecord};
use quickplan::storage::{JsonFileStore, MemoryStore, OverrideStore, PlanStore};
use tempfile::tempdir;

#[test]
fn test_overrides_append_if_absent_and_file_format() {
    let dir = tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("fixed.json"), dir.path().join("last.json"));

    assert!(store.load().unwrap().is_empty());
    assert!(store.add(FixedOverride::new("COSC320", 7)).unwrap());
    assert!(!store.add(FixedOverride::new("COSC320", 7)).unwrap());
    assert!(store.add(FixedOverride::new("COSC320", 8)).unwrap());
    assert!(store.add(FixedOverride::new("MATH220", 4)).unwrap());

    let raw = fs::read_to_string(dir.path().join("fixed.json")).unwrap();
    let pairs: Vec<(String, u32)> = serde_json::from_str(&raw).unwrap();
    assert_eq!(
        pairs,
        vec![("COSC320".to_string(), 7), ("COSC320".to_string(), 8), ("MATH220".to_string(), 4)]
    );

    assert_eq!(store.remove("COSC320").unwrap(), 2);
    assert_eq!(store.load().unwrap(), vec![FixedOverride::new("MATH220", 4)]);
    store.clear().unwrap();
    assert!(store.load().unwrap().is_empty());
}

#[test]
fn test_corrupt_file_reads_as_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fixed.json");
    fs::write(&path, "[[\"COSC320\", 7], oops").unwrap();
    let store = JsonFileStore::new(&path, dir.path().join("last.json"));
    assert!(store.load().unwrap().is_empty());
    assert!(store.add(FixedOverride::new("A", 1)).unwrap());
    assert_eq!(store.load().unwrap().len(), 1);
}

#[test]
fn test_concurrent_adds_are_not_lost() {
    let dir = tempdir().unwrap();
    let store = Arc::new(JsonFileStore::new(dir.path().join("fixed.json"), dir.path().join("last.json")));
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for s in 1..=5 {
                    store.add(FixedOverride::new(format!("C{i}"), s)).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(store.load().unwrap().len(), 40);
}

#[test]
fn test_last_plan_roundtrip() {
    let dir = tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("fixed.json"), dir.path().join("nested/last.json"));
    assert!(store.load_last().unwrap().is_none());

    let record = PlanRecord {
        plan: PlanAssignment::default(),
        major: 2,
        completed: vec!["MATH111".to_string()],
        completed_semesters: 1,
        generated_at: Utc::now(),
    };
    store.save_last(&record).unwrap();
    assert_eq!(store.load_last().unwrap(), Some(record.clone()));

    let mem = MemoryStore::new();
    mem.save_last(&record).unwrap();
    assert_eq!(mem.load_last().unwrap().map(|r| r.major), Some(2));
}
