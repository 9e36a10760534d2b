// Cuenta hilos vía /proc: sólo Linux.
#![cfg(target_os = "linux")]

use std::time::Duration;

use quickplan::solver::{Direction, GoodLpBackend, LinearExpr, MilpModel, Sense, SolveStatus};

fn knapsack(n: usize) -> MilpModel {
    let mut m = MilpModel::new("knapsack");
    let mut weight = LinearExpr::new();
    let mut value = LinearExpr::new();
    for i in 0..n {
        let x = m.add_binary(format!("x{i}"));
        weight.add_term(x, (3 + i % 7) as f64);
        value.add_term(x, (5 + (i * 11) % 13) as f64);
    }
    m.add_constraint("cap", weight, Sense::Le, (2 * n) as f64);
    m.set_objective(value, Direction::Maximize);
    m
}

fn thread_count() -> usize {
    std::fs::read_dir("/proc/self/task").unwrap().count()
}

#[test]
fn test_time_limited_solve_leaves_no_threads_behind() {
    let mut m = knapsack(60);
    m.set_pool_size(500);
    m.set_time_limit(Some(Duration::from_millis(30)));

    let before = thread_count();
    let r = m.optimize(&GoodLpBackend::new());
    let after = thread_count();

    assert_eq!(after, before);
    assert!(r.pool.iter().all(|s| m.is_feasible(s)));
    match r.status {
        SolveStatus::TimeLimitReached => assert!(r.pool_size() < 500),
        SolveStatus::Optimal => assert!(r.has_incumbent()),
        ref other => panic!("unexpected status {other}"),
    }
}
