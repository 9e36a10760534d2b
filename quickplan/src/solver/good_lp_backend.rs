// Backend `good_lp` (solver microlp, Rust puro).
//
// microlp no tiene pool de soluciones: se obtiene re-resolviendo con cortes
// "no-good" que excluyen cada asignación binaria ya encontrada.
//
// El límite de tiempo es un plazo de reloj para toda la enumeración. Cada
// resolución recibe lo que queda del plazo como límite propio de microlp,
// que lo revisa dentro del simplex y entre nodos del branch and bound, así
// que también acota la búsqueda de la primera incumbente. Si vence sin
// ninguna solución el resultado es `TimeLimitReached` con el pool vacío.
// Todo corre en el hilo que llama; al retornar no queda trabajo pendiente.
use std::time::{Duration, Instant};

use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolutionStatus, SolverModel, Variable,
    WithTimeLimit, constraint, default_solver, variable,
};
use tracing::{debug, warn};

use super::{Direction, LinearExpr, MilpBackend, MilpModel, Sense, SolveResult, SolveStatus, VarId, VarKind};

/// Asignación binaria a excluir: (variable, valor en la solución previa).
type NoGood = Vec<(VarId, bool)>;

enum Attempt {
    /// Solución factible; `complete` es falso si microlp la entregó al vencer el plazo.
    Found { values: Vec<f64>, complete: bool },
    Infeasible,
    TimedOut,
    Failed(String),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GoodLpBackend;

impl GoodLpBackend {
    pub fn new() -> Self {
        GoodLpBackend
    }
}

impl MilpBackend for GoodLpBackend {
    fn solve(&self, model: &MilpModel) -> SolveResult {
        let start = Instant::now();
        let deadline = model.time_limit.map(|limit| start + limit);
        let binaries: Vec<VarId> = model.binary_vars().collect();
        let mut pool: Vec<Vec<f64>> = Vec::new();
        let mut cuts: Vec<NoGood> = Vec::new();

        while pool.len() < model.pool_size {
            let budget = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            if !pool.is_empty() && budget.is_some_and(|b| b.is_zero()) {
                debug!("{}: plazo vencido tras {} soluciones", model.name, pool.len());
                return SolveResult::new(SolveStatus::TimeLimitReached, pool);
            }

            match solve_once(model, &cuts, budget) {
                Attempt::Found { values, complete } => {
                    cuts.push(binaries.iter().map(|&v| (v, values[v.index()] > 0.5)).collect());
                    pool.push(values);
                    if !complete {
                        debug!("{}: plazo vencido durante la búsqueda, {} soluciones", model.name, pool.len());
                        return SolveResult::new(SolveStatus::TimeLimitReached, pool);
                    }
                    if binaries.is_empty() {
                        break;
                    }
                }
                Attempt::TimedOut => {
                    debug!("{}: plazo vencido tras {} soluciones", model.name, pool.len());
                    return SolveResult::new(SolveStatus::TimeLimitReached, pool);
                }
                // Pool agotado: no quedan asignaciones binarias distintas.
                Attempt::Infeasible if !pool.is_empty() => break,
                Attempt::Infeasible => return SolveResult::new(SolveStatus::Infeasible, pool),
                Attempt::Failed(status) if pool.is_empty() => {
                    return SolveResult::new(SolveStatus::Other(status), pool);
                }
                Attempt::Failed(status) => {
                    warn!("{}: enumeración interrumpida ({}), se conservan {} soluciones", model.name, status, pool.len());
                    break;
                }
            }
        }

        debug!("{}: {} soluciones en {:.2?}", model.name, pool.len(), start.elapsed());
        SolveResult::new(SolveStatus::Optimal, pool)
    }
}

fn to_expression(expr: &LinearExpr, vars: &[Variable]) -> Expression {
    let mut out = Expression::from(expr.constant);
    for &(v, coef) in &expr.terms {
        out += coef * vars[v.index()];
    }
    out
}

fn solve_once(model: &MilpModel, cuts: &[NoGood], budget: Option<Duration>) -> Attempt {
    if model.vars.is_empty() {
        return if model.is_feasible(&[]) {
            Attempt::Found { values: Vec::new(), complete: true }
        } else {
            Attempt::Infeasible
        };
    }

    let mut problem = ProblemVariables::new();
    let vars: Vec<Variable> = model
        .vars
        .iter()
        .map(|def| match def.kind {
            VarKind::Binary => problem.add(variable().binary().name(def.name.clone())),
            VarKind::Continuous { min } => problem.add(variable().min(min).name(def.name.clone())),
        })
        .collect();

    let objective = to_expression(&model.objective, &vars);
    let mut lp = match model.direction {
        Direction::Minimize => problem.minimise(objective).using(default_solver),
        Direction::Maximize => problem.maximise(objective).using(default_solver),
    };
    if let Some(budget) = budget {
        lp = lp.with_time_limit(budget.as_secs_f64());
    }
    let started = Instant::now();

    for c in &model.constraints {
        let lhs = to_expression(&c.lhs, &vars);
        let rhs = c.rhs;
        match c.sense {
            Sense::Le => lp.add_constraint(constraint!(lhs <= rhs)),
            Sense::Ge => lp.add_constraint(constraint!(lhs >= rhs)),
            Sense::Eq => lp.add_constraint(constraint!(lhs == rhs)),
        };
    }

    // Σ_{apagadas} x − Σ_{encendidas} x ≥ 1 − |encendidas|
    for cut in cuts {
        let mut lhs = Expression::from(0.0);
        let mut on = 0.0;
        for &(v, was_on) in cut {
            if was_on {
                lhs -= vars[v.index()];
                on += 1.0;
            } else {
                lhs += vars[v.index()];
            }
        }
        let rhs = 1.0 - on;
        lp.add_constraint(constraint!(lhs >= rhs));
    }

    match lp.solve() {
        Ok(solution) => {
            let complete = !matches!(solution.status(), SolutionStatus::TimeLimit);
            let values = model
                .vars
                .iter()
                .zip(&vars)
                .map(|(def, var)| {
                    let value = solution.value(*var);
                    match def.kind {
                        VarKind::Binary => value.round(),
                        VarKind::Continuous { .. } => value,
                    }
                })
                .collect();
            Attempt::Found { values, complete }
        }
        Err(ResolutionError::Infeasible) => Attempt::Infeasible,
        // microlp corta sin incumbente y lo informa como error genérico
        Err(_) if budget.is_some_and(|b| started.elapsed() >= b) => Attempt::TimedOut,
        Err(ResolutionError::Unbounded) => Attempt::Failed("unbounded".to_string()),
        Err(e) => Attempt::Failed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_knapsack_optimum() {
        let mut m = MilpModel::new("knapsack");
        let a = m.add_binary("a");
        let b = m.add_binary("b");
        let c = m.add_binary("c");
        m.add_constraint(
            "cap",
            LinearExpr::new().with_term(a, 3.0).with_term(b, 4.0).with_term(c, 5.0),
            Sense::Le,
            8.0,
        );
        m.set_objective(
            LinearExpr::new().with_term(a, 4.0).with_term(b, 5.0).with_term(c, 7.0),
            Direction::Maximize,
        );
        let r = m.optimize(&GoodLpBackend::new());
        assert_eq!(r.status, SolveStatus::Optimal);
        assert!(r.is_set(0, a));
        assert!(!r.is_set(0, b));
        assert!(r.is_set(0, c));
    }

    #[test]
    fn test_pool_enumerates_distinct_feasible_solutions() {
        let mut m = MilpModel::new("pick-one");
        let xs: Vec<VarId> = (0..3).map(|i| m.add_binary(format!("x{i}"))).collect();
        m.add_constraint("one", LinearExpr::sum(xs.iter().copied()), Sense::Eq, 1.0);
        m.set_pool_size(10);
        let r = m.optimize(&GoodLpBackend::new());
        assert_eq!(r.status, SolveStatus::Optimal);
        assert_eq!(r.pool_size(), 3);
        for k in 0..r.pool_size() {
            assert!(m.is_feasible(&r.pool[k]));
        }
        let mut chosen: Vec<usize> = (0..3)
            .map(|k| xs.iter().position(|&x| r.is_set(k, x)).unwrap())
            .collect();
        chosen.sort();
        assert_eq!(chosen, vec![0, 1, 2]);
    }

    #[test]
    fn test_expired_deadline_before_any_solution_is_a_timeout() {
        let mut m = MilpModel::new("sin-tiempo");
        let xs: Vec<VarId> = (0..6).map(|i| m.add_binary(format!("x{i}"))).collect();
        m.add_constraint("one", LinearExpr::sum(xs.iter().copied()), Sense::Eq, 1.0);
        m.set_time_limit(Some(std::time::Duration::ZERO));

        let r = m.optimize(&GoodLpBackend::new());
        assert_eq!(r.status, SolveStatus::TimeLimitReached);
        assert!(!r.has_incumbent());
        assert!(matches!(r.ensure_solution(&m), Err(crate::PlannerError::Timeout { .. })));
    }

    #[test]
    fn test_deadline_stops_enumeration_after_incumbent() {
        // C(16, 8) = 12870 asignaciones: la enumeración no termina en 200 ms
        let mut m = MilpModel::new("deadline");
        let xs: Vec<VarId> = (0..16).map(|i| m.add_binary(format!("x{i}"))).collect();
        m.add_constraint("half", LinearExpr::sum(xs.iter().copied()), Sense::Eq, 8.0);
        m.set_pool_size(5000);
        m.set_time_limit(Some(std::time::Duration::from_millis(200)));

        let r = m.optimize(&GoodLpBackend::new());
        assert_eq!(r.status, SolveStatus::TimeLimitReached);
        assert!(r.has_incumbent());
        assert!(r.pool_size() < 5000);
        for k in 0..r.pool_size() {
            assert!(m.is_feasible(&r.pool[k]));
        }
        assert!(r.ensure_solution(&m).is_ok());
    }

    #[test]
    fn test_infeasible_model() {
        let mut m = MilpModel::new("bad");
        let x = m.add_binary("x");
        m.add_constraint("ge2", LinearExpr::new().with_term(x, 1.0), Sense::Ge, 2.0);
        let r = m.optimize(&GoodLpBackend::new());
        assert_eq!(r.status, SolveStatus::Infeasible);
        assert!(!r.has_incumbent());
    }
}
