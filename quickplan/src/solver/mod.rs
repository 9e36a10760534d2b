//! Contrato mínimo con el solver MILP.
//!
//! Los tres modelos (próximo semestre, horario, plan completo) sólo hablan
//! con `MilpModel` y `MilpBackend`; el backend concreto se inyecta. Cada
//! petición construye su propio `MilpModel`, nunca se comparte.
mod good_lp_backend;

pub use good_lp_backend::GoodLpBackend;

use std::fmt;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{PlannerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VarKind {
    Binary,
    Continuous { min: f64 },
}

#[derive(Debug, Clone)]
pub struct VarDef {
    pub name: String,
    pub kind: VarKind,
}

/// `Σ coef·var + constant`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, f64)>,
    pub constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        LinearExpr::default()
    }

    pub fn constant(value: f64) -> Self {
        LinearExpr { terms: Vec::new(), constant: value }
    }

    pub fn add_term(&mut self, var: VarId, coef: f64) -> &mut Self {
        if coef != 0.0 {
            self.terms.push((var, coef));
        }
        self
    }

    pub fn with_term(mut self, var: VarId, coef: f64) -> Self {
        self.add_term(var, coef);
        self
    }

    pub fn add_constant(&mut self, value: f64) -> &mut Self {
        self.constant += value;
        self
    }

    pub fn plus_constant(mut self, value: f64) -> Self {
        self.constant += value;
        self
    }

    /// Suma `scale·other` a esta expresión.
    pub fn add_scaled(&mut self, other: &LinearExpr, scale: f64) -> &mut Self {
        for &(v, c) in &other.terms {
            self.add_term(v, c * scale);
        }
        self.constant += other.constant * scale;
        self
    }

    /// Suma con coeficiente 1 de todas las variables.
    pub fn sum<I: IntoIterator<Item = VarId>>(vars: I) -> Self {
        LinearExpr { terms: vars.into_iter().map(|v| (v, 1.0)).collect(), constant: 0.0 }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(v, c)| c * values.get(v.0).copied().unwrap_or(0.0))
            .sum::<f64>()
            + self.constant
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Le,
    Ge,
    Eq,
}

/// `lhs <sense> rhs`
#[derive(Debug, Clone)]
pub struct LinearConstraint {
    pub name: String,
    pub lhs: LinearExpr,
    pub sense: Sense,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn is_satisfied(&self, values: &[f64]) -> bool {
        const TOL: f64 = 1e-6;
        let lhs = self.lhs.evaluate(values);
        match self.sense {
            Sense::Le => lhs <= self.rhs + TOL,
            Sense::Ge => lhs >= self.rhs - TOL,
            Sense::Eq => (lhs - self.rhs).abs() <= TOL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Minimize,
    Maximize,
}

#[derive(Debug, Clone)]
pub struct MilpModel {
    pub name: String,
    pub vars: Vec<VarDef>,
    pub constraints: Vec<LinearConstraint>,
    pub objective: LinearExpr,
    pub direction: Direction,
    pub time_limit: Option<Duration>,
    /// Número de soluciones pedidas al pool (1 = sólo la óptima).
    pub pool_size: usize,
}

impl MilpModel {
    pub fn new(name: impl Into<String>) -> Self {
        MilpModel {
            name: name.into(),
            vars: Vec::new(),
            constraints: Vec::new(),
            objective: LinearExpr::new(),
            direction: Direction::Minimize,
            time_limit: None,
            pool_size: 1,
        }
    }

    pub fn add_binary(&mut self, name: impl Into<String>) -> VarId {
        self.vars.push(VarDef { name: name.into(), kind: VarKind::Binary });
        VarId(self.vars.len() - 1)
    }

    pub fn add_continuous(&mut self, name: impl Into<String>, min: f64) -> VarId {
        self.vars.push(VarDef { name: name.into(), kind: VarKind::Continuous { min } });
        VarId(self.vars.len() - 1)
    }

    /// Agrega `lhs <sense> rhs`. Las constantes de `lhs` se pasan al lado derecho.
    pub fn add_constraint(&mut self, name: impl Into<String>, lhs: LinearExpr, sense: Sense, rhs: f64) {
        let rhs = rhs - lhs.constant;
        let lhs = LinearExpr { terms: lhs.terms, constant: 0.0 };
        self.constraints.push(LinearConstraint { name: name.into(), lhs, sense, rhs });
    }

    /// `lhs <sense> rhs` con ambos lados expresiones.
    pub fn add_relation(&mut self, name: impl Into<String>, lhs: LinearExpr, sense: Sense, rhs: LinearExpr) {
        let mut diff = lhs;
        diff.add_scaled(&rhs, -1.0);
        self.add_constraint(name, diff, sense, 0.0);
    }

    pub fn fix(&mut self, name: impl Into<String>, var: VarId, value: f64) {
        self.add_constraint(name, LinearExpr::new().with_term(var, 1.0), Sense::Eq, value);
    }

    pub fn set_objective(&mut self, objective: LinearExpr, direction: Direction) {
        self.objective = objective;
        self.direction = direction;
    }

    pub fn set_time_limit(&mut self, limit: Option<Duration>) {
        self.time_limit = limit;
    }

    pub fn set_pool_size(&mut self, size: usize) {
        self.pool_size = size.max(1);
    }

    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    pub fn binary_vars(&self) -> impl Iterator<Item = VarId> + '_ {
        self.vars
            .iter()
            .enumerate()
            .filter(|(_, v)| v.kind == VarKind::Binary)
            .map(|(i, _)| VarId(i))
    }

    /// Verifica una asignación completa contra todas las restricciones.
    pub fn is_feasible(&self, values: &[f64]) -> bool {
        self.constraints.iter().all(|c| c.is_satisfied(values))
    }

    pub fn optimize(&self, backend: &dyn MilpBackend) -> SolveResult {
        info!(
            "modelo {}: {} variables, {} restricciones, pool {}",
            self.name,
            self.var_count(),
            self.constraint_count(),
            self.pool_size
        );
        let result = backend.solve(self);
        info!("modelo {}: estado {} ({} soluciones)", self.name, result.status, result.pool_size());
        result
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    TimeLimitReached,
    Other(String),
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Optimal => f.write_str("optimal"),
            SolveStatus::Infeasible => f.write_str("infeasible"),
            SolveStatus::TimeLimitReached => f.write_str("time limit reached"),
            SolveStatus::Other(s) => write!(f, "other ({s})"),
        }
    }
}

/// Estado más las soluciones encontradas; `pool[0]` es la incumbente.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveResult {
    pub status: SolveStatus,
    pub pool: Vec<Vec<f64>>,
}

impl SolveResult {
    pub fn new(status: SolveStatus, pool: Vec<Vec<f64>>) -> Self {
        SolveResult { status, pool }
    }

    pub fn has_incumbent(&self) -> bool {
        !self.pool.is_empty()
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// Valor de la variable en la incumbente.
    pub fn value(&self, var: VarId) -> f64 {
        self.pool_value(0, var)
    }

    /// Valor de la variable en la solución `k` del pool.
    pub fn pool_value(&self, k: usize, var: VarId) -> f64 {
        self.pool.get(k).and_then(|s| s.get(var.0)).copied().unwrap_or(0.0)
    }

    pub fn is_set(&self, k: usize, var: VarId) -> bool {
        self.pool_value(k, var) > 0.5
    }

    /// Ramifica según el estado: óptimo o límite de tiempo con incumbente
    /// se extraen; el resto se traduce al error correspondiente.
    pub fn ensure_solution(&self, model: &MilpModel) -> Result<()> {
        match &self.status {
            SolveStatus::Optimal if self.has_incumbent() => Ok(()),
            SolveStatus::Optimal => Err(PlannerError::SolverFailure {
                model: model.name.clone(),
                status: "optimal without solution".to_string(),
            }),
            SolveStatus::Infeasible => Err(PlannerError::Infeasible { model: model.name.clone() }),
            SolveStatus::TimeLimitReached if self.has_incumbent() => {
                warn!("modelo {}: límite de tiempo alcanzado, se usa la mejor solución encontrada", model.name);
                Ok(())
            }
            SolveStatus::TimeLimitReached => Err(PlannerError::Timeout {
                model: model.name.clone(),
                limit_secs: model.time_limit.map(|d| d.as_secs_f64()).unwrap_or(0.0),
            }),
            SolveStatus::Other(status) => Err(PlannerError::SolverFailure {
                model: model.name.clone(),
                status: status.clone(),
            }),
        }
    }
}

pub trait MilpBackend: Send + Sync {
    fn solve(&self, model: &MilpModel) -> SolveResult;
}
