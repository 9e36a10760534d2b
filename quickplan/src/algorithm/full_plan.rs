//! Plan de estudios multi-semestre.
//!
//! Variables `y[c,s]` binarias para cada curso pendiente y cada semestre en
//! `[starting_semester, total_semesters]`. Restricciones: cada curso una sola
//! vez, prerequisitos estrictamente antes, créditos por semestre (verano
//! con tope propio, semestres tras el horizonte nominal sin mínimo),
//! créditos acumulados para cursos restringidos, práctica profesional en
//! exclusiva, disponibilidad por periodo y overrides fijos.
//!
//! El objetivo (minimizar) combina:
//! - `α · Σ y·importancia·s` (adelantar cursos importantes),
//! - `β · Σ_s (W_s − media)²` sobre semestres no-verano (carga equilibrada).
//!   El cuadrado se acota por debajo con tangentes en los enteros, exacto
//!   cuando la desviación es entera y con error menor a 1/4 entre enteros,
//! - `γ · Σ y·|año(s) − año objetivo|` para `s ≤ horizonte`,
//! - `δ · Σ y·s` para `s > horizonte`.
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::algorithm::dependency::ImportanceScores;
use crate::algorithm::extract::plan_from_solution;
use crate::algorithm::next_semester::CreditBounds;
use crate::error::{PlannerError, Result};
use crate::models::{academic_year, is_summer, Catalog, FixedOverride, PlanAssignment, Semester, StudentProgress};
use crate::solver::{Direction, LinearExpr, MilpBackend, MilpModel, Sense, VarId};

/// Coeficientes α (importancia), β (carga), γ (desvío de año) y δ (exceso de horizonte).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanWeights {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub delta: f64,
}

impl Default for PlanWeights {
    fn default() -> Self {
        PlanWeights { alpha: 0.5, beta: 1.5, gamma: 0.25, delta: 1.0 }
    }
}

#[derive(Debug, Clone)]
pub struct FullPlanOptions {
    pub starting_semester: Semester,
    pub total_semesters: Semester,
    pub credits: CreditBounds,
    pub summer_cap: u32,
    /// Último semestre del horizonte nominal (4 años = 12).
    pub nominal_semesters: Semester,
    pub weights: PlanWeights,
    pub internship_codes: BTreeSet<String>,
    pub time_limit: Option<Duration>,
}

impl Default for FullPlanOptions {
    fn default() -> Self {
        FullPlanOptions {
            starting_semester: 1,
            total_semesters: 12,
            credits: CreditBounds { min: 12, max: 18 },
            summer_cap: 6,
            nominal_semesters: 12,
            weights: PlanWeights::default(),
            internship_codes: ["ENGR399", "ENGR399(2)"].into_iter().map(String::from).collect(),
            time_limit: None,
        }
    }
}

impl FullPlanOptions {
    pub fn semesters(&self) -> Vec<Semester> {
        (self.starting_semester..=self.total_semesters).collect()
    }
}

pub(crate) struct BuiltPlan {
    pub model: MilpModel,
    pub y: BTreeMap<(String, Semester), VarId>,
    pub semesters: Vec<Semester>,
}

pub struct FullPlanModel<'a> {
    catalog: &'a Catalog,
    progress: &'a StudentProgress,
    importance: &'a ImportanceScores,
    fixed: Vec<FixedOverride>,
    options: FullPlanOptions,
}

impl<'a> FullPlanModel<'a> {
    pub fn new(
        catalog: &'a Catalog,
        progress: &'a StudentProgress,
        importance: &'a ImportanceScores,
        options: FullPlanOptions,
    ) -> Self {
        FullPlanModel { catalog, progress, importance, fixed: Vec::new(), options }
    }

    pub fn with_fixed(mut self, fixed: Vec<FixedOverride>) -> Self {
        self.fixed = fixed;
        self
    }

    fn remaining(&self) -> Vec<String> {
        self.progress
            .remaining()
            .into_iter()
            .filter(|c| self.catalog.contains(c))
            .collect()
    }

    fn is_internship(&self, code: &str) -> bool {
        self.options.internship_codes.contains(code)
            || self.catalog.get(code).is_some_and(|c| c.internship)
    }

    pub(crate) fn build(&self) -> Result<BuiltPlan> {
        let opts = &self.options;
        let semesters = opts.semesters();
        let remaining = self.remaining();

        if semesters.is_empty() && !remaining.is_empty() {
            return Err(PlannerError::InvalidInput(format!(
                "starting semester {} is past the horizon of {} semesters",
                opts.starting_semester, opts.total_semesters
            )));
        }

        let mut model = MilpModel::new("full-plan");
        model.set_time_limit(opts.time_limit);

        let mut y: BTreeMap<(String, Semester), VarId> = BTreeMap::new();
        for c in &remaining {
            for &s in &semesters {
                y.insert((c.clone(), s), model.add_binary(format!("y[{c},{s}]")));
            }
        }
        let var = |c: &str, s: Semester| y[&(c.to_string(), s)];

        // Σ_s s·y[c,s]
        let position = |c: &str| {
            let mut e = LinearExpr::new();
            for &s in &semesters {
                e.add_term(var(c, s), s as f64);
            }
            e
        };

        // exactamente una vez
        for c in &remaining {
            let once = LinearExpr::sum(semesters.iter().map(|&s| var(c, s)));
            model.add_constraint(format!("una_vez[{c}]"), once, Sense::Eq, 1.0);
        }

        // prerequisitos pendientes, estrictamente antes
        let remaining_set: BTreeSet<&str> = remaining.iter().map(String::as_str).collect();
        for c in &remaining {
            let Some(course) = self.catalog.get(c) else { continue };
            for p in &course.prerequisites {
                if !remaining_set.contains(p.as_str()) {
                    continue;
                }
                model.add_relation(
                    format!("prereq[{p}->{c}]"),
                    position(c),
                    Sense::Ge,
                    position(p).plus_constant(1.0),
                );
            }
        }

        // créditos por semestre
        let credits_in = |s: Semester| {
            let mut e = LinearExpr::new();
            for c in &remaining {
                e.add_term(var(c, s), self.catalog.get(c).map_or(0, |x| x.credits) as f64);
            }
            e
        };
        for &s in &semesters {
            let total = credits_in(s);
            if is_summer(s) {
                model.add_constraint(format!("verano[{s}]"), total, Sense::Le, opts.summer_cap as f64);
            } else if s > opts.nominal_semesters {
                model.add_constraint(format!("max[{s}]"), total, Sense::Le, opts.credits.max as f64);
            } else {
                model.add_constraint(format!("max[{s}]"), total.clone(), Sense::Le, opts.credits.max as f64);
                model.add_constraint(format!("min[{s}]"), total, Sense::Ge, opts.credits.min as f64);
            }
        }

        // cursos restringidos por créditos acumulados: sólo cuentan semestres t < s
        let earned = self.progress.earned_credits(self.catalog) as f64;
        for c in &remaining {
            let Some(threshold) = self.catalog.get(c).and_then(|x| x.min_credits) else { continue };
            for &s in &semesters {
                let mut before = LinearExpr::constant(earned);
                for &t in semesters.iter().filter(|&&t| t < s) {
                    before.add_scaled(&credits_in(t), 1.0);
                }
                model.add_relation(
                    format!("restringido[{c},{s}]"),
                    LinearExpr::new().with_term(var(c, s), threshold as f64),
                    Sense::Le,
                    before,
                );
            }
        }

        // práctica profesional: nada más ese semestre
        let big_m = remaining.len().saturating_sub(1) as f64;
        for i in remaining.iter().filter(|c| self.is_internship(c)) {
            for &s in &semesters {
                let mut others = LinearExpr::sum(remaining.iter().filter(|c| *c != i).map(|c| var(c, s)));
                others.add_term(var(i, s), big_m);
                model.add_constraint(format!("practica[{i},{s}]"), others, Sense::Le, big_m);
            }
        }

        // disponibilidad
        for c in &remaining {
            let Some(course) = self.catalog.get(c) else { continue };
            for &s in &semesters {
                if !course.is_offered_in(crate::models::Term::of_semester(s)) {
                    model.fix(format!("no_ofrecido[{c},{s}]"), var(c, s), 0.0);
                }
            }
        }

        // overrides fijos
        for o in &self.fixed {
            self.catalog.require(&o.code)?;
            match y.get(&(o.code.clone(), o.semester)) {
                Some(&v) => model.fix(format!("fijo[{},{}]", o.code, o.semester), v, 1.0),
                None => warn!("override {} -> semestre {} ignorado (curso no pendiente o fuera del horizonte)", o.code, o.semester),
            }
        }

        let objective = self.objective(&mut model, &y, &remaining, &semesters);
        model.set_objective(objective, Direction::Minimize);
        debug!("full-plan: {} cursos x {} semestres", remaining.len(), semesters.len());
        Ok(BuiltPlan { model, y, semesters })
    }

    fn objective(
        &self,
        model: &mut MilpModel,
        y: &BTreeMap<(String, Semester), VarId>,
        remaining: &[String],
        semesters: &[Semester],
    ) -> LinearExpr {
        let w = self.options.weights;
        let nominal = self.options.nominal_semesters;
        let mut objective = LinearExpr::new();

        for c in remaining {
            let Some(course) = self.catalog.get(c) else { continue };
            let importance = self.importance.get(c) as f64;
            for &s in semesters {
                let v = y[&(c.clone(), s)];
                let mut coef = w.alpha * importance * s as f64;
                if s <= nominal {
                    let target = course.year.unwrap_or_else(|| academic_year(s));
                    coef += w.gamma * (academic_year(s) as f64 - target as f64).abs();
                } else {
                    coef += w.delta * s as f64;
                }
                objective.add_term(v, coef);
            }
        }

        let regular: Vec<Semester> = semesters.iter().copied().filter(|&s| !is_summer(s)).collect();
        if w.beta != 0.0 && !regular.is_empty() {
            let load = |s: Semester| {
                let mut e = LinearExpr::new();
                for c in remaining {
                    let weight = self.catalog.get(c).map_or(1.0, |x| x.weight);
                    e.add_term(y[&(c.clone(), s)], weight);
                }
                e
            };
            let mut mean = LinearExpr::new();
            for &s in &regular {
                mean.add_scaled(&load(s), 1.0 / regular.len() as f64);
            }
            let (low, high) = self.deviation_range(remaining, regular.len());
            for &s in &regular {
                let u = model.add_continuous(format!("desvio[{s}]"), low as f64);
                let mut centered = load(s);
                centered.add_scaled(&mean, -1.0);
                model.add_relation(format!("desvio_def[{s}]"), LinearExpr::new().with_term(u, 1.0), Sense::Eq, centered);

                // q ≥ 2p·u − p² para cada entero p: la tangente de u² en p
                let q = model.add_continuous(format!("cuadrado[{s}]"), 0.0);
                for p in low..=high {
                    let p = p as f64;
                    let tangent = LinearExpr::new().with_term(q, 1.0).with_term(u, -2.0 * p);
                    model.add_constraint(format!("tangente[{s},{p}]"), tangent, Sense::Ge, -p * p);
                }
                objective.add_term(q, w.beta);
            }
        }

        objective
    }

    /// Rango entero que puede tomar `W_s − media` en un semestre regular.
    ///
    /// Por abajo la media nunca pasa de `total / n`. Por arriba manda el
    /// menor entre `total·(1 − 1/n)` y la carga de los cursos más pesados que
    /// caben en `credits.max`.
    fn deviation_range(&self, remaining: &[String], regular: usize) -> (i64, i64) {
        let courses: Vec<_> = remaining.iter().filter_map(|c| self.catalog.get(c)).collect();
        let mut weights: Vec<f64> = courses.iter().map(|c| c.weight).collect();
        weights.sort_by(|a, b| b.total_cmp(a));
        let total: f64 = weights.iter().sum();

        let lightest = courses.iter().map(|c| c.credits).min().unwrap_or(1).max(1);
        let fits = (self.options.credits.max / lightest) as usize;
        let heaviest: f64 = weights.iter().take(fits).sum();

        let n = regular.max(1) as f64;
        let low = -(total / n);
        let high = (total * (1.0 - 1.0 / n)).min(heaviest);
        (low.floor() as i64, high.ceil() as i64)
    }

    pub fn solve(&self, backend: &dyn MilpBackend) -> Result<PlanAssignment> {
        let remaining = self.remaining();
        if remaining.is_empty() {
            info!("full-plan: no quedan cursos pendientes");
            return Ok(PlanAssignment::default());
        }

        let built = self.build()?;
        let result = built.model.optimize(backend);
        result.ensure_solution(&built.model)?;

        let plan = plan_from_solution(&result, &built, self.catalog, self.importance, &self.options);
        info!(
            "full-plan: {} cursos en {} semestres, {} créditos",
            plan.stats.total_courses, plan.stats.total_semesters, plan.stats.total_credits
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::dependency::assign_importance;
    use crate::models::Course;

    fn range(max_credits: u32, regular: usize) -> (i64, i64) {
        let catalog = Catalog::new(vec![
            Course::new("W3", "Heavy", 1).with_weight(3.0),
            Course::new("W2", "Medium", 1).with_weight(2.0),
            Course::new("W1", "Light", 1).with_weight(1.0),
        ])
        .unwrap();
        let progress = StudentProgress::for_catalog(&catalog, Vec::<String>::new());
        let importance = assign_importance(&catalog);
        let options = FullPlanOptions { credits: CreditBounds { min: 0, max: max_credits }, ..FullPlanOptions::default() };
        let model = FullPlanModel::new(&catalog, &progress, &importance, options);
        model.deviation_range(&model.remaining(), regular)
    }

    #[test]
    fn test_deviation_range_covers_only_reachable_loads() {
        // carga total 6 en 3 semestres: media ≤ 2, un semestre no pasa de 4
        assert_eq!(range(18, 3), (-2, 4));
        // con un crédito por semestre cabe sólo el curso más pesado
        assert_eq!(range(1, 3), (-2, 3));
        assert_eq!(range(18, 1), (-6, 0));
    }
}
