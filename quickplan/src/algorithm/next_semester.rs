// Selección de secciones para un único semestre (modo simplificado).
//
// x[c, sección] binaria para cada curso pendiente y cada una de sus secciones.
// Se maximiza Σ x·(α·importancia − β·peso): cursos que desbloquean más y
// cuestan menos primero.
use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::algorithm::dependency::ImportanceScores;
use crate::error::{PlannerError, Result};
use crate::models::{Catalog, StudentProgress, Term};
use crate::solver::{Direction, LinearExpr, MilpBackend, MilpModel, Sense, SolveResult, VarId};

/// Rango de créditos aceptado para un semestre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditBounds {
    pub min: u32,
    pub max: u32,
}

impl CreditBounds {
    pub fn new(min: u32, max: u32) -> Result<Self> {
        if min > max {
            return Err(PlannerError::InvalidInput(format!(
                "min credits ({min}) greater than max credits ({max})"
            )));
        }
        Ok(CreditBounds { min, max })
    }
}

#[derive(Debug, Clone)]
pub struct NextSemesterOptions {
    pub credits: CreditBounds,
    /// Coeficiente de importancia.
    pub alpha: f64,
    /// Coeficiente (negativo) del peso.
    pub beta: f64,
    /// Si se indica, se descartan cursos no ofrecidos en ese periodo.
    pub term: Option<Term>,
    pub time_limit: Option<Duration>,
}

impl Default for NextSemesterOptions {
    fn default() -> Self {
        NextSemesterOptions {
            credits: CreditBounds { min: 12, max: 18 },
            alpha: 1.5,
            beta: 0.5,
            term: None,
            time_limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextSemesterChoice {
    pub code: String,
    pub name: String,
    pub credits: u32,
    pub section: String,
    pub importance: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NextSemesterSelection {
    pub courses: Vec<NextSemesterChoice>,
    pub total_credits: u32,
}

pub struct NextSemesterModel<'a> {
    catalog: &'a Catalog,
    progress: &'a StudentProgress,
    importance: &'a ImportanceScores,
    options: NextSemesterOptions,
}

struct Built {
    model: MilpModel,
    /// (curso, sección) -> variable
    vars: BTreeMap<(String, String), VarId>,
}

impl<'a> NextSemesterModel<'a> {
    pub fn new(
        catalog: &'a Catalog,
        progress: &'a StudentProgress,
        importance: &'a ImportanceScores,
        options: NextSemesterOptions,
    ) -> Self {
        NextSemesterModel { catalog, progress, importance, options }
    }

    /// Motivo por el que un curso no puede tomarse ahora, si lo hay.
    fn blocked_reason(&self, code: &str, earned: u32) -> Option<String> {
        let course = self.catalog.get(code)?;
        if let Some(p) = course.prerequisites.iter().find(|p| !self.progress.completed.contains(*p)) {
            return Some(format!("prerequisito {p} pendiente"));
        }
        if let Some(threshold) = course.min_credits {
            if earned < threshold {
                return Some(format!("requiere {threshold} créditos, tiene {earned}"));
            }
        }
        if let Some(term) = self.options.term {
            if !course.is_offered_in(term) {
                return Some(format!("no se ofrece en {term}"));
            }
        }
        None
    }

    fn build(&self) -> Built {
        let mut model = MilpModel::new("next-semester");
        model.set_time_limit(self.options.time_limit);
        let mut vars = BTreeMap::new();
        let earned = self.progress.earned_credits(self.catalog);

        let mut credits = LinearExpr::new();
        let mut objective = LinearExpr::new();

        for code in self.progress.remaining() {
            let Some(course) = self.catalog.get(&code) else { continue };
            let mut per_course = Vec::new();
            for section in course.effective_sections() {
                let v = model.add_binary(format!("x[{code},{}]", section.time));
                vars.insert((code.clone(), section.time.clone()), v);
                per_course.push(v);

                credits.add_term(v, course.credits as f64);
                let score = self.options.alpha * self.importance.get(&code) as f64
                    - self.options.beta * course.weight;
                objective.add_term(v, score);
            }

            model.add_constraint(format!("una_seccion[{code}]"), LinearExpr::sum(per_course.iter().copied()), Sense::Le, 1.0);

            if let Some(reason) = self.blocked_reason(&code, earned) {
                debug!("{} bloqueado: {}", code, reason);
                for v in per_course {
                    model.fix(format!("bloqueado[{code}]"), v, 0.0);
                }
            }
        }

        let bounds = self.options.credits;
        model.add_constraint("creditos_min", credits.clone(), Sense::Ge, bounds.min as f64);
        model.add_constraint("creditos_max", credits, Sense::Le, bounds.max as f64);
        model.set_objective(objective, Direction::Maximize);

        Built { model, vars }
    }

    pub fn solve(&self, backend: &dyn MilpBackend) -> Result<NextSemesterSelection> {
        let built = self.build();
        let result = built.model.optimize(backend);
        result.ensure_solution(&built.model)?;
        let selection = self.decode(&built, &result);
        info!("próximo semestre: {} cursos, {} créditos", selection.courses.len(), selection.total_credits);
        Ok(selection)
    }

    fn decode(&self, built: &Built, result: &SolveResult) -> NextSemesterSelection {
        let mut selection = NextSemesterSelection::default();
        for ((code, section), &v) in &built.vars {
            if !result.is_set(0, v) {
                continue;
            }
            let Some(course) = self.catalog.get(code) else { continue };
            selection.total_credits += course.credits;
            selection.courses.push(NextSemesterChoice {
                code: code.clone(),
                name: course.name.clone(),
                credits: course.credits,
                section: section.clone(),
                importance: self.importance.get(code),
            });
        }
        selection
    }
}
