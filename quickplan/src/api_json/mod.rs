//! Tipos de entrada (JSON) y comandos estructurados.
//!
//! # Petición de plan
//! ```json
//! {
//!   "major": 0,
//!   "completed": "MATH111, ENGL101",
//!   "completed_semesters": 1,
//!   "total_semesters": 12,
//!   "max_credits": 18,
//!   "min_credits": 12
//! }
//! ```
//!
//! `completed` acepta tanto una cadena separada por comas como una lista.
//!
//! # Comandos
//! ```json
//! [ {"command": "setMaxCredits", "value": 15},
//!   {"command": "graduateLate"},
//!   {"command": "fixCourse", "code": "COSC320", "semester": 7} ]
//! ```
use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};

use crate::algorithm::PlanWeights;
use crate::error::{PlannerError, Result};
use crate::models::{FixedOverride, Semester};

/// Separa por comas, recorta, descarta vacíos y deduplica.
pub fn parse_course_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn course_list<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<BTreeSet<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        List(Vec<String>),
    }
    Ok(match Option::<Repr>::deserialize(d)? {
        None => BTreeSet::new(),
        Some(Repr::Text(s)) => parse_course_list(&s),
        Some(Repr::List(v)) => v.iter().flat_map(|s| parse_course_list(s)).collect(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub major: usize,
    #[serde(default, deserialize_with = "course_list")]
    pub completed: BTreeSet<String>,
    /// Puede llegar negativo desde fuera; se valida antes de modelar.
    #[serde(default)]
    pub completed_semesters: i32,
    #[serde(default)]
    pub total_semesters: Option<i32>,
    #[serde(default)]
    pub max_credits: Option<i32>,
    #[serde(default)]
    pub min_credits: Option<i32>,
    #[serde(default)]
    pub weights: Option<PlanWeights>,
}

impl PlanRequest {
    pub fn new<I, S>(major: usize, completed: I, completed_semesters: i32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PlanRequest {
            major,
            completed: completed.into_iter().map(Into::into).collect(),
            completed_semesters,
            ..PlanRequest::default()
        }
    }

    /// Primer semestre a planificar.
    pub fn starting_semester(&self) -> Result<Semester> {
        let done = non_negative("completed_semesters", self.completed_semesters)?;
        Ok(done + 1)
    }
}

pub(crate) fn non_negative(field: &str, value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| PlannerError::InvalidInput(format!("{field} must not be negative (got {value})")))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimetableRequest {
    /// Cursos inscritos para el periodo.
    #[serde(default, deserialize_with = "course_list")]
    pub registered: BTreeSet<String>,
    /// Pares `[code, time]` de secciones o laboratorios fijados.
    #[serde(default)]
    pub fixed_sections: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NextSemesterRequest {
    pub major: usize,
    #[serde(default, deserialize_with = "course_list")]
    pub completed: BTreeSet<String>,
    #[serde(default)]
    pub completed_semesters: i32,
    #[serde(default)]
    pub max_credits: Option<i32>,
    #[serde(default)]
    pub min_credits: Option<i32>,
}

/// Comandos producidos por el componente conversacional; nunca texto libre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum PlanCommand {
    SetMaxCredits { value: i32 },
    SetTotalSemesters { value: i32 },
    GraduateLate,
    FixCourse { code: String, semester: i32 },
}

/// Efecto de aplicar una lista de comandos sobre una petición.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppliedCommands {
    pub fixes: Vec<FixedOverride>,
}

/// Aplica los comandos a `request`. `graduateLate` fija el horizonte en
/// `late_total_semesters` y anula la penalización por exceso (δ = 0).
pub fn apply_commands(
    request: &mut PlanRequest,
    commands: &[PlanCommand],
    late_total_semesters: Semester,
    default_weights: PlanWeights,
) -> Result<AppliedCommands> {
    let mut applied = AppliedCommands::default();
    for cmd in commands {
        match cmd {
            PlanCommand::SetMaxCredits { value } => {
                non_negative("max_credits", *value)?;
                request.max_credits = Some(*value);
            }
            PlanCommand::SetTotalSemesters { value } => {
                non_negative("total_semesters", *value)?;
                request.total_semesters = Some(*value);
            }
            PlanCommand::GraduateLate => {
                request.total_semesters = Some(late_total_semesters as i32);
                let mut w = request.weights.unwrap_or(default_weights);
                w.delta = 0.0;
                request.weights = Some(w);
            }
            PlanCommand::FixCourse { code, semester } => {
                let semester = non_negative("semester", *semester)?;
                if semester == 0 {
                    return Err(PlannerError::InvalidInput("semester numbers start at 1".to_string()));
                }
                let o = FixedOverride::new(code.trim(), semester);
                if !applied.fixes.contains(&o) {
                    applied.fixes.push(o);
                }
            }
        }
    }
    Ok(applied)
}
