//! Errores del planificador.
//!
//! Taxonomía: validación de entrada (rechazada antes de construir el modelo),
//! franjas horarias mal formadas, modelo infactible, límite de tiempo sin
//! solución incumbente y cualquier otro estado del solver.

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlannerError>;

/// Código de estado expuesto hacia fuera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutcomeStatus {
    Optimal,
    Infeasible,
    TimedOut,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeSlotError {
    #[error("empty time slot")]
    Empty,

    #[error("time slot '{raw}' has no time section")]
    MissingDigits { raw: String },

    #[error("time slot '{raw}' has no '-' separator")]
    MissingSeparator { raw: String },

    #[error("invalid clock value '{value}' in time slot")]
    InvalidTime { value: String },

    #[error("unknown day code '{day}' in time slot '{raw}'")]
    UnknownDay { raw: String, day: char },

    #[error("time slot '{raw}' ends before it starts")]
    EndBeforeStart { raw: String },
}

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("unknown major index {index} ({available} majors available)")]
    UnknownMajor { index: usize, available: usize },

    #[error("course '{code}' is not in the catalog{}", .suggestion.as_ref().map(|s| format!(" (did you mean '{s}'?)")).unwrap_or_default())]
    UnknownCourse { code: String, suggestion: Option<String> },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("prerequisite cycle detected: {}", .cycle.join(" -> "))]
    PrerequisiteCycle { cycle: Vec<String> },

    #[error(transparent)]
    TimeSlot(#[from] TimeSlotError),

    #[error("no assignment satisfies the constraints of model '{model}'")]
    Infeasible { model: String },

    #[error("model '{model}' reached its time limit ({limit_secs:.1}s) without a feasible solution")]
    Timeout { model: String, limit_secs: f64 },

    #[error("solver failed on model '{model}' with status {status}")]
    SolverFailure { model: String, status: String },

    #[error("storage error at {path}: {source}")]
    Storage {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl PlannerError {
    /// Construye `UnknownCourse` buscando el código más parecido del catálogo.
    pub fn unknown_course<'a, I>(code: &str, known: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let wanted = code.to_uppercase();
        let suggestion = known
            .into_iter()
            .map(|k| (strsim::jaro_winkler(&wanted, &k.to_uppercase()), k))
            .filter(|(score, _)| *score >= 0.85)
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, k)| k.to_string());
        PlannerError::UnknownCourse { code: code.to_string(), suggestion }
    }

    pub fn storage(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        PlannerError::Storage { path: path.as_ref().display().to_string(), source }
    }

    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            PlannerError::UnknownMajor { .. }
                | PlannerError::UnknownCourse { .. }
                | PlannerError::InvalidInput(_)
                | PlannerError::PrerequisiteCycle { .. }
                | PlannerError::TimeSlot(_)
        )
    }

    pub fn status(&self) -> OutcomeStatus {
        match self {
            PlannerError::Infeasible { .. } => OutcomeStatus::Infeasible,
            PlannerError::Timeout { .. } => OutcomeStatus::TimedOut,
            _ => OutcomeStatus::Failed,
        }
    }
}
