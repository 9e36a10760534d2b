// Biblioteca raíz del crate `quickplan`.
// Planificación de carrera (plan multi-semestre), selección de secciones y
// horarios alternativos sobre un solver MILP. `PlanningService` orquesta el
// flujo completo; los modelos se pueden usar directamente desde `algorithm`.
pub mod algorithm;
pub mod api_json;
pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod service;
pub mod solver;
pub mod storage;

pub use config::Settings;
pub use error::{OutcomeStatus, PlannerError, Result, TimeSlotError};
pub use service::{PlanResponse, PlanningService};
