// Motor de planificación: franjas horarias, grafo de prerequisitos y los tres modelos MILP.
pub mod conflict;
pub mod dependency;
pub mod extract;
pub mod full_plan;
pub mod next_semester;
pub mod timetable;

pub use dependency::{all_dependents, assign_importance, is_dependent, DependencyGraph, ImportanceScores};
pub use full_plan::{FullPlanModel, FullPlanOptions, PlanWeights};
pub use next_semester::{CreditBounds, NextSemesterModel, NextSemesterOptions, NextSemesterSelection};
pub use timetable::{SlotPin, TimetableModel, TimetableOptions, TimetableReport};
