// Resultados estructurados: plan multi-semestre, horarios alternativos y overrides fijos.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Semester, Term};

/// Curso fijado externamente en un semestre. Se persiste como par `[code, semester]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(String, Semester)", into = "(String, Semester)")]
pub struct FixedOverride {
    pub code: String,
    pub semester: Semester,
}

impl FixedOverride {
    pub fn new(code: impl Into<String>, semester: Semester) -> Self {
        FixedOverride { code: code.into(), semester }
    }
}

impl From<(String, Semester)> for FixedOverride {
    fn from((code, semester): (String, Semester)) -> Self {
        FixedOverride { code, semester }
    }
}

impl From<FixedOverride> for (String, Semester) {
    fn from(o: FixedOverride) -> Self {
        (o.code, o.semester)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedCourse {
    pub code: String,
    pub name: String,
    pub credits: u32,
    pub prerequisites: Vec<String>,
    /// Cursos para los que éste es prerequisito directo.
    pub unlocks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemesterPlan {
    pub number: Semester,
    pub term: Term,
    pub year: u32,
    pub total_credits: u32,
    pub courses: Vec<PlannedCourse>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanStats {
    pub total_semesters: usize,
    pub total_courses: usize,
    pub total_credits: u32,
    pub avg_credits_per_semester: f64,
    pub first_semester_courses: Vec<PlannedCourse>,
}

impl PlanStats {
    pub fn from_semesters(semesters: &[SemesterPlan]) -> Self {
        if semesters.is_empty() {
            return PlanStats::default();
        }
        let total_semesters = semesters.len();
        let total_courses = semesters.iter().map(|s| s.courses.len()).sum();
        let total_credits: u32 = semesters.iter().map(|s| s.total_credits).sum();
        let avg = total_credits as f64 / total_semesters as f64;
        PlanStats {
            total_semesters,
            total_courses,
            total_credits,
            avg_credits_per_semester: (avg * 100.0).round() / 100.0,
            first_semester_courses: semesters[0].courses.clone(),
        }
    }
}

/// Valor de cada término del objetivo evaluado sobre el plan extraído.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveBreakdown {
    pub importance: f64,
    /// Varianza exacta de la carga en semestres no-verano.
    pub workload_variance: f64,
    pub mean_workload: f64,
    pub year_penalty: f64,
    pub overrun_penalty: f64,
}

/// Salida de FullPlanModel: semestre -> cursos, con estadísticas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanAssignment {
    pub semesters: Vec<SemesterPlan>,
    pub stats: PlanStats,
    #[serde(default)]
    pub objective: ObjectiveBreakdown,
}

impl PlanAssignment {
    pub fn semester_of(&self, code: &str) -> Option<Semester> {
        self.semesters
            .iter()
            .find(|s| s.courses.iter().any(|c| c.code == code))
            .map(|s| s.number)
    }

    pub fn semester(&self, number: Semester) -> Option<&SemesterPlan> {
        self.semesters.iter().find(|s| s.number == number)
    }
}

/// Último plan calculado, guardado como respaldo ante re-planificaciones infactibles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRecord {
    pub plan: PlanAssignment,
    pub major: usize,
    pub completed: Vec<String>,
    pub completed_semesters: u32,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    Section,
    Lab,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimetableEntry {
    pub code: String,
    pub name: String,
    pub kind: SlotKind,
    pub chosen_slot_id: String,
    pub days: Vec<char>,
    pub start: String,
    pub end: String,
    pub room: String,
    pub duration_minutes: i32,
    pub raw_time: String,
}

/// Una de las soluciones alternativas del TimetableModel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimetableAssignment {
    pub entries: Vec<TimetableEntry>,
}

impl TimetableAssignment {
    pub fn chosen(&self, code: &str, kind: SlotKind) -> Vec<&TimetableEntry> {
        self.entries.iter().filter(|e| e.code == code && e.kind == kind).collect()
    }
}
