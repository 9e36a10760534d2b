// Estructuras de datos principales: catálogo de cursos, secciones y progreso del estudiante.
mod plan;

pub use plan::{
    FixedOverride, ObjectiveBreakdown, PlanAssignment, PlanStats, PlannedCourse, PlanRecord,
    SemesterPlan, SlotKind, TimetableAssignment, TimetableEntry,
};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};

/// Índice de semestre (1 = primer otoño del plan de estudios).
pub type Semester = u32;

/// Identificador de la sección implícita de un curso sin horarios publicados.
pub const PLACEHOLDER_SECTION: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Term {
    Fall,
    Spring,
    Summer,
}

impl Term {
    /// fall si `s mod 3 = 1`, spring si `= 2`, summer si `= 0`.
    pub fn of_semester(s: Semester) -> Term {
        match s % 3 {
            1 => Term::Fall,
            2 => Term::Spring,
            _ => Term::Summer,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Term::Fall => "fall",
            Term::Spring => "spring",
            Term::Summer => "summer",
        };
        f.write_str(s)
    }
}

/// Año académico (1-based) de un semestre: `floor((s-1)/3)+1`.
pub fn academic_year(s: Semester) -> u32 {
    s.saturating_sub(1) / 3 + 1
}

pub fn is_summer(s: Semester) -> bool {
    Term::of_semester(s) == Term::Summer
}

/// Una franja publicada (sección teórica o laboratorio).
///
/// En el JSON de catálogo se acepta tanto `"MW9-11"` como
/// `{"time": "MW9-11", "room": "E-204"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SectionRepr")]
pub struct Section {
    pub time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SectionRepr {
    Bare(String),
    Detailed { time: String, #[serde(default)] room: Option<String> },
}

impl From<SectionRepr> for Section {
    fn from(r: SectionRepr) -> Self {
        match r {
            SectionRepr::Bare(time) => Section { time, room: None },
            SectionRepr::Detailed { time, room } => Section { time, room },
        }
    }
}

impl Section {
    pub fn new(time: impl Into<String>) -> Self {
        Section { time: time.into(), room: None }
    }

    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    pub fn placeholder() -> Self {
        Section::new(PLACEHOLDER_SECTION)
    }

    /// La sección implícita no tiene horario y nunca entra en conflicto.
    pub fn is_placeholder(&self) -> bool {
        self.time == PLACEHOLDER_SECTION
    }
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    /// Se rellena con la clave del mapa al cargar el catálogo.
    #[serde(default)]
    pub code: String,
    pub name: String,
    pub credits: u32,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    /// Esfuerzo estimado (carga de trabajo).
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Año académico sugerido por la malla.
    #[serde(default)]
    pub year: Option<u32>,
    /// Ausente = se ofrece siempre.
    #[serde(default)]
    pub available_in: Option<BTreeSet<Term>>,
    /// Créditos acumulados necesarios para inscribir el curso (p.ej. capstone).
    #[serde(default)]
    pub min_credits: Option<u32>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub labs: Vec<Section>,
    #[serde(default)]
    pub internship: bool,
}

impl Course {
    pub fn new(code: impl Into<String>, name: impl Into<String>, credits: u32) -> Self {
        Course {
            code: code.into(),
            name: name.into(),
            credits,
            prerequisites: Vec::new(),
            weight: default_weight(),
            year: None,
            available_in: None,
            min_credits: None,
            sections: Vec::new(),
            labs: Vec::new(),
            internship: false,
        }
    }

    pub fn with_prerequisites<I, S>(mut self, prereqs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prerequisites = prereqs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_year(mut self, year: u32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn available_in<I: IntoIterator<Item = Term>>(mut self, terms: I) -> Self {
        self.available_in = Some(terms.into_iter().collect());
        self
    }

    pub fn with_min_credits(mut self, min_credits: u32) -> Self {
        self.min_credits = Some(min_credits);
        self
    }

    pub fn with_sections<I, S>(mut self, sections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Section>,
    {
        self.sections = sections.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_labs<I, S>(mut self, labs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Section>,
    {
        self.labs = labs.into_iter().map(Into::into).collect();
        self
    }

    pub fn as_internship(mut self) -> Self {
        self.internship = true;
        self
    }

    pub fn is_offered_in(&self, term: Term) -> bool {
        self.available_in.as_ref().map_or(true, |terms| terms.contains(&term))
    }

    /// Secciones efectivas: las publicadas o, si no hay ninguna, la sección implícita.
    pub fn effective_sections(&self) -> Vec<Section> {
        if self.sections.is_empty() {
            vec![Section::placeholder()]
        } else {
            self.sections.clone()
        }
    }
}

impl From<&str> for Section {
    fn from(s: &str) -> Self {
        Section::new(s)
    }
}

impl From<String> for Section {
    fn from(s: String) -> Self {
        Section::new(s)
    }
}

/// Catálogo validado: código -> curso.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    courses: BTreeMap<String, Course>,
}

impl Catalog {
    /// Construye y valida el catálogo (créditos y peso positivos, año >= 1,
    /// prerequisitos acíclicos).
    pub fn new<I: IntoIterator<Item = Course>>(courses: I) -> Result<Self> {
        let courses = courses
            .into_iter()
            .map(|c| (c.code.clone(), c))
            .collect::<BTreeMap<_, _>>();
        let catalog = Catalog { courses };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Parsea el mapeo JSON `código -> {name, credits, ...}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, Course> = serde_json::from_str(json)?;
        Catalog::new(raw.into_iter().map(|(code, mut c)| {
            c.code = code;
            c
        }))
    }

    fn validate(&self) -> Result<()> {
        for (code, c) in &self.courses {
            if code.trim().is_empty() {
                return Err(PlannerError::InvalidInput("course with empty code".to_string()));
            }
            if c.credits == 0 {
                return Err(PlannerError::InvalidInput(format!("course {code} must have positive credits")));
            }
            if !(c.weight.is_finite() && c.weight > 0.0) {
                return Err(PlannerError::InvalidInput(format!("course {code} must have a positive weight")));
            }
            if c.year == Some(0) {
                return Err(PlannerError::InvalidInput(format!("course {code}: year is 1-based")));
            }
        }
        let graph = crate::algorithm::dependency::DependencyGraph::from_catalog(self);
        if let Some(cycle) = graph.find_cycle() {
            return Err(PlannerError::PrerequisiteCycle { cycle });
        }
        Ok(())
    }

    pub fn get(&self, code: &str) -> Option<&Course> {
        self.courses.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.courses.contains_key(code)
    }

    /// Igual que `get` pero con error de validación (y sugerencia) si no existe.
    pub fn require(&self, code: &str) -> Result<&Course> {
        self.courses.get(code).ok_or_else(|| PlannerError::unknown_course(code, self.codes()))
    }

    pub fn courses(&self) -> impl Iterator<Item = &Course> {
        self.courses.values()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.courses.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    pub fn credits_of<'a, I: IntoIterator<Item = &'a String>>(&self, codes: I) -> u32 {
        codes.into_iter().filter_map(|c| self.get(c)).map(|c| c.credits).sum()
    }
}

/// Avance del estudiante: cursos aprobados y cursos exigidos por la malla.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentProgress {
    pub completed: BTreeSet<String>,
    pub required: BTreeSet<String>,
}

impl StudentProgress {
    /// Progreso con todo el catálogo como exigido.
    pub fn for_catalog<I, S>(catalog: &Catalog, completed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StudentProgress {
            completed: completed.into_iter().map(Into::into).collect(),
            required: catalog.codes().map(str::to_string).collect(),
        }
    }

    pub fn remaining(&self) -> BTreeSet<String> {
        self.required.difference(&self.completed).cloned().collect()
    }

    /// Créditos ya obtenidos (sólo cuentan cursos presentes en el catálogo).
    pub fn earned_credits(&self, catalog: &Catalog) -> u32 {
        catalog.credits_of(&self.completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_and_year_of_semester() {
        assert_eq!(Term::of_semester(1), Term::Fall);
        assert_eq!(Term::of_semester(2), Term::Spring);
        assert_eq!(Term::of_semester(3), Term::Summer);
        assert_eq!(Term::of_semester(13), Term::Fall);
        assert_eq!(academic_year(1), 1);
        assert_eq!(academic_year(3), 1);
        assert_eq!(academic_year(4), 2);
        assert_eq!(academic_year(10), 4);
        assert_eq!(academic_year(13), 5);
    }

    #[test]
    fn test_catalog_from_json_defaults() {
        let json = r#"{
            "MATH111": {"name": "Calculus I", "credits": 4, "prerequisites": [], "weight": 2, "year": 1},
            "COSC497": {"name": "Senior Design", "credits": 3, "prerequisites": ["MATH111"],
                        "sections": ["TT9-11", {"time": "MW4-6", "room": "E-204"}],
                        "min_credits": 90, "available_in": ["fall", "spring"]}
        }"#;
        let catalog = Catalog::from_json(json).unwrap();
        let sdp = catalog.get("COSC497").unwrap();
        assert_eq!(sdp.code, "COSC497");
        assert_eq!(sdp.weight, 1.0);
        assert_eq!(sdp.min_credits, Some(90));
        assert_eq!(sdp.sections[1].room.as_deref(), Some("E-204"));
        assert!(!sdp.is_offered_in(Term::Summer));
        assert!(catalog.get("MATH111").unwrap().is_offered_in(Term::Summer));
        assert_eq!(catalog.get("MATH111").unwrap().effective_sections(), vec![Section::placeholder()]);
    }

    #[test]
    fn test_catalog_rejects_zero_credits() {
        let err = Catalog::new(vec![Course::new("X", "X", 0)]).unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn test_progress_remaining() {
        let catalog = Catalog::new(vec![
            Course::new("A", "A", 3),
            Course::new("B", "B", 4).with_prerequisites(["A"]),
        ])
        .unwrap();
        let progress = StudentProgress::for_catalog(&catalog, ["A"]);
        assert_eq!(progress.remaining().into_iter().collect::<Vec<_>>(), vec!["B".to_string()]);
        assert_eq!(progress.earned_credits(&catalog), 3);
    }
}
