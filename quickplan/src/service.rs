// service.rs - Orquestador de peticiones de planificación
//
// Pipeline de un plan completo:
// PHASE 1: resolver catálogo de la carrera y validar la entrada
//   - índice de carrera, cursos aprobados existentes, semestres no negativos
// PHASE 2: importancia (grafo de prerequisitos)
// PHASE 3: overrides persistidos (cursos fijados a un semestre)
//   - el store es común a todas las carreras: sólo se aplican los del catálogo actual
// PHASE 4: construir y resolver FullPlanModel
// PHASE 5: guardar como último plan
//
// Todos los colaboradores (catálogos, stores, backend, configuración) se
// inyectan al construir el servicio.
use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::algorithm::{
    assign_importance, CreditBounds, FullPlanModel, NextSemesterModel, NextSemesterSelection, SlotPin,
    TimetableModel, TimetableReport,
};
use crate::api_json::{self, non_negative, NextSemesterRequest, PlanCommand, PlanRequest, TimetableRequest};
use crate::catalog::{CatalogRepository, MajorInfo};
use crate::config::Settings;
use crate::error::{OutcomeStatus, PlannerError, Result};
use crate::models::{Catalog, FixedOverride, PlanAssignment, PlanRecord, Semester, StudentProgress};
use crate::solver::MilpBackend;
use crate::storage::{OverrideStore, PlanStore};

/// Respuesta de `generate_plan_with_fallback`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanResponse {
    pub status: OutcomeStatus,
    /// `true` si `plan` es el último plan guardado y no uno recién calculado.
    pub fallback: bool,
    pub plan: PlanAssignment,
}

pub struct PlanningService {
    catalogs: Arc<dyn CatalogRepository>,
    overrides: Arc<dyn OverrideStore>,
    plans: Arc<dyn PlanStore>,
    backend: Arc<dyn MilpBackend>,
    settings: Settings,
}

impl PlanningService {
    pub fn new(
        catalogs: Arc<dyn CatalogRepository>,
        overrides: Arc<dyn OverrideStore>,
        plans: Arc<dyn PlanStore>,
        backend: Arc<dyn MilpBackend>,
        settings: Settings,
    ) -> Self {
        PlanningService { catalogs, overrides, plans, backend, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn majors(&self) -> Result<Vec<MajorInfo>> {
        self.catalogs.majors()
    }

    fn credit_bounds(&self, min: Option<i32>, max: Option<i32>) -> Result<CreditBounds> {
        let min = min.map(|v| non_negative("min_credits", v)).transpose()?.unwrap_or(self.settings.min_credits);
        let max = max.map(|v| non_negative("max_credits", v)).transpose()?.unwrap_or(self.settings.max_credits);
        CreditBounds::new(min, max)
    }

    fn progress(catalog: &Catalog, completed: &BTreeSet<String>) -> Result<StudentProgress> {
        for code in completed {
            catalog.require(code)?;
        }
        Ok(StudentProgress::for_catalog(catalog, completed.iter().cloned()))
    }

    fn overrides_for(catalog: &Catalog, stored: Vec<FixedOverride>) -> Vec<FixedOverride> {
        stored
            .into_iter()
            .filter(|o| {
                let known = catalog.contains(&o.code);
                if !known {
                    warn!("override {} -> semestre {} ignorado (no pertenece a esta carrera)", o.code, o.semester);
                }
                known
            })
            .collect()
    }

    pub fn generate_plan(&self, request: &PlanRequest) -> Result<PlanAssignment> {
        info!("PHASE 1: catálogo y validación (carrera {})", request.major);
        let catalog = self.catalogs.major_catalog(request.major)?;
        let progress = Self::progress(&catalog, &request.completed)?;
        let starting_semester = request.starting_semester()?;
        let total_semesters = match request.total_semesters {
            Some(v) => non_negative("total_semesters", v)?,
            None => self.settings.total_semesters,
        };
        let credits = self.credit_bounds(request.min_credits, request.max_credits)?;
        info!(
            "   {} cursos, {} aprobados, semestres {}..={}",
            catalog.len(),
            progress.completed.len(),
            starting_semester,
            total_semesters
        );

        info!("PHASE 2: importancia");
        let importance = assign_importance(&catalog);

        info!("PHASE 3: overrides");
        let fixed = Self::overrides_for(&catalog, self.overrides.load()?);
        info!("   {} cursos fijados", fixed.len());

        info!("PHASE 4: modelo de plan completo");
        let mut options = self.settings.plan_options();
        options.starting_semester = starting_semester;
        options.total_semesters = total_semesters;
        options.credits = credits;
        if let Some(w) = request.weights {
            options.weights = w;
        }
        let plan = FullPlanModel::new(&catalog, &progress, &importance, options)
            .with_fixed(fixed)
            .solve(self.backend.as_ref())?;

        info!("PHASE 5: guardar último plan");
        let record = PlanRecord {
            plan: plan.clone(),
            major: request.major,
            completed: request.completed.iter().cloned().collect(),
            completed_semesters: starting_semester - 1,
            generated_at: Utc::now(),
        };
        self.plans.save_last(&record)?;
        Ok(plan)
    }

    /// Si el modelo es infactible devuelve el último plan guardado marcado
    /// como respaldo. Cualquier otro error se propaga.
    pub fn generate_plan_with_fallback(&self, request: &PlanRequest) -> Result<PlanResponse> {
        match self.generate_plan(request) {
            Ok(plan) => Ok(PlanResponse { status: OutcomeStatus::Optimal, fallback: false, plan }),
            Err(err @ PlannerError::Infeasible { .. }) => match self.plans.load_last()? {
                Some(record) => {
                    warn!("plan infactible, se devuelve el último plan ({})", record.generated_at);
                    Ok(PlanResponse { status: OutcomeStatus::Infeasible, fallback: true, plan: record.plan })
                }
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    /// Aplica comandos estructurados y re-planifica con respaldo. Todos los
    /// `fixCourse` se validan antes de persistir el primero.
    pub fn apply_commands(&self, request: &PlanRequest, commands: &[PlanCommand]) -> Result<PlanResponse> {
        let mut request = request.clone();
        let applied = api_json::apply_commands(
            &mut request,
            commands,
            self.settings.late_total_semesters,
            self.settings.weights,
        )?;
        if !applied.fixes.is_empty() {
            let catalog = self.catalogs.major_catalog(request.major)?;
            let fixes = applied
                .fixes
                .iter()
                .map(|fix| Ok(FixedOverride::new(catalog.require(&fix.code)?.code.clone(), fix.semester)))
                .collect::<Result<Vec<_>>>()?;
            for fix in fixes {
                let added = self.overrides.add(fix.clone())?;
                info!("override {} -> semestre {} ({})", fix.code, fix.semester, if added { "nuevo" } else { "ya existía" });
            }
        }
        self.generate_plan_with_fallback(&request)
    }

    pub fn generate_timetable(&self, request: &TimetableRequest) -> Result<TimetableReport> {
        info!("PHASE 1: oferta y cursos inscritos");
        let offering = self.catalogs.offering()?;
        for code in &request.registered {
            offering.require(code)?;
        }
        let pins: Vec<SlotPin> = request
            .fixed_sections
            .iter()
            .map(|(code, time)| SlotPin::new(code.trim(), time.trim()))
            .collect();
        info!("   {} cursos, {} franjas fijadas", request.registered.len(), pins.len());

        info!("PHASE 2: modelo de horarios");
        TimetableModel::new(&offering, request.registered.iter().cloned(), self.settings.timetable_options())
            .with_pins(pins)
            .solve(self.backend.as_ref())
    }

    pub fn suggest_next_semester(&self, request: &NextSemesterRequest) -> Result<NextSemesterSelection> {
        let catalog = self.catalogs.major_catalog(request.major)?;
        let progress = Self::progress(&catalog, &request.completed)?;
        let done = non_negative("completed_semesters", request.completed_semesters)?;
        let importance = assign_importance(&catalog);

        let mut options = self.settings.next_semester_options();
        options.credits = self.credit_bounds(request.min_credits, request.max_credits)?;
        options.term = Some(crate::models::Term::of_semester(done + 1));
        NextSemesterModel::new(&catalog, &progress, &importance, options).solve(self.backend.as_ref())
    }

    /// Fija `code` en `semester` (append-if-absent). El curso debe existir en la carrera.
    pub fn fix_course(&self, major: usize, code: &str, semester: Semester) -> Result<bool> {
        if semester == 0 {
            return Err(PlannerError::InvalidInput("semester numbers start at 1".to_string()));
        }
        let catalog = self.catalogs.major_catalog(major)?;
        let course = catalog.require(code)?;
        let added = self.overrides.add(FixedOverride::new(course.code.clone(), semester))?;
        info!("override {} -> semestre {} ({})", code, semester, if added { "nuevo" } else { "ya existía" });
        Ok(added)
    }

    pub fn unfix_course(&self, code: &str) -> Result<usize> {
        self.overrides.remove(code)
    }

    pub fn fixed_courses(&self) -> Result<Vec<FixedOverride>> {
        self.overrides.load()
    }

    pub fn last_plan(&self) -> Result<Option<PlanRecord>> {
        self.plans.load_last()
    }
}
