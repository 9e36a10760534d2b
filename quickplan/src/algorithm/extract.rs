// Traducción de valores del solver a resultados estructurados.
use std::collections::BTreeMap;

use crate::algorithm::dependency::{DependencyGraph, ImportanceScores};
use crate::algorithm::full_plan::{BuiltPlan, FullPlanOptions};
use crate::algorithm::timetable::SlotVar;
use crate::models::{
    academic_year, is_summer, Catalog, ObjectiveBreakdown, PlanAssignment, PlanStats, PlannedCourse,
    Semester, SemesterPlan, Term, TimetableAssignment, TimetableEntry,
};
use crate::solver::SolveResult;

/// Agrupa los `y[c,s] > 0.5` de la incumbente por semestre. Los semestres
/// sin cursos no aparecen en el plan.
pub(crate) fn plan_from_solution(
    result: &SolveResult,
    built: &BuiltPlan,
    catalog: &Catalog,
    importance: &ImportanceScores,
    options: &FullPlanOptions,
) -> PlanAssignment {
    let mut by_semester: BTreeMap<Semester, Vec<String>> = BTreeMap::new();
    for ((code, s), &v) in &built.y {
        if result.is_set(0, v) {
            by_semester.entry(*s).or_default().push(code.clone());
        }
    }

    let graph = DependencyGraph::from_catalog(catalog);
    let semesters: Vec<SemesterPlan> = by_semester
        .into_iter()
        .map(|(number, codes)| {
            let courses: Vec<PlannedCourse> = codes
                .iter()
                .filter_map(|code| catalog.get(code))
                .map(|course| PlannedCourse {
                    code: course.code.clone(),
                    name: course.name.clone(),
                    credits: course.credits,
                    prerequisites: course.prerequisites.clone(),
                    unlocks: graph.unlocks(&course.code),
                })
                .collect();
            SemesterPlan {
                number,
                term: Term::of_semester(number),
                year: academic_year(number),
                total_credits: courses.iter().map(|c| c.credits).sum(),
                courses,
            }
        })
        .collect();

    let stats = PlanStats::from_semesters(&semesters);
    let objective = objective_breakdown(&semesters, &built.semesters, catalog, importance, options);
    PlanAssignment { semesters, stats, objective }
}

/// Evalúa cada término del objetivo sobre el plan extraído. La carga se
/// reporta como varianza exacta, no como la desviación lineal que optimiza el modelo.
pub fn objective_breakdown(
    plan: &[SemesterPlan],
    horizon: &[Semester],
    catalog: &Catalog,
    importance: &ImportanceScores,
    options: &FullPlanOptions,
) -> ObjectiveBreakdown {
    let mut out = ObjectiveBreakdown::default();
    let nominal = options.nominal_semesters;

    for sem in plan {
        let s = sem.number;
        for c in &sem.courses {
            out.importance += importance.get(&c.code) as f64 * s as f64;
            if s <= nominal {
                let target = catalog.get(&c.code).and_then(|x| x.year).unwrap_or_else(|| academic_year(s));
                out.year_penalty += (academic_year(s) as f64 - target as f64).abs();
            } else {
                out.overrun_penalty += s as f64;
            }
        }
    }

    let loads: Vec<f64> = horizon
        .iter()
        .filter(|&&s| !is_summer(s))
        .map(|&s| {
            plan.iter()
                .find(|p| p.number == s)
                .map(|p| p.courses.iter().filter_map(|c| catalog.get(&c.code)).map(|c| c.weight).sum())
                .unwrap_or(0.0)
        })
        .collect();
    if !loads.is_empty() {
        let mean = loads.iter().sum::<f64>() / loads.len() as f64;
        out.mean_workload = mean;
        out.workload_variance = loads.iter().map(|w| (w - mean).powi(2)).sum();
    }
    out
}

/// Una `TimetableAssignment` por solución del pool, leyendo cada variable
/// en esa solución y no en la incumbente.
pub(crate) fn timetable_from_pool(result: &SolveResult, slots: &[SlotVar]) -> Vec<TimetableAssignment> {
    (0..result.pool_size())
        .map(|k| {
            let entries = slots
                .iter()
                .filter(|sv| result.is_set(k, sv.var))
                .map(|sv| {
                    let (days, start, end, duration) = match &sv.slot {
                        Some(slot) => (slot.day_codes(), slot.start.clone(), slot.end.clone(), slot.duration_minutes()),
                        None => (Vec::new(), String::new(), String::new(), 0),
                    };
                    TimetableEntry {
                        code: sv.course.code.clone(),
                        name: sv.course.name.clone(),
                        kind: sv.kind,
                        chosen_slot_id: sv.section.time.clone(),
                        days,
                        start,
                        end,
                        room: sv.section.room.clone().unwrap_or_default(),
                        duration_minutes: duration,
                        raw_time: sv.section.time.clone(),
                    }
                })
                .collect();
            TimetableAssignment { entries }
        })
        .collect()
}
