// Asignación de secciones y laboratorios con enumeración de horarios alternativos.
//
// Por cada curso deseado: una binaria por sección y, si tiene, una por
// laboratorio. Exactamente una sección (y un laboratorio si existen); dos
// franjas que chocan no pueden elegirse juntas. No hay objetivo: se piden
// hasta `pool_size` soluciones factibles y se devuelven `max_alternatives`.
use std::collections::BTreeSet;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::algorithm::conflict::{self, TimeSlot};
use crate::algorithm::extract::timetable_from_pool;
use crate::error::{PlannerError, Result};
use crate::models::{Catalog, Course, Section, SlotKind, TimetableAssignment};
use crate::solver::{Direction, LinearExpr, MilpBackend, MilpModel, Sense, VarId};

#[derive(Debug, Clone)]
pub struct TimetableOptions {
    pub pool_size: usize,
    pub max_alternatives: usize,
    pub time_limit: Option<Duration>,
}

impl Default for TimetableOptions {
    fn default() -> Self {
        TimetableOptions { pool_size: 50, max_alternatives: 10, time_limit: None }
    }
}

/// Franja fijada externamente: el curso debe tomar exactamente esa sección o laboratorio.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SlotPin {
    pub code: String,
    pub time: String,
}

impl SlotPin {
    pub fn new(code: impl Into<String>, time: impl Into<String>) -> Self {
        SlotPin { code: code.into(), time: time.into() }
    }
}

/// Una variable candidata del modelo.
#[derive(Debug, Clone)]
pub(crate) struct SlotVar {
    pub var: VarId,
    pub course: Course,
    pub kind: SlotKind,
    pub section: Section,
    /// `None` para la sección implícita (sin horario).
    pub slot: Option<TimeSlot>,
    pub blocks: BTreeSet<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TimetableReport {
    pub timetables: Vec<TimetableAssignment>,
    /// Soluciones obtenidas del pool antes de truncar.
    pub solution_count: usize,
}

pub struct TimetableModel<'a> {
    catalog: &'a Catalog,
    desired: Vec<String>,
    pins: Vec<SlotPin>,
    options: TimetableOptions,
}

impl<'a> TimetableModel<'a> {
    pub fn new<I, S>(catalog: &'a Catalog, desired: I, options: TimetableOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut desired: Vec<String> = desired.into_iter().map(Into::into).collect();
        desired.sort();
        desired.dedup();
        TimetableModel { catalog, desired, pins: Vec::new(), options }
    }

    pub fn with_pins(mut self, pins: Vec<SlotPin>) -> Self {
        self.pins = pins;
        self
    }

    fn slot_var(model: &mut MilpModel, course: &Course, kind: SlotKind, section: Section) -> Result<SlotVar> {
        let tag = match kind {
            SlotKind::Section => "sec",
            SlotKind::Lab => "lab",
        };
        let var = model.add_binary(format!("{tag}[{},{}]", course.code, section.time));
        let slot = if section.is_placeholder() { None } else { Some(conflict::parse(&section.time)?) };
        let blocks = slot.as_ref().map(TimeSlot::blocks).unwrap_or_default();
        Ok(SlotVar { var, course: course.clone(), kind, section, slot, blocks })
    }

    pub(crate) fn build(&self) -> Result<(MilpModel, Vec<SlotVar>)> {
        let mut model = MilpModel::new("timetable");
        model.set_time_limit(self.options.time_limit);
        model.set_pool_size(self.options.pool_size);
        let mut slots: Vec<SlotVar> = Vec::new();

        for code in &self.desired {
            let course = self.catalog.require(code)?;

            let mut sections = Vec::new();
            for section in course.effective_sections() {
                let sv = Self::slot_var(&mut model, course, SlotKind::Section, section)?;
                sections.push(sv.var);
                slots.push(sv);
            }
            model.add_constraint(format!("una_seccion[{code}]"), LinearExpr::sum(sections), Sense::Eq, 1.0);

            if !course.labs.is_empty() {
                let mut labs = Vec::new();
                for lab in &course.labs {
                    let sv = Self::slot_var(&mut model, course, SlotKind::Lab, lab.clone())?;
                    labs.push(sv.var);
                    slots.push(sv);
                }
                model.add_constraint(format!("un_lab[{code}]"), LinearExpr::sum(labs), Sense::Eq, 1.0);
            }
        }

        let mut exclusions = 0usize;
        for i in 0..slots.len() {
            for j in (i + 1)..slots.len() {
                let (a, b) = (&slots[i], &slots[j]);
                // Dos secciones (o dos labs) del mismo curso ya se excluyen por "exactamente uno".
                if a.course.code == b.course.code && a.kind == b.kind {
                    continue;
                }
                if a.blocks.is_disjoint(&b.blocks) {
                    continue;
                }
                model.add_constraint(
                    format!("choque[{},{}|{},{}]", a.course.code, a.section.time, b.course.code, b.section.time),
                    LinearExpr::sum([a.var, b.var]),
                    Sense::Le,
                    1.0,
                );
                exclusions += 1;
            }
        }
        debug!("timetable: {} pares en conflicto", exclusions);

        for pin in &self.pins {
            let course = self.catalog.require(&pin.code)?;
            if !self.desired.contains(&pin.code) {
                return Err(PlannerError::InvalidInput(format!(
                    "pinned course {} is not among the desired courses",
                    pin.code
                )));
            }
            let Some(sv) = slots.iter().find(|s| s.course.code == course.code && s.section.time == pin.time) else {
                return Err(PlannerError::InvalidInput(format!(
                    "course {} has no section or lab '{}'",
                    pin.code, pin.time
                )));
            };
            model.fix(format!("fijo[{},{}]", pin.code, pin.time), sv.var, 1.0);
        }

        model.set_objective(LinearExpr::new(), Direction::Minimize);
        Ok((model, slots))
    }

    pub fn solve(&self, backend: &dyn MilpBackend) -> Result<TimetableReport> {
        let (model, slots) = self.build()?;
        let result = model.optimize(backend);
        result.ensure_solution(&model)?;

        let mut timetables = timetable_from_pool(&result, &slots);
        let solution_count = timetables.len();
        timetables.truncate(self.options.max_alternatives);
        info!("timetable: {} soluciones, se presentan {}", solution_count, timetables.len());
        Ok(TimetableReport { timetables, solution_count })
    }
}
