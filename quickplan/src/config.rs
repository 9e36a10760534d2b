//! Configuración del planificador.
//!
//! Se lee de variables de entorno `QUICKPLAN_*` (con un `.env` opcional
//! cargado por `dotenv`). Las ausentes toman el valor por defecto.
use std::collections::BTreeSet;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::algorithm::{CreditBounds, FullPlanOptions, NextSemesterOptions, PlanWeights, TimetableOptions};
use crate::error::{PlannerError, Result};
use crate::models::Semester;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Directorio con `catalogs.json` y los catálogos por carrera.
    pub data_dir: PathBuf,
    pub overrides_path: PathBuf,
    pub last_plan_path: PathBuf,
    pub max_credits: u32,
    pub min_credits: u32,
    pub total_semesters: Semester,
    /// Horizonte usado por el comando `graduateLate`.
    pub late_total_semesters: Semester,
    pub summer_cap: u32,
    pub nominal_semesters: Semester,
    pub time_limit: Option<Duration>,
    pub pool_size: usize,
    pub max_timetables: usize,
    pub weights: PlanWeights,
    pub internship_codes: BTreeSet<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            data_dir: PathBuf::from("data"),
            overrides_path: PathBuf::from("data/fixed_courses.json"),
            last_plan_path: PathBuf::from("data/last_plan.json"),
            max_credits: 18,
            min_credits: 12,
            total_semesters: 12,
            late_total_semesters: 15,
            summer_cap: 6,
            nominal_semesters: 12,
            time_limit: None,
            pool_size: 50,
            max_timetables: 10,
            weights: PlanWeights { alpha: 0.0, beta: 0.0, gamma: 80.0, delta: 30.0 },
            internship_codes: ["ENGR399", "ENGR399(2)"].into_iter().map(String::from).collect(),
        }
    }
}

fn parse_key<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| PlannerError::Config(format!("{key}: invalid value '{raw}'")))
}

impl Settings {
    /// Lee `.env` (si existe) y luego el entorno del proceso.
    pub fn from_env() -> Result<Self> {
        let _ = dotenv::dotenv();
        Settings::from_lookup(|key| env::var(key).ok())
    }

    /// Construye la configuración a partir de una función de búsqueda de claves.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut s = Settings::default();

        if let Some(dir) = lookup("QUICKPLAN_DATA_DIR") {
            s.data_dir = PathBuf::from(&dir);
            s.overrides_path = s.data_dir.join("fixed_courses.json");
            s.last_plan_path = s.data_dir.join("last_plan.json");
        }
        if let Some(p) = lookup("QUICKPLAN_OVERRIDES_PATH") {
            s.overrides_path = PathBuf::from(p);
        }
        if let Some(p) = lookup("QUICKPLAN_LAST_PLAN_PATH") {
            s.last_plan_path = PathBuf::from(p);
        }

        macro_rules! read {
            ($key:literal => $field:expr) => {
                if let Some(raw) = lookup($key) {
                    $field = parse_key($key, &raw)?;
                }
            };
        }
        read!("QUICKPLAN_MAX_CREDITS" => s.max_credits);
        read!("QUICKPLAN_MIN_CREDITS" => s.min_credits);
        read!("QUICKPLAN_TOTAL_SEMESTERS" => s.total_semesters);
        read!("QUICKPLAN_LATE_TOTAL_SEMESTERS" => s.late_total_semesters);
        read!("QUICKPLAN_SUMMER_CAP" => s.summer_cap);
        read!("QUICKPLAN_NOMINAL_SEMESTERS" => s.nominal_semesters);
        read!("QUICKPLAN_POOL_SIZE" => s.pool_size);
        read!("QUICKPLAN_MAX_TIMETABLES" => s.max_timetables);
        read!("QUICKPLAN_ALPHA" => s.weights.alpha);
        read!("QUICKPLAN_BETA" => s.weights.beta);
        read!("QUICKPLAN_GAMMA" => s.weights.gamma);
        read!("QUICKPLAN_DELTA" => s.weights.delta);

        if let Some(raw) = lookup("QUICKPLAN_TIME_LIMIT_SECS") {
            let secs: f64 = parse_key("QUICKPLAN_TIME_LIMIT_SECS", &raw)?;
            if !(secs.is_finite() && secs > 0.0) {
                return Err(PlannerError::Config(format!("QUICKPLAN_TIME_LIMIT_SECS must be positive, got {raw}")));
            }
            s.time_limit = Some(Duration::from_secs_f64(secs));
        }
        if let Some(raw) = lookup("QUICKPLAN_INTERNSHIP_CODES") {
            s.internship_codes = raw
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect();
        }

        s.validate()?;
        Ok(s)
    }

    fn validate(&self) -> Result<()> {
        if self.min_credits > self.max_credits {
            return Err(PlannerError::Config(format!(
                "min credits ({}) greater than max credits ({})",
                self.min_credits, self.max_credits
            )));
        }
        if self.pool_size == 0 || self.max_timetables == 0 {
            return Err(PlannerError::Config("pool size and max timetables must be positive".to_string()));
        }
        let w = self.weights;
        if ![w.alpha, w.beta, w.gamma, w.delta].iter().all(|x| x.is_finite()) {
            return Err(PlannerError::Config("objective weights must be finite".to_string()));
        }
        Ok(())
    }

    pub fn credit_bounds(&self) -> CreditBounds {
        CreditBounds { min: self.min_credits, max: self.max_credits }
    }

    /// Opciones de plan completo con los valores por defecto de esta configuración.
    pub fn plan_options(&self) -> FullPlanOptions {
        FullPlanOptions {
            starting_semester: 1,
            total_semesters: self.total_semesters,
            credits: self.credit_bounds(),
            summer_cap: self.summer_cap,
            nominal_semesters: self.nominal_semesters,
            weights: self.weights,
            internship_codes: self.internship_codes.clone(),
            time_limit: self.time_limit,
        }
    }

    pub fn timetable_options(&self) -> TimetableOptions {
        TimetableOptions {
            pool_size: self.pool_size,
            max_alternatives: self.max_timetables,
            time_limit: self.time_limit,
        }
    }

    pub fn next_semester_options(&self) -> NextSemesterOptions {
        NextSemesterOptions {
            credits: self.credit_bounds(),
            time_limit: self.time_limit,
            ..NextSemesterOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let s = Settings::from_lookup(|_| None).unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.weights.gamma, 80.0);
        assert!(s.internship_codes.contains("ENGR399(2)"));
    }

    #[test]
    fn test_overrides_and_data_dir() {
        let s = Settings::from_lookup(lookup(&[
            ("QUICKPLAN_DATA_DIR", "/srv/plan"),
            ("QUICKPLAN_MAX_CREDITS", "21"),
            ("QUICKPLAN_TIME_LIMIT_SECS", "2.5"),
            ("QUICKPLAN_INTERNSHIP_CODES", "COOP300, ENGR399 ,"),
        ]))
        .unwrap();
        assert_eq!(s.max_credits, 21);
        assert_eq!(s.overrides_path, PathBuf::from("/srv/plan/fixed_courses.json"));
        assert_eq!(s.time_limit, Some(Duration::from_millis(2500)));
        assert_eq!(s.internship_codes.len(), 2);
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let err = Settings::from_lookup(lookup(&[("QUICKPLAN_MAX_CREDITS", "many")])).unwrap_err();
        assert!(matches!(err, PlannerError::Config(_)));
        let err = Settings::from_lookup(lookup(&[("QUICKPLAN_MIN_CREDITS", "20")])).unwrap_err();
        assert!(matches!(err, PlannerError::Config(_)));
    }
}
