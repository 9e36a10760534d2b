// --- Planificador de carrera - línea de comandos ---
//
// Cada subcomando imprime JSON en stdout; los logs van a stderr.
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use quickplan::api_json::{parse_course_list, NextSemesterRequest, PlanCommand, PlanRequest, TimetableRequest};
use quickplan::catalog::FileCatalogRepository;
use quickplan::solver::GoodLpBackend;
use quickplan::storage::JsonFileStore;
use quickplan::{logging, PlannerError, PlanningService, Settings};

#[derive(Parser)]
#[command(name = "quickplan", version, about = "Course plan and timetable generator")]
struct Cli {
    /// Nivel de log si RUST_LOG no está definido
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Plan completo hasta graduarse
    Plan {
        #[arg(long)]
        major: usize,
        /// Cursos aprobados, separados por comas
        #[arg(long, default_value = "")]
        completed: String,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        completed_semesters: i32,
        #[arg(long, allow_negative_numbers = true)]
        total_semesters: Option<i32>,
        #[arg(long, allow_negative_numbers = true)]
        max_credits: Option<i32>,
        #[arg(long, allow_negative_numbers = true)]
        min_credits: Option<i32>,
    },
    /// Sugerencia de cursos para el próximo semestre
    Next {
        #[arg(long)]
        major: usize,
        #[arg(long, default_value = "")]
        completed: String,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        completed_semesters: i32,
    },
    /// Horarios alternativos para los cursos inscritos
    Timetable {
        #[arg(long)]
        registered: String,
        /// Franja fijada, `CODE=MW9-11` (repetible)
        #[arg(long = "fix")]
        fixed: Vec<String>,
    },
    /// Fija un curso en un semestre
    Fix {
        #[arg(long)]
        major: usize,
        code: String,
        semester: u32,
    },
    /// Quita los overrides de un curso
    Unfix { code: String },
    /// Aplica comandos estructurados (JSON) y re-planifica
    Commands {
        /// Petición de plan en JSON
        #[arg(long)]
        request: String,
        /// Lista de comandos en JSON
        #[arg(long)]
        commands: String,
    },
    /// Último plan guardado
    Last,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), PlannerError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_pin(raw: &str) -> Result<(String, String), PlannerError> {
    raw.split_once('=')
        .map(|(c, t)| (c.trim().to_string(), t.trim().to_string()))
        .ok_or_else(|| PlannerError::InvalidInput(format!("expected CODE=TIME, got '{raw}'")))
}

fn run(cli: Cli) -> Result<(), PlannerError> {
    let settings = Settings::from_env()?;
    let catalogs = Arc::new(FileCatalogRepository::open(&settings.data_dir)?);
    let store = Arc::new(JsonFileStore::new(&settings.overrides_path, &settings.last_plan_path));
    let service = PlanningService::new(catalogs, store.clone(), store, Arc::new(GoodLpBackend::new()), settings);

    match cli.command {
        Command::Plan { major, completed, completed_semesters, total_semesters, max_credits, min_credits } => {
            let request = PlanRequest {
                major,
                completed: parse_course_list(&completed),
                completed_semesters,
                total_semesters,
                max_credits,
                min_credits,
                weights: None,
            };
            print_json(&service.generate_plan_with_fallback(&request)?)
        }
        Command::Next { major, completed, completed_semesters } => {
            let request = NextSemesterRequest {
                major,
                completed: parse_course_list(&completed),
                completed_semesters,
                ..NextSemesterRequest::default()
            };
            print_json(&service.suggest_next_semester(&request)?)
        }
        Command::Timetable { registered, fixed } => {
            let request = TimetableRequest {
                registered: parse_course_list(&registered),
                fixed_sections: fixed.iter().map(|f| parse_pin(f)).collect::<Result<_, _>>()?,
            };
            print_json(&service.generate_timetable(&request)?)
        }
        Command::Fix { major, code, semester } => {
            let added = service.fix_course(major, &code, semester)?;
            print_json(&json!({ "added": added, "fixed": service.fixed_courses()? }))
        }
        Command::Unfix { code } => {
            let removed = service.unfix_course(&code)?;
            print_json(&json!({ "removed": removed, "fixed": service.fixed_courses()? }))
        }
        Command::Commands { request, commands } => {
            let request: PlanRequest = serde_json::from_str(&request)?;
            let commands: Vec<PlanCommand> = serde_json::from_str(&commands)?;
            print_json(&service.apply_commands(&request, &commands)?)
        }
        Command::Last => print_json(&service.last_plan()?),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_with_level(&cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let body = json!({
                "status": err.status(),
                "input_error": err.is_input_error(),
                "error": err.to_string(),
            });
            println!("{body}");
            ExitCode::FAILURE
        }
    }
}
