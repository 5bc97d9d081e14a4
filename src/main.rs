use log::{error, info};
use std::path::Path;
use std::process::ExitCode;
use timetable_solver::{SolverConfig, TimetableError, loader, report, server, solver};

const USAGE: &str = "usage: timetable-solver [serve [addr] | solve <data_dir> [config.json]]";

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        [] | ["serve"] => serve("127.0.0.1:8080").await,
        ["serve", addr] => serve(addr).await,
        ["solve", dir] => solve_offline(Path::new(dir), None),
        ["solve", dir, config] => solve_offline(Path::new(dir), Some(Path::new(config))),
        _ => {
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<SolverConfig, TimetableError> {
    let base = match path {
        Some(p) => SolverConfig::from_json_file(p)?,
        None => SolverConfig::default(),
    };
    Ok(base.with_env()?)
}

async fn serve(addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(None)?;
    server::run_server(addr, config).await?;
    Ok(())
}

/// Prints the timetable records as JSON on stdout, `[]` when no timetable exists.
fn solve_offline(dir: &Path, config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let dataset = loader::load_dataset(dir)?;

    match solver::solve(&dataset, &config) {
        Ok(timetable) => {
            info!("{}", report::render_timetable(&timetable.records, &dataset));
            for unmet in &timetable.unmet_soft_constraints {
                info!("{}", unmet);
            }
            println!("{}", serde_json::to_string(&timetable.records)?);
            Ok(())
        }
        Err(e) if e.is_infeasible() => {
            error!("No timetable: {}", e);
            println!("[]");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
