use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use assign_engine::assignment::{AssignmentConfig, Controller, RunSummary};
use assign_engine::demand::{load_schedule, load_trip_list};
use assign_engine::report::Reporter;
use assign_engine::search::mock::FixtureFactory;

/// Top-level run description: the assignment parameters plus where the
/// input tables and outputs live.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RunConfig {
    #[serde(default)]
    assignment: AssignmentConfig,
    schedule_file: PathBuf,
    trip_list_file: PathBuf,
    /// Canned search results served by the fixture capability. A deployment
    /// with the real label-setting search plugs its own factory in here.
    pathset_fixture_file: PathBuf,
    output_dir: PathBuf,
}

fn load_run_config(path: &str) -> Result<RunConfig, Box<dyn std::error::Error + Send + Sync>> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read run config {path}: {e}"))?;
    Ok(serde_json::from_str(&json)
        .map_err(|e| format!("cannot parse run config {path}: {e}"))?)
}

fn execute(config_path: String) -> Result<RunSummary, Box<dyn std::error::Error + Send + Sync>> {
    let run_config = load_run_config(&config_path)?;
    run_config.assignment.validate()?;
    let reference = run_config.assignment.reference_date()?;

    let schedule = load_schedule(&run_config.schedule_file, reference)?;
    let requests = load_trip_list(&run_config.trip_list_file, reference)?;
    info!(
        schedule_rows = schedule.rows().len(),
        requests = requests.len(),
        "inputs loaded"
    );

    let factory = FixtureFactory::from_file(&run_config.pathset_fixture_file)?;
    let reporter = Reporter::new(&run_config.output_dir)?;
    let controller = Controller::new(run_config.assignment, schedule, requests);
    Ok(controller.run(&factory, &reporter)?)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Some(config_path) = std::env::args().nth(1) else {
        eprintln!("usage: assign-engine <run-config.json>");
        std::process::exit(2);
    };

    let run = tokio::task::spawn_blocking(move || execute(config_path));
    tokio::select! {
        // An interrupt kills the whole run: every worker dies with the
        // process, nothing partial is salvaged.
        _ = tokio::signal::ctrl_c() => {
            error!("interrupt received; aborting assignment");
            std::process::exit(2);
        }
        result = run => match result {
            Ok(Ok(summary)) => {
                info!(
                    iterations = summary.iterations,
                    assigned = summary.assigned,
                    arrived = summary.arrived,
                    capacity_gap = summary.capacity_gap,
                    "done"
                );
            }
            Ok(Err(err)) => {
                error!("assignment failed: {err}");
                std::process::exit(2);
            }
            Err(join_err) => {
                error!("assignment aborted: {join_err}");
                std::process::exit(2);
            }
        }
    }
}
