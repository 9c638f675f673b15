//! audiorule simulator
//!
//! Loads a controller configuration and a scenario, replays the scenario's
//! triggers through the policy engine against an in-memory audio graph and
//! prints the action lists the engine delivers.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tracing::info;

use audiorule_core::InMemoryRuntime;
use audiorule_policy::{ConfigStore, PolicyEngine};

mod scenario;

use scenario::Scenario;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "audiorule-sim")]
#[command(about = "Replay audio-routing triggers through the audiorule policy engine", long_about = None)]
struct Cli {
    /// Controller configuration (YAML, or JSON with a .json extension)
    #[arg(short, long, default_value = "controller.yaml")]
    config: String,

    /// Scenario file with the initial graph and the triggers to replay
    #[arg(short, long)]
    scenario: String,

    /// Output format for delivered action lists
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Print engine counters in Prometheus text format after the replay
    #[arg(short, long)]
    metrics: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let metrics_handle = if cli.metrics {
        Some(init_metrics()?)
    } else {
        None
    };

    let store = ConfigStore::from_file(&cli.config);
    if let Some(reason) = store.load_error() {
        anyhow::bail!("failed to load controller configuration {}: {}", cli.config, reason);
    }
    info!(config = %cli.config, policies = store.policies().len(), "configuration loaded");

    let scenario = Scenario::from_file(&cli.scenario)?;
    info!(
        scenario = %cli.scenario,
        triggers = scenario.triggers.len(),
        apply_actions = scenario.apply_actions,
        "scenario loaded"
    );

    let runtime = Arc::new(InMemoryRuntime::new(scenario.state.clone()));
    let mut engine = PolicyEngine::new(Arc::new(store));
    engine.start(runtime.clone())?;

    let steps = scenario::replay(&engine, &runtime, &scenario);
    engine.stop();

    match cli.format {
        OutputFormat::Text => print!("{}", scenario::render_text(&steps)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&steps)?),
    }

    if let Some(handle) = metrics_handle {
        print!("{}", handle.render());
    }
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("audiorule=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("audiorule=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Install the Prometheus recorder and describe the engine counters
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    audiorule_policy::describe_metrics();
    metrics::describe_counter!(
        "audiorule_sim_steps_total",
        "Replayed scenario triggers by outcome"
    );
    info!("Metrics recorder installed");
    Ok(handle)
}
