//! # kitchen-sim
//!
//! Runs one restaurant simulation: reads the input bundle, lets the scheduled visitors in,
//! and writes the operation, process and visitor order logs.
//!
//! ```bash
//! RUST_LOG=info cargo run -- --input data --options data/options.json --output out
//! ```

use clap::Parser;
use kitchen_sim::config::SimulationConfig;
use kitchen_sim::console::Console;
use kitchen_sim::data::KitchenData;
use kitchen_sim::lifecycle::tracing::setup_tracing;
use kitchen_sim::lifecycle::Restaurant;
use kitchen_sim::output::{JsonReportSink, ReportSink};
use std::path::PathBuf;
use tracing::info;

/// Restaurant kitchen simulation
#[derive(Parser, Debug)]
#[command(name = "kitchen-sim")]
#[command(version)]
#[command(about = "Simulate a restaurant kitchen run by agents", long_about = None)]
struct Args {
    /// Directory holding the input JSON files
    #[arg(short, long, default_value = "data")]
    input: PathBuf,

    /// Options file; defaults apply when omitted
    #[arg(long)]
    options: Option<PathBuf>,

    /// Directory the logs are written to
    #[arg(short, long, default_value = "output")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();
    let args = Args::parse();

    let config = SimulationConfig::load(args.options.as_deref()).map_err(|e| e.to_string())?;
    let data = KitchenData::load(&args.input, config.check_operation_type_availability)
        .map_err(|e| e.to_string())?;
    let console = Console::new(config.print_colored_reports);

    info!(input = %args.input.display(), factor = config.factor(), "Starting simulation");
    let report = Restaurant::start(config, data, console)
        .run()
        .await
        .map_err(|e| e.to_string())?;

    JsonReportSink::new(&args.output)
        .write(&report)
        .map_err(|e| e.to_string())?;
    info!(output = %args.output.display(), "Simulation complete");
    Ok(())
}
