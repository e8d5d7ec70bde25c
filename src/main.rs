use clap::Parser;
use restaurant_dedup::config::Settings;
use restaurant_dedup::services::{read_records, write_records};
use restaurant_dedup::{Pipeline, PipelineError, PipelineReport, Stage};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Clean, geo-enrich and deduplicate restaurant listings
#[derive(Debug, Parser)]
#[command(name = "restaurant-dedup", version, about)]
struct Cli {
    /// Raw listings CSV
    #[arg(short, long)]
    input: PathBuf,

    /// Destination for the cleaned CSV
    #[arg(short, long)]
    output: PathBuf,

    /// Configuration file (defaults to config/default.toml and config/local.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the run summary as JSON
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Stop after this stage
    #[arg(long, value_enum, default_value_t = Stage::Full)]
    stage: Stage,
}

fn init_logging(settings: &Settings) {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.logging.level.clone());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.logging.format.clone());

    let filter = EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    match log_format.as_str() {
        "pretty" => subscriber.pretty().init(),
        "json" => subscriber.json().init(),
        _ => subscriber.compact().init(),
    }
}

fn write_report(path: &Path, report: &PipelineReport) -> Result<(), std::io::Error> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, report)?;
    Ok(())
}

fn run(cli: &Cli, settings: &Settings) -> Result<(), PipelineError> {
    let pipeline = Pipeline::from_settings(settings)?;

    let raw = read_records(&cli.input)?;
    info!(path = %cli.input.display(), rows = raw.len(), "input loaded");

    let output = pipeline.run(raw, cli.stage)?;

    write_records(&cli.output, &output.records)?;
    info!(path = %cli.output.display(), rows = output.records.len(), "cleaned table written");

    if let Some(path) = &cli.report {
        match write_report(path, &output.report) {
            Ok(()) => info!(path = %path.display(), "report written"),
            Err(e) => error!("Failed to write report to {}: {}", path.display(), e),
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    // Load .env file if present
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&settings);
    info!(stage = cli.stage.as_str(), "Starting restaurant dedup pipeline...");

    match run(&cli, &settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Pipeline aborted: {}", e);
            ExitCode::FAILURE
        }
    }
}
