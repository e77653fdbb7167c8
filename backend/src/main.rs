//! Weather Forecast Pipeline - Command Line
//!
//! Loads configuration and trained artifacts once, then forecasts, reports
//! current conditions or evaluates over CSV observation files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use shared::{validate_location_name, Location, Observation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use weather_forecast_backend::config::{Config, LoggingConfig};
use weather_forecast_backend::external::{
    ArtifactStore, CsvObservationSource, FileArtifactStore, ObservationQuery, ObservationSource,
};
use weather_forecast_backend::services::{ForecastPipeline, ForecastRunner, LocationRequest};

#[derive(Parser)]
#[command(name = "wxf")]
#[command(about = "Hourly weather forecasting from NASA POWER observations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast every input file concurrently
    Forecast {
        /// Observation CSV files, one per location
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Location labels, matched to inputs by position
        #[arg(short, long, num_args = 1..)]
        name: Vec<String>,

        /// Write the JSON report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Classify the latest observation
    Current(SingleInput),
    /// Score the model against held-out hours
    Evaluate {
        #[arg(short, long)]
        input: PathBuf,

        /// Directory for model_vs_baseline.csv and real_predictions.csv
        #[arg(long)]
        output_dir: PathBuf,
    },
}

#[derive(Args)]
struct SingleInput {
    #[arg(short, long)]
    input: PathBuf,

    #[arg(short, long)]
    name: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load()?;
    init_tracing(&config.logging);

    tracing::info!("Starting weather forecast pipeline");
    tracing::info!("Environment: {}", config.environment);

    let store = FileArtifactStore::from_config(&config.artifacts);
    let pipeline = Arc::new(ForecastPipeline::new(
        config.pipeline.clone(),
        store.load_scaler()?,
        store.load_model()?,
    )?);

    match cli.command {
        Commands::Forecast {
            input,
            name,
            output,
        } => {
            let mut requests = Vec::with_capacity(input.len());
            for (i, path) in input.iter().enumerate() {
                let observations = read_all(path)?;
                let location = location_for(path, name.get(i).cloned(), &observations)?;
                requests.push(LocationRequest {
                    location,
                    observations,
                });
            }

            let reports = ForecastRunner::new(pipeline).run(requests).await;
            let json = serde_json::to_string_pretty(&reports)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("writing {}", path.display()))?;
                    tracing::info!(path = %path.display(), "Wrote forecast report");
                }
                None => println!("{}", json),
            }
        }
        Commands::Current(args) => {
            let observations = read_all(&args.input)?;
            let location = location_for(&args.input, args.name, &observations)?;
            let current = pipeline.current(location, &observations)?;
            println!("{}", serde_json::to_string_pretty(&current)?);
        }
        Commands::Evaluate { input, output_dir } => {
            let observations = read_all(&input)?;
            let pipeline = Arc::clone(&pipeline);
            let report =
                tokio::task::spawn_blocking(move || pipeline.evaluate(&observations)).await??;
            report.write_csv(&output_dir)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

/// RUST_LOG wins over the configured filter
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn read_all(path: &Path) -> anyhow::Result<Vec<Observation>> {
    CsvObservationSource::new(path)
        .fetch(&ObservationQuery::all())
        .with_context(|| format!("reading observations from {}", path.display()))
}

/// Label defaults to the file stem; coordinates come from the first row
fn location_for(
    path: &Path,
    name: Option<String>,
    observations: &[Observation],
) -> anyhow::Result<Location> {
    let name = name.unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "location".to_string())
    });
    validate_location_name(&name).map_err(|msg| anyhow::anyhow!("{}: {}", msg, name))?;

    let (latitude, longitude) = observations
        .first()
        .map(|o| (o.latitude, o.longitude))
        .unwrap_or_default();
    Ok(Location::new(name, latitude, longitude))
}
