//! Air Quality CO Predictor CLI
//!
//! A command-line tool for training the CO predictor, scoring readings
//! locally or against a running server, and generating demo data.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use aq_lib::data::SyntheticConfig;
use aq_lib::training::{OutlierScope, DEFAULT_SEED};
use clap::{Parser, Subcommand};
use commands::{data, predict, read_request, remote, train};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Air Quality CO Predictor CLI
#[derive(Parser)]
#[command(name = "aqp")]
#[command(author, version, about = "CLI for the Air Quality CO Predictor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via AQP_API_URL env var)
    #[arg(long, env = "AQP_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, global = true)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train the scaler, OOD detector and CO regressor from a dataset
    Train {
        /// Semicolon-separated dataset in the UCI layout
        #[arg(long)]
        data: PathBuf,

        /// Directory receiving the artifacts
        #[arg(long)]
        models_dir: Option<PathBuf>,

        /// Seed for the split and both ensembles
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        /// Rows the z-score screen is computed over (training-partition, full-dataset)
        #[arg(long, default_value_t = OutlierScope::default())]
        outlier_scope: OutlierScope,

        /// Field delimiter of the dataset
        #[arg(long, default_value_t = ';')]
        delimiter: char,
    },

    /// Predict CO locally from trained artifacts
    Predict {
        /// Request JSON: inline, a file path, `-` for stdin or `example`
        #[arg(long, short)]
        input: String,

        /// Directory holding the artifacts
        #[arg(long)]
        models_dir: Option<PathBuf>,
    },

    /// Send a prediction request to a running server
    Query {
        /// Request JSON: inline, a file path, `-` for stdin or `example`
        #[arg(long, short)]
        input: String,
    },

    /// Show health and readiness of a running server
    Status,

    /// Write a synthetic dataset in the UCI layout
    GenerateData {
        /// Output CSV path
        #[arg(long, short)]
        output: PathBuf,

        /// Number of days to cover
        #[arg(long, default_value_t = 365)]
        days: u32,

        /// Hours between readings
        #[arg(long, default_value_t = 1)]
        step_hours: u32,

        /// Generator seed
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        /// Share of cells written as the missing-value sentinel
        #[arg(long, default_value_t = 0.01)]
        missing_rate: f64,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = config::Config::load()?;
    let format = settings.format(cli.format);
    debug!(?format, "Resolved CLI settings");

    match cli.command {
        Commands::Train {
            data,
            models_dir,
            seed,
            outlier_scope,
            delimiter,
        } => {
            let args = train::TrainArgs {
                data,
                models_dir: settings.models_dir(models_dir),
                seed,
                outlier_scope,
                delimiter,
            };
            train::run_training(args, format)?;
        }
        Commands::Predict { input, models_dir } => {
            let request = read_request(&input)?;
            predict::predict_local(&settings.models_dir(models_dir), &request, format)?;
        }
        Commands::Query { input } => {
            let request = read_request(&input)?;
            let client = client::ApiClient::new(&settings.api_url(cli.api_url))?;
            remote::query(&client, &request, format).await?;
        }
        Commands::Status => {
            let client = client::ApiClient::new(&settings.api_url(cli.api_url))?;
            remote::show_status(&client, format).await?;
        }
        Commands::GenerateData {
            output,
            days,
            step_hours,
            seed,
            missing_rate,
        } => {
            let config = SyntheticConfig {
                days,
                step_hours,
                seed,
                missing_rate,
                ..Default::default()
            };
            data::generate_data(&output, &config, format)?;
        }
    }

    Ok(())
}
