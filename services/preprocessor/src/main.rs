//! Landsat-7 reflectance preprocessor.
//!
//! Reads calibration constants from a YAML config, makes sure the staging
//! schema exists and converts band digital numbers to ground reflectance.

mod pipeline;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use landsat_common::PreprocessError;
use pipeline::{Pipeline, PipelineOptions};

#[derive(Parser, Debug)]
#[command(name = "preprocessor")]
#[command(about = "Convert a Landsat-7 band to top-of-atmosphere reflectance")]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml", env = "PREPROCESSOR_CONFIG")]
    config: PathBuf,

    /// Log level or filter directives, overridden by RUST_LOG
    #[arg(long, default_value = "info", env = "PREPROCESSOR_LOG_LEVEL")]
    log_level: String,

    /// Log output format (json or pretty)
    #[arg(long, default_value = "json", env = "PREPROCESSOR_LOG_FORMAT")]
    log_format: String,

    /// Do not connect to PostgreSQL
    #[arg(long)]
    skip_database: bool,

    /// Number of histogram bins in the band summaries
    #[arg(long, default_value_t = 20)]
    histogram_bins: usize,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    if let Err(e) = init_tracing(&args) {
        eprintln!("Failed to initialize logging: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = e
                .downcast_ref::<PreprocessError>()
                .map(PreprocessError::exit_code)
                .unwrap_or(1);
            error!(exit_code = code, "{:#}", e);
            ExitCode::from(code as u8)
        }
    }
}

fn init_tracing(args: &Args) -> Result<()> {
    let builder = FmtSubscriber::builder()
        .with_env_filter(log_filter(&args.log_level))
        .with_target(true);

    if args.log_format.eq_ignore_ascii_case("pretty") {
        tracing::subscriber::set_global_default(builder.pretty().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    }

    Ok(())
}

/// RUST_LOG wins when set; otherwise `log_level`, falling back to info
/// when it does not parse.
fn log_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

async fn run(args: Args) -> Result<()> {
    info!(config = %args.config.display(), "Starting reflectance preprocessor");

    let options = PipelineOptions {
        skip_database: args.skip_database,
        histogram_bins: args.histogram_bins,
    };
    let pipeline = Pipeline::from_config_file(&args.config, options)
        .with_context(|| format!("loading {}", args.config.display()))?;

    let outcome = pipeline.run().await?;

    info!(
        output = %outcome.report.output_path.display(),
        rows = outcome.report.rows,
        cols = outcome.report.cols,
        save_locally = outcome.run.save_locally,
        staged = outcome.database.is_some(),
        "Preprocessing complete"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_from_level() {
        std::env::remove_var("RUST_LOG");
        assert_eq!(log_filter("debug").to_string(), "debug");
        assert_eq!(log_filter("preprocessor=notalevel").to_string(), "info");
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["preprocessor", "--skip-database"]);
        assert!(args.skip_database);
        assert_eq!(args.histogram_bins, 20);
        assert_eq!(args.log_format, "json");
    }
}
