use anyhow::{bail, Result};
use blockgroup_demographics::{config, pipeline, validate, variables};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the demographics CSV and geometry file for a year
    Build {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Overrides the year in the config file
        #[arg(short, long)]
        year: Option<u16>,
    },
    /// Write the ACS variable catalog
    Variables {
        #[arg(short, long, value_name = "FILE", default_value = "acsvars.csv")]
        out: PathBuf,
    },
    /// Check a year's written outputs for structural consistency
    Validate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(short, long)]
        year: Option<u16>,
        /// Number of block groups TIGER/Line publishes for the year
        #[arg(long)]
        expected_rows: Option<usize>,
    },
}

fn load_config(path: &Path, year: Option<u16>) -> Result<config::AppConfig> {
    let mut app_config = config::AppConfig::load_from_file(path)?;
    if let Some(year) = year {
        app_config.year = year;
    }
    Ok(app_config)
}

/// Console output plus an optional log file, both filtered by `RUST_LOG`.
fn init_logging(log_file: Option<&Path>) -> Option<WorkerGuard> {
    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let name = path.file_name().unwrap_or(path.as_os_str());
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
                );
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Build { config, year } => {
            let app_config = load_config(config, *year)?;
            let _guard = init_logging(app_config.logging.file.as_deref());
            info!(config = %config.display(), "Building block group demographics");

            let summary = pipeline::run(&app_config)?;

            info!(
                demographics = %summary.paths.demographics.display(),
                geometry = %summary.paths.geometry.display(),
                rows = summary.join.rows,
                tiger_block_groups = summary.tiger_block_groups,
                "Done"
            );
        }
        Commands::Variables { out } => {
            let _guard = init_logging(None);
            variables::write_catalog(out)?;
        }
        Commands::Validate {
            config,
            year,
            expected_rows,
        } => {
            let app_config = load_config(config, *year)?;
            let _guard = init_logging(None);

            let report = validate::validate_outputs(&app_config, *expected_rows)?;
            if !report.is_clean() {
                bail!("validation failed for {}", app_config.year);
            }
        }
    }

    Ok(())
}
