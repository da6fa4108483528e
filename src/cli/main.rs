//! CLI binary entry point for tabular-ingest

#[cfg(feature = "cli")]
use anyhow::{Context, Result, bail};
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};
#[cfg(feature = "cli")]
use tabular_ingest::config::{CONFIG_FILENAME, IngestConfig, sample_config};
#[cfg(feature = "cli")]
use tabular_ingest::pipeline::{Pipeline, RunSummary, discover_csv_files};

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "tabular-ingest")]
#[command(about = "Load directories of CSV files into DuckDB or PostgreSQL")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = CONFIG_FILENAME)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Ingest every CSV file in the source directory (default)
    Run {
        /// Override the configured source directory
        #[arg(short, long)]
        dir: Option<PathBuf>,
        /// Print the run summary as JSON on stdout
        #[arg(long)]
        json: bool,
        /// Skip the configured derived tables
        #[arg(long)]
        skip_derived: bool,
    },
    /// Write a sample configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(feature = "cli")]
fn handle_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; use --force to overwrite", path.display());
    }
    std::fs::write(path, sample_config())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

#[cfg(feature = "cli")]
fn print_summary(summary: &RunSummary) {
    println!(
        "Processed {} file(s), {} failed, in {}",
        summary.files_processed,
        summary.files_failed,
        summary.duration_string()
    );
    for load in &summary.loads {
        println!(
            "  {:<32} read {:>10}  stored {:>10}",
            load.table, load.rows_read, load.rows_stored
        );
    }
}

#[cfg(feature = "cli")]
async fn handle_run(
    config_path: &Path,
    dir: Option<PathBuf>,
    json: bool,
    skip_derived: bool,
) -> Result<()> {
    let config = IngestConfig::load(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    tabular_ingest::logging::init(&config.logging)?;

    // Relative paths in the file are relative to the file itself
    let base_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let source_dir = dir.unwrap_or_else(|| config.source_dir(base_dir));

    let files = discover_csv_files(&source_dir, &config.source.pattern)?;
    let mut pipeline = Pipeline::connect(&config, base_dir).await?;

    let derived = if skip_derived { &[][..] } else { &config.derived[..] };
    let summary = pipeline.run_all(&files, derived).await;
    pipeline.finish().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run {
        dir: None,
        json: false,
        skip_derived: false,
    }) {
        Commands::Run {
            dir,
            json,
            skip_derived,
        } => handle_run(&cli.config, dir, json, skip_derived).await,
        Commands::Init { force } => handle_init(&cli.config, force),
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature is not enabled. Build with --features cli");
    std::process::exit(1);
}
