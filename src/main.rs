//! Event Extract CLI
//!
//! Pre-extracts labeled events from day partitions into per-event files.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use event_extract::{
    catalog::EventCatalog,
    config::Config,
    export::{event_file_path, read_event_file, ConsoleProgress, EventExporter},
    features::{SpectralConfig, SpectralFeatures},
    reader::CsvDayReader,
    verify::ExportVerifier,
    VERSION,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "event-extract")]
#[command(version = VERSION)]
#[command(about = "Extract labeled events into per-event CSV files", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export every labeled event to its own file
    Export {
        /// Event table (ID, Date, Timestamp, Component)
        #[arg(long)]
        metadata: Option<PathBuf>,

        /// Directory holding the day partitions
        #[arg(long)]
        base_path: Option<PathBuf>,

        /// Output directory for event files
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Denominator for percent complete
        #[arg(long)]
        total_events: Option<u64>,
    },

    /// Compare one exported file against its source window
    Verify {
        /// Event id to verify
        #[arg(long)]
        id: u64,

        /// Event table (ID, Date, Timestamp, Component)
        #[arg(long)]
        metadata: Option<PathBuf>,

        /// Directory holding the day partitions
        #[arg(long)]
        base_path: Option<PathBuf>,

        /// Output directory holding event files
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Summarize the event table
    Catalog {
        /// Event table (ID, Date, Timestamp, Component)
        #[arg(long)]
        metadata: Option<PathBuf>,
    },

    /// Print spectral features of an exported event
    Features {
        /// Event id
        #[arg(long)]
        id: u64,

        /// Output directory holding event files
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show configuration
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Export {
            metadata,
            base_path,
            output,
            total_events,
        } => {
            let mut config = with_paths(config, metadata, base_path, output);
            if let Some(total) = total_events {
                config.total_expected_events = total;
            }
            cmd_export(&config)
        }
        Commands::Verify {
            id,
            metadata,
            base_path,
            output,
        } => cmd_verify(&with_paths(config, metadata, base_path, output), id),
        Commands::Catalog { metadata } => cmd_catalog(&config, metadata),
        Commands::Features { id, output } => cmd_features(&config, id, output),
        Commands::Config => cmd_config(&config, cli.config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("could not load config from {}", path.display())),
        None => Config::load().context("could not load config"),
    }
}

/// Apply command line path overrides on top of the loaded config.
fn with_paths(
    mut config: Config,
    metadata: Option<PathBuf>,
    base_path: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Config {
    if let Some(path) = metadata {
        config.metadata_path = path;
    }
    if let Some(path) = base_path {
        config.base_path = path;
    }
    if let Some(path) = output {
        config.output_dir = path;
    }
    config
}

fn load_catalog(path: &Path) -> Result<EventCatalog> {
    EventCatalog::load(path)
        .with_context(|| format!("could not load event table {}", path.display()))
}

fn cmd_export(config: &Config) -> Result<()> {
    println!("Event Extract v{VERSION}");
    println!();

    let catalog = load_catalog(&config.metadata_path)?;

    println!("  Labeled events: {}", catalog.len());
    println!("  Skipped (unlabeled): {}", catalog.skipped_unlabeled());
    println!("  Source: {}", config.base_path.display());
    println!("  Output: {}", config.output_dir.display());
    println!("  Window duration: {}s", config.window_duration.as_secs());
    println!();

    let reader = CsvDayReader::new(config.sampling_rate);
    let mut exporter =
        EventExporter::new(config.export_config(), reader).with_progress(ConsoleProgress::stdout());

    let report = exporter.export(catalog.events())?;

    println!(
        "Exported {} events to {} in {:.1}s",
        report.exported_count(),
        report.output_dir.display(),
        report.elapsed.as_secs_f64()
    );
    Ok(())
}

fn cmd_verify(config: &Config, id: u64) -> Result<()> {
    let catalog = load_catalog(&config.metadata_path)?;
    let event = catalog
        .get(id)
        .with_context(|| format!("no labeled event with id {id}"))?;

    let verifier = ExportVerifier::new(
        CsvDayReader::new(config.sampling_rate),
        config.export_config().partition_layout(),
        config.window_duration,
    );
    let result = verifier.verify(event, &config.output_dir)?;

    println!("Verification of event {} ({})", event.id, event.label);
    println!("==============================");
    println!("  Samples per channel: {}", result.samples);
    println!("  Max voltage difference: {}", result.max_voltage_diff);
    println!("  Max current difference: {}", result.max_current_diff);
    println!(
        "  Source read: {:.3}s | export read: {:.3}s",
        result.source_read.as_secs_f64(),
        result.export_read.as_secs_f64()
    );
    if let Some(speedup) = result.speedup() {
        println!("  Speedup: {speedup:.1}x");
    }
    Ok(())
}

fn cmd_catalog(config: &Config, metadata: Option<PathBuf>) -> Result<()> {
    let catalog = load_catalog(metadata.as_deref().unwrap_or(&config.metadata_path))?;

    println!("Event Catalog");
    println!("=============");
    println!();
    println!("Labeled events: {}", catalog.len());
    println!("Unlabeled rows skipped: {}", catalog.skipped_unlabeled());
    if let (Some(first), Some(last)) = (catalog.events().first(), catalog.events().last()) {
        println!("Id range: {} - {}", first.id, last.id);
    }
    println!();
    println!("Events per label:");
    for (label, count) in catalog.label_counts() {
        println!("  {label}: {count}");
    }
    Ok(())
}

fn cmd_features(config: &Config, id: u64, output: Option<PathBuf>) -> Result<()> {
    let output_dir = output.unwrap_or_else(|| config.output_dir.clone());
    let path = event_file_path(&output_dir, id);
    let window =
        read_event_file(&path).with_context(|| format!("could not read {}", path.display()))?;

    let spectral = SpectralConfig {
        sampling_rate: f64::from(config.sampling_rate),
        ..SpectralConfig::default()
    };
    let features = SpectralFeatures::compute(&window.current, &spectral)
        .with_context(|| format!("could not compute features of event {id}"))?;

    println!("{}", serde_json::to_string_pretty(&features)?);
    Ok(())
}

fn cmd_config(config: &Config, path: Option<&Path>) -> Result<()> {
    println!("Configuration");
    println!("=============");
    println!();
    match path {
        Some(path) => println!("Config file: {path:?}"),
        None => println!("Config file: {:?}", Config::config_path()),
    }
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
