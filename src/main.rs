use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use price_compare::app::ComparisonUseCase;
use price_compare::config::Config;
use price_compare::infra::{load_raw_inputs, write_json, JsonFileOutput};
use price_compare::logging;
use price_compare::observability;

/// Config file picked up from the working directory when `--config` is absent
const DEFAULT_CONFIG_FILE: &str = "price_compare.toml";

#[derive(Parser)]
#[command(name = "price_compare")]
#[command(about = "Cross-retailer product price comparison")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize, match and build the comparison table
    Process {
        /// Raw record JSON files or directories of them
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Comparison table output file
        #[arg(long, default_value = "output/comparison.json")]
        output: PathBuf,
        /// Also write every normalized record to this file
        #[arg(long)]
        normalized_output: Option<PathBuf>,
        /// Override the match threshold (0-100)
        #[arg(long)]
        threshold: Option<f64>,
        /// Print Prometheus metrics after the run
        #[arg(long)]
        metrics: bool,
    },
    /// Only normalize records and write them out
    Normalize {
        /// Raw record JSON files or directories of them
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output file; printed to stdout when absent
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => Config::load(DEFAULT_CONFIG_FILE)?,
        None => Config::default(),
    };
    config.apply_env_overrides()?;
    Ok(config)
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    let _guard = logging::init_logging(&config.logging)?;

    match cli.command {
        Commands::Process {
            inputs,
            output,
            normalized_output,
            threshold,
            metrics,
        } => {
            println!("🔄 Running price comparison...");

            if let Some(threshold) = threshold {
                config.matching.threshold = threshold;
            }
            let handle = if metrics { Some(observability::init()?) } else { None };

            let records = load_raw_inputs(&inputs);
            if records.is_empty() {
                warn!("No raw records loaded");
            }

            let mut port = JsonFileOutput::new(&output);
            if let Some(path) = &normalized_output {
                port = port.with_normalized_output(path);
            }
            let use_case = ComparisonUseCase::new(&config)?.with_output_port(Arc::new(port));
            let run = use_case.run(records)?;

            println!("\n📊 Comparison Results:");
            println!("   Records normalized: {}", run.normalized.len());
            println!("   Candidate matches: {}", run.candidate_edges);
            println!("   Clusters: {}", run.clusters);
            println!("   Products in multiple stores: {}", run.table.rows.len());
            println!("   Single-retailer clusters dropped: {}", run.table.dropped_single_retailer);
            println!("   Output file: {}", output.display());

            if run.report.retailer_conflicts > 0 {
                println!("\n⚠️  Same-retailer conflicts resolved: {}", run.report.retailer_conflicts);
                println!("   Records split into singletons: {}", run.report.ejected.len());
            }

            for retailer in &run.summary.retailers {
                if let (Some(avg), Some(min), Some(max)) =
                    (retailer.average_price, retailer.min_price, retailer.max_price)
                {
                    println!(
                        "   {}: {} priced, avg R{} (min R{}, max R{})",
                        retailer.retailer, retailer.priced_rows, avg, min, max
                    );
                }
            }

            if let Some(handle) = handle {
                println!("\n{}", handle.render());
            }
            println!("✅ Comparison completed successfully");
        }
        Commands::Normalize { inputs, output } => {
            let use_case = ComparisonUseCase::new(&config)?;
            let normalized = use_case.normalize(&load_raw_inputs(&inputs));

            match output {
                Some(path) => {
                    write_json(&path, &normalized)?;
                    info!("Wrote {} normalized records to {}", normalized.len(), path.display());
                    println!("✅ Wrote {} normalized records to {}", normalized.len(), path.display());
                }
                None => println!("{}", serde_json::to_string_pretty(&normalized)?),
            }
        }
    }
    Ok(())
}
