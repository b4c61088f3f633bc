//! cfpb-cluster - Main entry point
//!
//! Command-line front end for the complaint clustering pipeline:
//! - `fetch`: download one year of complaints into the input table
//! - `run`: cluster, label and write the labeled table
//! - `inspect`: cluster and print the result without labeling or writing

use std::path::PathBuf;

use anyhow::{Context, Result};
use cfpb_cluster::config::{ClusterConfig, DataPaths};
use cfpb_cluster::fetcher::ComplaintFetcher;
use cfpb_cluster::services::{
    ClusterSummary, FileLabelProvider, KSelection, KeywordLabelProvider, LabelProvider,
    TerminalLabelProvider,
};
use cfpb_cluster::workflow::{ClusterAnalysis, Pipeline};
use cfpb_common::config::{ensure_root_folder, load_toml_config, locate_config_file};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for cfpb-cluster
#[derive(Parser, Debug)]
#[command(name = "cfpb-cluster")]
#[command(about = "Groups consumer complaint narratives into labeled clusters")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "CFPB_CONFIG")]
    config: Option<PathBuf>,

    /// Folder holding the input, cache and output tables
    #[arg(short, long, global = true, env = "CFPB_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download complaints for the configured company and year
    Fetch,

    /// Cluster, label and write the labeled table
    Run {
        /// Read group labels from a TOML file instead of prompting
        #[arg(long, conflicts_with = "auto_label")]
        labels: Option<PathBuf>,

        /// Name groups from their top keywords instead of prompting
        #[arg(long)]
        auto_label: bool,

        /// Use this cluster count instead of the selected one
        #[arg(long)]
        k: Option<usize>,

        /// Recompute normalization even when the cache is valid
        #[arg(long)]
        no_cache: bool,
    },

    /// Cluster and print the cost curve and group summaries
    Inspect {
        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,

        /// Recompute normalization even when the cache is valid
        #[arg(long)]
        no_cache: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = locate_config_file(args.config.as_deref());
    let config: ClusterConfig =
        load_toml_config(config_path.as_deref()).context("Failed to load configuration")?;

    // Logs go to stderr; stdout carries prompts and reports
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let paths = config.data_paths(args.root_folder.clone());
    ensure_root_folder(&paths.root).context("Failed to prepare root folder")?;
    info!("Root folder: {}", paths.root.display());

    match args.command {
        Command::Fetch => fetch(&config, &paths).await,
        Command::Run {
            labels,
            auto_label,
            k,
            no_cache,
        } => run(&config, paths, labels, auto_label, k, no_cache),
        Command::Inspect { json, no_cache } => inspect(&config, paths, json, no_cache),
    }
}

async fn fetch(config: &ClusterConfig, paths: &DataPaths) -> Result<()> {
    let fetcher =
        ComplaintFetcher::new(config.fetch.clone()).context("Failed to initialize fetcher")?;
    let written = fetcher
        .fetch_to_csv(&paths.input)
        .await
        .context("Failed to fetch complaints")?;
    println!("Fetched {} complaints into {}", written, paths.input.display());
    Ok(())
}

fn run(
    config: &ClusterConfig,
    paths: DataPaths,
    labels: Option<PathBuf>,
    auto_label: bool,
    k: Option<usize>,
    no_cache: bool,
) -> Result<()> {
    let mut provider: Box<dyn LabelProvider> = match labels {
        Some(path) => Box::new(
            FileLabelProvider::from_path(&path)
                .with_context(|| format!("Failed to read labels from {}", path.display()))?,
        ),
        None if auto_label => Box::new(KeywordLabelProvider::default()),
        None => Box::new(TerminalLabelProvider::stdio()),
    };

    let mut pipeline = Pipeline::new(config.pipeline.clone(), paths)
        .with_cache(!no_cache)
        .with_k_override(k);
    let outcome = pipeline
        .run(provider.as_mut())
        .context("Clustering run failed")?;

    println!();
    println!("Run {}", outcome.run_id);
    println!("Clusters: {}", outcome.analysis.k);
    for (group_id, name) in outcome.labels.iter() {
        let size = outcome
            .analysis
            .summaries
            .iter()
            .find(|s| s.group_id == group_id)
            .map_or(0, |s| s.size);
        println!("  {group_id:>3}  {size:>6}  {name}");
    }
    println!(
        "Wrote {} rows to {}",
        outcome.rows_written,
        outcome.output.display()
    );
    Ok(())
}

/// JSON report printed by `inspect --json`
#[derive(Serialize)]
struct InspectReport<'a> {
    documents: usize,
    vocabulary: usize,
    selection: &'a KSelection,
    k: usize,
    inertia: f64,
    groups: &'a [ClusterSummary],
}

fn inspect(config: &ClusterConfig, paths: DataPaths, json: bool, no_cache: bool) -> Result<()> {
    let mut pipeline = Pipeline::new(config.pipeline.clone(), paths).with_cache(!no_cache);
    let analysis = pipeline.analyze().context("Clustering analysis failed")?;

    if json {
        let report = InspectReport {
            documents: analysis.documents.len(),
            vocabulary: analysis.vectorizer.dimension(),
            selection: &analysis.selection,
            k: analysis.k,
            inertia: analysis.model.inertia,
            groups: &analysis.summaries,
        };
        let text = serde_json::to_string_pretty(&report).context("Failed to encode report")?;
        println!("{text}");
    } else {
        print_analysis(&analysis);
    }
    Ok(())
}

fn print_analysis(analysis: &ClusterAnalysis) {
    println!(
        "Documents: {}  Vocabulary: {}  Cache: {:?}",
        analysis.documents.len(),
        analysis.vectorizer.dimension(),
        analysis.cache_status
    );

    println!();
    println!("Cost curve:");
    if let Some(baseline) = analysis.selection.baseline_inertia {
        println!("  k={:<3} inertia={:.4}  (baseline)", 1, baseline);
    }
    for point in &analysis.selection.curve {
        let marker = if point.k == analysis.selection.optimal_k { "  <-" } else { "" };
        println!("  k={:<3} inertia={:.4}{}", point.k, point.inertia, marker);
    }
    if !analysis.selection.detected {
        println!("  (no knee found, default k used)");
    }
    println!("Selected k: {}", analysis.k);

    for summary in &analysis.summaries {
        println!();
        println!("{}", "=".repeat(60));
        println!("Group {} ({} complaints)", summary.group_id, summary.size);
        println!("Keywords: {}", summary.keywords.join(", "));
        println!("Examples:");
        for example in &summary.examples {
            println!("  - {example}");
        }
    }
}
