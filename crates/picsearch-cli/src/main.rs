//! picsearch CLI: ingest a picture folder and search it by text

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use picsearch_core::ingest::{IngestOptions, IngestReport, ProgressEvent};
use picsearch_core::{
    Config, Ingester, MongoStore, SearchResult, Searcher, VectorStore, VoyageEmbedder,
};

#[derive(Parser)]
#[command(name = "picsearch")]
#[command(about = "Multimodal picture search backed by MongoDB Atlas Vector Search", long_about = None)]
#[command(version)]
struct Cli {
    /// Load settings from this .env file instead of ./.env
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed every image in the images directory and upsert it
    Ingest {
        /// Directory to ingest (default: IMAGES_DIR)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Also ingest images in subdirectories
        #[arg(short, long)]
        recursive: bool,
    },

    /// Search pictures matching a text query
    Search {
        /// Search query
        #[arg(required = true)]
        query: Vec<String>,

        /// Maximum number of results (default: SEARCH_LIMIT)
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Print results without opening them in an image viewer
        #[arg(long)]
        no_open: bool,
    },

    /// Show configuration and collection statistics
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    Config::load_env_file(cli.env_file.as_deref())?;
    let config = Config::from_env().context("Invalid configuration")?;

    match cli.command {
        Commands::Ingest { dir, recursive } => cmd_ingest(&config, dir, recursive).await,
        Commands::Search {
            query,
            limit,
            no_open,
        } => {
            let query = query.join(" ");
            let limit = limit.unwrap_or(config.search_limit);
            cmd_search(&config, &query, limit, !no_open).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Status => {
            cmd_status(&config).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn connect(config: &Config) -> Result<(VoyageEmbedder, MongoStore)> {
    let embedder = VoyageEmbedder::new(config).context("Failed to create embedding client")?;
    let store = MongoStore::connect(config)
        .await
        .with_context(|| format!("Failed to connect to {}", config.redacted_mongo_uri()))?;
    Ok((embedder, store))
}

async fn cmd_ingest(config: &Config, dir: Option<PathBuf>, recursive: bool) -> Result<ExitCode> {
    let images_dir = dir.unwrap_or_else(|| config.images_dir.clone());
    let (embedder, store) = connect(config).await?;

    println!("Starting ingestion from {}...", images_dir.display());

    // Create progress bar
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message("Scanning images...");

    let mut ingester = Ingester::new(
        &embedder,
        &store,
        IngestOptions {
            images_dir,
            recursive,
        },
    );

    let bar_style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
        .progress_chars("█▓░");

    // Set up progress callback
    ingester.set_progress_callback(Box::new({
        let pb = pb.clone();
        move |event: ProgressEvent<'_>| match event {
            ProgressEvent::Discovered { count } => {
                pb.set_style(bar_style.clone());
                pb.set_length(count as u64);
            }
            ProgressEvent::Embedding {
                current,
                total: _,
                path,
            } => {
                pb.set_position(current.saturating_sub(1) as u64);
                pb.set_message(display_name(path));
            }
        }
    }));

    let report = ingester.ingest().await?;

    pb.finish_and_clear();
    print_report(&report);

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn print_report(report: &IngestReport) {
    for path in &report.succeeded {
        println!("Indexed: {}", display_name(path));
    }
    for failure in &report.failed {
        println!("Failed {}: {}", display_name(&failure.path), failure.reason);
    }

    println!();
    println!("✓ Ingestion complete:");
    println!("  Images found:     {}", report.discovered);
    println!("  Images indexed:   {}", report.succeeded.len());
    println!("  Images failed:    {}", report.failed.len());
    println!("  Other files:      {}", report.skipped);
}

async fn cmd_search(config: &Config, query: &str, limit: usize, open_results: bool) -> Result<()> {
    let (embedder, store) = connect(config).await?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message("Searching...");

    let results = Searcher::new(&embedder, &store)
        .search(query, limit)
        .await
        .context("Search failed")?;

    pb.finish_and_clear();

    if results.is_empty() {
        println!("No results found for: {}", query);
        return Ok(());
    }

    println!("Results for '{}':\n", query);

    for (i, result) in results.iter().enumerate() {
        print_result(i + 1, result);
    }

    if open_results {
        for result in &results {
            open_image(Path::new(&result.path));
        }
    }

    Ok(())
}

/// Print a single ranked result.
fn print_result(index: usize, result: &SearchResult) {
    let score_color = if result.score > 0.7 {
        "\x1b[32m" // Green for high scores
    } else if result.score > 0.5 {
        "\x1b[33m" // Yellow for medium scores
    } else {
        "\x1b[31m" // Red for low scores
    };

    println!(
        "\x1b[1;36m[{}]\x1b[0m {}{:.4}\x1b[0m  \x1b[1m{}\x1b[0m",
        index, score_color, result.score, result.path,
    );

    if let Some(metadata) = &result.metadata {
        println!(
            "      \x1b[2m{} bytes, ingested {}\x1b[0m",
            metadata.size_bytes,
            metadata.ingested_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
}

/// Open an image with the OS default viewer; failures are only logged.
fn open_image(path: &Path) {
    if !path.exists() {
        tracing::warn!("Matched image no longer exists: {}", path.display());
        return;
    }
    if let Err(e) = open::that_detached(path) {
        tracing::warn!("Could not open {}: {}", path.display(), e);
    }
}

async fn cmd_status(config: &Config) -> Result<()> {
    println!("Configuration:");
    println!("  API key:         {}", config.redacted_api_key());
    println!("  Model:           {}", config.model);
    println!("  Dimension:       {}", config.dimension);
    println!("  Database:        {}", config.redacted_mongo_uri());
    println!(
        "  Collection:      {}.{}",
        config.db_name, config.collection_name
    );
    println!("  Vector index:    {}", config.vector_index);
    println!("  Images dir:      {}", config.images_dir.display());
    println!("  Search limit:    {}", config.search_limit);
    println!();

    let store = MongoStore::connect(config)
        .await
        .with_context(|| format!("Failed to connect to {}", config.redacted_mongo_uri()))?;

    println!("Collection:");
    println!("  Images stored:   {}", store.count().await?);

    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
