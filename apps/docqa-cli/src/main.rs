//! docqa: ingest PDFs or CSVs and ask questions about them.
//!
//! ```bash
//! docqa ingest manuals/ reviews.csv
//! docqa search "how long to boil water" -k 5
//! docqa ask "how long should I boil water?"
//! docqa status
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::runtime::Runtime;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use docqa_core::config::{expand_path, Config, Settings};
use docqa_core::error::Error;
use docqa_hybrid::HybridEngine;
use docqa_models::{get_default_embedder, get_default_generator};
use docqa_vector::{load_generation, open_db, save_generation};

#[derive(Parser)]
#[command(name = "docqa")]
#[command(about = "Question answering over local PDF and CSV files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the corpus with the given files or directories
    Ingest {
        /// Files or directories; defaults to `data.data_dir`
        paths: Vec<PathBuf>,
    },

    /// Show the fused ranking for a query
    Search {
        query: String,

        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Answer a question from the ingested corpus
    Ask {
        question: String,

        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Print the active generation
    Status,
}

fn progress_bar() -> Result<ProgressBar> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn lancedb_uri(settings: &Settings) -> Result<String> {
    let dir = expand_path(&settings.data.lancedb_dir);
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    dir.to_str()
        .map(str::to_string)
        .with_context(|| format!("non UTF-8 path {}", dir.display()))
}

/// Reinstall the last saved generation. A snapshot built by another embedder is skipped.
fn restore_saved(rt: &Runtime, engine: &HybridEngine, uri: &str, collection: &str) -> Result<()> {
    let stored = rt.block_on(async {
        let conn = open_db(uri).await?;
        load_generation(&conn, collection).await
    })?;
    let Some(stored) = stored else { return Ok(()) };
    match engine.store().restore(stored) {
        Ok(generation) => {
            info!(generation = %generation.id(), chunks = generation.len(), "restored saved generation");
            Ok(())
        }
        Err(Error::IndexState(reason)) => {
            warn!(%reason, "saved generation ignored; run `docqa ingest` again");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::load().context("loading configuration")?;
    let settings = config.settings()?;

    let embedder = get_default_embedder(&settings.embedding)?;
    let generator = get_default_generator(&settings.generation)?;
    let engine = HybridEngine::from_settings(&settings, embedder, generator, progress_bar()?)?;

    let rt = Runtime::new()?;
    let uri = lancedb_uri(&settings)?;
    let collection = settings.data.collection.as_str();
    restore_saved(&rt, &engine, &uri, collection)?;

    match cli.command {
        Commands::Ingest { paths } => {
            let paths = if paths.is_empty() { vec![expand_path(&settings.data.data_dir)] } else { paths };
            let report = engine.ingest_paths(&paths)?;
            let snapshot = engine.store().current().to_stored();
            rt.block_on(async {
                let conn = open_db(&uri).await?;
                save_generation(&conn, collection, &snapshot).await
            })?;
            println!(
                "Ingested {} files into generation {} ({} chunks, {} mode)",
                report.files, report.generation, report.chunks, report.mode
            );
        }
        Commands::Search { query, k } => {
            let generation = engine.store().current();
            let results = engine.search(&query, k)?;
            println!("Found {} results for \"{query}\"", results.len());
            for (i, c) in results.iter().enumerate() {
                let text = generation.get(&c.chunk_id).map(|chunk| chunk.text.as_str()).unwrap_or_default();
                let preview: String = text.chars().take(120).collect();
                println!(
                    "\n  {}. fused={:.4} dense={} lexical={} id={}",
                    i + 1,
                    c.fused_score,
                    c.dense_rank.map_or_else(|| "-".to_string(), |r| r.to_string()),
                    c.lexical_rank.map_or_else(|| "-".to_string(), |r| r.to_string()),
                    c.chunk_id
                );
                println!("     {preview}");
            }
        }
        Commands::Ask { question, k } => {
            let answer = engine.ask(&question, k)?;
            println!("{}", answer.text);
            if !answer.candidates.is_empty() {
                let sources: Vec<&str> = answer.candidates.iter().map(|c| c.chunk_id.as_str()).collect();
                println!("\nSources: {}", sources.join(", "));
            }
        }
        Commands::Status => {
            let generation = engine.store().current();
            println!("Generation: {}", generation.id());
            println!("Mode:       {}", generation.mode().map_or("none", |m| m.as_str()));
            println!("Chunks:     {}", generation.len());
            println!("Embedder:   {}", engine.store().embedder().id());
            println!("Store:      {uri} ({collection})");
        }
    }
    Ok(())
}
