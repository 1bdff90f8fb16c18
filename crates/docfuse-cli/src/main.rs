//! docfuse CLI - ingest documents and run hybrid retrieval queries.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use docfuse_chunk::TextChunker;
use docfuse_core::{Chunker, FuseConfig, RetrievalOutput};
use docfuse_engine::IndexManager;
use docfuse_query::{FusionRetriever, FusionWeights, RetrieveConfig};
use docfuse_remote::{HttpEmbedder, HttpReranker};

/// docfuse - hybrid lexical + dense retrieval over local documents
#[derive(Parser)]
#[command(name = "docfuse")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file path (default: ~/.config/docfuse/config.toml, then ./docfuse.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk and index a file or directory
    Ingest {
        /// Path to a text file or a directory of text files
        path: PathBuf,
    },

    /// Run a hybrid retrieval query
    Query {
        /// Query text
        query: String,

        /// Maximum number of results
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Skip the reranking stage and return fused order
        #[arg(long)]
        no_rerank: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show index statistics
    Stats,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn load_config(path: Option<PathBuf>) -> Result<FuseConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(p) => FuseConfig::load(&p)?,
        None => FuseConfig::load_default()?,
    };
    Ok(config)
}

fn build_engine(
    config: &FuseConfig,
) -> Result<Arc<IndexManager<HttpEmbedder, TextChunker>>, Box<dyn std::error::Error>> {
    let embedder = Arc::new(HttpEmbedder::new(config.embedding.clone())?);
    let chunker = Arc::new(TextChunker::default());
    Ok(Arc::new(IndexManager::new(config, embedder, chunker)?))
}

fn retrieve_config(
    config: &FuseConfig,
    top_k: Option<usize>,
) -> Result<RetrieveConfig, Box<dyn std::error::Error>> {
    Ok(RetrieveConfig {
        recall_k: config.index.recall_k,
        weights: FusionWeights::new(config.fusion.lexical_weight, config.fusion.dense_weight)?,
        rerank_top_n: top_k.unwrap_or(config.fusion.rerank_top_n),
        embed_timeout: Duration::from_secs(config.embedding.timeout_secs),
        rerank_timeout: Duration::from_secs(config.rerank.timeout_secs),
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = load_config(cli.config)?;

    match cli.command {
        Commands::Ingest { path } => {
            ingest(&config, &path).await?;
        }
        Commands::Query {
            query,
            top_k,
            no_rerank,
            json,
        } => {
            run_query(&config, &query, top_k, no_rerank, json).await?;
        }
        Commands::Stats => {
            stats(&config).await?;
        }
    }

    Ok(())
}

async fn ingest(config: &FuseConfig, path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let chunker = TextChunker::default();
    let chunks = if path.is_dir() {
        chunker.chunk_corpus(path)?
    } else {
        chunker.chunk(path)?
    };

    if chunks.is_empty() {
        println!("No supported files found at: {}", path.display());
        return Ok(());
    }

    let engine = build_engine(config)?;
    let summary = engine.ingest(chunks).await?;
    println!(
        "Indexed {} new chunk(s), skipped {} already present",
        summary.added, summary.skipped
    );
    Ok(())
}

async fn run_query(
    config: &FuseConfig,
    query: &str,
    top_k: Option<usize>,
    no_rerank: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = build_engine(config)?;
    let embedder = Arc::new(HttpEmbedder::new(config.embedding.clone())?);
    let reranker = Arc::new(HttpReranker::new(config.rerank.clone())?);
    let retriever =
        FusionRetriever::new(engine, embedder, reranker, retrieve_config(config, top_k)?)?;

    let output = if no_rerank {
        retriever.retrieve_unranked(query).await?
    } else {
        retriever.retrieve(query).await?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_results(&output);
    }
    Ok(())
}

fn print_results(output: &RetrievalOutput) {
    if output.results.is_empty() {
        println!("No results for: {}", output.query);
        return;
    }

    println!(
        "{} result(s) in {}ms\n",
        output.total_results, output.latency_ms
    );
    for passage in &output.results {
        println!(
            "{}. [{:.3}] {} (page {}, offset {})",
            passage.rank,
            passage.score,
            passage.chunk.source,
            passage.chunk.page,
            passage.chunk.start_offset
        );
        println!("   {}\n", preview(&passage.chunk.text, 200));
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let collapsed: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let cut: String = collapsed.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

async fn stats(config: &FuseConfig) -> Result<(), Box<dyn std::error::Error>> {
    let engine = build_engine(config)?;
    let stats = engine.stats().await?;
    println!("Chunks:          {}", stats.chunks);
    println!("Lexical entries: {}", stats.lexical_entries);
    println!("Dense entries:   {}", stats.dense_entries);
    println!("Dimension:       {}", stats.dimension);
    Ok(())
}
