//! # QuickCue CLI
//!
//! Ask one question against your knowledge base and stream the answer.
//!
//! Usage:
//!   quickcue ask "Tell me about yourself" --user u1
//!   quickcue ask "Why this role?" --user u1 --json
//!   quickcue init                        # Write the default config
//!   quickcue providers                   # List supported providers

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use tracing_subscriber::EnvFilter;

use quickcue_core::QuickCueConfig;
use quickcue_core::traits::VectorIndex;
use quickcue_core::types::{AnswerEvent, KnowledgeEntry, UserScope};
use quickcue_index::{MemoryIndex, QdrantIndex};
use quickcue_pipeline::{AnswerPipeline, InMemoryAnswerCache, detect};
use quickcue_providers::{available_providers, create_completion_provider, create_embedding_provider};

#[derive(Parser)]
#[command(name = "quickcue", version, about = "⚡ QuickCue — instant answers from your own knowledge base")]
struct Cli {
    /// Config file path (default: ~/.quickcue/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a question and stream the answer
    Ask {
        /// The question to answer
        question: String,

        /// User whose knowledge base to search
        #[arg(short, long)]
        user: String,

        /// Emit raw answer events as JSON lines
        #[arg(long)]
        json: bool,

        /// Offline mode: search a JSON file of knowledge entries instead of
        /// Qdrant
        #[arg(long, value_name = "FILE")]
        knowledge: Option<PathBuf>,
    },
    /// Write the default config to ~/.quickcue/config.toml
    Init,
    /// List supported providers
    Providers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "quickcue=debug" } else { "quickcue=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => QuickCueConfig::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => QuickCueConfig::load().context("loading config")?,
    };

    match cli.command {
        Command::Ask { question, user, json, knowledge } => {
            ask(config, &question, &user, json, knowledge).await
        }
        Command::Init => init(config),
        Command::Providers => {
            for name in available_providers() {
                println!("{name}");
            }
            Ok(())
        }
    }
}

async fn ask(
    config: QuickCueConfig,
    question: &str,
    user: &str,
    json: bool,
    knowledge: Option<PathBuf>,
) -> Result<()> {
    if !detect::looks_like_question(question) {
        tracing::warn!("input doesn't look like a question, answering anyway");
    }

    let scope = UserScope::new(user).context("invalid --user")?;
    let embedder = create_embedding_provider(&config).context("embedding provider")?;
    let completion = create_completion_provider(&config).context("completion provider")?;
    let index: Arc<dyn VectorIndex> = match knowledge {
        Some(path) => {
            let data = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let entries: Vec<KnowledgeEntry> = serde_json::from_str(&data)
                .with_context(|| format!("parsing {}", path.display()))?;
            tracing::info!("offline mode: {} knowledge entries", entries.len());
            Arc::new(MemoryIndex::with_entries(entries))
        }
        None => Arc::new(QdrantIndex::new(&config.index)),
    };

    let pipeline = AnswerPipeline::builder(config)
        .embedder(embedder)
        .completion(completion)
        .index(index)
        .cache(Arc::new(InMemoryAnswerCache::new(64)))
        .build()?;

    let mut stream = pipeline.answer(question, &scope);
    let mut stdout = std::io::stdout();
    let mut started = false;

    while let Some(event) = stream.next().await {
        if json {
            println!("{}", serde_json::to_string(&event)?);
            continue;
        }
        match event {
            AnswerEvent::StreamStart { source } => {
                if started {
                    // A later start supersedes the partial answer above
                    println!("\n---");
                }
                started = true;
                tracing::debug!("answer source: {source:?}");
            }
            AnswerEvent::Chunk { text } => {
                print!("{text}");
                stdout.flush()?;
            }
            AnswerEvent::StreamEnd { result } => {
                println!();
                tracing::info!("source: {:?}", result.source);
                if !result.matches_used.is_empty() {
                    tracing::info!("matches used: {}", result.matches_used.join(", "));
                }
                for latency in &result.stage_latencies {
                    tracing::debug!("{}: {}ms", latency.stage, latency.elapsed_ms);
                }
            }
        }
    }

    Ok(())
}

fn init(config: QuickCueConfig) -> Result<()> {
    let path = QuickCueConfig::default_path();
    if path.exists() {
        println!("⚠️  Config already exists at {}", path.display());
        return Ok(());
    }
    config.save()?;
    println!("✅ Wrote default config to {}", path.display());
    println!("   Set your API keys there or via OPENAI_API_KEY / ZHIPUAI_API_KEY.");
    Ok(())
}
