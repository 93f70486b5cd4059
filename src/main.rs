//! Driver CLI: ingest a source tree, purge a namespace, or ask a question.
//!
//! Stores are wired from the environment (`QDRANT_URL`, `LLM_*`,
//! `EMBEDDING_*`); the graph lives in-process and persists as a JSONL
//! snapshot between runs.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use code_ingest::{FileOutcome, FileStatus, IngestConfig, IngestDriver};
use code_parsers::{Language, ParserRegistry};
use graph_store::{GraphLoader, MemoryGraph, load_snapshot, save_snapshot};
use indicatif::{ProgressBar, ProgressStyle};
use llm_service::{EmbeddingClient, EmbeddingConfig, LlmProfiles};
use query_engine::{QueryOptions, QueryOrchestrator, RetrievalConfig, RetrievalEngine};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use vector_store::{QdrantBackend, VectorConfig, VectorLoader};

#[derive(Parser)]
#[command(
    name = "code-atlas",
    about = "Polyglot code intelligence over a graph and a vector store"
)]
struct Cli {
    /// Directory holding the graph snapshot.
    #[arg(long, env = "GRAPH_SNAPSHOT_DIR", default_value = "./graph_data")]
    snapshot_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Walk a source tree and load it into both stores.
    Ingest {
        path: PathBuf,
        /// Colon-qualified namespace, e.g. sock_shop:payment.
        namespace: String,
        #[arg(long)]
        include: Vec<String>,
        #[arg(long)]
        exclude: Vec<String>,
        /// Force a language instead of extension dispatch.
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        workers: Option<usize>,
        #[arg(long)]
        no_recursive: bool,
    },
    /// Delete every node, edge, and vector point of a namespace.
    Purge { namespace: String },
    /// Ask a natural-language question over the ingested corpus.
    Query {
        question: String,
        #[arg(long)]
        namespace: Option<String>,
        #[arg(long, default_value_t = 10)]
        k_code: usize,
        #[arg(long, default_value_t = 3)]
        k_doc: usize,
        #[arg(long, default_value_t = 12_000)]
        budget_chars: usize,
        /// Return the retrieved context without calling the LLM.
        #[arg(long)]
        no_llm: bool,
        /// Print the full outcome as JSON instead of prose.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, finishing in-flight work");
                cancel.cancel();
            }
        });
    }

    let graph: Arc<MemoryGraph> = Arc::new(
        load_snapshot(&cli.snapshot_dir)
            .await
            .context("loading graph snapshot")?,
    );
    let vector_cfg = VectorConfig::from_env().context("vector config")?;
    let vectors = Arc::new(QdrantBackend::new(&vector_cfg).context("qdrant client")?);
    let profiles = Arc::new(LlmProfiles::from_env().context("llm profiles")?);
    let embedder = Arc::new(EmbeddingClient::new(
        profiles.clone(),
        EmbeddingConfig::from_env(),
    ));

    match cli.command {
        Command::Ingest {
            path,
            namespace,
            include,
            exclude,
            language,
            workers,
            no_recursive,
        } => {
            let mut cfg = IngestConfig::from_env();
            cfg.include = include;
            cfg.exclude = exclude;
            cfg.recursive = !no_recursive;
            if let Some(w) = workers {
                cfg.workers = w.clamp(1, 64);
            }
            if let Some(tag) = language {
                cfg.language = Some(parse_language(&tag)?);
            }

            let driver = IngestDriver::new(
                Arc::new(ParserRegistry::new()),
                Arc::new(GraphLoader::new(graph.clone())),
                Arc::new(VectorLoader::new(vectors, embedder, vector_cfg)),
            );

            let (tx, mut rx) = tokio::sync::mpsc::channel::<FileOutcome>(64);
            let bar = ProgressBar::new_spinner().with_style(
                ProgressStyle::with_template("{spinner} {pos} files  {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            let reporter = tokio::spawn(async move {
                while let Some(outcome) = rx.recv().await {
                    bar.inc(1);
                    match &outcome.status {
                        FileStatus::Failed { reason } => {
                            bar.set_message(format!("failed {}: {reason}", outcome.file));
                        }
                        _ => bar.set_message(outcome.file.clone()),
                    }
                }
                bar.finish_and_clear();
            });

            let summary = driver
                .ingest(&path, &namespace, &cfg, Some(tx), &cancel)
                .await?;
            let _ = reporter.await;

            save_snapshot(&graph, &cli.snapshot_dir)
                .await
                .context("saving graph snapshot")?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Purge { namespace } => {
            let driver = IngestDriver::new(
                Arc::new(ParserRegistry::new()),
                Arc::new(GraphLoader::new(graph.clone())),
                Arc::new(VectorLoader::new(vectors, embedder, vector_cfg)),
            );
            let removed = driver.purge(&namespace).await?;
            save_snapshot(&graph, &cli.snapshot_dir)
                .await
                .context("saving graph snapshot")?;
            println!("{}", serde_json::to_string_pretty(&removed)?);
        }

        Command::Query {
            question,
            namespace,
            k_code,
            k_doc,
            budget_chars,
            no_llm,
            json,
        } => {
            let engine = RetrievalEngine::new(
                graph,
                vectors,
                embedder,
                RetrievalConfig {
                    collection_code: vector_cfg.collection_code.clone(),
                    collection_docs: vector_cfg.collection_docs.clone(),
                },
            );
            if !no_llm {
                if let Err(err) = profiles.ping_all().await {
                    warn!(error = %err, "LLM endpoint unreachable; the answer step may fail");
                }
            }
            let orchestrator = QueryOrchestrator::new(engine, profiles);
            let opts = QueryOptions {
                namespace,
                k_code,
                k_doc,
                budget_chars,
                use_llm: !no_llm,
                ..QueryOptions::default()
            };
            let outcome = orchestrator.ask(&question, &opts, &cancel).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                match &outcome.answer {
                    Some(answer) => println!("{answer}"),
                    None => {
                        println!(
                            "(no answer; {} code snippets, {} doc snippets retrieved)",
                            outcome.context.code.len(),
                            outcome.context.docs.len()
                        );
                        for (i, c) in outcome.context.code.iter().enumerate() {
                            println!(
                                "[C{}] {} {}:{} {}",
                                i + 1,
                                c.namespace,
                                c.file_path,
                                c.line_start,
                                c.signature
                            );
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

fn parse_language(tag: &str) -> Result<Language> {
    match tag.to_ascii_lowercase().as_str() {
        "go" => Ok(Language::Go),
        "js" | "javascript" => Ok(Language::Javascript),
        "ts" | "typescript" => Ok(Language::Typescript),
        "java" => Ok(Language::Java),
        "other" | "generic" => Ok(Language::Other),
        other => anyhow::bail!("unknown language tag: {other}"),
    }
}
