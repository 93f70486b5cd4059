//! The ingestion driver proper.

use crate::config::IngestConfig;
use crate::errors::IngestError;
use crate::report::{FileOutcome, FileStatus, IngestSummary, PurgeSummary};
use crate::scan::{ScannedSource, scan_tree};
use code_parsers::{Language, ParserRegistry};
use futures::stream::{self, StreamExt};
use graph_store::{GraphLoader, GraphStore, PendingCall};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vector_store::VectorLoader;

/// Owns the handles (registry, graph loader, vector loader) and coordinates
/// one namespace per run. No global state: everything is constructor-injected.
pub struct IngestDriver {
    registry: Arc<ParserRegistry>,
    graph: Arc<GraphLoader>,
    vectors: Arc<VectorLoader>,
}

impl IngestDriver {
    pub fn new(
        registry: Arc<ParserRegistry>,
        graph: Arc<GraphLoader>,
        vectors: Arc<VectorLoader>,
    ) -> Self {
        Self {
            registry,
            graph,
            vectors,
        }
    }

    /// Ingest a source tree into `namespace`.
    ///
    /// Files are processed by a bounded worker pool; per-file outcomes stream
    /// over `progress` when provided. Cancellation is cooperative: workers
    /// observe the token between files, committed per-file transactions stay
    /// in place, and re-running the same ingest is idempotent.
    ///
    /// # Errors
    /// Only fatal setup failures (schema init, unreadable root) error out;
    /// per-file problems land in the summary instead.
    pub async fn ingest(
        &self,
        root: &Path,
        namespace: &str,
        cfg: &IngestConfig,
        progress: Option<mpsc::Sender<FileOutcome>>,
        cancel: &CancellationToken,
    ) -> Result<IngestSummary, IngestError> {
        let started = Instant::now();
        self.graph.ensure_schema().await?;

        let scan = scan_tree(root, cfg, &self.registry)?;
        info!(namespace, files = scan.files.len(), "ingest starting");

        let workers = cfg.workers.max(1);
        let results: Vec<(FileOutcome, Vec<PendingCall>, usize)> = stream::iter(scan.files)
            .map(|file| {
                let registry = Arc::clone(&self.registry);
                let graph = Arc::clone(&self.graph);
                let vectors = Arc::clone(&self.vectors);
                let namespace = namespace.to_string();
                let tag = cfg.language;
                let cancel = cancel.clone();
                let progress = progress.clone();
                async move {
                    let (outcome, pending, units) =
                        process_file(registry, graph, vectors, file, namespace, tag, cancel).await;
                    if let Some(tx) = progress {
                        // A dropped receiver only disables progress reporting.
                        let _ = tx.send(outcome.clone()).await;
                    }
                    (outcome, pending, units)
                }
            })
            .buffer_unordered(workers)
            .collect()
            .await;

        let mut summary = IngestSummary {
            files: results.len(),
            ..IngestSummary::default()
        };
        let mut pending: Vec<PendingCall> = Vec::new();
        for (outcome, file_pending, units) in results {
            summary.units += units;
            pending.extend(file_pending);
            match &outcome.status {
                FileStatus::Loaded {
                    parse_issues,
                    vectors_written,
                    vectors_skipped,
                    ..
                } => {
                    summary.errors += parse_issues;
                    summary.vectors_written += vectors_written;
                    summary.vectors_skipped += vectors_skipped;
                }
                FileStatus::Failed { .. } => {
                    summary.errors += 1;
                    summary.files_failed += 1;
                }
                FileStatus::Skipped { .. } => summary.files_skipped += 1,
            }
        }

        if cancel.is_cancelled() {
            summary.cancelled = true;
            summary.duration = started.elapsed();
            warn!(namespace, "ingest cancelled before call resolution");
            return Ok(summary);
        }

        // Nodes for the namespace are all written; now the CALLS pass.
        summary.calls_resolved = self.graph.resolve_calls(namespace, &pending).await?;
        summary.entry_points = self.graph.finish_namespace(namespace).await?;
        summary.duration = started.elapsed();

        info!(
            namespace,
            files = summary.files,
            units = summary.units,
            calls = summary.calls_resolved,
            errors = summary.errors,
            "ingest finished"
        );
        Ok(summary)
    }

    /// Remove a namespace from both stores.
    pub async fn purge(&self, namespace: &str) -> Result<PurgeSummary, IngestError> {
        let graph_counts = self.graph.store().purge(namespace).await?;
        let vector_points = self.vectors.purge_namespace(namespace).await?;
        info!(
            namespace,
            units = graph_counts.units,
            edges = graph_counts.edges,
            vector_points,
            "namespace purged"
        );
        Ok(PurgeSummary {
            graph_units: graph_counts.units,
            graph_edges: graph_counts.edges,
            vector_points,
        })
    }
}

async fn process_file(
    registry: Arc<ParserRegistry>,
    graph: Arc<GraphLoader>,
    vectors: Arc<VectorLoader>,
    file: ScannedSource,
    namespace: String,
    tag: Option<Language>,
    cancel: CancellationToken,
) -> (FileOutcome, Vec<PendingCall>, usize) {
    let rel = file.rel_path.clone();
    if cancel.is_cancelled() {
        return (
            FileOutcome {
                file: rel,
                status: FileStatus::Skipped {
                    reason: "cancelled".into(),
                },
            },
            Vec::new(),
            0,
        );
    }

    // Parsing is CPU-bound: keep it off the async workers so it never holds
    // a network slot.
    let parse_task = {
        let registry = Arc::clone(&registry);
        let path = file.path.clone();
        let rel = file.rel_path.clone();
        let namespace = namespace.clone();
        tokio::task::spawn_blocking(move || {
            let source = std::fs::read_to_string(&path)?;
            Ok::<_, std::io::Error>(registry.parse_source(tag, &source, &namespace, &rel))
        })
    };

    let parsed = match parse_task.await {
        Ok(Ok(Some(parsed))) => parsed,
        Ok(Ok(None)) => {
            return (
                FileOutcome {
                    file: rel,
                    status: FileStatus::Skipped {
                        reason: "no parser".into(),
                    },
                },
                Vec::new(),
                0,
            );
        }
        Ok(Err(err)) => {
            return (
                FileOutcome {
                    file: rel,
                    status: FileStatus::Failed {
                        reason: format!("read failed: {err}"),
                    },
                },
                Vec::new(),
                0,
            );
        }
        Err(join_err) => {
            return (
                FileOutcome {
                    file: rel,
                    status: FileStatus::Failed {
                        reason: format!("parse task failed: {join_err}"),
                    },
                },
                Vec::new(),
                0,
            );
        }
    };

    let units = parsed.units.len();
    let parse_issues = parsed.errors.len();

    let pending = match graph.load_units(&parsed).await {
        Ok(pending) => pending,
        Err(err) => {
            // Per-file transaction: nothing from this file persisted.
            return (
                FileOutcome {
                    file: rel,
                    status: FileStatus::Failed {
                        reason: err.to_string(),
                    },
                },
                Vec::new(),
                0,
            );
        }
    };

    let (vectors_written, vectors_skipped) = match vectors.load(&parsed).await {
        Ok(outcome) => (outcome.written, outcome.skipped),
        Err(err) => {
            // Vector writes are not transactional with graph writes; the
            // graph keeps the units and retrieval falls back to graph-only.
            warn!(file = %rel, error = %err, "vector load failed, graph kept");
            (0, units)
        }
    };

    (
        FileOutcome {
            file: rel,
            status: FileStatus::Loaded {
                units,
                parse_issues,
                vectors_written,
                vectors_skipped,
            },
        },
        pending,
        units,
    )
}
