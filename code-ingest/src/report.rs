//! Per-file outcomes and run summaries surfaced to the caller.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What happened to one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum FileStatus {
    /// Parsed and written to the graph; vector counts may lag behind the
    /// unit count when embeddings were skipped.
    Loaded {
        units: usize,
        parse_issues: usize,
        vectors_written: u64,
        vectors_skipped: usize,
    },
    /// Graph write rejected or the file was unreadable; nothing persisted.
    Failed { reason: String },
    /// Not processed (cancellation, no parser).
    Skipped { reason: String },
}

/// Progress record emitted on the reporting channel, one per file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutcome {
    pub file: String,
    #[serde(flatten)]
    pub status: FileStatus,
}

/// Aggregate result of an ingestion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestSummary {
    /// Files handed to workers.
    pub files: usize,
    /// Units written to the graph.
    pub units: usize,
    /// Parse issues plus failed files.
    pub errors: usize,
    pub files_failed: usize,
    pub files_skipped: usize,
    pub vectors_written: u64,
    pub vectors_skipped: usize,
    pub calls_resolved: usize,
    pub entry_points: usize,
    pub cancelled: bool,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

/// What a namespace purge removed across both stores.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PurgeSummary {
    pub graph_units: usize,
    pub graph_edges: usize,
    pub vector_points: u64,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        d.as_secs_f64().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs))
    }
}
