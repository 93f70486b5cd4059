//! Ingestion configuration.

use code_parsers::Language;
use serde::{Deserialize, Serialize};
use std::env;

/// Options for one ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub recursive: bool,
    /// Include globs (empty = everything).
    pub include: Vec<String>,
    /// Exclude globs, applied after the built-in vendor-dir pruning.
    pub exclude: Vec<String>,
    /// Force a language instead of extension dispatch.
    pub language: Option<Language>,
    /// Bounded worker pool size.
    pub workers: usize,
    /// Files larger than this are skipped.
    pub max_file_bytes: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            include: Vec::new(),
            exclude: Vec::new(),
            language: None,
            workers: 8,
            max_file_bytes: 2 * 1024 * 1024,
        }
    }
}

impl IngestConfig {
    /// Defaults with optional env overrides:
    /// `INGEST_WORKERS`, `INGEST_MAX_FILE_BYTES`.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = env_usize("INGEST_WORKERS") {
            cfg.workers = v.clamp(1, 64);
        }
        if let Some(v) = env_usize("INGEST_MAX_FILE_BYTES") {
            cfg.max_file_bytes = v;
        }
        cfg
    }
}

fn env_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
