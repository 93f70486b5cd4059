//! Filesystem scanning with skip diagnostics.

use crate::config::IngestConfig;
use crate::errors::IngestError;
use code_parsers::{Language, ParserRegistry};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// One parseable file discovered under the root.
#[derive(Debug, Clone)]
pub struct ScannedSource {
    pub path: PathBuf,
    /// Root-relative path with `/` separators; the portable identity key.
    pub rel_path: String,
    pub language: Language,
    pub size: u64,
}

/// Scan result plus per-reason skip counters.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub files: Vec<ScannedSource>,
    pub skipped_ignored: usize,
    pub skipped_too_big: usize,
    pub skipped_unknown: usize,
}

/// Walk `root` and collect files a registered parser can handle.
pub fn scan_tree(
    root: &Path,
    cfg: &IngestConfig,
    registry: &ParserRegistry,
) -> Result<ScanOutcome, IngestError> {
    if !root.exists() {
        return Err(IngestError::Scan(format!(
            "root does not exist: {}",
            root.display()
        )));
    }

    let include = build_globset(&cfg.include)?;
    let exclude = build_globset(&cfg.exclude)?;
    let mut out = ScanOutcome::default();

    let mut walker = WalkDir::new(root).follow_links(true);
    if !cfg.recursive {
        walker = walker.max_depth(1);
    }
    let walker = walker.into_iter().filter_entry(keep_entry);

    for entry in walker.filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let rel_path = relative_key(root, path);

        if let Some(inc) = &include {
            if !inc.is_match(&rel_path) {
                out.skipped_ignored += 1;
                continue;
            }
        }
        if let Some(exc) = &exclude {
            if exc.is_match(&rel_path) {
                out.skipped_ignored += 1;
                debug!(file = %rel_path, "skip (exclude glob)");
                continue;
            }
        }

        let size = match fs::metadata(path) {
            Ok(m) => m.len(),
            Err(err) => {
                warn!(file = %rel_path, error = %err, "metadata failed");
                continue;
            }
        };
        if size as usize > cfg.max_file_bytes {
            out.skipped_too_big += 1;
            debug!(file = %rel_path, size, "skip (too big)");
            continue;
        }

        let language = match cfg.language.or_else(|| registry.language_of(path)) {
            Some(lang) => lang,
            None => {
                out.skipped_unknown += 1;
                debug!(file = %rel_path, "skip (no parser)");
                continue;
            }
        };

        out.files.push(ScannedSource {
            path: path.to_path_buf(),
            rel_path,
            language,
            size,
        });
    }

    info!(
        files = out.files.len(),
        ignored = out.skipped_ignored,
        too_big = out.skipped_too_big,
        unknown = out.skipped_unknown,
        "scan done"
    );
    Ok(out)
}

/// Coarse directory pruning: never descend into vendor/build trees.
fn keep_entry(entry: &DirEntry) -> bool {
    if entry.file_type().is_dir() {
        if let Some(name) = entry.file_name().to_str() {
            return !matches!(
                name,
                ".git" | "node_modules" | "vendor" | "build" | "dist" | "target" | ".idea"
                    | ".vscode"
            );
        }
    }
    true
}

fn relative_key(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>, IngestError> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| IngestError::Scan(format!("bad glob {pattern}: {e}")))?;
        builder.add(glob);
    }
    let set = builder
        .build()
        .map_err(|e| IngestError::Scan(format!("globset build failed: {e}")))?;
    Ok(Some(set))
}
