//! JSONL snapshots for the in-memory backend.
//!
//! Three line-delimited files per snapshot directory: `units.jsonl`,
//! `calls.jsonl`, `imports.jsonl`. Loading replays them through the normal
//! store API, so a snapshot round-trip preserves every invariant the live
//! store enforces.

use crate::errors::GraphError;
use crate::memory::MemoryGraph;
use crate::store::{CallEdge, FileBatch, GraphStore, ImportEdge};
use code_parsers::{CodeUnit, ImportRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

#[derive(Serialize, Deserialize)]
struct CallRow {
    namespace: String,
    caller_id: String,
    callee_id: String,
}

/// Write the whole store into `dir` (created if missing).
pub async fn save_snapshot(graph: &MemoryGraph, dir: &Path) -> Result<(), GraphError> {
    fs::create_dir_all(dir)?;
    let state = graph.export_state().await;

    let mut units_out = BufWriter::new(File::create(dir.join("units.jsonl"))?);
    let mut calls_out = BufWriter::new(File::create(dir.join("calls.jsonl"))?);
    let mut imports_out = BufWriter::new(File::create(dir.join("imports.jsonl"))?);

    let mut units = 0usize;
    for (ns, (ns_units, ns_calls, ns_imports)) in state {
        for unit in &ns_units {
            serde_json::to_writer(&mut units_out, unit)?;
            units_out.write_all(b"\n")?;
            units += 1;
        }
        for call in &ns_calls {
            let row = CallRow {
                namespace: ns.clone(),
                caller_id: call.caller_id.clone(),
                callee_id: call.callee_id.clone(),
            };
            serde_json::to_writer(&mut calls_out, &row)?;
            calls_out.write_all(b"\n")?;
        }
        for import in &ns_imports {
            serde_json::to_writer(&mut imports_out, import)?;
            imports_out.write_all(b"\n")?;
        }
    }
    units_out.flush()?;
    calls_out.flush()?;
    imports_out.flush()?;

    info!(dir = %dir.display(), units, "graph snapshot saved");
    Ok(())
}

/// Rebuild a [`MemoryGraph`] from a snapshot directory. A missing directory
/// yields an empty, schema-ready store.
pub async fn load_snapshot(dir: &Path) -> Result<MemoryGraph, GraphError> {
    let graph = MemoryGraph::new();
    graph.ensure_schema().await?;
    if !dir.exists() {
        debug!(dir = %dir.display(), "no snapshot, starting empty");
        return Ok(graph);
    }

    let units: Vec<CodeUnit> = read_jsonl(&dir.join("units.jsonl"))?;
    let imports: Vec<ImportEdge> = read_jsonl(&dir.join("imports.jsonl"))?;
    let calls: Vec<CallRow> = read_jsonl(&dir.join("calls.jsonl"))?;

    // Imports attach to their module unit's file batch.
    let mut module_file: BTreeMap<&str, (&str, &str)> = BTreeMap::new();
    for unit in &units {
        module_file.insert(&unit.id, (&unit.namespace, &unit.file_path));
    }
    let mut imports_by_file: BTreeMap<(String, String), Vec<ImportRef>> = BTreeMap::new();
    for row in &imports {
        if let Some((ns, file)) = module_file.get(row.module_id.as_str()) {
            imports_by_file
                .entry((ns.to_string(), file.to_string()))
                .or_default()
                .push(ImportRef {
                    module_id: row.module_id.clone(),
                    target: row.target.clone(),
                    origin: row.origin,
                    line: row.line,
                });
        }
    }

    let mut batches: BTreeMap<(String, String), Vec<CodeUnit>> = BTreeMap::new();
    for unit in units {
        batches
            .entry((unit.namespace.clone(), unit.file_path.clone()))
            .or_default()
            .push(unit);
    }
    for ((namespace, file_path), file_units) in batches {
        let imports = imports_by_file
            .remove(&(namespace.clone(), file_path.clone()))
            .unwrap_or_default();
        graph
            .apply_file(FileBatch {
                namespace,
                file_path,
                units: file_units,
                imports,
            })
            .await?;
    }

    let mut calls_by_ns: BTreeMap<String, Vec<CallEdge>> = BTreeMap::new();
    for row in calls {
        calls_by_ns.entry(row.namespace).or_default().push(CallEdge {
            caller_id: row.caller_id,
            callee_id: row.callee_id,
        });
    }
    for (ns, edges) in calls_by_ns {
        graph.write_calls(&ns, &edges).await?;
        graph.refresh_entry_points(&ns).await?;
    }

    info!(dir = %dir.display(), "graph snapshot loaded");
    Ok(graph)
}

fn read_jsonl<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, GraphError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let reader = BufReader::new(File::open(path)?);
    let mut out = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        out.push(serde_json::from_str(&line)?);
    }
    Ok(out)
}
