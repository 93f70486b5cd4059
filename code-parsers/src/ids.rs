//! Stable identifiers for code units.
//!
//! The id is a deterministic content hash over the identity tuple
//! `(namespace, language, file_path, kind, name, line_start)`. Identical
//! inputs across runs and machines yield identical ids, which makes
//! re-ingestion idempotent and lets the vector payload's `original_id`
//! round-trip to the graph.

use crate::types::{Language, UnitKind};
use sha2::{Digest, Sha256};

/// Number of lowercase hex chars kept from the digest.
pub const ID_HEX_LEN: usize = 32;

/// Compute the content-addressed id for a code unit.
pub fn unit_id(
    namespace: &str,
    language: Language,
    file_path: &str,
    kind: UnitKind,
    name: &str,
    line_start: usize,
) -> String {
    let key = format!("{namespace}|{language}|{file_path}|{kind}|{name}|{line_start}");
    let digest = Sha256::digest(key.as_bytes());
    let mut out = String::with_capacity(ID_HEX_LEN);
    for b in digest.iter() {
        if out.len() >= ID_HEX_LEN {
            break;
        }
        out.push_str(&format!("{b:02x}"));
    }
    out.truncate(ID_HEX_LEN);
    out
}
