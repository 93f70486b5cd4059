//! Point payload: the CodeUnit mirror stored next to each vector.

use code_parsers::{CodeUnit, Language, UnitKind, types::clamp_excerpt};
use serde::{Deserialize, Serialize};

/// Payload stored with every code point. Mirrors the unit minus the full
/// source text (`code_excerpt` is clamped) plus the canonical join key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointPayload {
    pub original_id: String,
    pub namespace: String,
    pub name: String,
    pub kind: UnitKind,
    pub language: Language,
    pub file_path: String,
    pub line_start: usize,
    pub line_end: usize,
    pub signature: String,
    pub code_excerpt: String,
}

impl PointPayload {
    pub fn from_unit(unit: &CodeUnit, excerpt_chars: usize) -> Self {
        Self {
            original_id: unit.id.clone(),
            namespace: unit.namespace.clone(),
            name: unit.name.clone(),
            kind: unit.kind,
            language: unit.language,
            file_path: unit.file_path.clone(),
            line_start: unit.line_start,
            line_end: unit.line_end,
            signature: unit.signature.clone(),
            code_excerpt: clamp_excerpt(&unit.code, excerpt_chars),
        }
    }
}

/// Embedding input for a unit: name, signature, docstring, and the code
/// excerpt, newline-joined with empty components elided.
pub fn embedding_input(unit: &CodeUnit, excerpt_chars: usize) -> String {
    let excerpt = clamp_excerpt(&unit.code, excerpt_chars);
    [
        unit.name.as_str(),
        unit.signature.as_str(),
        unit.docstring.as_str(),
        excerpt.as_str(),
    ]
    .iter()
    .filter(|s| !s.is_empty())
    .cloned()
    .collect::<Vec<_>>()
    .join("\n")
}
