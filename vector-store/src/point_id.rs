//! Deterministic conversion from content-addressed unit ids to the
//! UUID-shaped point ids the vector store requires.
//!
//! The unit id's hex digits are truncated or zero-padded to 32 chars and
//! formatted `8-4-4-4-12`. The original id stays in `payload.original_id`
//! and remains the canonical join key back to the graph.

/// Derive the store-native point id for a unit id.
pub fn point_id_for(unit_id: &str) -> String {
    let mut hex: String = unit_id
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .map(|c| c.to_ascii_lowercase())
        .take(32)
        .collect();
    while hex.len() < 32 {
        hex.push('0');
    }
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_full_width_ids() {
        let id = "0123456789abcdef0123456789abcdef";
        assert_eq!(point_id_for(id), "01234567-89ab-cdef-0123-456789abcdef");
    }

    #[test]
    fn pads_short_ids() {
        assert_eq!(
            point_id_for("deadbeef"),
            "deadbeef-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn truncates_long_ids_deterministically() {
        let long = "f".repeat(64);
        assert_eq!(point_id_for(&long), point_id_for(&long));
        assert_eq!(point_id_for(&long).len(), 36);
    }
}
