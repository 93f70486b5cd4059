//! Payload filters and their Qdrant lowering.
//!
//! qdrant-client 1.15 specifics: `Condition` wraps
//! `condition_one_of: Option<condition::ConditionOneOf>`; `FieldCondition.r#match`
//! expects a `Match` wrapping `r#match::MatchValue`; float equality is
//! expressed as a degenerate `Range`.

use qdrant_client::qdrant::{
    Condition, FieldCondition, Filter, Match, Range, condition, r#match::MatchValue,
};
use serde_json::Value as J;

/// Exact-match filter over payload fields.
#[derive(Debug, Clone)]
pub enum PayloadFilter {
    /// `payload[key] == value`
    FieldEq { key: String, value: J },
    And(Vec<PayloadFilter>),
    Or(Vec<PayloadFilter>),
}

impl PayloadFilter {
    /// Convenience: the ubiquitous namespace filter.
    pub fn namespace(ns: &str) -> Self {
        Self::FieldEq {
            key: "namespace".into(),
            value: J::String(ns.to_string()),
        }
    }

    /// Evaluate against a JSON payload (used by the in-memory backend).
    pub fn matches(&self, payload: &J) -> bool {
        match self {
            Self::FieldEq { key, value } => payload.get(key) == Some(value),
            Self::And(list) => list.iter().all(|f| f.matches(payload)),
            Self::Or(list) => list.iter().any(|f| f.matches(payload)),
        }
    }
}

/// Lower a [`PayloadFilter`] into a concrete Qdrant `Filter`.
pub(crate) fn to_qdrant_filter(f: &PayloadFilter) -> Filter {
    match f {
        PayloadFilter::FieldEq { key, value } => Filter {
            must: vec![condition_field_eq(key.clone(), value)],
            ..Default::default()
        },

        PayloadFilter::And(list) => {
            let mut out = Filter::default();
            for sub in list {
                let sf = to_qdrant_filter(sub);
                out.must.extend(sf.must);
                out.should.extend(sf.should);
                out.must_not.extend(sf.must_not);
            }
            out
        }

        PayloadFilter::Or(list) => {
            let mut out = Filter::default();
            for sub in list {
                let sf = to_qdrant_filter(sub);
                out.should.push(Condition {
                    condition_one_of: Some(condition::ConditionOneOf::Filter(sf)),
                });
            }
            out
        }
    }
}

fn condition_field_eq(key: String, value: &J) -> Condition {
    let field = match value {
        J::String(s) => FieldCondition {
            key,
            r#match: Some(Match {
                match_value: Some(MatchValue::Keyword(s.clone())),
            }),
            ..Default::default()
        },

        J::Number(n) => {
            if let Some(i) = n.as_i64() {
                FieldCondition {
                    key,
                    r#match: Some(Match {
                        match_value: Some(MatchValue::Integer(i)),
                    }),
                    ..Default::default()
                }
            } else if let Some(f) = n.as_f64() {
                FieldCondition {
                    key,
                    range: Some(Range {
                        gte: Some(f),
                        lte: Some(f),
                        ..Default::default()
                    }),
                    ..Default::default()
                }
            } else {
                FieldCondition {
                    key,
                    r#match: Some(Match {
                        match_value: Some(MatchValue::Keyword(n.to_string())),
                    }),
                    ..Default::default()
                }
            }
        }

        J::Bool(b) => FieldCondition {
            key,
            r#match: Some(Match {
                match_value: Some(MatchValue::Boolean(*b)),
            }),
            ..Default::default()
        },

        other => FieldCondition {
            key,
            r#match: Some(Match {
                match_value: Some(MatchValue::Keyword(other.to_string())),
            }),
            ..Default::default()
        },
    };

    Condition {
        condition_one_of: Some(condition::ConditionOneOf::Field(field)),
    }
}
