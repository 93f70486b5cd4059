use crate::config::{DistanceKind, VectorConfig};
use crate::filters::PayloadFilter;
use crate::loader::VectorLoader;
use crate::memory::MemoryVectorStore;
use crate::payload::PointPayload;
use crate::point_id::point_id_for;
use crate::store::{VectorPoint, VectorStore};
use code_parsers::{LanguageParser, languages::go::GoParser};
use llm_service::{EmbeddingClient, EmbeddingConfig, EmbeddingsProvider, LlmError};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

const DIM: usize = 16;

/// Deterministic embedder: character histogram folded into `DIM` buckets.
/// Identical texts map to identical vectors, so exact-match retrieval is
/// testable without a model.
struct HistogramEmbedder;

impl EmbeddingsProvider for HistogramEmbedder {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, LlmError>> + Send + 'a>> {
        Box::pin(async move {
            // Embedding input starts with the unit name; "Poisoned" units
            // simulate a permanently failing remote.
            if text.starts_with("Poisoned") {
                return Err(LlmError::Decode("poisoned fixture text".into()));
            }
            let mut v = vec![0.0f32; DIM];
            for b in text.bytes() {
                v[(b as usize) % DIM] += 1.0;
            }
            Ok(v)
        })
    }

    fn model_id(&self) -> &str {
        "histogram-test"
    }
}

fn embedder() -> Arc<EmbeddingClient> {
    Arc::new(EmbeddingClient::new(
        Arc::new(HistogramEmbedder),
        EmbeddingConfig {
            dimension: DIM,
            batch_size: 4,
            max_attempts: 2,
            backoff_ms: 1,
        },
    ))
}

fn config() -> VectorConfig {
    VectorConfig {
        dimension: DIM,
        upsert_batch: 3,
        ..VectorConfig::default()
    }
}

async fn seeded_store(texts: &[(&str, &str)]) -> (Arc<MemoryVectorStore>, Arc<EmbeddingClient>) {
    let store = Arc::new(MemoryVectorStore::new());
    store
        .ensure_collection("code_units", DIM, DistanceKind::Cosine)
        .await
        .expect("collection");
    let emb = embedder();
    let mut points = Vec::new();
    for (id, text) in texts {
        let vector = emb.embed(text).await.expect("embed");
        points.push(VectorPoint {
            id: point_id_for(id),
            vector,
            payload: serde_json::json!({
                "original_id": id,
                "namespace": "demo:svc",
                "name": id,
                "code_excerpt": text,
            }),
        });
    }
    store.upsert("code_units", points).await.expect("upsert");
    (store, emb)
}

#[tokio::test]
async fn embed_upsert_search_round_trip() {
    let corpus = [
        ("unit_a", "func Authorise(amount float32) checks the limit"),
        ("unit_b", "func MakeHTTPHandler(e Endpoint) mounts routes"),
        ("unit_c", "type Service interface for payments"),
        ("unit_d", "func decodeAuthoriseRequest parses the body"),
        ("unit_e", "func encodeError writes a 500"),
        ("unit_f", "completely unrelated text about gardening"),
    ];
    let (store, emb) = seeded_store(&corpus).await;

    for (id, text) in &corpus {
        let query = emb.embed(text).await.expect("embed query");
        let hits = store
            .search("code_units", query, 5, None)
            .await
            .expect("search");
        assert!(
            hits.iter().any(|h| h.original_id() == Some(*id)),
            "{id} is among the top-5 for its own text"
        );
    }
}

#[tokio::test]
async fn namespace_filter_is_a_hard_filter() {
    let store = Arc::new(MemoryVectorStore::new());
    store
        .ensure_collection("code_units", DIM, DistanceKind::Cosine)
        .await
        .expect("collection");
    let emb = embedder();
    let text = "identical text in two namespaces";
    let vector = emb.embed(text).await.expect("embed");
    for ns in ["ns_a:svc", "ns_b:svc"] {
        store
            .upsert(
                "code_units",
                vec![VectorPoint {
                    id: point_id_for(&format!("{ns}-unit")),
                    vector: vector.clone(),
                    payload: serde_json::json!({"original_id": ns, "namespace": ns}),
                }],
            )
            .await
            .expect("upsert");
    }

    let hits = store
        .search(
            "code_units",
            vector,
            10,
            Some(PayloadFilter::namespace("ns_a:svc")),
        )
        .await
        .expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].namespace(), Some("ns_a:svc"));
}

#[tokio::test]
async fn delete_by_namespace_leaves_siblings() {
    let (store, _) = seeded_store(&[("a", "alpha"), ("b", "beta")]).await;
    // Add one point under a different namespace.
    let emb = embedder();
    let v = emb.embed("gamma").await.expect("embed");
    store
        .upsert(
            "code_units",
            vec![VectorPoint {
                id: point_id_for("c"),
                vector: v,
                payload: serde_json::json!({"original_id": "c", "namespace": "other:svc"}),
            }],
        )
        .await
        .expect("upsert");

    let removed = store
        .delete("code_units", PayloadFilter::namespace("demo:svc"))
        .await
        .expect("delete");
    assert_eq!(removed, 2);
    assert_eq!(store.len("code_units").await, 1);
}

#[tokio::test]
async fn missing_collection_searches_empty() {
    let store = MemoryVectorStore::new();
    let hits = store
        .search("documentation", vec![0.0; DIM], 5, None)
        .await
        .expect("search");
    assert!(hits.is_empty());
}

#[tokio::test]
async fn loader_writes_points_and_skips_failed_embeddings() {
    let source = r#"package payment

func Poisoned() {
}

func Healthy(amount float32) bool {
	return amount > 0
}
"#;
    let parsed = GoParser.parse_string(source, "demo:svc", "service.go");
    assert!(parsed.errors.is_empty());

    let store = Arc::new(MemoryVectorStore::new());
    let loader = VectorLoader::new(store.clone(), embedder(), config());
    let outcome = loader.load(&parsed).await.expect("load");

    // Module + Healthy land; Poisoned's embedding permanently fails.
    assert_eq!(outcome.skipped, 1);
    assert_eq!(outcome.written as usize, parsed.units.len() - 1);
    assert_eq!(store.len("code_units").await, parsed.units.len() - 1);
}

#[tokio::test]
async fn payload_round_trips_original_id() {
    let source = "package payment\n\nfunc Authorise(amount float32) bool { return true }\n";
    let parsed = GoParser.parse_string(source, "demo:svc", "service.go");
    let unit = parsed
        .units
        .iter()
        .find(|u| u.name == "Authorise")
        .expect("unit");

    let payload = PointPayload::from_unit(unit, 2000);
    let value = serde_json::to_value(&payload).expect("serialize");
    assert_eq!(
        value.get("original_id").and_then(|v| v.as_str()),
        Some(unit.id.as_str())
    );
    assert_eq!(
        value.get("namespace").and_then(|v| v.as_str()),
        Some("demo:svc")
    );

    // Point id is a well-formed UUID shape derived from the unit id.
    let pid = point_id_for(&unit.id);
    assert_eq!(pid.len(), 36);
    assert_eq!(pid.matches('-').count(), 4);
}
