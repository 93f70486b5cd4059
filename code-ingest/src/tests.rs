use crate::{FileStatus, IngestConfig, IngestDriver};
use code_parsers::ParserRegistry;
use graph_store::{GraphLoader, GraphStore, MemoryGraph};
use llm_service::{EmbeddingClient, EmbeddingConfig, EmbeddingsProvider, LlmError};
use std::fs;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use vector_store::{MemoryVectorStore, VectorConfig, VectorLoader, VectorStore};

const DIM: usize = 16;

struct HistogramEmbedder;

impl EmbeddingsProvider for HistogramEmbedder {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, LlmError>> + Send + 'a>> {
        Box::pin(async move {
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

fn make_driver() -> (Arc<MemoryGraph>, Arc<MemoryVectorStore>, IngestDriver) {
    let graph = Arc::new(MemoryGraph::new());
    let vectors = Arc::new(MemoryVectorStore::new());
    let embedder = Arc::new(EmbeddingClient::new(
        Arc::new(HistogramEmbedder),
        EmbeddingConfig {
            dimension: DIM,
            batch_size: 8,
            max_attempts: 2,
            backoff_ms: 1,
        },
    ));
    let vector_cfg = VectorConfig {
        dimension: DIM,
        ..VectorConfig::default()
    };
    let driver = IngestDriver::new(
        Arc::new(ParserRegistry::new()),
        Arc::new(GraphLoader::new(graph.clone())),
        Arc::new(VectorLoader::new(vectors.clone(), embedder, vector_cfg)),
    );
    (graph, vectors, driver)
}

fn write_tree(root: &Path) {
    fs::create_dir_all(root.join("payment")).expect("mkdir");
    fs::create_dir_all(root.join("front-end")).expect("mkdir");
    fs::create_dir_all(root.join("node_modules/junk")).expect("mkdir");

    fs::write(
        root.join("payment/service.go"),
        r#"package payment

type Service interface {
	Authorise(amount float32) (Authorisation, error)
}

type service struct {
	declineOverAmount float32
}

func (s *service) Authorise(amount float32) (Authorisation, error) {
	return Authorisation{Authorised: true}, nil
}
"#,
    )
    .expect("write");

    fs::write(
        root.join("payment/endpoints.go"),
        r#"package payment

func MakeAuthoriseEndpoint(svc Service) Endpoint {
	return func(ctx Context, request interface{}) (interface{}, error) {
		authorisation, err := svc.Authorise(request.Amount)
		return AuthoriseResponse{Authorisation: authorisation, Err: err}, nil
	}
}
"#,
    )
    .expect("write");

    fs::write(
        root.join("front-end/index.js"),
        r#"(function () {
  function addToCart(itemId) {
    fetch("/cart", { method: "POST", body: itemId });
  }
  module.exports = addToCart;
})();
"#,
    )
    .expect("write");

    // Not parseable: skipped during scan, never reaches the workers.
    fs::write(root.join("README.txt"), "hello").expect("write");
    // Vendor dir: pruned entirely.
    fs::write(root.join("node_modules/junk/big.js"), "function x() {}").expect("write");
}

#[tokio::test]
async fn ingest_end_to_end() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_tree(dir.path());
    let (graph, vectors, driver) = make_driver();

    let cancel = CancellationToken::new();
    let summary = driver
        .ingest(
            dir.path(),
            "sock_shop:payment",
            &IngestConfig::default(),
            None,
            &cancel,
        )
        .await
        .expect("ingest");

    assert_eq!(summary.files, 3, "two go files + one js file");
    assert_eq!(summary.files_failed, 0);
    assert!(!summary.cancelled);
    assert!(summary.units > 0);
    assert!(summary.calls_resolved >= 1, "svc.Authorise resolves");

    let counts = graph.counts("sock_shop:payment").await.expect("counts");
    assert_eq!(counts.units, summary.units);
    assert_eq!(summary.vectors_written as usize, summary.units);
    assert_eq!(vectors.len("code_units").await, summary.units);
}

#[tokio::test]
async fn reingest_is_idempotent_across_both_stores() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_tree(dir.path());
    let (graph, vectors, driver) = make_driver();
    let cancel = CancellationToken::new();
    let cfg = IngestConfig::default();

    let first = driver
        .ingest(dir.path(), "demo:svc", &cfg, None, &cancel)
        .await
        .expect("ingest");
    let counts_first = graph.counts("demo:svc").await.expect("counts");
    let points_first = vectors.len("code_units").await;

    let second = driver
        .ingest(dir.path(), "demo:svc", &cfg, None, &cancel)
        .await
        .expect("reingest");
    let counts_second = graph.counts("demo:svc").await.expect("counts");
    let points_second = vectors.len("code_units").await;

    assert_eq!(first.units, second.units);
    assert_eq!(counts_first, counts_second);
    assert_eq!(points_first, points_second);
}

#[tokio::test]
async fn exclude_globs_drop_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_tree(dir.path());
    let (graph, _, driver) = make_driver();
    let cfg = IngestConfig {
        exclude: vec!["**/*.js".into()],
        ..IngestConfig::default()
    };

    let summary = driver
        .ingest(
            dir.path(),
            "demo:svc",
            &cfg,
            None,
            &CancellationToken::new(),
        )
        .await
        .expect("ingest");
    assert_eq!(summary.files, 2, "only the go files remain");

    let js_units = graph
        .units_by_name("demo:svc", "addToCart")
        .await
        .expect("lookup");
    assert!(js_units.is_empty());
}

#[tokio::test]
async fn progress_channel_reports_every_file()
{
    let dir = tempfile::tempdir().expect("tempdir");
    write_tree(dir.path());
    let (_, _, driver) = make_driver();
    let (tx, mut rx) = tokio::sync::mpsc::channel(4);

    let summary = driver
        .ingest(
            dir.path(),
            "demo:svc",
            &IngestConfig::default(),
            Some(tx),
            &CancellationToken::new(),
        )
        .await
        .expect("ingest");

    let mut outcomes = Vec::new();
    while let Ok(outcome) = rx.try_recv() {
        outcomes.push(outcome);
    }
    assert_eq!(outcomes.len(), summary.files);
    assert!(outcomes
        .iter()
        .all(|o| matches!(o.status, FileStatus::Loaded { .. })));
}

#[tokio::test]
async fn cancelled_run_commits_nothing_new() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_tree(dir.path());
    let (graph, _, driver) = make_driver();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let summary = driver
        .ingest(
            dir.path(),
            "demo:svc",
            &IngestConfig::default(),
            None,
            &cancel,
        )
        .await
        .expect("ingest returns partial summary");

    assert!(summary.cancelled);
    assert_eq!(summary.files_skipped, summary.files);
    let counts = graph.counts("demo:svc").await.expect("counts");
    assert_eq!(counts.units, 0);
}

#[tokio::test]
async fn purge_clears_graph_and_vectors() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_tree(dir.path());
    let (graph, vectors, driver) = make_driver();
    let cancel = CancellationToken::new();
    let cfg = IngestConfig::default();

    driver
        .ingest(dir.path(), "ns_a:svc", &cfg, None, &cancel)
        .await
        .expect("ingest a");
    driver
        .ingest(dir.path(), "ns_b:svc", &cfg, None, &cancel)
        .await
        .expect("ingest b");

    let removed = driver.purge("ns_a:svc").await.expect("purge");
    assert!(removed.graph_units > 0);
    assert!(removed.vector_points > 0);

    let a = graph.counts("ns_a:svc").await.expect("counts");
    assert_eq!(a.units, 0);
    let b = graph.counts("ns_b:svc").await.expect("counts");
    assert!(b.units > 0);

    // Vector side: only ns_b points remain.
    let hits = vectors
        .search(
            "code_units",
            vec![1.0; DIM],
            100,
            Some(vector_store::PayloadFilter::namespace("ns_a:svc")),
        )
        .await
        .expect("search");
    assert!(hits.is_empty());
}
