use crate::retrieve::{RetrievalConfig, RetrievalEngine};
use crate::{QueryOptions, QueryOrchestrator};
use code_parsers::ParserRegistry;
use graph_store::{GraphLoader, GraphStore, MemoryGraph, PendingCall};
use llm_service::{EmbeddingClient, EmbeddingConfig, EmbeddingsProvider, LlmError, TextGenerator};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use vector_store::{MemoryVectorStore, VectorConfig, VectorLoader};

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

/// Echoes the prompt back, so tests can inspect what the LLM would see.
struct EchoLlm;

impl TextGenerator for EchoLlm {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        _system: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<String, LlmError>> + Send + 'a>> {
        Box::pin(async move { Ok(prompt.to_string()) })
    }
}

struct FailingLlm;

impl TextGenerator for FailingLlm {
    fn generate<'a>(
        &'a self,
        _prompt: &'a str,
        _system: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<String, LlmError>> + Send + 'a>> {
        Box::pin(async move { Err(LlmError::Decode("model offline".into())) })
    }
}

const SERVICE_GO: &str = r#"package payment

type Service interface {
	Authorise(amount float32) (Authorisation, error)
}

type service struct {
	declineOverAmount float32
}

func (s *service) Authorise(amount float32) (Authorisation, error) {
	return Authorisation{Authorised: true}, nil
}
"#;

const ENDPOINTS_GO: &str = r#"package payment

func MakeAuthoriseEndpoint(svc Service) Endpoint {
	return func(ctx Context, request interface{}) (interface{}, error) {
		authorisation, err := svc.Authorise(request.Amount)
		return AuthoriseResponse{Authorisation: authorisation, Err: err}, nil
	}
}
"#;

const TRANSPORT_GO: &str = r#"package payment

func decodeAuthoriseRequest(r Request) (interface{}, error) {
	var request AuthoriseRequest
	return request, nil
}

func encodeAuthoriseResponse(w Writer, response interface{}) error {
	resp := response.(AuthoriseResponse)
	if resp.Err != nil {
		encodeError(w, resp.Err)
	}
	return nil
}

func encodeError(w Writer, err error) {
}
"#;

struct Fixture {
    graph: Arc<MemoryGraph>,
    vectors: Arc<MemoryVectorStore>,
    embedder: Arc<EmbeddingClient>,
}

async fn seed(namespaces: &[&str]) -> Fixture {
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

    let registry = ParserRegistry::new();
    let loader = GraphLoader::new(graph.clone());
    loader.ensure_schema().await.expect("schema");
    let vec_loader = VectorLoader::new(
        vectors.clone(),
        embedder.clone(),
        VectorConfig {
            dimension: DIM,
            ..VectorConfig::default()
        },
    );

    for ns in namespaces {
        let mut pending: Vec<PendingCall> = Vec::new();
        for (path, source) in [
            ("service.go", SERVICE_GO),
            ("endpoints.go", ENDPOINTS_GO),
            ("transport.go", TRANSPORT_GO),
        ] {
            let parsed = registry
                .parse_source(None, source, ns, path)
                .expect("parser");
            pending.extend(loader.load_units(&parsed).await.expect("graph load"));
            vec_loader.load(&parsed).await.expect("vector load");
        }
        loader.resolve_calls(ns, &pending).await.expect("resolve");
        loader.finish_namespace(ns).await.expect("entry points");
    }

    Fixture {
        graph,
        vectors,
        embedder,
    }
}

fn engine(fx: &Fixture) -> RetrievalEngine {
    RetrievalEngine::new(
        fx.graph.clone(),
        fx.vectors.clone(),
        fx.embedder.clone(),
        RetrievalConfig::default(),
    )
}

fn wide_options() -> QueryOptions {
    QueryOptions {
        k_code: 20,
        m_graph: 20,
        ..QueryOptions::default()
    }
}

#[tokio::test]
async fn query_fusion_over_the_payment_corpus() {
    let fx = seed(&["sock_shop:payment"]).await;
    let orchestrator = QueryOrchestrator::new(engine(&fx), Arc::new(EchoLlm));

    let outcome = orchestrator
        .ask(
            "How does payment authorization work?",
            &wide_options(),
            &CancellationToken::new(),
        )
        .await
        .expect("ask");

    assert!(outcome.llm_ran);
    let names: Vec<&str> = outcome.context.code.iter().map(|c| c.name.as_str()).collect();
    for required in ["Authorise", "MakeAuthoriseEndpoint", "decodeAuthoriseRequest"] {
        assert!(names.contains(&required), "{required} in context");
    }
    assert!(
        outcome
            .context
            .call_edges
            .iter()
            .any(|e| e.caller == "MakeAuthoriseEndpoint" && e.callee == "Authorise"),
        "call edge among the hits"
    );
    assert!(outcome.context.total_chars <= QueryOptions::default().budget_chars);

    // The echo LLM returns the prompt: verify the contract sections.
    let prompt = outcome.answer.expect("answer");
    assert!(prompt.contains("Question:"));
    assert!(prompt.contains("Code snippets:"));
    assert!(prompt.contains("[C1]"));
    assert!(prompt.contains("Call edges:"));
    assert!(prompt.contains("cite by index"));
}

#[tokio::test]
async fn budget_truncates_lowest_scores_first() {
    let fx = seed(&["sock_shop:payment"]).await;
    let orchestrator = QueryOrchestrator::new(engine(&fx), Arc::new(EchoLlm));
    let opts = QueryOptions {
        budget_chars: 300,
        use_llm: false,
        ..wide_options()
    };

    let outcome = orchestrator
        .ask("authorisation", &opts, &CancellationToken::new())
        .await
        .expect("ask");

    assert!(outcome.context.truncated);
    assert!(outcome.context.total_chars <= 300);
    assert!(
        !outcome.context.code.is_empty(),
        "highest-scoring snippet still fits"
    );
}

#[tokio::test]
async fn failed_llm_still_returns_the_context() {
    let fx = seed(&["sock_shop:payment"]).await;
    let orchestrator = QueryOrchestrator::new(engine(&fx), Arc::new(FailingLlm));

    let outcome = orchestrator
        .ask(
            "How does payment authorization work?",
            &wide_options(),
            &CancellationToken::new(),
        )
        .await
        .expect("ask");

    assert!(outcome.llm_ran, "the LLM step was attempted");
    assert!(outcome.answer.is_none());
    assert!(!outcome.context.code.is_empty());
}

#[tokio::test]
async fn use_llm_false_skips_the_model() {
    let fx = seed(&["sock_shop:payment"]).await;
    let orchestrator = QueryOrchestrator::new(engine(&fx), Arc::new(FailingLlm));
    let opts = QueryOptions {
        use_llm: false,
        ..wide_options()
    };

    let outcome = orchestrator
        .ask("anything", &opts, &CancellationToken::new())
        .await
        .expect("ask");
    assert!(!outcome.llm_ran);
    assert!(outcome.answer.is_none());
}

#[tokio::test]
async fn cancellation_returns_partial_context() {
    let fx = seed(&["sock_shop:payment"]).await;
    let orchestrator = QueryOrchestrator::new(engine(&fx), Arc::new(EchoLlm));

    let cancel = CancellationToken::new();
    cancel.cancel();
    let outcome = orchestrator
        .ask("anything", &wide_options(), &cancel)
        .await
        .expect("cancellation is not an error");
    assert!(!outcome.llm_ran);
    assert!(outcome.answer.is_none());
    assert!(outcome.context.code.is_empty());
}

#[tokio::test]
async fn namespace_filter_and_prefix_filtering() {
    let fx = seed(&["shop_a:payment", "shop_b:payment"]).await;
    let eng = engine(&fx);
    let qvec = fx.embedder.embed("authorise").await.expect("embed");

    let exact = eng
        .vector_search_text("authorise", Some("shop_a:payment"), 50)
        .await
        .expect("search");
    assert!(!exact.is_empty());
    assert!(exact.iter().all(|c| c.namespace == "shop_a:payment"));

    // Bare prefix matches only namespaces under that corpus.
    let prefix = eng
        .vector_search(qvec.clone(), Some("shop_a"), 50)
        .await
        .expect("search");
    assert!(!prefix.is_empty());
    assert!(prefix.iter().all(|c| c.namespace.starts_with("shop_a:")));

    let all = eng.vector_search(qvec, None, 50).await.expect("search");
    assert!(all.iter().any(|c| c.namespace == "shop_a:payment"));
    assert!(all.iter().any(|c| c.namespace == "shop_b:payment"));
}

#[tokio::test]
async fn vector_hits_without_graph_nodes_are_dropped() {
    let fx = seed(&["demo:svc"]).await;
    let eng = engine(&fx);
    let qvec = fx.embedder.embed("authorise").await.expect("embed");

    let before = eng
        .vector_search(qvec.clone(), Some("demo:svc"), 50)
        .await
        .expect("search");
    assert!(!before.is_empty());

    // Wipe the graph only: vector points remain but no longer join.
    fx.graph.purge("demo:svc").await.expect("purge");
    let after = eng
        .vector_search(qvec, Some("demo:svc"), 50)
        .await
        .expect("search succeeds");
    assert!(after.is_empty(), "orphaned vector hits are dropped silently");
}
