use crate::{GraphLoader, GraphStore, MemoryGraph, PendingCall, load_snapshot, save_snapshot};
use code_parsers::{ParserRegistry, UnitKind};
use std::sync::Arc;

const SERVICE_GO: &str = r#"package payment

// Service authorises payments against a configured limit.
type Service interface {
	Authorise(amount float32) (Authorisation, error)
}

type service struct {
	declineOverAmount float32
}

func (s *service) Authorise(amount float32) (Authorisation, error) {
	if amount > s.declineOverAmount {
		return Authorisation{}, ErrInvalidPaymentAmount
	}
	return Authorisation{Authorised: true}, nil
}
"#;

const ENDPOINTS_GO: &str = r#"package payment

// MakeAuthoriseEndpoint wires the service into a transport endpoint.
func MakeAuthoriseEndpoint(svc Service) Endpoint {
	return func(ctx Context, request interface{}) (interface{}, error) {
		req := request.(AuthoriseRequest)
		authorisation, err := svc.Authorise(req.Amount)
		return AuthoriseResponse{Authorisation: authorisation, Err: err}, nil
	}
}
"#;

const TRANSPORT_GO: &str = r#"package payment

import (
	"encoding/json"
	"net/http"
)

// MakeHTTPHandler mounts the endpoints on a router.
func MakeHTTPHandler(e Endpoint) http.Handler {
	r := mux.NewRouter()
	r.Handle("/paymentAuth", decodeAuthoriseRequest)
	return r
}

func decodeAuthoriseRequest(r *http.Request) (interface{}, error) {
	var request AuthoriseRequest
	err := json.NewDecoder(r.Body).Decode(&request)
	return request, err
}

func encodeAuthoriseResponse(w http.ResponseWriter, response interface{}) error {
	resp := response.(AuthoriseResponse)
	if resp.Err != nil {
		encodeError(w, resp.Err)
		return nil
	}
	return json.NewEncoder(w).Encode(resp)
}

func encodeError(w http.ResponseWriter, err error) {
	w.WriteHeader(http.StatusInternalServerError)
	json.NewEncoder(w).Encode(map[string]interface{}{"error": err.Error()})
}
"#;

const PAYMENT_FILES: &[(&str, &str)] = &[
    ("transport.go", TRANSPORT_GO),
    ("endpoints.go", ENDPOINTS_GO),
    ("service.go", SERVICE_GO),
];

/// Parse and load a fixture tree into a fresh memory graph, running the full
/// two-phase protocol (nodes, then calls, then entry points).
async fn ingest(files: &[(&str, &str)], namespace: &str) -> (Arc<MemoryGraph>, GraphLoader) {
    let store = Arc::new(MemoryGraph::new());
    let loader = GraphLoader::new(store.clone());
    loader.ensure_schema().await.expect("schema");
    ingest_into(&loader, files, namespace).await;
    (store, loader)
}

async fn ingest_into(loader: &GraphLoader, files: &[(&str, &str)], namespace: &str) {
    let registry = ParserRegistry::new();
    let mut pending: Vec<PendingCall> = Vec::new();
    for (path, source) in files {
        let parsed = registry
            .parse_source(None, source, namespace, path)
            .expect("parser selected");
        assert!(parsed.errors.is_empty(), "fixture parses cleanly: {path}");
        pending.extend(loader.load_units(&parsed).await.expect("load units"));
    }
    loader
        .resolve_calls(namespace, &pending)
        .await
        .expect("resolve calls");
    loader
        .finish_namespace(namespace)
        .await
        .expect("entry points");
}

async fn id_of(store: &MemoryGraph, ns: &str, name: &str) -> String {
    let units = store.units_by_name(ns, name).await.expect("lookup");
    assert!(!units.is_empty(), "unit {name} exists in {ns}");
    units[0].id.clone()
}

#[tokio::test]
async fn payment_service_units_and_edges() {
    let ns = "sock_shop:payment";
    let (store, _) = ingest(PAYMENT_FILES, ns).await;

    for name in [
        "MakeHTTPHandler",
        "decodeAuthoriseRequest",
        "encodeAuthoriseResponse",
        "MakeAuthoriseEndpoint",
    ] {
        let units = store.units_by_name(ns, name).await.expect("lookup");
        assert_eq!(units.len(), 1, "{name} extracted once");
        assert_eq!(units[0].kind, UnitKind::Function);
    }
    let service = store.units_by_name(ns, "Service").await.expect("lookup");
    assert_eq!(service[0].kind, UnitKind::Interface);
    assert!(!store
        .units_by_name(ns, "Authorise")
        .await
        .expect("lookup")
        .is_empty());

    // MakeAuthoriseEndpoint → Authorise (cross-file, resolved by tail segment)
    let endpoint_id = id_of(&store, ns, "MakeAuthoriseEndpoint").await;
    let paths = store.outgoing(ns, &endpoint_id, 3).await.expect("outgoing");
    assert!(
        paths
            .iter()
            .any(|p| p.terminal().is_some_and(|t| t.name == "Authorise")),
        "endpoint calls Authorise"
    );

    // encodeAuthoriseResponse → encodeError (intra-file)
    let encode_id = id_of(&store, ns, "encodeAuthoriseResponse").await;
    let paths = store.outgoing(ns, &encode_id, 1).await.expect("outgoing");
    assert!(
        paths
            .iter()
            .any(|p| p.terminal().is_some_and(|t| t.name == "encodeError")),
        "encode response calls encodeError"
    );
}

#[tokio::test]
async fn unresolved_stdlib_calls_create_no_edges() {
    let ns = "sock_shop:payment";
    let (store, _) = ingest(PAYMENT_FILES, ns).await;

    // json.NewEncoder / json.NewDecoder have no ingested target.
    let decode_id = id_of(&store, ns, "decodeAuthoriseRequest").await;
    let paths = store.outgoing(ns, &decode_id, 3).await.expect("outgoing");
    assert!(paths.is_empty(), "stdlib-only callers have no CALLS edges");
}

#[tokio::test]
async fn reingest_is_idempotent() {
    let ns = "demo:svc";
    let (store, loader) = ingest(PAYMENT_FILES, ns).await;
    let first = store.counts(ns).await.expect("counts");
    assert!(first.units > 0 && first.calls > 0);

    ingest_into(&loader, PAYMENT_FILES, ns).await;
    let second = store.counts(ns).await.expect("counts");
    assert_eq!(first, second, "node and edge counts unchanged on re-run");
}

#[tokio::test]
async fn namespaces_are_isolated() {
    let store = Arc::new(MemoryGraph::new());
    let loader = GraphLoader::new(store.clone());
    loader.ensure_schema().await.expect("schema");
    ingest_into(&loader, PAYMENT_FILES, "ns_a:svc").await;
    ingest_into(&loader, PAYMENT_FILES, "ns_b:svc").await;

    let id_a = id_of(&store, "ns_a:svc", "MakeAuthoriseEndpoint").await;
    let paths = store.outgoing("ns_a:svc", &id_a, 3).await.expect("outgoing");
    for path in &paths {
        for node in &path.nodes {
            let in_a = store.unit("ns_a:svc", &node.id).await.expect("unit");
            assert!(in_a.is_some(), "traversal stays inside ns_a");
        }
    }

    // Same source, different namespace: ids differ (namespace is part of
    // the identity tuple).
    let id_b = id_of(&store, "ns_b:svc", "MakeAuthoriseEndpoint").await;
    assert_ne!(id_a, id_b);
}

#[tokio::test]
async fn purge_removes_only_the_target_namespace() {
    let store = Arc::new(MemoryGraph::new());
    let loader = GraphLoader::new(store.clone());
    loader.ensure_schema().await.expect("schema");
    ingest_into(&loader, PAYMENT_FILES, "ns_a:svc").await;
    ingest_into(&loader, PAYMENT_FILES, "ns_b:svc").await;

    let removed = store.purge("ns_a:svc").await.expect("purge");
    assert!(removed.units > 0);

    let a = store.counts("ns_a:svc").await.expect("counts");
    assert_eq!(a.units, 0);
    assert_eq!(a.edges(), 0);

    let b = store.counts("ns_b:svc").await.expect("counts");
    assert!(b.units > 0, "sibling namespace untouched");
}

#[tokio::test]
async fn entry_points_require_hint_and_no_callers() {
    let ns = "demo:web";
    let main_go = r#"package main

import "net/http"

func health(w http.ResponseWriter, r *http.Request) {
	respond(w)
}

func respond(w http.ResponseWriter) {
	w.WriteHeader(http.StatusOK)
}

func main() {
	http.HandleFunc("/health", health)
}
"#;
    let (store, _) = ingest(&[("main.go", main_go)], ns).await;

    let health = &store.units_by_name(ns, "health").await.expect("lookup")[0];
    assert!(health.is_entry_point, "registered handler with no callers");

    let main = &store.units_by_name(ns, "main").await.expect("lookup")[0];
    assert!(main.is_entry_point);

    // respond is called by health: hint or not, it cannot be an entry point.
    let respond = &store.units_by_name(ns, "respond").await.expect("lookup")[0];
    assert!(!respond.is_entry_point);
    let callers = store.incoming(ns, &respond.id).await.expect("incoming");
    assert_eq!(callers.len(), 1);
    assert_eq!(callers[0].name, "health");
}

#[tokio::test]
async fn every_unit_has_one_contains_parent() {
    let ns = "sock_shop:payment";
    let (store, _) = ingest(PAYMENT_FILES, ns).await;
    for (path, _) in PAYMENT_FILES {
        let units = store.units_in_file(ns, path).await.expect("units");
        for unit in units {
            match unit.kind {
                UnitKind::Module => assert!(unit.parent_id.is_none()),
                _ => {
                    let parent = unit.parent_id.expect("non-module unit has a parent");
                    let parent_unit = store
                        .unit(ns, &parent)
                        .await
                        .expect("lookup")
                        .expect("parent exists");
                    assert_eq!(parent_unit.file_path, unit.file_path);
                }
            }
        }
    }
}

#[tokio::test]
async fn snapshot_round_trip() {
    let ns = "demo:svc";
    let (store, _) = ingest(PAYMENT_FILES, ns).await;
    let before = store.counts(ns).await.expect("counts");

    let dir = tempfile::tempdir().expect("tempdir");
    save_snapshot(&store, dir.path()).await.expect("save");
    let restored = load_snapshot(dir.path()).await.expect("load");
    let after = restored.counts(ns).await.expect("counts");
    assert_eq!(before, after);

    let endpoint_id = id_of(&restored, ns, "MakeAuthoriseEndpoint").await;
    let paths = restored.outgoing(ns, &endpoint_id, 3).await.expect("outgoing");
    assert!(!paths.is_empty(), "edges survive the round trip");
}
