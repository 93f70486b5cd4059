//! The query orchestrator: embed → retrieve (vectors + graph) → assemble →
//! LLM.

use crate::context::assemble_context;
use crate::cross::{CrossServiceResolver, NoCrossService};
use crate::errors::QueryError;
use crate::prompt::{SYSTEM_PROMPT, build_prompt};
use crate::retrieve::RetrievalEngine;
use crate::types::{CodeSnippet, DocSnippet, EdgeLine, QueryOptions, QueryOutcome};
use futures::future::join_all;
use llm_service::TextGenerator;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct QueryOrchestrator {
    retrieval: RetrievalEngine,
    llm: Arc<dyn TextGenerator>,
    cross: Arc<dyn CrossServiceResolver>,
}

impl QueryOrchestrator {
    pub fn new(retrieval: RetrievalEngine, llm: Arc<dyn TextGenerator>) -> Self {
        Self {
            retrieval,
            llm,
            cross: Arc::new(NoCrossService),
        }
    }

    /// Install an application-layer cross-service resolver.
    pub fn with_cross_service(mut self, cross: Arc<dyn CrossServiceResolver>) -> Self {
        self.cross = cross;
        self
    }

    /// Answer a natural-language question over the ingested corpus.
    ///
    /// Cancellation short-circuits the remaining steps and returns whatever
    /// context was gathered so far; it is never an error.
    pub async fn ask(
        &self,
        question: &str,
        opts: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<QueryOutcome, QueryError> {
        let mut docs: Vec<DocSnippet> = Vec::new();
        let mut code: Vec<CodeSnippet> = Vec::new();
        let mut call_edges: Vec<EdgeLine> = Vec::new();

        macro_rules! partial {
            () => {
                Ok(QueryOutcome {
                    answer: None,
                    llm_ran: false,
                    context: assemble_context(
                        question,
                        docs,
                        code,
                        call_edges,
                        Vec::new(),
                        opts.budget_chars,
                    ),
                })
            };
        }

        if cancel.is_cancelled() {
            return partial!();
        }

        // 1. Embed the question once; doc and code searches share the vector.
        let query_vector = tokio::select! {
            _ = cancel.cancelled() => return partial!(),
            v = self.retrieval.embed(question) => v?,
        };

        // 2. Both searches are independent; fan out and join.
        let namespace = opts.namespace.as_deref();
        let (doc_res, code_res) = tokio::select! {
            _ = cancel.cancelled() => return partial!(),
            pair = async {
                tokio::join!(
                    self.retrieval.doc_search(query_vector.clone(), opts.k_doc),
                    self.retrieval
                        .vector_search(query_vector.clone(), namespace, opts.k_code),
                )
            } => pair,
        };
        docs = doc_res?;
        code = code_res?;
        debug!(docs = docs.len(), code = code.len(), "retrieval done");

        // 3. Graph traversal for the strongest code hits.
        let targets: Vec<(String, String, String)> = code
            .iter()
            .take(opts.m_graph)
            .map(|h| (h.namespace.clone(), h.original_id.clone(), h.name.clone()))
            .collect();
        let depth = opts.depth;
        let traversals = join_all(targets.into_iter().map(|(ns, id, name)| async move {
            let outgoing = self.retrieval.graph_outgoing(&ns, &id, depth).await;
            let incoming = self.retrieval.graph_incoming(&ns, &id).await;
            (name, outgoing, incoming)
        }));
        let traversals = tokio::select! {
            _ = cancel.cancelled() => return partial!(),
            t = traversals => t,
        };

        let mut seen: HashSet<(String, String)> = HashSet::new();
        for (hit_name, outgoing, incoming) in traversals {
            for path in outgoing? {
                for pair in path.nodes.windows(2) {
                    let edge = (pair[0].name.clone(), pair[1].name.clone());
                    if seen.insert(edge.clone()) {
                        call_edges.push(EdgeLine {
                            caller: edge.0,
                            callee: edge.1,
                        });
                    }
                }
            }
            for caller in incoming? {
                let edge = (caller.name.clone(), hit_name.clone());
                if seen.insert(edge.clone()) {
                    call_edges.push(EdgeLine {
                        caller: edge.0,
                        callee: edge.1,
                    });
                }
            }
        }

        // 4. Application-layer cross-service links (empty by default).
        let ids: Vec<String> = code.iter().map(|c| c.original_id.clone()).collect();
        let cross_edges = self.cross.cross_namespace_edges(&ids).await;

        // 5. Budget-bound assembly.
        let context = assemble_context(
            question,
            docs,
            code,
            call_edges,
            cross_edges,
            opts.budget_chars,
        );

        // 6. LLM synthesis, still cancellable. A failed call is not fatal:
        //    the caller gets the context either way.
        if !opts.use_llm {
            return Ok(QueryOutcome {
                answer: None,
                llm_ran: false,
                context,
            });
        }
        let prompt = build_prompt(&context);
        let answer = tokio::select! {
            _ = cancel.cancelled() => {
                return Ok(QueryOutcome { answer: None, llm_ran: false, context });
            }
            res = self.llm.generate(&prompt, Some(SYSTEM_PROMPT)) => res,
        };
        let answer = match answer {
            Ok(text) => Some(text),
            Err(err) => {
                warn!(error = %err, "LLM call failed, returning context only");
                None
            }
        };

        info!(
            answered = answer.is_some(),
            context_chars = context.total_chars,
            "query finished"
        );
        Ok(QueryOutcome {
            answer,
            llm_ran: true,
            context,
        })
    }
}
