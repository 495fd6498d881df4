// End-to-end grounded answering: retrieve -> compose -> generate -> cite/recommend -> evaluate
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::errors::{RagError, Result};
use crate::rag::citations::{cited_sources, has_citations};
use crate::rag::context::{ContextComposer, ContextConfig};
use crate::rag::embedding::EmbeddingClient;
use crate::rag::evaluator::{EvaluationConfig, Evaluator};
use crate::rag::generator::{AnswerGenerator, GenerationConfig};
use crate::rag::recommend::{RecommendConfig, Recommender};
use crate::rag::retrieval::{KnowledgeRetriever, SearchParams};
use crate::services::{ChatService, EmbeddingService, SearchService};
use crate::telemetry::{Stage, StageTimings};
use crate::types::response::NO_ANSWER;
use crate::types::{ChatOutcome, CitedSource, Evaluation, RagResponse, Recommendation};

/// RAG pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RAGConfig {
    pub retrieval: SearchParams,
    pub context: ContextConfig,
    pub generation: GenerationConfig,
    pub evaluation: EvaluationConfig,
    pub recommendations: RecommendConfig,
}

/// Long-lived client handles shared by every request.
///
/// Built once per process (see `bootstrap`) and reused; nothing in here is
/// mutated by a request.
#[derive(Clone)]
pub struct ServiceHandles {
    pub chat: Arc<dyn ChatService>,
    pub embeddings: Arc<dyn EmbeddingService>,
    pub search: Arc<dyn SearchService>,
    /// Chat model or deployment used for both answering and grading
    pub chat_model: String,
    /// Embedding model or deployment
    pub embedding_model: String,
}

/// End-to-end RAG pipeline
pub struct RAGPipeline {
    retriever: KnowledgeRetriever,
    composer: ContextComposer,
    generator: AnswerGenerator,
    recommender: Recommender,
    evaluator: Evaluator,
    config: RAGConfig,
}

impl RAGPipeline {
    /// Create new RAG pipeline with default configuration
    pub fn new(services: ServiceHandles) -> Self {
        Self::with_config(services, RAGConfig::default())
    }

    /// Create with custom configuration
    pub fn with_config(services: ServiceHandles, config: RAGConfig) -> Self {
        let embedder = EmbeddingClient::new(services.embeddings, services.embedding_model);

        Self {
            retriever: KnowledgeRetriever::with_params(
                services.search,
                embedder,
                config.retrieval.clone(),
            ),
            composer: ContextComposer::with_config(config.context.clone()),
            generator: AnswerGenerator::with_config(
                services.chat.clone(),
                services.chat_model.clone(),
                config.generation.clone(),
            ),
            recommender: Recommender::with_config(config.recommendations.clone()),
            evaluator: Evaluator::with_config(
                services.chat,
                services.chat_model,
                config.evaluation.clone(),
            ),
            config,
        }
    }

    /// Boundary entry point: validates the query and never fails.
    ///
    /// An empty query, or a stage that cannot run to completion, yields a
    /// single `{error}` object instead of a response.
    pub async fn handle(&self, query: &str) -> ChatOutcome {
        self.handle_timed(query).await.0
    }

    /// Like [`handle`](Self::handle), also returning stage timings when the
    /// pipeline ran to completion
    pub async fn handle_timed(&self, query: &str) -> (ChatOutcome, Option<StageTimings>) {
        let query = query.trim();
        if query.is_empty() {
            warn!("No query provided");
            return (ChatOutcome::failure(RagError::EmptyQuery.to_string()), None);
        }

        match AssertUnwindSafe(self.run_timed(query)).catch_unwind().await {
            Ok((response, timings)) => (ChatOutcome::Response(response), Some(timings)),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(error = %message, "RAG request did not complete");
                (ChatOutcome::failure(message), None)
            }
        }
    }

    /// Validate the query, then run the pipeline
    pub async fn answer(&self, query: &str) -> Result<RagResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RagError::EmptyQuery);
        }
        Ok(self.run(query).await)
    }

    /// Run the pipeline for an already validated query.
    ///
    /// `query` must be non-empty after trimming; callers holding raw input
    /// use [`handle`](Self::handle) or [`answer`](Self::answer) instead.
    pub async fn run(&self, query: &str) -> RagResponse {
        self.run_timed(query).await.0
    }

    /// Run the pipeline and return per-stage timings alongside the response.
    /// Same precondition as [`run`](Self::run).
    pub async fn run_timed(&self, query: &str) -> (RagResponse, StageTimings) {
        debug_assert!(
            !query.trim().is_empty(),
            "run requires a non-empty query, use handle for raw input"
        );
        let request_id = Uuid::new_v4();
        self.execute(query)
            .instrument(info_span!("rag_request", %request_id))
            .await
    }

    async fn execute(&self, query: &str) -> (RagResponse, StageTimings) {
        let mut timings = StageTimings::start();
        info!(query_len = query.len(), "starting RAG request");

        // Step 1: Retrieve
        let results = self.retriever.search(query).await;
        timings.mark(Stage::Retrieval);

        // Step 2: Compose context and source map
        let prepared = self.composer.prepare(&results);
        timings.mark(Stage::Composition);
        info!(sources = prepared.source_map.len(), "context prepared");

        // Step 3: Generate the grounded answer
        let answer = self
            .generator
            .generate(query, &prepared.text, &prepared.source_map)
            .await;
        timings.mark(Stage::Generation);

        // Step 4: Cited sources and recommendations
        let sources = cited_sources(&answer, &prepared.source_map);
        if !prepared.source_map.is_empty() && !has_citations(&answer, &prepared.source_map) {
            warn!("answer does not cite any retrieved source");
        }
        let recommendations = self.recommender.recommend(&results);
        timings.mark(Stage::Citation);
        info!(
            cited = sources.len(),
            recommendations = recommendations.len(),
            "sources filtered"
        );

        // Step 5: Forensic evaluation
        let evaluation = self
            .evaluator
            .evaluate(query, &prepared.text, &answer)
            .await;
        timings.mark(Stage::Evaluation);
        info!(evaluation = evaluation.kind(), "evaluation finished");

        timings.log_summary();
        (
            assemble(answer, sources, recommendations, evaluation, prepared.text),
            timings,
        )
    }

    /// Get current configuration
    pub fn config(&self) -> &RAGConfig {
        &self.config
    }
}

/// Build the response, backfilling anything missing with its documented default
fn assemble(
    answer: String,
    sources: Vec<CitedSource>,
    recommendations: Vec<Recommendation>,
    evaluation: Evaluation,
    context: String,
) -> RagResponse {
    let answer = if answer.trim().is_empty() {
        warn!("empty answer, using placeholder");
        NO_ANSWER.to_string()
    } else {
        answer
    };

    RagResponse {
        answer,
        sources,
        recommendations,
        evaluation,
        context,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "RAG request failed".to_string()
    }
}
