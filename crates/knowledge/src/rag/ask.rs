//! RAG answering orchestration.
//!
//! Embeds the question, retrieves the closest contexts and asks the
//! language model to answer from them alone.

use std::sync::Arc;

use ragline_core::{AppError, AppResult};
use ragline_llm::{LlmClient, LlmRequest};

use crate::embeddings::EmbeddingClient;
use crate::rag::types::{AnswerOptions, RetrievedContexts};
use crate::types::{CollectionTarget, QueryOutcome};
use crate::vector_index::VectorIndex;

/// Orchestrates embedding client, vector index and language model for one question.
#[derive(Clone)]
pub struct QueryPipeline {
    embedder: EmbeddingClient,
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn LlmClient>,
    target: CollectionTarget,
    options: AnswerOptions,
    default_top_k: usize,
}

impl QueryPipeline {
    pub fn new(
        embedder: EmbeddingClient,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LlmClient>,
        target: CollectionTarget,
        options: AnswerOptions,
        default_top_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            llm,
            target,
            options,
            default_top_k,
        }
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    /// Answer `question` from the `top_k` closest contexts.
    ///
    /// `top_k` defaults to the configured value. Invalid input fails before
    /// any external call. An empty collection still reaches the model, with
    /// an empty context block.
    pub async fn ask(&self, question: &str, top_k: Option<i64>) -> AppResult<QueryOutcome> {
        let top_k = self.validate(question, top_k)?;

        tracing::info!(top_k, "Answering question");

        let retrieved = self.retrieve(question, top_k).await?;
        if retrieved.is_empty() {
            tracing::warn!("No contexts retrieved; answering from an empty context block");
        }
        let context = build_context(&retrieved.contexts);
        let answer = self.generate_answer(question, &context).await?;

        Ok(QueryOutcome {
            answer,
            sources: retrieved.unique_sources(),
            num_contexts: retrieved.len(),
        })
    }

    /// Embed `question` and search the collection.
    pub async fn retrieve(&self, question: &str, top_k: usize) -> AppResult<RetrievedContexts> {
        let query = self.embedder.embed_one(question).await?;

        self.index
            .ensure_collection(
                &self.target.name,
                self.embedder.dimensions(),
                self.target.distance,
            )
            .await?;
        let results = self.index.search(&self.target.name, &query, top_k).await?;

        tracing::info!(
            contexts = results.len(),
            top_score = results.first().map(|r| r.score).unwrap_or(0.0),
            "Retrieved contexts"
        );

        let mut retrieved = RetrievedContexts::default();
        for result in results {
            retrieved.contexts.push(result.text);
            retrieved.sources.push(result.source);
        }
        Ok(retrieved)
    }

    fn validate(&self, question: &str, top_k: Option<i64>) -> AppResult<usize> {
        if question.trim().is_empty() {
            return Err(AppError::InvalidArgument(
                "question must not be empty".to_string(),
            ));
        }

        match top_k {
            None => Ok(self.default_top_k),
            Some(k) if k > 0 => Ok(k as usize),
            Some(k) => Err(AppError::InvalidArgument(format!(
                "top_k must be greater than zero, got {}",
                k
            ))),
        }
    }

    async fn generate_answer(&self, question: &str, context: &str) -> AppResult<String> {
        tracing::debug!(
            provider = self.llm.provider_name(),
            model = %self.options.model,
            context_bytes = context.len(),
            "Generating answer"
        );

        let request = LlmRequest::new(&self.options.model)
            .with_system(build_system_prompt())
            .with_user(build_user_prompt(question, context))
            .with_temperature(self.options.temperature)
            .with_max_tokens(self.options.max_tokens);

        let response = self.llm.complete(&request).await.map_err(|e| {
            tracing::error!(error = %e, "Answer generation failed");
            e
        })?;

        Ok(response.content.trim().to_string())
    }
}

/// Build the context block, best match first.
pub fn build_context(contexts: &[String]) -> String {
    contexts
        .iter()
        .enumerate()
        .map(|(i, text)| format!("[Document {}]\n{}", i + 1, text))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

fn build_system_prompt() -> String {
    String::from(
        "You answer questions using only the context provided by the user.\n\n\
         Instructions:\n\
         - Base your answer only on the supplied context; do not use outside knowledge\n\
         - If the context is empty or does not contain the answer, say that the \
         information is not available in the documents\n\
         - Keep your response concise and factual\n",
    )
}

fn build_user_prompt(question: &str, context: &str) -> String {
    format!(
        "Use the following context to answer the question.\n\n\
         Context:\n{}\n\n\
         Question: {}\n\
         Answer concisely using the context above.",
        context, question
    )
}
