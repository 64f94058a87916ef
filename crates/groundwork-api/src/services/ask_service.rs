//! Answers one question about one project.
//!
//! The flow is strictly sequential within the calling task:
//! validate, resolve the project, retrieve, build the prompt, generate.
//! Everything before generation fails the request; generation itself
//! degrades to a templated answer instead of failing.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument};

use groundwork_core::{
    AnswerMetadata, ChatRequest, ChatResponse, Error, ProjectDirectory, Result,
};
use groundwork_inference::{AnswerGenerator, PromptBuilder};
use groundwork_search::{source_type_distribution, source_types_found, RetrievalPipeline};

/// Service for the chat endpoint.
pub struct AskService {
    projects: Arc<dyn ProjectDirectory>,
    pipeline: RetrievalPipeline,
    prompts: PromptBuilder,
    answers: AnswerGenerator,
}

impl AskService {
    pub fn new(
        projects: Arc<dyn ProjectDirectory>,
        pipeline: RetrievalPipeline,
        prompts: PromptBuilder,
        answers: AnswerGenerator,
    ) -> Self {
        Self {
            projects,
            pipeline,
            prompts,
            answers,
        }
    }

    #[instrument(skip(self, request), fields(subsystem = "api", component = "ask", op = "ask"))]
    pub async fn ask(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let (project_id, message) = request.validate()?;
        let start = Instant::now();

        let project_name = self
            .projects
            .project_name(project_id)
            .await?
            .ok_or(Error::ProjectNotFound(project_id))?;

        let retrieval = self.pipeline.retrieve(project_id, message).await?;
        let working_set = retrieval.working_set;

        let prompt = self.prompts.build(message, &working_set, &request.history);
        let answer = self.answers.generate(&prompt, &working_set).await;

        info!(
            project_id,
            retrieved = retrieval.retrieved,
            filtered = retrieval.filtered,
            chunk_count = working_set.len(),
            fallback = answer.fallback,
            duration_ms = start.elapsed().as_millis() as u64,
            "Question answered"
        );

        Ok(ChatResponse {
            message: answer.answer,
            sources: answer.sources,
            metadata: AnswerMetadata {
                project_name,
                chunks_found: working_set.len(),
                source_types_found: source_types_found(&working_set),
                source_type_distribution: source_type_distribution(&working_set),
                timestamp: Utc::now(),
                fallback: answer.fallback,
            },
        })
    }
}
