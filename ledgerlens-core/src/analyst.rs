//! Seams to the external text-analysis service.
//!
//! [`Analyst`] is what the pipeline drives: one call per chunk plus one final
//! call. [`PromptedAnalyst`] implements it on top of any [`ChatCompletion`]
//! backend by rendering the prompts in [`crate::prompt`].

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::chunk::Chunk;
use crate::error::CollaboratorError;
use crate::prompt::PromptBuilder;

#[async_trait]
pub trait Analyst: Send + Sync {
    /// Summarize one chunk. `prior` is the previous chunk's summary, `None`
    /// for the first chunk.
    async fn summarize_chunk(
        &self,
        chunk: &Chunk,
        prior: Option<&str>,
    ) -> Result<String, CollaboratorError>;

    /// Produce the consolidated narrative from every chunk summary, in order.
    async fn aggregate(&self, summaries: &[String]) -> Result<String, CollaboratorError>;
}

#[async_trait]
impl<T: Analyst + ?Sized> Analyst for std::sync::Arc<T> {
    async fn summarize_chunk(
        &self,
        chunk: &Chunk,
        prior: Option<&str>,
    ) -> Result<String, CollaboratorError> {
        (**self).summarize_chunk(chunk, prior).await
    }

    async fn aggregate(&self, summaries: &[String]) -> Result<String, CollaboratorError> {
        (**self).aggregate(summaries).await
    }
}

/// One request to a chat-style completion endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Return the response text as a single blob.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CollaboratorError>;
}

/// Sampling settings applied to every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: 2000,
        }
    }
}

pub struct PromptedAnalyst<C> {
    backend: C,
    prompts: PromptBuilder,
    params: GenerationParams,
}

impl<C: ChatCompletion> PromptedAnalyst<C> {
    pub fn new(backend: C) -> Self {
        Self {
            backend,
            prompts: PromptBuilder::default(),
            params: GenerationParams::default(),
        }
    }

    pub fn with_prompts(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn backend(&self) -> &C {
        &self.backend
    }

    fn request(&self, user: String) -> CompletionRequest {
        CompletionRequest {
            system: self.prompts.system_prompt(),
            user,
            temperature: self.params.temperature,
            max_tokens: self.params.max_tokens,
        }
    }
}

#[async_trait]
impl<C: ChatCompletion> Analyst for PromptedAnalyst<C> {
    #[instrument(skip_all, fields(records = chunk.len(), has_prior = prior.is_some()))]
    async fn summarize_chunk(
        &self,
        chunk: &Chunk,
        prior: Option<&str>,
    ) -> Result<String, CollaboratorError> {
        let user = self.prompts.chunk_prompt(chunk, prior)?;
        debug!(prompt_chars = user.len(), "requesting chunk summary");
        self.backend.complete(&self.request(user)).await
    }

    #[instrument(skip_all, fields(summaries = summaries.len()))]
    async fn aggregate(&self, summaries: &[String]) -> Result<String, CollaboratorError> {
        let user = self.prompts.final_prompt(summaries);
        debug!(prompt_chars = user.len(), "requesting final analysis");
        self.backend.complete(&self.request(user)).await
    }
}
