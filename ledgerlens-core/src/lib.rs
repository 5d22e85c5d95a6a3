//! ledgerlens-core: chunked, context-carrying statement analysis.
//!
//! Records from `ledgerlens-ingest` are sorted and cut into bounded windows,
//! each window is summarized in order with the previous summary as context,
//! and the summaries are consolidated into one narrative.

pub mod aggregator;
pub mod analyst;
pub mod chunk;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod prompt;
pub mod summarizer;

pub use aggregator::{aggregate, AnalysisResult};
pub use analyst::{Analyst, ChatCompletion, CompletionRequest, GenerationParams, PromptedAnalyst};
pub use chunk::{build_chunks, Chunk, DEFAULT_WINDOW};
pub use error::{CollaboratorError, PipelineError, Result};
pub use extract::{outline, NarrativeOutline};
pub use pipeline::{Pipeline, PipelineConfig, Stage};
pub use prompt::PromptBuilder;
pub use summarizer::summarize_chunks;

pub use ledgerlens_ingest::{Direction, NormalizeOptions, Record};
