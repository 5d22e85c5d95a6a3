//! Final consolidation of chunk summaries into one result.

use serde::Serialize;
use tracing::info;

use crate::analyst::Analyst;
use crate::error::{PipelineError, Result};
use crate::extract::outline;
use crate::summarizer::require_text;

/// Outcome of one analysis run.
///
/// `final_narrative` is authoritative; `headline`, `bullet_insights` and
/// `numbered_recommendations` are read off it by convention and may be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub per_chunk_summaries: Vec<String>,
    pub final_narrative: String,
    pub headline: String,
    pub bullet_insights: Vec<String>,
    pub numbered_recommendations: Vec<String>,
    /// Statement rows dropped during normalization.
    pub skipped_rows: usize,
    /// Of those, rows whose date matched no known layout.
    pub unparsed_dates: usize,
}

impl AnalysisResult {
    /// Result for a statement with nothing to analyze.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_narrative(per_chunk_summaries: Vec<String>, final_narrative: String) -> Self {
        let o = outline(&final_narrative);
        Self {
            per_chunk_summaries,
            final_narrative,
            headline: o.headline,
            bullet_insights: o.bullets,
            numbered_recommendations: o.numbered,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.per_chunk_summaries.is_empty() && self.final_narrative.is_empty()
    }
}

/// Issue the single consolidation call and derive the structured fields.
pub async fn aggregate<A>(analyst: &A, summaries: Vec<String>) -> Result<AnalysisResult>
where
    A: Analyst + ?Sized,
{
    info!(summaries = summaries.len(), "aggregating chunk summaries");
    let narrative = analyst
        .aggregate(&summaries)
        .await
        .and_then(require_text)
        .map_err(PipelineError::Aggregate)?;
    Ok(AnalysisResult::from_narrative(summaries, narrative))
}
