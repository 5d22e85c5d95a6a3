//! End-to-end run: normalize → chunk → summarize in order → aggregate.
//!
//! A run is all-or-nothing. Any stage failure ends in [`Stage::Failed`] with
//! no partial result; a retry starts over from the file. Dropping the future
//! abandons the run at its current await point.

use ledgerlens_ingest::{normalize_reader, NormalizeOptions, ParseError};
use std::num::NonZeroUsize;
use std::path::Path;
use tracing::{info, instrument, warn};

use crate::aggregator::{aggregate, AnalysisResult};
use crate::analyst::Analyst;
use crate::chunk::{build_chunks, DEFAULT_WINDOW};
use crate::error::{PipelineError, Result};
use crate::summarizer::summarize_chunks;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Normalizing,
    Chunking,
    /// 1-based chunk position.
    Summarizing { index: usize, total: usize },
    Aggregating,
    Done,
    Failed,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum records per chunk.
    pub window: NonZeroUsize,
    pub normalize: NormalizeOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            normalize: NormalizeOptions::default(),
        }
    }
}

pub struct Pipeline<A> {
    analyst: A,
    config: PipelineConfig,
}

impl<A: Analyst> Pipeline<A> {
    pub fn new(analyst: A) -> Self {
        Self::with_config(analyst, PipelineConfig::default())
    }

    pub fn with_config(analyst: A, config: PipelineConfig) -> Self {
        Self { analyst, config }
    }

    pub fn analyst(&self) -> &A {
        &self.analyst
    }

    /// Analyze a statement file.
    pub async fn analyze(&self, path: impl AsRef<Path>) -> Result<AnalysisResult> {
        self.analyze_with_progress(path, |_| {}).await
    }

    /// Analyze a statement file, reporting every stage transition.
    pub async fn analyze_with_progress(
        &self,
        path: impl AsRef<Path>,
        mut on_stage: impl FnMut(Stage) + Send,
    ) -> Result<AnalysisResult> {
        on_stage(Stage::Idle);
        on_stage(Stage::Normalizing);
        let bytes = match tokio::fs::read(path.as_ref()).await {
            Ok(b) => b,
            Err(e) => {
                on_stage(Stage::Failed);
                return Err(PipelineError::Parse(ParseError::Io(e)));
            }
        };
        self.drive(&bytes, &mut on_stage).await
    }

    /// Analyze statement text already in memory.
    pub async fn run(
        &self,
        input: &[u8],
        mut on_stage: impl FnMut(Stage) + Send,
    ) -> Result<AnalysisResult> {
        on_stage(Stage::Idle);
        on_stage(Stage::Normalizing);
        self.drive(input, &mut on_stage).await
    }

    async fn drive(
        &self,
        input: &[u8],
        on_stage: &mut (impl FnMut(Stage) + Send),
    ) -> Result<AnalysisResult> {
        let outcome = self.stages(input, on_stage).await;
        match &outcome {
            Ok(_) => on_stage(Stage::Done),
            Err(e) => {
                warn!(error = %e, transient = e.is_transient(), "analysis failed");
                on_stage(Stage::Failed);
            }
        }
        outcome
    }

    #[instrument(skip_all, fields(window = self.config.window.get(), bytes = input.len()))]
    async fn stages(
        &self,
        input: &[u8],
        on_stage: &mut (impl FnMut(Stage) + Send),
    ) -> Result<AnalysisResult> {
        let report = normalize_reader(input, &self.config.normalize)?;
        info!(
            records = report.records.len(),
            skipped = report.skipped_rows,
            "statement normalized"
        );

        on_stage(Stage::Chunking);
        let (skipped_rows, unparsed_dates) = (report.skipped_rows, report.unparsed_dates);
        let chunks = build_chunks(report.records, self.config.window);
        let mut result = if chunks.is_empty() {
            warn!(
                skipped_rows,
                unparsed_dates,
                "statement has no valid transactions; nothing to analyze"
            );
            AnalysisResult::empty()
        } else {
            info!(chunks = chunks.len(), "statement chunked");
            let summaries = summarize_chunks(&self.analyst, &chunks, |index, total| {
                on_stage(Stage::Summarizing { index, total })
            })
            .await?;
            drop(chunks);

            on_stage(Stage::Aggregating);
            aggregate(&self.analyst, summaries).await?
        };

        result.skipped_rows = skipped_rows;
        result.unparsed_dates = unparsed_dates;
        Ok(result)
    }
}
