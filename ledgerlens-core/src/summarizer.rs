//! Chunk-by-chunk summarization with the previous summary threaded forward.

use tracing::info;

use crate::analyst::Analyst;
use crate::chunk::Chunk;
use crate::error::{CollaboratorError, PipelineError, Result};

/// Summarize `chunks` strictly in order, one call at a time.
///
/// Call *i* receives the exact text returned by call *i-1*; the first call
/// gets no prior context. `on_chunk(index, total)` fires (1-based) before each
/// call. The first failure or blank reply aborts the run.
pub async fn summarize_chunks<A>(
    analyst: &A,
    chunks: &[Chunk],
    mut on_chunk: impl FnMut(usize, usize) + Send,
) -> Result<Vec<String>>
where
    A: Analyst + ?Sized,
{
    let total = chunks.len();
    let mut summaries = Vec::with_capacity(total);
    let mut prior: Option<String> = None;

    for (i, chunk) in chunks.iter().enumerate() {
        let index = i + 1;
        on_chunk(index, total);
        info!(
            index,
            total,
            period_start = %chunk.period_start(),
            period_end = %chunk.period_end(),
            "summarizing chunk"
        );

        let summary = analyst
            .summarize_chunk(chunk, prior.as_deref())
            .await
            .and_then(require_text)
            .map_err(|source| PipelineError::Summarize { index, total, source })?;

        summaries.push(summary.clone());
        prior = Some(summary);
    }

    Ok(summaries)
}

/// Reject replies with nothing but whitespace.
pub(crate) fn require_text(text: String) -> std::result::Result<String, CollaboratorError> {
    if text.trim().is_empty() {
        Err(CollaboratorError::EmptyResponse)
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::build_chunks;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use ledgerlens_ingest::{Direction, Record};
    use std::num::NonZeroUsize;
    use std::sync::Mutex;

    /// Replies "summary-<n>" and remembers the prior it was given.
    #[derive(Default)]
    struct Scripted {
        priors: Mutex<Vec<Option<String>>>,
        fail_at: Option<usize>,
        blank_at: Option<usize>,
    }

    #[async_trait]
    impl Analyst for Scripted {
        async fn summarize_chunk(
            &self,
            chunk: &Chunk,
            prior: Option<&str>,
        ) -> std::result::Result<String, CollaboratorError> {
            let mut priors = self.priors.lock().unwrap();
            priors.push(prior.map(str::to_string));
            let n = priors.len();
            if self.fail_at == Some(n) {
                return Err(CollaboratorError::Transport { message: "connection reset".into() });
            }
            if self.blank_at == Some(n) {
                return Ok("  \n".into());
            }
            Ok(format!("summary-{n} ({} records)", chunk.len()))
        }

        async fn aggregate(
            &self,
            _summaries: &[String],
        ) -> std::result::Result<String, CollaboratorError> {
            unreachable!("summarizer never aggregates")
        }
    }

    fn chunks(n_records: usize, window: usize) -> Vec<Chunk> {
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let records = (0..n_records)
            .map(|i| Record::new(day, format!("r{i}"), Direction::Out, 1.0))
            .collect();
        build_chunks(records, NonZeroUsize::new(window).unwrap())
    }

    #[tokio::test]
    async fn test_threads_previous_summary() {
        let analyst = Scripted::default();
        let mut seen = Vec::new();
        let out = summarize_chunks(&analyst, &chunks(7, 3), |i, n| seen.push((i, n)))
            .await
            .unwrap();

        assert_eq!(out, vec!["summary-1 (3 records)", "summary-2 (3 records)", "summary-3 (1 records)"]);
        assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);

        let priors = analyst.priors.lock().unwrap();
        assert_eq!(
            *priors,
            vec![
                None,
                Some("summary-1 (3 records)".to_string()),
                Some("summary-2 (3 records)".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_stops_at_first_failure() {
        let analyst = Scripted {
            fail_at: Some(2),
            ..Scripted::default()
        };
        let err = summarize_chunks(&analyst, &chunks(9, 3), |_, _| {}).await.unwrap_err();

        assert!(matches!(err, PipelineError::Summarize { index: 2, total: 3, .. }));
        assert!(err.is_transient());
        assert_eq!(analyst.priors.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_blank_reply_is_fatal() {
        let analyst = Scripted {
            blank_at: Some(1),
            ..Scripted::default()
        };
        let err = summarize_chunks(&analyst, &chunks(4, 2), |_, _| {}).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Summarize {
                index: 1,
                source: CollaboratorError::EmptyResponse,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_no_chunks_no_calls() {
        let analyst = Scripted::default();
        let out = summarize_chunks(&analyst, &[], |_, _| {}).await.unwrap();
        assert!(out.is_empty());
        assert!(analyst.priors.lock().unwrap().is_empty());
    }
}
