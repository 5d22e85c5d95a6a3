use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use ledgerlens_core::prompt::PRIOR_CONTEXT_LABEL;
use ledgerlens_core::{
    build_chunks, ChatCompletion, CollaboratorError, CompletionRequest, Pipeline, PipelineError,
    PromptedAnalyst, Stage, DEFAULT_WINDOW,
};
use ledgerlens_ingest::{normalize_str, NormalizeOptions};
use std::sync::{Arc, Mutex};

/// 150 rows over January-February 2024, written newest first like most bank exports.
fn two_month_csv() -> String {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut rows: Vec<String> = (0..150)
        .map(|i| {
            let date = start + Duration::days(i * 59 / 150);
            let (kind, desc) = if i % 10 == 0 {
                ("CR", format!("TRSF E-BANKING CR PT MAJU JAYA {i}"))
            } else {
                ("DB", format!("KARTU DEBIT INDOMARET {i}"))
            };
            format!("{};{};{};{}.00", date.format("%d/%m/%Y"), desc, kind, 1000 + i)
        })
        .collect();
    rows.reverse();
    // trailing blank rows are normal in exports
    format!("date;description;type;amount\n{}\n;;;\n", rows.join("\n"))
}

/// Chat backend that records every request and replies from a script.
#[derive(Clone, Default)]
struct ScriptedBackend {
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    fail_on_call: Option<usize>,
}

impl ScriptedBackend {
    fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatCompletion for ScriptedBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CollaboratorError> {
        let n = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };
        if self.fail_on_call == Some(n) {
            return Err(CollaboratorError::RateLimited {
                retry_after_secs: Some(20),
                message: "quota exceeded".into(),
            });
        }
        if request.user.starts_with("Based on all the following chunk analyses") {
            return Ok("Stable income, controlled spending.\n\
- Salary inflow from PT MAJU JAYA every ten transactions\n\
- Frequent small debit purchases at INDOMARET\n\
1. Approve a modest credit line\n\
2. Review again after three months"
                .to_string());
        }
        Ok(format!("Chunk note #{n}: mostly retail spending."))
    }
}

#[test]
fn test_two_month_statement_chunks_by_date() {
    let report = normalize_str(&two_month_csv(), &NormalizeOptions::default()).unwrap();
    assert_eq!(report.records.len(), 150);
    assert_eq!(report.skipped_rows, 1);

    let chunks = build_chunks(report.records, DEFAULT_WINDOW);
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].len(), 75);
    assert_eq!(chunks[1].len(), 75);
    assert_eq!(chunks[0].period_start(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    assert_eq!(chunks[1].period_end(), NaiveDate::from_ymd_opt(2024, 2, 28).unwrap());
    assert!(chunks[0].period_end() <= chunks[1].period_start());
    assert!(chunks[0].records().windows(2).all(|w| w[0].date <= w[1].date));
}

#[tokio::test]
async fn test_full_run_threads_context_in_order() {
    let backend = ScriptedBackend::default();
    let pipeline = Pipeline::new(PromptedAnalyst::new(backend.clone()));

    let mut stages = Vec::new();
    let result = pipeline
        .run(two_month_csv().as_bytes(), |s| stages.push(s))
        .await
        .unwrap();

    let requests = backend.requests();
    assert_eq!(requests.len(), 3, "two chunk calls plus one final call");

    assert!(!requests[0].user.contains(PRIOR_CONTEXT_LABEL));
    assert!(requests[0].user.contains("Period: 2024-01-01 to"));
    assert!(requests[1]
        .user
        .contains(&format!("{PRIOR_CONTEXT_LABEL} Chunk note #1: mostly retail spending.")));
    assert!(requests[1].user.contains("to 2024-02-28"));
    assert!(requests[2].user.contains("Chunk note #1: mostly retail spending.\nChunk note #2: mostly retail spending."));

    assert!(requests.iter().all(|r| r.temperature == 0.0 && r.max_tokens == 2000));

    assert_eq!(
        result.per_chunk_summaries,
        vec![
            "Chunk note #1: mostly retail spending.",
            "Chunk note #2: mostly retail spending."
        ]
    );
    assert_eq!(result.headline, "Stable income, controlled spending.");
    assert_eq!(result.bullet_insights.len(), 2);
    assert_eq!(
        result.numbered_recommendations,
        vec!["Approve a modest credit line", "Review again after three months"]
    );
    assert_eq!(stages.last(), Some(&Stage::Done));
}

#[tokio::test]
async fn test_failed_chunk_skips_aggregation() {
    let backend = ScriptedBackend {
        fail_on_call: Some(2),
        ..ScriptedBackend::default()
    };
    let pipeline = Pipeline::new(PromptedAnalyst::new(backend.clone()));

    let mut stages = Vec::new();
    let err = pipeline
        .run(two_month_csv().as_bytes(), |s| stages.push(s))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Summarize { index: 2, total: 2, .. }));
    assert!(err.is_transient());
    assert_eq!(backend.requests().len(), 2);
    assert!(!stages.contains(&Stage::Aggregating));
    assert_eq!(stages.last(), Some(&Stage::Failed));
}

#[tokio::test]
async fn test_failed_aggregation_returns_no_partial_result() {
    let backend = ScriptedBackend {
        fail_on_call: Some(3),
        ..ScriptedBackend::default()
    };
    let pipeline = Pipeline::new(PromptedAnalyst::new(backend.clone()));

    let err = pipeline.run(two_month_csv().as_bytes(), |_| {}).await.unwrap_err();
    assert!(matches!(err, PipelineError::Aggregate(CollaboratorError::RateLimited { .. })));
    assert_eq!(backend.requests().len(), 3);
}

#[tokio::test]
async fn test_header_only_statement_never_contacts_service() {
    let backend = ScriptedBackend::default();
    let pipeline = Pipeline::new(PromptedAnalyst::new(backend.clone()));

    let result = pipeline
        .run(b"date;description;type;amount\n", |_| {})
        .await
        .unwrap();

    assert!(result.per_chunk_summaries.is_empty());
    assert!(result.final_narrative.is_empty());
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_empty_file_never_contacts_service() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let backend = ScriptedBackend::default();
    let pipeline = Pipeline::new(PromptedAnalyst::new(backend.clone()));

    let mut stages = Vec::new();
    let result = pipeline
        .analyze_with_progress(file.path(), |s| stages.push(s))
        .await
        .unwrap();

    assert!(result.is_empty());
    assert!(backend.requests().is_empty());
    assert_eq!(stages.last(), Some(&Stage::Done));
}

#[tokio::test]
async fn test_unrecognized_dates_are_reported_on_empty_result() {
    let backend = ScriptedBackend::default();
    let pipeline = Pipeline::new(PromptedAnalyst::new(backend.clone()));

    let result = pipeline
        .run(b"date;description;type;amount\nJan 3rd;GAJI;CR;100\nJan 4th;SEWA;DB;20\n", |_| {})
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(result.skipped_rows, 2);
    assert_eq!(result.unparsed_dates, 2);
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_latin1_row_reaches_service() {
    let backend = ScriptedBackend::default();
    let pipeline = Pipeline::new(PromptedAnalyst::new(backend.clone()));

    let input: &[u8] = b"date;description;type;amount\n\
2024-01-01;GAJI;CR;100\n\
2024-01-02;CAF\xe9 JAKARTA;DB;20\n\
2024-01-03;LISTRIK;DB;50\n";
    let result = pipeline.run(input, |_| {}).await.unwrap();

    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].user.contains("CAF\u{fffd} JAKARTA"));
    assert!(requests[0].user.contains("LISTRIK"));
    assert_eq!(result.skipped_rows, 0);
}
