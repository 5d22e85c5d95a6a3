use ledgerlens_core::{AnalysisResult, Chunk};
use std::fmt::Write;

pub fn render_chunk_plan(chunks: &[Chunk]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} chunk(s)\n", chunks.len());
    for (i, c) in chunks.iter().enumerate() {
        let _ = writeln!(
            out,
            "#{:<3} {} .. {} | records={:<3} | in={:.2} | out={:.2}",
            i + 1,
            c.period_start(),
            c.period_end(),
            c.len(),
            c.total_in(),
            c.total_out()
        );
    }
    out
}

/// Notice for a run that found nothing to analyze.
pub fn render_empty_notice(source: &str, result: &AnalysisResult) -> String {
    let mut out = format!("No valid transactions in {source}; nothing to analyze.");
    if result.skipped_rows > 0 {
        let _ = write!(out, " {} row(s) skipped", result.skipped_rows);
        if result.unparsed_dates > 0 {
            let _ = write!(
                out,
                ", {} with a date in an unrecognized layout (expected e.g. 2024-01-31 or 31/01/2024)",
                result.unparsed_dates
            );
        }
        out.push('.');
    }
    out
}

pub fn render_analysis(result: &AnalysisResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", result.headline);

    let _ = writeln!(out, "## Financial Analysis Summary\n");
    let _ = writeln!(out, "{}\n", result.final_narrative.trim());

    if !result.bullet_insights.is_empty() {
        let _ = writeln!(out, "## Insights\n");
        for b in &result.bullet_insights {
            let _ = writeln!(out, "- {b}");
        }
        out.push('\n');
    }

    if !result.numbered_recommendations.is_empty() {
        let _ = writeln!(out, "## Recommendations\n");
        for (i, r) in result.numbered_recommendations.iter().enumerate() {
            let _ = writeln!(out, "{}. {r}", i + 1);
        }
        out.push('\n');
    }

    let _ = writeln!(out, "## Chunk Analysis Summary\n");
    for (i, s) in result.per_chunk_summaries.iter().enumerate() {
        let _ = writeln!(out, "### Chunk {}\n\n{}\n", i + 1, s.trim());
    }
    out
}
