//! Prompt text sent to the analysis service.

use crate::chunk::Chunk;
use crate::error::CollaboratorError;

/// Label introducing the previous chunk's summary. Absent for the first chunk.
pub const PRIOR_CONTEXT_LABEL: &str = "Previous Analysis Context:";

/// How many counterparties to rank in each direction.
pub const TOP_COUNTERPARTIES: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct PromptBuilder {
    pub institution: String,
    pub statement_language: String,
    /// Upper bound on records embedded per chunk prompt.
    pub sample_limit: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self {
            institution: "the largest bank in Indonesia".to_string(),
            statement_language: "Indonesian".to_string(),
            sample_limit: crate::chunk::DEFAULT_WINDOW.get(),
        }
    }
}

impl PromptBuilder {
    /// Role instruction shared by every request.
    pub fn system_prompt(&self) -> String {
        format!(
            "You are a financial analyst assistant at {institution}. Provide concise insights.\n\
\n\
Rules:\n\
* Do not hallucinate.\n\
* Do not use the internet.\n\
* Use only the information provided.\n\
* Write only in English.\n\
* Accuracy is the top priority.\n\
* The bank statements are in the {language} language.\n\
* The type column contains CR or DB. CR means money in, DB means money out.",
            institution = self.institution,
            language = self.statement_language,
        )
    }

    pub fn chunk_prompt(
        &self,
        chunk: &Chunk,
        prior: Option<&str>,
    ) -> Result<String, CollaboratorError> {
        let sample: Vec<_> = chunk.records().iter().take(self.sample_limit).collect();
        let sample_json = serde_json::to_string(&sample).map_err(|e| CollaboratorError::Request {
            message: format!("encode records: {e}"),
        })?;

        let mut prompt = format!(
            "Analyze this bank statement chunk:\n\
Period: {start} to {end}\n\
Total Credits: {total_in:.2}\n\
Total Debits: {total_out:.2}\n",
            start = chunk.period_start(),
            end = chunk.period_end(),
            total_in = chunk.total_in(),
            total_out = chunk.total_out(),
        );
        if let Some(prior) = prior {
            prompt.push_str(PRIOR_CONTEXT_LABEL);
            prompt.push(' ');
            prompt.push_str(prior);
            prompt.push('\n');
        }
        prompt.push_str(&format!(
            "\nTransactions in JSON format:\n{sample_json}\n\n\
Provide insights about:\n\
1. spending patterns\n\
2. income sources\n\
3. identify the individual or company name in each description (ignore characters that are not letters), \
then list the top {n} by total money in and the top {n} by total money out, grouped by that name, \
including the totals you calculated\n\
4. financial behavior\n\
5. potential window dressing or financial engineering transactions",
            n = TOP_COUNTERPARTIES,
        ));
        Ok(prompt)
    }

    pub fn final_prompt(&self, summaries: &[String]) -> String {
        format!(
            "Based on all the following chunk analyses, provide a comprehensive financial analysis:\n\
{joined}\n\n\
Include:\n\
1. Overall financial health summary\n\
2. Key spending patterns and trends\n\
3. Income stability analysis\n\
4. Top {n} individual or company names for money in and money out\n\
5. Overall potential window dressing or financial engineering analysis\n\
6. Recommendations for the bank to make credit decisions",
            joined = summaries.join("\n"),
            n = TOP_COUNTERPARTIES,
        )
    }
}
