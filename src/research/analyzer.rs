use std::sync::Arc;
use std::time::Duration;

use crate::capability::GenerateTextRequest;
use crate::core::types::{AnalysisRecord, Confidence};
use crate::nlp::key_terms::generate_fallback_query;
use crate::nlp::salvage::{parse_analysis, SalvageContext};
use crate::research::{prompts, ResearchError, ResearchState};
use crate::AppState;

const ANALYSIS_MAX_TOKENS: u32 = 1000;

/// Run the reasoning model over the current evidence. The reply is pushed
/// through the tiered salvage, so a malformed reply still yields a record;
/// only the LLM call itself can fail.
pub async fn analyze(
    state: &Arc<AppState>,
    model: &str,
    question: &str,
    research: &ResearchState,
    time_remaining: Duration,
) -> Result<AnalysisRecord, ResearchError> {
    let prompt = prompts::analysis(question, &research.findings, &research.sub_answers);
    let raw = state
        .llm
        .generate_text(GenerateTextRequest {
            model,
            prompt: &prompt,
            max_tokens: Some(ANALYSIS_MAX_TOKENS),
        })
        .await
        .map_err(|e| ResearchError::LlmCall(e.to_string()))?;

    Ok(parse_analysis(
        &raw,
        &SalvageContext {
            question,
            findings_len: research.findings.len(),
            time_remaining_min: time_remaining.as_secs_f64() / 60.0,
        },
    ))
}

/// Static record used when the analysis call itself errored.
pub fn error_fallback(
    question: &str,
    findings_len: usize,
    time_remaining: Duration,
) -> AnalysisRecord {
    AnalysisRecord {
        summary: "Analysis function encountered an error".to_string(),
        has_answer: false,
        confidence: Confidence::Low,
        gaps: vec!["Analysis system error".to_string()],
        should_continue: findings_len < 5 && time_remaining.as_secs_f64() / 60.0 > 1.0,
        next_search_topic: Some(generate_fallback_query(question)),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_fallback_continues_only_with_time_and_few_findings() {
        let record = error_fallback("q one two", 2, Duration::from_secs(120));
        assert!(record.should_continue);
        assert_eq!(record.gaps, vec!["Analysis system error"]);

        let out_of_time = error_fallback("q one two", 2, Duration::from_secs(30));
        assert!(!out_of_time.should_continue);

        let enough_findings = error_fallback("q one two", 6, Duration::from_secs(120));
        assert!(!enough_findings.should_continue);
    }
}
