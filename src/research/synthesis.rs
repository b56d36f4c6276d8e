use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::capability::GenerateTextRequest;
use crate::research::{constraints, formatter, prompts, ResearchOptions, ResearchState};
use crate::AppState;

/// Eval-mode synthesis: score constraint coverage over the findings, ask
/// the reasoning model for the three-line verdict, and force the format.
/// Always returns a well-formed answer.
pub async fn synthesize_answer(
    state: &Arc<AppState>,
    question: &str,
    research: &ResearchState,
    opts: &ResearchOptions,
) -> String {
    if research.findings.is_empty() {
        return formatter::format_final_answer("", question);
    }

    let key_constraints =
        constraints::extract_constraints(state, &opts.reasoning_model, question).await;
    let coverage: Vec<usize> = key_constraints
        .iter()
        .map(|constraint| {
            let needle = constraint.to_lowercase();
            research
                .findings
                .iter()
                .filter(|f| f.text.to_lowercase().contains(&needle))
                .count()
        })
        .collect();
    info!(
        "synthesis over {} findings, constraint coverage {:?}",
        research.findings.len(),
        coverage
    );

    let prompt = prompts::synthesis(question, &key_constraints, &coverage, &research.findings);
    let raw = match state
        .llm
        .generate_text(GenerateTextRequest {
            model: &opts.reasoning_model,
            prompt: &prompt,
            max_tokens: Some(opts.synthesis_max_tokens),
        })
        .await
    {
        Ok(raw) => raw,
        Err(e) => {
            warn!("synthesis call failed: {}", e);
            String::new()
        }
    };

    let formatted = formatter::format_final_answer(&raw, question);
    if !formatted.to_lowercase().contains("exact answer:") {
        return formatter::hard_fallback(question);
    }
    formatted
}

/// Interactive-mode closing call: a long-form report over everything the
/// run collected.
pub async fn compose_report(
    state: &Arc<AppState>,
    question: &str,
    research: &ResearchState,
    opts: &ResearchOptions,
) -> Result<String> {
    let prompt = prompts::final_report(question, &research.findings, &research.summaries);
    let report = state
        .llm
        .generate_text(GenerateTextRequest {
            model: &opts.model,
            prompt: &prompt,
            max_tokens: None,
        })
        .await
        .context("report generation failed")?;
    if report.trim().is_empty() {
        anyhow::bail!("report generation returned empty text");
    }
    Ok(report)
}
