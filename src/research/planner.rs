use std::sync::Arc;

use tracing::{debug, warn};

use crate::capability::GenerateTextRequest;
use crate::nlp::key_terms::{extract_key_terms, generate_fallback_query, is_generic_query};
use crate::nlp::salvage::salvage_string_array;
use crate::research::{prompts, ResearchState};
use crate::AppState;

const MAX_SUBQUESTIONS: usize = 8;
const SUBQUESTION_MAX_TOKENS: u32 = 400;

/// Pick the search topic for the next hop.
///
/// Order: original question on hop 1; a pending subquestion; a freshly
/// generated subquestion when the analyzer's suggestion is missing or too
/// generic; else the analyzer's suggestion. Two failed attempts with zero
/// findings override everything with the entity fallback query.
pub async fn next_topic(
    state: &Arc<AppState>,
    model: &str,
    question: &str,
    research: &mut ResearchState,
) -> String {
    let topic = if research.current_depth <= 1 {
        question.to_string()
    } else if let Some(pending) = research.subquestions.pop_front() {
        research.answered_subquestions.insert(pending.clone());
        pending
    } else if research
        .next_search_topic
        .as_deref()
        .map_or(true, is_generic_query)
    {
        match generate_subquestions(state, model, question, research).await {
            Some(generated) => {
                research.enqueue_subquestions(generated);
                match research.subquestions.pop_front() {
                    Some(pending) => {
                        research.answered_subquestions.insert(pending.clone());
                        pending
                    }
                    None => extract_key_terms(question),
                }
            }
            None => extract_key_terms(question),
        }
    } else {
        research
            .next_search_topic
            .clone()
            .unwrap_or_else(|| question.to_string())
    };

    if research.failed_attempts >= 2 && research.findings.is_empty() {
        let fallback = generate_fallback_query(question);
        debug!("overriding topic '{}' with fallback query '{}'", topic, fallback);
        return fallback;
    }
    topic
}

/// Ask the reasoning model for constraint-preserving subquestions. `None`
/// on any failure — the caller falls back to key terms.
async fn generate_subquestions(
    state: &Arc<AppState>,
    model: &str,
    question: &str,
    research: &ResearchState,
) -> Option<Vec<String>> {
    let prompt = prompts::subquestion_generation(question, &research.findings);
    let reply = match state
        .llm
        .generate_text(GenerateTextRequest {
            model,
            prompt: &prompt,
            max_tokens: Some(SUBQUESTION_MAX_TOKENS),
        })
        .await
    {
        Ok(reply) => reply,
        Err(e) => {
            warn!("subquestion generation failed: {}", e);
            return None;
        }
    };

    let items = salvage_string_array(&reply)?;
    let kept: Vec<String> = items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| s.len() > 10 && s.len() < 100)
        .take(MAX_SUBQUESTIONS)
        .collect();
    (!kept.is_empty()).then_some(kept)
}
