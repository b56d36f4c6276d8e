use std::sync::Arc;

use tracing::{debug, warn};

use crate::capability::GenerateTextRequest;
use crate::nlp::key_terms::extract_key_terms;
use crate::nlp::salvage::salvage_string_array;
use crate::research::prompts;
use crate::AppState;

const MAX_CONSTRAINTS: usize = 8;
const CONSTRAINT_MAX_TOKENS: u32 = 300;

/// Derive the identifying constraints of a question with the reasoning
/// model, degrading to key-term extraction when the model misbehaves.
pub async fn extract_constraints(
    state: &Arc<AppState>,
    model: &str,
    question: &str,
) -> Vec<String> {
    let prompt = prompts::constraint_extraction(question);
    let reply = match state
        .llm
        .generate_text(GenerateTextRequest {
            model,
            prompt: &prompt,
            max_tokens: Some(CONSTRAINT_MAX_TOKENS),
        })
        .await
    {
        Ok(reply) => reply,
        Err(e) => {
            warn!("constraint extraction failed: {}", e);
            return key_term_fallback(question);
        }
    };

    let Some(items) = salvage_string_array(&reply) else {
        debug!("constraint reply carried no parsable array");
        return key_term_fallback(question);
    };

    let constraints: Vec<String> = items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| s.len() > 2 && s.len() < 50)
        .filter(|s| {
            let lower = s.to_lowercase();
            !lower.contains("explanation") && !lower.contains("confidence")
        })
        .take(MAX_CONSTRAINTS)
        .collect();

    if constraints.is_empty() {
        key_term_fallback(question)
    } else {
        constraints
    }
}

fn key_term_fallback(question: &str) -> Vec<String> {
    extract_key_terms(question)
        .split_whitespace()
        .take(5)
        .map(str::to_string)
        .collect()
}
