use regex::Regex;
use serde_json::Value;

use crate::core::types::{AnalysisRecord, Confidence};
use crate::nlp::key_terms::generate_fallback_query;

const MAX_BRACE_CANDIDATES: usize = 8;

/// Facts the textual-salvage tier needs when the reply carries no JSON at
/// all.
#[derive(Debug, Clone, Copy)]
pub struct SalvageContext<'a> {
    pub question: &'a str,
    pub findings_len: usize,
    pub time_remaining_min: f64,
}

/// Parse a reasoning-model reply into an analysis record. Tiers:
/// 1. direct JSON parse (honoring an `analysis` wrapper key),
/// 2. fenced ```json blocks in order,
/// 3. balanced-looking `{…}` substrings,
/// 4. textual heuristics over the raw reply.
/// Never fails — tier 4 always produces a record.
pub fn parse_analysis(raw: &str, ctx: &SalvageContext) -> AnalysisRecord {
    if let Some(value) = salvage_object(raw) {
        return analysis_from_value(&value);
    }
    textual_salvage(raw, ctx)
}

/// Tiers 1–3 for an object-shaped reply.
pub fn salvage_object(raw: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(raw.trim()) {
        if value.is_object() {
            return Some(value);
        }
    }
    for block in fenced_blocks(raw) {
        if let Ok(value) = serde_json::from_str::<Value>(block.trim()) {
            if value.is_object() {
                return Some(value);
            }
        }
    }
    for candidate in balanced_substrings(raw, '{', '}') {
        if let Ok(value) = serde_json::from_str::<Value>(&candidate) {
            if value.is_object() {
                return Some(value);
            }
        }
    }
    None
}

/// Tiers 1–3 for an array-of-strings reply (constraints, subquestions).
/// Non-string items are dropped.
pub fn salvage_string_array(raw: &str) -> Option<Vec<String>> {
    if let Ok(value) = serde_json::from_str::<Value>(raw.trim()) {
        if let Some(items) = string_items_of(&value) {
            return Some(items);
        }
    }
    for block in fenced_blocks(raw) {
        if let Ok(value) = serde_json::from_str::<Value>(block.trim()) {
            if let Some(items) = string_items_of(&value) {
                return Some(items);
            }
        }
    }
    for candidate in balanced_substrings(raw, '[', ']') {
        if let Ok(value) = serde_json::from_str::<Value>(&candidate) {
            if let Some(items) = string_items_of(&value) {
                return Some(items);
            }
        }
    }
    None
}

fn string_items_of(value: &Value) -> Option<Vec<String>> {
    value.as_array().map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    })
}

/// Field-by-field extraction with the documented defaults; wrong-typed
/// fields degrade to their default instead of failing the whole record.
pub fn analysis_from_value(value: &Value) -> AnalysisRecord {
    let value = match value.get("analysis") {
        Some(inner) if inner.is_object() => inner,
        _ => value,
    };
    AnalysisRecord {
        summary: value
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        has_answer: value
            .get("hasAnswer")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        confidence: value
            .get("confidence")
            .and_then(Value::as_str)
            .map(Confidence::parse)
            .unwrap_or_default(),
        gaps: string_list(value.get("gaps")),
        should_continue: value
            .get("shouldContinue")
            .and_then(Value::as_bool)
            .unwrap_or(true),
        next_search_topic: non_empty_str(value.get("nextSearchTopic")),
        url_to_search: non_empty_str(value.get("urlToSearch")),
        subquestions: string_list(value.get("subquestions")),
        sub_answer: non_empty_str(value.get("subAnswer")),
        last_query: non_empty_str(value.get("lastQuery")),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn fenced_blocks(raw: &str) -> Vec<String> {
    let fence = Regex::new(r"(?s)```(?:json)?\s*(.*?)```").unwrap();
    fence
        .captures_iter(raw)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Collect balanced-looking bracket substrings in order of appearance. The
/// scan ignores string escapes on purpose — a false candidate simply fails
/// the JSON parse on the next tier step.
fn balanced_substrings(raw: &str, open: char, close: char) -> Vec<String> {
    let mut candidates = Vec::new();
    let chars: Vec<(usize, char)> = raw.char_indices().collect();
    let mut i = 0;
    while i < chars.len() && candidates.len() < MAX_BRACE_CANDIDATES {
        if chars[i].1 == open {
            let mut depth = 0usize;
            for (j, &(byte_end, c)) in chars.iter().enumerate().skip(i) {
                if c == open {
                    depth += 1;
                } else if c == close {
                    depth -= 1;
                    if depth == 0 {
                        let start = chars[i].0;
                        let end = byte_end + c.len_utf8();
                        candidates.push(raw[start..end].to_string());
                        i = j;
                        break;
                    }
                }
            }
        }
        i += 1;
    }
    candidates
}

/// Tier 4: no JSON anywhere — derive a record from what the prose says.
fn textual_salvage(raw: &str, ctx: &SalvageContext) -> AnalysisRecord {
    let lower = raw.to_lowercase();
    let confidence = if lower.contains("high confidence") || lower.contains("confident") {
        Confidence::High
    } else if lower.contains("medium") || lower.contains("moderate") {
        Confidence::Medium
    } else {
        Confidence::Low
    };
    let has_answer = lower.contains("found")
        || lower.contains("answer")
        || lower.contains("identified")
        || confidence == Confidence::High;
    let should_continue = ctx.findings_len < 3
        || ctx.time_remaining_min > 1.5
        || lower.contains("continue")
        || lower.contains("more search")
        || lower.contains("insufficient");
    AnalysisRecord {
        summary: raw.chars().take(200).collect(),
        has_answer,
        confidence,
        gaps: vec!["More information needed".to_string()],
        should_continue,
        next_search_topic: Some(generate_fallback_query(ctx.question)),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> SalvageContext<'static> {
        SalvageContext {
            question: "Which US president signed the Civil Rights Act of 1964?",
            findings_len: 0,
            time_remaining_min: 3.0,
        }
    }

    #[test]
    fn test_direct_parse_matches_salvage() {
        let raw = r#"{"summary":"ok","hasAnswer":true,"confidence":"high","shouldContinue":false}"#;
        let record = parse_analysis(raw, &ctx());
        assert_eq!(record.summary, "ok");
        assert!(record.has_answer);
        assert_eq!(record.confidence, Confidence::High);
        assert!(!record.should_continue);
    }

    #[test]
    fn test_analysis_wrapper_key() {
        let raw = r#"{"analysis":{"summary":"wrapped","hasAnswer":false}}"#;
        let record = parse_analysis(raw, &ctx());
        assert_eq!(record.summary, "wrapped");
        assert!(record.should_continue);
    }

    #[test]
    fn test_fenced_block() {
        let raw = "Here you go:\n```json\n{\"summary\": \"fenced\"}\n```\nthanks";
        let record = parse_analysis(raw, &ctx());
        assert_eq!(record.summary, "fenced");
    }

    #[test]
    fn test_embedded_object_in_prose() {
        let raw = "here is my analysis of the findings {\"summary\":\"ok\",\"hasAnswer\":false} hope that helps";
        let record = parse_analysis(raw, &ctx());
        assert_eq!(record.summary, "ok");
        assert!(!record.has_answer);
    }

    #[test]
    fn test_subquestions_filtered_to_strings() {
        let raw = r#"{"summary":"s","subquestions":["keep this one", 42, null, "and this"]}"#;
        let record = parse_analysis(raw, &ctx());
        assert_eq!(record.subquestions, vec!["keep this one", "and this"]);
    }

    #[test]
    fn test_textual_salvage_heuristics() {
        let raw = "I could not produce JSON but I am confident the answer was identified.";
        let record = parse_analysis(raw, &ctx());
        assert_eq!(record.confidence, Confidence::High);
        assert!(record.has_answer);
        assert_eq!(record.gaps, vec!["More information needed"]);
        assert!(record.next_search_topic.is_some());
        assert!(record.summary.len() <= 200);
    }

    #[test]
    fn test_string_array_salvage() {
        assert_eq!(
            salvage_string_array(r#"["a constraint", "another"]"#),
            Some(vec!["a constraint".to_string(), "another".to_string()])
        );
        assert_eq!(
            salvage_string_array("sure:\n```\n[\"one\", 2, \"three\"]\n```"),
            Some(vec!["one".to_string(), "three".to_string()])
        );
        assert_eq!(
            salvage_string_array("the list is [\"x\", \"y\"] as requested"),
            Some(vec!["x".to_string(), "y".to_string()])
        );
        assert!(salvage_string_array("no json here at all").is_none());
    }
}
