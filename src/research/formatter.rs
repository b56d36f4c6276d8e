use regex::Regex;

const DEFAULT_EXPLANATION: &str = "The research could not find a definitive answer.";
const DEFAULT_ANSWER: &str = "Unknown";
const DEFAULT_CONFIDENCE: &str = "30%";

/// Validate or repair a candidate answer into exactly three labelled lines:
/// `Explanation: …` / `Exact Answer: …` / `Confidence: NN%`.
///
/// Idempotent: formatting an already-formatted answer returns it unchanged.
pub fn format_final_answer(raw: &str, question: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return fallback(question, 10);
    }

    let lines: Vec<&str> = trimmed.lines().collect();
    if lines.len() == 3 {
        let confidence_line =
            Regex::new(r"(?i)^\s*confidence:\s*(100|[1-9]?\d)%\s*$").unwrap();
        let well_formed = starts_with_label(lines[0], "explanation:")
            && starts_with_label(lines[1], "exact answer:")
            && confidence_line.is_match(lines[2]);
        if well_formed {
            return trimmed.to_string();
        }
    }

    // The section terminators are consumed rather than asserted: the regex
    // engine here has no lookahead, and only capture group 1 is used.
    let explanation = Regex::new(r"(?is)explanation:\s*(.*?)(?:exact answer:|confidence:|\z)")
        .unwrap()
        .captures(trimmed)
        .map(|cap| collapse_whitespace(&cap[1]))
        .filter(|s| !s.is_empty());
    let answer = Regex::new(r"(?is)exact answer:\s*(.*?)(?:explanation:|confidence:|\z)")
        .unwrap()
        .captures(trimmed)
        .map(|cap| collapse_whitespace(&cap[1]))
        .filter(|s| !s.is_empty());
    let confidence = Regex::new(r"(?i)confidence:\s*(\d{1,3})\s*%")
        .unwrap()
        .captures(trimmed)
        .and_then(|cap| cap[1].parse::<u32>().ok())
        .map(|n| format!("{}%", n.min(100)));

    if explanation.is_some() || answer.is_some() || confidence.is_some() {
        return format!(
            "Explanation: {}\nExact Answer: {}\nConfidence: {}",
            explanation.unwrap_or_else(|| DEFAULT_EXPLANATION.to_string()),
            answer.unwrap_or_else(|| DEFAULT_ANSWER.to_string()),
            confidence.unwrap_or_else(|| DEFAULT_CONFIDENCE.to_string()),
        );
    }

    fallback(question, 10)
}

/// The canonical no-answer response used when synthesis produced nothing
/// usable at all.
pub fn hard_fallback(question: &str) -> String {
    fallback(question, 0)
}

fn fallback(question: &str, confidence_pct: u8) -> String {
    format!(
        "Explanation: The research could not find a definitive answer to: \"{}\".\nExact Answer: Unknown\nConfidence: {}%",
        collapse_whitespace(question),
        confidence_pct
    )
}

fn starts_with_label(line: &str, label: &str) -> bool {
    line.trim_start().to_ascii_lowercase().starts_with(label)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUESTION: &str = "Which US president signed the Civil Rights Act of 1964?";

    #[test]
    fn test_well_formed_passes_through() {
        let input =
            "Explanation: Two sources agree.\nExact Answer: Lyndon B. Johnson\nConfidence: 95%";
        assert_eq!(format_final_answer(input, QUESTION), input);
    }

    #[test]
    fn test_empty_input_fallback() {
        let out = format_final_answer("", QUESTION);
        assert_eq!(out.lines().count(), 3);
        assert!(out.contains("Exact Answer: Unknown"));
        assert!(out.ends_with("Confidence: 10%"));
    }

    #[test]
    fn test_salvage_from_prose() {
        let input = "Sure! Based on the sources, explanation: the act was signed in July 1964 by the sitting president. Exact answer: Lyndon B. Johnson. Confidence: 88%";
        let out = format_final_answer(input, QUESTION);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Explanation: "));
        assert!(lines[1].starts_with("Exact Answer: Lyndon B. Johnson"));
        assert_eq!(lines[2], "Confidence: 88%");
    }

    #[test]
    fn test_partial_sections_get_defaults() {
        let out = format_final_answer("Exact Answer: 42", QUESTION);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], format!("Explanation: {}", DEFAULT_EXPLANATION));
        assert_eq!(lines[1], "Exact Answer: 42");
        assert_eq!(lines[2], "Confidence: 30%");
    }

    #[test]
    fn test_unsalvageable_input_falls_back() {
        let out = format_final_answer("I have no idea what you mean.", QUESTION);
        assert!(out.contains("Exact Answer: Unknown"));
        assert!(out.ends_with("Confidence: 10%"));
    }

    #[test]
    fn test_multiline_explanation_collapses_to_three_lines() {
        let input = "Explanation: line one\nline two\nline three\nExact Answer: X\nConfidence: 50%";
        let out = format_final_answer(input, QUESTION);
        assert_eq!(out.lines().count(), 3);
        assert!(out.starts_with("Explanation: line one line two line three"));
    }

    #[test]
    fn test_out_of_range_confidence_clamped() {
        let out = format_final_answer("Exact Answer: X\nConfidence: 250%", QUESTION);
        assert!(out.ends_with("Confidence: 100%"));
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "",
            "Explanation: a.\nExact Answer: b\nConfidence: 0%",
            "garbage with exact answer: something buried",
            "Explanation: multi\nline\nExact Answer: X\nConfidence: 72%",
            "I have no idea what you mean.",
        ];
        for input in inputs {
            let once = format_final_answer(input, QUESTION);
            let twice = format_final_answer(&once, QUESTION);
            assert_eq!(once, twice, "not idempotent for {:?}", input);
        }
    }
}
