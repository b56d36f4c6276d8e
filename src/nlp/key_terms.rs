use regex::Regex;
use std::collections::HashSet;

/// Articles, prepositions and auxiliaries, plus output-format words that
/// must never become search terms, plus the common interrogatives.
const STOPWORDS: &[&str] = &[
    "a", "an", "the", "of", "in", "on", "at", "to", "for", "from", "with", "by", "about", "as",
    "into", "onto", "over", "under", "between", "through", "during", "is", "are", "was", "were",
    "be", "been", "being", "am", "do", "does", "did", "has", "have", "had", "having", "will",
    "would", "can", "could", "shall", "should", "may", "might", "must", "and", "or", "but", "nor",
    "not", "no", "this", "that", "these", "those", "it", "its", "they", "them", "their", "there",
    "then", "than", "such", "some", "any", "each", "explanation", "answer", "confidence",
    "response", "additionally", "also", "both", "either", "neither", "what", "when", "where",
    "who", "whom", "whose", "which", "why", "how",
];

const BANNED_SUBSTRINGS: &[&str] = &["explanation", "answer", "confidence"];

const CATEGORY_CAP: usize = 8;

fn is_stopword(word: &str) -> bool {
    let lower = word.to_ascii_lowercase();
    STOPWORDS.contains(&lower.as_str())
}

fn contains_banned(word: &str) -> bool {
    let lower = word.to_ascii_lowercase();
    BANNED_SUBSTRINGS.iter().any(|b| lower.contains(b))
}

/// Sentence-leading interrogatives capitalize like names ("Which US …"),
/// so capitalized spans shed their leading stopword tokens before use.
fn trim_leading_stopwords(seq: &str) -> &str {
    let mut rest = seq.trim_start();
    while let Some(first) = rest.split_whitespace().next() {
        if !is_stopword(first) {
            break;
        }
        rest = rest[first.len()..].trim_start();
    }
    rest
}

/// Derive a compact search string from a question without any LLM help:
/// union of quoted phrases, capitalized name sequences, years, percentage
/// tokens and long lowercase words, reduced to the 8 longest and joined
/// with spaces.
pub fn extract_key_terms(question: &str) -> String {
    let mut seen: HashSet<String> = HashSet::new();
    let mut terms: Vec<String> = Vec::new();
    let push = |term: &str, terms: &mut Vec<String>, seen: &mut HashSet<String>| {
        let term = term.trim();
        if !term.is_empty() && seen.insert(term.to_ascii_lowercase()) {
            terms.push(term.to_string());
        }
    };

    let quoted = Regex::new(r#""([^"]+)""#).unwrap();
    for cap in quoted.captures_iter(question).take(CATEGORY_CAP) {
        let phrase = cap[1].trim();
        if phrase.len() > 2 {
            push(phrase, &mut terms, &mut seen);
        }
    }

    let capitalized = Regex::new(r"\b[A-Z][A-Za-z0-9']*(?:\s+[A-Z][A-Za-z0-9']*){0,2}").unwrap();
    for m in capitalized.find_iter(question).take(CATEGORY_CAP) {
        let seq = trim_leading_stopwords(m.as_str());
        if !seq.is_empty() && !is_stopword(seq) {
            push(seq, &mut terms, &mut seen);
        }
    }

    let years = Regex::new(r"\b(?:19[5-9]\d|20[0-4]\d)\b").unwrap();
    for m in years.find_iter(question).take(CATEGORY_CAP) {
        push(m.as_str(), &mut terms, &mut seen);
    }

    let percents = Regex::new(r"\b\d+(?:\.\d+)?%").unwrap();
    for m in percents.find_iter(question).take(CATEGORY_CAP) {
        push(m.as_str(), &mut terms, &mut seen);
    }

    let mut lowercase_taken = 0;
    for word in question.split(|c: char| !c.is_alphanumeric()) {
        if lowercase_taken >= CATEGORY_CAP {
            break;
        }
        if word.len() > 4
            && word.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            && !is_stopword(word)
            && !contains_banned(word)
        {
            push(word, &mut terms, &mut seen);
            lowercase_taken += 1;
        }
    }

    terms.sort_by(|a, b| b.len().cmp(&a.len()));
    terms.truncate(8);
    if terms.is_empty() {
        return question.trim().to_string();
    }
    terms.join(" ")
}

/// Last-resort query when repeated hops fail: named entities (quoted
/// phrases, capitalized sequences, years, numbers with their trailing
/// word), else long lowercase words, else a literal placeholder.
pub fn generate_fallback_query(question: &str) -> String {
    let mut seen: HashSet<String> = HashSet::new();
    let mut entities: Vec<String> = Vec::new();
    let push = |term: &str, entities: &mut Vec<String>, seen: &mut HashSet<String>| {
        let term = term.trim();
        if entities.len() < 5 && !term.is_empty() && seen.insert(term.to_ascii_lowercase()) {
            entities.push(term.to_string());
        }
    };

    let quoted = Regex::new(r#""([^"]+)""#).unwrap();
    for cap in quoted.captures_iter(question) {
        let phrase = cap[1].trim();
        if phrase.len() > 2 {
            push(phrase, &mut entities, &mut seen);
        }
    }

    let capitalized = Regex::new(r"\b[A-Z][A-Za-z0-9']*(?:\s+[A-Z][A-Za-z0-9']*){0,2}").unwrap();
    for m in capitalized.find_iter(question) {
        let seq = trim_leading_stopwords(m.as_str());
        if !seq.is_empty() && !is_stopword(seq) {
            push(seq, &mut entities, &mut seen);
        }
    }

    let years = Regex::new(r"\b(?:19[5-9]\d|20[0-4]\d)\b").unwrap();
    for m in years.find_iter(question) {
        push(m.as_str(), &mut entities, &mut seen);
    }

    let numeric_with_word = Regex::new(r"\b\d[\d,.]*\s+[A-Za-z][A-Za-z0-9-]*").unwrap();
    for m in numeric_with_word.find_iter(question) {
        push(m.as_str(), &mut entities, &mut seen);
    }

    if !entities.is_empty() {
        return entities.join(" ");
    }

    let words: Vec<&str> = question
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| {
            w.len() > 4
                && w.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
                && !is_stopword(w)
        })
        .take(4)
        .collect();
    if words.is_empty() {
        "search query".to_string()
    } else {
        words.join(" ")
    }
}

const GENERIC_WORDS: &[&str] = &[
    "what", "when", "where", "who", "how", "name", "info", "event",
];

/// A suggested search topic too vague to act on: a bare interrogative,
/// fewer than three words, or a pure number.
pub fn is_generic_query(query: &str) -> bool {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return true;
    }
    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    if GENERIC_WORDS.iter().any(|w| trimmed.eq_ignore_ascii_case(w)) {
        return true;
    }
    trimmed.split_whitespace().count() < 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_terms_capture_entities() {
        let terms =
            extract_key_terms("Which US president signed the Civil Rights Act of 1964?");
        assert!(terms.contains("Civil Rights Act"));
        assert!(terms.contains("1964"));
        assert!(terms.contains("president"));
        assert!(
            !terms
                .split_whitespace()
                .any(|t| t.eq_ignore_ascii_case("which")),
            "interrogative-led capitalized spans must be trimmed: {}",
            terms
        );
    }

    #[test]
    fn test_leading_stopwords_trimmed_from_capitalized_spans() {
        assert_eq!(trim_leading_stopwords("Which US"), "US");
        assert_eq!(trim_leading_stopwords("The Civil Rights"), "Civil Rights");
        assert_eq!(trim_leading_stopwords("Which"), "");
        assert_eq!(trim_leading_stopwords("Johnson"), "Johnson");
    }

    #[test]
    fn test_key_terms_quoted_phrases() {
        let terms = extract_key_terms("find the article titled \"the hidden valley\" please");
        assert!(terms.contains("the hidden valley"));
    }

    #[test]
    fn test_key_terms_years_and_percents() {
        let terms = extract_key_terms("growth of 42% reported in 1987 versus 2031 forecast");
        assert!(terms.contains("42%"));
        assert!(terms.contains("1987"));
        assert!(terms.contains("2031"));
    }

    #[test]
    fn test_fallback_query_prefers_entities() {
        let q = generate_fallback_query("Which US president signed the Civil Rights Act of 1964?");
        assert!(q.contains("Civil Rights Act") || q.contains("1964"));
    }

    #[test]
    fn test_fallback_query_literal_when_nothing_usable() {
        assert_eq!(generate_fallback_query("an the of to"), "search query");
    }

    #[test]
    fn test_generic_predicate() {
        assert!(is_generic_query("who"));
        assert!(is_generic_query("WHAT"));
        assert!(is_generic_query("  event  "));
        assert!(is_generic_query("1964"));
        assert!(is_generic_query("two words"));
        assert!(!is_generic_query("civil rights act"));
    }
}
