use crate::core::types::Finding;

const FINDING_SNIPPET_CHARS: usize = 1500;
const RECENT_FINDING_CHARS: usize = 150;

fn clip(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

/// Ask the reasoning model for the short identifying constraints of a
/// question.
pub fn constraint_extraction(question: &str) -> String {
    format!(
        r#"List the identifying constraints of the following question — the short fragments (names, dates, places, numbers, qualifiers) that any correct answer must satisfy.

Question: {question}

Return ONLY a JSON array of strings, most identifying first, at most 8 items. Each item must be a short fragment taken from or implied by the question, not a sentence. No prose, no markdown."#
    )
}

/// Constraint-focused extraction prompt sent to the web-extract capability
/// in eval mode. The raw reply is stored as a finding verbatim.
pub fn constraint_extraction_focus(constraints: &[String]) -> String {
    let list = constraints
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {}", i + 1, c))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"Scan this page for evidence about an entity that satisfies ALL of these constraints:
{list}

Return a JSON object shaped exactly like:
{{"constraintMatches": {{"<constraint>": "<matching value or null>"}}, "entityName": "<name of the matching entity or null>", "additionalContext": "<one or two sentences of supporting context>"}}

Fill constraintMatches with one key per constraint above. Use null when the page says nothing about a constraint. Do not invent values."#
    )
}

/// Generic page summarization prompt used by interactive mode.
pub fn generic_summary(topic: &str) -> String {
    format!(
        r#"Summarize the parts of this page that are relevant to: {topic}

Keep concrete facts, names, dates and figures. Skip navigation, boilerplate and unrelated sections. Plain text, at most two paragraphs."#
    )
}

/// Ask the reasoning model to decompose the question into narrower
/// subquestions that preserve its constraints.
pub fn subquestion_generation(question: &str, findings: &[Finding]) -> String {
    let recent = findings
        .iter()
        .rev()
        .take(3)
        .map(|f| format!("- {}", clip(&f.text, RECENT_FINDING_CHARS)))
        .collect::<Vec<_>>()
        .join("\n");
    let evidence = if recent.is_empty() {
        "None yet.".to_string()
    } else {
        recent
    };
    format!(
        r#"Main question: {question}

Evidence gathered so far:
{evidence}

Generate narrower subquestions that would each pin down part of the answer while preserving every constraint of the main question (same entities, dates, places and qualifiers — never a broader paraphrase).

Return ONLY a JSON array of subquestion strings, at most 8 items."#
    )
}

/// Build the analysis prompt: full findings, prior subanswers, and the
/// rules the stop controller relies on.
pub fn analysis(question: &str, findings: &[Finding], sub_answers: &[(String, String)]) -> String {
    let evidence = if findings.is_empty() {
        "No findings yet.".to_string()
    } else {
        findings
            .iter()
            .enumerate()
            .map(|(i, f)| {
                format!(
                    "[{}] ({})\n{}",
                    i + 1,
                    f.source,
                    clip(&f.text, FINDING_SNIPPET_CHARS)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    };
    let answered = if sub_answers.is_empty() {
        "None.".to_string()
    } else {
        sub_answers
            .iter()
            .map(|(query, answer)| format!("Q: {}\nA: {}", query, answer))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        r#"You are the analysis step of a research loop answering:
{question}

Evidence collected so far:
{evidence}

Subquestions already answered:
{answered}

Assess the evidence and respond with a JSON object:
{{"summary": "<2-3 sentence state of the research>",
 "hasAnswer": <true when the evidence names a candidate satisfying the question's constraints>,
 "confidence": "<low|medium|high>",
 "gaps": ["<missing piece>", ...],
 "shouldContinue": <false only when more searching cannot improve the answer>,
 "nextSearchTopic": "<specific next query, optional>",
 "urlToSearch": "<one promising URL to read next, optional>",
 "subquestions": ["<narrower question preserving all constraints>", ...],
 "subAnswer": "<answer to the most recent subquestion, optional>",
 "lastQuery": "<the subquestion subAnswer answers, optional>"}}

Confidence rules: "high" only when a single candidate matches every constraint across at least two independent sources; "medium" when one source or one unverified constraint remains; otherwise "low". When several candidates fit, keep searching for a constraint that separates them and put it in nextSearchTopic.

Return ONLY the JSON object."#
    )
}

/// Eval-mode synthesis prompt: constraints with coverage counts, delimited
/// sources, and the exact three-line output contract.
pub fn synthesis(
    question: &str,
    constraints: &[String],
    coverage: &[usize],
    findings: &[Finding],
) -> String {
    let constraint_lines = constraints
        .iter()
        .zip(coverage.iter())
        .map(|(c, n)| format!("- {} (seen in {} sources)", c, n))
        .collect::<Vec<_>>()
        .join("\n");
    let sources = findings
        .iter()
        .enumerate()
        .map(|(i, f)| {
            format!(
                "--- SOURCE {} ({}) ---\n{}",
                i + 1,
                f.source,
                clip(&f.text, FINDING_SNIPPET_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        r#"Question: {question}

Identifying constraints and how often each was matched:
{constraint_lines}

{sources}

Score every candidate answer mentioned in the sources by matched/total constraints and pick the highest. Then output EXACTLY three lines and nothing else:
Explanation: <one or two sentences citing the decisive constraints>
Exact Answer: <the single best answer, as short as possible>
Confidence: <number between 0 and 100>%"#
    )
}

/// Interactive-mode closing call: a long-form report instead of the
/// three-line format.
pub fn final_report(question: &str, findings: &[Finding], summaries: &[String]) -> String {
    let sources = findings
        .iter()
        .enumerate()
        .map(|(i, f)| {
            format!(
                "--- SOURCE {} ({}) ---\n{}",
                i + 1,
                f.source,
                clip(&f.text, FINDING_SNIPPET_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    let notes = if summaries.is_empty() {
        String::new()
    } else {
        format!("\nAnalyst notes per hop:\n{}\n", summaries.join("\n"))
    };
    format!(
        r#"Write a research report answering: {question}

{sources}
{notes}
Structure the report with a short executive summary, the key findings with inline source numbers like [1], and a closing assessment of remaining uncertainty. Use only the sources above — never invent facts."#
    )
}
