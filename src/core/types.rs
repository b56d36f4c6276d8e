use serde::{Deserialize, Serialize};

// ───────────────────────────────────────────────────────────────────────────
// Inbound request / response envelope
// ───────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: Option<String>,
    pub content: String,
}

/// Eval mode answers with a single JSON body; interactive mode streams
/// progress events and a long-form report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResearchMode {
    Eval,
    Interactive,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub reasoning_model_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    /// Legacy wire name kept for callers that predate the `mode` field.
    #[serde(default, rename = "experimental_deepResearch")]
    pub experimental_deep_research: bool,
    #[serde(default)]
    pub mode: Option<ResearchMode>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResearchResponse {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ───────────────────────────────────────────────────────────────────────────
// Capability payloads
// ───────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SearchHit {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// One element of a list-shaped extract payload. The `data` value may be a
/// plain string or an arbitrary JSON object.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractItem {
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Extract capability payload: either one blob of text for the whole batch
/// or a per-document item list.
#[derive(Debug, Clone)]
pub enum ExtractData {
    Text(String),
    Items(Vec<ExtractItem>),
}

// ───────────────────────────────────────────────────────────────────────────
// Research loop records
// ───────────────────────────────────────────────────────────────────────────

/// A unit of extracted evidence with its source URL. Appended in hop order,
/// never removed during a run.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub text: String,
    pub source: String,
}

/// Frequency-map entry for a URL seen across search responses.
#[derive(Debug, Clone)]
pub struct UrlEntry {
    pub url: String,
    pub frequency: u32,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    #[default]
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Lenient parse for salvaged analyzer output; anything unrecognized
    /// maps to `Low`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Confidence::High,
            "medium" | "moderate" => Confidence::Medium,
            _ => Confidence::Low,
        }
    }
}

/// Parsed analyzer verdict. Every field tolerates absence in the raw LLM
/// output; the salvage parser supplies these defaults.
#[derive(Debug, Clone)]
pub struct AnalysisRecord {
    pub summary: String,
    pub has_answer: bool,
    pub confidence: Confidence,
    pub gaps: Vec<String>,
    pub should_continue: bool,
    pub next_search_topic: Option<String>,
    pub url_to_search: Option<String>,
    pub subquestions: Vec<String>,
    pub sub_answer: Option<String>,
    pub last_query: Option<String>,
}

impl Default for AnalysisRecord {
    fn default() -> Self {
        Self {
            summary: String::new(),
            has_answer: false,
            confidence: Confidence::Low,
            gaps: Vec::new(),
            should_continue: true,
            next_search_topic: None,
            url_to_search: None,
            subquestions: Vec::new(),
            sub_answer: None,
            last_query: None,
        }
    }
}
