/// External capability seams. The research loop only ever talks to the
/// outside world through these traits; concrete clients live next to them
/// and scripted doubles live in the test suite.
pub mod firecrawl;
pub mod openai;

pub use firecrawl::FirecrawlClient;
pub use openai::OpenAiClient;

use crate::core::types::{ExtractData, SearchHit};
use anyhow::Result;
use async_trait::async_trait;

/// Web search. A successful call may carry zero hits — that is not an error.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
}

/// Prompt-guided structured extraction over one or more URLs.
#[async_trait]
pub trait WebExtract: Send + Sync {
    async fn extract(&self, urls: &[String], prompt: &str) -> Result<ExtractData>;
}

/// Raw page fetch as markdown, used as the extraction fallback.
#[async_trait]
pub trait WebScrape: Send + Sync {
    async fn scrape_markdown(&self, url: &str) -> Result<String>;
}

#[derive(Debug, Clone, Copy)]
pub struct GenerateTextRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub max_tokens: Option<u32>,
}

/// Text generation against an LLM inference service.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate_text(&self, req: GenerateTextRequest<'_>) -> Result<String>;
}
