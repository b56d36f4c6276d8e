use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::capability::{WebExtract, WebScrape, WebSearch};
use crate::core::config::{ENV_FIRECRAWL_API_KEY, ENV_FIRECRAWL_BASE_URL};
use crate::core::types::{ExtractData, ExtractItem, SearchHit};

const DEFAULT_BASE_URL: &str = "https://api.firecrawl.dev";

/// HTTP client for a Firecrawl-style web capability service exposing
/// `/v1/search`, `/v1/extract` and `/v1/scrape`.
pub struct FirecrawlClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl FirecrawlClient {
    pub fn new(http: reqwest::Client) -> Self {
        let base_url = std::env::var(ENV_FIRECRAWL_BASE_URL)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let api_key = std::env::var(ENV_FIRECRAWL_API_KEY)
            .ok()
            .filter(|v| !v.trim().is_empty());
        Self {
            http,
            base_url,
            api_key,
        }
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let mut req = self.http.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("{} returned HTTP {}", path, status));
        }
        let payload: Value = response.json().await?;
        if payload.get("success").and_then(Value::as_bool) == Some(false) {
            let reason = payload
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(anyhow!("{} reported failure: {}", path, reason));
        }
        Ok(payload)
    }
}

#[async_trait]
impl WebSearch for FirecrawlClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let payload = self
            .post_json("/v1/search", json!({ "query": query, "limit": 10 }))
            .await?;
        let hits: Vec<SearchHit> = payload
            .get("data")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let url = item.get("url").and_then(Value::as_str)?;
                        Some(SearchHit {
                            url: url.to_string(),
                            title: item
                                .get("title")
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string(),
                            description: item
                                .get("description")
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        debug!("search '{}' returned {} hits", query, hits.len());
        Ok(hits)
    }
}

#[async_trait]
impl WebExtract for FirecrawlClient {
    async fn extract(&self, urls: &[String], prompt: &str) -> Result<ExtractData> {
        let payload = self
            .post_json("/v1/extract", json!({ "urls": urls, "prompt": prompt }))
            .await?;
        let data = payload.get("data").cloned().unwrap_or(Value::Null);
        Ok(match data {
            Value::String(text) => ExtractData::Text(text),
            Value::Array(items) => ExtractData::Items(
                items
                    .into_iter()
                    .map(|item| {
                        // Tolerate both `[{data: …}]` and bare item lists.
                        let inner = item.get("data").cloned();
                        ExtractItem {
                            data: inner.unwrap_or(item),
                        }
                    })
                    .collect(),
            ),
            Value::Null => ExtractData::Items(Vec::new()),
            other => ExtractData::Items(vec![ExtractItem { data: other }]),
        })
    }
}

#[async_trait]
impl WebScrape for FirecrawlClient {
    async fn scrape_markdown(&self, url: &str) -> Result<String> {
        let payload = self
            .post_json("/v1/scrape", json!({ "url": url, "formats": ["markdown"] }))
            .await?;
        payload
            .get("data")
            .and_then(|d| d.get("markdown"))
            .or_else(|| payload.get("markdown"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("scrape of {} returned no markdown", url))
    }
}
