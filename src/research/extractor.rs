use std::sync::Arc;
use std::time::Duration;

use aho_corasick::AhoCorasick;
use anyhow::anyhow;
use backoff::ExponentialBackoffBuilder;
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::core::types::{ExtractData, Finding};
use crate::research::retry::RetryPolicy;
use crate::AppState;

pub const EXTRACT_TIMEOUT: Duration = Duration::from_secs(35);
const INTER_URL_PAUSE: Duration = Duration::from_secs(2);
const SCRAPE_FALLBACK_CHARS: usize = 2000;

/// Hosts that consistently block scraping or carry low-evidence content.
const BLOCKED_HOSTS: &[&str] = &[
    "reddit.com",
    "brainly.com",
    "youtube.com",
    "youtu.be",
    "facebook.com",
    "twitter.com",
    "x.com",
    "tiktok.com",
    "instagram.com",
];

const BLOCKED_EXTENSIONS: &[&str] = &[".pdf", ".doc", ".docx"];

/// Per-URL structured extraction with a hard timeout, exponential retries
/// and a raw-scrape fallback for empty or sentinel payloads.
pub struct Extractor {
    retry: RetryPolicy,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::exponential(2, 1000),
        }
    }
}

/// Drop URLs on blocked hosts, document downloads and anything that does
/// not parse. Scheme-less search results are retried with an `https`
/// prefix before rejection.
pub fn filter_urls(urls: &[String]) -> Vec<String> {
    let host_matcher = AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(BLOCKED_HOSTS)
        .unwrap();

    urls.iter()
        .filter(|raw| {
            let parsed = Url::parse(raw)
                .or_else(|_| Url::parse(&format!("https://{}", raw)));
            let Ok(parsed) = parsed else {
                return false;
            };
            let Some(host) = parsed.host_str() else {
                return false;
            };
            if host_matcher.is_match(host) {
                return false;
            }
            let path = parsed.path().to_ascii_lowercase();
            !BLOCKED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
        })
        .cloned()
        .collect()
}

impl Extractor {
    pub fn new(retry: RetryPolicy) -> Self {
        Self { retry }
    }

    /// Extract from one URL. Returns an empty list after all retries and
    /// the scrape fallback are spent — never an error.
    pub async fn extract_one(
        &self,
        state: &Arc<AppState>,
        url: &str,
        prompt: &str,
    ) -> Vec<Finding> {
        let urls = [url.to_string()];
        let attempts = self.retry.max_retries + 1;
        for attempt in 0..attempts {
            if attempt > 0 {
                tokio::time::sleep(self.retry.delay(attempt - 1)).await;
            }
            match tokio::time::timeout(EXTRACT_TIMEOUT, state.web_extract.extract(&urls, prompt))
                .await
            {
                Ok(Ok(data)) => {
                    let findings = normalize_payload(data, url);
                    if is_empty_payload(&findings) {
                        debug!("extract of {} returned an empty payload, scraping instead", url);
                        return self.scrape_fallback(state, url).await;
                    }
                    return findings;
                }
                Ok(Err(e)) => {
                    warn!(
                        "extract attempt {}/{} failed for {}: {}",
                        attempt + 1,
                        attempts,
                        url,
                        e
                    );
                }
                Err(_) => {
                    warn!(
                        "extract attempt {}/{} timed out after {:?} for {}",
                        attempt + 1,
                        attempts,
                        EXTRACT_TIMEOUT,
                        url
                    );
                }
            }
        }
        Vec::new()
    }

    /// Filter, then extract sequentially with a pause between URLs so the
    /// capability service is never hammered.
    pub async fn extract_many(
        &self,
        state: &Arc<AppState>,
        urls: &[String],
        prompt: &str,
    ) -> Vec<Finding> {
        let allowed = filter_urls(urls);
        if allowed.len() < urls.len() {
            debug!("url filter dropped {} of {} urls", urls.len() - allowed.len(), urls.len());
        }
        let mut findings = Vec::new();
        for (i, url) in allowed.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(INTER_URL_PAUSE).await;
            }
            findings.extend(self.extract_one(state, url, prompt).await);
        }
        findings
    }

    /// Filter, then fan extraction out across all URLs at once and join.
    pub async fn extract_parallel(
        &self,
        state: &Arc<AppState>,
        urls: &[String],
        prompt: &str,
    ) -> Vec<Finding> {
        let allowed = filter_urls(urls);
        let futures = allowed
            .iter()
            .map(|url| self.extract_one(state, url, prompt));
        join_all(futures).await.into_iter().flatten().collect()
    }

    async fn scrape_fallback(&self, state: &Arc<AppState>, url: &str) -> Vec<Finding> {
        let scrape = || async {
            state
                .web_scrape
                .scrape_markdown(url)
                .await
                .map_err(|e| backoff::Error::transient(anyhow!("{}", e)))
        };
        let schedule = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(500))
            .with_max_interval(Duration::from_secs(2))
            .with_max_elapsed_time(Some(Duration::from_secs(6)))
            .build();

        match backoff::future::retry(schedule, scrape).await {
            Ok(markdown) => {
                let text: String = markdown.chars().take(SCRAPE_FALLBACK_CHARS).collect();
                if text.trim().is_empty() {
                    Vec::new()
                } else {
                    vec![Finding {
                        text,
                        source: url.to_string(),
                    }]
                }
            }
            Err(e) => {
                warn!("scrape fallback failed for {}: {}", url, e);
                Vec::new()
            }
        }
    }
}

fn normalize_payload(data: ExtractData, url: &str) -> Vec<Finding> {
    match data {
        ExtractData::Text(text) => vec![Finding {
            text,
            source: url.to_string(),
        }],
        ExtractData::Items(items) => items
            .into_iter()
            .map(|item| {
                let text = match item.data {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                Finding {
                    text,
                    source: url.to_string(),
                }
            })
            .collect(),
    }
}

/// A payload with no usable text, or the extract service's "no entities
/// matched" sentinel embedded in the serialized result.
fn is_empty_payload(findings: &[Finding]) -> bool {
    findings.iter().all(|f| f.text.trim().is_empty())
        || findings
            .iter()
            .any(|f| f.text.contains(r#""names":[]"#) || f.text.contains(r#""names": []"#))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(urls: &[&str]) -> Vec<String> {
        urls.iter().map(|u| u.to_string()).collect()
    }

    #[test]
    fn test_filter_rejects_blocked_hosts() {
        let urls = owned(&[
            "https://www.reddit.com/r/history/abc",
            "https://youtu.be/xyz",
            "https://x.com/some/post",
            "https://en.wikipedia.org/wiki/Civil_Rights_Act_of_1964",
        ]);
        assert_eq!(
            filter_urls(&urls),
            owned(&["https://en.wikipedia.org/wiki/Civil_Rights_Act_of_1964"])
        );
    }

    #[test]
    fn test_filter_rejects_documents_case_insensitive() {
        let urls = owned(&[
            "https://example.org/report.PDF",
            "https://example.org/paper.docx",
            "https://example.org/page.html",
        ]);
        assert_eq!(filter_urls(&urls), owned(&["https://example.org/page.html"]));
    }

    #[test]
    fn test_filter_accepts_schemeless_urls() {
        let urls = owned(&["en.wikipedia.org/wiki/Civil_Rights_Act_of_1964"]);
        assert_eq!(filter_urls(&urls).len(), 1);
    }

    #[test]
    fn test_filter_rejects_unparseable() {
        let urls = owned(&["http://[not a url"]);
        assert!(filter_urls(&urls).is_empty());
    }

    #[test]
    fn test_empty_and_sentinel_payloads() {
        let empty: Vec<Finding> = Vec::new();
        assert!(is_empty_payload(&empty));
        assert!(is_empty_payload(&[Finding {
            text: "   ".into(),
            source: "u".into()
        }]));
        assert!(is_empty_payload(&[Finding {
            text: r#"{"names":[],"additionalContext":""}"#.into(),
            source: "u".into()
        }]));
        assert!(!is_empty_payload(&[Finding {
            text: "Lyndon B. Johnson signed the act.".into(),
            source: "u".into()
        }]));
    }
}
