use std::sync::Arc;

use crate::capability::{FirecrawlClient, LlmClient, OpenAiClient, WebExtract, WebScrape, WebSearch};
use crate::core::config::{load_config, FactfinderConfig};
use crate::core::types::SearchHit;

#[derive(Clone)]
pub struct AppState {
    pub http_client: reqwest::Client,
    pub web_search: Arc<dyn WebSearch>,
    pub web_extract: Arc<dyn WebExtract>,
    pub web_scrape: Arc<dyn WebScrape>,
    pub llm: Arc<dyn LlmClient>,
    // Cache for repeated search queries within a run (and across runs)
    pub search_cache: moka::future::Cache<String, Vec<SearchHit>>, // key: query
    /// File-based config loaded from `factfinder.json` (env-var fallback for all fields).
    pub config: Arc<FactfinderConfig>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("search_cache_entries", &self.search_cache.entry_count())
            .finish()
    }
}

impl AppState {
    pub fn new(http_client: reqwest::Client) -> Self {
        let config = Arc::new(load_config());
        let web = Arc::new(FirecrawlClient::new(http_client.clone()));
        let llm = Arc::new(OpenAiClient::new(http_client.clone(), &config.research));
        Self {
            http_client,
            web_search: web.clone(),
            web_extract: web.clone(),
            web_scrape: web,
            llm,
            search_cache: moka::future::Cache::builder()
                .max_capacity(10_000)
                .time_to_live(std::time::Duration::from_secs(60 * 10))
                .build(),
            config,
        }
    }

    pub fn with_web_search(mut self, web_search: Arc<dyn WebSearch>) -> Self {
        self.web_search = web_search;
        self
    }

    pub fn with_web_extract(mut self, web_extract: Arc<dyn WebExtract>) -> Self {
        self.web_extract = web_extract;
        self
    }

    pub fn with_web_scrape(mut self, web_scrape: Arc<dyn WebScrape>) -> Self {
        self.web_scrape = web_scrape;
        self
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = llm;
        self
    }
}
