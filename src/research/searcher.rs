use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::types::SearchHit;
use crate::research::retry::RetryPolicy;
use crate::research::ResearchError;
use crate::AppState;

/// Search wrapper with linear backoff. An empty hit list on a successful
/// call is a success, not a retryable failure.
pub struct Searcher {
    policy: RetryPolicy,
}

impl Default for Searcher {
    fn default() -> Self {
        Self {
            policy: RetryPolicy::linear(3, 2000),
        }
    }
}

impl Searcher {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub async fn search(
        &self,
        state: &Arc<AppState>,
        query: &str,
    ) -> Result<Vec<SearchHit>, ResearchError> {
        if let Some(hits) = state.search_cache.get(query).await {
            debug!("search cache hit for '{}'", query);
            return Ok(hits);
        }

        let attempts = self.policy.max_retries + 1;
        let mut last_error = String::new();
        for attempt in 0..attempts {
            if attempt > 0 {
                tokio::time::sleep(self.policy.delay(attempt - 1)).await;
            }
            match state.web_search.search(query).await {
                Ok(hits) => {
                    state
                        .search_cache
                        .insert(query.to_string(), hits.clone())
                        .await;
                    return Ok(hits);
                }
                Err(e) => {
                    warn!(
                        "search attempt {}/{} failed for '{}': {}",
                        attempt + 1,
                        attempts,
                        query,
                        e
                    );
                    last_error = e.to_string();
                }
            }
        }
        Err(ResearchError::SearchExhausted {
            attempts,
            last_error,
        })
    }
}
