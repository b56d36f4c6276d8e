use std::time::Duration;

// ---------------------------------------------------------------------------
// FactfinderConfig — file-based config loader (factfinder.json) with env-var
// fallback for every field
// ---------------------------------------------------------------------------

/// Research-loop sub-config (mirrors the `research` key in factfinder.json).
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct ResearchLoopConfig {
    /// Maximum research hops in eval mode. Default: 6.
    pub max_depth: Option<u8>,
    /// Maximum research hops in interactive mode. Default: 7.
    pub interactive_max_depth: Option<u8>,
    /// Whole-loop wall limit in milliseconds. Default: 210 000 (3.5 min).
    /// Clamped by the `MAX_DURATION` outer limit.
    pub time_limit_ms: Option<u64>,
    /// Failure-continues tolerated before the loop aborts. Default: 3.
    pub max_failed_attempts: Option<u32>,
    /// Search query variants issued per hop in eval mode. Default: 5.
    pub searches_per_hop: Option<usize>,
    /// URLs handed to the extractor per hop. Default: 3.
    pub urls_per_hop: Option<usize>,
    /// Max tokens the LLM may generate in the synthesis response. Default: 800.
    pub synthesis_max_tokens: Option<u32>,
    /// LLM endpoint — e.g. `https://api.openai.com/v1` or a local
    /// OpenAI-compatible server.
    pub llm_base_url: Option<String>,
    /// API key. Never logged. Leave blank for key-less local endpoints.
    pub llm_api_key: Option<String>,
    /// Default model when the request carries no `modelId`.
    pub llm_model: Option<String>,
}

impl ResearchLoopConfig {
    pub fn resolve_max_depth(&self) -> u8 {
        if let Some(n) = self.max_depth {
            return n;
        }
        std::env::var("FACTFINDER_MAX_DEPTH")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(6)
    }

    pub fn resolve_interactive_max_depth(&self) -> u8 {
        if let Some(n) = self.interactive_max_depth {
            return n;
        }
        std::env::var("FACTFINDER_INTERACTIVE_MAX_DEPTH")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(7)
    }

    /// Loop wall limit: JSON field → `FACTFINDER_TIME_LIMIT_MS` env →
    /// 210 000 ms, then clamped to the `MAX_DURATION` outer limit (seconds,
    /// default 300).
    pub fn resolve_time_limit(&self) -> Duration {
        let ms = self
            .time_limit_ms
            .or_else(|| {
                std::env::var("FACTFINDER_TIME_LIMIT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
            })
            .unwrap_or(210_000);
        let outer_ms = std::env::var(ENV_MAX_DURATION)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(300)
            .saturating_mul(1000);
        Duration::from_millis(ms.min(outer_ms))
    }

    pub fn resolve_max_failed_attempts(&self) -> u32 {
        if let Some(n) = self.max_failed_attempts {
            return n;
        }
        std::env::var("FACTFINDER_MAX_FAILED_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3)
    }

    pub fn resolve_searches_per_hop(&self) -> usize {
        if let Some(n) = self.searches_per_hop {
            return n;
        }
        std::env::var("FACTFINDER_SEARCHES_PER_HOP")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5)
    }

    pub fn resolve_urls_per_hop(&self) -> usize {
        if let Some(n) = self.urls_per_hop {
            return n;
        }
        std::env::var("FACTFINDER_URLS_PER_HOP")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3)
    }

    pub fn resolve_synthesis_max_tokens(&self) -> u32 {
        if let Some(n) = self.synthesis_max_tokens {
            return n;
        }
        std::env::var("FACTFINDER_SYNTHESIS_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(800)
    }

    /// API key: JSON field → `OPENAI_API_KEY` env var → `None`.
    ///
    /// When `llm_api_key` is explicitly set to `""` in the config file,
    /// returns `Some("")` — "no key required" (local endpoint).
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(k) = &self.llm_api_key {
            return Some(k.trim().to_string());
        }
        std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty())
    }

    /// LLM base URL: JSON field → `OPENAI_BASE_URL` env var →
    /// `https://api.openai.com/v1`.
    pub fn resolve_base_url(&self) -> String {
        if let Some(u) = &self.llm_base_url {
            if !u.trim().is_empty() {
                return u.clone();
            }
        }
        std::env::var("OPENAI_BASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
    }

    /// Model name: JSON field → `FACTFINDER_LLM_MODEL` env var → `gpt-4o-mini`.
    pub fn resolve_model(&self) -> String {
        if let Some(m) = &self.llm_model {
            if !m.trim().is_empty() {
                return m.clone();
            }
        }
        std::env::var("FACTFINDER_LLM_MODEL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "gpt-4o-mini".to_string())
    }
}

/// Top-level config loaded from `factfinder.json`.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct FactfinderConfig {
    #[serde(default)]
    pub research: ResearchLoopConfig,
}

/// Load `factfinder.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `FACTFINDER_CONFIG` env var path
/// 2. `./factfinder.json`
/// 3. `../factfinder.json`
///
/// Missing file → `FactfinderConfig::default()` (silent, all env-var
/// fallbacks apply). Parse error → log a warning, return defaults.
pub fn load_config() -> FactfinderConfig {
    let candidates: Vec<std::path::PathBuf> = {
        let mut v = vec![
            std::path::PathBuf::from("factfinder.json"),
            std::path::PathBuf::from("../factfinder.json"),
        ];
        if let Ok(env_path) = std::env::var("FACTFINDER_CONFIG") {
            v.insert(0, std::path::PathBuf::from(env_path));
        }
        v
    };

    for path in &candidates {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<FactfinderConfig>(&contents) {
                Ok(cfg) => {
                    tracing::info!("factfinder.json loaded from {}", path.display());
                    return cfg;
                }
                Err(e) => {
                    tracing::warn!(
                        "factfinder.json parse error at {}: {} — using defaults",
                        path.display(),
                        e
                    );
                    return FactfinderConfig::default();
                }
            },
            Err(_) => continue,
        }
    }

    FactfinderConfig::default()
}

// ---------------------------------------------------------------------------

pub const ENV_FIRECRAWL_API_KEY: &str = "FIRECRAWL_API_KEY";
pub const ENV_FIRECRAWL_BASE_URL: &str = "FIRECRAWL_BASE_URL";
pub const ENV_MAX_DURATION: &str = "MAX_DURATION";
