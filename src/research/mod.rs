pub mod analyzer;
pub mod constraints;
pub mod extractor;
pub mod formatter;
pub mod planner;
pub mod progress;
pub mod prompts;
pub mod ranker;
pub mod retry;
pub mod searcher;
pub mod stop;
pub mod synthesis;

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::config::FactfinderConfig;
use crate::core::types::{Finding, ResearchMode};
use crate::research::extractor::Extractor;
use crate::research::progress::{ActivityKind, ActivityStatus, ProgressEvent, ProgressStream};
use crate::research::ranker::UrlFrequencyRanker;
use crate::research::searcher::Searcher;
use crate::AppState;

const INTER_SEARCH_PAUSE: Duration = Duration::from_secs(1);
const INTER_HOP_PAUSE: Duration = Duration::from_secs(2);
const STEPS_PER_HOP: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    #[error("search exhausted after {attempts} attempts: {last_error}")]
    SearchExhausted { attempts: u32, last_error: String },
    #[error("llm call failed: {0}")]
    LlmCall(String),
}

/// Per-run knobs resolved from config plus the request's model overrides.
#[derive(Debug, Clone)]
pub struct ResearchOptions {
    pub mode: ResearchMode,
    pub max_depth: u8,
    pub time_limit: Duration,
    pub max_failed_attempts: u32,
    pub searches_per_hop: usize,
    pub urls_per_hop: usize,
    pub synthesis_max_tokens: u32,
    /// Long-form model (interactive report).
    pub model: String,
    /// Reasoning model (planning, analysis, synthesis).
    pub reasoning_model: String,
}

impl ResearchOptions {
    pub fn eval(config: &FactfinderConfig) -> Self {
        let research = &config.research;
        Self {
            mode: ResearchMode::Eval,
            max_depth: research.resolve_max_depth(),
            time_limit: research.resolve_time_limit(),
            max_failed_attempts: research.resolve_max_failed_attempts(),
            searches_per_hop: research.resolve_searches_per_hop(),
            urls_per_hop: research.resolve_urls_per_hop(),
            synthesis_max_tokens: research.resolve_synthesis_max_tokens(),
            model: research.resolve_model(),
            reasoning_model: research.resolve_model(),
        }
    }

    pub fn interactive(config: &FactfinderConfig) -> Self {
        Self {
            mode: ResearchMode::Interactive,
            max_depth: config.research.resolve_interactive_max_depth(),
            searches_per_hop: 1,
            ..Self::eval(config)
        }
    }
}

/// All mutable state of one research run. Owned by the orchestrator task,
/// never shared, discarded when the run returns.
#[derive(Debug)]
pub struct ResearchState {
    pub findings: Vec<Finding>,
    pub summaries: Vec<String>,
    pub next_search_topic: Option<String>,
    pub url_to_search: Option<String>,
    pub current_depth: u8,
    pub failed_attempts: u32,
    pub max_failed_attempts: u32,
    pub processed_urls: HashSet<String>,
    pub subquestions: VecDeque<String>,
    pub answered_subquestions: HashSet<String>,
    pub sub_answers: Vec<(String, String)>,
    pub completed_steps: u32,
    pub total_expected_steps: u32,
    pub ranker: UrlFrequencyRanker,
}

impl ResearchState {
    pub fn new(max_failed_attempts: u32, total_expected_steps: u32) -> Self {
        Self {
            findings: Vec::new(),
            summaries: Vec::new(),
            next_search_topic: None,
            url_to_search: None,
            current_depth: 0,
            failed_attempts: 0,
            max_failed_attempts,
            processed_urls: HashSet::new(),
            subquestions: VecDeque::new(),
            answered_subquestions: HashSet::new(),
            sub_answers: Vec::new(),
            completed_steps: 0,
            total_expected_steps,
            ranker: UrlFrequencyRanker::new(),
        }
    }

    /// Enqueue subquestions not already pending or answered.
    pub fn enqueue_subquestions(&mut self, items: Vec<String>) {
        for question in items {
            if !self.answered_subquestions.contains(&question)
                && !self.subquestions.contains(&question)
            {
                self.subquestions.push_back(question);
            }
        }
    }
}

/// Drive the bounded research loop to a final answer. Never fails: every
/// component degrades to a defined fallback, so the synthesis step is
/// always reached and the returned string is always usable.
pub async fn run_research(
    state: &Arc<AppState>,
    question: &str,
    opts: &ResearchOptions,
    progress: &ProgressStream,
) -> String {
    let run_id = Uuid::new_v4();
    let started = Instant::now();
    let mut research = ResearchState::new(
        opts.max_failed_attempts,
        opts.max_depth as u32 * STEPS_PER_HOP,
    );
    info!(
        "research {} start: mode={:?} max_depth={} time_limit={:?}",
        run_id, opts.mode, opts.max_depth, opts.time_limit
    );

    progress.emit(ProgressEvent::ProgressInit {
        max_depth: opts.max_depth,
        total_steps: research.total_expected_steps,
    });

    let searcher = Searcher::default();
    let extractor = Extractor::default();
    let mut key_constraints: Vec<String> = Vec::new();

    while research.current_depth < opts.max_depth {
        if started.elapsed() >= opts.time_limit {
            info!("research {}: time limit reached before hop", run_id);
            break;
        }
        research.current_depth += 1;
        let depth = research.current_depth;
        progress.emit(ProgressEvent::DepthDelta {
            current: depth,
            max: opts.max_depth,
            completed_steps: research.completed_steps,
            total_steps: research.total_expected_steps,
        });

        if opts.mode == ResearchMode::Eval && depth == 1 {
            key_constraints =
                constraints::extract_constraints(state, &opts.reasoning_model, question).await;
            debug!("research {}: constraints {:?}", run_id, key_constraints);
        }

        // ── Topic selection ───────────────────────────────────────────────
        progress.activity(
            ActivityKind::Reasoning,
            ActivityStatus::Pending,
            format!("Planning research direction for hop {}", depth),
            depth,
            research.completed_steps,
            research.total_expected_steps,
        );
        let topic = planner::next_topic(state, &opts.reasoning_model, question, &mut research).await;
        research.completed_steps += 1;
        progress.activity(
            ActivityKind::Reasoning,
            ActivityStatus::Complete,
            format!("Researching: {}", topic),
            depth,
            research.completed_steps,
            research.total_expected_steps,
        );
        info!(
            "research {} hop {}/{}: topic '{}'",
            run_id, depth, opts.max_depth, topic
        );

        // ── Search phase ──────────────────────────────────────────────────
        progress.activity(
            ActivityKind::Search,
            ActivityStatus::Pending,
            format!("Searching for \"{}\"", topic),
            depth,
            research.completed_steps,
            research.total_expected_steps,
        );
        let queries = match opts.mode {
            ResearchMode::Eval => query_variants(&topic, &key_constraints, opts.searches_per_hop),
            ResearchMode::Interactive => vec![topic.clone()],
        };
        let mut search_ok = false;
        for (i, query) in queries.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(INTER_SEARCH_PAUSE).await;
            }
            match searcher.search(state, query).await {
                Ok(hits) => {
                    search_ok = true;
                    for hit in &hits {
                        progress.emit(ProgressEvent::SourceDelta {
                            url: hit.url.clone(),
                            title: hit.title.clone(),
                            description: hit.description.clone(),
                        });
                    }
                    research.ranker.record_response(&hits);
                }
                Err(e) => {
                    warn!("research {} hop {}: {}", run_id, depth, e);
                    // Remaining variants share the same fate; one failed
                    // attempt per hop.
                    break;
                }
            }
        }
        if search_ok {
            research.completed_steps += 1;
            progress.activity(
                ActivityKind::Search,
                ActivityStatus::Complete,
                format!("Tracking {} candidate sources", research.ranker.len()),
                depth,
                research.completed_steps,
                research.total_expected_steps,
            );
        } else {
            // Nothing to extract or analyze this hop; the failure bound is
            // the only thing that can end the run here.
            research.failed_attempts += 1;
            progress.activity(
                ActivityKind::Search,
                ActivityStatus::Error,
                "Search failed after retries",
                depth,
                research.completed_steps,
                research.total_expected_steps,
            );
            if research.failed_attempts >= research.max_failed_attempts {
                info!(
                    "research {} aborting after hop {}: {} failed attempts",
                    run_id, depth, research.failed_attempts
                );
                break;
            }
            if research.current_depth < opts.max_depth {
                tokio::time::sleep(INTER_HOP_PAUSE).await;
            }
            continue;
        }

        // ── URL selection ─────────────────────────────────────────────────
        let mut urls = research
            .ranker
            .select_top_unseen(opts.urls_per_hop, &research.processed_urls);
        if opts.mode == ResearchMode::Interactive {
            if let Some(suggested) = research.url_to_search.take() {
                if !research.processed_urls.contains(&suggested) && !urls.contains(&suggested) {
                    urls.push(suggested);
                }
            }
        }
        for url in &urls {
            research.processed_urls.insert(url.clone());
        }

        // ── Extraction phase ──────────────────────────────────────────────
        progress.activity(
            ActivityKind::Extract,
            ActivityStatus::Pending,
            format!("Reading {} sources", urls.len()),
            depth,
            research.completed_steps,
            research.total_expected_steps,
        );
        let extraction_prompt = match opts.mode {
            ResearchMode::Eval => prompts::constraint_extraction_focus(&key_constraints),
            ResearchMode::Interactive => prompts::generic_summary(&topic),
        };
        let new_findings = match opts.mode {
            ResearchMode::Eval => {
                extractor
                    .extract_many(state, &urls, &extraction_prompt)
                    .await
            }
            ResearchMode::Interactive => {
                extractor
                    .extract_parallel(state, &urls, &extraction_prompt)
                    .await
            }
        };
        if new_findings.is_empty() {
            research.failed_attempts += 1;
            progress.activity(
                ActivityKind::Extract,
                ActivityStatus::Error,
                "No content could be extracted this hop",
                depth,
                research.completed_steps,
                research.total_expected_steps,
            );
        } else {
            research.completed_steps += 1;
            progress.activity(
                ActivityKind::Extract,
                ActivityStatus::Complete,
                format!("Extracted {} findings", new_findings.len()),
                depth,
                research.completed_steps,
                research.total_expected_steps,
            );
        }
        research.findings.extend(new_findings);

        // ── Analysis phase ────────────────────────────────────────────────
        progress.activity(
            ActivityKind::Analyze,
            ActivityStatus::Pending,
            "Analyzing the evidence",
            depth,
            research.completed_steps,
            research.total_expected_steps,
        );
        let time_remaining = opts.time_limit.saturating_sub(started.elapsed());
        let analysis = match analyzer::analyze(
            state,
            &opts.reasoning_model,
            question,
            &research,
            time_remaining,
        )
        .await
        {
            Ok(analysis) => {
                research.completed_steps += 1;
                progress.activity(
                    ActivityKind::Analyze,
                    ActivityStatus::Complete,
                    format!("{:?} confidence over {} findings", analysis.confidence, research.findings.len()),
                    depth,
                    research.completed_steps,
                    research.total_expected_steps,
                );
                analysis
            }
            Err(e) => {
                warn!("research {} hop {}: {}", run_id, depth, e);
                research.failed_attempts += 1;
                progress.activity(
                    ActivityKind::Analyze,
                    ActivityStatus::Error,
                    "Analysis failed",
                    depth,
                    research.completed_steps,
                    research.total_expected_steps,
                );
                analyzer::error_fallback(question, research.findings.len(), time_remaining)
            }
        };

        // ── Fold the analysis back into the state ─────────────────────────
        if !analysis.summary.is_empty() {
            research.summaries.push(analysis.summary.clone());
        }
        research.enqueue_subquestions(analysis.subquestions.clone());
        if let Some(sub_answer) = analysis
            .sub_answer
            .as_deref()
            .filter(|a| !a.trim().is_empty())
        {
            let answered_query = analysis.last_query.clone().unwrap_or_else(|| topic.clone());
            research
                .sub_answers
                .push((answered_query, sub_answer.to_string()));
        }
        research.next_search_topic = analysis.next_search_topic.clone();
        research.url_to_search = analysis.url_to_search.clone();

        if !analysis.summary.is_empty() {
            research.completed_steps += 1;
            progress.activity(
                ActivityKind::Thought,
                ActivityStatus::Complete,
                analysis.summary.clone(),
                depth,
                research.completed_steps,
                research.total_expected_steps,
            );
        }

        // ── Stop controller ───────────────────────────────────────────────
        if stop::should_stop(
            &analysis,
            &research,
            started.elapsed(),
            opts.time_limit,
            opts.max_depth,
        ) {
            info!(
                "research {} stopping after hop {}: {} findings, {} failed attempts",
                run_id,
                depth,
                research.findings.len(),
                research.failed_attempts
            );
            break;
        }
        if research.current_depth < opts.max_depth {
            tokio::time::sleep(INTER_HOP_PAUSE).await;
        }
    }

    // ── Synthesis ─────────────────────────────────────────────────────────
    progress.activity(
        ActivityKind::Synthesis,
        ActivityStatus::Pending,
        "Composing the final answer",
        research.current_depth,
        research.completed_steps,
        research.total_expected_steps,
    );
    let answer = match opts.mode {
        ResearchMode::Eval => {
            synthesis::synthesize_answer(state, question, &research, opts).await
        }
        ResearchMode::Interactive => {
            match synthesis::compose_report(state, question, &research, opts).await {
                Ok(report) => report,
                Err(e) => {
                    warn!("research {}: {}", run_id, e);
                    progress.activity(
                        ActivityKind::Thought,
                        ActivityStatus::Error,
                        format!("Report generation failed: {}", e),
                        research.current_depth,
                        research.completed_steps,
                        research.total_expected_steps,
                    );
                    formatter::hard_fallback(question)
                }
            }
        }
    };
    // Synthesis is outside the per-hop step budget; its completion is
    // carried by the activity status alone.
    progress.activity(
        ActivityKind::Synthesis,
        ActivityStatus::Complete,
        "Research complete",
        research.current_depth,
        research.completed_steps,
        research.total_expected_steps,
    );
    progress.emit(ProgressEvent::Finish {
        content: answer.clone(),
    });
    info!(
        "research {} done in {:?}: {} findings over {} hops",
        run_id,
        started.elapsed(),
        research.findings.len(),
        research.current_depth
    );
    answer
}

/// Eval-mode search variants: the topic itself plus constraint refinements
/// the topic does not already carry.
fn query_variants(topic: &str, constraints: &[String], max: usize) -> Vec<String> {
    let mut variants = vec![topic.to_string()];
    let topic_lower = topic.to_lowercase();
    for constraint in constraints {
        if variants.len() >= max.max(1) {
            break;
        }
        if topic_lower.contains(&constraint.to_lowercase()) {
            continue;
        }
        variants.push(format!("{} {}", topic, constraint));
    }
    variants
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_variants_skip_redundant_constraints() {
        let variants = query_variants(
            "civil rights act 1964 signer",
            &[
                "Civil Rights Act".to_string(),
                "1964".to_string(),
                "president".to_string(),
            ],
            5,
        );
        assert_eq!(
            variants,
            vec![
                "civil rights act 1964 signer",
                "civil rights act 1964 signer president"
            ]
        );
    }

    #[test]
    fn test_query_variants_cap() {
        let constraints: Vec<String> = (0..10).map(|i| format!("constraint-{}", i)).collect();
        let variants = query_variants("some topic here", &constraints, 5);
        assert_eq!(variants.len(), 5);
    }

    #[test]
    fn test_enqueue_filters_pending_and_answered() {
        let mut rs = ResearchState::new(3, 30);
        rs.answered_subquestions.insert("already answered".to_string());
        rs.subquestions.push_back("already pending".to_string());
        rs.enqueue_subquestions(vec![
            "already answered".to_string(),
            "already pending".to_string(),
            "genuinely new".to_string(),
        ]);
        assert_eq!(
            rs.subquestions,
            VecDeque::from(vec![
                "already pending".to_string(),
                "genuinely new".to_string()
            ])
        );
    }
}
