use std::time::Duration;

use crate::core::types::{AnalysisRecord, Confidence};
use crate::research::ResearchState;

/// Evidence/confidence/time/failure thresholds deciding whether the loop
/// ends after this hop.
pub fn should_stop(
    analysis: &AnalysisRecord,
    research: &ResearchState,
    elapsed: Duration,
    time_limit: Duration,
    max_depth: u8,
) -> bool {
    let findings = research.findings.len();
    if analysis.has_answer && analysis.confidence == Confidence::High && findings >= 3 {
        return true;
    }
    if analysis.has_answer && analysis.confidence == Confidence::Medium && findings >= 6 {
        return true;
    }
    if findings >= 8 {
        return true;
    }
    if !analysis.should_continue {
        return true;
    }
    if research.current_depth >= max_depth {
        return true;
    }
    if elapsed >= time_limit {
        return true;
    }
    research.failed_attempts >= research.max_failed_attempts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Finding;
    use crate::research::ResearchState;

    fn state_with(findings: usize, depth: u8, failed: u32) -> ResearchState {
        let mut rs = ResearchState::new(3, 30);
        rs.current_depth = depth;
        rs.failed_attempts = failed;
        for i in 0..findings {
            rs.findings.push(Finding {
                text: format!("finding {}", i),
                source: format!("https://example.org/{}", i),
            });
        }
        rs
    }

    fn continuing() -> AnalysisRecord {
        AnalysisRecord {
            should_continue: true,
            ..Default::default()
        }
    }

    const LIMIT: Duration = Duration::from_secs(210);
    const EARLY: Duration = Duration::from_secs(10);

    #[test]
    fn test_high_confidence_needs_three_findings() {
        let analysis = AnalysisRecord {
            has_answer: true,
            confidence: Confidence::High,
            ..continuing()
        };
        assert!(!should_stop(&analysis, &state_with(2, 1, 0), EARLY, LIMIT, 6));
        assert!(should_stop(&analysis, &state_with(3, 1, 0), EARLY, LIMIT, 6));
    }

    #[test]
    fn test_medium_confidence_needs_six_findings() {
        let analysis = AnalysisRecord {
            has_answer: true,
            confidence: Confidence::Medium,
            ..continuing()
        };
        assert!(!should_stop(&analysis, &state_with(5, 1, 0), EARLY, LIMIT, 6));
        assert!(should_stop(&analysis, &state_with(6, 1, 0), EARLY, LIMIT, 6));
    }

    #[test]
    fn test_eight_findings_stop_unconditionally() {
        assert!(should_stop(&continuing(), &state_with(8, 1, 0), EARLY, LIMIT, 6));
    }

    #[test]
    fn test_should_continue_false_stops() {
        let analysis = AnalysisRecord {
            should_continue: false,
            ..Default::default()
        };
        assert!(should_stop(&analysis, &state_with(0, 1, 0), EARLY, LIMIT, 6));
    }

    #[test]
    fn test_depth_time_and_failure_bounds() {
        assert!(should_stop(&continuing(), &state_with(0, 6, 0), EARLY, LIMIT, 6));
        assert!(should_stop(&continuing(), &state_with(0, 1, 0), LIMIT, LIMIT, 6));
        assert!(should_stop(&continuing(), &state_with(0, 1, 3), EARLY, LIMIT, 6));
        assert!(!should_stop(&continuing(), &state_with(1, 1, 2), EARLY, LIMIT, 6));
    }
}
