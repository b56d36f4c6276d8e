use serde::Serialize;
use tokio::sync::mpsc;

/// Research phase an activity event reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Search,
    Extract,
    Analyze,
    Reasoning,
    Synthesis,
    Thought,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Pending,
    Complete,
    Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub status: ActivityStatus,
    pub message: String,
    pub timestamp: String,
    pub depth: u8,
    pub completed_steps: u32,
    pub total_steps: u32,
}

/// Tagged union pushed over the interactive stream, serialized as
/// `{"type": "<kind>", "content": {…}}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "content", rename_all = "kebab-case")]
pub enum ProgressEvent {
    #[serde(rename_all = "camelCase")]
    ProgressInit { max_depth: u8, total_steps: u32 },
    #[serde(rename_all = "camelCase")]
    DepthDelta {
        current: u8,
        max: u8,
        completed_steps: u32,
        total_steps: u32,
    },
    ActivityDelta(Activity),
    SourceDelta {
        url: String,
        title: String,
        description: String,
    },
    Finish { content: String },
}

/// Write-only progress sink. Eval mode runs with a disabled sink; the
/// interactive handler bridges the channel to its SSE response. Send
/// failures are ignored — a disconnected client must not stop the run.
#[derive(Clone)]
pub struct ProgressStream {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressStream {
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn activity(
        &self,
        kind: ActivityKind,
        status: ActivityStatus,
        message: impl Into<String>,
        depth: u8,
        completed_steps: u32,
        total_steps: u32,
    ) {
        self.emit(ProgressEvent::ActivityDelta(Activity {
            kind,
            status,
            message: message.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            depth,
            completed_steps,
            total_steps,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_shape() {
        let event = ProgressEvent::ActivityDelta(Activity {
            kind: ActivityKind::Search,
            status: ActivityStatus::Pending,
            message: "Searching".to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            depth: 1,
            completed_steps: 0,
            total_steps: 30,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "activity-delta");
        assert_eq!(json["content"]["type"], "search");
        assert_eq!(json["content"]["status"], "pending");
        assert_eq!(json["content"]["completedSteps"], 0);

        let init = ProgressEvent::ProgressInit {
            max_depth: 7,
            total_steps: 35,
        };
        let json = serde_json::to_value(&init).unwrap();
        assert_eq!(json["type"], "progress-init");
        assert_eq!(json["content"]["maxDepth"], 7);
    }
}
