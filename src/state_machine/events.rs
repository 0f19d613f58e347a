use serde::{Deserialize, Serialize};

/// Events that drive run state transitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RunTransition {
    /// Begin loading the catalog and planning batches
    Plan,
    /// Planning finished; start submitting
    Start { total_tiles: usize },
    /// All batches processed
    Complete,
    /// Run-fatal error or cancellation
    Abort(String),
}

impl RunTransition {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Start { .. } => "start",
            Self::Complete => "complete",
            Self::Abort(_) => "abort",
        }
    }

    /// Extract the abort reason if this is an abort event
    pub fn abort_reason(&self) -> Option<&str> {
        match self {
            Self::Abort(reason) => Some(reason),
            _ => None,
        }
    }
}
