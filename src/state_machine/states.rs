use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one export run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Constructed, nothing loaded yet
    #[default]
    Idle,
    /// Loading the catalog, building the artifact index and batch plan
    Planning,
    /// Submitting tiles batch by batch
    Running,
    /// Every batch processed; individual tiles may still have failed
    Completed,
    /// Stopped by a run-fatal error or cancellation
    Aborted,
}

impl RunState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }

    /// Check if the run is doing work
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Planning | Self::Running)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Planning => write!(f, "planning"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

impl std::str::FromStr for RunState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "planning" => Ok(Self::Planning),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "aborted" => Ok(Self::Aborted),
            _ => Err(format!("Invalid run state: {s}")),
        }
    }
}
