//! Planning client error types

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while submitting a goal or interpreting its feedback
#[derive(Debug, Error)]
pub enum PlanClientError {
    #[error("No planning service available at {} after {waited:?}", .socket.display())]
    ChannelUnavailable { socket: PathBuf, waited: Duration },

    #[error("Malformed notification: action {action_index} parameter {parameter_index}: {reason}")]
    MalformedNotification {
        action_index: usize,
        parameter_index: usize,
        reason: String,
    },

    #[error("Goal {goal_id} rejected: {reason}")]
    GoalRejected { goal_id: String, reason: String },

    #[error("Connection to planning service closed")]
    ConnectionClosed,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PlanClientError {
    /// Check if this is a service discovery failure
    pub fn is_unavailable(&self) -> bool {
        matches!(self, PlanClientError::ChannelUnavailable { .. })
    }

    /// Check if a fresh submission could reasonably succeed
    ///
    /// The client itself never retries; this is for callers that do.
    pub fn is_retryable(&self) -> bool {
        match self {
            PlanClientError::ChannelUnavailable { .. } => true,
            PlanClientError::ConnectionClosed => true,
            PlanClientError::Timeout(_) => true,
            PlanClientError::Io(_) => true,
            PlanClientError::MalformedNotification { .. } => false,
            PlanClientError::GoalRejected { .. } => false,
            PlanClientError::Protocol(_) => false,
            PlanClientError::Json(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_unavailable() {
        let err = PlanClientError::ChannelUnavailable {
            socket: PathBuf::from("/tmp/planner.sock"),
            waited: Duration::from_secs(5),
        };
        assert!(err.is_unavailable());
        assert!(!PlanClientError::ConnectionClosed.is_unavailable());
    }

    #[test]
    fn test_is_retryable() {
        assert!(PlanClientError::ConnectionClosed.is_retryable());
        assert!(PlanClientError::Timeout(Duration::from_secs(1)).is_retryable());

        // A malformed plan will be malformed again
        assert!(
            !PlanClientError::MalformedNotification {
                action_index: 0,
                parameter_index: 1,
                reason: "empty symbol_atom".to_string(),
            }
            .is_retryable()
        );

        assert!(
            !PlanClientError::GoalRejected {
                goal_id: "g".to_string(),
                reason: "busy".to_string(),
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_display_channel_unavailable() {
        let err = PlanClientError::ChannelUnavailable {
            socket: PathBuf::from("/run/planner.sock"),
            waited: Duration::from_millis(250),
        };
        assert_eq!(
            err.to_string(),
            "No planning service available at /run/planner.sock after 250ms"
        );
    }

    #[test]
    fn test_display_malformed_notification() {
        let err = PlanClientError::MalformedNotification {
            action_index: 2,
            parameter_index: 0,
            reason: "empty symbol_atom".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed notification: action 2 parameter 0: empty symbol_atom"
        );
    }
}
