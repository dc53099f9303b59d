//! Action channel message types
//!
//! JSON-over-newline protocol. Each message is a single line of JSON followed by `\n`.

use serde::{Deserialize, Serialize};

use super::types::{FeedbackNotification, GoalResult, PlanRequest};

/// Messages from client to planning service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Readiness probe
    Ping,

    /// Submit a planning goal
    SendGoal { goal_id: String, goal: PlanRequest },

    /// Ask the service to stop working on a goal
    CancelGoal { goal_id: String },
}

/// Messages from planning service to client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ServiceMessage {
    /// Pong response to ping
    Pong { version: String },

    GoalAccepted { goal_id: String },

    GoalRejected { goal_id: String, reason: String },

    /// Incremental planning outcome; zero or more per goal
    Feedback {
        goal_id: String,
        feedback: FeedbackNotification,
    },

    /// Final result; nothing follows for this goal
    Result { goal_id: String, result: GoalResult },

    GoalCanceled { goal_id: String },

    /// Error response
    Error { message: String },
}

impl ServiceMessage {
    /// Goal this message refers to, if any
    pub fn goal_id(&self) -> Option<&str> {
        match self {
            Self::GoalAccepted { goal_id }
            | Self::GoalRejected { goal_id, .. }
            | Self::Feedback { goal_id, .. }
            | Self::Result { goal_id, .. }
            | Self::GoalCanceled { goal_id } => Some(goal_id),
            Self::Pong { .. } | Self::Error { .. } => None,
        }
    }

    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Pong { .. } => "Pong",
            Self::GoalAccepted { .. } => "GoalAccepted",
            Self::GoalRejected { .. } => "GoalRejected",
            Self::Feedback { .. } => "Feedback",
            Self::Result { .. } => "Result",
            Self::GoalCanceled { .. } => "GoalCanceled",
            Self::Error { .. } => "Error",
        }
    }
}
