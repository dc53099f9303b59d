//! Goal lifecycle state machine
//!
//! Tracks one submitted goal from submission to a terminal state so the
//! client knows when the interaction is over instead of waiting forever.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::protocol::{GoalResult, PlanStatus, ServiceMessage};

/// When to stop consuming feedback for a goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompletionPolicy {
    /// Keep rendering anytime plans until the service ends the goal
    #[default]
    UntilResult,
    /// Stop and cancel the goal after the first satisficing plan
    FirstPlan,
}

/// Where a goal is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoalState {
    /// Sent, not yet acknowledged
    Submitted,
    /// Accepted, no plan yet
    AwaitingFeedback,
    /// At least one satisficing plan was received
    Solved { plans: usize },
    /// Planner finished without a satisficing plan
    Exhausted { status: PlanStatus },
    /// Goal could not be carried out
    Failed { reason: String },
}

impl GoalState {
    pub fn is_solved(&self) -> bool {
        matches!(self, Self::Solved { .. })
    }
}

impl std::fmt::Display for GoalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Submitted => write!(f, "submitted"),
            Self::AwaitingFeedback => write!(f, "awaiting feedback"),
            Self::Solved { plans } => write!(f, "solved ({} plan{})", plans, if *plans == 1 { "" } else { "s" }),
            Self::Exhausted { status } => write!(f, "no plan found ({})", status),
            Self::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// State of one goal plus the bookkeeping needed to conclude it
#[derive(Debug)]
pub struct GoalSession {
    goal_id: String,
    policy: CompletionPolicy,
    state: GoalState,
    plans: usize,
    last_status: Option<PlanStatus>,
    finished: bool,
    cancel_requested: bool,
}

impl GoalSession {
    pub fn new(goal_id: impl Into<String>, policy: CompletionPolicy) -> Self {
        Self {
            goal_id: goal_id.into(),
            policy,
            state: GoalState::Submitted,
            plans: 0,
            last_status: None,
            finished: false,
            cancel_requested: false,
        }
    }

    pub fn goal_id(&self) -> &str {
        &self.goal_id
    }

    pub fn state(&self) -> &GoalState {
        &self.state
    }

    /// Number of satisficing plans seen so far
    pub fn plans(&self) -> usize {
        self.plans
    }

    /// No further messages should be consumed
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The client stopped before the service did and should cancel the goal
    pub fn needs_cancel(&self) -> bool {
        self.cancel_requested
    }

    /// Whether a message is addressed to this goal
    pub fn accepts(&self, msg: &ServiceMessage) -> bool {
        match msg.goal_id() {
            Some(id) => id == self.goal_id,
            None => true,
        }
    }

    /// Advance the state machine with one message from the service
    pub fn apply(&mut self, msg: &ServiceMessage) {
        if self.finished {
            debug!(goal_id = %self.goal_id, kind = msg.kind(), "GoalSession::apply: already finished, ignoring");
            return;
        }

        match msg {
            ServiceMessage::GoalAccepted { .. } => {
                if self.state == GoalState::Submitted {
                    info!(goal_id = %self.goal_id, "Goal accepted");
                    self.state = GoalState::AwaitingFeedback;
                }
            }
            ServiceMessage::GoalRejected { reason, .. } => {
                warn!(goal_id = %self.goal_id, %reason, "Goal rejected");
                self.finish(GoalState::Failed {
                    reason: format!("goal rejected: {}", reason),
                });
            }
            ServiceMessage::Feedback { feedback, .. } => self.apply_status(feedback.status()),
            ServiceMessage::Result { result, .. } => self.apply_result(result),
            ServiceMessage::GoalCanceled { .. } => {
                info!(goal_id = %self.goal_id, "Goal canceled by service");
                self.conclude("goal canceled before a plan was found");
            }
            ServiceMessage::Error { message } => {
                warn!(goal_id = %self.goal_id, %message, "Service reported an error");
                self.finish(GoalState::Failed {
                    reason: message.clone(),
                });
            }
            ServiceMessage::Pong { .. } => {}
        }
    }

    /// The service closed the stream
    pub fn end_of_stream(&mut self) {
        if !self.finished {
            debug!(goal_id = %self.goal_id, "GoalSession::end_of_stream: stream closed");
            self.conclude("connection closed before a plan was found");
        }
    }

    /// Give up on the goal from the client side
    pub fn abort(&mut self, reason: impl Into<String>) {
        if !self.finished {
            self.cancel_requested = true;
            self.finish(GoalState::Failed { reason: reason.into() });
        }
    }

    fn apply_status(&mut self, status: PlanStatus) {
        if self.state == GoalState::Submitted {
            // Feedback implies the goal was accepted
            self.state = GoalState::AwaitingFeedback;
        }

        if status.is_satisficing() {
            self.plans += 1;
            self.state = GoalState::Solved { plans: self.plans };
            debug!(goal_id = %self.goal_id, plans = self.plans, "GoalSession::apply_status: satisficing plan");
            if self.policy == CompletionPolicy::FirstPlan {
                self.cancel_requested = true;
                self.finished = true;
            }
            return;
        }

        self.last_status = Some(status);
        if status.is_terminal() {
            info!(goal_id = %self.goal_id, %status, "Planner reported terminal status");
            self.conclude("planner finished without a plan");
        } else {
            debug!(goal_id = %self.goal_id, %status, "GoalSession::apply_status: non-terminal status");
        }
    }

    fn apply_result(&mut self, result: &GoalResult) {
        info!(goal_id = %self.goal_id, success = result.success, message = %result.message, "Goal result received");
        if !result.success && self.plans == 0 && self.last_status.is_none() {
            let reason = if result.message.is_empty() {
                "goal failed".to_string()
            } else {
                result.message.clone()
            };
            self.finish(GoalState::Failed { reason });
        } else {
            self.conclude("goal finished without a plan");
        }
    }

    /// Terminal state from what has been seen so far
    fn conclude(&mut self, fallback_reason: &str) {
        let state = if self.plans > 0 {
            GoalState::Solved { plans: self.plans }
        } else if let Some(status) = self.last_status {
            GoalState::Exhausted { status }
        } else {
            GoalState::Failed {
                reason: fallback_reason.to_string(),
            }
        };
        self.finish(state);
    }

    fn finish(&mut self, state: GoalState) {
        debug!(goal_id = %self.goal_id, %state, "GoalSession::finish");
        self.state = state;
        self.finished = true;
    }
}
