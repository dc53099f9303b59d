//! planclient - one-shot task planning client
//!
//! Submits a planning goal (a domain and a problem description) to a remote
//! planning service over an asynchronous action channel, then interprets the
//! service's feedback stream. Anytime planners report plans as feedback
//! rather than as a final result, so every `SOLVED_SATISFICING` notification
//! is rendered as it arrives.
//!
//! # Modules
//!
//! - [`protocol`] - Goal, feedback and control message types
//! - [`channel`] - Action channel trait and Unix socket transport
//! - [`client`] - Goal submission and feedback dispatch
//! - [`session`] - Goal lifecycle state machine
//! - [`render`] - Plan text rendering
//! - [`service`] - Scripted planning service for local runs and tests
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod channel;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod paths;
pub mod protocol;
pub mod render;
pub mod service;
pub mod session;

// Re-export commonly used types
pub use channel::{ActionChannel, GoalStream, UnixActionChannel};
pub use client::{FeedbackHandler, GoalHandle, PlanPrinter, PlanningRequestClient};
pub use config::Config;
pub use error::PlanClientError;
pub use protocol::{
    ActionInstance, FeedbackNotification, Parameter, PlanGenerationResult, PlanRequest, PlanStatus, RequestMode,
    ResolutionMode,
};
pub use render::render_plan;
pub use session::{CompletionPolicy, GoalState};
