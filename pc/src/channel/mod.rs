//! Asynchronous action channel to the planning service
//!
//! The client talks to the planner through [`ActionChannel`]: a readiness
//! wait, then one goal whose messages arrive on a [`GoalStream`]. The
//! production transport is a Unix Domain Socket.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::PlanClientError;
use crate::protocol::{PlanRequest, ServiceMessage};

pub mod frame;
pub mod unix;

pub use unix::{UnixActionChannel, UnixGoalStream};

/// Get the default socket path of the planning service
pub fn get_socket_path() -> PathBuf {
    dirs::runtime_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("planclient")
        .join("planner.sock")
}

/// Transport that can discover the planning service and submit goals to it
#[async_trait]
pub trait ActionChannel: Send + Sync {
    /// Block until the service answers, or fail with `ChannelUnavailable`
    ///
    /// `None` waits forever.
    async fn wait_for_server(&self, timeout: Option<Duration>) -> Result<(), PlanClientError>;

    /// Send a goal and return as soon as it is written
    async fn send_goal(&self, goal_id: &str, request: &PlanRequest) -> Result<Box<dyn GoalStream>, PlanClientError>;
}

/// Messages the service sends about one goal, in arrival order
#[async_trait]
pub trait GoalStream: Send {
    /// Next message, or `None` once the service closes the stream
    async fn next_message(&mut self) -> Result<Option<ServiceMessage>, PlanClientError>;

    /// Ask the service to stop working on the goal
    async fn cancel(&mut self) -> Result<(), PlanClientError>;
}
