//! Planning service side of the action protocol
//!
//! The real planner lives elsewhere; this module provides the socket
//! plumbing and a scripted stand-in that replays feedback.

pub mod listener;
pub mod scripted;

pub use listener::{cleanup_socket, create_listener_at};
pub use scripted::{PlanScript, ScriptedService};
