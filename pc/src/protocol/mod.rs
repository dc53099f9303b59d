//! Wire protocol shared by the client and the planning service
//!
//! Goals, feedback and control messages travel as newline-delimited JSON.

pub mod messages;
pub mod types;

pub use messages::{ClientMessage, ServiceMessage};
pub use types::{
    ActionInstance, FeedbackNotification, GoalResult, Parameter, Plan, PlanGenerationResult, PlanRequest,
    PlanStatus, RequestMode, ResolutionMode,
};

/// Maximum frame size; a frame carries a whole plan so this is generous
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;
