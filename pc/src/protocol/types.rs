//! Planning request and plan result types
//!
//! These mirror the goal and feedback payloads exchanged with the planning
//! service. Field names are the wire names.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the domain and problem fields of a request are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestMode {
    /// Domain and problem carry description text
    Inline,
    /// Domain and problem carry filesystem paths
    File,
}

/// Whether the planner should stop at the first feasible plan or keep optimizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionMode {
    #[default]
    Satisfiable,
    Optimal,
}

impl std::fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Satisfiable => write!(f, "SATISFIABLE"),
            Self::Optimal => write!(f, "OPTIMAL"),
        }
    }
}

/// A one-shot planning goal
///
/// Fields are private so a request cannot change once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRequest {
    mode: RequestMode,
    resolution_mode: ResolutionMode,
    domain: String,
    problem: String,
}

impl PlanRequest {
    /// Build a FILE request; the paths are carried verbatim and never opened here
    pub fn from_files(domain: impl AsRef<Path>, problem: impl AsRef<Path>) -> Self {
        Self {
            mode: RequestMode::File,
            resolution_mode: ResolutionMode::Satisfiable,
            domain: domain.as_ref().to_string_lossy().into_owned(),
            problem: problem.as_ref().to_string_lossy().into_owned(),
        }
    }

    /// Build an INLINE request from description text
    pub fn inline(domain: impl Into<String>, problem: impl Into<String>) -> Self {
        Self {
            mode: RequestMode::Inline,
            resolution_mode: ResolutionMode::Satisfiable,
            domain: domain.into(),
            problem: problem.into(),
        }
    }

    /// Same request with a different resolution mode
    pub fn with_resolution_mode(mut self, resolution_mode: ResolutionMode) -> Self {
        self.resolution_mode = resolution_mode;
        self
    }

    pub fn mode(&self) -> RequestMode {
        self.mode
    }

    pub fn resolution_mode(&self) -> ResolutionMode {
        self.resolution_mode
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn problem(&self) -> &str {
        &self.problem
    }
}

/// Outcome status reported by the planner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    SolvedSatisficing,
    SolvedOptimally,
    UnsolvableProven,
    UnsolvableIncompletely,
    Timeout,
    Memout,
    InternalError,
    UnsupportedProblem,
    Intermediate,
    /// Any status this client does not recognize
    #[serde(other)]
    Unknown,
}

impl PlanStatus {
    /// The status carrying a plan this client acts on
    pub fn is_satisficing(&self) -> bool {
        matches!(self, Self::SolvedSatisficing)
    }

    /// Statuses after which the planner produces nothing further
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::SolvedSatisficing | Self::Intermediate | Self::Unknown)
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SolvedSatisficing => write!(f, "SOLVED_SATISFICING"),
            Self::SolvedOptimally => write!(f, "SOLVED_OPTIMALLY"),
            Self::UnsolvableProven => write!(f, "UNSOLVABLE_PROVEN"),
            Self::UnsolvableIncompletely => write!(f, "UNSOLVABLE_INCOMPLETELY"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::Memout => write!(f, "MEMOUT"),
            Self::InternalError => write!(f, "INTERNAL_ERROR"),
            Self::UnsupportedProblem => write!(f, "UNSUPPORTED_PROBLEM"),
            Self::Intermediate => write!(f, "INTERMEDIATE"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// An action argument
///
/// Exactly one collection is normally populated. Only symbol atoms are read
/// by this client.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symbol_atom: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub int_atom: Vec<i64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub real_atom: Vec<f64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub boolean_atom: Vec<bool>,
}

impl Parameter {
    pub fn from_symbol(name: impl Into<String>) -> Self {
        Self {
            symbol_atom: vec![name.into()],
            ..Default::default()
        }
    }

    /// First symbol token, if any
    pub fn symbol(&self) -> Option<&str> {
        self.symbol_atom.first().map(String::as_str)
    }
}

/// A grounded action in a plan; parameter order is positional
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActionInstance {
    pub action_name: String,

    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl ActionInstance {
    /// Action whose parameters are all symbols
    pub fn with_symbols<I, S>(action_name: impl Into<String>, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            action_name: action_name.into(),
            parameters: symbols.into_iter().map(Parameter::from_symbol).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub actions: Vec<ActionInstance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanGenerationResult {
    pub status: PlanStatus,

    #[serde(default)]
    pub plan: Plan,
}

impl PlanGenerationResult {
    pub fn new(status: PlanStatus, actions: Vec<ActionInstance>) -> Self {
        Self {
            status,
            plan: Plan { actions },
        }
    }
}

/// One asynchronous feedback notification for a goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackNotification {
    pub result: PlanGenerationResult,
}

impl FeedbackNotification {
    pub fn new(result: PlanGenerationResult) -> Self {
        Self { result }
    }

    pub fn status(&self) -> PlanStatus {
        self.result.status
    }
}

/// Final result of a goal, sent once when the service is done with it
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GoalResult {
    pub success: bool,

    #[serde(default)]
    pub message: String,
}
