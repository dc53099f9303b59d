//! Plan rendering
//!
//! Turns a plan result into the text printed for the user:
//!
//! ```text
//! Received plan:
//!   0. pick(a)
//!   1. place(a,table)
//! ```

use std::fmt::Write;

use crate::error::PlanClientError;
use crate::protocol::{ActionInstance, PlanGenerationResult};

/// Header line preceding every rendered plan
pub const PLAN_HEADER: &str = "Received plan:";

/// Render a whole plan, failing without partial output on a malformed parameter
pub fn render_plan(result: &PlanGenerationResult) -> Result<String, PlanClientError> {
    let mut out = String::new();
    out.push_str(PLAN_HEADER);
    out.push('\n');

    for (idx, action) in result.plan.actions.iter().enumerate() {
        let line = render_action(idx, action)?;
        // Writing to a String cannot fail
        let _ = writeln!(out, "  {}. {}", idx, line);
    }

    Ok(out)
}

/// Render one action as `name(p1,p2,...)`
pub fn render_action(action_index: usize, action: &ActionInstance) -> Result<String, PlanClientError> {
    let params = action
        .parameters
        .iter()
        .enumerate()
        .map(|(parameter_index, param)| {
            param
                .symbol()
                .ok_or_else(|| PlanClientError::MalformedNotification {
                    action_index,
                    parameter_index,
                    reason: format!("parameter of '{}' has no symbol_atom token", action.action_name),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(format!("{}({})", action.action_name, params.join(",")))
}
