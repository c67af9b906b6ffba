use crate::error::WorkflowError;
use leadflow_model::{Prospect, Stage, User};

/// Validates a stage transition.
///
/// Stages only move forward, except `SalesOutcome -> Appointment`, which is
/// the undo of a recorded outcome.
pub fn validate_transition(from: Stage, to: Stage) -> Result<(), WorkflowError> {
    if allowed(from, to) {
        Ok(())
    } else {
        tracing::warn!(%from, %to, "rejected stage transition");
        Err(WorkflowError::IllegalTransition { from, to })
    }
}

/// Stages reachable from `from` in one step
pub fn allowed_transitions(from: Stage) -> Vec<Stage> {
    use Stage::*;
    match from {
        Prospect => vec![Appointment],
        Appointment => vec![SalesOutcome],
        SalesOutcome => vec![Appointment],
    }
}

fn allowed(from: Stage, to: Stage) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}

/// Stage a saved record must carry: outcome present means `SalesOutcome`,
/// anything else that has been saved is `Appointment`.
#[must_use]
pub fn derived_stage(has_outcome: bool) -> Stage {
    if has_outcome {
        Stage::SalesOutcome
    } else {
        Stage::Appointment
    }
}

/// Owner or admin
#[must_use]
pub fn can_edit(actor: &User, prospect: &Prospect) -> bool {
    actor.role.is_admin() || prospect.uid == actor.id
}

/// Guard for irreversible deletes
///
/// # Errors
/// `WorkflowError::PermissionDenied` unless the actor is the owner or an admin
pub fn authorize_delete(actor: &User, prospect: &Prospect) -> Result<(), WorkflowError> {
    if can_edit(actor, prospect) {
        Ok(())
    } else {
        Err(WorkflowError::PermissionDenied)
    }
}
