//! Audit event model.

use crate::model::document::{DocumentId, WorkflowState};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Action label for document creation events.
pub const ACTION_CREATED: &str = "Created";
/// Action label for document removal events.
pub const ACTION_DELETED: &str = "Deleted";

/// Immutable record of one completed workflow step.
///
/// Events reference documents by id only and outlive document deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub id: String,
    pub document_id: DocumentId,
    pub action: String,
    pub actor: String,
    /// Epoch milliseconds.
    pub at: i64,
    pub details: String,
}

impl AuditEvent {
    pub fn new(
        document_id: DocumentId,
        action: impl Into<String>,
        actor: impl Into<String>,
        at: i64,
        details: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            document_id,
            action: action.into(),
            actor: actor.into(),
            at,
            details: details.into(),
        }
    }

    /// Builds the event recorded for a successful transition.
    pub fn transition(
        document_id: DocumentId,
        from: WorkflowState,
        to: WorkflowState,
        actor: impl Into<String>,
        at: i64,
    ) -> Self {
        Self::new(
            document_id,
            transition_action(to),
            actor,
            at,
            format!("{from} to {to}"),
        )
    }
}

/// Returns the action label for a transition into `target`.
pub fn transition_action(target: WorkflowState) -> String {
    format!("Workflow → {target}")
}
