//! Workflow transition engine.
//!
//! # Responsibility
//! - Run the transition protocol: resolve, validate, commit, audit, notify.
//! - Record creation and removal in the audit ledger.
//!
//! # Invariants
//! - Validation order is `NotFound`, `Conflict` (caller-supplied expected
//!   state only), `IllegalTransition`, `Unauthorized`.
//! - The commit is a compare-and-set against the state read during
//!   validation, so two concurrent transitions cannot both succeed.
//! - A write whose audit event cannot be appended is undone before the error
//!   is returned, so no state change is left without its audit event.
//! - Notification failures never fail a transition.

use crate::audit::AuditLog;
use crate::error::{AuthorizationFailure, DocflowError, DocflowResult};
use crate::model::audit::{AuditEvent, ACTION_CREATED, ACTION_DELETED};
use crate::model::document::{Document, DocumentId, NewDocument, WorkflowState};
use crate::model::identity::Identity;
use crate::model::{now_epoch_ms, stamp_after};
use crate::notify::NotificationSink;
use crate::sync::DocumentStore;
use crate::workflow::graph;
use crate::repo::RepoResult;
use log::{error, info, warn};

/// Tunable workflow rules layered on top of the role table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowPolicy {
    /// Forbid authors from reviewing, approving or rejecting their own
    /// documents.
    pub forbid_self_review: bool,
}

impl Default for WorkflowPolicy {
    fn default() -> Self {
        Self {
            forbid_self_review: true,
        }
    }
}

/// Orchestrates document state changes over a `DocumentStore`.
pub struct WorkflowEngine<S: DocumentStore> {
    store: S,
    audit: AuditLog,
    notifications: NotificationSink,
    policy: WorkflowPolicy,
}

impl<S: DocumentStore> WorkflowEngine<S> {
    pub fn new(
        store: S,
        audit: AuditLog,
        notifications: NotificationSink,
        policy: WorkflowPolicy,
    ) -> Self {
        Self {
            store,
            audit,
            notifications,
            policy,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    pub fn notifications(&self) -> &NotificationSink {
        &self.notifications
    }

    /// Checks legality and authorization of moving `document` to `target`
    /// without touching storage.
    pub fn check_transition(
        &self,
        document: &Document,
        target: WorkflowState,
        actor: &Identity,
    ) -> DocflowResult<()> {
        let from = document.workflow_state;
        if !graph::is_legal(from, target) {
            return Err(DocflowError::IllegalTransition { from, to: target });
        }
        if !graph::is_authorized(actor.role, target) {
            return Err(DocflowError::Unauthorized(
                AuthorizationFailure::RoleNotPermitted {
                    role: actor.role,
                    target,
                    required: graph::required_roles(target),
                },
            ));
        }
        if self.policy.forbid_self_review
            && graph::is_review_step(target)
            && document.author == actor.username
        {
            return Err(DocflowError::Unauthorized(
                AuthorizationFailure::SelfReview {
                    actor: actor.username.clone(),
                    target,
                },
            ));
        }
        Ok(())
    }

    /// Moves `id` to `target` from whatever state it currently holds.
    ///
    /// Concurrent callers cannot both succeed. A loser that read the state
    /// before the winner committed gets `Conflict`; one that reads afterwards
    /// validates against the new state and usually gets `IllegalTransition`.
    pub fn transition(
        &self,
        id: &DocumentId,
        target: WorkflowState,
        actor: &Identity,
    ) -> DocflowResult<Document> {
        self.run_transition(id, None, target, actor)
    }

    /// Moves `id` to `target`, failing with `Conflict` unless the document is
    /// still in `expected`.
    pub fn transition_expecting(
        &self,
        id: &DocumentId,
        expected: WorkflowState,
        target: WorkflowState,
        actor: &Identity,
    ) -> DocflowResult<Document> {
        self.run_transition(id, Some(expected), target, actor)
    }

    /// Creates a document in `Draft` and records the creation.
    pub fn create(&self, draft: &NewDocument, actor: &Identity) -> DocflowResult<Document> {
        let document = self.store.create(draft, actor)?;
        let event = AuditEvent::new(
            document.id.clone(),
            ACTION_CREATED,
            actor.username.clone(),
            document.created_at.max(now_epoch_ms()),
            format!("created as {}", document.workflow_state),
        );
        if let Err(err) = self.audit.append(&event) {
            self.undo("create", &document.id, self.store.remove(&document.id, actor));
            return Err(err.into());
        }
        info!(
            "event=document_create module=workflow status=ok document_id={} actor={} content_kind={} bytes={}",
            document.id,
            actor.username,
            document.content.kind(),
            document.content.byte_len()
        );
        Ok(document)
    }

    /// Removes a document. Its audit history is kept.
    pub fn remove(&self, id: &DocumentId, actor: &Identity) -> DocflowResult<()> {
        let current = self.store.get(id, actor)?;
        self.store.remove(id, actor)?;
        let event = AuditEvent::new(
            id.clone(),
            ACTION_DELETED,
            actor.username.clone(),
            stamp_after(current.updated_at),
            format!("removed while {}", current.workflow_state),
        );
        if let Err(err) = self.audit.append(&event) {
            self.undo("remove", id, self.store.restore(&current, actor));
            return Err(err.into());
        }
        info!(
            "event=document_remove module=workflow status=ok document_id={} actor={}",
            id, actor.username
        );
        Ok(())
    }

    fn run_transition(
        &self,
        id: &DocumentId,
        expected: Option<WorkflowState>,
        target: WorkflowState,
        actor: &Identity,
    ) -> DocflowResult<Document> {
        let current = self.store.get(id, actor)?;
        let from = current.workflow_state;

        if let Some(expected) = expected {
            if expected != from {
                warn!(
                    "event=workflow_transition module=workflow status=conflict document_id={} expected={} actual={}",
                    id, expected, from
                );
                return Err(DocflowError::Conflict {
                    id: id.clone(),
                    expected,
                    actual: from,
                });
            }
        }

        if let Err(err) = self.check_transition(&current, target, actor) {
            warn!(
                "event=workflow_transition module=workflow status=rejected document_id={} from={} to={} role={} reason={}",
                id, from, target, actor.role, err
            );
            return Err(err);
        }

        let updated = self.store.commit_transition(id, from, target, actor)?;
        let event = AuditEvent::transition(
            id.clone(),
            from,
            target,
            actor.username.clone(),
            updated.updated_at.max(now_epoch_ms()),
        );
        if let Err(err) = self.audit.append(&event) {
            self.undo(
                "transition",
                id,
                self.store.revert_transition(&current, target, actor),
            );
            return Err(err.into());
        }
        self.notify_author(&updated, actor);

        info!(
            "event=workflow_transition module=workflow status=ok document_id={} from={} to={} actor={}",
            id, from, target, actor.username
        );
        Ok(updated)
    }

    /// Logs the outcome of undoing a write whose audit append failed.
    fn undo(&self, operation: &str, id: &DocumentId, outcome: RepoResult<()>) {
        match outcome {
            Ok(()) => warn!(
                "event=workflow_undo module=workflow status=ok operation={} document_id={}",
                operation, id
            ),
            Err(err) => error!(
                "event=workflow_undo module=workflow status=error operation={} document_id={} error={}",
                operation, id, err
            ),
        }
    }

    fn notify_author(&self, document: &Document, actor: &Identity) {
        if document.author == actor.username {
            return;
        }
        let message = match document.workflow_state {
            WorkflowState::Approved => "Your document has been approved successfully".to_string(),
            WorkflowState::Rejected => {
                format!("Your document \"{}\" has been rejected", document.title)
            }
            state => format!("Your document \"{}\" is now {}", document.title, state),
        };
        self.notifications.notify(&document.author, &message);
    }
}
