//! Append-only audit ledger keyed by document id.
//!
//! # Invariants
//! - `append` is synchronous: the event is durable when it returns.
//! - Events are never mutated or removed, including after document deletion.

use crate::db::SharedConnection;
use crate::model::audit::AuditEvent;
use crate::model::document::DocumentId;
use crate::repo::audit_repo::{AuditRepository, SqliteAuditRepository};
use crate::repo::RepoResult;
use log::{error, info};
use std::sync::Arc;

/// Audit ledger handle; cheap to clone.
#[derive(Clone)]
pub struct AuditLog {
    repo: Arc<dyn AuditRepository>,
}

impl AuditLog {
    pub fn new(repo: Arc<dyn AuditRepository>) -> Self {
        Self { repo }
    }

    /// Ledger over the shared SQLite connection.
    pub fn sqlite(conn: SharedConnection) -> Self {
        Self::new(Arc::new(SqliteAuditRepository::new(conn)))
    }

    pub fn append(&self, event: &AuditEvent) -> RepoResult<()> {
        match self.repo.append_event(event) {
            Ok(()) => {
                info!(
                    "event=audit_append module=audit status=ok document_id={} action={}",
                    event.document_id, event.action
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=audit_append module=audit status=error document_id={} error={}",
                    event.document_id, err
                );
                Err(err)
            }
        }
    }

    /// Events for one document, oldest first.
    pub fn list_for_document(&self, document_id: &DocumentId) -> RepoResult<Vec<AuditEvent>> {
        self.repo.list_for_document(document_id)
    }
}
