//! Append-only audit event persistence.
//!
//! # Invariants
//! - No update or delete path exists.
//! - Listing order is `at ASC`, ties broken by insertion order.

use crate::db::{lock, SharedConnection};
use crate::model::audit::AuditEvent;
use crate::model::document::DocumentId;
use crate::repo::RepoResult;
use rusqlite::params;

/// Repository interface for audit events.
pub trait AuditRepository: Send + Sync {
    fn append_event(&self, event: &AuditEvent) -> RepoResult<()>;
    fn list_for_document(&self, document_id: &DocumentId) -> RepoResult<Vec<AuditEvent>>;
}

/// SQLite-backed audit repository.
#[derive(Clone)]
pub struct SqliteAuditRepository {
    conn: SharedConnection,
}

impl SqliteAuditRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

impl AuditRepository for SqliteAuditRepository {
    fn append_event(&self, event: &AuditEvent) -> RepoResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO audit_events (id, document_id, action, actor, at, details)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                event.id.as_str(),
                event.document_id.as_str(),
                event.action.as_str(),
                event.actor.as_str(),
                event.at,
                event.details.as_str(),
            ],
        )?;
        Ok(())
    }

    fn list_for_document(&self, document_id: &DocumentId) -> RepoResult<Vec<AuditEvent>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT id, document_id, action, actor, at, details
             FROM audit_events
             WHERE document_id = ?1
             ORDER BY at ASC, seq ASC;",
        )?;
        let mut rows = stmt.query([document_id.as_str()])?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            events.push(AuditEvent {
                id: row.get("id")?,
                document_id: DocumentId::new(row.get::<_, String>("document_id")?),
                action: row.get("action")?,
                actor: row.get("actor")?,
                at: row.get("at")?,
                details: row.get("details")?,
            });
        }
        Ok(events)
    }
}
