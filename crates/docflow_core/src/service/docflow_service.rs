//! Document workflow service facade.
//!
//! # Responsibility
//! - Provide list/get/create/update/transition/remove APIs with the acting
//!   identity passed explicitly on every call.
//! - Provide audit, notification, inbox and dashboard read models.
//!
//! # Invariants
//! - All writes go through the workflow engine or the sync gateway; nothing
//!   here touches SQL directly.

use crate::audit::AuditLog;
use crate::config::CoreConfig;
use crate::db::{open_db, open_db_in_memory, share, SharedConnection};
use crate::error::DocflowResult;
use crate::model::audit::AuditEvent;
use crate::model::document::{Document, DocumentId, DocumentPatch, NewDocument, WorkflowState};
use crate::model::identity::Identity;
use crate::model::notification::Notification;
use crate::model::now_epoch_ms;
use crate::notify::{NotificationInbox, NotificationSink};
use crate::repo::audit_repo::{AuditRepository, SqliteAuditRepository};
use crate::repo::document_repo::{DocumentFilter, SqliteDocumentRepository};
use crate::repo::login_repo::{LoginRepository, SqliteLoginRepository};
use crate::repo::notification_repo::SqliteNotificationRepository;
use crate::service::summary::{summarize, WorkflowSummary};
use crate::sync::{DocumentStore, HttpRemoteBackend, RemoteBackend, RemoteFirstInbox, SyncGateway};
use crate::workflow::graph;
use crate::workflow::{WorkflowEngine, WorkflowPolicy};
use log::{info, warn};
use rusqlite::Connection;
use std::sync::Arc;
use std::time::Duration;

/// Gateway over the SQLite document repository.
pub type LocalGateway = SyncGateway<SqliteDocumentRepository>;

/// Assembles a `DocflowService` over one SQLite connection.
pub struct DocflowServiceBuilder {
    conn: SharedConnection,
    remote: Option<Arc<dyn RemoteBackend>>,
    inbox: Option<Arc<dyn NotificationInbox>>,
    audit: Option<Arc<dyn AuditRepository>>,
    policy: WorkflowPolicy,
}

impl DocflowServiceBuilder {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: share(conn),
            remote: None,
            inbox: None,
            audit: None,
            policy: WorkflowPolicy::default(),
        }
    }

    pub fn remote(mut self, remote: Arc<dyn RemoteBackend>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Replaces SQLite-backed notification storage used when no remote is
    /// configured or the remote fails.
    pub fn inbox(mut self, inbox: Arc<dyn NotificationInbox>) -> Self {
        self.inbox = Some(inbox);
        self
    }

    /// Replaces the SQLite-backed audit ledger.
    pub fn audit_repository(mut self, audit: Arc<dyn AuditRepository>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn policy(mut self, policy: WorkflowPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> DocflowService {
        let conn = self.conn;
        let gateway = SyncGateway::new(
            SqliteDocumentRepository::new(conn.clone()),
            self.remote.clone(),
        );
        let audit_repo: Arc<dyn AuditRepository> = match self.audit {
            Some(repo) => repo,
            None => Arc::new(SqliteAuditRepository::new(conn.clone())),
        };
        let local_inbox: Arc<dyn NotificationInbox> = match self.inbox {
            Some(inbox) => inbox,
            None => Arc::new(SqliteNotificationRepository::new(conn.clone())),
        };
        let inbox = Arc::new(RemoteFirstInbox::new(local_inbox, self.remote));
        let engine = WorkflowEngine::new(
            gateway,
            AuditLog::new(audit_repo),
            NotificationSink::spawn(inbox),
            self.policy,
        );
        DocflowService {
            engine,
            logins: SqliteLoginRepository::new(conn),
        }
    }
}

/// Entry point for document workflow use-cases.
pub struct DocflowService {
    engine: WorkflowEngine<LocalGateway>,
    logins: SqliteLoginRepository,
}

impl DocflowService {
    pub fn builder(conn: Connection) -> DocflowServiceBuilder {
        DocflowServiceBuilder::new(conn)
    }

    /// Opens the configured database and remote backend.
    ///
    /// An unusable remote configuration degrades to local-only operation.
    pub fn open(config: &CoreConfig) -> DocflowResult<Self> {
        let conn = open_db(&config.storage.db_path)?;
        let mut builder = Self::builder(conn);
        if let Some(base_url) = config.remote_base_url() {
            match HttpRemoteBackend::new(base_url, config.remote_timeout()) {
                Ok(remote) => {
                    info!(
                        "event=remote_configure module=service status=ok base_url={}",
                        remote.base_url()
                    );
                    builder = builder.remote(Arc::new(remote));
                }
                Err(err) => {
                    warn!("event=remote_configure module=service status=fallback reason={err}");
                }
            }
        }
        Ok(builder.build())
    }

    /// Local-only service over a fresh in-memory database.
    pub fn open_in_memory() -> DocflowResult<Self> {
        Ok(Self::builder(open_db_in_memory()?).build())
    }

    pub fn engine(&self) -> &WorkflowEngine<LocalGateway> {
        &self.engine
    }

    pub fn list_documents(
        &self,
        filter: &DocumentFilter,
        identity: &Identity,
    ) -> DocflowResult<Vec<Document>> {
        Ok(self.engine.store().list(filter, identity)?)
    }

    pub fn get_document(&self, id: &DocumentId, identity: &Identity) -> DocflowResult<Document> {
        Ok(self.engine.store().get(id, identity)?)
    }

    pub fn create_document(
        &self,
        draft: &NewDocument,
        identity: &Identity,
    ) -> DocflowResult<Document> {
        self.engine.create(draft, identity)
    }

    pub fn update_document(
        &self,
        id: &DocumentId,
        patch: &DocumentPatch,
        identity: &Identity,
    ) -> DocflowResult<Document> {
        Ok(self.engine.store().update(id, patch, identity)?)
    }

    /// Moves `id` to `target` from its current state.
    ///
    /// Two concurrent calls never both succeed, but the loser's error depends
    /// on timing: `Conflict` when it read the document before the winner
    /// committed, otherwise the error for the new state (usually
    /// `IllegalTransition`). Use `transition_document_from` to always get
    /// `Conflict` for a stale view.
    pub fn transition_document(
        &self,
        id: &DocumentId,
        target: WorkflowState,
        identity: &Identity,
    ) -> DocflowResult<Document> {
        self.engine.transition(id, target, identity)
    }

    /// Like `transition_document`, but fails with `Conflict` unless the
    /// document is still in `expected`.
    pub fn transition_document_from(
        &self,
        id: &DocumentId,
        expected: WorkflowState,
        target: WorkflowState,
        identity: &Identity,
    ) -> DocflowResult<Document> {
        self.engine.transition_expecting(id, expected, target, identity)
    }

    pub fn remove_document(&self, id: &DocumentId, identity: &Identity) -> DocflowResult<()> {
        self.engine.remove(id, identity)
    }

    /// Audit events for `id`, oldest first. Events outlive the document.
    pub fn list_audits(&self, id: &DocumentId) -> DocflowResult<Vec<AuditEvent>> {
        Ok(self.engine.audit_log().list_for_document(id)?)
    }

    /// Notifications for `username`, most recent first.
    pub fn list_notifications(&self, username: &str) -> DocflowResult<Vec<Notification>> {
        Ok(self.engine.notifications().list_for_user(username)?)
    }

    /// Blocks until queued notifications are delivered or `timeout` elapses.
    pub fn flush_notifications(&self, timeout: Duration) -> bool {
        self.engine.notifications().flush(timeout)
    }

    /// Documents `identity` can act on right now, most recently updated first.
    pub fn list_inbox(&self, identity: &Identity) -> DocflowResult<Vec<Document>> {
        let documents = self.list_documents(&DocumentFilter::recent_first(), identity)?;
        Ok(documents
            .into_iter()
            .filter(|document| {
                graph::allowed_targets(document.workflow_state)
                    .iter()
                    .any(|target| {
                        self.engine
                            .check_transition(document, *target, identity)
                            .is_ok()
                    })
            })
            .collect())
    }

    pub fn list_my_documents(&self, identity: &Identity) -> DocflowResult<Vec<Document>> {
        let filter = DocumentFilter::recent_first().with_author(identity.username.clone());
        self.list_documents(&filter, identity)
    }

    pub fn workflow_summary(
        &self,
        identity: &Identity,
        now_ms: i64,
    ) -> DocflowResult<WorkflowSummary> {
        let documents = self.list_documents(&DocumentFilter::default(), identity)?;
        Ok(summarize(&documents, now_ms))
    }

    pub fn record_login(&self, identity: &Identity) -> DocflowResult<()> {
        self.logins
            .record_login(&identity.username, now_epoch_ms())?;
        info!(
            "event=login_recorded module=service status=ok username={} role={}",
            identity.username, identity.role
        );
        Ok(())
    }

    /// Distinct usernames that logged in at or after `cutoff_ms`.
    pub fn active_users_since(&self, cutoff_ms: i64) -> DocflowResult<Vec<String>> {
        Ok(self.logins.active_users_since(cutoff_ms)?)
    }
}
