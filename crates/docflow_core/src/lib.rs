//! Core domain logic for Docflow.
//! This crate is the single source of truth for workflow invariants.

pub mod audit;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod service;
pub mod sync;
pub mod workflow;

pub use audit::AuditLog;
pub use config::{ConfigError, CoreConfig};
pub use error::{AuthorizationFailure, DocflowError, DocflowResult};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LoggingError};
pub use model::audit::AuditEvent;
pub use model::content::{ContentError, DocumentContent};
pub use model::document::{Document, DocumentId, DocumentPatch, NewDocument, WorkflowState};
pub use model::identity::{Identity, Role, RoleParseError};
pub use model::notification::Notification;
pub use notify::{NotificationInbox, NotificationSink};
pub use repo::document_repo::{DocumentFilter, ListOrder};
pub use repo::{RepoError, RepoResult};
pub use service::{DocflowService, DocflowServiceBuilder, WorkflowSummary};
pub use sync::{
    DocumentStore, HttpRemoteBackend, RemoteBackend, RemoteFirstInbox, SyncGateway, UpstreamError,
};
pub use workflow::{WorkflowEngine, WorkflowPolicy};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
