//! Remote backend contract.

use crate::model::document::{Document, DocumentId, DocumentPatch, NewDocument, WorkflowState};
use crate::model::identity::Identity;
use crate::model::notification::Notification;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// Remote backend failure. Absorbed by the gateway, never surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    InvalidBaseUrl(String),
    /// Connection, timeout or request construction failure.
    Transport {
        operation: &'static str,
        message: String,
    },
    /// Non-success HTTP status.
    Status { operation: &'static str, status: u16 },
    /// Response body could not be decoded.
    Malformed {
        operation: &'static str,
        message: String,
    },
}

impl Display for UpstreamError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBaseUrl(value) => write!(f, "invalid remote base url `{value}`"),
            Self::Transport { operation, message } => {
                write!(f, "{operation}: transport failure: {message}")
            }
            Self::Status { operation, status } => {
                write!(f, "{operation}: unexpected status {status}")
            }
            Self::Malformed { operation, message } => {
                write!(f, "{operation}: malformed response: {message}")
            }
        }
    }
}

impl Error for UpstreamError {}

/// Authoritative remote document service.
pub trait RemoteBackend: Send + Sync {
    fn list_documents(&self, identity: &Identity) -> UpstreamResult<Vec<Document>>;
    fn get_document(&self, id: &DocumentId, identity: &Identity) -> UpstreamResult<Document>;
    fn create_document(&self, draft: &NewDocument, identity: &Identity)
        -> UpstreamResult<Document>;
    fn update_document(
        &self,
        id: &DocumentId,
        patch: &DocumentPatch,
        identity: &Identity,
    ) -> UpstreamResult<Document>;
    fn set_workflow_state(
        &self,
        id: &DocumentId,
        target: WorkflowState,
        identity: &Identity,
    ) -> UpstreamResult<()>;
    fn remove_document(&self, id: &DocumentId, identity: &Identity) -> UpstreamResult<()>;
    /// Stores a notification for `username`. Notification endpoints are not
    /// attributed to an acting identity.
    fn create_notification(&self, username: &str, message: &str) -> UpstreamResult<Notification>;
    /// Notifications for `username`, most recent first.
    fn list_notifications(&self, username: &str) -> UpstreamResult<Vec<Notification>>;
}
