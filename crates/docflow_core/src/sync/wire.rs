//! JSON shapes exchanged with the remote backend.

use crate::model::content::DocumentContent;
use crate::model::document::{Document, DocumentId, WorkflowState};
use crate::model::notification::Notification;
use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// Timestamp as either RFC 3339 text or numeric epoch seconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum WireTimestamp {
    Text(String),
    EpochSeconds(f64),
}

impl WireTimestamp {
    pub(crate) fn to_epoch_ms(&self) -> Result<i64, String> {
        match self {
            Self::Text(value) => DateTime::parse_from_rfc3339(value)
                .map(|at| at.timestamp_millis())
                .map_err(|err| format!("invalid timestamp `{value}`: {err}")),
            Self::EpochSeconds(seconds) if seconds.is_finite() => {
                Ok((seconds * 1000.0).round() as i64)
            }
            Self::EpochSeconds(seconds) => Err(format!("invalid timestamp `{seconds}`")),
        }
    }
}

fn optional_ms(value: Option<&WireTimestamp>) -> Result<Option<i64>, String> {
    value.map(WireTimestamp::to_epoch_ms).transpose()
}

/// Content as structured JSON, or a bare string.
///
/// Bare strings are always text. Files only arrive in structured form, so
/// text that happens to look like a file marker round-trips unchanged.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum WireContentField {
    Structured(DocumentContent),
    Plain(String),
}

impl WireContentField {
    fn into_content(self) -> DocumentContent {
        match self {
            Self::Structured(content) => content,
            Self::Plain(value) => DocumentContent::Text(value),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DocumentDto {
    pub id: String,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub content: Option<WireContentField>,
    pub workflow_state: String,
    #[serde(default)]
    pub created_at: Option<WireTimestamp>,
    #[serde(default)]
    pub updated_at: Option<WireTimestamp>,
}

impl DocumentDto {
    /// Returns whether the response carried document content.
    pub(crate) fn has_content(&self) -> bool {
        self.content.is_some()
    }

    pub(crate) fn into_document(self) -> Result<Document, String> {
        let workflow_state: WorkflowState = self
            .workflow_state
            .parse()
            .map_err(|err: crate::model::document::WorkflowStateParseError| err.to_string())?;
        let created_at = optional_ms(self.created_at.as_ref())?.unwrap_or(0);
        let updated_at = optional_ms(self.updated_at.as_ref())?.unwrap_or(created_at);
        let content = match self.content {
            Some(content) => content.into_content(),
            None => DocumentContent::default(),
        };
        Ok(Document {
            id: DocumentId::new(self.id),
            title: self.title,
            author: self.author,
            tags: self.tags.unwrap_or_default(),
            content,
            workflow_state,
            created_at,
            updated_at,
        })
    }
}

/// Body of `POST /notifications`.
#[derive(Debug, Serialize)]
pub(crate) struct NewNotificationDto<'a> {
    pub username: &'a str,
    pub message: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NotificationDto {
    pub id: String,
    pub username: String,
    pub message: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub created_at: Option<WireTimestamp>,
}

impl NotificationDto {
    pub(crate) fn into_notification(self) -> Result<Notification, String> {
        Ok(Notification {
            id: self.id,
            username: self.username,
            message: self.message,
            read: self.read,
            created_at: optional_ms(self.created_at.as_ref())?.unwrap_or(0),
        })
    }
}
