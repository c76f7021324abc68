//! Document domain model.
//!
//! # Responsibility
//! - Define the canonical document record and its workflow state.
//! - Define create/update inputs accepted by the store.
//!
//! # Invariants
//! - `id` and `author` never change after creation.
//! - `updated_at` is rewritten on every mutation, state transitions included.
//! - `workflow_state` changes only through the workflow engine.

use crate::model::content::DocumentContent;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Opaque, stable document identifier.
///
/// Locally created ids are UUID v4 strings; ids issued by the remote backend
/// are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Generates a fresh identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Review workflow state.
///
/// `Draft` is the only initial state; `Approved` and `Rejected` are terminal.
/// Legal edges live in `workflow::graph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WorkflowState {
    Draft,
    Submitted,
    #[serde(rename = "Under Review")]
    UnderReview,
    Approved,
    Rejected,
}

impl WorkflowState {
    /// All states in workflow order.
    pub const ALL: [WorkflowState; 5] = [
        WorkflowState::Draft,
        WorkflowState::Submitted,
        WorkflowState::UnderReview,
        WorkflowState::Approved,
        WorkflowState::Rejected,
    ];

    /// Human-readable label, also used on the remote wire.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Submitted => "Submitted",
            Self::UnderReview => "Under Review",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }

    /// Stable storage value.
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::UnderReview => "under_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_db_str() == value)
    }
}

impl Display for WorkflowState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Error returned when a workflow state label cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowStateParseError(pub String);

impl Display for WorkflowStateParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown workflow state `{}`; expected Draft|Submitted|Under Review|Approved|Rejected",
            self.0
        )
    }
}

impl Error for WorkflowStateParseError {}

impl FromStr for WorkflowState {
    type Err = WorkflowStateParseError;

    /// Accepts display names, storage values and compact forms
    /// (`Under Review`, `under_review`, `UnderReview`), case-insensitively.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let compact: String = value
            .trim()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        match compact.as_str() {
            "draft" => Ok(Self::Draft),
            "submitted" => Ok(Self::Submitted),
            "underreview" => Ok(Self::UnderReview),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(WorkflowStateParseError(value.to_string())),
        }
    }
}

/// Canonical document record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    /// Owning identity; set at creation.
    pub author: String,
    /// Ordered as given; duplicates are kept.
    pub tags: Vec<String>,
    pub content: DocumentContent,
    pub workflow_state: WorkflowState,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds. Strictly increases on every mutation.
    pub updated_at: i64,
}

impl Document {
    /// Returns whether the document is awaiting a reviewer or approver.
    pub fn is_pending(&self) -> bool {
        matches!(
            self.workflow_state,
            WorkflowState::Submitted | WorkflowState::UnderReview
        )
    }
}

/// Input for document creation. Id, state and timestamps are assigned by the
/// store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub title: String,
    pub author: String,
    pub tags: Vec<String>,
    pub content: DocumentContent,
}

impl NewDocument {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        tags: Vec<String>,
        content: DocumentContent,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            tags,
            content,
        }
    }
}

/// Partial update merged into an existing document.
///
/// Author and workflow state are deliberately absent: the former is
/// immutable, the latter only moves through the workflow engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<DocumentContent>,
}

impl DocumentPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.tags.is_none() && self.content.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::{DocumentId, WorkflowState};

    #[test]
    fn parses_state_labels_in_every_supported_form() {
        for label in ["Under Review", "under_review", "UnderReview", " under-review "] {
            assert_eq!(
                label.parse::<WorkflowState>().expect("label should parse"),
                WorkflowState::UnderReview
            );
        }
        assert!("Archived".parse::<WorkflowState>().is_err());
    }

    #[test]
    fn storage_values_round_trip_for_all_states() {
        for state in WorkflowState::ALL {
            assert_eq!(WorkflowState::from_db_str(state.as_db_str()), Some(state));
        }
        assert_eq!(WorkflowState::from_db_str("Under Review"), None);
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(DocumentId::generate(), DocumentId::generate());
    }
}
