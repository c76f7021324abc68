//! Caller-facing error taxonomy.
//!
//! `NotFound`, `IllegalTransition`, `Unauthorized` and `Conflict` are expected,
//! recoverable outcomes meant for user-facing reporting. `Storage` means the
//! local medium failed and no further fallback exists. Remote failures never
//! appear here; the sync gateway absorbs them.

use crate::model::document::{DocumentId, WorkflowState};
use crate::model::identity::Role;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type DocflowResult<T> = Result<T, DocflowError>;

/// Why an actor may not perform a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationFailure {
    /// The actor's role is not in the target state's role set.
    RoleNotPermitted {
        role: Role,
        target: WorkflowState,
        required: &'static [Role],
    },
    /// The author tried to review or decide on their own document.
    SelfReview {
        actor: String,
        target: WorkflowState,
    },
}

impl Display for AuthorizationFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RoleNotPermitted {
                role,
                target,
                required,
            } => {
                let required = required
                    .iter()
                    .map(|role| role.as_str())
                    .collect::<Vec<_>>()
                    .join(" or ");
                write!(
                    f,
                    "role {role} may not move a document to {target} ({required} required)"
                )
            }
            Self::SelfReview { actor, target } => write!(
                f,
                "{actor} authored this document and may not move it to {target}"
            ),
        }
    }
}

#[derive(Debug)]
pub enum DocflowError {
    NotFound(DocumentId),
    IllegalTransition {
        from: WorkflowState,
        to: WorkflowState,
    },
    Unauthorized(AuthorizationFailure),
    Conflict {
        id: DocumentId,
        expected: WorkflowState,
        actual: WorkflowState,
    },
    Storage(RepoError),
}

impl Display for DocflowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "document not found: {id}"),
            Self::IllegalTransition { from, to } => {
                write!(f, "illegal transition from {from} to {to}")
            }
            Self::Unauthorized(reason) => write!(f, "unauthorized: {reason}"),
            Self::Conflict {
                id,
                expected,
                actual,
            } => write!(
                f,
                "conflict on document {id}: expected state {expected}, found {actual}"
            ),
            Self::Storage(err) => write!(f, "storage unavailable: {err}"),
        }
    }
}

impl Error for DocflowError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for DocflowError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Conflict {
                id,
                expected,
                actual,
            } => Self::Conflict {
                id,
                expected,
                actual,
            },
            other => Self::Storage(other),
        }
    }
}

impl From<crate::db::DbError> for DocflowError {
    fn from(value: crate::db::DbError) -> Self {
        Self::Storage(RepoError::Db(value))
    }
}
