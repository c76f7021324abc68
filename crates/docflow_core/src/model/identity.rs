//! Caller identity consumed from an external identity collaborator.
//!
//! The core never authenticates; it only receives an already-resolved
//! username and a validated `Role`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Workflow role used for transition authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Submitter,
    Reviewer,
    Approver,
}

/// Header/manifest value for the submitter role.
pub const ROLE_SUBMITTER: &str = "Submitter";
/// Header/manifest value for the reviewer role.
pub const ROLE_REVIEWER: &str = "Reviewer";
/// Header/manifest value for the approver role.
pub const ROLE_APPROVER: &str = "Approver";

impl Role {
    pub const ALL: [Role; 3] = [Role::Submitter, Role::Reviewer, Role::Approver];

    /// Stable string id, sent as the `X-ROLE` header.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitter => ROLE_SUBMITTER,
            Self::Reviewer => ROLE_REVIEWER,
            Self::Approver => ROLE_APPROVER,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleParseError {
    EmptyRole,
    UnsupportedRole(String),
}

impl Display for RoleParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyRole => write!(f, "role value must not be empty"),
            Self::UnsupportedRole(value) => write!(
                f,
                "role is unsupported: {value}; expected Submitter|Reviewer|Approver"
            ),
        }
    }
}

impl Error for RoleParseError {}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        if normalized.is_empty() {
            return Err(RoleParseError::EmptyRole);
        }

        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(normalized))
            .ok_or_else(|| RoleParseError::UnsupportedRole(normalized.to_string()))
    }
}

/// Already-authenticated actor passed explicitly into every core call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub username: String,
    pub display_name: Option<String>,
    pub role: Role,
}

impl Identity {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            display_name: None,
            role,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Name suitable for greetings: display name when set, else username.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}
