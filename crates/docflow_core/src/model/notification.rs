//! Per-user inbox notification model.

use serde::{Deserialize, Serialize};

/// One inbox entry for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub username: String,
    pub message: String,
    pub read: bool,
    /// Epoch milliseconds.
    pub created_at: i64,
}
