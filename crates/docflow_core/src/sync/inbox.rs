//! Notification inbox that follows the same remote-first route as documents.

use crate::model::notification::Notification;
use crate::notify::NotificationInbox;
use crate::repo::RepoResult;
use crate::sync::remote::RemoteBackend;
use crate::sync::try_remote;
use std::sync::Arc;

/// Delivers to and lists from the remote backend, falling back to `local`.
pub struct RemoteFirstInbox {
    local: Arc<dyn NotificationInbox>,
    remote: Option<Arc<dyn RemoteBackend>>,
}

impl RemoteFirstInbox {
    pub fn new(local: Arc<dyn NotificationInbox>, remote: Option<Arc<dyn RemoteBackend>>) -> Self {
        Self { local, remote }
    }
}

impl NotificationInbox for RemoteFirstInbox {
    fn deliver(&self, username: &str, message: &str) -> RepoResult<Notification> {
        let remote = self.remote.as_deref();
        if let Some(notification) = try_remote(remote, "create_notification", |remote| {
            remote.create_notification(username, message)
        }) {
            return Ok(notification);
        }
        self.local.deliver(username, message)
    }

    fn list_for_user(&self, username: &str) -> RepoResult<Vec<Notification>> {
        let remote = self.remote.as_deref();
        if let Some(items) = try_remote(remote, "list_notifications", |remote| {
            remote.list_notifications(username)
        }) {
            return Ok(items);
        }
        self.local.list_for_user(username)
    }
}
