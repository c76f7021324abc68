//! Best-effort notification fan-out to per-user inboxes.
//!
//! # Responsibility
//! - Accept notifications without blocking the caller.
//! - Deliver them to inbox storage on a dedicated worker thread.
//!
//! # Invariants
//! - `notify` never fails and never waits on storage.
//! - Delivery failures are logged and dropped; nothing is retried.
//! - Deliveries keep submission order.

use crate::model::notification::Notification;
use crate::repo::RepoResult;
use log::{error, info, warn};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Inbox storage written by the sink worker.
pub trait NotificationInbox: Send + Sync {
    fn deliver(&self, username: &str, message: &str) -> RepoResult<Notification>;
    /// Notifications for `username`, most recent first.
    fn list_for_user(&self, username: &str) -> RepoResult<Vec<Notification>>;
}

enum DispatchCommand {
    Deliver { username: String, message: String },
    Flush(Sender<()>),
}

/// Non-blocking notification dispatcher.
pub struct NotificationSink {
    sender: Option<Sender<DispatchCommand>>,
    worker: Option<JoinHandle<()>>,
    inbox: Arc<dyn NotificationInbox>,
}

impl NotificationSink {
    /// Starts the delivery worker.
    ///
    /// When the worker thread cannot be spawned the sink still works for
    /// reads; every `notify` call is logged and dropped.
    pub fn spawn(inbox: Arc<dyn NotificationInbox>) -> Self {
        let (sender, receiver) = mpsc::channel();
        let worker_inbox = Arc::clone(&inbox);
        let spawned = thread::Builder::new()
            .name("docflow-notify".to_string())
            .spawn(move || run_worker(worker_inbox, receiver));

        match spawned {
            Ok(worker) => Self {
                sender: Some(sender),
                worker: Some(worker),
                inbox,
            },
            Err(err) => {
                error!("event=notification_worker module=notify status=error error={err}");
                Self {
                    sender: None,
                    worker: None,
                    inbox,
                }
            }
        }
    }

    /// Queues one notification for `username`.
    pub fn notify(&self, username: &str, message: &str) {
        let command = DispatchCommand::Deliver {
            username: username.to_string(),
            message: message.to_string(),
        };
        let queued = self
            .sender
            .as_ref()
            .is_some_and(|sender| sender.send(command).is_ok());
        if !queued {
            warn!(
                "event=notification_dispatch module=notify status=dropped username={username} reason=worker_unavailable"
            );
        }
    }

    /// Waits until every notification queued before this call is processed.
    ///
    /// Returns `false` when the worker is unavailable or `timeout` elapses.
    pub fn flush(&self, timeout: Duration) -> bool {
        let Some(sender) = self.sender.as_ref() else {
            return false;
        };
        let (ack_sender, ack_receiver) = mpsc::channel();
        if sender.send(DispatchCommand::Flush(ack_sender)).is_err() {
            return false;
        }
        ack_receiver.recv_timeout(timeout).is_ok()
    }

    /// Notifications for `username`, most recent first.
    pub fn list_for_user(&self, username: &str) -> RepoResult<Vec<Notification>> {
        self.inbox.list_for_user(username)
    }
}

impl Drop for NotificationSink {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop after pending deliveries.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("event=notification_worker module=notify status=error reason=worker_panicked");
            }
        }
    }
}

fn run_worker(inbox: Arc<dyn NotificationInbox>, receiver: Receiver<DispatchCommand>) {
    for command in receiver {
        match command {
            DispatchCommand::Deliver { username, message } => {
                match inbox.deliver(&username, &message) {
                    Ok(notification) => info!(
                        "event=notification_dispatch module=notify status=ok username={} notification_id={}",
                        username, notification.id
                    ),
                    Err(err) => warn!(
                        "event=notification_dispatch module=notify status=dropped username={username} error={err}"
                    ),
                }
            }
            DispatchCommand::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}
