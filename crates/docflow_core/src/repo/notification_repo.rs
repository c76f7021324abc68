//! SQLite inbox storage backing the notification sink.

use crate::db::{lock, SharedConnection};
use crate::model::notification::Notification;
use crate::model::now_epoch_ms;
use crate::notify::NotificationInbox;
use crate::repo::{RepoError, RepoResult};
use rusqlite::params;
use uuid::Uuid;

/// SQLite-backed per-user inbox.
#[derive(Clone)]
pub struct SqliteNotificationRepository {
    conn: SharedConnection,
}

impl SqliteNotificationRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

impl NotificationInbox for SqliteNotificationRepository {
    fn deliver(&self, username: &str, message: &str) -> RepoResult<Notification> {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            message: message.to_string(),
            read: false,
            created_at: now_epoch_ms(),
        };

        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO notifications (id, username, message, is_read, created_at)
             VALUES (?1, ?2, ?3, 0, ?4);",
            params![
                notification.id.as_str(),
                notification.username.as_str(),
                notification.message.as_str(),
                notification.created_at,
            ],
        )?;
        Ok(notification)
    }

    fn list_for_user(&self, username: &str) -> RepoResult<Vec<Notification>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT id, username, message, is_read, created_at
             FROM notifications
             WHERE username = ?1
             ORDER BY created_at DESC, seq DESC;",
        )?;
        let mut rows = stmt.query([username])?;
        let mut notifications = Vec::new();
        while let Some(row) = rows.next()? {
            let read = match row.get::<_, i64>("is_read")? {
                0 => false,
                1 => true,
                other => {
                    return Err(RepoError::InvalidData(format!(
                        "invalid is_read value `{other}` in notifications.is_read"
                    )));
                }
            };
            notifications.push(Notification {
                id: row.get("id")?,
                username: row.get("username")?,
                message: row.get("message")?,
                read,
                created_at: row.get("created_at")?,
            });
        }
        Ok(notifications)
    }
}
