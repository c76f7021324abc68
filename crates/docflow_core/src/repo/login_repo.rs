//! Login history persistence.
//!
//! Login events are recorded by the identity collaborator after it resolves
//! a user; the core only stores and summarizes them.

use crate::db::{lock, SharedConnection};
use crate::repo::RepoResult;
use rusqlite::params;

/// Repository interface for login history.
pub trait LoginRepository: Send + Sync {
    fn record_login(&self, username: &str, at: i64) -> RepoResult<()>;
    /// Distinct usernames with a login at or after `cutoff`, sorted by name.
    fn active_users_since(&self, cutoff: i64) -> RepoResult<Vec<String>>;
}

/// SQLite-backed login history.
#[derive(Clone)]
pub struct SqliteLoginRepository {
    conn: SharedConnection,
}

impl SqliteLoginRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

impl LoginRepository for SqliteLoginRepository {
    fn record_login(&self, username: &str, at: i64) -> RepoResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO login_history (username, logged_in_at) VALUES (?1, ?2);",
            params![username, at],
        )?;
        Ok(())
    }

    fn active_users_since(&self, cutoff: i64) -> RepoResult<Vec<String>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT username
             FROM login_history
             WHERE logged_in_at >= ?1
             ORDER BY username ASC;",
        )?;
        let mut rows = stmt.query([cutoff])?;
        let mut usernames = Vec::new();
        while let Some(row) = rows.next()? {
            usernames.push(row.get(0)?);
        }
        Ok(usernames)
    }
}
