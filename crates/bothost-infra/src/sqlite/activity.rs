//! SQLite activity log implementation.
//!
//! Append-only record of lifecycle events, queried most recent first.

use bothost_core::repository::activity::ActivityLog;
use bothost_types::activity::{ActivityEntry, AuditAction};
use bothost_types::error::RepositoryError;
use bothost_types::identity::UserId;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, query_error};

/// SQLite-backed implementation of `ActivityLog`.
#[derive(Clone)]
pub struct SqliteActivityLog {
    pool: DatabasePool,
}

impl SqliteActivityLog {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct ActivityRow {
    id: String,
    user_id: i64,
    action: String,
    details: String,
    created_at: String,
}

impl ActivityRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            action: row.try_get("action")?,
            details: row.try_get("details")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_entry(self) -> Result<ActivityEntry, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid activity id: {e}")))?;
        let action: AuditAction = self
            .action
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(ActivityEntry {
            id,
            user_id: UserId(self.user_id),
            action,
            details: self.details,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

impl ActivityLog for SqliteActivityLog {
    async fn log(&self, entry: &ActivityEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO activity_log (id, user_id, action, details, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(entry.id.to_string())
        .bind(entry.user_id.0)
        .bind(entry.action.as_str())
        .bind(&entry.details)
        .bind(format_datetime(&entry.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(())
    }

    async fn recent(
        &self,
        user: Option<UserId>,
        limit: i64,
    ) -> Result<Vec<ActivityEntry>, RepositoryError> {
        let rows = match user {
            Some(user) => {
                sqlx::query(
                    "SELECT * FROM activity_log WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
                )
                .bind(user.0)
                .bind(limit)
                .fetch_all(&self.pool.reader)
                .await
            }
            None => {
                sqlx::query("SELECT * FROM activity_log ORDER BY created_at DESC, id DESC LIMIT ?")
                    .bind(limit)
                    .fetch_all(&self.pool.reader)
                    .await
            }
        }
        .map_err(query_error)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            entries.push(ActivityRow::from_row(row).map_err(query_error)?.into_entry()?);
        }
        Ok(entries)
    }
}
