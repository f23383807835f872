//! SQLite quota repository implementation.

use bothost_core::repository::quota::QuotaRepository;
use bothost_types::error::RepositoryError;
use bothost_types::identity::UserId;
use bothost_types::quota::{StoredQuota, UserQuota};
use chrono::Utc;
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, query_error};

/// SQLite-backed implementation of `QuotaRepository`.
#[derive(Clone)]
pub struct SqliteQuotaRepository {
    pool: DatabasePool,
}

impl SqliteQuotaRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn row_to_stored(row: &sqlx::sqlite::SqliteRow) -> Result<StoredQuota, RepositoryError> {
    let user_id: i64 = row.try_get("user_id").map_err(query_error)?;
    let upload_limit: i64 = row.try_get("upload_limit").map_err(query_error)?;
    let run_limit: i64 = row.try_get("run_limit").map_err(query_error)?;
    let updated_at: String = row.try_get("updated_at").map_err(query_error)?;

    Ok(StoredQuota {
        quota: UserQuota::new(UserId(user_id), upload_limit as u32, run_limit as u32),
        updated_at: parse_datetime(&updated_at)?,
    })
}

impl QuotaRepository for SqliteQuotaRepository {
    async fn get_quota(&self, user: UserId) -> Result<Option<UserQuota>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM user_quotas WHERE user_id = ?")
            .bind(user.0)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        row.as_ref()
            .map(|r| row_to_stored(r).map(|s| s.quota))
            .transpose()
    }

    async fn set_quota(&self, quota: &UserQuota) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO user_quotas (user_id, upload_limit, run_limit, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                upload_limit = excluded.upload_limit,
                run_limit = excluded.run_limit,
                updated_at = excluded.updated_at",
        )
        .bind(quota.user_id.0)
        .bind(i64::from(quota.upload_limit))
        .bind(i64::from(quota.run_limit))
        .bind(format_datetime(&Utc::now()))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(())
    }

    async fn list_quotas(&self) -> Result<Vec<StoredQuota>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM user_quotas ORDER BY user_id ASC")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;

        rows.iter().map(row_to_stored).collect()
    }
}
