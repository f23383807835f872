//! SQLite upload repository implementation.
//!
//! Implements `UploadRepository` from `bothost-core` using sqlx with split read/write pools.

use bothost_core::repository::upload::UploadRepository;
use bothost_types::bot::{BotStatus, UploadRecord};
use bothost_types::error::RepositoryError;
use bothost_types::identity::{BotIdentity, UserId};
use chrono::{DateTime, Utc};
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, query_error};

/// SQLite-backed implementation of `UploadRepository`.
#[derive(Clone)]
pub struct SqliteUploadRepository {
    pool: DatabasePool,
}

impl SqliteUploadRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to `UploadRecord`.
struct UploadRow {
    owner_id: i64,
    bot_name: String,
    original_name: String,
    file_size: i64,
    status: String,
    uploaded_at: String,
    last_started: Option<String>,
}

impl UploadRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            owner_id: row.try_get("owner_id")?,
            bot_name: row.try_get("bot_name")?,
            original_name: row.try_get("original_name")?,
            file_size: row.try_get("file_size")?,
            status: row.try_get("status")?,
            uploaded_at: row.try_get("uploaded_at")?,
            last_started: row.try_get("last_started")?,
        })
    }

    fn into_record(self) -> Result<UploadRecord, RepositoryError> {
        let status: BotStatus = self
            .status
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(UploadRecord {
            identity: BotIdentity::new(UserId(self.owner_id), self.bot_name),
            original_name: self.original_name,
            size: self.file_size.max(0) as u64,
            status,
            uploaded_at: parse_datetime(&self.uploaded_at)?,
            last_started: self
                .last_started
                .as_deref()
                .map(parse_datetime)
                .transpose()?,
        })
    }
}

fn rows_to_records(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<UploadRecord>, RepositoryError> {
    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        records.push(UploadRow::from_row(row).map_err(query_error)?.into_record()?);
    }
    Ok(records)
}

impl UploadRepository for SqliteUploadRepository {
    async fn record_upload(&self, record: &UploadRecord) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO uploads (owner_id, bot_name, original_name, file_size, status, uploaded_at, last_started)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.identity.owner.0)
        .bind(&record.identity.name)
        .bind(&record.original_name)
        .bind(record.size as i64)
        .bind(record.status.to_string())
        .bind(format_datetime(&record.uploaded_at))
        .bind(record.last_started.as_ref().map(format_datetime))
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => Err(
                RepositoryError::Conflict(format!("bot '{}' already exists", record.identity)),
            ),
            Err(e) => Err(query_error(e)),
        }
    }

    async fn get_upload(
        &self,
        identity: &BotIdentity,
    ) -> Result<Option<UploadRecord>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM uploads WHERE owner_id = ? AND bot_name = ?")
            .bind(identity.owner.0)
            .bind(&identity.name)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => Ok(Some(
                UploadRow::from_row(&row).map_err(query_error)?.into_record()?,
            )),
            None => Ok(None),
        }
    }

    async fn list_uploads(
        &self,
        owner: Option<UserId>,
    ) -> Result<Vec<UploadRecord>, RepositoryError> {
        let rows = match owner {
            Some(owner) => {
                sqlx::query(
                    "SELECT * FROM uploads WHERE owner_id = ? ORDER BY uploaded_at ASC, bot_name ASC",
                )
                .bind(owner.0)
                .fetch_all(&self.pool.reader)
                .await
            }
            None => {
                sqlx::query("SELECT * FROM uploads ORDER BY owner_id ASC, uploaded_at ASC, bot_name ASC")
                    .fetch_all(&self.pool.reader)
                    .await
            }
        }
        .map_err(query_error)?;

        rows_to_records(&rows)
    }

    async fn count_uploads(&self, owner: UserId) -> Result<u32, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM uploads WHERE owner_id = ?")
            .bind(owner.0)
            .fetch_one(&self.pool.reader)
            .await
            .map_err(query_error)?;

        Ok(count as u32)
    }

    async fn set_status(
        &self,
        identity: &BotIdentity,
        status: BotStatus,
        last_started: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE uploads SET status = ?, last_started = COALESCE(?, last_started)
             WHERE owner_id = ? AND bot_name = ?",
        )
        .bind(status.to_string())
        .bind(last_started.as_ref().map(format_datetime))
        .bind(identity.owner.0)
        .bind(&identity.name)
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_size(&self, identity: &BotIdentity, size: u64) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE uploads SET file_size = ? WHERE owner_id = ? AND bot_name = ?")
                .bind(size as i64)
                .bind(identity.owner.0)
                .bind(&identity.name)
                .execute(&self.pool.writer)
                .await
                .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_upload(&self, identity: &BotIdentity) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM uploads WHERE owner_id = ? AND bot_name = ?")
            .bind(identity.owner.0)
            .bind(&identity.name)
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_by_status(
        &self,
        status: BotStatus,
    ) -> Result<Vec<UploadRecord>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM uploads WHERE status = ? ORDER BY owner_id, bot_name")
            .bind(status.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;

        rows_to_records(&rows)
    }
}
