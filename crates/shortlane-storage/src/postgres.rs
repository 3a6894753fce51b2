use async_trait::async_trait;
use jiff::Timestamp;
use shortlane_core::repository::Result;
use shortlane_core::{ReadRepository, Repository, ShortCode, StorageError, UrlRow};
use sqlx::{PgPool, Row};
use tracing::{debug, info, trace};

const SCHEMA: &str = include_str!("../ddl/postgres/short_urls.sql");

/// PostgreSQL implementation of the repository contract.
///
/// `code` is the primary key of `short_urls`, so a second insert of the same
/// code fails with [`StorageError::Conflict`] instead of replacing the row.
/// Timestamps cross the wire as whole Unix seconds.
#[derive(Debug, Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a repository from an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a repository by opening a new connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        info!("Connected to PostgreSQL");
        Ok(Self::new(pool))
    }

    /// Creates the `short_urls` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        debug!("short_urls schema is in place");
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn parse_created_at(seconds: i64) -> Result<Timestamp> {
    Timestamp::from_second(seconds).map_err(|e| {
        StorageError::InvalidData(format!("invalid created_at timestamp '{seconds}': {e}"))
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl ReadRepository for PostgresRepository {
    async fn lookup(&self, code: &ShortCode) -> Result<Option<UrlRow>> {
        trace!(code = %code, "Looking up short code in PostgreSQL");

        let row = sqlx::query(
            r#"
            SELECT url, EXTRACT(EPOCH FROM created_at)::BIGINT AS created_at
            FROM short_urls
            WHERE code = $1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let url: String = row.try_get("url").map_err(map_sqlx_error)?;
        let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;

        Ok(Some(UrlRow {
            url,
            created_at: parse_created_at(created_at)?,
        }))
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn insert(&self, code: &ShortCode, row: &UrlRow) -> Result<()> {
        trace!(code = %code, "Inserting short code into PostgreSQL");

        let result = sqlx::query(
            r#"
            INSERT INTO short_urls (code, url, created_at)
            VALUES ($1, $2, to_timestamp($3::BIGINT))
            "#,
        )
        .bind(code.as_str())
        .bind(row.url.as_str())
        .bind(row.created_at.as_second())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(StorageError::Conflict(code.to_string())),
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Closed PostgreSQL pool");
    }
}
