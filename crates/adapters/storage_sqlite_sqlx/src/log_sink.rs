//! `SQLite` implementation of the `LogSink` port: append-only writes to
//! `tb_log`.

use async_trait::async_trait;
use sqlx::SqlitePool;

use ponicwatch_app::ports::LogSink;
use ponicwatch_domain::error::PwError;
use ponicwatch_domain::log::LogEntry;

use crate::error::StorageError;

const INSERT_LOG: &str = r"
    INSERT INTO tb_log (log_type, object_id, system_name, float_value, text_value, created_on)
    VALUES (?, ?, ?, ?, ?, ?)
";

/// `SQLite`-backed log sink.
pub struct SqliteLogSink {
    pool: SqlitePool,
}

impl SqliteLogSink {
    /// Create a new sink using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LogSink for SqliteLogSink {
    async fn add_log(&self, entry: LogEntry) -> Result<i64, PwError> {
        let result = sqlx::query(INSERT_LOG)
            .bind(entry.kind.code())
            .bind(entry.object_id)
            .bind(&entry.system_name)
            .bind(entry.float_value)
            .bind(&entry.text_value)
            .bind(entry.created_on.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(result.last_insert_rowid())
    }
}
