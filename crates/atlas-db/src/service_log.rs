//! Best-effort service log.
//!
//! Recoverable oddities observed during a request (state conflicts seen in
//! dedup, duplicate rows deleted during writeback) are appended to
//! `atlas_log`. Failures here are swallowed; the log must never sink a
//! search.

use sqlx::mysql::MySqlPool;
use tracing::debug;

/// Repository for the `atlas_log` table.
pub struct ServiceLogRepository {
    pool: MySqlPool,
}

impl ServiceLogRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Append one line; errors are logged and dropped.
    pub async fn append(&self, warning: bool, message: &str) {
        let result = sqlx::query(
            "INSERT INTO atlas_log (time_stamp, warning, message) VALUES (CURRENT_TIMESTAMP, ?, ?)",
        )
        .bind(warning)
        .bind(message)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            debug!(
                subsystem = "db",
                component = "service_log",
                error = %e,
                "Service log append failed"
            );
        }
    }
}
