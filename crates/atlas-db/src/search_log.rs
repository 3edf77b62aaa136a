//! Search log and cache coherence.
//!
//! Every normalized search is recorded in `atlas_searches2`. A query seen
//! recently enough can be answered from the local database alone; the
//! `extended` flag is sticky so a remote-consulting search keeps satisfying
//! later non-extended requests, while a stored non-extended row does not
//! satisfy a new extended request.

use chrono::{DateTime, Months, Utc};
use sqlx::mysql::MySqlPool;
use sqlx::FromRow;
use tracing::debug;

use atlas_core::defaults::SEARCH_RECENCY_MONTHS;
use atlas_core::Result;

#[derive(Debug, FromRow)]
struct SearchLogRow {
    extended: bool,
    time_stamp: DateTime<Utc>,
}

/// Repository for the `atlas_searches2` coherence table.
pub struct SearchLogRepository {
    pool: MySqlPool,
}

impl SearchLogRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Whether this normalized search was logged recently enough to skip
    /// remote consultation.
    ///
    /// Recent means: younger than twelve months AND (the stored row was
    /// extended OR the current request is not).
    pub async fn has_search_been_done_recently(
        &self,
        normalized_search: &str,
        extended: bool,
    ) -> Result<bool> {
        let row: Option<SearchLogRow> = sqlx::query_as(
            "SELECT extended, time_stamp FROM atlas_searches2 WHERE search_string = ?",
        )
        .bind(normalized_search)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(false);
        };

        let cutoff = Utc::now()
            .checked_sub_months(Months::new(SEARCH_RECENCY_MONTHS as u32))
            .unwrap_or_else(Utc::now);
        let recent = row.time_stamp > cutoff && (row.extended || !extended);

        debug!(
            subsystem = "db",
            component = "search_log",
            op = "recency",
            normalized = normalized_search,
            stored_extended = row.extended,
            requested_extended = extended,
            recent,
            "Search log consulted"
        );
        Ok(recent)
    }

    /// Record a completed search.
    ///
    /// An existing row gets its hit count incremented, the match count
    /// refreshed, and the extended flag stickied upward; the original
    /// timestamp is preserved so the coherence window measures data age,
    /// not popularity. A new search inserts with one hit.
    pub async fn log_search(
        &self,
        normalized_search: &str,
        extended: bool,
        match_count: i64,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO atlas_searches2 (search_string, extended, hits, matches, time_stamp) \
             VALUES (?, ?, 1, ?, CURRENT_TIMESTAMP) \
             ON DUPLICATE KEY UPDATE \
                 hits = hits + 1, \
                 matches = VALUES(matches), \
                 extended = GREATEST(extended, VALUES(extended))",
        )
        .bind(normalized_search)
        .bind(extended)
        .bind(match_count)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
