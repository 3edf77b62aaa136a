//! Database connection pool management.
//!
//! The atlas schema lives on a single MySQL instance shared with the side
//! services, so pool sizing is the one knob operators actually turn:
//! `ATLAS_DB_MAX_CONNECTIONS` caps the pool, everything else is fixed to
//! values that suit a request-parallel search workload (short acquire
//! timeout so a saturated pool fails the request into the retry path
//! instead of queueing, bounded connection lifetime so the server's
//! `wait_timeout` never bites first).

use std::time::{Duration, Instant};

use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use tracing::{debug, info, warn};

use atlas_core::{Error, Result};

/// Pool cap when `ATLAS_DB_MAX_CONNECTIONS` is unset.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// How long one query waits for a connection before the ladder's
/// retry-once path takes over.
const ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Idle connections are dropped after this long.
const IDLE_TIMEOUT_SECS: u64 = 600;

/// Connections are recycled well inside MySQL's own `wait_timeout`.
const MAX_LIFETIME_SECS: u64 = 1800;

/// Resolve the pool cap from the environment.
fn configured_max_connections() -> u32 {
    std::env::var("ATLAS_DB_MAX_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_MAX_CONNECTIONS)
}

/// Create the MySQL connection pool for the atlas schema.
pub async fn create_pool(database_url: &str) -> Result<MySqlPool> {
    let start = Instant::now();
    let max_connections = configured_max_connections();

    let pool = MySqlPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
        .idle_timeout(Duration::from_secs(IDLE_TIMEOUT_SECS))
        .max_lifetime(Duration::from_secs(MAX_LIFETIME_SECS))
        .connect(database_url)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = "db",
        component = "pool",
        op = "established",
        max_connections,
        pool_size = pool.size(),
        pool_idle = pool.num_idle(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Database connection pool established"
    );
    Ok(pool)
}

/// Log current pool health metrics.
///
/// Called from the orchestrator's periodic housekeeping; warns when the
/// pool is fully checked out, which is the usual prelude to ladder
/// retries and acquire timeouts.
pub fn log_pool_metrics(pool: &MySqlPool) {
    let size = pool.size();
    let idle = pool.num_idle();

    debug!(
        subsystem = "db",
        component = "pool",
        op = "metrics",
        pool_size = size,
        pool_idle = idle,
        "Pool health check"
    );

    if idle == 0 && size > 0 {
        warn!(
            subsystem = "db",
            component = "pool",
            pool_size = size,
            "Connection pool has no idle connections — potential exhaustion"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::env_lock;

    #[test]
    fn pool_cap_comes_from_env() {
        let _lock = env_lock();

        std::env::remove_var("ATLAS_DB_MAX_CONNECTIONS");
        assert_eq!(configured_max_connections(), DEFAULT_MAX_CONNECTIONS);

        std::env::set_var("ATLAS_DB_MAX_CONNECTIONS", "25");
        assert_eq!(configured_max_connections(), 25);

        std::env::remove_var("ATLAS_DB_MAX_CONNECTIONS");
    }

    #[test]
    fn bad_pool_cap_falls_back_to_default() {
        let _lock = env_lock();

        for bad in ["0", "-3", "lots", ""] {
            std::env::set_var("ATLAS_DB_MAX_CONNECTIONS", bad);
            assert_eq!(
                configured_max_connections(),
                DEFAULT_MAX_CONNECTIONS,
                "value {bad:?} should fall back"
            );
        }

        std::env::remove_var("ATLAS_DB_MAX_CONNECTIONS");
    }
}
