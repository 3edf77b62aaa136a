//! Structured logging schema and field name constants for the atlas service.
//!
//! All crates use these constants for consistent structured logging fields so
//! log aggregation tools can query by standardized names across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, re-init), per-request completions |
//! | DEBUG | Decision points (ladder stage, remote policy, dedup verdicts) |
//! | TRACE | Per-row / per-page iteration inside search and scrape loops |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated from the HTTP layer. Format: UUIDv7.
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "db", "remote", "gazetteer", "dedup"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "ladder", "geonames", "getty", "search_log", "writeback", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "search", "preliminary", "secondary", "recency", "upsert"
pub const OPERATION: &str = "op";

// ─── Search fields ─────────────────────────────────────────────────────────

/// Raw query text as received.
pub const QUERY: &str = "query";

/// Normalized search key used for log/coherence lookups.
pub const NORMALIZED: &str = "normalized";

/// Ladder stage name ("exact", "exact_alt", "starts_with", "sounds_like").
pub const STAGE: &str = "stage";

/// Ladder pass index (0 = ranked only, 1 = all).
pub const PASS: &str = "pass";

/// Remote mode requested by the client.
pub const REMOTE_MODE: &str = "remote_mode";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a search or query.
pub const RESULT_COUNT: &str = "result_count";

/// Number of raw candidate items before filtering.
pub const RAW_COUNT: &str = "raw_count";

/// Number of candidates surviving filters.
pub const MATCHED_COUNT: &str = "matched_count";

/// Scrape page number.
pub const PAGE: &str = "page";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

/// Database table affected.
pub const DB_TABLE: &str = "db_table";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
