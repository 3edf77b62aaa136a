//! Centralized default constants for the atlas service.
//!
//! **This module is the single source of truth** for shared default values.
//! All crates reference these constants instead of defining their own magic
//! numbers. Organized by domain area.

// =============================================================================
// RANKING
// =============================================================================

/// Rank pinned onto postal-code matches. Highest possible rank.
pub const ZIP_RANK: i32 = 9;

/// Ceiling for every non-postal rank after stage adjustment.
pub const MAX_NON_POSTAL_RANK: i32 = 8;

/// Population threshold granting the top remote rank bonus.
pub const METROPOLIS_POPULATION: i64 = 1_000_000;

// =============================================================================
// SOURCES
// =============================================================================

/// Sources at or above this value came from a remote gazetteer.
/// Local (authoritative) sources are below it.
pub const MIN_EXTERNAL_SOURCE: i32 = 100;

/// GeoNames postal-code lookup.
pub const SOURCE_GEONAMES_POSTAL: i32 = 101;

/// GeoNames general feature search.
pub const SOURCE_GEONAMES_GENERAL: i32 = 103;

/// Getty Thesaurus of Geographic Names scrape.
pub const SOURCE_GETTY: i32 = 104;

// =============================================================================
// MATCHING / DEDUP
// =============================================================================

/// Two candidates closer than this are considered the same site during
/// dedup and writeback reconciliation.
pub const SAME_SITE_KM: f64 = 10.0;

/// Coordinate equality tolerance, in degrees, for close-match checks.
pub const COORD_EPSILON: f64 = 1e-4;

/// Simplified-name keys are truncated to this many characters.
pub const MAX_KEY_LENGTH: usize = 40;

/// The local ladder accumulates at most this multiple of the requested
/// match count before returning.
pub const LADDER_OVERFETCH_FACTOR: usize = 4;

// =============================================================================
// REMOTE ADAPTERS
// =============================================================================

/// Hard deadline for a GeoNames call, in seconds.
pub const GEONAMES_TIMEOUT_SECS: u64 = 20;

/// Default GeoNames API username.
pub const GEONAMES_USERNAME: &str = "skyview";

/// Default GeoNames API base URL.
pub const GEONAMES_BASE_URL: &str = "http://api.geonames.org";

/// Hard deadline for the whole Getty scrape, in seconds.
/// Longer than typical HTTP client defaults; override via
/// `ATLAS_GETTY_TIMEOUT_SECS` when the upstream is healthier than that.
pub const GETTY_TIMEOUT_SECS: u64 = 110;

/// Soft budget for the Getty secondary (per-item) retrieval loop, in seconds.
/// When exhausted, whatever coordinates are in hand are returned.
pub const GETTY_SOFT_TIMEOUT_SECS: u64 = 40;

/// Default Getty TGN base URL.
pub const GETTY_BASE_URL: &str = "http://www.getty.edu/vow";

/// Getty preliminary scrape stops after this many result pages.
pub const GETTY_MAX_PAGES: u32 = 6;

/// Getty preliminary scrape stops after this many matches.
pub const GETTY_MAX_MATCHES: usize = 50;

/// Paging also stops when the cumulative match count after page *n*
/// falls below `GETTY_MIN_YIELD_PER_PAGE * n`.
pub const GETTY_MIN_YIELD_PER_PAGE: usize = 12;

/// Alternate-name Getty hits are merged only while the primary map holds
/// fewer entries than this.
pub const GETTY_ALT_MERGE_CEILING: usize = 25;

// =============================================================================
// SEARCH LOG / CACHE COHERENCE
// =============================================================================

/// A logged search younger than this many months can satisfy a request
/// without consulting remote sources.
pub const SEARCH_RECENCY_MONTHS: i32 = 12;

/// Gazetteer dictionaries older than this many hours are re-initialized
/// (best-effort) before serving a request.
pub const GAZETTEER_REFRESH_HOURS: i64 = 24;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 4400;

/// Default result limit when the client does not send one.
pub const DEFAULT_LIMIT: usize = 75;

/// Result limit clamp bounds.
pub const MIN_LIMIT: usize = 1;
pub const MAX_LIMIT: usize = 500;

/// Default query when the client does not send one.
pub const DEFAULT_QUERY: &str = "Nashua, NH";

/// Client protocol versions below this parse in loose mode.
pub const STRICT_PARSE_MIN_VERSION: i32 = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_bounds_are_consistent() {
        const {
            assert!(MAX_NON_POSTAL_RANK == ZIP_RANK - 1);
            assert!(ZIP_RANK <= 9);
        }
    }

    #[test]
    fn source_taxonomy_ordered() {
        const {
            assert!(SOURCE_GEONAMES_POSTAL >= MIN_EXTERNAL_SOURCE);
            assert!(SOURCE_GEONAMES_POSTAL < SOURCE_GEONAMES_GENERAL);
            assert!(SOURCE_GEONAMES_GENERAL < SOURCE_GETTY);
        }
    }

    #[test]
    fn getty_budgets_nested() {
        const {
            assert!(GETTY_SOFT_TIMEOUT_SECS < GETTY_TIMEOUT_SECS);
            assert!(GEONAMES_TIMEOUT_SECS < GETTY_TIMEOUT_SECS);
        }
    }

    #[test]
    fn limit_bounds_ordered() {
        const {
            assert!(MIN_LIMIT <= DEFAULT_LIMIT);
            assert!(DEFAULT_LIMIT <= MAX_LIMIT);
        }
    }
}
