//! # atlas-remote
//!
//! Adapters for the remote gazetteers the search pipeline federates with:
//! the GeoNames JSON API and the Getty Thesaurus of Geographic Names HTML
//! UI. Each adapter is an isolated async call with a hard deadline that
//! builds its result map in private state and returns it atomically — a
//! timed-out or failed adapter never poisons the other's results.

pub mod geonames;
pub mod getty;

use serde::Serialize;

use atlas_core::{LocationMap, ParsedSearchString};

pub use geonames::GeoNamesClient;
pub use getty::GettyClient;

/// What an adapter is asked to find.
#[derive(Debug, Clone, Default)]
pub struct RemoteQuery {
    pub target_city: String,
    pub target_state: String,
    pub postal_code: Option<String>,
    /// Upper bound on useful matches; adapters may fetch a little more.
    pub max_matches: usize,
    /// Suppress per-request logging (diagnostic probes).
    pub no_trace: bool,
}

impl RemoteQuery {
    /// Build an adapter query from a parsed search.
    pub fn from_parsed(parsed: &ParsedSearchString, max_matches: usize, no_trace: bool) -> Self {
        Self {
            target_city: parsed.target_city.clone(),
            target_state: parsed.target_state.clone(),
            postal_code: parsed.postal_code.clone(),
            max_matches,
            no_trace,
        }
    }
}

/// Per-adapter bookkeeping surfaced in the result's info lines.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RemoteMetrics {
    /// Items the remote source returned before filtering.
    pub raw_count: usize,
    /// Items surviving the close-match filters.
    pub matched_count: usize,
    /// Secondary (per-item) retrievals completed before the soft budget ran out.
    pub retrieved_count: usize,
    /// Queries the remote source rejected as syntactically invalid.
    pub failed_syntax: usize,
    /// Wall-clock time spent inside the adapter.
    pub elapsed_ms: u64,
}

/// One adapter's successful result.
#[derive(Debug, Default)]
pub struct RemoteSearchOutcome {
    pub locations: LocationMap,
    pub metrics: RemoteMetrics,
}

/// Both adapters' results with per-source errors; an individual failure
/// never hides the other source's data.
#[derive(Debug, Default)]
pub struct RemoteSearchResults {
    pub geonames: Option<RemoteSearchOutcome>,
    pub geonames_error: Option<String>,
    pub getty: Option<RemoteSearchOutcome>,
    pub getty_error: Option<String>,
}

impl RemoteSearchResults {
    /// Whether any adapter produced at least one location.
    pub fn has_matches(&self) -> bool {
        self.geonames
            .as_ref()
            .map(|o| !o.locations.is_empty())
            .unwrap_or(false)
            || self
                .getty
                .as_ref()
                .map(|o| !o.locations.is_empty())
                .unwrap_or(false)
    }

    /// First per-source error, if any.
    pub fn first_error(&self) -> Option<&str> {
        self.geonames_error
            .as_deref()
            .or(self.getty_error.as_deref())
    }
}
