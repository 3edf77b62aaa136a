//! Query-string parameters for the search endpoint.

use serde::Deserialize;

use atlas_core::defaults::{
    DEFAULT_LIMIT, DEFAULT_QUERY, MAX_LIMIT, MIN_LIMIT, STRICT_PARSE_MIN_VERSION,
};
use atlas_core::ParseMode;

/// Remote-consultation policy requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoteMode {
    /// Local database only.
    #[default]
    Skip,
    /// Remotes when the local answer is stale or missing.
    Normal,
    /// Like normal, but remote-sourced local rows also count in pass 0.
    Extend,
    /// Always consult remotes.
    Forced,
    /// Remotes only; skip the local database.
    Only,
    /// GeoNames alone, skipping the local database.
    Geonames,
    /// Getty alone, skipping the local database.
    Getty,
}

impl RemoteMode {
    /// Parse the query value; anything unrecognized means skip.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "normal" => Self::Normal,
            "extend" => Self::Extend,
            "forced" => Self::Forced,
            "only" => Self::Only,
            "geonames" => Self::Geonames,
            "getty" => Self::Getty,
            _ => Self::Skip,
        }
    }

    /// Remote consultation is unconditional in these modes.
    pub fn forces_remote(self) -> bool {
        matches!(self, Self::Forced | Self::Only | Self::Geonames | Self::Getty)
    }

    /// The local database is bypassed in these modes.
    pub fn skips_local(self) -> bool {
        matches!(self, Self::Only | Self::Geonames | Self::Getty)
    }

    /// Whether this mode launches the GeoNames adapter.
    pub fn wants_geonames(self) -> bool {
        !matches!(self, Self::Skip | Self::Getty)
    }

    /// Whether this mode launches the Getty adapter.
    pub fn wants_getty(self) -> bool {
        !matches!(self, Self::Skip | Self::Geonames)
    }
}

fn truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "y")
}

/// Raw query parameters as they arrive.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AtlasParams {
    pub q: Option<String>,
    pub version: Option<i32>,
    pub remote: Option<String>,
    pub limit: Option<i64>,
    pub callback: Option<String>,
    pub pt: Option<String>,
    pub client: Option<String>,
    pub notrace: Option<String>,
}

/// Parameters after defaulting and clamping.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub q: String,
    pub version: i32,
    pub remote: RemoteMode,
    pub limit: usize,
    pub callback: Option<String>,
    pub plain_text: bool,
    pub client: Option<String>,
    pub no_trace: bool,
}

impl SearchOptions {
    pub fn from_params(params: &AtlasParams) -> Self {
        let version = params.version.unwrap_or(9);
        Self {
            q: params
                .q
                .as_deref()
                .filter(|q| !q.trim().is_empty())
                .unwrap_or(DEFAULT_QUERY)
                .to_string(),
            version,
            remote: params
                .remote
                .as_deref()
                .map(RemoteMode::parse)
                .unwrap_or_default(),
            limit: (params.limit.unwrap_or(DEFAULT_LIMIT as i64).max(0) as usize)
                .clamp(MIN_LIMIT, MAX_LIMIT),
            callback: params.callback.clone().filter(|c| !c.is_empty()),
            plain_text: params.pt.as_deref().map(truthy).unwrap_or(false),
            client: params.client.clone(),
            no_trace: params.notrace.as_deref().map(truthy).unwrap_or(false),
        }
    }

    /// Legacy clients parse loosely.
    pub fn parse_mode(&self) -> ParseMode {
        if self.version < STRICT_PARSE_MIN_VERSION {
            ParseMode::Loose
        } else {
            ParseMode::Strict
        }
    }
}
