//! The search orchestrator.
//!
//! Sequences the whole pipeline for one request: parse, coherence check,
//! local ladder, parallel remote adapters, merge/dedup, zone fill,
//! writeback, and the search log. Every leg is allowed to fail on its own;
//! partial data always beats no data.

use std::sync::Arc;
use std::time::Instant;

use chrono::Duration as ChronoDuration;
use tracing::{debug, info, warn};

use atlas_core::defaults::GAZETTEER_REFRESH_HOURS;
use atlas_core::{LocationMap, ParsedSearchString, SearchResult};
use atlas_db::Database;
use atlas_gazetteer::parse::parse_search_string;
use atlas_gazetteer::{Gazetteer, GazetteerData};
use atlas_remote::{GeoNamesClient, GettyClient, RemoteQuery, RemoteSearchResults};
use atlas_search::merge_and_dedup;

use crate::params::{RemoteMode, SearchOptions};
use crate::suggestions::suggestions_for;

/// Everything a request handler needs, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub gazetteer: Arc<Gazetteer>,
    pub geonames: Arc<GeoNamesClient>,
    pub getty: Arc<GettyClient>,
    /// Shared HTTP client for gazetteer re-init fallbacks.
    pub http: reqwest::Client,
}

/// Run one search end to end.
pub async fn run_search(state: &AppState, options: &SearchOptions) -> SearchResult {
    let start = Instant::now();

    // Periodic housekeeping rides on the gazetteer's staleness check:
    // refresh the dictionaries best-effort and take a pool health reading
    // while we are at it.
    if state.gazetteer.age() > ChronoDuration::hours(GAZETTEER_REFRESH_HOURS) {
        atlas_db::log_pool_metrics(&state.db.pool);
        let _ = state.gazetteer.reinit(&state.http).await;
    }
    let data = state.gazetteer.data();

    let parsed = parse_search_string(&data, &options.q, options.parse_mode());
    let mut result = SearchResult {
        original_search: parsed.actual_search.clone(),
        normalized_search: parsed.normalized_search.clone(),
        ..Default::default()
    };

    let mut db_error: Option<String> = None;

    // Coherence: is this normalized query fresh enough to skip remotes?
    // An extended request is only satisfied by a stored extended row.
    let extended = options.remote != RemoteMode::Skip;
    let recent = match state
        .db
        .search_log
        .has_search_been_done_recently(&parsed.normalized_search, extended)
        .await
    {
        Ok(recent) => recent,
        Err(e) => {
            warn!(
                subsystem = "api",
                component = "orchestrator",
                error = %e,
                "Search-log lookup failed; treating query as not recent"
            );
            false
        }
    };

    let consult_remote =
        options.remote.forces_remote() || (options.remote != RemoteMode::Skip && !recent);

    // Local leg. The ladder's pass-0 remote-row policy follows the extend
    // family of modes.
    let ladder_extended = matches!(
        options.remote,
        RemoteMode::Extend | RemoteMode::Forced | RemoteMode::Only
    );
    let mut local_map = LocationMap::new();
    if !options.remote.skips_local() {
        match state
            .db
            .atlas
            .search(&data, &parsed, ladder_extended, options.limit)
            .await
        {
            Ok(map) => local_map = map,
            Err(e) => {
                db_error = Some(e.to_string());
                warn!(
                    subsystem = "api",
                    component = "orchestrator",
                    error = %e,
                    "Local search failed after retry; continuing with remotes only"
                );
            }
        }
    }
    let db_matched_only_by_sound =
        !local_map.is_empty() && local_map.values().all(|l| l.matched_by_sound);

    // Remote legs, in parallel, all-settled. Getty adds nothing to postal
    // lookups and is suppressed for them.
    let mut remotes = RemoteSearchResults::default();
    if consult_remote {
        remotes = run_remote_legs(state, &data, &parsed, options).await;

        // A sound-only local result set is weaker evidence than any remote
        // hit; the remotes win outright.
        if remotes.has_matches() && db_matched_only_by_sound {
            debug!(
                subsystem = "api",
                component = "orchestrator",
                "Discarding sound-only local matches in favor of remote results"
            );
            local_map.clear();
        }
    }

    // Remote results usually lack a zone; the zone_lookup table fills the
    // gap before dedup so zone-ambiguity resolution can run.
    if db_error.is_none() {
        if let Some(outcome) = remotes.geonames.as_mut() {
            let _ = state.db.zones.fill_zones(&mut outcome.locations).await;
        }
        if let Some(outcome) = remotes.getty.as_mut() {
            let _ = state.db.zones.fill_zones(&mut outcome.locations).await;
        }
    }

    // Merge, dedup, truncate.
    let mut maps = vec![local_map];
    if let Some(outcome) = &remotes.geonames {
        maps.push(outcome.locations.clone());
    }
    if let Some(outcome) = &remotes.getty {
        maps.push(outcome.locations.clone());
    }
    let dedup = merge_and_dedup(maps, options.limit);

    let mut matches = dedup.matches;
    result.limit_reached = matches.len() > options.limit;
    matches.truncate(options.limit);

    // Warnings and info lines.
    for warning in &dedup.warnings {
        result.add_warning(warning);
        if !options.no_trace {
            state.db.service_log.append(true, warning).await;
        }
    }
    if data.is_celestial(&parsed.target_city) {
        result.add_warning(&format!(
            "\"{}\" is a celestial object, not a place on Earth.",
            parsed.target_city
        ));
    }
    if remotes.geonames_error.is_some() || remotes.getty_error.is_some() {
        result.add_warning("Supplementary data temporarily unavailable.");
    }
    for line in suggestions_for(
        &data,
        &options.q,
        &parsed,
        options.parse_mode(),
        matches.len(),
    ) {
        result.add_warning(&line);
    }

    if let Some(outcome) = &remotes.geonames {
        result.add_info(&format!(
            "geonames: raw={}, matched={}, elapsed={} ms",
            outcome.metrics.raw_count, outcome.metrics.matched_count, outcome.metrics.elapsed_ms
        ));
    }
    if let Some(outcome) = &remotes.getty {
        result.add_info(&format!(
            "getty: raw={}, matched={}, retrieved={}, elapsed={} ms",
            outcome.metrics.raw_count,
            outcome.metrics.matched_count,
            outcome.metrics.retrieved_count,
            outcome.metrics.elapsed_ms
        ));
    }

    // Error surface: the DB error wins (remote errors are already warnings).
    if let Some(e) = db_error.clone() {
        result.error = Some(e);
    } else if let Some(e) = remotes.first_error() {
        // Per-source detail for the log; the user-facing line is above.
        debug!(
            subsystem = "api",
            component = "orchestrator",
            error = e,
            "Remote source error"
        );
    }

    // Writeback, then the log, once the final match count is known.
    if db_error.is_none() && !options.no_trace {
        if let Err(e) = state.db.writeback.record_locations(&matches).await {
            warn!(
                subsystem = "api",
                component = "writeback",
                error = %e,
                "Writeback failed"
            );
        }
        if let Err(e) = state
            .db
            .search_log
            .log_search(&parsed.normalized_search, consult_remote, matches.len() as i64)
            .await
        {
            warn!(
                subsystem = "api",
                component = "search_log",
                error = %e,
                "Search log update failed"
            );
        }
    }

    result.count = matches.len();
    result.matches = matches;
    result.time = start.elapsed().as_millis() as u64;

    info!(
        subsystem = "api",
        component = "orchestrator",
        op = "search",
        query = %options.q,
        normalized = %result.normalized_search,
        remote_mode = ?options.remote,
        result_count = result.count,
        duration_ms = result.time,
        client = options.client.as_deref().unwrap_or(""),
        "Search complete"
    );

    result
}

/// Launch the enabled adapters concurrently and gather their results with
/// all-settled semantics: each leg's error is recorded beside the other
/// leg's data.
async fn run_remote_legs(
    state: &AppState,
    data: &Arc<GazetteerData>,
    parsed: &ParsedSearchString,
    options: &SearchOptions,
) -> RemoteSearchResults {
    let query = RemoteQuery::from_parsed(parsed, options.limit, options.no_trace);

    let geonames_enabled = options.remote.wants_geonames();
    let getty_enabled = options.remote.wants_getty() && parsed.postal_code.is_none();

    let geonames_leg = async {
        if geonames_enabled {
            Some(state.geonames.search(data, &query).await)
        } else {
            None
        }
    };
    let getty_leg = async {
        if getty_enabled {
            Some(state.getty.search(data, &query).await)
        } else {
            None
        }
    };

    let (geonames_settled, getty_settled) = tokio::join!(geonames_leg, getty_leg);

    let mut results = RemoteSearchResults::default();
    match geonames_settled {
        Some(Ok(outcome)) => results.geonames = Some(outcome),
        Some(Err(e)) => {
            warn!(
                subsystem = "remote",
                component = "geonames",
                error = %e,
                "GeoNames leg failed"
            );
            results.geonames_error = Some(e.to_string());
        }
        None => {}
    }
    match getty_settled {
        Some(Ok(outcome)) => results.getty = Some(outcome),
        Some(Err(e)) => {
            warn!(
                subsystem = "remote",
                component = "getty",
                error = %e,
                "Getty leg failed"
            );
            results.getty_error = Some(e.to_string());
        }
        None => {}
    }
    results
}
