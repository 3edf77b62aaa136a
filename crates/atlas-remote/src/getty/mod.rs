//! Getty Thesaurus of Geographic Names adapter.
//!
//! Two-phase scrape of the TGN HTML UI. The preliminary phase pages through
//! the result list (the [`parser`] state machine pulls place blocks out of
//! the HTML); the secondary phase fetches each place's full record for its
//! decimal coordinates under a soft time budget. The whole adapter races a
//! hard deadline; whatever is in hand when the soft budget expires is still
//! returned.

pub mod parser;

use std::time::{Duration, Instant};

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use regex::Regex;
use reqwest::Client;
use std::sync::LazyLock;
use tracing::{debug, trace};

use atlas_core::defaults::{
    GETTY_ALT_MERGE_CEILING, GETTY_BASE_URL, GETTY_MAX_MATCHES, GETTY_MAX_PAGES,
    GETTY_MIN_YIELD_PER_PAGE, GETTY_SOFT_TIMEOUT_SECS, GETTY_TIMEOUT_SECS, SOURCE_GETTY,
};
use atlas_core::{append_location, AtlasLocation, Error, LocationMap, Result};
use atlas_gazetteer::names::{close_match_for_city, close_match_for_state, process_place_names};
use atlas_gazetteer::GazetteerData;

use crate::{RemoteMetrics, RemoteQuery, RemoteSearchOutcome};

use parser::{GettyPageParser, PreliminaryPlace};

/// Sentinel lines the TGN UI uses in place of result blocks.
const NO_RESULTS: &str = "Your search has produced no results";
const TOO_MANY_RESULTS: &str = "Your search has produced too many results";
const INVALID_SYNTAX: &str = "Invalid search syntax";
const SERVER_ERROR: &str = "A server error has occurred";

static LAT_DECIMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Lat:\s*(-?\d+(?:\.\d+)?)\s*decimal").expect("static regex")
});
static LONG_DECIMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Long:\s*(-?\d+(?:\.\d+)?)\s*decimal").expect("static regex")
});

/// Hierarchy names that carry embedded commas and would shatter the
/// comma-split; each gets a comma-free stand-in before parsing.
const HIERARCHY_COMMA_FIXES: [(&str, &str); 3] = [
    (
        "Bonaire, Sint Eustatius, and Saba",
        "Bonaire Sint Eustatius and Saba",
    ),
    (
        "Saint Helena, Ascension, and Tristan da Cunha",
        "Saint Helena Ascension and Tristan da Cunha",
    ),
    ("Tristan da Cunha, Saint Helena", "Tristan da Cunha Saint Helena"),
];

/// Map a Getty place-kind keyword onto the core's place-type tags.
pub fn map_place_type(kind: &str) -> &'static str {
    let kind = kind.to_ascii_lowercase();
    if kind.contains("cape") {
        "T.CAPE"
    } else if kind.contains("park") {
        "L.PRK"
    } else if kind.contains("peak") {
        "T.PK"
    } else if kind.contains("county") {
        "A.ADM2"
    } else if kind.contains("atoll") || kind.contains("island") {
        "T.ISL"
    } else if kind.contains("mountain") {
        "T.MT"
    } else if kind.contains("dependent state") || kind.contains("nation") {
        "A.ADM0"
    } else if kind.contains("province") || kind.contains("state") {
        "A.ADM1"
    } else {
        "P.PPL"
    }
}

/// Split a raw hierarchy string into its administrative levels.
/// Depths: 0 = world, 1 = continent, 2 = country, 3 = state, 4 = county.
pub fn parse_hierarchy(raw: &str) -> (String, String, String, String) {
    let mut fixed = raw.to_string();
    for (broken, fix) in HIERARCHY_COMMA_FIXES {
        fixed = fixed.replace(broken, fix);
    }

    let parts: Vec<&str> = fixed.split(',').map(str::trim).collect();
    let level = |n: usize| parts.get(n).map(|s| s.to_string()).unwrap_or_default();
    (level(1), level(2), level(3), level(4))
}

/// Client for the Getty TGN servlets.
pub struct GettyClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    soft_timeout: Duration,
}

impl GettyClient {
    /// Create with explicit configuration.
    pub fn with_config(
        client: Client,
        base_url: String,
        timeout: Duration,
        soft_timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            soft_timeout,
        }
    }

    /// Create from the environment (`ATLAS_GETTY_BASE`,
    /// `ATLAS_GETTY_TIMEOUT_SECS`, `ATLAS_GETTY_SOFT_TIMEOUT_SECS`).
    ///
    /// The hard deadline default of 110 s exceeds most HTTP client defaults
    /// on purpose — the TGN UI is slow — and is configurable for healthier
    /// mirrors.
    pub fn from_env(client: Client) -> Self {
        let base_url =
            std::env::var("ATLAS_GETTY_BASE").unwrap_or_else(|_| GETTY_BASE_URL.to_string());
        let timeout = std::env::var("ATLAS_GETTY_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(GETTY_TIMEOUT_SECS);
        let soft = std::env::var("ATLAS_GETTY_SOFT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(GETTY_SOFT_TIMEOUT_SECS);
        Self::with_config(
            client,
            base_url,
            Duration::from_secs(timeout),
            Duration::from_secs(soft),
        )
    }

    /// Run one search under the hard deadline.
    pub async fn search(
        &self,
        data: &GazetteerData,
        query: &RemoteQuery,
    ) -> Result<RemoteSearchOutcome> {
        let secs = self.timeout.as_secs();
        tokio::time::timeout(self.timeout, self.search_inner(data, query))
            .await
            .map_err(|_| Error::RemoteTimeout {
                source_name: "Getty",
                secs,
            })?
    }

    async fn search_inner(
        &self,
        data: &GazetteerData,
        query: &RemoteQuery,
    ) -> Result<RemoteSearchOutcome> {
        let start = Instant::now();
        let mut metrics = RemoteMetrics::default();

        let preliminary = self.preliminary_phase(query, &mut metrics).await?;
        metrics.raw_count = preliminary.len();

        let with_coords = self
            .secondary_phase(preliminary, start, &mut metrics)
            .await;

        // Primary and alternate-name hits are reconciled separately; the
        // alternates only pad out a thin primary set.
        let mut primary = LocationMap::new();
        let mut alternates = LocationMap::new();
        for (place, lat, lon) in with_coords {
            let Some(loc) = self.place_to_location(data, query, &place, lat, lon) else {
                continue;
            };
            if place.is_alternate {
                append_location(&mut alternates, loc);
            } else {
                append_location(&mut primary, loc);
            }
        }
        if primary.len() < GETTY_ALT_MERGE_CEILING {
            for (_, loc) in alternates {
                append_location(&mut primary, loc);
            }
        }

        metrics.matched_count = primary.len();
        metrics.elapsed_ms = start.elapsed().as_millis() as u64;
        if !query.no_trace {
            debug!(
                subsystem = "remote",
                component = "getty",
                raw_count = metrics.raw_count,
                matched_count = metrics.matched_count,
                retrieved_count = metrics.retrieved_count,
                duration_ms = metrics.elapsed_ms,
                "Getty search complete"
            );
        }
        Ok(RemoteSearchOutcome {
            locations: primary,
            metrics,
        })
    }

    /// Page through the result list until one of the stop conditions hits:
    /// page cap, match cap, a yield collapse, or no further pages.
    async fn preliminary_phase(
        &self,
        query: &RemoteQuery,
        metrics: &mut RemoteMetrics,
    ) -> Result<Vec<PreliminaryPlace>> {
        let find = utf8_percent_encode(query.target_city.trim(), NON_ALPHANUMERIC).to_string();
        let nation = utf8_percent_encode(query.target_state.trim(), NON_ALPHANUMERIC).to_string();
        let mut places: Vec<PreliminaryPlace> = Vec::new();

        for page in 1..=GETTY_MAX_PAGES {
            let url = format!(
                "{}/TGNServlet?english=Y&find={}&place=&nation={}&prev_page={}&page={}",
                self.base_url,
                find,
                nation,
                page.saturating_sub(1),
                page
            );
            let response = self.client.get(&url).send().await?;
            if !response.status().is_success() {
                return Err(Error::RemoteProtocol(format!(
                    "Getty HTTP {}",
                    response.status().as_u16()
                )));
            }
            let body = response.text().await?;

            if body.contains(SERVER_ERROR) {
                return Err(Error::RemoteProtocol("Getty server error".to_string()));
            }
            if body.contains(INVALID_SYNTAX) {
                metrics.failed_syntax += 1;
                break;
            }
            if body.contains(NO_RESULTS) {
                break;
            }
            if body.contains(TOO_MANY_RESULTS) {
                debug!(
                    subsystem = "remote",
                    component = "getty",
                    "Getty reported too many results; keeping what is parsed"
                );
            }

            let page_places = GettyPageParser::parse(&body);
            let has_more = body.contains("subjectid=") && page_places.len() >= GETTY_MIN_YIELD_PER_PAGE;
            places.extend(page_places);

            trace!(
                subsystem = "remote",
                component = "getty",
                op = "preliminary",
                page,
                raw_count = places.len(),
                "Getty page parsed"
            );

            if places.len() >= GETTY_MAX_MATCHES {
                places.truncate(GETTY_MAX_MATCHES);
                break;
            }
            // A page yielding below the per-page floor means the result list
            // has run dry.
            if places.len() < GETTY_MIN_YIELD_PER_PAGE * page as usize || !has_more {
                break;
            }
        }

        Ok(places)
    }

    /// Fetch each place's full record for decimal coordinates until the soft
    /// budget is exhausted; remaining places keep zeroed coordinates.
    async fn secondary_phase(
        &self,
        places: Vec<PreliminaryPlace>,
        started: Instant,
        metrics: &mut RemoteMetrics,
    ) -> Vec<(PreliminaryPlace, f64, f64)> {
        let mut out = Vec::with_capacity(places.len());

        for place in places {
            if started.elapsed() >= self.soft_timeout {
                trace!(
                    subsystem = "remote",
                    component = "getty",
                    op = "secondary",
                    retrieved_count = metrics.retrieved_count,
                    "Soft budget exhausted; returning preliminary matches"
                );
                out.push((place, 0.0, 0.0));
                continue;
            }

            let url = format!(
                "{}/TGNFullDisplay?english=Y&subjectid={}",
                self.base_url, place.subject_id
            );
            let coords = match self.client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => match resp.text().await {
                    Ok(body) => extract_coordinates(&body),
                    Err(_) => None,
                },
                _ => None,
            };

            match coords {
                Some((lat, lon)) => {
                    metrics.retrieved_count += 1;
                    out.push((place, lat, lon));
                }
                None => out.push((place, 0.0, 0.0)),
            }
        }

        out
    }

    fn place_to_location(
        &self,
        data: &GazetteerData,
        query: &RemoteQuery,
        place: &PreliminaryPlace,
        lat: f64,
        lon: f64,
    ) -> Option<AtlasLocation> {
        let (_continent, country, state, county) = parse_hierarchy(&place.hierarchy);

        let mut loc = AtlasLocation {
            city: place.name.clone(),
            county,
            state,
            country,
            latitude: lat,
            longitude: lon,
            place_type: map_place_type(&place.place_kind).to_string(),
            source: SOURCE_GETTY,
            geoname_id: place.subject_id,
            rank: if place.place_kind.contains("inhabited") { 1 } else { 0 },
            ..Default::default()
        };

        if !process_place_names(data, &mut loc, true) {
            return None;
        }
        if !close_match_for_city(&query.target_city, &loc.city, &loc.variant) {
            return None;
        }
        if !close_match_for_state(data, &query.target_state, &loc.state, &loc.country) {
            return None;
        }
        Some(loc)
    }
}

/// Pull the decimal latitude/longitude pair off a full-record page.
fn extract_coordinates(body: &str) -> Option<(f64, f64)> {
    let lat = LAT_DECIMAL.captures(body)?[1].parse().ok()?;
    let lon = LONG_DECIMAL.captures(body)?[1].parse().ok()?;
    Some((lat, lon))
}
