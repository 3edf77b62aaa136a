//! GeoNames adapter.
//!
//! One JSON call per search: `searchJSON` for city queries (with a feature
//! code allow-list) or `postalCodeSearchJSON` for postal queries. The whole
//! call races a hard deadline; protocol problems (non-200, error payloads,
//! unparseable bodies) are reported per-source and never sink the request.

use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use atlas_core::defaults::{
    GEONAMES_BASE_URL, GEONAMES_TIMEOUT_SECS, GEONAMES_USERNAME, METROPOLIS_POPULATION,
    SOURCE_GEONAMES_GENERAL, SOURCE_GEONAMES_POSTAL, ZIP_RANK,
};
use atlas_core::{append_location, AtlasLocation, Error, LocationMap, Result};
use atlas_gazetteer::names::{close_match_for_city, close_match_for_state, process_place_names};
use atlas_gazetteer::GazetteerData;

use crate::{RemoteMetrics, RemoteQuery, RemoteSearchOutcome};

/// Feature codes worth resolving: populated places and capitals, admin
/// divisions, and the terrain features the astronomy client cares about
/// (peaks, capes, islands, observatories, air bases).
const FEATURE_CODES: [&str; 28] = [
    "PPL", "PPLA", "PPLA2", "PPLA3", "PPLA4", "PPLC", "PPLG", "PPLL", "PPLR", "PPLS", "PPLW",
    "PPLX", "ADM0", "ADM1", "ADM2", "ADM3", "CAPE", "ISL", "ISLS", "ATOL", "LK", "MT", "PK",
    "PRK", "OBS", "OBPT", "AIRB", "MILB",
];

static LEADING_MT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^mt\b\.?\s*").expect("static regex"));

/// GeoNames returns numbers as strings in several fields; accept either.
fn flexible_f64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Text(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    geonames: Vec<SearchItem>,
    status: Option<StatusPayload>,
}

#[derive(Debug, Deserialize)]
struct StatusPayload {
    message: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct SearchItem {
    name: String,
    admin_code1: String,
    admin_name1: String,
    admin_name2: String,
    country_code: String,
    continent_code: String,
    #[serde(deserialize_with = "flexible_f64")]
    lat: f64,
    #[serde(deserialize_with = "flexible_f64")]
    lng: f64,
    elevation: Option<f64>,
    fcl: String,
    fcode: String,
    population: i64,
    geoname_id: i64,
    timezone: Option<TimezonePayload>,
}

#[derive(Debug, Deserialize, Default)]
struct TimezonePayload {
    #[serde(rename = "timeZoneId", default)]
    time_zone_id: String,
}

#[derive(Debug, Deserialize)]
struct PostalResponse {
    #[serde(rename = "postalCodes", default)]
    postal_codes: Vec<PostalItem>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct PostalItem {
    place_name: String,
    admin_code1: String,
    admin_name2: String,
    country_code: String,
    postal_code: String,
    #[serde(deserialize_with = "flexible_f64")]
    lat: f64,
    #[serde(deserialize_with = "flexible_f64")]
    lng: f64,
}

/// Client for the GeoNames JSON API.
pub struct GeoNamesClient {
    client: Client,
    base_url: String,
    username: String,
    timeout: Duration,
}

impl GeoNamesClient {
    /// Create with explicit configuration.
    pub fn with_config(client: Client, base_url: String, username: String, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            timeout,
        }
    }

    /// Create from the environment (`ATLAS_GEONAMES_BASE`,
    /// `ATLAS_GEONAMES_USER`, `ATLAS_GEONAMES_TIMEOUT_SECS`).
    pub fn from_env(client: Client) -> Self {
        let base_url =
            std::env::var("ATLAS_GEONAMES_BASE").unwrap_or_else(|_| GEONAMES_BASE_URL.to_string());
        let username =
            std::env::var("ATLAS_GEONAMES_USER").unwrap_or_else(|_| GEONAMES_USERNAME.to_string());
        let timeout = std::env::var("ATLAS_GEONAMES_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(GEONAMES_TIMEOUT_SECS);
        Self::with_config(client, base_url, username, Duration::from_secs(timeout))
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
                source_name: "GeoNames",
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
        let mut locations = LocationMap::new();

        if let Some(postal) = &query.postal_code {
            let url = format!("{}/postalCodeSearchJSON", self.base_url);
            let response = self
                .client
                .get(&url)
                .query(&[
                    ("postalcode", postal.as_str()),
                    ("maxRows", "20"),
                    ("username", self.username.as_str()),
                ])
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(Error::RemoteProtocol(format!(
                    "GeoNames HTTP {}",
                    response.status().as_u16()
                )));
            }
            let payload: PostalResponse = response
                .json()
                .await
                .map_err(|e| Error::RemoteProtocol(format!("GeoNames postal JSON: {e}")))?;

            metrics.raw_count = payload.postal_codes.len();
            for item in payload.postal_codes {
                if let Some(loc) = self.postal_to_location(data, item) {
                    append_location(&mut locations, loc);
                }
            }
        } else {
            let city = LEADING_MT
                .replace(query.target_city.trim(), "mount ")
                .trim()
                .to_string();
            let max_rows = query.max_matches.clamp(10, 100);
            let url = format!("{}/searchJSON", self.base_url);
            let mut params: Vec<(&str, String)> = vec![
                ("name_startsWith", city),
                ("maxRows", max_rows.to_string()),
                ("style", "FULL".to_string()),
                ("username", self.username.clone()),
            ];
            for code in FEATURE_CODES {
                params.push(("featureCode", code.to_string()));
            }

            let response = self.client.get(&url).query(&params).send().await?;
            if !response.status().is_success() {
                return Err(Error::RemoteProtocol(format!(
                    "GeoNames HTTP {}",
                    response.status().as_u16()
                )));
            }
            let payload: SearchResponse = response
                .json()
                .await
                .map_err(|e| Error::RemoteProtocol(format!("GeoNames JSON: {e}")))?;

            if let Some(status) = payload.status {
                return Err(Error::RemoteProtocol(format!("GeoNames: {}", status.message)));
            }

            metrics.raw_count = payload.geonames.len();
            for item in payload.geonames {
                if let Some(loc) = self.item_to_location(data, query, item) {
                    append_location(&mut locations, loc);
                }
            }
        }

        metrics.matched_count = locations.len();
        metrics.elapsed_ms = start.elapsed().as_millis() as u64;
        if !query.no_trace {
            debug!(
                subsystem = "remote",
                component = "geonames",
                raw_count = metrics.raw_count,
                matched_count = metrics.matched_count,
                duration_ms = metrics.elapsed_ms,
                "GeoNames search complete"
            );
        }
        Ok(RemoteSearchOutcome { locations, metrics })
    }

    fn item_to_location(
        &self,
        data: &GazetteerData,
        query: &RemoteQuery,
        item: SearchItem,
    ) -> Option<AtlasLocation> {
        let country = if item.country_code.is_empty() && item.continent_code == "AN" {
            "ATA".to_string()
        } else {
            data.code3_for_code2(&item.country_code)
                .map(str::to_string)
                .unwrap_or_else(|| item.country_code.clone())
        };
        let state_keyed = country == "USA" || country == "CAN";

        let mut loc = AtlasLocation {
            city: item.name,
            county: item.admin_name2,
            state: if state_keyed {
                item.admin_code1
            } else {
                item.admin_name1
            },
            country,
            latitude: item.lat,
            longitude: item.lng,
            elevation: item.elevation.unwrap_or(0.0),
            zone: item.timezone.map(|t| t.time_zone_id).unwrap_or_default(),
            place_type: format!("{}.{}", item.fcl, item.fcode),
            source: SOURCE_GEONAMES_GENERAL,
            geoname_id: item.geoname_id,
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

        let mut rank = if item.fcl == "P" || item.fcl == "A" { 1 } else { 0 };
        if item.fcode == "PPLC" {
            rank += 1;
        }
        if item.population >= 1 {
            rank += 1;
        }
        if item.population >= METROPOLIS_POPULATION {
            rank += 1;
        }
        loc.rank = rank.min(4);

        Some(loc)
    }

    fn postal_to_location(&self, data: &GazetteerData, item: PostalItem) -> Option<AtlasLocation> {
        let country = data
            .code3_for_code2(&item.country_code)
            .map(str::to_string)
            .unwrap_or_else(|| item.country_code.clone());

        let mut loc = AtlasLocation {
            city: item.place_name,
            county: item.admin_name2,
            state: item.admin_code1,
            country,
            latitude: item.lat,
            longitude: item.lng,
            zip: item.postal_code,
            rank: ZIP_RANK,
            place_type: "P.PPL".to_string(),
            source: SOURCE_GEONAMES_POSTAL,
            ..Default::default()
        };

        if !process_place_names(data, &mut loc, true) {
            warn!(
                subsystem = "remote",
                component = "geonames",
                "Postal result rejected by name processing"
            );
            return None;
        }
        Some(loc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_mt_expands_to_mount() {
        assert_eq!(LEADING_MT.replace("Mt Washington", "mount "), "mount Washington");
        assert_eq!(LEADING_MT.replace("mt. shasta", "mount "), "mount shasta");
        // Not at a word boundary start: untouched.
        assert_eq!(LEADING_MT.replace("Mountain View", "mount "), "Mountain View");
    }

    #[test]
    fn flexible_f64_accepts_both_shapes() {
        #[derive(Deserialize)]
        struct Probe {
            #[serde(deserialize_with = "flexible_f64")]
            v: f64,
        }
        let from_string: Probe = serde_json::from_str(r#"{"v": "42.76"}"#).unwrap();
        assert!((from_string.v - 42.76).abs() < 1e-9);
        let from_number: Probe = serde_json::from_str(r#"{"v": 42.76}"#).unwrap();
        assert!((from_number.v - 42.76).abs() < 1e-9);
    }

    #[test]
    fn feature_codes_cover_the_essentials() {
        for required in ["PPL", "PPLC", "ADM1", "PK", "ISL", "OBS"] {
            assert!(FEATURE_CODES.contains(&required), "missing {required}");
        }
    }
}
