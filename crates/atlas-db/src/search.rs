//! The local match ladder.
//!
//! Four progressively looser strategies over two passes: exact key (or
//! postal code), alternate-name, key-prefix range, and soundex. Pass 0
//! restricts to ranked (notable) places; pass 1 takes anything. A row's
//! `item_no` is examined at most once per search.

use std::collections::HashSet;

use sqlx::mysql::MySqlPool;
use sqlx::FromRow;
use tracing::{debug, trace, warn};

use atlas_core::defaults::{
    LADDER_OVERFETCH_FACTOR, MAX_NON_POSTAL_RANK, MIN_EXTERNAL_SOURCE, ZIP_RANK,
};
use atlas_core::{append_location, simplify, AtlasLocation, LocationMap, ParsedSearchString, Result};
use atlas_gazetteer::names::close_match_for_state;
use atlas_gazetteer::GazetteerData;

/// Column list shared by every `atlas2` select; nullable columns are
/// coalesced so row mapping stays total.
const ATLAS_COLUMNS: &str = "item_no, key_name, COALESCE(variant, '') AS variant, name, \
     COALESCE(admin2, '') AS admin2, COALESCE(admin1, '') AS admin1, country, \
     latitude, longitude, COALESCE(elevation, 0) AS elevation, \
     COALESCE(time_zone, '') AS time_zone, COALESCE(postal_code, '') AS postal_code, \
     `rank`, COALESCE(feature_type, '') AS feature_type, COALESCE(sound, '') AS sound, \
     source, COALESCE(geonames_id, 0) AS geonames_id";

#[derive(Debug, FromRow)]
pub(crate) struct AtlasRow {
    pub item_no: i64,
    #[allow(dead_code)]
    pub key_name: String,
    pub variant: String,
    pub name: String,
    pub admin2: String,
    pub admin1: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    pub time_zone: String,
    pub postal_code: String,
    pub rank: i32,
    pub feature_type: String,
    #[allow(dead_code)]
    pub sound: String,
    pub source: i32,
    pub geonames_id: i64,
}

#[derive(Debug, FromRow)]
struct AltNameRow {
    #[allow(dead_code)]
    alt_key_name: String,
    atlas_key_name: String,
    alt_name: String,
    misspelling: String,
    specific_item2: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    Exact,
    ExactAlt,
    StartsWith,
    SoundsLike,
}

impl Stage {
    fn name(self) -> &'static str {
        match self {
            Stage::Exact => "exact",
            Stage::ExactAlt => "exact_alt",
            Stage::StartsWith => "starts_with",
            Stage::SoundsLike => "sounds_like",
        }
    }

    fn rank_adjust(self) -> i32 {
        match self {
            Stage::Exact => 1,
            Stage::SoundsLike => -1,
            _ => 0,
        }
    }
}

/// Repository for the indexed place tables.
pub struct AtlasRepository {
    pool: MySqlPool,
}

impl AtlasRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Run the match ladder. A DB failure is retried once against a fresh
    /// connection; the second failure propagates as a recoverable error so
    /// remote results can still stand.
    pub async fn search(
        &self,
        data: &GazetteerData,
        parsed: &ParsedSearchString,
        extended: bool,
        max_matches: usize,
    ) -> Result<LocationMap> {
        match self.search_attempt(data, parsed, extended, max_matches).await {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!(
                    subsystem = "db",
                    component = "ladder",
                    error = %e,
                    "Local search failed; retrying once on a fresh connection"
                );
                self.search_attempt(data, parsed, extended, max_matches).await
            }
        }
    }

    async fn search_attempt(
        &self,
        data: &GazetteerData,
        parsed: &ParsedSearchString,
        extended: bool,
        max_matches: usize,
    ) -> Result<LocationMap> {
        let key = simplify(&parsed.target_city);
        let city_has_digit = parsed.target_city.chars().any(|c| c.is_ascii_digit());
        let cap = LADDER_OVERFETCH_FACTOR * max_matches.max(1);

        let mut examined: HashSet<i64> = HashSet::new();
        let mut matches = LocationMap::new();

        'ladder: for pass in 0..2u8 {
            let ranked_only = pass == 0;

            for stage in [Stage::Exact, Stage::ExactAlt, Stage::StartsWith, Stage::SoundsLike] {
                if stage == Stage::SoundsLike && (city_has_digit || parsed.is_postal()) {
                    continue;
                }
                if parsed.is_postal() && stage != Stage::Exact {
                    continue;
                }

                let rows = self.stage_rows(stage, parsed, &key, ranked_only).await?;
                trace!(
                    subsystem = "db",
                    component = "ladder",
                    stage = stage.name(),
                    pass,
                    raw_count = rows.len(),
                    "Ladder stage fetched"
                );

                for (row, alt_display) in rows {
                    if examined.contains(&row.item_no) {
                        continue;
                    }
                    if ranked_only && row.source >= MIN_EXTERNAL_SOURCE && !extended {
                        // Remote-sourced rows only count in pass 0 for
                        // extended searches; leave them for pass 1.
                        continue;
                    }
                    examined.insert(row.item_no);

                    if !close_match_for_state(data, &parsed.target_state, &row.admin1, &row.country)
                    {
                        continue;
                    }

                    let loc = build_location(data, row, alt_display, stage, parsed);
                    append_location(&mut matches, loc);

                    if matches.len() >= cap {
                        break 'ladder;
                    }
                }

                // Early exits: postal mode resolves at the exact stage
                // (falling through to the unranked pass only when empty);
                // a ranked pass with anything in hand is already good
                // enough; prefix matches make soundex pointless.
                if parsed.is_postal() {
                    if matches.is_empty() {
                        break; // next pass, exact stage again
                    }
                    break 'ladder;
                }
                if (ranked_only || stage >= Stage::StartsWith) && !matches.is_empty() {
                    break 'ladder;
                }
            }
        }

        debug!(
            subsystem = "db",
            component = "ladder",
            op = "search",
            normalized = %parsed.normalized_search,
            result_count = matches.len(),
            "Local search complete"
        );
        Ok(matches)
    }

    /// Fetch candidate rows for one ladder stage, paired with the alternate
    /// display name when the match came through `atlas_alt_names`.
    async fn stage_rows(
        &self,
        stage: Stage,
        parsed: &ParsedSearchString,
        key: &str,
        ranked_only: bool,
    ) -> Result<Vec<(AtlasRow, Option<String>)>> {
        let rank_cond = if ranked_only { " AND `rank` > 0" } else { "" };

        let rows: Vec<(AtlasRow, Option<String>)> = match stage {
            Stage::Exact => {
                let sql = if parsed.is_postal() {
                    format!("SELECT {ATLAS_COLUMNS} FROM atlas2 WHERE postal_code = ?{rank_cond}")
                } else {
                    format!("SELECT {ATLAS_COLUMNS} FROM atlas2 WHERE key_name = ?{rank_cond}")
                };
                let bind = match &parsed.postal_code {
                    Some(postal) => postal.as_str(),
                    None => key,
                };
                sqlx::query_as::<_, AtlasRow>(&sql)
                    .bind(bind)
                    .fetch_all(&self.pool)
                    .await?
                    .into_iter()
                    .map(|r| (r, None))
                    .collect()
            }

            Stage::ExactAlt => {
                let alt_rows: Vec<AltNameRow> = sqlx::query_as(
                    "SELECT alt_key_name, atlas_key_name, alt_name, misspelling, \
                     COALESCE(specific_item2, 0) AS specific_item2 \
                     FROM atlas_alt_names WHERE alt_key_name = ?",
                )
                .bind(key)
                .fetch_all(&self.pool)
                .await?;

                let mut out = Vec::new();
                for alt in alt_rows {
                    // The alternate display name is only shown for genuine
                    // alternate names, never for recorded misspellings.
                    let display = if alt.misspelling.eq_ignore_ascii_case("N") {
                        Some(alt.alt_name.clone())
                    } else {
                        None
                    };

                    let found: Vec<AtlasRow> = if alt.specific_item2 > 0 {
                        sqlx::query_as(&format!(
                            "SELECT {ATLAS_COLUMNS} FROM atlas2 WHERE item_no = ?{rank_cond}"
                        ))
                        .bind(alt.specific_item2)
                        .fetch_all(&self.pool)
                        .await?
                    } else {
                        sqlx::query_as(&format!(
                            "SELECT {ATLAS_COLUMNS} FROM atlas2 WHERE key_name = ?{rank_cond}"
                        ))
                        .bind(&alt.atlas_key_name)
                        .fetch_all(&self.pool)
                        .await?
                    };
                    out.extend(found.into_iter().map(|r| (r, display.clone())));
                }
                out
            }

            Stage::StartsWith => {
                let upper = format!("{key}~");
                sqlx::query_as::<_, AtlasRow>(&format!(
                    "SELECT {ATLAS_COLUMNS} FROM atlas2 \
                     WHERE ((key_name >= ? AND key_name < ?) \
                         OR (variant >= ? AND variant < ?)){rank_cond}"
                ))
                .bind(key)
                .bind(&upper)
                .bind(key)
                .bind(&upper)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(|r| (r, None))
                .collect()
            }

            Stage::SoundsLike => sqlx::query_as::<_, AtlasRow>(&format!(
                "SELECT {ATLAS_COLUMNS} FROM atlas2 WHERE sound = SOUNDEX(?){rank_cond}"
            ))
            .bind(key)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|r| (r, None))
            .collect(),
        };

        Ok(rows)
    }
}

fn build_location(
    data: &GazetteerData,
    row: AtlasRow,
    alt_display: Option<String>,
    stage: Stage,
    parsed: &ParsedSearchString,
) -> AtlasLocation {
    let rank = if parsed.is_postal() {
        ZIP_RANK
    } else {
        (row.rank + stage.rank_adjust()).clamp(0, MAX_NON_POSTAL_RANK)
    };

    let mut loc = AtlasLocation {
        city: alt_display.clone().unwrap_or_else(|| row.name.clone()),
        variant: row.variant,
        county: row.admin2,
        state: row.admin1,
        country: row.country,
        latitude: row.latitude,
        longitude: row.longitude,
        elevation: row.elevation,
        zone: row.time_zone,
        zip: row.postal_code,
        rank,
        place_type: row.feature_type,
        source: row.source,
        geoname_id: row.geonames_id,
        matched_by_alternate_name: stage == Stage::ExactAlt,
        matched_by_sound: stage == Stage::SoundsLike,
        ..Default::default()
    };
    data.fill_location_codes(&mut loc);
    loc
}
