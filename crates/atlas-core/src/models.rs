//! Core data model: locations, parsed searches, and search results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::defaults::{COORD_EPSILON, MIN_EXTERNAL_SOURCE, SAME_SITE_KM};
use crate::text::{eqci, simplify};

/// Mean Earth radius in kilometers, for great-circle distances.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// A single resolved geographic location.
///
/// Created from local DB rows or remote gazetteer documents, mutated only
/// during dedup and writeback preparation, then immutable. Serialized field
/// names match the public JSON contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AtlasLocation {
    /// Display name; may carry a variant in parentheses.
    pub city: String,
    /// Alternate / rearranged form ("Lake X" → variant "X").
    #[serde(skip_serializing_if = "String::is_empty")]
    pub variant: String,
    /// Second-level admin division; US-normalized.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub county: String,
    /// First-level admin division; two-letter for US/CAN.
    pub state: String,
    /// Three-letter country code (`USA`, `GBR`, `ATA`, …).
    pub country: String,
    /// Human-readable country name.
    pub long_country: String,
    /// Display-layer hint: include the county when disambiguating.
    pub show_county: bool,
    /// Display-layer hint: include the state when disambiguating.
    pub show_state: bool,
    /// Lowercase two-letter or regional code matching a known flag image.
    pub flag_code: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Elevation in meters; 0 when unknown.
    pub elevation: f64,
    /// IANA zone id; a trailing `?` means "multiple candidates".
    pub zone: String,
    /// Postal code; may be empty.
    pub zip: String,
    /// 0..=9; higher is better. Postal matches are pinned to 9.
    pub rank: i32,
    /// Two-part tag `X.YYYY` (e.g. `P.PPL`, `A.ADM1`, `T.PK`).
    pub place_type: String,
    /// Source taxonomy value; see [`crate::defaults::MIN_EXTERNAL_SOURCE`].
    pub source: i32,
    /// Remote-source identifier; 0 if unknown.
    #[serde(rename = "geonameID")]
    pub geoname_id: i64,
    pub matched_by_alternate_name: bool,
    pub matched_by_sound: bool,
    /// Transient dedup → writeback signal; never serialized.
    #[serde(skip)]
    pub use_as_update: bool,
    /// Filled just before serialization.
    pub display_name: String,
}

impl AtlasLocation {
    /// Whether this location came from a remote gazetteer.
    pub fn is_remote(&self) -> bool {
        self.source >= MIN_EXTERNAL_SOURCE
    }

    /// Whether the country is one whose first-level divisions use
    /// two-letter codes (and whose keys are state-scoped).
    pub fn uses_state_key(&self) -> bool {
        self.country == "USA" || self.country == "CAN"
    }

    /// Great-circle distance to another location, in kilometers.
    pub fn distance_km(&self, other: &AtlasLocation) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }

    /// Whether two locations refer to the same physical site.
    pub fn is_same_site(&self, other: &AtlasLocation) -> bool {
        self.distance_km(other) < SAME_SITE_KM
    }

    /// Two locations that differ only in presentation-layer fields.
    pub fn is_close_match(&self, other: &AtlasLocation) -> bool {
        (eqci(&self.city, &other.city) || eqci(&self.city, &other.variant))
            && eqci(&self.county, &other.county)
            && eqci(&self.state, &other.state)
            && eqci(&self.country, &other.country)
            && (self.latitude - other.latitude).abs() < COORD_EPSILON
            && (self.longitude - other.longitude).abs() < COORD_EPSILON
            && self.elevation == other.elevation
            && self.zone == other.zone
            && self.zip == other.zip
            && self.place_type == other.place_type
    }

    /// `A.ADM*` administrative divisions.
    pub fn is_admin(&self) -> bool {
        self.place_type.starts_with("A.ADM")
    }

    /// `P.PPL*` populated places.
    pub fn is_populated(&self) -> bool {
        self.place_type.starts_with("P.PPL")
    }

    /// The display string: city plus the admin context a reader needs.
    pub fn build_display_name(&self) -> String {
        let mut name = self.city.clone();

        if self.uses_state_key() {
            if self.show_county && !self.county.is_empty() {
                name.push_str(", ");
                name.push_str(&self.county);
            }
            if !self.state.is_empty() {
                name.push_str(", ");
                name.push_str(&self.state);
            }
            name.push_str(", ");
            name.push_str(if self.country == "USA" { "USA" } else { "Canada" });
        } else {
            if self.show_state && !self.state.is_empty() {
                name.push_str(", ");
                name.push_str(&self.state);
            }
            let country = if self.long_country.is_empty() {
                &self.country
            } else {
                &self.long_country
            };
            if !country.is_empty() {
                name.push_str(", ");
                name.push_str(country);
            }
        }

        name
    }
}

/// Map from location key to location.
///
/// Keys come from [`make_location_key`]; two distinct places that collide on
/// the same key get `(2)`, `(3)`, … suffixes. `BTreeMap` keeps traversal
/// deterministic for dedup and result assembly.
pub type LocationMap = BTreeMap<String, AtlasLocation>;

/// Base key for a location: simplified city, then state inside USA/CAN,
/// country elsewhere.
pub fn make_location_key(loc: &AtlasLocation) -> String {
    let scope = if loc.uses_state_key() {
        &loc.state
    } else {
        &loc.country
    };
    format!("{},{}", simplify(&loc.city), scope)
}

/// Strip a trailing `(n)` collision suffix off a location key.
pub fn base_location_key(key: &str) -> &str {
    if let Some(open) = key.rfind('(') {
        if key.ends_with(')') && key[open + 1..key.len() - 1].chars().all(|c| c.is_ascii_digit()) {
            return &key[..open];
        }
    }
    key
}

/// Insert a location under its key, suffixing `(2)`, `(3)`, … on collision.
pub fn append_location(map: &mut LocationMap, loc: AtlasLocation) {
    let base = make_location_key(&loc);
    if !map.contains_key(&base) {
        map.insert(base, loc);
        return;
    }
    let mut n = 2;
    loop {
        let key = format!("{base}({n})");
        if !map.contains_key(&key) {
            map.insert(key, loc);
            return;
        }
        n += 1;
    }
}

/// Parse mode for free-form queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Comma-separated parts only.
    Strict,
    /// Legacy clients: additionally pull a trailing state/country token
    /// off the city.
    Loose,
}

/// A normalized search specification produced from a free-form query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSearchString {
    pub postal_code: Option<String>,
    pub target_city: String,
    pub target_state: String,
    /// The query as received (trimmed).
    pub actual_search: String,
    /// The key used for search-log and coherence lookups.
    pub normalized_search: String,
}

impl ParsedSearchString {
    /// Postal searches ignore the city ladder and pin rank to 9.
    pub fn is_postal(&self) -> bool {
        self.postal_code.is_some()
    }
}

/// The response envelope for one search request.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub original_search: String,
    pub normalized_search: String,
    /// Elapsed wall-clock time in milliseconds.
    pub time: u64,
    pub count: usize,
    pub limit_reached: bool,
    pub matches: Vec<AtlasLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

impl SearchResult {
    /// Append a warning line (line-by-line display contract).
    pub fn add_warning(&mut self, line: &str) {
        match &mut self.warning {
            Some(w) => {
                w.push('\n');
                w.push_str(line);
            }
            None => self.warning = Some(line.to_string()),
        }
    }

    /// Append an info line.
    pub fn add_info(&mut self, line: &str) {
        match &mut self.info {
            Some(i) => {
                i.push('\n');
                i.push_str(line);
            }
            None => self.info = Some(line.to_string()),
        }
    }
}

/// Sort matches into presentation order: rank descending, then display
/// name ascending. Display names must already be built.
pub fn sort_matches(matches: &mut [AtlasLocation]) {
    matches.sort_by(|a, b| {
        b.rank
            .cmp(&a.rank)
            .then_with(|| a.display_name.cmp(&b.display_name))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(city: &str, state: &str, country: &str, lat: f64, lon: f64) -> AtlasLocation {
        AtlasLocation {
            city: city.to_string(),
            state: state.to_string(),
            country: country.to_string(),
            latitude: lat,
            longitude: lon,
            ..Default::default()
        }
    }

    #[test]
    fn distance_nashua_to_manchester() {
        let nashua = loc("Nashua", "NH", "USA", 42.7654, -71.4676);
        let manchester = loc("Manchester", "NH", "USA", 42.9956, -71.4548);
        let d = nashua.distance_km(&manchester);
        assert!((d - 25.6).abs() < 1.0, "got {d}");
        assert!(!nashua.is_same_site(&manchester));
    }

    #[test]
    fn distance_zero_for_identical_points() {
        let a = loc("X", "NH", "USA", 42.0, -71.0);
        assert!(a.distance_km(&a) < 1e-9);
        assert!(a.is_same_site(&a));
    }

    #[test]
    fn location_key_state_scoped_in_us_and_canada() {
        let us = loc("Nashua", "NH", "USA", 0.0, 0.0);
        assert_eq!(make_location_key(&us), "NASHUA,NH");

        let ca = loc("Trois-Rivières", "QC", "CAN", 0.0, 0.0);
        assert_eq!(make_location_key(&ca), "TROISRIVIERES,QC");

        let fr = loc("Paris", "Île-de-France", "FRA", 0.0, 0.0);
        assert_eq!(make_location_key(&fr), "PARIS,FRA");
    }

    #[test]
    fn append_location_suffixes_collisions() {
        let mut map = LocationMap::new();
        append_location(&mut map, loc("Paris", "", "FRA", 48.86, 2.35));
        append_location(&mut map, loc("Paris", "", "FRA", 48.80, 2.30));
        append_location(&mut map, loc("Paris", "", "FRA", 48.70, 2.20));

        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, ["PARIS,FRA", "PARIS,FRA(2)", "PARIS,FRA(3)"]);
    }

    #[test]
    fn base_location_key_strips_suffix() {
        assert_eq!(base_location_key("PARIS,FRA(2)"), "PARIS,FRA");
        assert_eq!(base_location_key("PARIS,FRA"), "PARIS,FRA");
        // A parenthetical that is not a collision counter stays.
        assert_eq!(base_location_key("X,(AB)"), "X,(AB)");
    }

    #[test]
    fn close_match_tolerates_case_and_variant() {
        let mut a = loc("Lake Placid", "NY", "USA", 44.2795, -73.98);
        a.place_type = "P.PPL".into();
        let mut b = loc("LAKE PLACID", "NY", "USA", 44.2795, -73.98);
        b.place_type = "P.PPL".into();
        assert!(a.is_close_match(&b));

        b.latitude += 0.01;
        assert!(!a.is_close_match(&b));

        b.latitude = a.latitude;
        b.zip = "12946".into();
        assert!(!a.is_close_match(&b));
    }

    #[test]
    fn display_name_shapes() {
        let mut us = loc("Nashua", "NH", "USA", 0.0, 0.0);
        us.county = "Hillsborough County".into();
        assert_eq!(us.build_display_name(), "Nashua, NH, USA");

        us.show_county = true;
        assert_eq!(us.build_display_name(), "Nashua, Hillsborough County, NH, USA");

        let mut fr = loc("Paris", "Île-de-France", "FRA", 0.0, 0.0);
        fr.long_country = "France".into();
        assert_eq!(fr.build_display_name(), "Paris, France");

        fr.show_state = true;
        assert_eq!(fr.build_display_name(), "Paris, Île-de-France, France");
    }

    #[test]
    fn sort_matches_rank_then_name() {
        let mut list = vec![
            {
                let mut l = loc("Paris", "TX", "USA", 0.0, 0.0);
                l.rank = 2;
                l.display_name = "Paris, TX, USA".into();
                l
            },
            {
                let mut l = loc("Paris", "", "FRA", 0.0, 0.0);
                l.rank = 4;
                l.display_name = "Paris, France".into();
                l
            },
            {
                let mut l = loc("Paris", "TN", "USA", 0.0, 0.0);
                l.rank = 2;
                l.display_name = "Paris, TN, USA".into();
                l
            },
        ];
        sort_matches(&mut list);
        assert_eq!(list[0].display_name, "Paris, France");
        assert_eq!(list[1].display_name, "Paris, TN, USA");
        assert_eq!(list[2].display_name, "Paris, TX, USA");
    }

    #[test]
    fn serialization_shape() {
        let mut l = loc("Nashua", "NH", "USA", 42.7654, -71.4676);
        l.zone = "America/New_York".into();
        l.place_type = "P.PPL".into();
        l.geoname_id = 5088438;
        l.display_name = l.build_display_name();

        let json = serde_json::to_value(&l).unwrap();
        assert_eq!(json["city"], "Nashua");
        assert_eq!(json["placeType"], "P.PPL");
        assert_eq!(json["geonameID"], 5088438);
        assert_eq!(json["displayName"], "Nashua, NH, USA");
        // Transient flag never serializes.
        assert!(json.get("useAsUpdate").is_none());
        // Empty optional text fields are omitted.
        assert!(json.get("variant").is_none());
    }
}
