//! # atlas-gazetteer
//!
//! Static geographic dictionaries and the text-side search intelligence:
//! country/state/county/celestial/flag tables, the free-form query parser,
//! and place-name canonicalization.
//!
//! Dictionaries are built once at startup and swapped atomically on re-init;
//! readers clone an `Arc` snapshot and never observe a partially built table.

pub mod country;
pub mod flags;
pub mod names;
pub mod parse;
pub mod states;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use atlas_core::{simplify, AtlasLocation, Error, Result};

use country::{parse_country_codes, CountryRecord};

const EMBEDDED_COUNTRY_CODES: &str = include_str!("../data/country_codes.txt");
const EMBEDDED_US_COUNTIES: &str = include_str!("../data/us_counties.txt");
const EMBEDDED_CELESTIAL: &str = include_str!("../data/celestial.txt");

/// One immutable snapshot of every dictionary.
#[derive(Debug)]
pub struct GazetteerData {
    countries: Vec<CountryRecord>,
    country_by_key: HashMap<String, usize>,
    country_by_code2: HashMap<String, usize>,
    country_by_old_code2: HashMap<String, usize>,
    country_by_code3: HashMap<String, usize>,
    us_state_by_key: HashMap<String, &'static str>,
    can_state_by_key: HashMap<String, &'static str>,
    us_counties: HashSet<String>,
    celestial: HashSet<String>,
    flags: HashSet<String>,
    /// When this snapshot was built.
    pub initialized_at: DateTime<Utc>,
}

impl GazetteerData {
    /// Build a snapshot from raw table text plus a flag inventory.
    pub fn build(
        country_text: &str,
        counties_text: &str,
        celestial_text: &str,
        flags: HashSet<String>,
    ) -> Result<Self> {
        let countries = parse_country_codes(country_text)?;

        let mut country_by_key = HashMap::new();
        let mut country_by_code2 = HashMap::new();
        let mut country_by_old_code2 = HashMap::new();
        let mut country_by_code3 = HashMap::new();

        for (idx, rec) in countries.iter().enumerate() {
            country_by_key.insert(simplify(&rec.name), idx);
            for alt in &rec.alt_forms {
                country_by_key.insert(simplify(alt), idx);
            }
            if !rec.code2.is_empty() {
                country_by_code2.insert(rec.code2.clone(), idx);
            }
            if !rec.old_code2.is_empty() {
                country_by_old_code2.entry(rec.old_code2.clone()).or_insert(idx);
            }
            country_by_code3.insert(rec.code3.clone(), idx);
        }

        let mut us_state_by_key = HashMap::new();
        for (abbrev, long) in states::US_STATES {
            us_state_by_key.insert(simplify(abbrev), abbrev);
            us_state_by_key.insert(simplify(long), abbrev);
        }
        let mut can_state_by_key = HashMap::new();
        for (abbrev, long) in states::CANADIAN_PROVINCES {
            can_state_by_key.insert(simplify(abbrev), abbrev);
            can_state_by_key.insert(simplify(long), abbrev);
        }
        for (alt, abbrev) in states::STATE_ALT_FORMS {
            if states::US_STATES.iter().any(|(a, _)| *a == abbrev) {
                us_state_by_key.insert(simplify(alt), abbrev);
            } else {
                can_state_by_key.insert(simplify(alt), abbrev);
            }
        }

        let mut us_counties = HashSet::new();
        for line in counties_text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((county, state)) = line.rsplit_once(',') else {
                return Err(Error::Init(format!("us_counties: bad line {line:?}")));
            };
            us_counties.insert(format!("{},{}", simplify(county), state.trim()));
        }
        // The district is not a county but resolves like one.
        us_counties.insert("WASHINGTON,DC".to_string());

        let celestial = celestial_text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(simplify)
            .collect();

        Ok(Self {
            countries,
            country_by_key,
            country_by_code2,
            country_by_old_code2,
            country_by_code3,
            us_state_by_key,
            can_state_by_key,
            us_counties,
            celestial,
            flags,
            initialized_at: Utc::now(),
        })
    }

    /// Resolve a country from any of its identifying forms: code3, code2,
    /// superseded code2, full name, or alternate name.
    pub fn country(&self, any: &str) -> Option<&CountryRecord> {
        let trimmed = any.trim();
        if trimmed.is_empty() {
            return None;
        }

        if trimmed.len() == 3 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            let upper = trimmed.to_ascii_uppercase();
            if let Some(&idx) = self.country_by_code3.get(&upper) {
                return Some(&self.countries[idx]);
            }
        }
        if trimmed.len() == 2 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            let upper = trimmed.to_ascii_uppercase();
            if let Some(&idx) = self.country_by_code2.get(&upper) {
                return Some(&self.countries[idx]);
            }
            if let Some(&idx) = self.country_by_old_code2.get(&upper) {
                return Some(&self.countries[idx]);
            }
        }

        self.country_by_key
            .get(&simplify(trimmed))
            .map(|&idx| &self.countries[idx])
    }

    /// code2 → code3, with the Antarctic continent pseudo-code folded in.
    pub fn code3_for_code2(&self, code2: &str) -> Option<&str> {
        if code2.eq_ignore_ascii_case("AN") {
            return Some("ATA");
        }
        let upper = code2.to_ascii_uppercase();
        self.country_by_code2
            .get(&upper)
            .or_else(|| self.country_by_old_code2.get(&upper))
            .map(|&idx| self.countries[idx].code3.as_str())
    }

    /// Human-readable name for a code3.
    pub fn long_country(&self, code3: &str) -> Option<&str> {
        self.country_by_code3
            .get(&code3.to_ascii_uppercase())
            .map(|&idx| self.countries[idx].name.as_str())
    }

    /// State/province abbreviation from any written form.
    pub fn state_abbrev(&self, name: &str, country_code3: &str) -> Option<&'static str> {
        let key = simplify(name);
        match country_code3 {
            "USA" => self.us_state_by_key.get(&key).copied(),
            "CAN" => self.can_state_by_key.get(&key).copied(),
            _ => None,
        }
    }

    /// Long name for a two-letter state/province code.
    pub fn long_state(&self, abbrev: &str, country_code3: &str) -> Option<&'static str> {
        let table: &[(&str, &str)] = match country_code3 {
            "USA" => &states::US_STATES,
            "CAN" => &states::CANADIAN_PROVINCES,
            _ => return None,
        };
        table
            .iter()
            .find(|(a, _)| a.eq_ignore_ascii_case(abbrev))
            .map(|(_, long)| *long)
    }

    /// Whether a bare token can be accepted as a trailing state/country in
    /// loose parsing: a two-letter US/CAN abbreviation or a three-letter
    /// country code. Two-letter country codes are deliberately excluded —
    /// too many city names end in one ("ParIS", "DallAS").
    pub fn is_loose_state_token(&self, token: &str) -> bool {
        let upper = token.to_ascii_uppercase();
        match upper.len() {
            2 => {
                self.us_state_by_key.contains_key(&upper)
                    || self.can_state_by_key.contains_key(&upper)
            }
            3 => self.country_by_code3.contains_key(&upper),
            _ => false,
        }
    }

    /// Whether a (county, state) pair names a known US county.
    /// The county may carry a `County`/`Parish`/`Borough`-style suffix.
    pub fn is_us_county(&self, county: &str, state: &str) -> bool {
        let stripped = names::strip_us_county_suffix(county);
        self.us_counties
            .contains(&format!("{},{}", simplify(stripped), state.to_ascii_uppercase()))
    }

    /// Whether a name belongs to the not-geographic celestial list.
    pub fn is_celestial(&self, name: &str) -> bool {
        self.celestial.contains(&simplify(name))
    }

    /// Flag code for a country, blank when no flag image exists.
    pub fn flag_code(&self, country_code3: &str) -> String {
        let Some(&idx) = self.country_by_code3.get(&country_code3.to_ascii_uppercase()) else {
            return String::new();
        };
        let code = self.countries[idx].code2.to_ascii_lowercase();
        if self.flags.contains(&code) {
            code
        } else {
            String::new()
        }
    }

    /// Fill the presentation fields a freshly built location is missing.
    pub fn fill_location_codes(&self, loc: &mut AtlasLocation) {
        if loc.long_country.is_empty() {
            if let Some(name) = self.long_country(&loc.country) {
                loc.long_country = name.to_string();
            }
        }
        if loc.flag_code.is_empty() {
            loc.flag_code = self.flag_code(&loc.country);
        }
    }
}

/// Handle on the current dictionary snapshot with atomic re-init.
pub struct Gazetteer {
    data: RwLock<Arc<GazetteerData>>,
}

impl Gazetteer {
    /// Build from the embedded tables (no filesystem or network access).
    pub fn from_embedded() -> Result<Self> {
        let countries = parse_country_codes(EMBEDDED_COUNTRY_CODES)?;
        let flags = flags::derive_from_countries(&countries);
        let data = GazetteerData::build(
            EMBEDDED_COUNTRY_CODES,
            EMBEDDED_US_COUNTIES,
            EMBEDDED_CELESTIAL,
            flags,
        )?;
        Ok(Self {
            data: RwLock::new(Arc::new(data)),
        })
    }

    /// Build from the environment: `ATLAS_DATA_DIR` overrides the embedded
    /// tables, `ATLAS_FLAGS_DIR` is scanned for the flag inventory, and
    /// `ATLAS_FLAGS_INDEX_URL` is scraped when the local scan comes up empty.
    pub async fn init_from_env(client: &reqwest::Client) -> Result<Self> {
        let data = Self::build_from_env(client).await?;
        info!(
            subsystem = "gazetteer",
            op = "init",
            countries = data.countries.len(),
            counties = data.us_counties.len(),
            flags = data.flags.len(),
            "Gazetteer initialized"
        );
        Ok(Self {
            data: RwLock::new(Arc::new(data)),
        })
    }

    async fn build_from_env(client: &reqwest::Client) -> Result<GazetteerData> {
        let data_dir = std::env::var("ATLAS_DATA_DIR").ok().map(PathBuf::from);

        let country_text = read_or_embedded(data_dir.as_deref(), "country_codes.txt", EMBEDDED_COUNTRY_CODES)?;
        let counties_text = read_or_embedded(data_dir.as_deref(), "us_counties.txt", EMBEDDED_US_COUNTIES)?;
        let celestial_text = read_or_embedded(data_dir.as_deref(), "celestial.txt", EMBEDDED_CELESTIAL)?;

        let mut flag_codes = HashSet::new();
        if let Ok(dir) = std::env::var("ATLAS_FLAGS_DIR") {
            match flags::scan_flag_dir(Path::new(&dir)) {
                Ok(codes) => flag_codes = codes,
                Err(e) => warn!(
                    subsystem = "gazetteer",
                    component = "flags",
                    error = %e,
                    "Flag directory scan failed"
                ),
            }
        }
        if flag_codes.is_empty() {
            if let Ok(url) = std::env::var("ATLAS_FLAGS_INDEX_URL") {
                match flags::scrape_flag_index(client, &url).await {
                    Ok(codes) => flag_codes = codes,
                    Err(e) => warn!(
                        subsystem = "gazetteer",
                        component = "flags",
                        error = %e,
                        "Flag index scrape failed"
                    ),
                }
            }
        }
        if flag_codes.is_empty() {
            let countries = parse_country_codes(&country_text)?;
            flag_codes = flags::derive_from_countries(&countries);
        }

        GazetteerData::build(&country_text, &counties_text, &celestial_text, flag_codes)
    }

    /// Current snapshot; cheap to clone, immutable.
    pub fn data(&self) -> Arc<GazetteerData> {
        self.data.read().expect("gazetteer lock poisoned").clone()
    }

    /// Age of the current snapshot.
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.data().initialized_at
    }

    /// Rebuild the dictionaries and swap them in atomically. Failures leave
    /// the previous snapshot in place (re-init is best-effort, first init is
    /// the only fatal one).
    pub async fn reinit(&self, client: &reqwest::Client) -> Result<()> {
        match Self::build_from_env(client).await {
            Ok(fresh) => {
                *self.data.write().expect("gazetteer lock poisoned") = Arc::new(fresh);
                info!(subsystem = "gazetteer", op = "reinit", "Gazetteer dictionaries refreshed");
                Ok(())
            }
            Err(e) => {
                warn!(
                    subsystem = "gazetteer",
                    op = "reinit",
                    error = %e,
                    "Gazetteer refresh failed; keeping previous tables"
                );
                Err(e)
            }
        }
    }
}

fn read_or_embedded(dir: Option<&Path>, file: &str, embedded: &str) -> Result<String> {
    if let Some(dir) = dir {
        let path = dir.join(file);
        if path.exists() {
            return Ok(std::fs::read_to_string(path)?);
        }
    }
    Ok(embedded.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gazetteer() -> Gazetteer {
        Gazetteer::from_embedded().unwrap()
    }

    #[test]
    fn country_resolution_forms() {
        let gaz = gazetteer();
        let data = gaz.data();

        assert_eq!(data.country("USA").unwrap().code2, "US");
        assert_eq!(data.country("us").unwrap().code3, "USA");
        assert_eq!(data.country("United States").unwrap().code3, "USA");
        assert_eq!(data.country("U.S.A.").unwrap().code3, "USA");
        assert_eq!(data.country("France").unwrap().code3, "FRA");
        assert_eq!(data.country("UK").unwrap().code3, "GBR");
        assert_eq!(data.country("England").unwrap().code3, "GBR");
        assert_eq!(data.country("Holland").unwrap().code3, "NLD");
        assert!(data.country("Atlantis").is_none());
    }

    #[test]
    fn antarctic_continent_code_folds_to_ata() {
        let gaz = gazetteer();
        assert_eq!(gaz.data().code3_for_code2("AN"), Some("ATA"));
        assert_eq!(gaz.data().code3_for_code2("US"), Some("USA"));
    }

    #[test]
    fn state_lookup_both_directions() {
        let gaz = gazetteer();
        let data = gaz.data();

        assert_eq!(data.state_abbrev("New Hampshire", "USA"), Some("NH"));
        assert_eq!(data.state_abbrev("NH", "USA"), Some("NH"));
        assert_eq!(data.state_abbrev("N.H.", "USA"), Some("NH"));
        assert_eq!(data.state_abbrev("Quebec", "CAN"), Some("QC"));
        assert_eq!(data.state_abbrev("Que.", "CAN"), Some("QC"));
        assert_eq!(data.state_abbrev("New Hampshire", "FRA"), None);

        assert_eq!(data.long_state("NH", "USA"), Some("New Hampshire"));
        assert_eq!(data.long_state("QC", "CAN"), Some("Quebec"));
    }

    #[test]
    fn loose_state_tokens() {
        let gaz = gazetteer();
        let data = gaz.data();

        assert!(data.is_loose_state_token("NH"));
        assert!(data.is_loose_state_token("nh"));
        assert!(data.is_loose_state_token("QC"));
        assert!(data.is_loose_state_token("FRA"));
        // Two-letter country codes are not accepted loose: "ParIS" trap.
        assert!(!data.is_loose_state_token("IS"));
        assert!(!data.is_loose_state_token("XQ"));
        assert!(!data.is_loose_state_token("NHXY"));
    }

    #[test]
    fn county_membership() {
        let gaz = gazetteer();
        let data = gaz.data();

        assert!(data.is_us_county("Hillsborough", "NH"));
        assert!(data.is_us_county("Hillsborough County", "NH"));
        assert!(data.is_us_county("Los Angeles", "CA"));
        assert!(data.is_us_county("Orleans Parish", "LA"));
        assert!(data.is_us_county("Washington", "DC"));
        assert!(!data.is_us_county("Hillsborough", "VT"));
    }

    #[test]
    fn celestial_membership() {
        let gaz = gazetteer();
        let data = gaz.data();

        assert!(data.is_celestial("Io"));
        assert!(data.is_celestial("BETELGEUSE"));
        assert!(data.is_celestial("Ursa Major"));
        assert!(!data.is_celestial("Nashua"));
    }

    #[test]
    fn flag_codes_from_inventory() {
        let gaz = gazetteer();
        let data = gaz.data();

        assert_eq!(data.flag_code("USA"), "us");
        assert_eq!(data.flag_code("FRA"), "fr");
        assert_eq!(data.flag_code("XXX"), "");
    }

    #[test]
    fn fill_location_codes_sets_presentation_fields() {
        let gaz = gazetteer();
        let data = gaz.data();

        let mut loc = AtlasLocation {
            city: "Nashua".into(),
            state: "NH".into(),
            country: "USA".into(),
            ..Default::default()
        };
        data.fill_location_codes(&mut loc);
        assert_eq!(loc.long_country, "United States of America");
        assert_eq!(loc.flag_code, "us");
    }
}
