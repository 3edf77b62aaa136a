//! Place-name canonicalization and close-match checks.
//!
//! Remote gazetteers return names in dozens of editorial styles; this module
//! beats them into the shapes the rest of the system indexes on. Everything
//! here is pure string work against the dictionary snapshot.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use atlas_core::{simplify, starts_with_icnd, AtlasLocation};

use crate::states::ALASKA_CENSUS_AREAS;
use crate::GazetteerData;

static TRAILING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s\d+$").expect("static regex"));

static NON_CITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(apartments?|apts\.?|trailer (?:court|park)|mobile home|census designated place|subdivision)\b|\(historical\)|\bhistorical$",
    )
    .expect("static regex")
});

static REARRANGED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?),\s*(.+)$").expect("static regex"));

static LEADING_ARTICLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:Lake|Mount|Mt\.?|The|La|Las|El|Le|Los)\s+(.+)$").expect("static regex")
});

static ADMIN_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:County of|Provincia de|Province of|Região de)\s+").expect("static regex")
});

static ADMIN_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\s+(?:Province|Prefecture|Oblast|Kray|District|Department|Governorate|Metropolitan Area|Territory|Region|Republic)$",
    )
    .expect("static regex")
});

static US_COUNTY_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+(?:County|Parish|Borough|Census Area|Division|Municipality)$")
        .expect("static regex")
});

static CITY_OF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^City of\s+|\s+\(?Independent City\)?$").expect("static regex")
});

/// A small HTML-entity decoder for the handful of entities remote pages
/// actually emit in place names.
pub fn decode_html_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let mut out = s
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ");

    static NUMERIC: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"&#(\d{2,6});").expect("static regex"));
    while let Some(m) = NUMERIC.find(&out) {
        let replacement = out[m.start() + 2..m.end() - 1]
            .parse::<u32>()
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| "_".to_string());
        out.replace_range(m.range(), &replacement);
    }
    out
}

/// Strip the display suffix off a US county name.
pub fn strip_us_county_suffix(county: &str) -> &str {
    match US_COUNTY_SUFFIX.find(county) {
        Some(m) => &county[..m.start()],
        None => county,
    }
}

/// Spellings that defeat plain title-casing.
const COUNTY_SPECIAL_SPELLINGS: [(&str, &str); 8] = [
    ("DEKALB", "DeKalb"),
    ("DESOTO", "DeSoto"),
    ("DEWITT", "DeWitt"),
    ("DUPAGE", "DuPage"),
    ("LASALLE", "LaSalle"),
    ("LAPORTE", "LaPorte"),
    ("OBRIEN", "O'Brien"),
    ("PRINCE GEORGES", "Prince George's"),
];

/// Normalize a US county name's capitalization and spelling:
/// `MCHENRY → McHenry`, `DEKALB → DeKalb`, `O BRIEN → O'Brien`,
/// hyphenated Alaska names capitalized per segment.
pub fn standardize_short_county_name(county: &str) -> String {
    let cleaned = county.trim();
    let upper_key = simplify(cleaned);
    for (key, spelling) in COUNTY_SPECIAL_SPELLINGS {
        if simplify(key) == upper_key {
            return spelling.to_string();
        }
    }

    fn cap_word(word: &str) -> String {
        if let Some(rest) = word
            .to_ascii_uppercase()
            .strip_prefix("MC")
            .filter(|r| !r.is_empty())
        {
            let mut out = String::from("Mc");
            let mut chars = rest.chars();
            if let Some(first) = chars.next() {
                out.push(first.to_ascii_uppercase());
                out.push_str(chars.as_str().to_ascii_lowercase().as_str());
            }
            return out;
        }

        let mut chars = word.chars();
        match chars.next() {
            Some(first) => {
                first.to_uppercase().collect::<String>() + chars.as_str().to_lowercase().as_str()
            }
            None => String::new(),
        }
    }

    fn cap_joined(text: &str, sep: char) -> String {
        text.split(sep).map(cap_word).collect::<Vec<_>>().join(&sep.to_string())
    }

    cleaned
        .split_whitespace()
        .map(|w| {
            if w.contains('-') {
                cap_joined(w, '-')
            } else if w.contains('\'') {
                cap_joined(w, '\'')
            } else {
                cap_word(w)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Append the state-appropriate display suffix to a bare US county name:
/// `Parish` in Louisiana, `Borough`/`Census Area` in Alaska (per the fixed
/// census-area list), `County` elsewhere. Names already suffixed and the
/// District of Columbia pass through unchanged.
pub fn adjust_us_county_name(county: &str, state: &str) -> String {
    if county.is_empty() || state == "DC" || US_COUNTY_SUFFIX.is_match(county) {
        return county.to_string();
    }

    let suffix = match state {
        "LA" => "Parish",
        "AK" => {
            if ALASKA_CENSUS_AREAS
                .iter()
                .any(|a| simplify(a) == simplify(county))
            {
                "Census Area"
            } else {
                "Borough"
            }
        }
        _ => "County",
    };
    format!("{county} {suffix}")
}

/// Reject clearly-non-city names and canonicalize the rest in place.
///
/// Returns `false` when the location should be dropped (apartment complexes,
/// numbered arrondissement forms, census tracts, historical entries).
/// Otherwise rearranges `"Foo, X"` → `"X Foo"` (keeping the original as the
/// variant), extracts a variant from leading articles, cleans admin names,
/// resolves the country through the dictionaries (unresolved countries are
/// marked `XX?`), and normalizes US/CAN state and county forms.
pub fn process_place_names(
    data: &GazetteerData,
    loc: &mut AtlasLocation,
    decode_html: bool,
) -> bool {
    if decode_html {
        loc.city = decode_html_entities(&loc.city);
        loc.county = decode_html_entities(&loc.county);
        loc.state = decode_html_entities(&loc.state);
    }

    let city = loc.city.trim().to_string();
    if city.is_empty() || TRAILING_NUMBER.is_match(&city) || NON_CITY.is_match(&city) {
        trace!(
            subsystem = "gazetteer",
            component = "names",
            city = %city,
            "Rejected non-city name"
        );
        return false;
    }
    loc.city = city;

    // "Placid, Lake" → "Lake Placid", remembering the as-received ordering.
    let as_received = loc.city.clone();
    if let Some(caps) = REARRANGED.captures(&as_received) {
        loc.variant = as_received.clone();
        loc.city = format!("{} {}", &caps[2], &caps[1]);
    } else if let Some(caps) = LEADING_ARTICLE.captures(&as_received) {
        if loc.variant.is_empty() {
            loc.variant = caps[1].to_string();
        }
    }

    loc.county = ADMIN_PREFIX.replace(loc.county.trim(), "").to_string();
    loc.state = ADMIN_PREFIX.replace(loc.state.trim(), "").to_string();
    loc.state = ADMIN_SUFFIX.replace(&loc.state, "").to_string();

    if !loc.country.is_empty() {
        match data.country(&loc.country) {
            Some(rec) => {
                loc.country = rec.code3.clone();
                loc.long_country = rec.name.clone();
            }
            None => {
                loc.long_country = loc.country.clone();
                loc.country = "XX?".to_string();
            }
        }
    }

    if loc.uses_state_key() {
        if loc.state.len() > 2 {
            if let Some(abbrev) = data.state_abbrev(&loc.state, &loc.country) {
                loc.state = abbrev.to_string();
            }
        } else {
            loc.state = loc.state.to_ascii_uppercase();
        }

        if !loc.county.is_empty() {
            let standardized =
                standardize_short_county_name(strip_us_county_suffix(loc.county.trim()));

            if loc.country == "USA" {
                if data.is_us_county(&standardized, &loc.state) {
                    loc.county = adjust_us_county_name(&standardized, &loc.state);
                } else {
                    // Independent-city case: "City of Nashua" style counties
                    // that just restate the city carry no information.
                    let bare = CITY_OF.replace_all(loc.county.trim(), "").trim().to_string();
                    if bare.eq_ignore_ascii_case(&loc.city) {
                        loc.county = String::new();
                    } else {
                        loc.county = format!("City of {bare}");
                    }
                }
            } else {
                loc.county = standardized;
            }
        }
    }

    data.fill_location_codes(loc);
    true
}

/// Whether the user's state/country token is compatible with a candidate
/// row's state and country. An empty target matches everything.
pub fn close_match_for_state(
    data: &GazetteerData,
    target: &str,
    state: &str,
    country: &str,
) -> bool {
    let target = target.trim();
    if target.is_empty() {
        return true;
    }

    let mut candidates: Vec<String> = vec![state.to_string(), country.to_string()];
    if let Some(long) = data.long_state(state, country) {
        candidates.push(long.to_string());
    }
    if let Some(rec) = data.country(country) {
        candidates.push(rec.name.clone());
        candidates.push(rec.code2.clone());
        candidates.push(rec.old_code2.clone());
        if rec.code3 == "GBR" {
            candidates.push("Great Britain".to_string());
            candidates.push("England".to_string());
        }
    }

    candidates
        .iter()
        .filter(|c| !c.is_empty())
        .any(|c| starts_with_icnd(c, target))
}

/// Whether a candidate city (or its variant) matches the searched city as a
/// case/diacritic-insensitive prefix.
pub fn close_match_for_city(target: &str, city: &str, variant: &str) -> bool {
    let target = target.trim();
    if target.is_empty() {
        return true;
    }
    starts_with_icnd(city, target) || (!variant.is_empty() && starts_with_icnd(variant, target))
}
