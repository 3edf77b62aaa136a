//! Free-form query parsing.
//!
//! Splits `"Nashua, NH"`, `"90210"`, `"Paris, France"` into a normalized
//! search specification. Postal codes are detected in the first two
//! whitespace tokens of the leading comma part, the US ZIP form taking
//! precedence over the generic postal form. Loose mode (legacy clients)
//! additionally pulls a trailing state/country token off the city.

use std::sync::LazyLock;

use regex::Regex;

use atlas_core::{ParseMode, ParsedSearchString};

use crate::GazetteerData;

static US_ZIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}(-\d{4,6})?$").expect("static regex"));

static OTHER_POSTAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Z]{2,8}((-|\s+)[0-9A-Z]{2,6})?$").expect("static regex"));

/// Generic postal forms must carry at least one digit; otherwise every short
/// city name would read as a postal code.
fn is_generic_postal(token: &str) -> bool {
    let upper = token.to_ascii_uppercase();
    upper.chars().any(|c| c.is_ascii_digit()) && OTHER_POSTAL.is_match(&upper)
}

fn is_us_zip(token: &str) -> bool {
    US_ZIP.is_match(token)
}

/// Extract a postal code from the first two whitespace tokens, returning the
/// postal code and the remaining city text.
fn extract_postal(city_part: &str) -> (Option<String>, String) {
    let tokens: Vec<&str> = city_part.split_whitespace().collect();
    if tokens.is_empty() {
        return (None, String::new());
    }

    let rejoin = |skip: usize| -> String {
        tokens
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != skip)
            .map(|(_, t)| *t)
            .collect::<Vec<_>>()
            .join(" ")
    };

    // ZIP form first, in either of the first two tokens.
    for i in 0..tokens.len().min(2) {
        if is_us_zip(tokens[i]) {
            return (Some(tokens[i].to_string()), rejoin(i));
        }
    }

    // Generic postal may span the first two tokens ("SW1A 1AA").
    if tokens.len() >= 2 {
        let pair = format!("{} {}", tokens[0], tokens[1]);
        if is_generic_postal(&pair) {
            let rest = tokens[2..].join(" ");
            return (Some(pair.to_ascii_uppercase()), rest);
        }
    }
    for i in 0..tokens.len().min(2) {
        if is_generic_postal(tokens[i]) {
            return (Some(tokens[i].to_ascii_uppercase()), rejoin(i));
        }
    }

    (None, tokens.join(" "))
}

/// Try to pull a trailing 2–3 letter state/country token off the city.
///
/// With a space (`"Nashua NH"`) any casing is accepted; fused forms
/// (`"NashuaNH"`) additionally require a camel-case boundary so that
/// `"Dallas"` does not shed an `AS`. Returns `(city, state)` on success.
pub fn split_trailing_state(data: &GazetteerData, city: &str) -> Option<(String, String)> {
    // Space-separated trailing token.
    if let Some((rest, tail)) = city.rsplit_once(char::is_whitespace) {
        let rest = rest.trim();
        if (2..=3).contains(&tail.len())
            && tail.chars().all(|c| c.is_ascii_alphabetic())
            && !rest.is_empty()
            && data.is_loose_state_token(tail)
        {
            return Some((rest.to_string(), tail.to_ascii_uppercase()));
        }
        return None;
    }

    // Fused: require lowercase-to-uppercase boundary.
    for n in [2usize, 3] {
        if city.len() <= n {
            continue;
        }
        let split_at = city.len() - n;
        if !city.is_char_boundary(split_at) {
            continue;
        }
        let (rest, tail) = city.split_at(split_at);
        let boundary_ok = rest.chars().last().is_some_and(|c| c.is_ascii_lowercase())
            && tail.chars().all(|c| c.is_ascii_uppercase());
        if boundary_ok && data.is_loose_state_token(tail) {
            return Some((rest.to_string(), tail.to_string()));
        }
    }

    None
}

/// Parse a free-form query into a normalized search specification.
pub fn parse_search_string(data: &GazetteerData, q: &str, mode: ParseMode) -> ParsedSearchString {
    let actual = q.trim().to_string();
    let parts: Vec<&str> = actual.split(',').map(str::trim).collect();

    let city_part = parts.first().copied().unwrap_or("");
    // Third (country) part replaces the state when present; the state-match
    // check accepts country identifiers too.
    let mut target_state = if parts.len() >= 3 {
        parts[2].to_string()
    } else if parts.len() == 2 {
        parts[1].to_string()
    } else {
        String::new()
    };

    let (mut postal_code, mut target_city) = extract_postal(city_part);

    // A normalized "City, 90210" form carries the postal code in the state
    // slot; recognize it there so normalization round-trips.
    if postal_code.is_none() && !target_state.is_empty() {
        if is_us_zip(&target_state) {
            postal_code = Some(std::mem::take(&mut target_state));
        } else if is_generic_postal(&target_state) {
            postal_code = Some(std::mem::take(&mut target_state).to_ascii_uppercase());
        }
    }

    if mode == ParseMode::Loose && target_state.is_empty() && postal_code.is_none() {
        if let Some((city, state)) = split_trailing_state(data, &target_city) {
            target_city = city;
            target_state = state;
        }
    }

    if target_state.len() <= 3 {
        target_state = target_state.to_ascii_uppercase();
    }

    let mut normalized = match (&postal_code, target_city.is_empty()) {
        (Some(postal), false) => format!("{target_city}, {postal}"),
        (Some(postal), true) => postal.clone(),
        (None, _) => target_city.clone(),
    };
    if !target_state.is_empty() {
        normalized.push_str(", ");
        normalized.push_str(&target_state);
    }

    ParsedSearchString {
        postal_code,
        target_city,
        target_state,
        actual_search: actual,
        normalized_search: normalized,
    }
}
