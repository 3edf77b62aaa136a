//! Query-improvement suggestions.
//!
//! A query that produced nothing (or that is visibly mis-punctuated) gets a
//! human hint appended to the warnings. Suggestions never change the search
//! itself.

use std::sync::LazyLock;

use regex::Regex;

use atlas_core::{ParseMode, ParsedSearchString};
use atlas_gazetteer::parse::split_trailing_state;
use atlas_gazetteer::GazetteerData;

static DOTTED_ABBREV: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]\.){2,3}$").expect("static regex"));

// Only a short trailing token reads as a state; "Mt. Washington" must not
// become "Mt, Washington".
static PERIOD_AS_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^,.]+)\.\s+([A-Za-z]{2,3})\.?$").expect("static regex"));

/// Gather the applicable suggestions for a finished search.
pub fn suggestions_for(
    data: &GazetteerData,
    q: &str,
    parsed: &ParsedSearchString,
    mode: ParseMode,
    match_count: usize,
) -> Vec<String> {
    let mut out = Vec::new();
    let trimmed = q.trim();

    // Stray punctuation on either end.
    if trimmed.starts_with([',', ';']) || trimmed.ends_with([',', ';']) {
        out.push("Stray punctuation at the start or end of the search might be the problem.".to_string());
    }

    // More comma parts than "city, state, country" can use.
    if trimmed.split(',').count() > 3 {
        out.push(
            "That looks like too much information — try just \"city, state\" or \"city, country\"."
                .to_string(),
        );
    }

    // A dotted state abbreviation ("N.H.") parses, but the plain form is
    // what the database indexes.
    if DOTTED_ABBREV.is_match(parsed.target_state.trim()) {
        let plain: String = parsed
            .target_state
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect::<String>()
            .to_ascii_uppercase();
        out.push(format!(
            "Did you mean \"{}, {}\"?",
            parsed.target_city, plain
        ));
    }

    if match_count == 0 {
        // Periods standing in for commas: "Nashua. NH".
        if !trimmed.contains(',') {
            if let Some(caps) = PERIOD_AS_COMMA.captures(trimmed) {
                out.push(format!(
                    "Did you mean \"{}, {}\"?",
                    caps[1].trim(),
                    caps[2].trim().trim_end_matches('.')
                ));
            }
        }

        // A strict parse that left a fused "CityST" token whole.
        if mode == ParseMode::Strict
            && parsed.target_state.is_empty()
            && parsed.postal_code.is_none()
        {
            if let Some((city, state)) = split_trailing_state(data, &parsed.target_city) {
                out.push(format!("Did you mean \"{city}, {state}\"?"));
            }
        }
    }

    out
}
