//! Response serialization: JSON, JSONP, or plain text.

use std::sync::LazyLock;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use regex::Regex;

use atlas_core::SearchResult;

use crate::params::SearchOptions;

/// JSONP callback names are restricted to simple identifier paths; anything
/// else falls back to plain JSON rather than echoing attacker-controlled
/// script.
static CALLBACK_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][\w$]*(\.[A-Za-z_$][\w$]*)*$").expect("static regex"));

/// Serialize a finished search per the client's requested content type.
pub fn respond(result: &SearchResult, options: &SearchOptions) -> Response {
    if options.plain_text {
        return (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            render_plain_text(result),
        )
            .into_response();
    }

    let json = serde_json::to_string(result)
        .unwrap_or_else(|_| "{\"error\":\"serialization failure\"}".to_string());

    if let Some(callback) = options
        .callback
        .as_deref()
        .filter(|cb| CALLBACK_NAME.is_match(cb))
    {
        return (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
            format!("{callback}({json});"),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
        json,
    )
        .into_response()
}

/// The human-readable rendition used by `pt=true`.
pub fn render_plain_text(result: &SearchResult) -> String {
    let mut out = String::new();

    out.push_str(&format!("Search: {}\n", result.original_search));
    out.push_str(&format!("Normalized: {}\n", result.normalized_search));
    if let Some(error) = &result.error {
        out.push_str(&format!("Error: {error}\n"));
        return out;
    }

    out.push_str(&format!(
        "Matches: {}{}  ({} ms)\n",
        result.count,
        if result.limit_reached { "+" } else { "" },
        result.time
    ));

    for m in &result.matches {
        out.push_str(&format!(
            "  {} [{}] {:.4},{:.4} {} rank {}{}\n",
            m.display_name,
            m.place_type,
            m.latitude,
            m.longitude,
            if m.zone.is_empty() { "-" } else { &m.zone },
            m.rank,
            if m.zip.is_empty() {
                String::new()
            } else {
                format!(" zip {}", m.zip)
            }
        ));
    }

    if let Some(warning) = &result.warning {
        for line in warning.lines() {
            out.push_str(&format!("Warning: {line}\n"));
        }
    }
    if let Some(info) = &result.info {
        for line in info.lines() {
            out.push_str(&format!("Info: {line}\n"));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::AtlasLocation;

    fn sample_result() -> SearchResult {
        SearchResult {
            original_search: "Nashua, NH".into(),
            normalized_search: "Nashua, NH".into(),
            time: 12,
            count: 1,
            limit_reached: false,
            matches: vec![AtlasLocation {
                city: "Nashua".into(),
                state: "NH".into(),
                country: "USA".into(),
                latitude: 42.7654,
                longitude: -71.4676,
                zone: "America/New_York".into(),
                rank: 3,
                place_type: "P.PPL".into(),
                display_name: "Nashua, NH, USA".into(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn callback_name_validation() {
        for good in ["cb", "handle_result", "$.atlas", "ns.module.fn"] {
            assert!(CALLBACK_NAME.is_match(good), "{good} should be valid");
        }
        for bad in ["alert(1)", "a b", "1cb", "cb;", ""] {
            assert!(!CALLBACK_NAME.is_match(bad), "{bad} should be invalid");
        }
    }

    #[test]
    fn plain_text_shape() {
        let text = render_plain_text(&sample_result());
        assert!(text.contains("Search: Nashua, NH"));
        assert!(text.contains("Matches: 1"));
        assert!(text.contains("Nashua, NH, USA"));
        assert!(text.contains("America/New_York"));
        assert!(text.contains("rank 3"));
    }

    #[test]
    fn plain_text_error_short_circuits() {
        let mut result = sample_result();
        result.error = Some("database gone".into());
        let text = render_plain_text(&result);
        assert!(text.contains("Error: database gone"));
        assert!(!text.contains("Matches:"));
    }

    #[test]
    fn warnings_render_line_by_line() {
        let mut result = sample_result();
        result.add_warning("first");
        result.add_warning("second");
        let text = render_plain_text(&result);
        assert!(text.contains("Warning: first\n"));
        assert!(text.contains("Warning: second\n"));
    }
}
