//! Flag-image inventory.
//!
//! The display layer only shows a flag when a matching image exists, so the
//! gazetteer carries the set of known flag codes. Primary source is a local
//! images directory; when that is empty or absent, a remote index page is
//! scraped; when neither is available the set is derived from the country
//! table's flag markers.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use atlas_core::Result;

use crate::country::CountryRecord;

static HREF_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)href="([a-z][a-z0-9-]{1,15})\.(?:png|gif)""#).expect("static regex")
});

/// Scan a local flag-image directory: every `*.png`/`*.gif` stem is a code.
pub fn scan_flag_dir(dir: &Path) -> Result<HashSet<String>> {
    let mut codes = HashSet::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let lower = name.to_ascii_lowercase();
        if let Some(stem) = lower
            .strip_suffix(".png")
            .or_else(|| lower.strip_suffix(".gif"))
        {
            codes.insert(stem.to_string());
        }
    }

    debug!(
        subsystem = "gazetteer",
        component = "flags",
        result_count = codes.len(),
        "Scanned local flag inventory"
    );
    Ok(codes)
}

/// Scrape a remote flag index page for image links.
pub async fn scrape_flag_index(client: &reqwest::Client, url: &str) -> Result<HashSet<String>> {
    let body = client.get(url).send().await?.error_for_status()
        .map_err(|e| atlas_core::Error::Request(e.to_string()))?
        .text()
        .await?;

    let codes: HashSet<String> = HREF_IMAGE
        .captures_iter(&body)
        .map(|c| c[1].to_ascii_lowercase())
        .collect();

    debug!(
        subsystem = "gazetteer",
        component = "flags",
        result_count = codes.len(),
        url,
        "Scraped remote flag inventory"
    );
    Ok(codes)
}

/// Last-resort inventory: lowercase code2 of every country flagged in the
/// country table.
pub fn derive_from_countries(countries: &[CountryRecord]) -> HashSet<String> {
    let codes: HashSet<String> = countries
        .iter()
        .filter(|c| c.has_flag && !c.code2.is_empty())
        .map(|c| c.code2.to_ascii_lowercase())
        .collect();

    if codes.is_empty() {
        warn!(
            subsystem = "gazetteer",
            component = "flags",
            "No flag inventory available from any source"
        );
    }
    codes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn href_regex_extracts_codes() {
        let html = r#"<a href="us.png">us</a> <A HREF="FR.GIF">fr</A> <a href="notflag.txt">x</a>"#;
        let codes: HashSet<String> = HREF_IMAGE
            .captures_iter(html)
            .map(|c| c[1].to_ascii_lowercase())
            .collect();
        assert!(codes.contains("us"));
        assert!(codes.contains("fr"));
        assert_eq!(codes.len(), 2);
    }

    #[test]
    fn derive_uses_flag_marker() {
        let countries = vec![
            CountryRecord {
                name: "France".into(),
                code2: "FR".into(),
                old_code2: "FR".into(),
                code3: "FRA".into(),
                has_flag: true,
                alt_forms: vec![],
            },
            CountryRecord {
                name: "Nowhere".into(),
                code2: "XN".into(),
                old_code2: "".into(),
                code3: "XNW".into(),
                has_flag: false,
                alt_forms: vec![],
            },
        ];
        let codes = derive_from_countries(&countries);
        assert!(codes.contains("fr"));
        assert!(!codes.contains("xn"));
    }
}
