//! Fixed-column country table parsing.
//!
//! The `country_codes.txt` layout is positional: name in columns `[0,48)`,
//! ISO code2 `[48,50)`, superseded code2 `[51,53)`, code3 `[56,59)`, a flag
//! marker at column 59, and optional `;`-separated alternate forms from
//! column 76.

use atlas_core::{Error, Result};

/// One row of the country table.
#[derive(Debug, Clone)]
pub struct CountryRecord {
    /// Human-readable name.
    pub name: String,
    /// Current ISO 3166 alpha-2 code.
    pub code2: String,
    /// Superseded alpha-2 code (e.g. `UK` for `GB`, `SU` for `RU`).
    pub old_code2: String,
    /// Alpha-3 code, the canonical `country` value throughout the system.
    pub code3: String,
    /// Whether a flag image exists for this country.
    pub has_flag: bool,
    /// Alternate names ("Holland", "U.S.A.", …).
    pub alt_forms: Vec<String>,
}

fn column(line: &str, range: std::ops::Range<usize>) -> &str {
    let end = range.end.min(line.len());
    if range.start >= end {
        ""
    } else {
        line[range.start..end].trim()
    }
}

/// Parse the full country table. Blank lines and `#` comments are skipped.
pub fn parse_country_codes(text: &str) -> Result<Vec<CountryRecord>> {
    let mut records = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        if !line.is_ascii() {
            return Err(Error::Init(format!(
                "country_codes line {}: non-ASCII content",
                line_no + 1
            )));
        }
        if line.len() < 59 {
            return Err(Error::Init(format!(
                "country_codes line {}: short line ({} columns)",
                line_no + 1,
                line.len()
            )));
        }

        let name = column(line, 0..48).to_string();
        let code2 = column(line, 48..50).to_string();
        let old_code2 = column(line, 51..53).to_string();
        let code3 = column(line, 56..59).to_string();
        let has_flag = line.as_bytes().get(59).is_some_and(|b| !b.is_ascii_whitespace());
        let alt_forms = if line.len() > 76 {
            line[76..]
                .split(';')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        } else {
            Vec::new()
        };

        if name.is_empty() || code3.len() != 3 {
            return Err(Error::Init(format!(
                "country_codes line {}: bad name/code3",
                line_no + 1
            )));
        }

        records.push(CountryRecord {
            name,
            code2,
            old_code2,
            code3,
            has_flag,
            alt_forms,
        });
    }

    if records.is_empty() {
        return Err(Error::Init("country_codes: no records".to_string()));
    }

    Ok(records)
}
