//! Text normalization primitives.
//!
//! Two layers: [`plain_ascii`] folds arbitrary text into printable ASCII via a
//! transliteration table, and [`simplify`] produces the 40-character
//! ASCII-upper key that every gazetteer index and dictionary is keyed by.
//! Both are pure and total; garbage in produces an underscore-padded key, not
//! an error.

use crate::defaults::MAX_KEY_LENGTH;

/// Transliterations for the Latin-1 supplement letter block (U+00C0..=U+00FF).
const LATIN_1: [&str; 64] = [
    "A", "A", "A", "A", "A", "A", "Ae", "C", "E", "E", "E", "E", "I", "I", "I", "I", //
    "D", "N", "O", "O", "O", "O", "O", "x", "O", "U", "U", "U", "U", "Y", "Th", "ss", //
    "a", "a", "a", "a", "a", "a", "ae", "c", "e", "e", "e", "e", "i", "i", "i", "i", //
    "d", "n", "o", "o", "o", "o", "o", "_", "o", "u", "u", "u", "u", "y", "th", "y",
];

/// Transliterations for Latin Extended-A (U+0100..=U+017F).
const LATIN_EXT_A: [&str; 128] = [
    "A", "a", "A", "a", "A", "a", "C", "c", "C", "c", "C", "c", "C", "c", "D", "d", //
    "D", "d", "E", "e", "E", "e", "E", "e", "E", "e", "E", "e", "G", "g", "G", "g", //
    "G", "g", "G", "g", "H", "h", "H", "h", "I", "i", "I", "i", "I", "i", "I", "i", //
    "I", "i", "Ij", "ij", "J", "j", "K", "k", "k", "L", "l", "L", "l", "L", "l", "L", //
    "l", "L", "l", "N", "n", "N", "n", "N", "n", "n", "N", "n", "O", "o", "O", "o", //
    "O", "o", "Oe", "oe", "R", "r", "R", "r", "R", "r", "S", "s", "S", "s", "S", "s", //
    "S", "s", "T", "t", "T", "t", "T", "t", "U", "u", "U", "u", "U", "u", "U", "u", //
    "U", "u", "U", "u", "W", "w", "Y", "y", "Y", "Z", "z", "Z", "z", "Z", "z", "s",
];

/// Characters the shell or a filesystem would mishandle, with their
/// file-name-safe substitutes.
fn file_name_safe(ch: char) -> Option<&'static str> {
    Some(match ch {
        '"' => "'",
        '[' | '<' => "(",
        ']' | '>' => ")",
        '*' | '/' | '\\' | ':' | '|' => "-",
        ';' => ",",
        '?' => "!",
        _ => return None,
    })
}

/// Fold a string to printable ASCII.
///
/// Every code point outside `[0x20, 0x7E]` is replaced by a transliteration:
/// ligatures expand (`Æ→Ae`, `ß→ss`, `Þ→Th`, `Œ→Oe`, `Ĳ→Ij`), Latin-1 and
/// Latin Extended-A letters lose their diacritics, the em/horizontal dash
/// becomes `--`, the ellipsis becomes `...`, curly quotes straighten, and
/// combining marks (U+0300..=U+036F) are dropped. Anything else becomes `_`.
///
/// Restricted to printable ASCII input, this function is the identity.
pub fn plain_ascii(s: &str) -> String {
    transliterate(s, false)
}

/// [`plain_ascii`] with additional file-name hygiene: shell/path-hostile
/// characters and a leading `.` are replaced by safe substitutes, and the
/// multi-character transliterations of merely decorative symbols are
/// suppressed to `_`.
pub fn plain_ascii_for_file_name(s: &str) -> String {
    transliterate(s, true)
}

fn transliterate(s: &str, for_file_name: bool) -> String {
    let mut out = String::with_capacity(s.len());

    for (i, ch) in s.chars().enumerate() {
        let code = ch as u32;
        match code {
            0x20..=0x7E => {
                if for_file_name {
                    if i == 0 && ch == '.' {
                        out.push('!');
                        continue;
                    }
                    if let Some(sub) = file_name_safe(ch) {
                        out.push_str(sub);
                        continue;
                    }
                }
                out.push(ch);
            }
            // Combining marks are dropped entirely.
            0x300..=0x36F => {}
            0xC0..=0xFF => out.push_str(LATIN_1[(code - 0xC0) as usize]),
            0x100..=0x17F => out.push_str(LATIN_EXT_A[(code - 0x100) as usize]),
            0xA0 => out.push(' '),
            0xA1 => out.push('!'),
            0xBF => out.push(if for_file_name { '!' } else { '?' }),
            0xAB | 0xBB => out.push(if for_file_name { '\'' } else { '"' }),
            0x2013 => out.push('-'),
            0x2014 | 0x2015 => out.push_str("--"),
            0x2018 | 0x2019 | 0x201A | 0x2039 | 0x203A => out.push('\''),
            0x201C | 0x201D | 0x201E => out.push(if for_file_name { '\'' } else { '"' }),
            0x2026 => out.push_str("..."),
            // Decorative symbols with multi-char renderings, suppressed in
            // file-name mode.
            0xA9 => out.push_str(if for_file_name { "_" } else { "(c)" }),
            0xAE => out.push_str(if for_file_name { "_" } else { "(R)" }),
            0x2122 => out.push_str(if for_file_name { "_" } else { "(TM)" }),
            0xB1 => out.push_str(if for_file_name { "_" } else { "+/-" }),
            _ => out.push('_'),
        }
    }

    out
}

/// Leading articles and geographic prefixes stripped when building a variant
/// key. Kept longest-first so `ILE DE` wins over `ILE D`.
const VARIANT_PREFIXES: [&str; 19] = [
    "CANON DE", "ILE DE", "ILE DU", "CERRO", "ILE D", "MOUNT", "POINT", "ILES", "ILSA", "LAKE",
    "FORT", "LAS", "LOS", "THE", "FT", "LA", "LE", "MT", "PT",
];

/// Produce the simplified key form of a name.
///
/// Strips any parenthetical tail, folds to ASCII upper case, maps hyphens and
/// periods to spaces, keeps only `[A-Z0-9 ]`, compresses the common
/// geographic words (`FORT→FT`, `MOUNT→MT`, `POINT→PT`, `SAINT→ST`,
/// `SAINTE→STE`), deletes all spaces, and truncates to 40 characters.
///
/// Idempotent: `simplify(simplify(x)) == simplify(x)`.
pub fn simplify(s: &str) -> String {
    simplify_opt(s, false)
}

/// [`simplify`], additionally stripping a leading article/prefix
/// (`LAKE`, `MT`, `ILE DE`, `THE`, …) to form the variant key.
pub fn simplify_variant(s: &str) -> String {
    simplify_opt(s, true)
}

fn simplify_opt(s: &str, as_variant: bool) -> String {
    let base = match s.find('(') {
        Some(pos) => &s[..pos],
        None => s,
    };

    let upper = plain_ascii(base).to_ascii_uppercase();
    let mut spaced = String::with_capacity(upper.len());

    for ch in upper.chars() {
        match ch {
            'A'..='Z' | '0'..='9' => spaced.push(ch),
            ' ' | '-' | '.' => spaced.push(' '),
            _ => {}
        }
    }

    let compressed: Vec<&str> = spaced
        .split_whitespace()
        .map(|w| match w {
            "FORT" => "FT",
            "MOUNT" => "MT",
            "POINT" => "PT",
            "SAINT" => "ST",
            "SAINTE" => "STE",
            other => other,
        })
        .collect();
    let mut joined = compressed.join(" ");

    if as_variant {
        for prefix in VARIANT_PREFIXES {
            // "ILE D" matches without a following space: the apostrophe of
            // "Ile d'Orleans" was deleted above, fusing the D to the next word.
            let stripped = if let Some(rest) = joined.strip_prefix(&format!("{prefix} ")) {
                Some(rest.trim_start().to_string())
            } else if prefix == "ILE D" && joined.len() > prefix.len() {
                joined.strip_prefix(prefix).map(|r| r.to_string())
            } else {
                None
            };

            if let Some(rest) = stripped {
                if !rest.is_empty() {
                    joined = rest;
                }
                break;
            }
        }
    }

    joined
        .chars()
        .filter(|c| *c != ' ')
        .take(MAX_KEY_LENGTH)
        .collect()
}

/// Case- and diacritic-insensitive prefix check between two raw names.
pub fn starts_with_icnd(s: &str, prefix: &str) -> bool {
    let simplified_prefix = simplify(prefix);
    if simplified_prefix.is_empty() {
        return true;
    }
    simplify(s).starts_with(&simplified_prefix)
}

/// Case-insensitive equality on raw text.
pub fn eqci(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ascii_is_identity_on_printable_ascii() {
        let s = " !0@AZaz~ the quick brown fox 123";
        assert_eq!(plain_ascii(s), s);
    }

    #[test]
    fn plain_ascii_ligatures() {
        assert_eq!(plain_ascii("Æther"), "Aether");
        assert_eq!(plain_ascii("straße"), "strasse");
        assert_eq!(plain_ascii("Þórshöfn"), "Thorshofn");
        assert_eq!(plain_ascii("Œuvre"), "Oeuvre");
        assert_eq!(plain_ascii("Ĳsselmeer"), "Ijsselmeer");
    }

    #[test]
    fn plain_ascii_latin_extended_a() {
        assert_eq!(plain_ascii("Łódź"), "Lodz");
        assert_eq!(plain_ascii("Ťažký"), "Tazky");
        assert_eq!(plain_ascii("Ħaż-Żabbar"), "Haz-Zabbar");
    }

    #[test]
    fn plain_ascii_combining_marks_dropped() {
        // "e" + U+0301 combining acute
        assert_eq!(plain_ascii("Saint-E\u{301}tienne"), "Saint-Etienne");
    }

    #[test]
    fn plain_ascii_dashes_and_ellipsis() {
        assert_eq!(plain_ascii("a\u{2014}b"), "a--b");
        assert_eq!(plain_ascii("a\u{2015}b"), "a--b");
        assert_eq!(plain_ascii("a\u{2013}b"), "a-b");
        assert_eq!(plain_ascii("wait\u{2026}"), "wait...");
    }

    #[test]
    fn plain_ascii_unknown_becomes_underscore() {
        assert_eq!(plain_ascii("x\u{4E2D}y"), "x_y");
    }

    #[test]
    fn file_name_mode_substitutions() {
        assert_eq!(plain_ascii_for_file_name("a/b:c|d"), "a-b-c-d");
        assert_eq!(plain_ascii_for_file_name("\"x\""), "'x'");
        assert_eq!(plain_ascii_for_file_name("[a]<b>"), "(a)(b)");
        assert_eq!(plain_ascii_for_file_name(".hidden"), "!hidden");
        // Not leading: the dot stays.
        assert_eq!(plain_ascii_for_file_name("a.b"), "a.b");
    }

    #[test]
    fn file_name_mode_suppresses_decorative_expansions() {
        assert_eq!(plain_ascii("\u{A9}"), "(c)");
        assert_eq!(plain_ascii_for_file_name("\u{A9}"), "_");
        assert_eq!(plain_ascii("\u{2122}"), "(TM)");
        assert_eq!(plain_ascii_for_file_name("\u{2122}"), "_");
    }

    #[test]
    fn simplify_diacritics_and_compression() {
        assert_eq!(simplify("Saint-Étienne"), "STETIENNE");
        assert_eq!(simplify("Mt. Washington"), "MTWASHINGTON");
        assert_eq!(simplify("Mount Washington"), "MTWASHINGTON");
        assert_eq!(simplify("Fort Lauderdale"), "FTLAUDERDALE");
        assert_eq!(simplify("Sainte-Foy"), "STEFOY");
        assert_eq!(simplify("Point Pleasant"), "PTPLEASANT");
    }

    #[test]
    fn simplify_strips_parenthetical_tail() {
        assert_eq!(simplify("Springfield (Hampden County)"), "SPRINGFIELD");
    }

    #[test]
    fn simplify_is_idempotent() {
        for s in [
            "Saint-Étienne",
            "Mt. Washington",
            "Nashua",
            "Ft. Worth",
            "San José (Costa Rica)",
            "90210",
        ] {
            let once = simplify(s);
            assert_eq!(simplify(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn simplify_truncates_to_forty() {
        let long = "Llanfairpwllgwyngyllgogerychwyrndrobwllllantysiliogogogoch";
        assert_eq!(simplify(long).len(), MAX_KEY_LENGTH);
    }

    #[test]
    fn simplify_variant_strips_prefixes() {
        assert_eq!(simplify_variant("Lake Placid"), "PLACID");
        assert_eq!(simplify_variant("Mount Shasta"), "SHASTA");
        assert_eq!(simplify_variant("The Dalles"), "DALLES");
        assert_eq!(simplify_variant("Los Angeles"), "ANGELES");
        assert_eq!(simplify_variant("Ile d'Orléans"), "ORLEANS");
        assert_eq!(simplify_variant("Ile de la Gonâve"), "LAGONAVE");
    }

    #[test]
    fn simplify_variant_leaves_non_prefixed_names() {
        assert_eq!(simplify_variant("Laredo"), "LAREDO");
        assert_eq!(simplify_variant("Lakewood"), "LAKEWOOD");
        assert_eq!(simplify_variant("Nashua"), "NASHUA");
    }

    #[test]
    fn simplify_variant_never_empties_a_name() {
        assert_eq!(simplify_variant("The"), "THE");
        assert_eq!(simplify_variant("Lake"), "LAKE");
    }

    #[test]
    fn starts_with_icnd_basics() {
        assert!(starts_with_icnd("Nashua", "nash"));
        assert!(starts_with_icnd("Saint-Étienne", "st etienne"));
        assert!(starts_with_icnd("anything", ""));
        assert!(!starts_with_icnd("Nashua", "Manchester"));
    }
}
