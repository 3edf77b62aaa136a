//! Pairwise reconciliation of federated search results.
//!
//! Results from the local database and each remote gazetteer arrive as
//! key-ordered location maps. Buckets group entries whose keys differ only
//! by a collision suffix; within a bucket every pair is reconciled under the
//! tie-break policy below. The traversal is deterministic (sorted keys,
//! index order), so dedup is idempotent and reproducible.

use std::collections::BTreeMap;

use tracing::debug;

use atlas_core::defaults::MIN_EXTERNAL_SOURCE;
use atlas_core::{base_location_key, sort_matches, AtlasLocation, LocationMap};

/// Result of a full merge-and-dedup pass.
#[derive(Debug, Default)]
pub struct DedupOutcome {
    /// Surviving locations in presentation order, at most `limit + 1` long
    /// so the caller can detect that the limit was reached.
    pub matches: Vec<AtlasLocation>,
    /// Human-readable conflict warnings gathered during reconciliation.
    pub warnings: Vec<String>,
}

/// Which side of a pairwise comparison survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    KeepBoth,
    KeepFirst,
    KeepSecond,
}

/// Union several location maps into buckets keyed by base location key.
pub fn merge_location_maps(maps: Vec<LocationMap>) -> BTreeMap<String, Vec<AtlasLocation>> {
    let mut buckets: BTreeMap<String, Vec<AtlasLocation>> = BTreeMap::new();
    for map in maps {
        for (key, loc) in map {
            buckets
                .entry(base_location_key(&key).to_string())
                .or_default()
                .push(loc);
        }
    }
    buckets
}

/// Whether two place types can collapse into one during reconciliation.
///
/// All `P.PPL*` variants are one family; an administrative division and a
/// populated place at the same site describe the same entity.
fn types_compatible(l1: &AtlasLocation, l2: &AtlasLocation, same_site: bool) -> bool {
    if l1.place_type == l2.place_type {
        return true;
    }
    if l1.is_populated() && l2.is_populated() {
        return true;
    }
    if same_site && ((l1.is_admin() && l2.is_populated()) || (l1.is_populated() && l2.is_admin())) {
        return true;
    }
    false
}

/// Generic `P.PPL` upgrades to whichever specific `P.PPLx` the pair carries.
fn fuse_place_types(l1: &mut AtlasLocation, l2: &mut AtlasLocation) {
    if l1.is_populated() && l2.is_populated() && l1.place_type != l2.place_type {
        if l1.place_type == "P.PPL" {
            l1.place_type = l2.place_type.clone();
        } else if l2.place_type == "P.PPL" {
            l2.place_type = l1.place_type.clone();
        }
    }
}

/// Copy a confident zone onto a `?`-suffixed ambiguous one at the same site.
fn resolve_zone_ambiguity(l1: &mut AtlasLocation, l2: &mut AtlasLocation) {
    let l1_ambiguous = l1.zone.ends_with('?');
    let l2_ambiguous = l2.zone.ends_with('?');
    if l1_ambiguous && !l2_ambiguous && !l2.zone.is_empty() {
        l1.zone = l2.zone.clone();
    } else if l2_ambiguous && !l1_ambiguous && !l1.zone.is_empty() {
        l2.zone = l1.zone.clone();
    }
}

/// Reconcile one pair. The survivor may be mutated (rank promotion, zone
/// resolution, writeback marking).
fn reconcile(
    l1: &mut AtlasLocation,
    l2: &mut AtlasLocation,
    warnings: &mut Vec<String>,
) -> Verdict {
    let same_site = l1.is_same_site(l2);

    if same_site {
        resolve_zone_ambiguity(l1, l2);
    }

    // Same remote identity: the older (lower-source) row survives, refreshed
    // from the newer one. The newer source value is recorded only when the
    // survivor actually differs and will be written back.
    if l1.geoname_id != 0 && l1.geoname_id == l2.geoname_id {
        let verdict = if l1.source <= l2.source {
            Verdict::KeepFirst
        } else {
            Verdict::KeepSecond
        };
        let (survivor, loser) = match verdict {
            Verdict::KeepFirst => (l1, l2),
            _ => (l2, l1),
        };
        let already_current = survivor.is_close_match(loser);
        survivor.rank = survivor.rank.max(loser.rank);
        if survivor.zip.is_empty() && !loser.zip.is_empty() {
            survivor.zip = loser.zip.clone();
        }
        if !already_current {
            survivor.use_as_update = true;
            survivor.source = survivor.source.max(loser.source);
        }
        return verdict;
    }

    // A peak wins over the mountain that carries it.
    if same_site {
        if l1.place_type == "T.PK" && l2.place_type == "T.MT" {
            return Verdict::KeepFirst;
        }
        if l1.place_type == "T.MT" && l2.place_type == "T.PK" {
            return Verdict::KeepSecond;
        }
    }

    if !types_compatible(l1, l2, same_site) {
        return Verdict::KeepBoth;
    }
    fuse_place_types(l1, l2);

    if !atlas_core::eqci(&l1.state, &l2.state) {
        if same_site {
            warnings.push(format!(
                "Conflicting states for {}: {} vs. {}",
                l1.city,
                display_or_blank(&l1.state),
                display_or_blank(&l2.state)
            ));
        }
        return keep_better_admin(l1, l2, AdminField::State);
    }

    if !atlas_core::eqci(&l1.county, &l2.county) {
        return keep_better_admin(l1, l2, AdminField::County);
    }

    // Same place, same admin context: prefer local rows over remote ones,
    // then rank, then the side that knows its postal code.
    let l1_local = l1.source < MIN_EXTERNAL_SOURCE;
    let l2_local = l2.source < MIN_EXTERNAL_SOURCE;
    if l1_local != l2_local {
        let (survivor, loser, verdict) = if l1_local {
            (l1, l2, Verdict::KeepFirst)
        } else {
            (l2, l1, Verdict::KeepSecond)
        };
        survivor.rank = survivor.rank.max(loser.rank);
        if survivor.zip.is_empty() && !loser.zip.is_empty() {
            survivor.zip = loser.zip.clone();
        }
        return verdict;
    }

    match l1.rank.cmp(&l2.rank) {
        std::cmp::Ordering::Greater => Verdict::KeepFirst,
        std::cmp::Ordering::Less => Verdict::KeepSecond,
        std::cmp::Ordering::Equal => {
            if !l1.zip.is_empty() && l2.zip.is_empty() {
                Verdict::KeepFirst
            } else if l1.zip.is_empty() && !l2.zip.is_empty() {
                Verdict::KeepSecond
            } else {
                Verdict::KeepFirst
            }
        }
    }
}

enum AdminField {
    State,
    County,
}

/// Differing state/county tie-break: higher rank wins, then the only side
/// with the field populated; a true tie keeps both with the display hint set.
fn keep_better_admin(
    l1: &mut AtlasLocation,
    l2: &mut AtlasLocation,
    field: AdminField,
) -> Verdict {
    let (v1, v2) = match field {
        AdminField::State => (&l1.state, &l2.state),
        AdminField::County => (&l1.county, &l2.county),
    };
    let populated = (!v1.is_empty(), !v2.is_empty());

    match l1.rank.cmp(&l2.rank) {
        std::cmp::Ordering::Greater => return Verdict::KeepFirst,
        std::cmp::Ordering::Less => return Verdict::KeepSecond,
        std::cmp::Ordering::Equal => {}
    }

    match populated {
        (true, false) => Verdict::KeepFirst,
        (false, true) => Verdict::KeepSecond,
        _ => {
            match field {
                AdminField::State => {
                    l1.show_state = true;
                    l2.show_state = true;
                }
                AdminField::County => {
                    l1.show_county = true;
                    l2.show_county = true;
                }
            }
            Verdict::KeepBoth
        }
    }
}

fn display_or_blank(s: &str) -> &str {
    if s.is_empty() {
        "(blank)"
    } else {
        s
    }
}

/// Reconcile every bucket, flatten in key order, truncate to `limit + 1`,
/// and sort into presentation order.
pub fn dedup_and_rank(
    buckets: BTreeMap<String, Vec<AtlasLocation>>,
    limit: usize,
) -> DedupOutcome {
    let mut warnings = Vec::new();
    let mut flattened: Vec<AtlasLocation> = Vec::new();

    for (key, bucket) in buckets {
        let before = bucket.len();
        let mut slots: Vec<Option<AtlasLocation>> = bucket.into_iter().map(Some).collect();

        for i in 0..slots.len() {
            if slots[i].is_none() {
                continue;
            }
            for j in (i + 1)..slots.len() {
                if slots[j].is_none() {
                    continue;
                }
                let mut a = slots[i].take().expect("slot i checked");
                let mut b = slots[j].take().expect("slot j checked");
                match reconcile(&mut a, &mut b, &mut warnings) {
                    Verdict::KeepBoth => {
                        slots[i] = Some(a);
                        slots[j] = Some(b);
                    }
                    Verdict::KeepFirst => {
                        slots[i] = Some(a);
                    }
                    Verdict::KeepSecond => {
                        slots[i] = Some(b);
                    }
                }
                if slots[i].is_none() {
                    break;
                }
            }
        }

        let survivors = slots.into_iter().flatten();
        let after_start = flattened.len();
        flattened.extend(survivors);
        let after = flattened.len() - after_start;
        if after < before {
            debug!(
                subsystem = "dedup",
                key = %key,
                raw_count = before,
                result_count = after,
                "Bucket reconciled"
            );
        }
    }

    flattened.truncate(limit + 1);

    for loc in &mut flattened {
        loc.display_name = loc.build_display_name();
    }
    sort_matches(&mut flattened);

    DedupOutcome {
        matches: flattened,
        warnings,
    }
}

/// Union the given maps and reconcile them in one step.
pub fn merge_and_dedup(maps: Vec<LocationMap>, limit: usize) -> DedupOutcome {
    dedup_and_rank(merge_location_maps(maps), limit)
}
