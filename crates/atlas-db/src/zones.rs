//! Time-zone assignment for remote results.
//!
//! Remote gazetteers rarely report an IANA zone; the `zone_lookup` table maps
//! `simplify(country)[:state][:county]` keys to candidate zones. The most
//! specific key wins; several candidates produce a `?`-suffixed (ambiguous)
//! zone per the zone contract.

use sqlx::mysql::MySqlPool;
use tracing::trace;

use atlas_core::{simplify, Result};

/// Repository for the `zone_lookup` table.
pub struct ZoneRepository {
    pool: MySqlPool,
}

impl ZoneRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Resolve a zone for a country/state/county triple; `None` when the
    /// table has nothing at any specificity.
    pub async fn get_time_zone(
        &self,
        country: &str,
        state: &str,
        county: &str,
    ) -> Result<Option<String>> {
        let base = simplify(country);
        if base.is_empty() {
            return Ok(None);
        }

        let mut keys = Vec::with_capacity(3);
        let state = state.trim().to_ascii_uppercase();
        let county_key = simplify(county);
        if !state.is_empty() && !county_key.is_empty() {
            keys.push(format!("{base}:{state}:{county_key}"));
        }
        if !state.is_empty() {
            keys.push(format!("{base}:{state}"));
        }
        keys.push(base);

        for key in keys {
            let zones: Option<String> =
                sqlx::query_scalar("SELECT zones FROM zone_lookup WHERE location = ?")
                    .bind(&key)
                    .fetch_optional(&self.pool)
                    .await?;

            if let Some(zones) = zones {
                let mut candidates = zones.split(',').map(str::trim).filter(|z| !z.is_empty());
                let Some(first) = candidates.next() else { continue };
                let ambiguous = candidates.next().is_some();
                let zone = if ambiguous {
                    format!("{first}?")
                } else {
                    first.to_string()
                };
                trace!(
                    subsystem = "db",
                    component = "zones",
                    key = %key,
                    zone = %zone,
                    "Zone resolved"
                );
                return Ok(Some(zone));
            }
        }

        Ok(None)
    }

    /// Fill empty zones on remote-sourced locations in place.
    pub async fn fill_zones(&self, locations: &mut atlas_core::LocationMap) -> Result<()> {
        for loc in locations.values_mut() {
            if !loc.zone.is_empty() || !loc.is_remote() {
                continue;
            }
            if let Some(zone) = self
                .get_time_zone(&loc.country, &loc.state, &loc.county)
                .await?
            {
                loc.zone = zone;
            }
        }
        Ok(())
    }
}
