//! Opportunistic writeback of remote-sourced locations.
//!
//! Anything a remote gazetteer taught us — a brand-new place, or fresher
//! data for a row we already had — is folded back into `atlas2` so the next
//! query is served locally.

use sqlx::mysql::MySqlPool;
use tracing::{debug, info};

use atlas_core::defaults::SAME_SITE_KM;
use atlas_core::{simplify, simplify_variant, AtlasLocation, Result};

/// Just the columns reconciliation needs.
const EXISTING_COLUMNS: &str = "item_no, COALESCE(admin2, '') AS admin2, \
     COALESCE(admin1, '') AS admin1, country, latitude, longitude";

#[derive(Debug, sqlx::FromRow)]
struct ExistingRow {
    item_no: i64,
    admin2: String,
    admin1: String,
    country: String,
    latitude: f64,
    longitude: f64,
}

/// Repository performing insert-or-update of remote discoveries.
pub struct WritebackRepository {
    pool: MySqlPool,
}

impl WritebackRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Fold every remote-sourced or update-marked location back into the
    /// database. Returns how many rows were written (inserted or updated).
    pub async fn record_locations(&self, locations: &[AtlasLocation]) -> Result<usize> {
        let mut written = 0usize;

        for loc in locations {
            if !loc.is_remote() && !loc.use_as_update {
                continue;
            }
            if self.record_one(loc).await? {
                written += 1;
            }
        }

        if written > 0 {
            info!(
                subsystem = "db",
                component = "writeback",
                result_count = written,
                "Remote locations written back"
            );
        }
        Ok(written)
    }

    async fn record_one(&self, loc: &AtlasLocation) -> Result<bool> {
        // Update path: the row is identified by its remote id; stray
        // duplicates under the same id are collapsed into the first.
        if loc.use_as_update && loc.geoname_id > 0 {
            let item_nos: Vec<i64> =
                sqlx::query_scalar("SELECT item_no FROM atlas2 WHERE geonames_id = ? ORDER BY item_no")
                    .bind(loc.geoname_id)
                    .fetch_all(&self.pool)
                    .await?;

            if let Some((&first, rest)) = item_nos.split_first() {
                self.update_row(first, loc).await?;
                for &extra in rest {
                    sqlx::query("DELETE FROM atlas2 WHERE item_no = ?")
                        .bind(extra)
                        .execute(&self.pool)
                        .await?;
                    debug!(
                        subsystem = "db",
                        component = "writeback",
                        item_no = extra,
                        geonames_id = loc.geoname_id,
                        "Deleted duplicate row during writeback"
                    );
                }
                return Ok(true);
            }
        }

        // Lookup path: same key, same country, same site, and (outside
        // US/CAN) any state, else the same state.
        let key = simplify(&loc.city);
        let rows: Vec<ExistingRow> = sqlx::query_as(&format!(
            "SELECT {EXISTING_COLUMNS} FROM atlas2 WHERE key_name = ?"
        ))
        .bind(&key)
        .fetch_all(&self.pool)
        .await?;

        let found = rows.iter().find(|row| {
            if row.country != loc.country {
                return false;
            }
            let stand_in = AtlasLocation {
                latitude: row.latitude,
                longitude: row.longitude,
                ..Default::default()
            };
            if loc.distance_km(&stand_in) >= SAME_SITE_KM {
                return false;
            }
            !loc.uses_state_key() || row.admin1.eq_ignore_ascii_case(&loc.state)
        });

        match found {
            None => {
                self.insert_row(&key, loc).await?;
                Ok(true)
            }
            Some(row) if loc.use_as_update => {
                self.update_row(row.item_no, loc).await?;
                Ok(true)
            }
            Some(row) => {
                // Found but stale: backfill admin columns the old row lacks.
                let fill_admin2 = row.admin2.is_empty() && !loc.county.is_empty();
                let fill_admin1 = row.admin1.is_empty() && !loc.state.is_empty();
                if !fill_admin2 && !fill_admin1 {
                    return Ok(false);
                }
                sqlx::query(
                    "UPDATE atlas2 SET \
                         admin2 = IF(COALESCE(admin2, '') = '', ?, admin2), \
                         admin1 = IF(COALESCE(admin1, '') = '', ?, admin1) \
                     WHERE item_no = ?",
                )
                .bind(&loc.county)
                .bind(&loc.state)
                .bind(row.item_no)
                .execute(&self.pool)
                .await?;
                Ok(true)
            }
        }
    }

    async fn insert_row(&self, key: &str, loc: &AtlasLocation) -> Result<()> {
        sqlx::query(
            "INSERT INTO atlas2 \
                 (key_name, variant, name, admin2, admin1, country, latitude, longitude, \
                  elevation, time_zone, postal_code, `rank`, feature_type, sound, source, geonames_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, SOUNDEX(?), ?, ?)",
        )
        .bind(key)
        .bind(simplify_variant(&loc.city))
        .bind(&loc.city)
        .bind(&loc.county)
        .bind(&loc.state)
        .bind(&loc.country)
        .bind(loc.latitude)
        .bind(loc.longitude)
        .bind(loc.elevation)
        .bind(&loc.zone)
        .bind(&loc.zip)
        .bind(loc.rank)
        .bind(&loc.place_type)
        .bind(key)
        .bind(loc.source)
        .bind(loc.geoname_id)
        .execute(&self.pool)
        .await?;

        debug!(
            subsystem = "db",
            component = "writeback",
            city = %loc.city,
            country = %loc.country,
            source = loc.source,
            "Inserted remote location"
        );
        Ok(())
    }

    async fn update_row(&self, item_no: i64, loc: &AtlasLocation) -> Result<()> {
        let key = simplify(&loc.city);
        sqlx::query(
            "UPDATE atlas2 SET \
                 key_name = ?, variant = ?, name = ?, admin2 = ?, admin1 = ?, country = ?, \
                 latitude = ?, longitude = ?, elevation = ?, time_zone = ?, postal_code = ?, \
                 `rank` = ?, feature_type = ?, sound = SOUNDEX(?), source = ?, geonames_id = ? \
             WHERE item_no = ?",
        )
        .bind(&key)
        .bind(simplify_variant(&loc.city))
        .bind(&loc.city)
        .bind(&loc.county)
        .bind(&loc.state)
        .bind(&loc.country)
        .bind(loc.latitude)
        .bind(loc.longitude)
        .bind(loc.elevation)
        .bind(&loc.zone)
        .bind(&loc.zip)
        .bind(loc.rank)
        .bind(&loc.place_type)
        .bind(&key)
        .bind(loc.source)
        .bind(loc.geoname_id)
        .bind(item_no)
        .execute(&self.pool)
        .await?;

        debug!(
            subsystem = "db",
            component = "writeback",
            item_no,
            city = %loc.city,
            "Updated row from remote data"
        );
        Ok(())
    }
}
