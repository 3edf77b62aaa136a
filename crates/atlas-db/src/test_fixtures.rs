//! Test fixtures for database integration tests.
//!
//! Integration tests need a live MySQL instance; they are gated on the
//! `DATABASE_URL` (or `ATLAS_TEST_DATABASE_URL`) environment variable and
//! skip silently when neither is set. The fixture creates the contract
//! tables when absent, truncates them, and seeds a small, recognizable
//! data set.

use sqlx::mysql::MySqlPool;
use std::sync::{Mutex, MutexGuard, OnceLock};

use atlas_core::Result;

use crate::Database;

/// Serializes tests that mutate process-global environment variables.
pub fn env_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    match LOCK.get_or_init(|| Mutex::new(())).lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Serializes integration tests sharing the seeded tables.
pub async fn test_lock() -> tokio::sync::MutexGuard<'static, ()> {
    static LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());
    LOCK.lock().await
}

/// Connect to the test database, or `None` when no URL is configured.
pub async fn test_database() -> Option<Database> {
    let url = std::env::var("ATLAS_TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()?;
    match Database::connect(&url).await {
        Ok(db) => Some(db),
        Err(e) => {
            eprintln!("test database unavailable ({e}); skipping");
            None
        }
    }
}

/// Create the contract tables when absent and reset their contents.
pub async fn reset_schema(pool: &MySqlPool) -> Result<()> {
    for ddl in [
        "CREATE TABLE IF NOT EXISTS atlas2 ( \
             item_no BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY, \
             key_name VARCHAR(40) NOT NULL, \
             variant VARCHAR(40) NOT NULL DEFAULT '', \
             name VARCHAR(120) NOT NULL, \
             admin2 VARCHAR(80) NOT NULL DEFAULT '', \
             admin1 VARCHAR(80) NOT NULL DEFAULT '', \
             country CHAR(3) NOT NULL, \
             latitude DOUBLE NOT NULL, \
             longitude DOUBLE NOT NULL, \
             elevation DOUBLE NOT NULL DEFAULT 0, \
             time_zone VARCHAR(60) NOT NULL DEFAULT '', \
             postal_code VARCHAR(12) NOT NULL DEFAULT '', \
             `rank` INT NOT NULL DEFAULT 0, \
             feature_type VARCHAR(10) NOT NULL DEFAULT '', \
             sound VARCHAR(10) NOT NULL DEFAULT '', \
             source INT NOT NULL DEFAULT 0, \
             geonames_id BIGINT NOT NULL DEFAULT 0, \
             KEY idx_key_name (key_name), \
             KEY idx_variant (variant), \
             KEY idx_postal (postal_code), \
             KEY idx_sound (sound), \
             KEY idx_geonames (geonames_id))",
        "CREATE TABLE IF NOT EXISTS atlas_alt_names ( \
             alt_key_name VARCHAR(40) NOT NULL, \
             atlas_key_name VARCHAR(40) NOT NULL, \
             alt_name VARCHAR(120) NOT NULL, \
             misspelling CHAR(1) NOT NULL DEFAULT 'N', \
             specific_item2 BIGINT NOT NULL DEFAULT 0, \
             KEY idx_alt_key (alt_key_name))",
        "CREATE TABLE IF NOT EXISTS atlas_searches2 ( \
             search_string VARCHAR(150) NOT NULL PRIMARY KEY, \
             extended BOOLEAN NOT NULL DEFAULT FALSE, \
             hits INT NOT NULL DEFAULT 0, \
             matches INT NOT NULL DEFAULT 0, \
             time_stamp TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP)",
        "CREATE TABLE IF NOT EXISTS atlas_log ( \
             time_stamp TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP, \
             warning BOOLEAN NOT NULL DEFAULT FALSE, \
             message VARCHAR(500) NOT NULL)",
        "CREATE TABLE IF NOT EXISTS zone_lookup ( \
             location VARCHAR(120) NOT NULL PRIMARY KEY, \
             zones VARCHAR(300) NOT NULL)",
        "TRUNCATE TABLE atlas2",
        "TRUNCATE TABLE atlas_alt_names",
        "TRUNCATE TABLE atlas_searches2",
        "TRUNCATE TABLE atlas_log",
        "TRUNCATE TABLE zone_lookup",
    ] {
        sqlx::query(ddl).execute(pool).await?;
    }
    Ok(())
}

/// Seed the recognizable fixture rows used across the integration tests.
pub async fn seed(pool: &MySqlPool) -> Result<()> {
    let places: &[(&str, &str, &str, &str, &str, &str, f64, f64, f64, &str, &str, i32, &str, i32, i64)] = &[
        // key, variant, name, admin2, admin1, country, lat, lon, elev, zone, zip, rank, type, source, geonames
        ("NASHUA", "", "Nashua", "Hillsborough County", "NH", "USA",
         42.7654, -71.4676, 41.0, "America/New_York", "", 2, "P.PPL", 1, 5088438),
        ("MANCHESTER", "", "Manchester", "Hillsborough County", "NH", "USA",
         42.9956, -71.4548, 70.0, "America/New_York", "", 3, "P.PPL", 1, 5089178),
        ("BEVERLYHILLS", "", "Beverly Hills", "Los Angeles County", "CA", "USA",
         34.0736, -118.4004, 78.0, "America/Los_Angeles", "90210", 3, "P.PPL", 1, 5328041),
        ("PARIS", "", "Paris", "", "", "FRA",
         48.8566, 2.3522, 35.0, "Europe/Paris", "", 4, "P.PPLC", 1, 2988507),
        ("PARIS", "", "Paris", "Lamar County", "TX", "USA",
         33.6609, -95.5555, 183.0, "America/Chicago", "", 2, "P.PPL", 1, 4717560),
        ("MTWASHINGTON", "WASHINGTON", "Mount Washington", "Coos County", "NH", "USA",
         44.2706, -71.3033, 1916.6, "America/New_York", "", 2, "T.MT", 1, 5090490),
        ("STETIENNE", "", "Saint-Étienne", "", "", "FRA",
         45.4347, 4.3903, 516.0, "Europe/Paris", "", 3, "P.PPL", 1, 2980291),
    ];

    for p in places {
        sqlx::query(
            "INSERT INTO atlas2 \
                 (key_name, variant, name, admin2, admin1, country, latitude, longitude, \
                  elevation, time_zone, postal_code, `rank`, feature_type, sound, source, geonames_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, SOUNDEX(?), ?, ?)",
        )
        .bind(p.0).bind(p.1).bind(p.2).bind(p.3).bind(p.4).bind(p.5)
        .bind(p.6).bind(p.7).bind(p.8).bind(p.9).bind(p.10).bind(p.11)
        .bind(p.12).bind(p.0).bind(p.13).bind(p.14)
        .execute(pool)
        .await?;
    }

    sqlx::query(
        "INSERT INTO atlas_alt_names (alt_key_name, atlas_key_name, alt_name, misspelling, specific_item2) \
         VALUES ('MANCHVEGAS', 'MANCHESTER', 'ManchVegas', 'N', 0), \
                ('NASHOA', 'NASHUA', 'Nashoa', 'Y', 0)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "INSERT INTO zone_lookup (location, zones) \
         VALUES ('USA:NH', 'America/New_York'), \
                ('USA:CA', 'America/Los_Angeles'), \
                ('USA', 'America/New_York,America/Chicago,America/Denver,America/Los_Angeles'), \
                ('FRA', 'Europe/Paris')",
    )
    .execute(pool)
    .await?;

    Ok(())
}
