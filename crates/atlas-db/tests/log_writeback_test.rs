//! Integration tests for the search log, writeback, and zone lookup.
//!
//! Gated on `DATABASE_URL` like the ladder tests.

use atlas_core::defaults::{SOURCE_GEONAMES_GENERAL, SOURCE_GETTY};
use atlas_core::AtlasLocation;
use atlas_db::test_fixtures::{reset_schema, seed, test_database, test_lock};

fn remote_location() -> AtlasLocation {
    AtlasLocation {
        city: "Keene".into(),
        county: "Cheshire County".into(),
        state: "NH".into(),
        country: "USA".into(),
        latitude: 42.9337,
        longitude: -72.2781,
        elevation: 148.0,
        zone: "America/New_York".into(),
        rank: 2,
        place_type: "P.PPL".into(),
        source: SOURCE_GEONAMES_GENERAL,
        geoname_id: 5085688,
        ..Default::default()
    }
}

#[tokio::test]
async fn search_log_recency_and_sticky_extended() {
    let _guard = test_lock().await;
    let Some(db) = test_database().await else { return };
    reset_schema(&db.pool).await.unwrap();

    // Nothing logged yet.
    assert!(!db
        .search_log
        .has_search_been_done_recently("Nashua, NH", false)
        .await
        .unwrap());

    // Log a non-extended search: recent for non-extended, not for extended.
    db.search_log.log_search("Nashua, NH", false, 1).await.unwrap();
    assert!(db
        .search_log
        .has_search_been_done_recently("Nashua, NH", false)
        .await
        .unwrap());
    assert!(!db
        .search_log
        .has_search_been_done_recently("Nashua, NH", true)
        .await
        .unwrap());

    // An extended search stickies the flag; both kinds are now recent.
    db.search_log.log_search("Nashua, NH", true, 1).await.unwrap();
    assert!(db
        .search_log
        .has_search_been_done_recently("Nashua, NH", true)
        .await
        .unwrap());
    assert!(db
        .search_log
        .has_search_been_done_recently("Nashua, NH", false)
        .await
        .unwrap());

    // A later non-extended log must not clear the sticky flag.
    db.search_log.log_search("Nashua, NH", false, 1).await.unwrap();
    assert!(db
        .search_log
        .has_search_been_done_recently("Nashua, NH", true)
        .await
        .unwrap());

    let hits: i64 =
        sqlx::query_scalar("SELECT hits FROM atlas_searches2 WHERE search_string = 'Nashua, NH'")
            .fetch_one(&db.pool)
            .await
            .unwrap();
    assert_eq!(hits, 3);
}

#[tokio::test]
async fn stale_rows_are_not_recent() {
    let _guard = test_lock().await;
    let Some(db) = test_database().await else { return };
    reset_schema(&db.pool).await.unwrap();

    sqlx::query(
        "INSERT INTO atlas_searches2 (search_string, extended, hits, matches, time_stamp) \
         VALUES ('Old Town, ME', TRUE, 1, 1, DATE_SUB(CURRENT_TIMESTAMP, INTERVAL 13 MONTH))",
    )
    .execute(&db.pool)
    .await
    .unwrap();

    assert!(!db
        .search_log
        .has_search_been_done_recently("Old Town, ME", false)
        .await
        .unwrap());
}

#[tokio::test]
async fn writeback_inserts_new_remote_location() {
    let _guard = test_lock().await;
    let Some(db) = test_database().await else { return };
    reset_schema(&db.pool).await.unwrap();
    seed(&db.pool).await.unwrap();

    let written = db.writeback.record_locations(&[remote_location()]).await.unwrap();
    assert_eq!(written, 1);

    let (name, sound): (String, String) =
        sqlx::query_as("SELECT name, sound FROM atlas2 WHERE key_name = 'KEENE'")
            .fetch_one(&db.pool)
            .await
            .unwrap();
    assert_eq!(name, "Keene");
    assert!(!sound.is_empty(), "SOUNDEX must be computed on insert");

    // A second pass finds the row in place and writes nothing.
    let written = db.writeback.record_locations(&[remote_location()]).await.unwrap();
    assert_eq!(written, 0);
}

#[tokio::test]
async fn writeback_update_collapses_duplicate_ids() {
    let _guard = test_lock().await;
    let Some(db) = test_database().await else { return };
    reset_schema(&db.pool).await.unwrap();

    // Two stale rows under the same remote id.
    for suffix in ["A", "B"] {
        sqlx::query(
            "INSERT INTO atlas2 (key_name, name, country, latitude, longitude, `rank`, source, geonames_id) \
             VALUES ('KEENE', ?, 'USA', 42.9, -72.2, 1, 103, 5085688)",
        )
        .bind(format!("Keene {suffix}"))
        .execute(&db.pool)
        .await
        .unwrap();
    }

    let mut update = remote_location();
    update.source = SOURCE_GETTY;
    update.use_as_update = true;
    db.writeback.record_locations(&[update]).await.unwrap();

    let rows: Vec<(String,)> = sqlx::query_as("SELECT name FROM atlas2 WHERE geonames_id = 5085688")
        .fetch_all(&db.pool)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1, "duplicates must be deleted");
    assert_eq!(rows[0].0, "Keene");
}

#[tokio::test]
async fn writeback_backfills_missing_admin_columns() {
    let _guard = test_lock().await;
    let Some(db) = test_database().await else { return };
    reset_schema(&db.pool).await.unwrap();

    sqlx::query(
        "INSERT INTO atlas2 (key_name, name, admin2, admin1, country, latitude, longitude, `rank`, source) \
         VALUES ('KEENE', 'Keene', '', 'NH', 'USA', 42.9337, -72.2781, 2, 1)",
    )
    .execute(&db.pool)
    .await
    .unwrap();

    db.writeback.record_locations(&[remote_location()]).await.unwrap();

    let admin2: String = sqlx::query_scalar("SELECT admin2 FROM atlas2 WHERE key_name = 'KEENE'")
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(admin2, "Cheshire County");
}

#[tokio::test]
async fn zone_lookup_prefers_specific_keys() {
    let _guard = test_lock().await;
    let Some(db) = test_database().await else { return };
    reset_schema(&db.pool).await.unwrap();
    seed(&db.pool).await.unwrap();

    // State-level key: one zone, no ambiguity marker.
    let zone = db.zones.get_time_zone("USA", "NH", "").await.unwrap();
    assert_eq!(zone.as_deref(), Some("America/New_York"));

    // Country-level key lists several zones: first one, marked ambiguous.
    let zone = db.zones.get_time_zone("USA", "ZZ", "").await.unwrap();
    assert_eq!(zone.as_deref(), Some("America/New_York?"));

    let zone = db.zones.get_time_zone("FRA", "", "").await.unwrap();
    assert_eq!(zone.as_deref(), Some("Europe/Paris"));

    let zone = db.zones.get_time_zone("Nowhere", "", "").await.unwrap();
    assert_eq!(zone, None);
}
