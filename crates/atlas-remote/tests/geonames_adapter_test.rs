//! Integration tests for the GeoNames adapter against a mock server.

use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use atlas_core::defaults::{SOURCE_GEONAMES_GENERAL, SOURCE_GEONAMES_POSTAL};
use atlas_core::Error;
use atlas_gazetteer::Gazetteer;
use atlas_remote::{GeoNamesClient, RemoteQuery};

fn client_for(server: &MockServer, timeout: Duration) -> GeoNamesClient {
    GeoNamesClient::with_config(
        reqwest::Client::new(),
        server.uri(),
        "skyview".to_string(),
        timeout,
    )
}

fn query(city: &str, state: &str) -> RemoteQuery {
    RemoteQuery {
        target_city: city.to_string(),
        target_state: state.to_string(),
        postal_code: None,
        max_matches: 75,
        no_trace: false,
    }
}

#[tokio::test]
async fn empty_result_array_is_ok_and_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/searchJSON"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "totalResultsCount": 0,
            "geonames": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gaz = Gazetteer::from_embedded().unwrap();
    let outcome = client_for(&server, Duration::from_secs(20))
        .search(&gaz.data(), &query("Nowhereville", ""))
        .await
        .unwrap();

    assert!(outcome.locations.is_empty());
    assert_eq!(outcome.metrics.raw_count, 0);
}

#[tokio::test]
async fn http_500_is_a_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/searchJSON"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let gaz = Gazetteer::from_embedded().unwrap();
    let err = client_for(&server, Duration::from_secs(20))
        .search(&gaz.data(), &query("Nashua", "NH"))
        .await
        .unwrap_err();

    match err {
        Error::RemoteProtocol(msg) => assert!(msg.contains("500"), "got {msg}"),
        other => panic!("expected protocol error, got {other:?}"),
    }
}

#[tokio::test]
async fn error_payload_is_a_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/searchJSON"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": { "message": "user account not enabled", "value": 10 }
        })))
        .mount(&server)
        .await;

    let gaz = Gazetteer::from_embedded().unwrap();
    let err = client_for(&server, Duration::from_secs(20))
        .search(&gaz.data(), &query("Nashua", "NH"))
        .await
        .unwrap_err();

    match err {
        Error::RemoteProtocol(msg) => assert!(msg.contains("user account"), "got {msg}"),
        other => panic!("expected protocol error, got {other:?}"),
    }
}

#[tokio::test]
async fn city_search_maps_and_ranks_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/searchJSON"))
        .and(query_param("name_startsWith", "Nashua"))
        .and(query_param("username", "skyview"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "totalResultsCount": 2,
            "geonames": [
                {
                    "name": "Nashua",
                    "adminCode1": "NH",
                    "adminName1": "New Hampshire",
                    "adminName2": "Hillsborough",
                    "countryCode": "US",
                    "lat": "42.76537",
                    "lng": "-71.46757",
                    "fcl": "P",
                    "fcode": "PPL",
                    "population": 91322,
                    "geonameId": 5088438,
                    "timezone": { "timeZoneId": "America/New_York" }
                },
                {
                    "name": "Nashua Census Designated Place",
                    "adminCode1": "MT",
                    "adminName1": "Montana",
                    "adminName2": "Valley",
                    "countryCode": "US",
                    "lat": "48.13583",
                    "lng": "-106.36",
                    "fcl": "P",
                    "fcode": "PPL",
                    "population": 0,
                    "geonameId": 5668459
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gaz = Gazetteer::from_embedded().unwrap();
    let outcome = client_for(&server, Duration::from_secs(20))
        .search(&gaz.data(), &query("Nashua", "NH"))
        .await
        .unwrap();

    // The census tract is rejected by name processing; only the real city
    // survives.
    assert_eq!(outcome.metrics.raw_count, 2);
    assert_eq!(outcome.locations.len(), 1);

    let loc = outcome.locations.values().next().unwrap();
    assert_eq!(loc.city, "Nashua");
    assert_eq!(loc.state, "NH");
    assert_eq!(loc.country, "USA");
    assert_eq!(loc.county, "Hillsborough County");
    assert_eq!(loc.zone, "America/New_York");
    assert_eq!(loc.source, SOURCE_GEONAMES_GENERAL);
    assert_eq!(loc.geoname_id, 5088438);
    // Populated place (+1) with population (+1), not a capital, under a
    // million people.
    assert_eq!(loc.rank, 2);
    assert_eq!(loc.flag_code, "us");
}

#[tokio::test]
async fn state_filter_drops_wrong_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/searchJSON"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "geonames": [{
                "name": "Nashua",
                "adminCode1": "MT",
                "adminName1": "Montana",
                "countryCode": "US",
                "lat": 48.13583,
                "lng": -106.36,
                "fcl": "P",
                "fcode": "PPL",
                "population": 284,
                "geonameId": 5668459
            }]
        })))
        .mount(&server)
        .await;

    let gaz = Gazetteer::from_embedded().unwrap();
    let outcome = client_for(&server, Duration::from_secs(20))
        .search(&gaz.data(), &query("Nashua", "NH"))
        .await
        .unwrap();

    assert_eq!(outcome.metrics.raw_count, 1);
    assert!(outcome.locations.is_empty());
}

#[tokio::test]
async fn postal_search_pins_rank_nine() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/postalCodeSearchJSON"))
        .and(query_param("postalcode", "90210"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "postalCodes": [{
                "placeName": "Beverly Hills",
                "adminCode1": "CA",
                "adminName2": "Los Angeles",
                "countryCode": "US",
                "postalCode": "90210",
                "lat": 34.0901,
                "lng": -118.4065
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gaz = Gazetteer::from_embedded().unwrap();
    let mut q = query("", "");
    q.postal_code = Some("90210".to_string());

    let outcome = client_for(&server, Duration::from_secs(20))
        .search(&gaz.data(), &q)
        .await
        .unwrap();

    assert_eq!(outcome.locations.len(), 1);
    let loc = outcome.locations.values().next().unwrap();
    assert_eq!(loc.rank, 9);
    assert_eq!(loc.zip, "90210");
    assert_eq!(loc.state, "CA");
    assert_eq!(loc.source, SOURCE_GEONAMES_POSTAL);
}

#[tokio::test]
async fn hard_deadline_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/searchJSON"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "geonames": [] }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let gaz = Gazetteer::from_embedded().unwrap();
    let err = client_for(&server, Duration::from_millis(50))
        .search(&gaz.data(), &query("Nashua", "NH"))
        .await
        .unwrap_err();

    match err {
        Error::RemoteTimeout { source_name, .. } => assert_eq!(source_name, "GeoNames"),
        other => panic!("expected timeout, got {other:?}"),
    }
}
