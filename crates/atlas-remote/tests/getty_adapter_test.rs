//! Integration tests for the Getty adapter against a mock server.

use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use atlas_core::defaults::SOURCE_GETTY;
use atlas_core::Error;
use atlas_gazetteer::Gazetteer;
use atlas_remote::{GettyClient, RemoteQuery};

const RESULT_PAGE: &str = r#"<HTML><BODY>
<TABLE>
<TR><TD><A HREF="TGNFullDisplay?find=nashua&subjectid=7013639">1.</A></TD>
<TD><B>Nashua</B></TD></TR>
<TR><TD>(World, North and Central America, United States, New Hampshire, Hillsborough) (inhabited place)</TD></TR>
<HR>
</TABLE>
</BODY></HTML>"#;

const FULL_RECORD: &str = r#"<HTML><BODY>
<B>Nashua</B>
Lat: 42 45 00 N degrees minutes Lat: 42.7500 decimal degrees
Long: 071 28 00 W degrees minutes Long: -71.4667 decimal degrees
</BODY></HTML>"#;

fn client_for(server: &MockServer, timeout: Duration, soft: Duration) -> GettyClient {
    GettyClient::with_config(reqwest::Client::new(), server.uri(), timeout, soft)
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
async fn no_results_page_is_ok_and_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/TGNServlet"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<HTML>Your search has produced no results.</HTML>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let gaz = Gazetteer::from_embedded().unwrap();
    let outcome = client_for(&server, Duration::from_secs(30), Duration::from_secs(10))
        .search(&gaz.data(), &query("Xyzzy", ""))
        .await
        .unwrap();

    assert!(outcome.locations.is_empty());
    assert_eq!(outcome.metrics.raw_count, 0);
    assert_eq!(outcome.metrics.failed_syntax, 0);
}

#[tokio::test]
async fn server_error_line_fails_the_adapter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/TGNServlet"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<HTML>A server error has occurred.</HTML>"),
        )
        .mount(&server)
        .await;

    let gaz = Gazetteer::from_embedded().unwrap();
    let err = client_for(&server, Duration::from_secs(30), Duration::from_secs(10))
        .search(&gaz.data(), &query("Nashua", ""))
        .await
        .unwrap_err();

    match err {
        Error::RemoteProtocol(msg) => assert_eq!(msg, "Getty server error"),
        other => panic!("expected protocol error, got {other:?}"),
    }
}

#[tokio::test]
async fn invalid_syntax_is_recorded_not_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/TGNServlet"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<HTML>Invalid search syntax.</HTML>"),
        )
        .mount(&server)
        .await;

    let gaz = Gazetteer::from_embedded().unwrap();
    let outcome = client_for(&server, Duration::from_secs(30), Duration::from_secs(10))
        .search(&gaz.data(), &query("((", ""))
        .await
        .unwrap();

    assert!(outcome.locations.is_empty());
    assert_eq!(outcome.metrics.failed_syntax, 1);
}

#[tokio::test]
async fn two_phase_scrape_produces_located_place() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/TGNServlet"))
        .and(query_param("find", "Nashua"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RESULT_PAGE))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/TGNFullDisplay"))
        .and(query_param("subjectid", "7013639"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FULL_RECORD))
        .expect(1)
        .mount(&server)
        .await;

    let gaz = Gazetteer::from_embedded().unwrap();
    let outcome = client_for(&server, Duration::from_secs(30), Duration::from_secs(10))
        .search(&gaz.data(), &query("Nashua", "NH"))
        .await
        .unwrap();

    assert_eq!(outcome.metrics.raw_count, 1);
    assert_eq!(outcome.metrics.retrieved_count, 1);
    assert_eq!(outcome.locations.len(), 1);

    let loc = outcome.locations.values().next().unwrap();
    assert_eq!(loc.city, "Nashua");
    assert_eq!(loc.state, "NH");
    assert_eq!(loc.country, "USA");
    assert_eq!(loc.county, "Hillsborough County");
    assert_eq!(loc.place_type, "P.PPL");
    assert_eq!(loc.source, SOURCE_GETTY);
    assert_eq!(loc.geoname_id, 7013639);
    assert!((loc.latitude - 42.75).abs() < 1e-9);
    assert!((loc.longitude + 71.4667).abs() < 1e-9);
}

#[tokio::test]
async fn exhausted_soft_budget_keeps_preliminary_matches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/TGNServlet"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RESULT_PAGE))
        .mount(&server)
        .await;
    // Slow full-record endpoint; with a zero soft budget it is never called.
    Mock::given(method("GET"))
        .and(path("/TGNFullDisplay"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(FULL_RECORD)
                .set_delay(Duration::from_secs(5)),
        )
        .expect(0)
        .mount(&server)
        .await;

    let gaz = Gazetteer::from_embedded().unwrap();
    let outcome = client_for(&server, Duration::from_secs(30), Duration::from_secs(0))
        .search(&gaz.data(), &query("Nashua", "NH"))
        .await
        .unwrap();

    assert_eq!(outcome.metrics.raw_count, 1);
    assert_eq!(outcome.metrics.retrieved_count, 0);
    // The place survives without coordinates.
    assert_eq!(outcome.locations.len(), 1);
    let loc = outcome.locations.values().next().unwrap();
    assert_eq!(loc.latitude, 0.0);
}

#[tokio::test]
async fn hard_deadline_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/TGNServlet"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(RESULT_PAGE)
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let gaz = Gazetteer::from_embedded().unwrap();
    let err = client_for(&server, Duration::from_millis(50), Duration::from_millis(25))
        .search(&gaz.data(), &query("Nashua", "NH"))
        .await
        .unwrap_err();

    match err {
        Error::RemoteTimeout { source_name, .. } => assert_eq!(source_name, "Getty"),
        other => panic!("expected timeout, got {other:?}"),
    }
}
