//! atlas-api — HTTP server for the atlas place-name resolution service.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use atlas_api::{run_search, AppState, AtlasParams, SearchOptions};
use atlas_core::defaults::SERVER_PORT;
use atlas_db::Database;
use atlas_gazetteer::Gazetteer;
use atlas_remote::{GeoNamesClient, GettyClient};

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

async fn atlas_search(
    State(state): State<AppState>,
    Query(params): Query<AtlasParams>,
) -> Response {
    let options = SearchOptions::from_params(&params);
    let result = run_search(&state, &options).await;
    atlas_api::render::respond(&result, &options)
}

async fn ping() -> &'static str {
    "pong"
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "not found").into_response()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let http = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    // First init is the only fatal one; later refreshes fall back to the
    // tables already in memory.
    let gazetteer = Arc::new(Gazetteer::init_from_env(&http).await?);
    let db = Database::connect_from_env().await?;

    let state = AppState {
        geonames: Arc::new(GeoNamesClient::from_env(http.clone())),
        getty: Arc::new(GettyClient::from_env(http.clone())),
        gazetteer,
        db,
        http,
    };

    let app = Router::new()
        .route("/atlas", get(atlas_search))
        .route("/atlas/", get(atlas_search))
        .route("/atlas/ping", get(ping))
        .fallback(not_found)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(SERVER_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!(subsystem = "api", op = "startup", %addr, "atlas-api listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!(subsystem = "api", op = "shutdown", "Shutting down");
        })
        .await?;

    Ok(())
}
