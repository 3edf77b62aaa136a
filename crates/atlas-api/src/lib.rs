//! # atlas-api
//!
//! HTTP surface and orchestration for the atlas place-name service.

pub mod orchestrator;
pub mod params;
pub mod render;
pub mod suggestions;

pub use orchestrator::{run_search, AppState};
pub use params::{AtlasParams, RemoteMode, SearchOptions};
