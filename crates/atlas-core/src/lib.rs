//! # atlas-core
//!
//! Core types for the atlas place-name resolution service:
//! - the [`AtlasLocation`] data model and search result envelope
//! - the text normalization primitives ([`text::plain_ascii`],
//!   [`text::simplify`]) that produce every index key in the system
//! - the shared [`Error`]/[`Result`] types
//! - the structured-logging field schema and centralized defaults

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod text;

pub use error::{Error, Result};
pub use models::{
    append_location, base_location_key, make_location_key, sort_matches, AtlasLocation,
    LocationMap, ParseMode, ParsedSearchString, SearchResult,
};
pub use text::{eqci, plain_ascii, plain_ascii_for_file_name, simplify, simplify_variant,
    starts_with_icnd};
