//! Ortskern - a places backbone for the Brandenburg municipal directory.
//!
//! This library provides shared types and modules for the ingest and query
//! binaries: spreadsheet header normalization, record canonicalization with
//! UTM/ETRS89 to WGS84 conversion, the flat record store, and the in-memory
//! approximate-name search index.

pub mod coerce;
pub mod coords;
pub mod gov;
pub mod headers;
pub mod models;
pub mod pipeline;
pub mod search;
pub mod store;

pub use models::{PlaceHit, PlaceRecord};
pub use search::PlaceSearch;
