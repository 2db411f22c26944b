//! Client for the GOV historical directory service.
//!
//! This is an enrichment path separate from the pipeline: GOV results
//! (historical names, cross-references) are candidates for the `aliases`
//! field of a record. The pipeline never depends on this module.

pub mod client;

pub use client::{GovClient, GovPlace};
