//! Core data models for the place backbone.

pub mod place;

pub use place::{
    AdminInfo, GeoInfo, PlaceHit, PlaceRecord, PlaceStats, SourceNote, SourceProjection,
    CRS_LABEL, SOURCE_GEMVERZ,
};
