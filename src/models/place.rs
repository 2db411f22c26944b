//! Canonical place record structure written to the line-delimited store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Administrative context of a place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminInfo {
    pub district: Option<String>,
    pub association_name: Option<String>,
    pub association_type: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub area_code: Option<String>,
}

/// Population and area figures from the directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceStats {
    pub population: Option<i64>,
    pub area_hectares: Option<f64>,
}

/// Fixed label for the source coordinate reference system family.
pub const CRS_LABEL: &str = "ETRS89 / UTM (EPSG:258xx)";

/// The projected coordinates as they appeared in the source, kept for
/// provenance next to the derived lat/lon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceProjection {
    pub zone: Option<i32>,
    pub easting: Option<i64>,
    pub northing: Option<i64>,
    pub crs: String,
}

impl Default for SourceProjection {
    fn default() -> Self {
        Self {
            zone: None,
            easting: None,
            northing: None,
            crs: CRS_LABEL.to_string(),
        }
    }
}

/// Geographic position. `lat` and `lon` are jointly present or jointly
/// absent; a record never carries only one of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoInfo {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub utm: SourceProjection,
}

/// Per-source provenance note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceNote {
    pub last_modified: Option<String>,
    pub corrections: Option<String>,
}

/// Source key for the Brandenburg municipal directory.
pub const SOURCE_GEMVERZ: &str = "gemeindeverzeichnis_bb";

/// Canonical place record, immutable once built.
///
/// Every emitted record has a non-empty `place_id` and `name`; rows that
/// cannot satisfy that are dropped by the pipeline and counted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    /// Unique key (Ortsteil-Nr in the source directory).
    pub place_id: String,

    /// Primary display and search name.
    pub name: String,

    /// Alternate-language (Sorbian) name.
    pub name_secondary: Option<String>,

    /// Administrative status/category code.
    pub status_code: Option<String>,

    /// Official classification codes, opaque to the core.
    pub ags: Option<String>,
    pub ars: Option<String>,
    pub gvnr: Option<String>,

    pub admin: AdminInfo,
    pub stats: PlaceStats,
    pub geo: GeoInfo,

    /// Reserved for future enrichment (GOV historical names etc.);
    /// empty at build time.
    pub aliases: Vec<String>,

    /// Source name -> provenance note.
    pub sources: BTreeMap<String, SourceNote>,
}

impl PlaceRecord {
    /// Create a record with the required fields set and everything else
    /// empty.
    pub fn new(place_id: String, name: String) -> Self {
        Self {
            place_id,
            name,
            name_secondary: None,
            status_code: None,
            ags: None,
            ars: None,
            gvnr: None,
            admin: AdminInfo::default(),
            stats: PlaceStats::default(),
            geo: GeoInfo::default(),
            aliases: Vec::new(),
            sources: BTreeMap::new(),
        }
    }

    /// Lowercased, trimmed name used as the search/index key.
    pub fn name_key(&self) -> String {
        self.name.trim().to_lowercase()
    }
}

/// Ranked search result projected from a matched record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceHit {
    pub place_id: String,
    pub name: String,
    pub score: f64,
    pub status_code: Option<String>,
    pub district: Option<String>,
    pub association_name: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_key_trims_and_lowercases() {
        let rec = PlaceRecord::new("1".into(), "  Ahrensfelde ".into());
        assert_eq!(rec.name_key(), "ahrensfelde");
    }

    #[test]
    fn test_record_json_round_trip() {
        let mut rec = PlaceRecord::new("120602".into(), "Ahrensfelde".into());
        rec.status_code = Some("OT".into());
        rec.stats.population = Some(72461);
        rec.stats.area_hectares = Some(22972.5);
        rec.geo.lat = Some(52.7);
        rec.geo.lon = Some(13.6);
        rec.geo.utm.zone = Some(33);
        rec.sources.insert(
            SOURCE_GEMVERZ.to_string(),
            SourceNote {
                last_modified: Some("2024-01-01".into()),
                corrections: None,
            },
        );

        let json = serde_json::to_string(&rec).unwrap();
        let back: PlaceRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(rec, back);
    }

    #[test]
    fn test_default_projection_label() {
        let rec = PlaceRecord::new("1".into(), "x".into());
        assert_eq!(rec.geo.utm.crs, CRS_LABEL);
    }
}
