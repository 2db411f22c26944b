//! Record Builder: turns normalized spreadsheet rows into canonical
//! `PlaceRecord`s plus the name index.
//!
//! Per-row problems are recoverable: an unparsable numeric cell becomes
//! `None`, a row without `place_id` or `name` is dropped and counted.
//! Only missing input and unresolved required columns are fatal, and both
//! happen before any row is processed.

pub mod reader;

use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};

use crate::coerce::{to_float_safe, to_int_safe, to_str_safe};
use crate::coords::ZoneTransformer;
use crate::headers::{self, HeaderMap};
use crate::models::{PlaceRecord, SourceNote, SOURCE_GEMVERZ};
use crate::store::{self, NameIndex};

/// Counters for one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Data rows seen (header rows excluded).
    pub rows: usize,
    /// Records written.
    pub emitted: usize,
    /// Rows dropped for a blank place_id or name.
    pub skipped: usize,
    /// Records that got a valid lat/lon.
    pub geocoded: usize,
}

/// Build one record from a data row, or `None` when the row lacks its
/// identifier or display name.
pub fn build_row(
    row: &[String],
    header: &HeaderMap,
    transformer: &mut ZoneTransformer,
) -> Option<PlaceRecord> {
    let place_id = to_str_safe(header.cell(row, headers::PLACE_ID))?;
    let name = to_str_safe(header.cell(row, headers::NAME))?;

    let mut rec = PlaceRecord::new(place_id, name);
    rec.name_secondary = to_str_safe(header.cell(row, headers::NAME_SECONDARY));
    rec.status_code = to_str_safe(header.cell(row, headers::STATUS_CODE));
    rec.ags = to_str_safe(header.cell(row, headers::AGS));
    rec.ars = to_str_safe(header.cell(row, headers::ARS));
    rec.gvnr = to_str_safe(header.cell(row, headers::GVNR));

    rec.admin.district = to_str_safe(header.cell(row, headers::DISTRICT));
    rec.admin.association_name = to_str_safe(header.cell(row, headers::ASSOCIATION_NAME));
    rec.admin.association_type = to_str_safe(header.cell(row, headers::ASSOCIATION_TYPE));
    rec.admin.region = to_str_safe(header.cell(row, headers::REGION));
    rec.admin.postal_code = to_str_safe(header.cell(row, headers::POSTAL_CODE));
    rec.admin.area_code = to_str_safe(header.cell(row, headers::AREA_CODE));

    rec.stats.population =
        to_int_safe(header.cell(row, headers::POPULATION)).filter(|v| *v >= 0);
    rec.stats.area_hectares =
        to_float_safe(header.cell(row, headers::AREA_HECTARES)).filter(|v| *v >= 0.0);

    let zone = header.cell(row, headers::UTM_ZONE);
    let easting = header.cell(row, headers::UTM_EASTING);
    let northing = header.cell(row, headers::UTM_NORTHING);
    if let Some((lat, lon)) = transformer.convert(zone, easting, northing) {
        rec.geo.lat = Some(lat);
        rec.geo.lon = Some(lon);
    }
    rec.geo.utm.zone = to_int_safe(zone).map(|v| v as i32);
    rec.geo.utm.easting = to_int_safe(easting);
    rec.geo.utm.northing = to_int_safe(northing);

    rec.sources.insert(
        SOURCE_GEMVERZ.to_string(),
        SourceNote {
            last_modified: to_str_safe(header.cell(row, headers::LAST_MODIFIED)),
            corrections: to_str_safe(header.cell(row, headers::CORRECTIONS)),
        },
    );

    Some(rec)
}

/// Build all records and the name index from sheet rows, in row order.
pub fn build_records(
    rows: &[Vec<String>],
    header: &HeaderMap,
    transformer: &mut ZoneTransformer,
) -> (Vec<PlaceRecord>, NameIndex, BuildStats) {
    let mut records = Vec::new();
    let mut index = NameIndex::new();
    let mut stats = BuildStats::default();

    for row in rows.iter().skip(header.data_start) {
        stats.rows += 1;
        let Some(rec) = build_row(row, header, transformer) else {
            stats.skipped += 1;
            continue;
        };
        if rec.geo.lat.is_some() {
            stats.geocoded += 1;
        }
        index
            .entry(rec.name_key())
            .or_default()
            .push(rec.place_id.clone());
        records.push(rec);
        stats.emitted += 1;
    }

    (records, index, stats)
}

/// Full pipeline run: read, detect headers, build, write both artifacts.
pub fn run(input: &Path, out_places: &Path, out_index: &Path) -> Result<BuildStats> {
    let rows = reader::read_rows(input)?;
    let header = headers::detect(&rows)?;

    let mut transformer = ZoneTransformer::new();
    let (records, index, stats) = build_records(&rows, &header, &mut transformer);

    if stats.skipped > 0 {
        warn!("Dropped {} rows without place_id/name", stats.skipped);
    }

    store::write_places(out_places, &records)?;
    store::write_name_index(out_index, &index)?;

    info!(
        "Pipeline done: {} rows, {} emitted, {} skipped, {} geocoded",
        stats.rows, stats.emitted, stats.skipped, stats.geocoded
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(data_rows: &[&[&str]]) -> Vec<Vec<String>> {
        let header: Vec<String> = [
            "place_id",
            "status_code",
            "name",
            "name_secondary",
            "ags",
            "ars",
            "district",
            "population",
            "area_hectares",
            "utm_zone",
            "utm_easting",
            "utm_northing",
            "last_modified",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let mut rows = vec![header];
        for r in data_rows {
            rows.push(r.iter().map(|s| s.to_string()).collect());
        }
        rows
    }

    fn build(rows: &[Vec<String>]) -> (Vec<PlaceRecord>, NameIndex, BuildStats) {
        let header = headers::detect(rows).unwrap();
        let mut t = ZoneTransformer::new();
        build_records(rows, &header, &mut t)
    }

    const AHRENSFELDE: &[&str] = &[
        "120602",
        "G",
        "Ahrensfelde",
        "",
        "12060004",
        "120600044044",
        "Barnim",
        "72.461",
        "22.972,5",
        "33",
        "400000",
        "5830000",
        "03/2024",
    ];

    #[test]
    fn test_full_row() {
        let rows = sheet(&[AHRENSFELDE]);
        let (records, index, stats) = build(&rows);

        assert_eq!(stats, BuildStats { rows: 1, emitted: 1, skipped: 0, geocoded: 1 });
        let rec = &records[0];
        assert_eq!(rec.place_id, "120602");
        assert_eq!(rec.name, "Ahrensfelde");
        assert_eq!(rec.stats.population, Some(72461));
        assert_eq!(rec.stats.area_hectares, Some(22972.5));
        assert_eq!(rec.geo.utm.zone, Some(33));
        assert_eq!(rec.geo.utm.easting, Some(400000));
        let lat = rec.geo.lat.unwrap();
        let lon = rec.geo.lon.unwrap();
        assert!((45.0..=60.0).contains(&lat) && (5.0..=20.0).contains(&lon));
        assert_eq!(
            rec.sources[SOURCE_GEMVERZ].last_modified.as_deref(),
            Some("03/2024")
        );
        assert_eq!(index["ahrensfelde"], vec!["120602".to_string()]);
    }

    #[test]
    fn test_blank_id_or_name_dropped() {
        let mut no_id = AHRENSFELDE.to_vec();
        no_id[0] = "  ";
        let mut no_name = AHRENSFELDE.to_vec();
        no_name[2] = "";

        let rows = sheet(&[&no_id, &no_name, AHRENSFELDE]);
        let (records, index, stats) = build(&rows);

        assert_eq!(stats.rows, 3);
        assert_eq!(stats.emitted, 1);
        assert_eq!(stats.skipped, 2);
        assert_eq!(records.len(), 1);
        // Dropped rows never reach the index either.
        assert_eq!(index.values().map(Vec::len).sum::<usize>(), 1);
    }

    #[test]
    fn test_bad_numerics_recoverable() {
        let mut row = AHRENSFELDE.to_vec();
        row[7] = "unbekannt";
        row[8] = "-";
        row[10] = "not-a-number";

        let rows = sheet(&[&row]);
        let (records, _, stats) = build(&rows);

        assert_eq!(stats.emitted, 1);
        let rec = &records[0];
        assert_eq!(rec.stats.population, None);
        assert_eq!(rec.stats.area_hectares, None);
        // Unparsable easting: no geography, and lat/lon stay jointly absent.
        assert_eq!(rec.geo.lat, None);
        assert_eq!(rec.geo.lon, None);
        assert_eq!(rec.geo.utm.zone, Some(33));
    }

    #[test]
    fn test_negative_population_rejected() {
        let mut row = AHRENSFELDE.to_vec();
        row[7] = "-12";
        let rows = sheet(&[&row]);
        let (records, _, _) = build(&rows);
        assert_eq!(records[0].stats.population, None);
    }

    #[test]
    fn test_row_order_and_name_collisions() {
        let mut second = AHRENSFELDE.to_vec();
        second[0] = "999";
        let mut third = AHRENSFELDE.to_vec();
        third[0] = "500";
        third[2] = "Bernau";

        let rows = sheet(&[AHRENSFELDE, &second, &third]);
        let (records, index, _) = build(&rows);

        let ids: Vec<_> = records.iter().map(|r| r.place_id.as_str()).collect();
        assert_eq!(ids, vec!["120602", "999", "500"]);
        // Collisions keep row order in the index value list.
        assert_eq!(
            index["ahrensfelde"],
            vec!["120602".to_string(), "999".to_string()]
        );
    }

    #[test]
    fn test_run_writes_both_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("gemverz.csv");
        let out_places = dir.path().join("places.jsonl");
        let out_index = dir.path().join("places_index.json");

        let rows = sheet(&[AHRENSFELDE]);
        let csv_text: String = rows
            .iter()
            .map(|r| r.join(";"))
            .collect::<Vec<_>>()
            .join("\n");
        std::fs::write(&input, csv_text).unwrap();

        let stats = run(&input, &out_places, &out_index).unwrap();
        assert_eq!(stats.emitted, 1);

        let records = store::read_places(&out_places).unwrap();
        assert_eq!(records[0].name, "Ahrensfelde");
        let index = store::read_name_index(&out_index).unwrap();
        assert!(index.contains_key("ahrensfelde"));
    }

    #[test]
    fn test_run_missing_input_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(
            Path::new("/nonexistent/GemVerz.xlsx"),
            &dir.path().join("p.jsonl"),
            &dir.path().join("i.json"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Input not found"));
        assert!(!dir.path().join("p.jsonl").exists());
    }
}
