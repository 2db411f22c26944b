//! Flat persistence for canonical records.
//!
//! The pipeline writes one JSON object per line (`places.jsonl`, original
//! row order preserved) plus a pretty-printed name index
//! (`places_index.json`). The query side only reads; no in-place mutation
//! happens after a file is written.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::models::PlaceRecord;

/// Lowercased trimmed name -> place_ids in row order. Keys iterate sorted;
/// only the order inside each value vector is contractual.
pub type NameIndex = BTreeMap<String, Vec<String>>;

/// Write records as line-delimited JSON, one record per line, input order.
pub fn write_places(path: &Path, records: &[PlaceRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Read the line-delimited record store in file order. Blank lines are
/// skipped; a missing file is a startup error.
pub fn read_places(path: &Path) -> Result<Vec<PlaceRecord>> {
    let file = File::open(path).with_context(|| {
        format!(
            "places store not found: {} (run the ingest pipeline first)",
            path.display()
        )
    })?;

    let mut records = Vec::new();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: PlaceRecord = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid record", path.display(), lineno + 1))?;
        records.push(record);
    }
    Ok(records)
}

/// Write the name index as a single pretty-printed JSON object.
pub fn write_name_index(path: &Path, index: &NameIndex) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(index)?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Wrote name index ({} names) to {}", index.len(), path.display());
    Ok(())
}

/// Read the name index back.
pub fn read_name_index(path: &Path) -> Result<NameIndex> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("name index not found: {}", path.display()))?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PlaceRecord, SourceNote, SOURCE_GEMVERZ};

    fn sample(place_id: &str, name: &str) -> PlaceRecord {
        let mut rec = PlaceRecord::new(place_id.to_string(), name.to_string());
        rec.status_code = Some("G".into());
        rec.admin.district = Some("Barnim".into());
        rec.stats.population = Some(72461);
        rec.stats.area_hectares = Some(22972.5);
        rec.geo.lat = Some(52.7);
        rec.geo.lon = Some(13.6);
        rec.sources.insert(
            SOURCE_GEMVERZ.to_string(),
            SourceNote {
                last_modified: Some("03/2024".into()),
                corrections: None,
            },
        );
        rec
    }

    #[test]
    fn test_places_round_trip_preserves_order_and_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("places.jsonl");

        let records = vec![sample("2", "Bernau"), sample("1", "Ahrensfelde")];
        write_places(&path, &records).unwrap();

        let back = read_places(&path).unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn test_read_places_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("places.jsonl");
        let rec = sample("1", "Ahrensfelde");
        let json = serde_json::to_string(&rec).unwrap();
        std::fs::write(&path, format!("{json}\n\n{json}\n")).unwrap();

        let back = read_places(&path).unwrap();
        assert_eq!(back.len(), 2);
    }

    #[test]
    fn test_read_places_missing_file() {
        let err = read_places(Path::new("/nonexistent/places.jsonl")).unwrap_err();
        assert!(err.to_string().contains("run the ingest pipeline"));
    }

    #[test]
    fn test_name_index_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("places_index.json");

        let mut index = NameIndex::new();
        index.insert("ahrensfelde".into(), vec!["1".into(), "7".into()]);
        index.insert("bernau".into(), vec!["2".into()]);

        write_name_index(&path, &index).unwrap();
        let back = read_name_index(&path).unwrap();
        assert_eq!(back, index);
        // Value order is row order, preserved through serialization.
        assert_eq!(back["ahrensfelde"], vec!["1".to_string(), "7".to_string()]);
    }
}
