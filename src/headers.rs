//! Spreadsheet header normalization.
//!
//! The municipal directory ships with inconsistent headers: merged two-row
//! header cells, diacritic/hyphenation variants of the same administrative
//! term, stray byte-order marks, and a preamble of title rows before the
//! real header. This module maps whatever the workbook contains onto a
//! fixed canonical field set, or fails fast naming exactly what is missing.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

// Canonical field names downstream components rely on.
pub const PLACE_ID: &str = "place_id";
pub const STATUS_ID: &str = "status_id";
pub const STATUS_CODE: &str = "status_code";
pub const AGS: &str = "ags";
pub const ARS: &str = "ars";
pub const GVNR: &str = "gvnr";
pub const NAME: &str = "name";
pub const NAME_SECONDARY: &str = "name_secondary";
pub const ASSOCIATION_NAME: &str = "association_name";
pub const ASSOCIATION_TYPE: &str = "association_type";
pub const DISTRICT: &str = "district";
pub const POPULATION: &str = "population";
pub const AREA_HECTARES: &str = "area_hectares";
pub const UTM_ZONE: &str = "utm_zone";
pub const UTM_EASTING: &str = "utm_easting";
pub const UTM_NORTHING: &str = "utm_northing";
pub const POSTAL_CODE: &str = "postal_code";
pub const AREA_CODE: &str = "area_code";
pub const REGION: &str = "region";
pub const LAST_MODIFIED: &str = "last_modified";
pub const CORRECTIONS: &str = "corrections";

/// Minimal set a header interpretation must resolve to be accepted.
const MINIMAL_FIELDS: &[&str] = &[STATUS_CODE, NAME];

/// Coordinate triplet required for the two-row interpretation.
const COORD_FIELDS: &[&str] = &[UTM_ZONE, UTM_EASTING, UTM_NORTHING];

/// Full set that must resolve before any row is processed.
const REQUIRED_FIELDS: &[&str] = &[
    PLACE_ID,
    STATUS_CODE,
    NAME,
    AGS,
    ARS,
    DISTRICT,
    UTM_ZONE,
    UTM_EASTING,
    UTM_NORTHING,
];

/// Maximum header offset probed before giving up on detection.
const MAX_HEADER_OFFSET: usize = 6;

#[derive(Debug, Error)]
pub enum HeaderError {
    #[error(
        "missing required columns after normalization: {missing:?}\n\
         observed headers: {observed:?}\n\
         hint: the workbook header may use an unknown variant; extend the \
         canonical lookup table with the exact header text"
    )]
    MissingColumns {
        missing: Vec<String>,
        observed: Vec<String>,
    },

    #[error("spreadsheet contains no rows")]
    Empty,
}

/// Normalize a raw header cell: strip BOM, trim, lowercase, collapse
/// whitespace.
pub fn normalize_header(raw: &str) -> String {
    let s = raw.replace('\u{feff}', "");
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Exact lookup table collapsing known header-text variants onto canonical
/// field names. Keys are pre-normalized. Canonical names map to themselves
/// so that normalizing an already-canonical header set is a no-op.
fn canonical_key(norm: &str) -> Option<&'static str> {
    let key = match norm {
        "ortsteil-nr" | "ortsteil-nr." | "ortsteil_nr" | "place_id" => PLACE_ID,

        "status -id" | "status-id" | "status_id" => STATUS_ID,

        "status" | "status_code" => STATUS_CODE,

        "amtlicher gemeinde-schlüssel (ags)" | "amtlicher gemeindeschlüssel (ags)" | "ags" => AGS,

        "amtlicher regional-schlüssel (ars)" | "amtlicher regional schlüssel (ars)" | "ars" => ARS,

        "gemeinde-verbandsnr. (gvnr)" | "gemeindeverbandsnr. (gvnr)" | "gvnr" => GVNR,

        "gemeinde, ortsteil, gemeindeteil, wohnplatz" | "name" => NAME,

        "sorbischer ortsname" | "name_secondary" => NAME_SECONDARY,

        "gemeindeverband" | "association_name" => ASSOCIATION_NAME,
        "gemeindeverbandsart" | "association_type" => ASSOCIATION_TYPE,

        "landkreis / kreisfreie stadt" | "district" => DISTRICT,

        "einwohnerzahl (31.12.2022)" | "einwohnerzahl" | "population" => POPULATION,

        "fläche in ha (31.12.2022)" | "fläche in ha" | "area_hectares" => AREA_HECTARES,

        // UTM fields from the flattened two-row header, plus the bare names
        // Excel sometimes produces.
        "utm-koordinaten (etrs 89) zone" | "utm koordinaten (etrs 89) zone" | "zone"
        | "utm_zone" => UTM_ZONE,
        "utm-koordinaten (etrs 89) ostwert" | "utm koordinaten (etrs 89) ostwert" | "ostwert"
        | "utm_easting" => UTM_EASTING,
        "utm-koordinaten (etrs 89) nordwert" | "utm koordinaten (etrs 89) nordwert" | "nordwert"
        | "utm_northing" => UTM_NORTHING,

        "postleitzahl (01.01.2026)" | "postleitzahl" | "postal_code" => POSTAL_CODE,

        "telefon- vorwahl" | "telefon-vorwahl" | "telefonvorwahl" | "area_code" => AREA_CODE,

        "region" => REGION,

        "letzte korrektur" | "last_modified" => LAST_MODIFIED,

        "korrektur(en)" | "corrections" => CORRECTIONS,

        _ => return None,
    };
    Some(key)
}

/// Join a two-row (merged) header pair: `"{top} {bottom}"` when the bottom
/// cell carries text, else whichever cell is non-empty. Pandas-style
/// "unnamed" placeholders count as empty.
pub fn flatten_pair(top: &str, bottom: &str) -> String {
    let top = top.trim();
    let bottom = bottom.trim();
    if !bottom.is_empty() && !bottom.to_lowercase().starts_with("unnamed") {
        format!("{top} {bottom}").trim().to_string()
    } else if !top.is_empty() {
        top.to_string()
    } else {
        bottom.to_string()
    }
}

/// Resolved header interpretation: canonical (or normalized) name per
/// column, a field -> column index map, and the first data row.
#[derive(Debug, Clone)]
pub struct HeaderMap {
    pub columns: Vec<String>,
    fields: HashMap<String, usize>,
    pub data_start: usize,
}

impl HeaderMap {
    /// Column index of a canonical field.
    pub fn column(&self, field: &str) -> Option<usize> {
        self.fields.get(field).copied()
    }

    /// Cell text of `field` in `row`, if the field resolved and the row is
    /// wide enough.
    pub fn cell<'a>(&self, row: &'a [String], field: &str) -> &'a str {
        self.column(field)
            .and_then(|i| row.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}

/// One attempt in the ordered detection chain.
#[derive(Debug, Clone, Copy)]
enum Strategy {
    TwoRow(usize),
    SingleRow(usize),
    Literal,
}

/// Detect and normalize the header of an in-memory sheet (all cells text).
///
/// Interpretation attempts run in a fixed order: two-row headers at offsets
/// 0..=5 (validated against the minimal field set plus the coordinate
/// triplet), then single-row headers at the same offsets (minimal set only),
/// then the literal first row. The first interpretation whose validation
/// predicate holds wins. The chosen interpretation then passes through the
/// coordinate-column fixer and the required-field check; an incomplete
/// result is a hard stop, not a per-row skip.
pub fn detect(rows: &[Vec<String>]) -> Result<HeaderMap, HeaderError> {
    if rows.is_empty() {
        return Err(HeaderError::Empty);
    }

    let max_offset = MAX_HEADER_OFFSET.min(rows.len());
    let mut strategies = Vec::new();
    for offset in 0..max_offset {
        if offset + 1 < rows.len() {
            strategies.push(Strategy::TwoRow(offset));
        }
    }
    for offset in 0..max_offset {
        strategies.push(Strategy::SingleRow(offset));
    }
    strategies.push(Strategy::Literal);

    for strategy in strategies {
        let (columns, data_start) = match strategy {
            Strategy::TwoRow(offset) => {
                let flattened: Vec<String> = pad_pair(&rows[offset], &rows[offset + 1]);
                (canonicalize(&flattened), offset + 2)
            }
            Strategy::SingleRow(offset) => (canonicalize(&rows[offset]), offset + 1),
            Strategy::Literal => (canonicalize(&rows[0]), 1),
        };

        let fields = field_index(&columns);
        let accepted = match strategy {
            Strategy::TwoRow(_) => {
                has_all(&fields, MINIMAL_FIELDS) && has_all(&fields, COORD_FIELDS)
            }
            Strategy::SingleRow(_) => has_all(&fields, MINIMAL_FIELDS),
            Strategy::Literal => true,
        };
        if !accepted {
            continue;
        }

        debug!(?strategy, data_start, "header interpretation accepted");
        return finish(columns, data_start);
    }

    unreachable!("literal strategy always accepts")
}

/// Flatten a header row pair, padding the shorter row with empty cells.
fn pad_pair(top: &[String], bottom: &[String]) -> Vec<String> {
    let width = top.len().max(bottom.len());
    (0..width)
        .map(|i| {
            let t = top.get(i).map(String::as_str).unwrap_or("");
            let b = bottom.get(i).map(String::as_str).unwrap_or("");
            flatten_pair(t, b)
        })
        .collect()
}

/// Map each raw column header to its canonical field name, or keep the
/// normalized text for unknown columns.
fn canonicalize(raw: &[String]) -> Vec<String> {
    raw.iter()
        .map(|c| {
            let norm = normalize_header(c);
            canonical_key(&norm)
                .map(str::to_string)
                .unwrap_or(norm)
        })
        .collect()
}

fn field_index(columns: &[String]) -> HashMap<String, usize> {
    let mut fields = HashMap::new();
    for (i, col) in columns.iter().enumerate() {
        fields.entry(col.clone()).or_insert(i);
    }
    fields
}

fn has_all(fields: &HashMap<String, usize>, wanted: &[&str]) -> bool {
    wanted.iter().all(|f| fields.contains_key(*f))
}

/// Second-pass heuristic fixer plus the required-field check.
fn finish(mut columns: Vec<String>, data_start: usize) -> Result<HeaderMap, HeaderError> {
    fix_coordinate_columns(&mut columns);

    let fields = field_index(&columns);
    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|f| !fields.contains_key(**f))
        .map(|f| f.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(HeaderError::MissingColumns {
            missing,
            observed: columns,
        });
    }

    Ok(HeaderMap {
        columns,
        fields,
        data_start,
    })
}

/// Rename coordinate columns the lookup table did not catch: any column
/// whose text carries both a "utm" token and a zone/easting/northing
/// keyword is renamed to the canonical form. First match per field wins.
fn fix_coordinate_columns(columns: &mut [String]) {
    let wanted: [(&str, &[&str]); 3] = [
        (UTM_ZONE, &["zone"]),
        (UTM_EASTING, &["ostwert", "easting"]),
        (UTM_NORTHING, &["nordwert", "northing"]),
    ];

    for (canonical, keywords) in wanted {
        if columns.iter().any(|c| c == canonical) {
            continue;
        }
        let candidate = columns.iter().position(|c| {
            let lower = c.to_lowercase();
            lower.contains("utm") && keywords.iter().any(|k| lower.contains(k))
        });
        if let Some(i) = candidate {
            debug!(from = %columns[i], to = canonical, "renamed coordinate column");
            columns[i] = canonical.to_string();
        }
    }
}
