//! In-memory approximate place search over the canonical record store.
//!
//! Construction is pure: records go in, a candidate list of normalized
//! names comes out. After `load` completes nothing is mutated, so one
//! index can serve concurrent readers without coordination.

pub mod score;

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::models::{PlaceHit, PlaceRecord};
use crate::store;

/// Default score floor used by callers that do not pass one.
pub const DEFAULT_MIN_SCORE: f64 = 60.0;

pub struct PlaceSearch {
    records: Vec<PlaceRecord>,
    by_id: HashMap<String, usize>,
    /// Normalized candidate names in insertion (row) order.
    candidates: Vec<String>,
    /// Candidate name -> place_id of the first record bearing it.
    ///
    /// Duplicate names silently shadow: only the first-encountered record
    /// per lowercased name is reachable by name search, the rest only via
    /// `get`. Known MVP limitation, kept deliberately (downstream callers
    /// depend on the first-wins order).
    name_to_id: HashMap<String, String>,
}

impl PlaceSearch {
    /// Build the index from records in row order.
    pub fn load(records: Vec<PlaceRecord>) -> Self {
        let mut by_id = HashMap::with_capacity(records.len());
        let mut candidates = Vec::with_capacity(records.len());
        let mut name_to_id: HashMap<String, String> = HashMap::with_capacity(records.len());

        for (i, record) in records.iter().enumerate() {
            by_id.entry(record.place_id.clone()).or_insert(i);

            let key = record.name_key();
            if key.is_empty() {
                continue;
            }
            if !name_to_id.contains_key(&key) {
                name_to_id.insert(key.clone(), record.place_id.clone());
                candidates.push(key);
            }
        }

        info!(
            "Search index ready: {} records, {} name candidates",
            records.len(),
            candidates.len()
        );

        Self {
            records,
            by_id,
            candidates,
            name_to_id,
        }
    }

    /// Read the record store from disk and build the index.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let records = store::read_places(path)?;
        Ok(Self::load(records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Direct lookup by place_id, no scoring.
    pub fn get(&self, place_id: &str) -> Option<&PlaceRecord> {
        self.by_id.get(place_id).map(|&i| &self.records[i])
    }

    /// Rank candidates against a free-text query.
    ///
    /// Hits come back ordered by descending score; ties keep candidate
    /// insertion order (stable). An empty or whitespace query returns an
    /// empty list, not an error.
    pub fn search(&self, query: &str, limit: usize, min_score: f64) -> Vec<PlaceHit> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f64)> = self
            .candidates
            .iter()
            .enumerate()
            .map(|(i, cand)| (i, score::similarity(&q, cand)))
            .collect();

        // Stable sort keeps first-inserted candidates ahead on score ties.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        scored
            .into_iter()
            .filter(|&(_, score)| score >= min_score)
            .filter_map(|(i, score)| self.hit(&self.candidates[i], score))
            .collect()
    }

    fn hit(&self, candidate: &str, score: f64) -> Option<PlaceHit> {
        let place_id = self.name_to_id.get(candidate)?;
        let record = self.get(place_id)?;
        Some(PlaceHit {
            place_id: record.place_id.clone(),
            name: record.name.clone(),
            score,
            status_code: record.status_code.clone(),
            district: record.admin.district.clone(),
            association_name: record.admin.association_name.clone(),
            lat: record.geo.lat,
            lon: record.geo.lon,
        })
    }
}
