//! UTM/ETRS89 to WGS84 coordinate conversion.
//!
//! The directory carries projected coordinates (zone, easting, northing) on
//! the ETRS89 datum (EPSG:258xx). Leaflet/GeoJSON consumers need geographic
//! lat/lon, so the pipeline converts every row through an inverse transverse
//! Mercator projection.
//!
//! One projection context is built per distinct zone and memoized on the
//! transformer instance for the run; the zone count is bounded by the source
//! region, so the cache stays tiny.

use std::collections::HashMap;

use crate::coerce::to_int_safe;

/// Plausibility box for the source region (Brandenburg, with margin).
/// Results outside the box come from swapped axes or a wrong zone and are
/// discarded rather than propagated.
pub const LAT_RANGE: (f64, f64) = (45.0, 60.0);
pub const LON_RANGE: (f64, f64) = (5.0, 20.0);

// GRS80 ellipsoid (ETRS89).
const A: f64 = 6_378_137.0;
const E2: f64 = 0.006_694_380_022_903_416; // first eccentricity squared
const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;

/// Precomputed inverse-projection constants for one UTM zone.
#[derive(Debug, Clone, Copy)]
struct ZoneContext {
    lon_origin_deg: f64,
    e: f64,
    ep2: f64,
    rectifying_radius: f64,
    j1: f64,
    j2: f64,
    j3: f64,
    j4: f64,
}

impl ZoneContext {
    fn new(zone: i32) -> Self {
        let e = E2.sqrt();
        let sqrt_1_e2 = (1.0 - E2).sqrt();
        let e1 = (1.0 - sqrt_1_e2) / (1.0 + sqrt_1_e2);
        Self {
            lon_origin_deg: (zone as f64 - 1.0) * 6.0 - 180.0 + 3.0,
            e,
            ep2: E2 / (1.0 - E2),
            rectifying_radius: A
                * (1.0 - E2 / 4.0 - 3.0 * E2.powi(2) / 64.0 - 5.0 * E2.powi(3) / 256.0),
            j1: 3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0,
            j2: 21.0 * e1.powi(2) / 16.0 - 55.0 * e1.powi(4) / 32.0,
            j3: 151.0 * e1.powi(3) / 96.0,
            j4: 1097.0 * e1.powi(4) / 512.0,
        }
    }

    /// Inverse transverse Mercator: (easting, northing) -> (lat, lon) degrees.
    fn inverse(&self, easting: f64, northing: f64) -> (f64, f64) {
        let x = easting - FALSE_EASTING;
        let m = northing / K0;
        let mu = m / self.rectifying_radius;

        // Footpoint latitude.
        let fp = mu
            + self.j1 * (2.0 * mu).sin()
            + self.j2 * (4.0 * mu).sin()
            + self.j3 * (6.0 * mu).sin()
            + self.j4 * (8.0 * mu).sin();

        let c1 = self.ep2 * fp.cos().powi(2);
        let t1 = fp.tan().powi(2);
        let sin_fp2 = (self.e * fp.sin()).powi(2);
        let r1 = A * (1.0 - E2) / (1.0 - sin_fp2).powf(1.5);
        let n1 = A / (1.0 - sin_fp2).sqrt();
        let d = x / (n1 * K0);

        let lat = fp
            - (n1 * fp.tan() / r1)
                * (d * d / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * self.ep2)
                        * d.powi(4)
                        / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                        - 252.0 * self.ep2
                        - 3.0 * c1 * c1)
                        * d.powi(6)
                        / 720.0);
        let lon = (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * self.ep2 + 24.0 * t1 * t1)
                * d.powi(5)
                / 120.0)
            / fp.cos();

        (lat.to_degrees(), self.lon_origin_deg + lon.to_degrees())
    }
}

/// Converts projected directory coordinates to WGS84, caching one context
/// per zone. The cache is owned by the instance; there is no ambient state.
#[derive(Debug, Default)]
pub struct ZoneTransformer {
    contexts: HashMap<i32, ZoneContext>,
}

impl ZoneTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert raw spreadsheet cells to (lat, lon).
    ///
    /// Any unparseable component yields `None`, as does a result outside the
    /// plausibility box.
    pub fn convert(&mut self, zone: &str, easting: &str, northing: &str) -> Option<(f64, f64)> {
        let z = to_int_safe(zone)? as i32;
        let e = to_int_safe(easting)?;
        let n = to_int_safe(northing)?;
        self.project(z, e as f64, n as f64)
    }

    /// Convert already-parsed projected coordinates to (lat, lon).
    pub fn project(&mut self, zone: i32, easting: f64, northing: f64) -> Option<(f64, f64)> {
        let ctx = self
            .contexts
            .entry(zone)
            .or_insert_with(|| ZoneContext::new(zone));
        let (lat, lon) = ctx.inverse(easting, northing);

        if !(LAT_RANGE.0..=LAT_RANGE.1).contains(&lat) || !(LON_RANGE.0..=LON_RANGE.1).contains(&lon)
        {
            return None;
        }
        Some((lat, lon))
    }

    /// Number of zones seen so far (cache size).
    pub fn cached_zones(&self) -> usize {
        self.contexts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_central_meridian_point() {
        let mut t = ZoneTransformer::new();
        // On the central meridian of zone 33 the longitude is exactly 15°E.
        let (lat, lon) = t.project(33, 500_000.0, 5_800_000.0).unwrap();
        assert!((lon - 15.0).abs() < 1e-3, "lon = {lon}");
        assert!((52.0..53.0).contains(&lat), "lat = {lat}");
    }

    #[test]
    fn test_result_within_plausibility_box() {
        let mut t = ZoneTransformer::new();
        // Near Potsdam.
        let (lat, lon) = t.project(33, 366_000.0, 5_810_000.0).unwrap();
        assert!((LAT_RANGE.0..=LAT_RANGE.1).contains(&lat));
        assert!((LON_RANGE.0..=LON_RANGE.1).contains(&lon));
    }

    #[test]
    fn test_out_of_box_discarded() {
        let mut t = ZoneTransformer::new();
        // Valid inputs, but the northing puts the result near 27°N.
        assert_eq!(t.project(33, 500_000.0, 3_000_000.0), None);
    }

    #[test]
    fn test_unparseable_inputs() {
        let mut t = ZoneTransformer::new();
        assert_eq!(t.convert("", "366000", "5810000"), None);
        assert_eq!(t.convert("33", "abc", "5810000"), None);
        assert_eq!(t.convert("33", "366000", ""), None);
    }

    #[test]
    fn test_convert_from_cells() {
        let mut t = ZoneTransformer::new();
        let (lat, lon) = t.convert("33", "500000", "5800000").unwrap();
        assert!((lon - 15.0).abs() < 1e-3);
        assert!(lat > 50.0);
    }

    #[test]
    fn test_zone_context_cached_per_zone() {
        let mut t = ZoneTransformer::new();
        t.project(33, 500_000.0, 5_800_000.0);
        t.project(33, 400_000.0, 5_800_000.0);
        assert_eq!(t.cached_zones(), 1);
        t.project(32, 500_000.0, 5_800_000.0);
        assert_eq!(t.cached_zones(), 2);
    }
}
