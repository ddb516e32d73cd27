//! Web Mercator conversions between geographic coordinates and fractional
//! slippy-map tile coordinates.

use std::f64::consts::PI;

use crate::error::{StitchError, StitchResult};

/// Latitude bound of the Web Mercator projection, in degrees.
pub const MAX_LATITUDE: f64 = 85.05112878;

/// Highest zoom level accepted by the viewport and download code.
/// Global pixel coordinates at this zoom still fit comfortably in an `i64`.
pub const MAX_ZOOM: u32 = 30;

/// Reject zoom levels above [`MAX_ZOOM`].
pub fn validate_zoom(zoom: u32) -> StitchResult<()> {
    if zoom > MAX_ZOOM {
        return Err(StitchError::invalid(format!("zoom {} exceeds maximum {}", zoom, MAX_ZOOM)));
    }
    Ok(())
}

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Same point with latitude clamped into the projectable band.
    pub fn clamped(&self) -> Self {
        Self {
            lat: self.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE),
            lon: self.lon,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// Number of tiles along one axis at `zoom`.
pub fn tiles_per_axis(zoom: u32) -> f64 {
    2f64.powi(zoom as i32)
}

/// Convert a point to fractional tile coordinates `(x, y)` at `zoom`.
///
/// Latitude is clamped to [`MAX_LATITUDE`] before any trigonometry, so the
/// result is always finite for finite input.
pub fn to_fractional_tile(point: GeoPoint, zoom: u32) -> (f64, f64) {
    let point = point.clamped();
    let n = tiles_per_axis(zoom);
    let lat_rad = point.lat.to_radians();

    let x = n * (point.lon + 180.0) / 360.0;
    let y = n * (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0;
    (x, y)
}

/// Inverse of [`to_fractional_tile`].
pub fn from_fractional_tile(x: f64, y: f64, zoom: u32) -> GeoPoint {
    let n = tiles_per_axis(zoom);
    let lon = x / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees();
    GeoPoint { lat, lon }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-6;

    #[test]
    fn test_origin_and_center() {
        let (x, y) = to_fractional_tile(GeoPoint::new(0.0, 0.0), 1);
        assert!((x - 1.0).abs() < 1e-12, "Prime meridian should be mid-grid");
        assert!((y - 1.0).abs() < 1e-12, "Equator should be mid-grid");

        let (x, y) = to_fractional_tile(GeoPoint::new(MAX_LATITUDE, -180.0), 0);
        assert!(x.abs() < 1e-12);
        assert!(y.abs() < 1e-6, "Northern bound should map to the top edge, got {}", y);
    }

    #[test]
    fn test_latitude_is_clamped() {
        for lat in [90.0, 89.9, MAX_LATITUDE, 1000.0] {
            let (x, y) = to_fractional_tile(GeoPoint::new(lat, 10.0), 5);
            assert!(x.is_finite() && y.is_finite(), "lat {} produced non-finite output", lat);
            assert_eq!((x, y), to_fractional_tile(GeoPoint::new(MAX_LATITUDE, 10.0), 5));
        }
        let south = to_fractional_tile(GeoPoint::new(-90.0, 10.0), 5);
        assert_eq!(south, to_fractional_tile(GeoPoint::new(-MAX_LATITUDE, 10.0), 5));
        assert!((south.1 - 32.0).abs() < 1e-5, "Southern bound should map to the bottom edge");
    }

    #[test]
    fn test_round_trip_grid() {
        let mut lat = -MAX_LATITUDE;
        while lat <= MAX_LATITUDE {
            let mut lon = -180.0;
            while lon <= 180.0 {
                for zoom in 0..=20 {
                    let point = GeoPoint::new(lat, lon);
                    let (x, y) = to_fractional_tile(point, zoom);
                    let back = from_fractional_tile(x, y, zoom);
                    assert!(
                        (back.lat - lat).abs() < TOLERANCE && (back.lon - lon).abs() < TOLERANCE,
                        "Round trip failed for {:?} at zoom {}: got {:?}",
                        point,
                        zoom,
                        back
                    );
                }
                lon += 17.3;
            }
            lat += 8.5;
        }
    }

    #[test]
    fn test_round_trip_reference_point() {
        let point = GeoPoint::new(52.266862, 20.750421);
        let (x, y) = to_fractional_tile(point, 12);
        assert_eq!(x as u32, 2284);
        assert_eq!(y as u32, 1348);

        let back = from_fractional_tile(x, y, 12);
        assert!((back.lat - point.lat).abs() < TOLERANCE);
        assert!((back.lon - point.lon).abs() < TOLERANCE);
    }

    #[test]
    fn test_reverse_composition_is_identity() {
        for zoom in [0, 3, 10, 17] {
            let n = tiles_per_axis(zoom);
            for (fx, fy) in [(0.1, 0.2), (0.5, 0.5), (0.73, 0.91), (0.999, 0.001)] {
                let (x, y) = (fx * n, fy * n);
                let point = from_fractional_tile(x, y, zoom);
                let (x2, y2) = to_fractional_tile(point, zoom);
                assert!((x2 - x).abs() < 1e-6 * n.max(1.0), "x drifted at zoom {}", zoom);
                assert!((y2 - y).abs() < 1e-6 * n.max(1.0), "y drifted at zoom {}", zoom);
            }
        }
    }

    #[test]
    fn test_longitude_is_linear() {
        let zoom = 9;
        let delta = 2.5;
        let expected = tiles_per_axis(zoom) * delta / 360.0;
        for lat in [-70.0, -10.0, 0.0, 45.0, 84.0] {
            let (x0, _) = to_fractional_tile(GeoPoint::new(lat, 13.0), zoom);
            let (x1, _) = to_fractional_tile(GeoPoint::new(lat, 13.0 + delta), zoom);
            assert!((x1 - x0 - expected).abs() < 1e-9, "Step in x depends on latitude {}", lat);
        }
    }

    #[test]
    fn test_validate_zoom() {
        assert!(validate_zoom(0).is_ok());
        assert!(validate_zoom(MAX_ZOOM).is_ok());
        assert!(matches!(validate_zoom(MAX_ZOOM + 1), Err(StitchError::InvalidArgument(_))));
        assert!(matches!(validate_zoom(1 << 31), Err(StitchError::InvalidArgument(_))));
    }

    #[test]
    fn test_y_decreases_northward() {
        let mut previous = f64::INFINITY;
        let mut lat = -85.0;
        while lat <= 85.0 {
            let (_, y) = to_fractional_tile(GeoPoint::new(lat, 0.0), 4);
            assert!(y < previous, "y should decrease as latitude grows (lat {})", lat);
            previous = y;
            lat += 5.0;
        }
    }
}
