use serde::{Deserialize, Serialize};

use crate::coord::{self, GeoPoint};
use crate::error::{StitchError, StitchResult};
use crate::viewport::TileRange;

/// Geographic bounds of a map region, in degrees
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

/// The four named corners of a [`BoundingBox`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Corners {
    pub top_left: GeoPoint,
    pub top_right: GeoPoint,
    pub bottom_left: GeoPoint,
    pub bottom_right: GeoPoint,
}

impl Corners {
    /// Corners in reading order, with their names
    pub fn named(&self) -> [(&'static str, GeoPoint); 4] {
        [
            ("top_left", self.top_left),
            ("top_right", self.top_right),
            ("bottom_left", self.bottom_left),
            ("bottom_right", self.bottom_right),
        ]
    }
}

impl BoundingBox {
    pub fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> StitchResult<Self> {
        let bbox = Self { min_lat, min_lon, max_lat, max_lon };
        bbox.validate()?;
        Ok(bbox)
    }

    pub fn validate(&self) -> StitchResult<()> {
        let values = [self.min_lat, self.min_lon, self.max_lat, self.max_lon];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(StitchError::invalid(format!("bounding box must be finite: {:?}", self)));
        }
        if self.min_lat > self.max_lat || self.min_lon > self.max_lon {
            return Err(StitchError::invalid(format!("bounding box is inverted: {:?}", self)));
        }
        Ok(())
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn corners(&self) -> Corners {
        Corners {
            top_left: GeoPoint::new(self.max_lat, self.min_lon),
            top_right: GeoPoint::new(self.max_lat, self.max_lon),
            bottom_left: GeoPoint::new(self.min_lat, self.min_lon),
            bottom_right: GeoPoint::new(self.min_lat, self.max_lon),
        }
    }

    /// Integer tiles touching the box at `zoom`.
    ///
    /// The south-west corner gives the left column and bottom row, the
    /// north-east corner the right column and top row.
    pub fn tile_range(&self, zoom: u32) -> StitchResult<TileRange> {
        coord::validate_zoom(zoom)?;
        self.validate()?;

        let last = (1i64 << zoom) - 1;
        let to_index = |point: GeoPoint| {
            let (x, y) = coord::to_fractional_tile(point, zoom);
            ((x as i64).clamp(0, last), (y as i64).clamp(0, last))
        };

        let (x_min, y_max) = to_index(GeoPoint::new(self.min_lat, self.min_lon));
        let (x_max, y_min) = to_index(GeoPoint::new(self.max_lat, self.max_lon));

        Ok(TileRange { zoom, x_min, x_max, y_min, y_max })
    }
}
