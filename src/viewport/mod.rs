//! Which tiles cover an output window, and where the window sits inside
//! the tile-aligned canvas.

use crate::coord::{self, GeoPoint};
use crate::error::{StitchError, StitchResult};

/// Axis-aligned rectangle in global pixel space (tile grid × tile size).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub min_x: i64,
    pub min_y: i64,
    pub width: u32,
    pub height: u32,
}

impl PixelWindow {
    /// Exclusive right edge
    pub fn max_x(&self) -> i64 {
        self.min_x + self.width as i64
    }

    /// Exclusive bottom edge
    pub fn max_y(&self) -> i64 {
        self.min_y + self.height as i64
    }
}

/// Inclusive range of tile indices at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub zoom: u32,
    pub x_min: i64,
    pub x_max: i64,
    pub y_min: i64,
    pub y_max: i64,
}

impl TileRange {
    pub fn columns(&self) -> u32 {
        (self.x_max - self.x_min + 1).max(0) as u32
    }

    pub fn rows(&self) -> u32 {
        (self.y_max - self.y_min + 1).max(0) as u32
    }

    pub fn tile_count(&self) -> u64 {
        self.columns() as u64 * self.rows() as u64
    }

    /// Every `(x, y)` in the range, column by column.
    pub fn iter(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        (self.x_min..=self.x_max).flat_map(move |x| (self.y_min..=self.y_max).map(move |y| (x, y)))
    }
}

/// Convert a tile index to a store address, or `None` if it lies outside
/// the `2^zoom × 2^zoom` grid.
pub fn grid_address(zoom: u32, x: i64, y: i64) -> Option<(u32, u32)> {
    let n = 1i64 << zoom;
    if (0..n).contains(&x) && (0..n).contains(&y) {
        Some((x as u32, y as u32))
    } else {
        None
    }
}

/// Full placement plan for one render call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportLayout {
    pub window: PixelWindow,
    pub tiles: TileRange,
    /// Offset of the window inside the canvas, always in `[0, tile_size)`.
    pub crop_x: u32,
    pub crop_y: u32,
    pub tile_size: u32,
}

impl ViewportLayout {
    /// Lay out a `width × height` window centered on `center` at `zoom`.
    pub fn new(center: GeoPoint, zoom: u32, width: u32, height: u32, tile_size: u32) -> StitchResult<Self> {
        if !center.is_finite() {
            return Err(StitchError::invalid(format!("center must be finite, got {:?}", center)));
        }
        coord::validate_zoom(zoom)?;

        let (tile_x, tile_y) = coord::to_fractional_tile(center, zoom);
        let center_px_x = tile_x * tile_size as f64;
        let center_px_y = tile_y * tile_size as f64;

        Self::from_center_pixel(center_px_x, center_px_y, zoom, width, height, tile_size)
    }

    /// Lay out a window around a center already expressed in global pixels.
    ///
    /// The window origin is truncated toward zero, not floored, so a center
    /// at `x = 0.5` with width 200 starts at `-99` rather than `-100`.
    pub fn from_center_pixel(
        center_px_x: f64,
        center_px_y: f64,
        zoom: u32,
        width: u32,
        height: u32,
        tile_size: u32,
    ) -> StitchResult<Self> {
        if width == 0 || height == 0 {
            return Err(StitchError::invalid(format!(
                "output size must be positive, got {}x{}",
                width, height
            )));
        }
        if tile_size == 0 {
            return Err(StitchError::invalid("tile size must be positive"));
        }

        let half_w = (width / 2) as f64;
        let half_h = (height / 2) as f64;

        let window = PixelWindow {
            min_x: (center_px_x - half_w) as i64,
            min_y: (center_px_y - half_h) as i64,
            width,
            height,
        };

        let size = tile_size as i64;
        let tiles = TileRange {
            zoom,
            x_min: window.min_x.div_euclid(size),
            x_max: (window.max_x() - 1).div_euclid(size),
            y_min: window.min_y.div_euclid(size),
            y_max: (window.max_y() - 1).div_euclid(size),
        };

        let canvas_fits = tiles.columns().checked_mul(tile_size).is_some()
            && tiles.rows().checked_mul(tile_size).is_some();
        if !canvas_fits {
            return Err(StitchError::invalid(format!(
                "canvas for {}x{} output with {} pixel tiles is too large",
                width, height, tile_size
            )));
        }

        Ok(Self {
            window,
            tiles,
            crop_x: (window.min_x - tiles.x_min * size) as u32,
            crop_y: (window.min_y - tiles.y_min * size) as u32,
            tile_size,
        })
    }

    pub fn canvas_width(&self) -> u32 {
        self.tiles.columns() * self.tile_size
    }

    pub fn canvas_height(&self) -> u32 {
        self.tiles.rows() * self.tile_size
    }

    /// Top-left corner of tile `(x, y)` inside the canvas.
    pub fn canvas_offset(&self, x: i64, y: i64) -> (u32, u32) {
        let size = self.tile_size as i64;
        (((x - self.tiles.x_min) * size) as u32, ((y - self.tiles.y_min) * size) as u32)
    }
}
