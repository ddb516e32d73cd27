use image::{imageops, RgbImage};
use log::{debug, info};

use crate::coord::GeoPoint;
use crate::error::{StitchError, StitchResult};
use crate::store::{TileSource, TILE_SIZE};
use crate::viewport::{grid_address, ViewportLayout};

/// Configuration for the compositor
#[derive(Debug, Clone, Copy)]
pub struct CompositorConfig {
    pub tile_size: u32, // Edge length of every tile in the source, in pixels
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self { tile_size: TILE_SIZE }
    }
}

/// Stitches tiles from a [`TileSource`] into an arbitrary viewport.
pub struct Compositor<S: TileSource> {
    config: CompositorConfig,
    source: S,
}

impl<S: TileSource> Compositor<S> {
    pub fn new(config: CompositorConfig, source: S) -> Self {
        Self { config, source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Render a `width × height` image centered on `(center_lat, center_lon)`.
    ///
    /// Tiles missing from the source are left black. A tile that exists but
    /// cannot be read aborts the render.
    pub fn render(&self, center_lat: f64, center_lon: f64, zoom: u32, width: u32, height: u32) -> StitchResult<RgbImage> {
        let layout = ViewportLayout::new(
            GeoPoint::new(center_lat, center_lon),
            zoom,
            width,
            height,
            self.config.tile_size,
        )?;
        self.render_layout(&layout)
    }

    /// Build the canvas for a precomputed layout and crop it to the window.
    pub fn render_layout(&self, layout: &ViewportLayout) -> StitchResult<RgbImage> {
        debug!(
            "Layout: window {:?}, tiles x {}..={} y {}..={}, crop ({}, {})",
            layout.window,
            layout.tiles.x_min,
            layout.tiles.x_max,
            layout.tiles.y_min,
            layout.tiles.y_max,
            layout.crop_x,
            layout.crop_y
        );

        let canvas = self.build_canvas(layout)?;
        let window = layout.window;
        let result = imageops::crop_imm(&canvas, layout.crop_x, layout.crop_y, window.width, window.height).to_image();

        Ok(result)
    }

    fn build_canvas(&self, layout: &ViewportLayout) -> StitchResult<RgbImage> {
        let tile_size = self.config.tile_size;
        let zoom = layout.tiles.zoom;
        let mut canvas = RgbImage::new(layout.canvas_width(), layout.canvas_height());

        let mut placed = 0usize;
        let mut missing = 0usize;

        for (tx, ty) in layout.tiles.iter() {
            let Some((x, y)) = grid_address(zoom, tx, ty) else {
                missing += 1;
                continue;
            };

            let Some(tile) = self.source.load(zoom, x, y)? else {
                debug!("Tile z={} x={} y={} not in store, leaving blank", zoom, x, y);
                missing += 1;
                continue;
            };

            if tile.dimensions() != (tile_size, tile_size) {
                return Err(StitchError::tile_read(
                    zoom,
                    x,
                    y,
                    format!(
                        "expected {}x{} pixels, got {}x{}",
                        tile_size,
                        tile_size,
                        tile.width(),
                        tile.height()
                    ),
                ));
            }

            let (cx, cy) = layout.canvas_offset(tx, ty);
            imageops::replace(&mut canvas, &tile, cx as i64, cy as i64);
            placed += 1;
        }

        info!(
            "Composed {}x{} canvas at zoom {}: {} tiles placed, {} missing",
            canvas.width(),
            canvas.height(),
            zoom,
            placed,
            missing
        );

        Ok(canvas)
    }
}
