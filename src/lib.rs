//! Compose rectangular map views from slippy-map raster tiles.
//!
//! [`Compositor::render`] takes a center point, zoom and output size, works out
//! which tiles cover that window, stitches them from a [`TileSource`] and crops
//! the result to the exact requested size.

pub mod bounds;
pub mod compositor;
pub mod config;
pub mod coord;
pub mod download;
pub mod error;
pub mod store;
pub mod viewport;

pub use bounds::{BoundingBox, Corners};
pub use compositor::{Compositor, CompositorConfig};
pub use config::Config;
pub use coord::{from_fractional_tile, to_fractional_tile, GeoPoint};
pub use download::{DownloadConfig, DownloadReport, Downloader};
pub use error::{StitchError, StitchResult};
pub use store::{FileTileStore, MemoryTileStore, Tile, TileSource, TILE_SIZE};
pub use viewport::{PixelWindow, TileRange, ViewportLayout};
