use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbImage;
use log::debug;
use tempfile::NamedTempFile;

use crate::error::{StitchError, StitchResult};

/// Edge length of a standard slippy-map tile, in pixels.
pub const TILE_SIZE: u32 = 256;

/// A decoded tile raster.
pub type Tile = RgbImage;

/// Anything that can resolve a tile address to image data.
///
/// `Ok(None)` means the tile is not in the store, which is an ordinary
/// outcome for sparse stores. `Err` is reserved for tiles that exist but
/// cannot be read.
pub trait TileSource {
    fn load(&self, zoom: u32, x: u32, y: u32) -> StitchResult<Option<Tile>>;
}

impl<S: TileSource + ?Sized> TileSource for &S {
    fn load(&self, zoom: u32, x: u32, y: u32) -> StitchResult<Option<Tile>> {
        (**self).load(zoom, x, y)
    }
}

impl<S: TileSource + ?Sized> TileSource for Arc<S> {
    fn load(&self, zoom: u32, x: u32, y: u32) -> StitchResult<Option<Tile>> {
        (**self).load(zoom, x, y)
    }
}

/// Tile store laid out on disk as `<root>/<zoom>/<x>/<y>.<extension>`
pub struct FileTileStore {
    root: PathBuf,
    extension: String,
}

impl FileTileStore {
    pub fn new<P: AsRef<Path>>(root: P, extension: &str) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the file path for a tile address
    pub fn tile_path(&self, zoom: u32, x: u32, y: u32) -> PathBuf {
        self.root
            .join(zoom.to_string())
            .join(x.to_string())
            .join(format!("{}.{}", y, self.extension))
    }

    pub fn contains(&self, zoom: u32, x: u32, y: u32) -> bool {
        self.tile_path(zoom, x, y).is_file()
    }

    /// Write raw tile bytes into the store, creating parent directories
    pub fn save(&self, zoom: u32, x: u32, y: u32, data: &[u8]) -> StitchResult<PathBuf> {
        self.save_from(zoom, x, y, &mut &data[..])
    }

    /// Stream a tile into the store.
    ///
    /// Bytes go to a temporary file next to the tile and are renamed into
    /// place only once fully written, so a failed or interrupted write never
    /// leaves a partial tile that [`contains`](Self::contains) would report.
    pub fn save_from<R: Read>(&self, zoom: u32, x: u32, y: u32, reader: &mut R) -> StitchResult<PathBuf> {
        let file_path = self.tile_path(zoom, x, y);
        let parent = file_path.parent().unwrap_or(&self.root);
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }

        let mut file = NamedTempFile::new_in(parent)?;
        io::copy(reader, &mut file)?;
        file.flush()?;
        file.persist(&file_path).map_err(|e| e.error)?;

        Ok(file_path)
    }

    /// Remove every tile from the store
    pub fn clear(&self) -> StitchResult<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root)?;
            fs::create_dir_all(&self.root)?;
        }

        Ok(())
    }
}

impl TileSource for FileTileStore {
    fn load(&self, zoom: u32, x: u32, y: u32) -> StitchResult<Option<Tile>> {
        let path = self.tile_path(zoom, x, y);
        if !path.is_file() {
            return Ok(None);
        }

        debug!("Reading tile {}", path.display());
        let data = fs::read(&path).map_err(|e| StitchError::tile_read(zoom, x, y, e))?;
        // Content decides the format; imagery services often serve JPEG under a .png name.
        let image = image::load_from_memory(&data).map_err(|e| StitchError::tile_read(zoom, x, y, e))?;

        Ok(Some(image.to_rgb8()))
    }
}

/// Tile store held entirely in memory
#[derive(Default, Clone)]
pub struct MemoryTileStore {
    tiles: HashMap<(u32, u32, u32), Tile>,
}

impl MemoryTileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, zoom: u32, x: u32, y: u32, tile: Tile) {
        self.tiles.insert((zoom, x, y), tile);
    }

    pub fn remove(&mut self, zoom: u32, x: u32, y: u32) -> Option<Tile> {
        self.tiles.remove(&(zoom, x, y))
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

impl TileSource for MemoryTileStore {
    fn load(&self, zoom: u32, x: u32, y: u32) -> StitchResult<Option<Tile>> {
        Ok(self.tiles.get(&(zoom, x, y)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;

    fn encoded_tile(color: Rgb<u8>, format: ImageFormat) -> Vec<u8> {
        let tile = RgbImage::from_pixel(TILE_SIZE, TILE_SIZE, color);
        let mut bytes = Cursor::new(Vec::new());
        tile.write_to(&mut bytes, format).expect("Failed to encode tile");
        bytes.into_inner()
    }

    #[test]
    fn test_tile_path_layout() {
        let store = FileTileStore::new("tiles", ".png");
        assert_eq!(
            store.tile_path(17, 73090, 43136),
            PathBuf::from("tiles").join("17").join("73090").join("43136.png")
        );
    }

    #[test]
    fn test_missing_tile_is_none() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = FileTileStore::new(dir.path(), "png");
        assert!(store.load(3, 1, 2).expect("Missing tile should not error").is_none());
        assert!(!store.contains(3, 1, 2));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = FileTileStore::new(dir.path(), "png");
        let path = store
            .save(5, 10, 12, &encoded_tile(Rgb([10, 20, 30]), ImageFormat::Png))
            .expect("Failed to save tile");

        assert!(path.ends_with(Path::new("5").join("10").join("12.png")));
        assert!(store.contains(5, 10, 12));

        let tile = store.load(5, 10, 12).expect("Load failed").expect("Tile should exist");
        assert_eq!(tile.dimensions(), (TILE_SIZE, TILE_SIZE));
        assert_eq!(*tile.get_pixel(100, 100), Rgb([10, 20, 30]));
    }

    #[test]
    fn test_jpeg_bytes_under_png_name() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = FileTileStore::new(dir.path(), "png");
        store
            .save(1, 0, 0, &encoded_tile(Rgb([200, 200, 200]), ImageFormat::Jpeg))
            .expect("Failed to save tile");

        let tile = store.load(1, 0, 0).expect("Load failed").expect("Tile should exist");
        assert_eq!(tile.dimensions(), (TILE_SIZE, TILE_SIZE));
    }

    #[test]
    fn test_corrupt_tile_is_an_error() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = FileTileStore::new(dir.path(), "png");
        store.save(4, 3, 2, b"definitely not an image").expect("Failed to save tile");

        match store.load(4, 3, 2) {
            Err(StitchError::TileRead { zoom, x, y, .. }) => assert_eq!((zoom, x, y), (4, 3, 2)),
            other => panic!("Expected TileRead error, got {:?}", other.map(|t| t.is_some())),
        }
    }

    /// Reader that yields some bytes and then fails, like a dropped connection.
    struct FailingReader {
        sent: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset"));
            }
            self.sent = true;
            let half = encoded_tile(Rgb([1, 2, 3]), ImageFormat::Png);
            let n = (half.len() / 2).min(buf.len());
            buf[..n].copy_from_slice(&half[..n]);
            Ok(n)
        }
    }

    #[test]
    fn test_failed_save_leaves_no_tile() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = FileTileStore::new(dir.path(), "png");

        let result = store.save_from(0, 0, 0, &mut FailingReader { sent: false });
        assert!(result.is_err(), "Interrupted write should fail");
        assert!(!store.contains(0, 0, 0), "Partial tile must not be visible");
        assert!(store.load(0, 0, 0).expect("Missing tile should not error").is_none());

        let leftovers = fs::read_dir(store.tile_path(0, 0, 0).parent().expect("Tile has a parent"))
            .expect("Parent directory should exist")
            .count();
        assert_eq!(leftovers, 0, "Temporary file should be cleaned up");
    }

    #[test]
    fn test_save_replaces_existing_tile() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = FileTileStore::new(dir.path(), "png");
        store.save(3, 1, 1, b"old").expect("Failed to save tile");
        let path = store.save(3, 1, 1, b"new bytes").expect("Failed to overwrite tile");
        assert_eq!(fs::read(path).expect("Failed to read tile"), b"new bytes");
    }

    #[test]
    fn test_clear_removes_tiles() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let root = dir.path().join("tiles");
        let store = FileTileStore::new(&root, "png");
        store.save(2, 1, 1, b"bytes").expect("Failed to save tile");

        store.clear().expect("Failed to clear store");
        assert!(!store.contains(2, 1, 1));
        assert!(root.exists(), "Root directory should be recreated");
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryTileStore::new();
        assert!(store.is_empty());
        store.insert(0, 0, 0, RgbImage::new(TILE_SIZE, TILE_SIZE));
        assert_eq!(store.len(), 1);
        assert!(store.load(0, 0, 0).expect("Load failed").is_some());
        assert!(store.load(1, 0, 0).expect("Load failed").is_none());
        assert!(store.remove(0, 0, 0).is_some());
        assert!(store.is_empty());
    }
}
