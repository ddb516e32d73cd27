use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compositor::CompositorConfig;
use crate::coord::MAX_ZOOM;
use crate::download::DownloadConfig;
use crate::error::{StitchError, StitchResult};
use crate::store::{FileTileStore, TILE_SIZE};

/// Top-level configuration, normally read from a JSON file.
/// Every field is optional in the file and falls back to [`Config::default`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tile_root: PathBuf,     // Root directory of the tile store
    pub tile_extension: String, // File extension of stored tiles
    pub tile_size: u32,         // Tile edge length in pixels
    pub download: DownloadConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tile_root: PathBuf::from("tiles"),
            tile_extension: "png".to_string(),
            tile_size: TILE_SIZE,
            download: DownloadConfig::default(),
        }
    }
}

impl Config {
    /// Read and validate a JSON configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> StitchResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|e| StitchError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> StitchResult<()> {
        if self.tile_size == 0 {
            return Err(StitchError::Config("tile_size must be positive".to_string()));
        }
        if self.tile_extension.trim_start_matches('.').is_empty() {
            return Err(StitchError::Config("tile_extension must not be empty".to_string()));
        }

        let download = &self.download;
        if download.min_zoom > download.max_zoom || download.max_zoom > MAX_ZOOM {
            return Err(StitchError::Config(format!(
                "zoom range {}..={} is invalid (maximum {})",
                download.min_zoom, download.max_zoom, MAX_ZOOM
            )));
        }
        for placeholder in ["{z}", "{x}", "{y}"] {
            if !download.url_template.contains(placeholder) {
                return Err(StitchError::Config(format!("url_template is missing {}", placeholder)));
            }
        }
        if download.threads == 0 {
            return Err(StitchError::Config("download threads must be positive".to_string()));
        }
        download.bbox.validate()
    }

    pub fn compositor_config(&self) -> CompositorConfig {
        CompositorConfig { tile_size: self.tile_size }
    }

    pub fn tile_store(&self) -> FileTileStore {
        FileTileStore::new(&self.tile_root, &self.tile_extension)
    }
}
