use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};
use rayon::prelude::*;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::bounds::BoundingBox;
use crate::store::FileTileStore;

/// Progress is logged every this many tiles within a zoom level
const PROGRESS_INTERVAL: usize = 100;

/// Settings for fetching tiles from a remote imagery service
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub url_template: String, // URL with {z}, {x} and {y} placeholders
    pub user_agent: String,
    pub timeout_secs: u64,    // Per-request timeout
    pub min_zoom: u32,
    pub max_zoom: u32,
    pub bbox: BoundingBox,    // Area to fetch
    pub threads: usize,       // Concurrent requests per zoom level
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            url_template: "https://services.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}"
                .to_string(),
            user_agent: "TileDownloader/1.0".to_string(),
            timeout_secs: 10,
            min_zoom: 8,
            max_zoom: 18,
            bbox: BoundingBox {
                min_lat: 52.249531,
                min_lon: 20.749179,
                max_lat: 52.271303,
                max_lon: 20.782088,
            },
            threads: 4,
        }
    }
}

/// Outcome of a batch download
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DownloadReport {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl DownloadReport {
    pub fn total(&self) -> usize {
        self.downloaded + self.skipped + self.failed
    }

    fn merge(&mut self, other: DownloadReport) {
        self.downloaded += other.downloaded;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Fill in a URL template for one tile
pub fn tile_url(template: &str, zoom: u32, x: u32, y: u32) -> String {
    template
        .replace("{z}", &zoom.to_string())
        .replace("{x}", &x.to_string())
        .replace("{y}", &y.to_string())
}

/// Downloader that populates a [`FileTileStore`] from a tile service
pub struct Downloader {
    store: FileTileStore,
    client: Client,
    config: DownloadConfig,
    pool: rayon::ThreadPool,
}

impl Downloader {
    /// Create a new downloader writing into the given store
    pub fn new(store: FileTileStore, config: DownloadConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads.max(1))
            .build()
            .context("Failed to build download thread pool")?;

        Ok(Self { store, client, config, pool })
    }

    pub fn store(&self) -> &FileTileStore {
        &self.store
    }

    /// Download every tile of the configured area and zoom range
    pub fn download_configured(&self) -> Result<DownloadReport> {
        self.download_bbox(&self.config.bbox, self.config.min_zoom, self.config.max_zoom)
    }

    /// Download every tile touching `bbox` for each zoom in `min_zoom..=max_zoom`.
    ///
    /// Tiles already in the store are skipped. A tile that fails to download
    /// is logged and counted; the rest of the batch carries on.
    pub fn download_bbox(&self, bbox: &BoundingBox, min_zoom: u32, max_zoom: u32) -> Result<DownloadReport> {
        if min_zoom > max_zoom {
            anyhow::bail!("Invalid zoom range {}..={}", min_zoom, max_zoom);
        }

        let mut report = DownloadReport::default();
        for zoom in min_zoom..=max_zoom {
            let level = self
                .download_zoom_level(bbox, zoom)
                .with_context(|| format!("Failed to download zoom level {}", zoom))?;
            report.merge(level);
        }

        info!(
            "Download finished: {} downloaded, {} skipped, {} failed",
            report.downloaded, report.skipped, report.failed
        );
        Ok(report)
    }

    fn download_zoom_level(&self, bbox: &BoundingBox, zoom: u32) -> Result<DownloadReport> {
        let range = bbox.tile_range(zoom)?;
        let total = range.tile_count() as usize;
        info!("Zoom {}: {} tiles", zoom, total);

        let tiles: Vec<(u32, u32)> = range.iter().map(|(x, y)| (x as u32, y as u32)).collect();
        let done = AtomicUsize::new(0);
        let downloaded = AtomicUsize::new(0);
        let skipped = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);

        self.pool.install(|| {
            tiles.par_iter().for_each(|&(x, y)| {
                match self.download_tile(zoom, x, y) {
                    Ok(true) => downloaded.fetch_add(1, Ordering::Relaxed),
                    Ok(false) => skipped.fetch_add(1, Ordering::Relaxed),
                    Err(e) => {
                        warn!("Failed: z={} x={} y={} ({:#})", zoom, x, y, e);
                        failed.fetch_add(1, Ordering::Relaxed)
                    }
                };

                let count = done.fetch_add(1, Ordering::Relaxed) + 1;
                if count % PROGRESS_INTERVAL == 0 || count == total {
                    info!("Zoom {}: {}/{} tiles", zoom, count, total);
                }
            });
        });

        Ok(DownloadReport {
            downloaded: downloaded.into_inner(),
            skipped: skipped.into_inner(),
            failed: failed.into_inner(),
        })
    }

    /// Fetch one tile into the store. Returns `false` if it was already present.
    pub fn download_tile(&self, zoom: u32, x: u32, y: u32) -> Result<bool> {
        if self.store.contains(zoom, x, y) {
            return Ok(false);
        }

        let url = tile_url(&self.config.url_template, zoom, x, y);
        let response = self.client.get(&url)
            .send()
            .with_context(|| format!("Failed to send request to {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to download {}: HTTP {}", url, response.status());
        }
        let data = response.bytes()
            .context("Failed to read response bytes")?;

        self.store.save(zoom, x, y, &data)
            .with_context(|| format!("Failed to save tile z={} x={} y={}", zoom, x, y))?;

        Ok(true)
    }
}
