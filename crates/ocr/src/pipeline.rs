use std::sync::Arc;
use std::time::Duration;

use image::GrayImage;
use serde::Deserialize;
use splitbill_core::Item;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::enhance::{self, EnhanceError};
use crate::parser::ReceiptParser;
use crate::recognizer::{RecognitionMode, TextRecognizer};
use crate::regions::{Region, RegionDetector};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Image could not be read: {0}")]
    Decode(#[from] EnhanceError),
    #[error("Image processing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Tunables for segmentation and recognition. Image enhancement itself uses
/// fixed parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Upper bound on one recognizer call.
    pub region_timeout_ms: u64,
    pub min_region_width: u32,
    pub min_region_height: u32,
    /// Regions wider than this are recognized in line mode.
    pub line_mode_min_width: u32,
    /// Recognize the whole page when segmentation finds nothing.
    pub full_page_fallback: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            region_timeout_ms: 10_000,
            min_region_width: 50,
            min_region_height: 10,
            line_mode_min_width: 300,
            full_page_fallback: true,
        }
    }
}

impl ScanConfig {
    pub fn region_timeout(&self) -> Duration {
        Duration::from_millis(self.region_timeout_ms)
    }
}

/// The result of a single scan.
#[derive(Debug)]
pub struct ScanOutcome {
    /// Regions that survived segmentation.
    pub regions: usize,
    /// Non-empty recognizer outputs, in region order.
    pub lines: Vec<String>,
    pub items: Vec<Item>,
}

impl ScanOutcome {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Orchestrates: decode → enhance → segment → recognize per region → parse.
pub struct ScanPipeline {
    recognizer: Arc<dyn TextRecognizer>,
    detector: RegionDetector,
    config: ScanConfig,
}

impl ScanPipeline {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, config: ScanConfig) -> Self {
        let detector = RegionDetector::new(config.min_region_width, config.min_region_height);
        Self { recognizer, detector, config }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan raw upload bytes. Fails only when the image cannot be decoded;
    /// unreadable regions and lines are dropped.
    pub async fn scan(&self, data: Vec<u8>) -> Result<ScanOutcome, ScanError> {
        let detector = self.detector.clone();
        let (enhanced, regions) =
            tokio::task::spawn_blocking(move || segment(&data, &detector)).await??;
        debug!(
            width = enhanced.width(),
            height = enhanced.height(),
            regions = regions.len(),
            "image segmented"
        );

        let mut lines = Vec::new();
        if regions.is_empty() {
            if self.config.full_page_fallback {
                debug!("no regions found, recognizing full page");
                lines.extend(self.recognize(enhanced, RecognitionMode::Line).await);
            }
        } else {
            for region in &regions {
                let mode = RecognitionMode::for_width(region.width, self.config.line_mode_min_width);
                lines.extend(self.recognize(region.crop(&enhanced), mode).await);
            }
        }

        let items = ReceiptParser::parse(&lines.join("\n"));
        info!(
            regions = regions.len(),
            lines = lines.len(),
            items = items.len(),
            "scan complete"
        );

        Ok(ScanOutcome {
            regions: regions.len(),
            lines,
            items,
        })
    }

    /// One bounded recognizer call. Any failure yields `None`.
    async fn recognize(&self, image: GrayImage, mode: RecognitionMode) -> Option<String> {
        let png = match enhance::encode_png(&image) {
            Ok(png) => png,
            Err(e) => {
                warn!("Region encode failed: {e}");
                return None;
            }
        };
        drop(image);

        let recognizer = Arc::clone(&self.recognizer);
        let task = tokio::task::spawn_blocking(move || recognizer.recognize(&png, mode));

        let text = match tokio::time::timeout(self.config.region_timeout(), task).await {
            Ok(Ok(Ok(text))) => text,
            Ok(Ok(Err(e))) => {
                warn!(?mode, "Recognizer error: {e}");
                return None;
            }
            Ok(Err(e)) => {
                warn!(?mode, "Recognizer task failed: {e}");
                return None;
            }
            Err(_) => {
                warn!(?mode, timeout_ms = self.config.region_timeout_ms, "Recognizer timed out");
                return None;
            }
        };

        let text = text.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }
}

/// Decode, enhance and segment. CPU-bound; run off the async workers.
fn segment(
    data: &[u8],
    detector: &RegionDetector,
) -> Result<(GrayImage, Vec<Region>), ScanError> {
    let raw = enhance::decode(data)?;
    let enhanced = enhance::enhance(&raw);
    drop(raw);
    let regions = detector.detect(&enhanced);
    Ok((enhanced, regions))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
