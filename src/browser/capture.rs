//! Screenshot capture
//!
//! Two PNGs per analysis: a hero shot clipped to the top of the page, and a
//! full-page capture. Both assume the settler left the page at scroll (0,0).

use crate::browser::PageHandle;
use crate::error::{CaptureError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, Viewport};
use chromiumoxide::page::ScreenshotParams;
use serde::{Serialize, Serializer};
use tracing::{debug, info, instrument};

/// Widest hero capture
pub const HERO_MAX_WIDTH: u32 = 1920;
/// Tallest hero capture
pub const HERO_MAX_HEIGHT: u32 = 1080;

/// Raster captures paired with one snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Screenshots {
    /// Clipped top-of-page capture
    #[serde(serialize_with = "as_base64")]
    pub hero: Vec<u8>,
    /// Full-page capture
    #[serde(serialize_with = "as_base64")]
    pub full: Vec<u8>,
}

impl Screenshots {
    /// MIME type of both captures
    pub const MIME_TYPE: &'static str = "image/png";

    /// Hero capture as base64
    pub fn hero_base64(&self) -> String {
        BASE64.encode(&self.hero)
    }

    /// Full capture as base64
    pub fn full_base64(&self) -> String {
        BASE64.encode(&self.full)
    }
}

fn as_base64<S: Serializer>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&BASE64.encode(bytes))
}

/// Hero clip size: `min(1920, page_width) x min(1080, viewport_height)`.
///
/// Zero measurements fall back to the configured viewport.
pub fn hero_clip(page_width: u32, viewport_height: u32, fallback: (u32, u32)) -> (u32, u32) {
    let width = if page_width == 0 { fallback.0 } else { page_width };
    let height = if viewport_height == 0 { fallback.1 } else { viewport_height };
    (width.min(HERO_MAX_WIDTH).max(1), height.min(HERO_MAX_HEIGHT).max(1))
}

/// Screenshot capture for a settled page
pub struct ScreenshotCapturer;

impl ScreenshotCapturer {
    /// Capture hero and full-page PNGs
    #[instrument(skip(page))]
    pub async fn capture(page: &PageHandle, page_width: u32, viewport_height: u32) -> Result<Screenshots> {
        info!("Capturing screenshots");

        let (width, height) = hero_clip(page_width, viewport_height, page.viewport());

        let hero_params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .clip(Viewport {
                x: 0.0,
                y: 0.0,
                width: width as f64,
                height: height as f64,
                scale: 1.0,
            })
            .build();

        let hero = page
            .page
            .screenshot(hero_params)
            .await
            .map_err(|e| CaptureError::ScreenshotFailed(format!("hero: {}", e)))?;

        let full_params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .capture_beyond_viewport(true)
            .from_surface(true)
            .build();

        let full = page
            .page
            .screenshot(full_params)
            .await
            .map_err(|e| CaptureError::ScreenshotFailed(format!("full page: {}", e)))?;

        debug!(
            "Screenshots captured: hero {}x{} ({} bytes), full ({} bytes)",
            width,
            height,
            hero.len(),
            full.len()
        );

        Ok(Screenshots { hero, full })
    }
}
