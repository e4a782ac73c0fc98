//! Screenshot capture methods.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::{Command, PageCommand, ScreenshotFormat};

use super::Page;

// ============================================================================
// Page - Screenshot
// ============================================================================

impl Page {
    /// Captures the viewport as base64-encoded PNG.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the reply carries no image data.
    pub async fn screenshot(&self) -> Result<String> {
        self.screenshot_as(ScreenshotFormat::Png, None).await
    }

    /// Captures the viewport as decoded PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the image data is missing or is not
    /// valid base64.
    pub async fn screenshot_png(&self) -> Result<Vec<u8>> {
        let data = self.screenshot().await?;
        decode_image(&data)
    }

    /// Captures the viewport in `format` as base64.
    ///
    /// `quality` (0-100) only applies to JPEG and WebP.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the reply carries no image data.
    pub async fn screenshot_as(
        &self,
        format: ScreenshotFormat,
        quality: Option<u8>,
    ) -> Result<String> {
        let quality = match format {
            ScreenshotFormat::Png => None,
            ScreenshotFormat::Jpeg | ScreenshotFormat::Webp => quality.map(|q| q.min(100)),
        };

        debug!(?format, ?quality, "Capturing screenshot");

        let result = self
            .send_command(Command::Page(PageCommand::CaptureScreenshot { format, quality }))
            .await?;

        let data = result
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::protocol("Screenshot reply has no data"))?;

        debug!(len = data.len(), "Screenshot captured");
        Ok(data.to_string())
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Decodes base64 image data.
fn decode_image(data: &str) -> Result<Vec<u8>> {
    Base64Standard
        .decode(data)
        .map_err(|e| Error::protocol(format!("Screenshot data is not valid base64: {e}")))
}

// ============================================================================
// Tests
// ============================================================================
