//! Text recognition through uni-ocr

use super::TextRecognizer;
use crate::errors::AutomationError;
use image::DynamicImage;
use tokio::runtime::Runtime;
use uni_ocr::{OcrEngine, OcrProvider};

/// Drives the async OCR engine from the synchronous macro thread.
pub struct UniOcrRecognizer {
    runtime: Runtime,
    engine: OcrEngine,
}

impl UniOcrRecognizer {
    pub fn new() -> Result<Self, AutomationError> {
        let runtime = Runtime::new().map_err(|e| {
            AutomationError::PlatformError(format!("Failed to create Tokio runtime: {e}"))
        })?;
        let engine = OcrEngine::new(OcrProvider::Auto).map_err(|e| {
            AutomationError::PlatformError(format!("Failed to create OCR engine: {e}"))
        })?;
        Ok(Self { runtime, engine })
    }
}

impl TextRecognizer for UniOcrRecognizer {
    fn recognize(&self, image: &DynamicImage) -> Result<String, AutomationError> {
        let (text, _language, _confidence) = self
            .runtime
            .block_on(self.engine.recognize_image(image))
            .map_err(|e| AutomationError::PlatformError(format!("OCR recognition failed: {e}")))?;
        Ok(text)
    }
}
