//! Screen capture through xcap

use super::ScreenCapture;
use crate::errors::AutomationError;
use crate::types::Rect;
use image::{imageops, ImageBuffer, RgbaImage};

#[derive(Debug, Default, Clone)]
pub struct XcapScreen;

impl XcapScreen {
    pub fn new() -> Self {
        Self
    }
}

impl ScreenCapture for XcapScreen {
    fn capture_region(&self, rect: &Rect) -> Result<RgbaImage, AutomationError> {
        let monitor = xcap::Monitor::from_point(rect.x, rect.y).map_err(|e| {
            AutomationError::PlatformError(format!(
                "Failed to get monitor at ({}, {}): {e}",
                rect.x, rect.y
            ))
        })?;

        let origin_x = monitor.x().map_err(|e| {
            AutomationError::PlatformError(format!("Failed to get monitor x position: {e}"))
        })?;
        let origin_y = monitor.y().map_err(|e| {
            AutomationError::PlatformError(format!("Failed to get monitor y position: {e}"))
        })?;

        let image = monitor.capture_image().map_err(|e| {
            AutomationError::PlatformError(format!("Failed to capture screen: {e}"))
        })?;

        // Rebuild the buffer so the image version xcap links against does not leak out.
        let (width, height) = (image.width(), image.height());
        let screen: RgbaImage = ImageBuffer::from_raw(width, height, image.into_raw())
            .ok_or_else(|| {
                AutomationError::PlatformError("Invalid screenshot buffer".to_string())
            })?;

        let left = (rect.x - origin_x).max(0) as u32;
        let top = (rect.y - origin_y).max(0) as u32;
        if left >= width || top >= height {
            return Err(AutomationError::InvalidArgument(format!(
                "Region {rect:?} lies outside the monitor"
            )));
        }
        let crop_width = rect.width.min(width - left);
        let crop_height = rect.height.min(height - top);

        Ok(imageops::crop_imm(&screen, left, top, crop_width, crop_height).to_image())
    }
}
