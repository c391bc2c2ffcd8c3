//! Locating a widget image inside a captured region

use crate::errors::AutomationError;
use crate::types::Rect;
use image::{imageops, GrayImage, RgbaImage};
use std::path::Path;

/// Mean absolute grey-level difference under which a window counts as a match
const DEFAULT_TOLERANCE: f64 = 12.0;

pub struct Template {
    image: GrayImage,
    tolerance: f64,
}

impl Template {
    pub fn load(path: &Path) -> Result<Self, AutomationError> {
        let image = image::open(path).map_err(|e| {
            AutomationError::InvalidArgument(format!(
                "Failed to load widget image {}: {e}",
                path.display()
            ))
        })?;
        Ok(Self::from_gray(image.to_luma8()))
    }

    pub fn from_gray(image: GrayImage) -> Self {
        Self {
            image,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Best match of the template inside `haystack`, in haystack coordinates.
    pub fn find_in(&self, haystack: &RgbaImage) -> Option<Rect> {
        let haystack = imageops::grayscale(haystack);
        let (tw, th) = self.image.dimensions();
        let (hw, hh) = haystack.dimensions();
        if tw == 0 || th == 0 || tw > hw || th > hh {
            return None;
        }

        let pixels = (tw * th) as f64;
        let budget = (self.tolerance * pixels) as u64;
        let mut best: Option<(u64, u32, u32)> = None;

        for y in 0..=(hh - th) {
            for x in 0..=(hw - tw) {
                let limit = best.map_or(budget, |(score, _, _)| score.min(budget));
                if let Some(score) = self.score_at(&haystack, x, y, limit) {
                    if best.map_or(true, |(current, _, _)| score < current) {
                        best = Some((score, x, y));
                    }
                }
            }
        }

        best.map(|(_, x, y)| Rect::new(x as i32, y as i32, tw, th))
    }

    /// Sum of absolute differences at an offset; `None` once it exceeds `limit`.
    fn score_at(&self, haystack: &GrayImage, x: u32, y: u32, limit: u64) -> Option<u64> {
        let mut total: u64 = 0;
        for (tx, ty, pixel) in self.image.enumerate_pixels() {
            let other = haystack.get_pixel(x + tx, y + ty);
            total += (pixel.0[0] as i32 - other.0[0] as i32).unsigned_abs() as u64;
            if total > limit {
                return None;
            }
        }
        Some(total)
    }
}
