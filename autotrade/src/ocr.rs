//! Reading values off the screen.
//!
//! Each attempt captures a region, cleans it up for recognition, recognizes
//! it, and parses the tokens. Any failure along the way just means the screen
//! is not legible yet, and the whole cycle runs again.

use crate::config::{OcrRegion, OcrSettings};
use crate::errors::AutomationError;
use crate::platforms::{ScreenCapture, TextRecognizer};
use crate::retry::RetryPolicy;
use crate::types::Rect;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma, RgbaImage};
use tracing::{debug, instrument};

const COLOR_KEY_TOLERANCE: i32 = 48;

/// What the region is expected to show; selects the recognition whitelist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Integers,
    DecimalNumbers,
    SecuritiesCodeColumn,
    NumericColumns,
}

impl ValueKind {
    pub fn whitelist(&self) -> &'static str {
        match self {
            ValueKind::Integers => "0123456789,",
            ValueKind::DecimalNumbers => "0123456789.,",
            ValueKind::SecuritiesCodeColumn => "0123456789ACDFGHJKLMNPRSTUWXY",
            ValueKind::NumericColumns => "0123456789.,-",
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, ValueKind::SecuritiesCodeColumn)
    }
}

impl std::str::FromStr for ValueKind {
    type Err = AutomationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "integers" => Ok(ValueKind::Integers),
            "decimal_numbers" => Ok(ValueKind::DecimalNumbers),
            "securities_code_column" => Ok(ValueKind::SecuritiesCodeColumn),
            "numeric_columns" => Ok(ValueKind::NumericColumns),
            other => Err(AutomationError::InvalidArgument(format!(
                "unknown value kind '{other}'"
            ))),
        }
    }
}

/// One token read from the screen
#[derive(Debug, Clone, PartialEq)]
pub enum Recognized {
    Number(f64),
    Text(String),
}

impl Recognized {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Recognized::Number(n) => Some(*n),
            Recognized::Text(_) => None,
        }
    }
}

/// Magnify, then either isolate the keyed text color or threshold (inverting
/// for dark themes), giving black ink on white.
pub fn preprocess(image: &RgbaImage, settings: &OcrSettings) -> GrayImage {
    let factor = settings.magnification.max(1);
    let resized = if factor == 1 {
        image.clone()
    } else {
        imageops::resize(
            image,
            image.width() * factor,
            image.height() * factor,
            FilterType::Lanczos3,
        )
    };

    GrayImage::from_fn(resized.width(), resized.height(), |x, y| {
        let [r, g, b, _] = resized.get_pixel(x, y).0;
        let ink = match settings.color_key {
            Some(key) => {
                let distance = (r as i32 - key[0] as i32).abs()
                    + (g as i32 - key[1] as i32).abs()
                    + (b as i32 - key[2] as i32).abs();
                distance <= COLOR_KEY_TOLERANCE
            }
            None => {
                let luma = (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32) as u8;
                (luma <= settings.threshold) != settings.dark_theme
            }
        };
        if ink {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// Splits recognized text into tokens of `kind`. Numeric tokens lose their
/// thousands separators and must then parse whole; any other character
/// outside the kind's whitelist is a misread and fails the attempt.
pub fn tokenize(text: &str, kind: ValueKind) -> Result<Vec<Recognized>, AutomationError> {
    let whitelist = kind.whitelist();
    text.split_whitespace()
        .map(|token| {
            if let Some(stray) = token.chars().find(|c| !whitelist.contains(*c)) {
                return Err(AutomationError::Parse(format!(
                    "'{token}': unexpected '{stray}' for {kind:?}"
                )));
            }
            if kind.is_numeric() {
                token
                    .replace(',', "")
                    .parse::<f64>()
                    .map(Recognized::Number)
                    .map_err(|e| AutomationError::Parse(format!("'{token}': {e}")))
            } else {
                Ok(Recognized::Text(token.to_string()))
            }
        })
        .collect()
}

pub struct OcrExtractor<'a> {
    screen: &'a dyn ScreenCapture,
    recognizer: &'a dyn TextRecognizer,
    settings: &'a OcrSettings,
    retry: RetryPolicy,
}

impl<'a> OcrExtractor<'a> {
    pub fn new(
        screen: &'a dyn ScreenCapture,
        recognizer: &'a dyn TextRecognizer,
        settings: &'a OcrSettings,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            screen,
            recognizer,
            settings,
            retry,
        }
    }

    /// Blocks until `rect` yields at least one token (or the `index`-th token).
    #[instrument(level = "debug", skip(self))]
    pub fn extract(
        &self,
        rect: &Rect,
        kind: ValueKind,
        index: Option<usize>,
    ) -> Result<Vec<Recognized>, AutomationError> {
        self.retry.retry("legible screen text", || {
            let captured = self.screen.capture_region(rect)?;
            let prepared = DynamicImage::ImageLuma8(preprocess(&captured, self.settings));
            let text = self.recognizer.recognize(&prepared)?;
            let mut tokens = tokenize(&text, kind)?;
            debug!(?tokens, "Recognized '{}'", text.trim());

            Ok(match index {
                Some(i) if i < tokens.len() => Some(vec![tokens.swap_remove(i)]),
                Some(_) => None,
                None if tokens.is_empty() => None,
                None => Some(tokens),
            })
        })
    }

    /// The region's configured token as a number.
    pub fn extract_number(
        &self,
        region: &OcrRegion,
        kind: ValueKind,
    ) -> Result<f64, AutomationError> {
        let values = self.extract(&region.rect, kind, Some(region.index))?;
        values
            .first()
            .and_then(Recognized::as_number)
            .ok_or_else(|| {
                AutomationError::InvalidArgument(format!("{kind:?} does not produce numbers"))
            })
    }
}
