//! Ordered section/option store persisted as an INI file.
//!
//! Loaded once per invocation and rewritten wholesale after each mutating
//! operation. A write failure is fatal to the caller.

use crate::errors::AutomationError;
use crate::literal::{self, TupleEntry};
use crate::retry::RetryPolicy;
use crate::types::{parse_int_list, Rect};
use ini::{EscapePolicy, Ini, ParseOption};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const ACTIONS_SECTION: &str = "Actions";
pub const GENERAL_SECTION: &str = "General";
pub const REGIONS_SECTION: &str = "Regions";
pub const VARIABLES_SECTION: &str = "Variables";

/// Values are kept byte for byte: regexes and Windows paths carry backslashes,
/// and tuple lists do their own quoting.
fn raw_values() -> ParseOption {
    ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    }
}

pub struct ConfigStore {
    ini: Ini,
    path: PathBuf,
}

impl ConfigStore {
    /// Reads `path`; a missing file starts an empty store that `save` will create.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AutomationError> {
        let path = path.as_ref().to_path_buf();
        let ini = if path.exists() {
            Ini::load_from_file_opt(&path, raw_values()).map_err(|e| {
                AutomationError::Config(format!("failed to read {}: {e}", path.display()))
            })?
        } else {
            debug!("No configuration at {:?}, starting empty", path);
            Ini::new()
        };
        Ok(Self { ini, path })
    }

    /// An unsaved store rooted at `path`.
    pub fn empty(path: impl AsRef<Path>) -> Self {
        Self {
            ini: Ini::new(),
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolves a configured path against the directory holding the store.
    pub fn resolve(&self, raw: &str) -> PathBuf {
        match self.path.parent() {
            Some(base) => base.join(raw.trim()),
            None => PathBuf::from(raw.trim()),
        }
    }

    pub fn save(&self) -> Result<(), AutomationError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        self.ini
            .write_to_file_policy(&self.path, EscapePolicy::Nothing)?;
        info!("Saved configuration to {:?}", self.path);
        Ok(())
    }

    pub fn get(&self, section: &str, option: &str) -> Option<&str> {
        self.ini.get_from(Some(section), option)
    }

    pub fn contains(&self, section: &str, option: &str) -> bool {
        self.get(section, option).is_some()
    }

    pub fn require(&self, section: &str, option: &str) -> Result<&str, AutomationError> {
        self.get(section, option).ok_or_else(|| {
            AutomationError::Config(format!("option '{option}' missing from [{section}]"))
        })
    }

    pub fn set(&mut self, section: &str, option: &str, value: impl Into<String>) {
        self.ini
            .set_to(Some(section), option.to_string(), value.into());
    }

    /// Removes an option, dropping its section once nothing is left in it.
    pub fn remove(&mut self, section: &str, option: &str) -> Option<String> {
        let removed = self.ini.delete_from(Some(section), option);
        if self
            .ini
            .section(Some(section))
            .is_some_and(|properties| properties.is_empty())
        {
            self.ini.delete(Some(section));
        }
        removed
    }

    /// Option names of a section in file order.
    pub fn options(&self, section: &str) -> Vec<String> {
        self.ini
            .section(Some(section))
            .map(|properties| properties.iter().map(|(key, _)| key.to_string()).collect())
            .unwrap_or_default()
    }

    /// Parses an option as `T`, falling back to `default` when it is absent.
    pub fn parse_or<T>(&self, section: &str, option: &str, default: T) -> Result<T, AutomationError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(section, option) {
            Some(raw) => raw.trim().parse::<T>().map_err(|e| {
                AutomationError::Config(format!("[{section}] {option} = '{raw}': {e}"))
            }),
            None => Ok(default),
        }
    }

    pub fn tuple_list(
        &self,
        section: &str,
        option: &str,
    ) -> Result<Option<Vec<TupleEntry>>, AutomationError> {
        self.get(section, option)
            .map(literal::parse_tuple_list)
            .transpose()
    }

    pub fn set_tuple_list(&mut self, section: &str, option: &str, entries: &[TupleEntry]) {
        self.set(section, option, literal::format_tuple_list(entries));
    }

    pub fn string_list(
        &self,
        section: &str,
        option: &str,
    ) -> Result<Option<Vec<String>>, AutomationError> {
        self.get(section, option)
            .map(literal::parse_string_list)
            .transpose()
    }

    pub fn action_names(&self) -> Vec<String> {
        self.options(ACTIONS_SECTION)
    }

    /// Deletes an action and persists; returns whether it existed.
    pub fn delete_action(&mut self, name: &str) -> Result<bool, AutomationError> {
        let existed = self.remove(ACTIONS_SECTION, name).is_some();
        if existed {
            self.save()?;
        }
        Ok(existed)
    }
}

/// A screen rectangle plus the index of the wanted token in the recognized text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OcrRegion {
    pub rect: Rect,
    pub index: usize,
}

impl std::str::FromStr for OcrRegion {
    type Err = AutomationError;

    /// `x, y, width, height, index`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = parse_int_list(s)?;
        match values.as_slice() {
            [x, y, width, height, index] if *width > 0 && *height > 0 && *index >= 0 => {
                Ok(OcrRegion {
                    rect: Rect::new(*x, *y, *width as u32, *height as u32),
                    index: *index as usize,
                })
            }
            _ => Err(AutomationError::InvalidArgument(format!(
                "expected 'x, y, width, height, index', got '{s}'"
            ))),
        }
    }
}

impl OcrRegion {
    pub fn from_store(store: &ConfigStore, option: &str) -> Result<Self, AutomationError> {
        store.require(REGIONS_SECTION, option)?.parse()
    }
}

const DEFAULT_CLICKABLE_WINDOWS: [&str; 3] = [
    r"個別チャート\s.*",
    r"登録銘柄.*",
    r"株価ボード.*",
];

/// Typed view over `[General]`
#[derive(Debug, Clone)]
pub struct Settings {
    /// Zero means "sample the cash balance from the screen".
    pub fixed_cash_balance: f64,
    pub utilization_ratio: f64,
    pub trading_unit: u64,
    pub customer_margin_ratio: f64,
    pub margin_ratios_path: PathBuf,
    pub closing_prices_directory: PathBuf,
    pub ocr: OcrSettings,
    pub retry: RetryPolicy,
    pub positioning_keys: Vec<String>,
    /// Window titles whose clicks toggle another window. Kept apart from any
    /// other window list in the configuration.
    pub clickable_windows: Vec<String>,
}

/// How captured regions are cleaned up before recognition
#[derive(Debug, Clone, PartialEq)]
pub struct OcrSettings {
    pub magnification: u32,
    /// Luma at or below which a pixel counts as ink. Unused with `color_key`.
    pub threshold: u8,
    /// Pixels near this color become ink and everything else background.
    /// Replaces both `threshold` and `dark_theme`, since keying picks the text
    /// color directly whatever the background.
    pub color_key: Option<[u8; 3]>,
    /// Light text on a dark background. Unused with `color_key`.
    pub dark_theme: bool,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            magnification: 4,
            threshold: 128,
            color_key: None,
            dark_theme: false,
        }
    }
}

impl Settings {
    pub fn from_store(store: &ConfigStore) -> Result<Self, AutomationError> {
        let s = GENERAL_SECTION;
        let resolve =
            |option: &str, default: &str| store.resolve(store.get(s, option).unwrap_or(default));

        let color_key = match store.get(s, "ocr_color_key") {
            Some(raw) => {
                let values = parse_int_list(raw)?;
                match values.as_slice() {
                    [r, g, b] => Some([*r as u8, *g as u8, *b as u8]),
                    _ => {
                        return Err(AutomationError::Config(format!(
                            "ocr_color_key must be 'r, g, b', got '{raw}'"
                        )))
                    }
                }
            }
            None => None,
        };

        let interval_ms: u64 = store.parse_or(s, "retry_interval_ms", 100)?;

        Ok(Self {
            fixed_cash_balance: store.parse_or(s, "fixed_cash_balance", 0.0)?,
            utilization_ratio: store.parse_or(s, "utilization_ratio", 1.0)?,
            trading_unit: store.parse_or(s, "trading_unit", 100)?,
            customer_margin_ratio: store.parse_or(s, "customer_margin_ratio", 0.31)?,
            margin_ratios_path: resolve("margin_ratios_path", "margin_ratios.csv"),
            closing_prices_directory: resolve("closing_prices_directory", "."),
            ocr: OcrSettings {
                magnification: store.parse_or(s, "ocr_magnification", 4)?,
                threshold: store.parse_or(s, "ocr_threshold", 128)?,
                color_key,
                dark_theme: store.parse_or(s, "ocr_dark_theme", false)?,
            },
            retry: RetryPolicy::until_observed(Duration::from_millis(interval_ms)),
            positioning_keys: store
                .string_list(s, "positioning_keys")?
                .unwrap_or_else(|| vec!["click".to_string(), "move_to".to_string()]),
            clickable_windows: store
                .string_list(s, "clickable_windows")?
                .unwrap_or_else(|| {
                    DEFAULT_CLICKABLE_WINDOWS
                        .iter()
                        .map(|title| title.to_string())
                        .collect()
                }),
        })
    }
}
