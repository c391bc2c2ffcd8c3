//! Action scripts decoded into typed commands

use crate::config::{ConfigStore, OcrRegion, ACTIONS_SECTION};
use crate::errors::AutomationError;
use crate::literal::TupleEntry;
use crate::ocr::ValueKind;
use crate::sizing::Position;
use crate::types::{split_fields, Key, MouseButton, Point, Rect};
use regex::Regex;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// A window-title pattern, anchored so it must match the whole title
#[derive(Clone)]
pub struct TitlePattern {
    source: String,
    regex: Regex,
}

impl TitlePattern {
    pub fn new(pattern: &str) -> Result<Self, AutomationError> {
        Regex::new(&format!("^(?:{pattern})$"))
            .map(|regex| TitlePattern {
                source: pattern.to_string(),
                regex,
            })
            .map_err(|e| AutomationError::InvalidArgument(format!("title pattern '{pattern}': {e}")))
    }

    pub fn matches(&self, title: &str) -> bool {
        self.regex.is_match(title)
    }

    /// The first capture group of a whole-title match.
    pub fn capture(&self, title: &str) -> Option<String> {
        self.regex
            .captures(title)?
            .get(1)
            .map(|group| group.as_str().to_string())
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for TitlePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TitlePattern({:?})", self.source)
    }
}

impl PartialEq for TitlePattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

/// OCR region of `wait_for_prices`, named in `[Regions]` or written inline
#[derive(Debug, Clone, PartialEq)]
pub enum RegionRef {
    Named(String),
    Inline(OcrRegion),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Return the pointer to where it was when the action started
    BackTo,
    Beep,
    /// Left click at a point, or where the pointer is
    Click(Option<Point>),
    MoveTo(Point),
    PressHotkeys(Vec<Key>),
    PressKey {
        key: Key,
        presses: u32,
    },
    ClickWidget {
        image: PathBuf,
        region: Rect,
        button: MouseButton,
    },
    CalculateShareSize(Position),
    CountTrades,
    GetSymbol(TitlePattern),
    HideWindow(TitlePattern),
    ShowWindow(TitlePattern),
    ShowHideWindow(TitlePattern),
    HideParentWindow,
    ShowHideWindowOnClick(TitlePattern),
    SpeakConfig {
        section: String,
        option: String,
    },
    WaitForKey(Key),
    WaitForPeriod(Duration),
    WaitForPrices {
        region: RegionRef,
        kind: ValueKind,
    },
    WaitForWindow(TitlePattern),
    WriteAltSymbol {
        first: String,
        second: String,
    },
    WriteShareSize,
}

fn required<'v>(name: &str, value: Option<&'v str>) -> Result<&'v str, AutomationError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AutomationError::InvalidArgument(format!("{name} needs an argument")))
}

fn invalid(name: &str, value: &str, expected: &str) -> AutomationError {
    AutomationError::InvalidArgument(format!("{name} expects {expected}, got '{value}'"))
}

impl Command {
    /// Decodes one stored `(name, argument)` pair.
    pub fn parse(entry: &TupleEntry) -> Result<Self, AutomationError> {
        let name = entry.key.trim();
        let value = entry.value.as_deref();
        let pattern = || TitlePattern::new(required(name, value)?);

        let command = match name {
            "back_to" => Command::BackTo,
            "beep" => Command::Beep,
            "click" => Command::Click(match value.map(str::trim).filter(|v| !v.is_empty()) {
                Some(point) => Some(point.parse()?),
                None => None,
            }),
            "move_to" => Command::MoveTo(required(name, value)?.parse()?),
            "press_hotkeys" => {
                let raw = required(name, value)?;
                let keys = split_fields(raw)
                    .into_iter()
                    .map(str::parse)
                    .collect::<Result<Vec<Key>, _>>()?;
                if keys.is_empty() {
                    return Err(invalid(name, raw, "'key, key, ...'"));
                }
                Command::PressHotkeys(keys)
            }
            "press_key" => {
                let raw = required(name, value)?;
                match split_fields(raw).as_slice() {
                    [key] => Command::PressKey {
                        key: key.parse()?,
                        presses: 1,
                    },
                    [key, presses] => Command::PressKey {
                        key: key.parse()?,
                        presses: presses
                            .parse()
                            .map_err(|_| invalid(name, raw, "'key, presses'"))?,
                    },
                    _ => return Err(invalid(name, raw, "'key[, presses]'")),
                }
            }
            "click_widget" => {
                let raw = required(name, value)?;
                let fields = split_fields(raw);
                let expected = "'image, x, y, width, height[, right]'";
                let (image, numbers, button) = match fields.as_slice() {
                    [image, rest @ ..] if rest.len() == 4 => (image, rest, MouseButton::Left),
                    [image, rest @ .., "right"] if rest.len() == 4 => {
                        (image, rest, MouseButton::Right)
                    }
                    _ => return Err(invalid(name, raw, expected)),
                };
                let numbers = numbers
                    .iter()
                    .map(|n| n.parse::<i32>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| invalid(name, raw, expected))?;
                let &[x, y, width, height] = numbers.as_slice() else {
                    return Err(invalid(name, raw, expected));
                };
                if width <= 0 || height <= 0 {
                    return Err(invalid(name, raw, expected));
                }
                Command::ClickWidget {
                    image: PathBuf::from(image),
                    region: Rect::new(x, y, width as u32, height as u32),
                    button,
                }
            }
            "calculate_share_size" => Command::CalculateShareSize(required(name, value)?.parse()?),
            "count_trades" => Command::CountTrades,
            "get_symbol" => Command::GetSymbol(pattern()?),
            "hide_window" => Command::HideWindow(pattern()?),
            "show_window" => Command::ShowWindow(pattern()?),
            "show_hide_window" => Command::ShowHideWindow(pattern()?),
            "hide_parent_window" => Command::HideParentWindow,
            "show_hide_window_on_click" => Command::ShowHideWindowOnClick(pattern()?),
            "speak_config" => {
                let raw = required(name, value)?;
                match split_fields(raw).as_slice() {
                    [section, option] => Command::SpeakConfig {
                        section: section.to_string(),
                        option: option.to_string(),
                    },
                    _ => return Err(invalid(name, raw, "'section, option'")),
                }
            }
            "wait_for_key" => Command::WaitForKey(required(name, value)?.parse()?),
            "wait_for_period" => {
                let raw = required(name, value)?;
                let seconds = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
                    .ok_or_else(|| invalid(name, raw, "seconds"))?;
                Command::WaitForPeriod(Duration::from_secs_f64(seconds))
            }
            "wait_for_prices" => {
                let raw = required(name, value)?;
                if let Ok(region) = raw.parse::<OcrRegion>() {
                    Command::WaitForPrices {
                        region: RegionRef::Inline(region),
                        kind: ValueKind::NumericColumns,
                    }
                } else {
                    match split_fields(raw).as_slice() {
                        [region] => Command::WaitForPrices {
                            region: RegionRef::Named(region.to_string()),
                            kind: ValueKind::NumericColumns,
                        },
                        [region, kind] => Command::WaitForPrices {
                            region: RegionRef::Named(region.to_string()),
                            kind: kind.parse()?,
                        },
                        _ => return Err(invalid(name, raw, "'region[, kind]'")),
                    }
                }
            }
            "wait_for_window" => Command::WaitForWindow(pattern()?),
            "write_alt_symbol" => {
                let raw = required(name, value)?;
                match split_fields(raw).as_slice() {
                    [first, second] => Command::WriteAltSymbol {
                        first: first.to_string(),
                        second: second.to_string(),
                    },
                    _ => return Err(invalid(name, raw, "'symbol, symbol'")),
                }
            }
            "write_share_size" => Command::WriteShareSize,
            other => {
                return Err(AutomationError::InvalidArgument(format!(
                    "unknown command '{other}'"
                )))
            }
        };
        Ok(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::BackTo => "back_to",
            Command::Beep => "beep",
            Command::Click(_) => "click",
            Command::MoveTo(_) => "move_to",
            Command::PressHotkeys(_) => "press_hotkeys",
            Command::PressKey { .. } => "press_key",
            Command::ClickWidget { .. } => "click_widget",
            Command::CalculateShareSize(_) => "calculate_share_size",
            Command::CountTrades => "count_trades",
            Command::GetSymbol(_) => "get_symbol",
            Command::HideWindow(_) => "hide_window",
            Command::ShowWindow(_) => "show_window",
            Command::ShowHideWindow(_) => "show_hide_window",
            Command::HideParentWindow => "hide_parent_window",
            Command::ShowHideWindowOnClick(_) => "show_hide_window_on_click",
            Command::SpeakConfig { .. } => "speak_config",
            Command::WaitForKey(_) => "wait_for_key",
            Command::WaitForPeriod(_) => "wait_for_period",
            Command::WaitForPrices { .. } => "wait_for_prices",
            Command::WaitForWindow(_) => "wait_for_window",
            Command::WriteAltSymbol { .. } => "write_alt_symbol",
            Command::WriteShareSize => "write_share_size",
        }
    }
}

/// A named script of commands
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub name: String,
    pub commands: Vec<Command>,
}

impl Action {
    pub fn from_entries(name: &str, entries: &[TupleEntry]) -> Result<Self, AutomationError> {
        let commands = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                Command::parse(entry).map_err(|e| {
                    AutomationError::InvalidArgument(format!("{name}, command {index}: {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: name.to_string(),
            commands,
        })
    }

    /// Loads and decodes `[Actions] name`.
    pub fn load(store: &ConfigStore, name: &str) -> Result<Self, AutomationError> {
        let entries = store.tuple_list(ACTIONS_SECTION, name)?.ok_or_else(|| {
            AutomationError::Config(format!("action '{name}' is not defined"))
        })?;
        Self::from_entries(name, &entries)
    }
}
