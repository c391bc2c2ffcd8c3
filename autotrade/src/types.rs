//! Common types shared by the engine and the platform backends

use crate::errors::AutomationError;
use std::fmt;
use std::str::FromStr;

/// A screen coordinate in physical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.x, self.y)
    }
}

impl FromStr for Point {
    type Err = AutomationError;

    /// Accepts `x, y` with or without surrounding parentheses.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = parse_int_list(s)?;
        match values.as_slice() {
            [x, y] => Ok(Point::new(*x, *y)),
            _ => Err(AutomationError::InvalidArgument(format!(
                "expected two coordinates, got '{s}'"
            ))),
        }
    }
}

/// A screen rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.x + (self.width / 2) as i32,
            self.y + (self.height / 2) as i32,
        )
    }
}

/// Splits `"(1, 2, 3)"` or `"1, 2, 3"` into integers.
pub(crate) fn parse_int_list(s: &str) -> Result<Vec<i32>, AutomationError> {
    let inner = s
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .trim();
    if inner.is_empty() {
        return Ok(Vec::new());
    }
    inner
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<i32>()
                .map_err(|e| AutomationError::InvalidArgument(format!("'{part}': {e}")))
        })
        .collect()
}

/// Splits a comma separated argument into trimmed, non-empty fields.
pub(crate) fn split_fields(s: &str) -> Vec<&str> {
    s.split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
}

impl MouseButton {
    /// The physical button that produces this logical click when the
    /// operator has swapped the primary and secondary buttons.
    pub fn honoring_swap(self, swapped: bool) -> Self {
        match (self, swapped) {
            (MouseButton::Left, true) => MouseButton::Right,
            (MouseButton::Right, true) => MouseButton::Left,
            (button, false) => button,
        }
    }
}

/// Keyboard keys the macro language can name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Tab,
    Enter,
    Escape,
    Space,
    Backspace,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
    Ctrl,
    Alt,
    Shift,
    Meta,
    F(u8),
}

impl FromStr for Key {
    type Err = AutomationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        let key = match name.as_str() {
            "tab" => Key::Tab,
            "enter" | "return" => Key::Enter,
            "esc" | "escape" => Key::Escape,
            "space" | " " => Key::Space,
            "backspace" => Key::Backspace,
            "delete" | "del" => Key::Delete,
            "insert" => Key::Insert,
            "home" => Key::Home,
            "end" => Key::End,
            "pageup" | "pgup" => Key::PageUp,
            "pagedown" | "pgdn" => Key::PageDown,
            "up" => Key::Up,
            "down" => Key::Down,
            "left" => Key::Left,
            "right" => Key::Right,
            "ctrl" | "control" | "ctrlleft" => Key::Ctrl,
            "alt" | "altleft" => Key::Alt,
            "shift" | "shiftleft" => Key::Shift,
            "win" | "winleft" | "command" | "meta" => Key::Meta,
            _ => {
                if let Some(number) = name.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
                    if (1..=24).contains(&number) {
                        return Ok(Key::F(number));
                    }
                }
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_graphic() => Key::Char(c),
                    _ => {
                        return Err(AutomationError::InvalidArgument(format!(
                            "unknown key '{s}'"
                        )))
                    }
                }
            }
        };
        Ok(key)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{c}"),
            Key::F(n) => write!(f, "f{n}"),
            other => write!(f, "{}", format!("{other:?}").to_lowercase()),
        }
    }
}

/// A top-level window as seen by the window manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    /// Opaque platform handle
    pub handle: u64,
    pub title: String,
    pub visible: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_parsing_accepts_both_forms() {
        assert_eq!("(10, 20)".parse::<Point>().unwrap(), Point::new(10, 20));
        assert_eq!("10,20".parse::<Point>().unwrap(), Point::new(10, 20));
        assert!("10".parse::<Point>().is_err());
        assert!("a, b".parse::<Point>().is_err());
    }

    #[test]
    fn test_point_display_matches_capture_format() {
        assert_eq!(Point::new(-5, 700).to_string(), "-5, 700");
    }

    #[test]
    fn test_key_names() {
        assert_eq!("Tab".parse::<Key>().unwrap(), Key::Tab);
        assert_eq!("esc".parse::<Key>().unwrap(), Key::Escape);
        assert_eq!("f12".parse::<Key>().unwrap(), Key::F(12));
        assert_eq!("a".parse::<Key>().unwrap(), Key::Char('a'));
        assert!("hyper".parse::<Key>().is_err());
        assert_eq!(Key::PageDown.to_string(), "pagedown");
    }

    #[test]
    fn test_swapped_buttons() {
        assert_eq!(MouseButton::Left.honoring_swap(true), MouseButton::Right);
        assert_eq!(MouseButton::Right.honoring_swap(false), MouseButton::Right);
    }

    #[test]
    fn test_rect_center() {
        assert_eq!(Rect::new(10, 10, 20, 40).center(), Point::new(20, 30));
    }
}
