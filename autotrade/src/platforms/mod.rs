use crate::errors::AutomationError;
use crate::types::{Key, MouseButton, Point, Rect, WindowInfo};
use image::{DynamicImage, RgbaImage};

pub mod speech;

#[cfg(feature = "native")]
pub mod capture;
#[cfg(feature = "native")]
pub mod input;
#[cfg(feature = "native")]
pub mod recognizer;
#[cfg(all(feature = "native", target_os = "windows"))]
pub mod windows;
#[cfg(all(feature = "native", not(target_os = "windows")))]
pub mod xcap_windows;

/// Grabs pixels from the screen
pub trait ScreenCapture {
    /// Capture a rectangle in virtual-screen coordinates
    fn capture_region(&self, rect: &Rect) -> Result<RgbaImage, AutomationError>;
}

/// Optical character recognition over a prepared image
pub trait TextRecognizer {
    fn recognize(&self, image: &DynamicImage) -> Result<String, AutomationError>;
}

/// How a key wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyWait {
    /// The awaited key was released
    Released,
    /// Escape was pressed first
    Escaped,
}

/// Pointer and keyboard simulation plus the little input state the macros read back
pub trait InputDriver {
    fn pointer_position(&self) -> Result<Point, AutomationError>;

    fn move_to(&self, point: Point) -> Result<(), AutomationError>;

    /// Click at `point`, or where the pointer is when `None`. `button` is physical.
    fn click(&self, point: Option<Point>, button: MouseButton) -> Result<(), AutomationError>;

    fn press_key(&self, key: Key, presses: u32) -> Result<(), AutomationError>;

    /// Press `keys` in order, then release them in reverse
    fn press_hotkeys(&self, keys: &[Key]) -> Result<(), AutomationError>;

    fn type_text(&self, text: &str) -> Result<(), AutomationError>;

    fn beep(&self) -> Result<(), AutomationError>;

    /// Whether the physical `button` is currently held down
    fn button_down(&self, button: MouseButton) -> Result<bool, AutomationError>;

    /// Whether the operator swapped the primary and secondary buttons
    fn buttons_swapped(&self) -> bool;

    /// Block until `key` is released or escape is pressed
    fn wait_for_key(&self, key: Key) -> Result<KeyWait, AutomationError>;
}

/// Top-level window enumeration and visibility control
pub trait WindowManager {
    fn windows(&self) -> Result<Vec<WindowInfo>, AutomationError>;

    fn show(&self, window: &WindowInfo) -> Result<(), AutomationError>;

    fn hide(&self, window: &WindowInfo) -> Result<(), AutomationError>;

    fn set_foreground(&self, window: &WindowInfo) -> Result<(), AutomationError>;

    /// Parent (owner) of the foreground window, if it has one
    fn foreground_parent(&self) -> Result<Option<WindowInfo>, AutomationError>;

    /// Top-level window under a screen point
    fn window_at(&self, point: Point) -> Result<Option<WindowInfo>, AutomationError>;
}

/// Text-to-speech
pub trait Speaker {
    fn speak(&self, text: &str) -> Result<(), AutomationError>;
}

#[cfg(feature = "native")]
pub fn create_window_manager() -> Result<Box<dyn WindowManager>, AutomationError> {
    #[cfg(target_os = "windows")]
    {
        Ok(Box::new(windows::Win32WindowManager::new()))
    }
    #[cfg(not(target_os = "windows"))]
    {
        Ok(Box::new(xcap_windows::XcapWindowManager::new()))
    }
}
