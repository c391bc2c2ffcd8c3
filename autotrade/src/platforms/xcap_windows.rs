//! Window listing through xcap where Win32 is unavailable.
//!
//! xcap can enumerate and describe windows but not change their visibility,
//! so the visibility commands report an unsupported platform here.

use super::WindowManager;
use crate::errors::AutomationError;
use crate::types::{Point, WindowInfo};

#[derive(Debug, Default, Clone)]
pub struct XcapWindowManager;

impl XcapWindowManager {
    pub fn new() -> Self {
        Self
    }

    fn unsupported(operation: &str) -> AutomationError {
        AutomationError::UnsupportedPlatform(format!(
            "{operation} is only available on Windows"
        ))
    }
}

impl WindowManager for XcapWindowManager {
    fn windows(&self) -> Result<Vec<WindowInfo>, AutomationError> {
        let windows = xcap::Window::all()
            .map_err(|e| AutomationError::PlatformError(format!("Failed to get windows: {e}")))?;

        let mut result = Vec::with_capacity(windows.len());
        for window in windows {
            let handle = window.id().map_err(|e| {
                AutomationError::PlatformError(format!("Failed to get window id: {e}"))
            })?;
            let title = window.title().unwrap_or_default();
            let minimized = window.is_minimized().unwrap_or(false);
            result.push(WindowInfo {
                handle: handle as u64,
                title,
                visible: !minimized,
            });
        }
        Ok(result)
    }

    fn show(&self, _window: &WindowInfo) -> Result<(), AutomationError> {
        Err(Self::unsupported("Showing windows"))
    }

    fn hide(&self, _window: &WindowInfo) -> Result<(), AutomationError> {
        Err(Self::unsupported("Hiding windows"))
    }

    fn set_foreground(&self, _window: &WindowInfo) -> Result<(), AutomationError> {
        Err(Self::unsupported("Activating windows"))
    }

    fn foreground_parent(&self) -> Result<Option<WindowInfo>, AutomationError> {
        Err(Self::unsupported("Locating parent windows"))
    }

    fn window_at(&self, point: Point) -> Result<Option<WindowInfo>, AutomationError> {
        let windows = xcap::Window::all()
            .map_err(|e| AutomationError::PlatformError(format!("Failed to get windows: {e}")))?;

        for window in windows {
            let (Ok(x), Ok(y), Ok(width), Ok(height)) =
                (window.x(), window.y(), window.width(), window.height())
            else {
                continue;
            };
            let inside = point.x >= x
                && point.y >= y
                && point.x < x + width as i32
                && point.y < y + height as i32;
            if inside && !window.is_minimized().unwrap_or(false) {
                let handle = window.id().map_err(|e| {
                    AutomationError::PlatformError(format!("Failed to get window id: {e}"))
                })?;
                return Ok(Some(WindowInfo {
                    handle: handle as u64,
                    title: window.title().unwrap_or_default(),
                    visible: true,
                }));
            }
        }
        Ok(None)
    }
}
