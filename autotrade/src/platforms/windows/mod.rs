//! Win32 window enumeration and visibility control

use super::WindowManager;
use crate::errors::AutomationError;
use crate::types::{Point, WindowInfo};
use std::ffi::c_void;
use tracing::debug;
use windows::Win32::Foundation::{BOOL, HWND, LPARAM, POINT};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetAncestor, GetForegroundWindow, GetParent, GetWindowTextLengthW,
    GetWindowTextW, IsWindowVisible, SetForegroundWindow, ShowWindow, WindowFromPoint, GA_ROOT,
    SW_HIDE, SW_SHOW,
};

#[derive(Debug, Default, Clone)]
pub struct Win32WindowManager;

impl Win32WindowManager {
    pub fn new() -> Self {
        Self
    }
}

fn to_hwnd(handle: u64) -> HWND {
    HWND(handle as usize as *mut c_void)
}

fn describe(hwnd: HWND) -> WindowInfo {
    let title = unsafe {
        let length = GetWindowTextLengthW(hwnd);
        if length > 0 {
            let mut buffer = vec![0u16; length as usize + 1];
            let copied = GetWindowTextW(hwnd, &mut buffer);
            String::from_utf16_lossy(&buffer[..copied.max(0) as usize])
        } else {
            String::new()
        }
    };
    WindowInfo {
        handle: hwnd.0 as usize as u64,
        title,
        visible: unsafe { IsWindowVisible(hwnd) }.as_bool(),
    }
}

unsafe extern "system" fn collect_window(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let handles = &mut *(lparam.0 as *mut Vec<HWND>);
    handles.push(hwnd);
    BOOL(1)
}

impl WindowManager for Win32WindowManager {
    fn windows(&self) -> Result<Vec<WindowInfo>, AutomationError> {
        let mut handles: Vec<HWND> = Vec::new();
        unsafe {
            EnumWindows(
                Some(collect_window),
                LPARAM(&mut handles as *mut Vec<HWND> as isize),
            )
        }
        .map_err(|e| AutomationError::PlatformError(format!("Failed to enumerate windows: {e}")))?;
        Ok(handles.into_iter().map(describe).collect())
    }

    fn show(&self, window: &WindowInfo) -> Result<(), AutomationError> {
        debug!("Showing window '{}'", window.title);
        unsafe {
            let _ = ShowWindow(to_hwnd(window.handle), SW_SHOW);
        }
        Ok(())
    }

    fn hide(&self, window: &WindowInfo) -> Result<(), AutomationError> {
        debug!("Hiding window '{}'", window.title);
        unsafe {
            let _ = ShowWindow(to_hwnd(window.handle), SW_HIDE);
        }
        Ok(())
    }

    fn set_foreground(&self, window: &WindowInfo) -> Result<(), AutomationError> {
        let result = unsafe { SetForegroundWindow(to_hwnd(window.handle)) };
        if !result.as_bool() {
            debug!("SetForegroundWindow failed, but continuing");
        }
        Ok(())
    }

    fn foreground_parent(&self) -> Result<Option<WindowInfo>, AutomationError> {
        let foreground = unsafe { GetForegroundWindow() };
        if foreground.0.is_null() {
            return Ok(None);
        }
        match unsafe { GetParent(foreground) } {
            Ok(parent) if !parent.0.is_null() => Ok(Some(describe(parent))),
            _ => Ok(None),
        }
    }

    fn window_at(&self, point: Point) -> Result<Option<WindowInfo>, AutomationError> {
        let hwnd = unsafe { WindowFromPoint(POINT { x: point.x, y: point.y }) };
        if hwnd.0.is_null() {
            return Ok(None);
        }
        let root = unsafe { GetAncestor(hwnd, GA_ROOT) };
        let top_level = if root.0.is_null() { hwnd } else { root };
        Ok(Some(describe(top_level)))
    }
}
