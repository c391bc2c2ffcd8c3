//! Input simulation and listening through rdev
//!
//! A background listener thread keeps the last pointer position and button
//! state, and forwards key events for `wait_for_key`.

use super::{InputDriver, KeyWait};
use crate::errors::AutomationError;
use crate::types::{Key, MouseButton, Point};
use rdev::{Button, EventType};
use std::io::Write;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, error};

// The OS may drop events that arrive faster than this.
const EVENT_DELAY: Duration = Duration::from_millis(20);

#[derive(Debug, Default)]
struct ListenerState {
    pointer: Option<Point>,
    left_down: bool,
    right_down: bool,
}

#[derive(Debug, Clone, Copy)]
enum KeyEvent {
    Press(rdev::Key),
    Release(rdev::Key),
}

pub struct RdevInput {
    state: Arc<Mutex<ListenerState>>,
    key_events: Mutex<Receiver<KeyEvent>>,
}

impl RdevInput {
    pub fn new() -> Self {
        let state = Arc::new(Mutex::new(ListenerState::default()));
        let (key_tx, key_rx) = mpsc::channel();
        let listener_state = state.clone();

        thread::spawn(move || {
            if let Err(error) = rdev::listen(move |event: rdev::Event| {
                match event.event_type {
                    EventType::MouseMove { x, y } => {
                        if let Ok(mut state) = listener_state.lock() {
                            state.pointer = Some(Point::new(x as i32, y as i32));
                        }
                    }
                    EventType::ButtonPress(button) | EventType::ButtonRelease(button) => {
                        let down = matches!(event.event_type, EventType::ButtonPress(_));
                        if let Ok(mut state) = listener_state.lock() {
                            match button {
                                Button::Left => state.left_down = down,
                                Button::Right => state.right_down = down,
                                _ => {}
                            }
                        }
                    }
                    EventType::KeyPress(key) => {
                        let _ = key_tx.send(KeyEvent::Press(key));
                    }
                    EventType::KeyRelease(key) => {
                        let _ = key_tx.send(KeyEvent::Release(key));
                    }
                    _ => {}
                }
            }) {
                error!("Input listener stopped: {:?}", error);
            }
        });

        Self {
            state,
            key_events: Mutex::new(key_rx),
        }
    }

    fn send(event: &EventType) -> Result<(), AutomationError> {
        rdev::simulate(event).map_err(|e| {
            AutomationError::PlatformError(format!("Failed to simulate {event:?}: {e:?}"))
        })?;
        thread::sleep(EVENT_DELAY);
        Ok(())
    }

    fn tap(key: rdev::Key) -> Result<(), AutomationError> {
        Self::send(&EventType::KeyPress(key))?;
        Self::send(&EventType::KeyRelease(key))
    }

    fn listener_state<T>(&self, read: impl FnOnce(&ListenerState) -> T) -> Result<T, AutomationError> {
        self.state
            .lock()
            .map(|state| read(&state))
            .map_err(|_| AutomationError::Internal("input listener state poisoned".to_string()))
    }
}

impl Default for RdevInput {
    fn default() -> Self {
        Self::new()
    }
}

impl InputDriver for RdevInput {
    fn pointer_position(&self) -> Result<Point, AutomationError> {
        #[cfg(target_os = "windows")]
        {
            use windows::Win32::Foundation::POINT;
            use windows::Win32::UI::WindowsAndMessaging::GetCursorPos;

            let mut point = POINT { x: 0, y: 0 };
            unsafe { GetCursorPos(&mut point) }.map_err(|e| {
                AutomationError::PlatformError(format!("Failed to read cursor position: {e}"))
            })?;
            Ok(Point::new(point.x, point.y))
        }
        #[cfg(not(target_os = "windows"))]
        {
            self.listener_state(|state| state.pointer)?.ok_or_else(|| {
                AutomationError::ElementNotFound(
                    "pointer position unknown until the pointer moves".to_string(),
                )
            })
        }
    }

    fn move_to(&self, point: Point) -> Result<(), AutomationError> {
        Self::send(&EventType::MouseMove {
            x: point.x as f64,
            y: point.y as f64,
        })
    }

    fn click(&self, point: Option<Point>, button: MouseButton) -> Result<(), AutomationError> {
        if let Some(point) = point {
            self.move_to(point)?;
        }
        let button = match button {
            MouseButton::Left => Button::Left,
            MouseButton::Right => Button::Right,
        };
        Self::send(&EventType::ButtonPress(button))?;
        Self::send(&EventType::ButtonRelease(button))
    }

    fn press_key(&self, key: Key, presses: u32) -> Result<(), AutomationError> {
        let key = to_rdev_key(key)?;
        for _ in 0..presses {
            Self::tap(key)?;
        }
        Ok(())
    }

    fn press_hotkeys(&self, keys: &[Key]) -> Result<(), AutomationError> {
        let keys = keys
            .iter()
            .map(|key| to_rdev_key(*key))
            .collect::<Result<Vec<_>, _>>()?;
        for key in &keys {
            Self::send(&EventType::KeyPress(*key))?;
        }
        for key in keys.iter().rev() {
            Self::send(&EventType::KeyRelease(*key))?;
        }
        Ok(())
    }

    fn type_text(&self, text: &str) -> Result<(), AutomationError> {
        for c in text.chars() {
            if c.is_ascii_uppercase() {
                let key = to_rdev_key(Key::Char(c.to_ascii_lowercase()))?;
                Self::send(&EventType::KeyPress(rdev::Key::ShiftLeft))?;
                Self::tap(key)?;
                Self::send(&EventType::KeyRelease(rdev::Key::ShiftLeft))?;
            } else if c == ' ' {
                Self::tap(rdev::Key::Space)?;
            } else {
                Self::tap(to_rdev_key(Key::Char(c))?)?;
            }
        }
        Ok(())
    }

    fn beep(&self) -> Result<(), AutomationError> {
        #[cfg(target_os = "windows")]
        {
            use windows::Win32::UI::WindowsAndMessaging::{MessageBeep, MB_OK};
            unsafe { MessageBeep(MB_OK) }
                .map_err(|e| AutomationError::PlatformError(format!("Failed to beep: {e}")))
        }
        #[cfg(not(target_os = "windows"))]
        {
            let mut stdout = std::io::stdout();
            stdout.write_all(b"\x07")?;
            stdout.flush()?;
            Ok(())
        }
    }

    fn button_down(&self, button: MouseButton) -> Result<bool, AutomationError> {
        #[cfg(target_os = "windows")]
        {
            use windows::Win32::UI::Input::KeyboardAndMouse::{
                GetAsyncKeyState, VK_LBUTTON, VK_RBUTTON,
            };
            let vkey = match button {
                MouseButton::Left => VK_LBUTTON,
                MouseButton::Right => VK_RBUTTON,
            };
            Ok(unsafe { GetAsyncKeyState(vkey.0 as i32) } < 0)
        }
        #[cfg(not(target_os = "windows"))]
        {
            self.listener_state(|state| match button {
                MouseButton::Left => state.left_down,
                MouseButton::Right => state.right_down,
            })
        }
    }

    fn buttons_swapped(&self) -> bool {
        #[cfg(target_os = "windows")]
        {
            use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_SWAPBUTTON};
            unsafe { GetSystemMetrics(SM_SWAPBUTTON) != 0 }
        }
        #[cfg(not(target_os = "windows"))]
        {
            false
        }
    }

    fn wait_for_key(&self, key: Key) -> Result<KeyWait, AutomationError> {
        let target = to_rdev_key(key)?;
        let events = self
            .key_events
            .lock()
            .map_err(|_| AutomationError::Internal("key event queue poisoned".to_string()))?;

        // Only keys touched after the wait started count.
        while events.try_recv().is_ok() {}

        debug!("Waiting for {} to be released", key);
        loop {
            let event = events.recv().map_err(|_| {
                AutomationError::PlatformError("input listener is not running".to_string())
            })?;
            match event {
                KeyEvent::Press(rdev::Key::Escape) => return Ok(KeyWait::Escaped),
                KeyEvent::Release(released) if released == target => {
                    return Ok(KeyWait::Released)
                }
                _ => {}
            }
        }
    }
}

fn to_rdev_key(key: Key) -> Result<rdev::Key, AutomationError> {
    use rdev::Key as R;

    let mapped = match key {
        Key::Tab => R::Tab,
        Key::Enter => R::Return,
        Key::Escape => R::Escape,
        Key::Space => R::Space,
        Key::Backspace => R::Backspace,
        Key::Delete => R::Delete,
        Key::Insert => R::Insert,
        Key::Home => R::Home,
        Key::End => R::End,
        Key::PageUp => R::PageUp,
        Key::PageDown => R::PageDown,
        Key::Up => R::UpArrow,
        Key::Down => R::DownArrow,
        Key::Left => R::LeftArrow,
        Key::Right => R::RightArrow,
        Key::Ctrl => R::ControlLeft,
        Key::Alt => R::Alt,
        Key::Shift => R::ShiftLeft,
        Key::Meta => R::MetaLeft,
        Key::F(n) => match n {
            1 => R::F1,
            2 => R::F2,
            3 => R::F3,
            4 => R::F4,
            5 => R::F5,
            6 => R::F6,
            7 => R::F7,
            8 => R::F8,
            9 => R::F9,
            10 => R::F10,
            11 => R::F11,
            12 => R::F12,
            _ => return Err(unsupported(key)),
        },
        Key::Char(c) => match c.to_ascii_lowercase() {
            'a' => R::KeyA,
            'b' => R::KeyB,
            'c' => R::KeyC,
            'd' => R::KeyD,
            'e' => R::KeyE,
            'f' => R::KeyF,
            'g' => R::KeyG,
            'h' => R::KeyH,
            'i' => R::KeyI,
            'j' => R::KeyJ,
            'k' => R::KeyK,
            'l' => R::KeyL,
            'm' => R::KeyM,
            'n' => R::KeyN,
            'o' => R::KeyO,
            'p' => R::KeyP,
            'q' => R::KeyQ,
            'r' => R::KeyR,
            's' => R::KeyS,
            't' => R::KeyT,
            'u' => R::KeyU,
            'v' => R::KeyV,
            'w' => R::KeyW,
            'x' => R::KeyX,
            'y' => R::KeyY,
            'z' => R::KeyZ,
            '0' => R::Num0,
            '1' => R::Num1,
            '2' => R::Num2,
            '3' => R::Num3,
            '4' => R::Num4,
            '5' => R::Num5,
            '6' => R::Num6,
            '7' => R::Num7,
            '8' => R::Num8,
            '9' => R::Num9,
            '-' => R::Minus,
            '=' => R::Equal,
            ',' => R::Comma,
            '.' => R::Dot,
            '/' => R::Slash,
            ';' => R::SemiColon,
            '\'' => R::Quote,
            '[' => R::LeftBracket,
            ']' => R::RightBracket,
            '\\' => R::BackSlash,
            '`' => R::BackQuote,
            _ => return Err(unsupported(key)),
        },
    };
    Ok(mapped)
}

fn unsupported(key: Key) -> AutomationError {
    AutomationError::InvalidArgument(format!("key '{key}' cannot be simulated"))
}
