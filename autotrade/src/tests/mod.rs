mod editor_tests;

use crate::errors::AutomationError;
use crate::platforms::{InputDriver, KeyWait, ScreenCapture, Speaker, TextRecognizer, WindowManager};
use crate::types::{Key, MouseButton, Point, Rect, WindowInfo};
use crate::Desktop;
use image::{imageops, DynamicImage, Rgba, RgbaImage};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()))
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    MoveTo(Point),
    Click(Option<Point>, MouseButton),
    PressKey(Key, u32),
    Hotkeys(Vec<Key>),
    Type(String),
    Beep,
    WaitedFor(Key),
}

/// Records every simulated input and replays scripted input state
#[derive(Default)]
pub struct RecordingInput {
    pub events: RefCell<Vec<(InputEvent, Instant)>>,
    pub pointer: Cell<Point>,
    /// Pointer position cannot be read, as before the first mouse event
    pub pointer_unknown: bool,
    pub swapped: bool,
    pub key_waits: RefCell<VecDeque<KeyWait>>,
    /// Successive readings of the primary button; up once exhausted
    pub button_states: RefCell<VecDeque<bool>>,
}

impl RecordingInput {
    fn record(&self, event: InputEvent) -> Result<(), AutomationError> {
        self.events.borrow_mut().push((event, Instant::now()));
        Ok(())
    }

    pub fn events(&self) -> Vec<InputEvent> {
        self.events
            .borrow()
            .iter()
            .map(|(event, _)| event.clone())
            .collect()
    }
}

impl InputDriver for RecordingInput {
    fn pointer_position(&self) -> Result<Point, AutomationError> {
        if self.pointer_unknown {
            return Err(AutomationError::ElementNotFound(
                "pointer has not moved yet".to_string(),
            ));
        }
        Ok(self.pointer.get())
    }

    fn move_to(&self, point: Point) -> Result<(), AutomationError> {
        self.pointer.set(point);
        self.record(InputEvent::MoveTo(point))
    }

    fn click(&self, point: Option<Point>, button: MouseButton) -> Result<(), AutomationError> {
        self.record(InputEvent::Click(point, button))
    }

    fn press_key(&self, key: Key, presses: u32) -> Result<(), AutomationError> {
        self.record(InputEvent::PressKey(key, presses))
    }

    fn press_hotkeys(&self, keys: &[Key]) -> Result<(), AutomationError> {
        self.record(InputEvent::Hotkeys(keys.to_vec()))
    }

    fn type_text(&self, text: &str) -> Result<(), AutomationError> {
        self.record(InputEvent::Type(text.to_string()))
    }

    fn beep(&self) -> Result<(), AutomationError> {
        self.record(InputEvent::Beep)
    }

    fn button_down(&self, _button: MouseButton) -> Result<bool, AutomationError> {
        Ok(self.button_states.borrow_mut().pop_front().unwrap_or(false))
    }

    fn buttons_swapped(&self) -> bool {
        self.swapped
    }

    fn wait_for_key(&self, key: Key) -> Result<KeyWait, AutomationError> {
        self.record(InputEvent::WaitedFor(key))?;
        Ok(self
            .key_waits
            .borrow_mut()
            .pop_front()
            .unwrap_or(KeyWait::Released))
    }
}

#[derive(Default)]
pub struct FakeWindows {
    pub windows: RefCell<Vec<WindowInfo>>,
    pub under_pointer: Option<WindowInfo>,
    pub foreground_parent: Option<WindowInfo>,
    /// `show:`, `hide:` and `front:` followed by the window title
    pub log: RefCell<Vec<String>>,
}

impl FakeWindows {
    pub fn with_titles(titles: &[&str]) -> Self {
        Self {
            windows: RefCell::new(
                titles
                    .iter()
                    .enumerate()
                    .map(|(i, title)| window(i as u64 + 1, title, true))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    fn set_visible(&self, target: &WindowInfo, visible: bool) {
        for window in self.windows.borrow_mut().iter_mut() {
            if window.handle == target.handle {
                window.visible = visible;
            }
        }
    }
}

pub fn window(handle: u64, title: &str, visible: bool) -> WindowInfo {
    WindowInfo {
        handle,
        title: title.to_string(),
        visible,
    }
}

impl WindowManager for FakeWindows {
    fn windows(&self) -> Result<Vec<WindowInfo>, AutomationError> {
        Ok(self.windows.borrow().clone())
    }

    fn show(&self, window: &WindowInfo) -> Result<(), AutomationError> {
        self.set_visible(window, true);
        self.log.borrow_mut().push(format!("show:{}", window.title));
        Ok(())
    }

    fn hide(&self, window: &WindowInfo) -> Result<(), AutomationError> {
        self.set_visible(window, false);
        self.log.borrow_mut().push(format!("hide:{}", window.title));
        Ok(())
    }

    fn set_foreground(&self, window: &WindowInfo) -> Result<(), AutomationError> {
        self.log.borrow_mut().push(format!("front:{}", window.title));
        Ok(())
    }

    fn foreground_parent(&self) -> Result<Option<WindowInfo>, AutomationError> {
        Ok(self.foreground_parent.clone())
    }

    fn window_at(&self, _point: Point) -> Result<Option<WindowInfo>, AutomationError> {
        Ok(self.under_pointer.clone())
    }
}

/// A white screen, or a fixed picture of the whole desktop
#[derive(Default)]
pub struct FakeScreen {
    pub desktop: Option<RgbaImage>,
}

impl ScreenCapture for FakeScreen {
    fn capture_region(&self, rect: &Rect) -> Result<RgbaImage, AutomationError> {
        match &self.desktop {
            Some(image) => Ok(imageops::crop_imm(
                image,
                rect.x as u32,
                rect.y as u32,
                rect.width,
                rect.height,
            )
            .to_image()),
            None => Ok(RgbaImage::from_pixel(
                rect.width,
                rect.height,
                Rgba([255, 255, 255, 255]),
            )),
        }
    }
}

/// Returns scripted texts in order, then nothing legible
#[derive(Default)]
pub struct ScriptedRecognizer {
    pub texts: RefCell<VecDeque<String>>,
}

impl ScriptedRecognizer {
    pub fn push(&self, text: &str) {
        self.texts.borrow_mut().push_back(text.to_string());
    }
}

impl TextRecognizer for ScriptedRecognizer {
    fn recognize(&self, _image: &DynamicImage) -> Result<String, AutomationError> {
        Ok(self.texts.borrow_mut().pop_front().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct RecordingSpeaker {
    pub spoken: RefCell<Vec<String>>,
}

impl Speaker for RecordingSpeaker {
    fn speak(&self, text: &str) -> Result<(), AutomationError> {
        self.spoken.borrow_mut().push(text.to_string());
        Ok(())
    }
}

/// Fake collaborators plus a desktop wired to them
pub struct Harness {
    pub input: Arc<RecordingInput>,
    pub windows: Arc<FakeWindows>,
    pub screen: Arc<FakeScreen>,
    pub recognizer: Arc<ScriptedRecognizer>,
    pub speaker: Arc<RecordingSpeaker>,
    pub desktop: Desktop,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(RecordingInput::default(), FakeWindows::default(), FakeScreen::default())
    }

    pub fn with(input: RecordingInput, windows: FakeWindows, screen: FakeScreen) -> Self {
        let input = Arc::new(input);
        let windows = Arc::new(windows);
        let screen = Arc::new(screen);
        let recognizer = Arc::new(ScriptedRecognizer::default());
        let speaker = Arc::new(RecordingSpeaker::default());
        let desktop = Desktop::new(
            screen.clone(),
            recognizer.clone(),
            input.clone(),
            windows.clone(),
            speaker.clone(),
        );
        Self {
            input,
            windows,
            screen,
            recognizer,
            speaker,
            desktop,
        }
    }
}
