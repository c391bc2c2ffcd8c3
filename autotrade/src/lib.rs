//! Desktop trading automation
//!
//! Runs operator-authored action scripts against a trading application:
//! reading values off the screen, driving mouse and keyboard, and deciding
//! when cached market data is stale enough to refetch.

use std::sync::Arc;
use tracing::instrument;

pub mod command;
pub mod config;
pub mod context;
pub mod editor;
pub mod errors;
pub mod fetch;
pub mod freshness;
pub mod interpreter;
pub mod literal;
pub mod market_data;
pub mod ocr;
pub mod platforms;
pub mod price_limit;
pub mod retry;
pub mod sizing;
pub mod template;
#[cfg(test)]
mod tests;
pub mod types;

pub use command::{Action, Command, TitlePattern};
pub use config::{ConfigStore, OcrRegion, Settings};
pub use context::AutomationContext;
pub use editor::{edit_tuple_list, Prompter, StdinPrompter, TupleListEditor};
pub use errors::AutomationError;
pub use fetch::{DataSource, HttpDataSource, Table};
pub use freshness::{CalendarSource, FreshnessOracle, UpdateSchedule};
pub use interpreter::{ActionOutcome, Interpreter};
pub use literal::TupleEntry;
pub use ocr::{OcrExtractor, Recognized, ValueKind};
pub use platforms::{InputDriver, KeyWait, ScreenCapture, Speaker, TextRecognizer, WindowManager};
pub use retry::RetryPolicy;
pub use types::{Key, MouseButton, Point, Rect, WindowInfo};

/// The desktop collaborators an action runs against
#[derive(Clone)]
pub struct Desktop {
    pub screen: Arc<dyn ScreenCapture>,
    pub recognizer: Arc<dyn TextRecognizer>,
    pub input: Arc<dyn InputDriver>,
    pub windows: Arc<dyn WindowManager>,
    pub speaker: Arc<dyn Speaker>,
}

impl Desktop {
    pub fn new(
        screen: Arc<dyn ScreenCapture>,
        recognizer: Arc<dyn TextRecognizer>,
        input: Arc<dyn InputDriver>,
        windows: Arc<dyn WindowManager>,
        speaker: Arc<dyn Speaker>,
    ) -> Self {
        Self {
            screen,
            recognizer,
            input,
            windows,
            speaker,
        }
    }

    /// The real screen, OCR engine, input devices and windows.
    #[cfg(feature = "native")]
    #[instrument]
    pub fn native() -> Result<Self, AutomationError> {
        Ok(Self {
            screen: Arc::new(platforms::capture::XcapScreen::new()),
            recognizer: Arc::new(platforms::recognizer::UniOcrRecognizer::new()?),
            input: Arc::new(platforms::input::RdevInput::new()),
            windows: Arc::from(platforms::create_window_manager()?),
            speaker: Arc::new(platforms::speech::CommandSpeaker::new()),
        })
    }
}

/// Loads `name`, remembers where the pointer is, and runs it.
#[instrument(skip(desktop, store, settings))]
pub fn run_action(
    desktop: &Desktop,
    store: &mut ConfigStore,
    settings: &Settings,
    name: &str,
) -> Result<ActionOutcome, AutomationError> {
    let action = Action::load(store, name)?;
    let mut context = AutomationContext::capture(desktop.input.as_ref())?;
    Interpreter::new(desktop, store, settings).execute(&action, &mut context)
}
