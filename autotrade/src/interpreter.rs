//! Runs action scripts against the desktop.
//!
//! Commands run strictly in order on the calling thread. A fatal error ends
//! the action where it happened; nothing already done is undone. An operator
//! abort (escape during a key wait, no symbol window) ends it early without
//! an error.

use crate::command::{Action, Command, RegionRef, TitlePattern};
use crate::config::{ConfigStore, OcrRegion, Settings, VARIABLES_SECTION};
use crate::context::AutomationContext;
use crate::errors::AutomationError;
use crate::ocr::{OcrExtractor, ValueKind};
use crate::platforms::KeyWait;
use crate::price_limit::upper_price_limit;
use crate::sizing::{self, Position};
use crate::template::Template;
use crate::types::{Key, MouseButton, Point, Rect, WindowInfo};
use crate::Desktop;
use chrono::{Local, NaiveDate};
use std::path::Path;
use std::thread;
use tracing::{debug, info, instrument, warn};

const CURRENT_DATE: &str = "current_date";
const CURRENT_NUMBER_OF_TRADES: &str = "current_number_of_trades";
const CASH_BALANCE_REGION: &str = "cash_balance_region";
const PRICE_LIMIT_REGION: &str = "price_limit_region";

/// How an action run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    Aborted { command_index: usize, reason: String },
}

enum Flow {
    Continue,
    Abort(String),
}

pub struct Interpreter<'a> {
    desktop: &'a Desktop,
    store: &'a mut ConfigStore,
    settings: &'a Settings,
    today: NaiveDate,
}

impl<'a> Interpreter<'a> {
    pub fn new(desktop: &'a Desktop, store: &'a mut ConfigStore, settings: &'a Settings) -> Self {
        Self {
            desktop,
            store,
            settings,
            today: Local::now().date_naive(),
        }
    }

    /// Overrides the date `count_trades` counts against.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    #[instrument(skip(self, action, context), fields(action = %action.name))]
    pub fn execute(
        &mut self,
        action: &Action,
        context: &mut AutomationContext,
    ) -> Result<ActionOutcome, AutomationError> {
        for (index, command) in action.commands.iter().enumerate() {
            debug!(index, command = command.name(), "Executing");
            if let Flow::Abort(reason) = self.dispatch(command, context)? {
                warn!("Action '{}' aborted at command {}: {}", action.name, index, reason);
                return Ok(ActionOutcome::Aborted {
                    command_index: index,
                    reason,
                });
            }
        }
        info!("Action '{}' completed", action.name);
        Ok(ActionOutcome::Completed)
    }

    fn dispatch(
        &mut self,
        command: &Command,
        context: &mut AutomationContext,
    ) -> Result<Flow, AutomationError> {
        let desktop = self.desktop;
        let input = desktop.input.as_ref();
        match command {
            Command::BackTo => {
                let position = context.previous_position.ok_or_else(|| {
                    AutomationError::InvalidArgument("no pointer position to return to".into())
                })?;
                input.move_to(position)?;
            }
            Command::Beep => input.beep()?,
            Command::Click(point) => {
                input.click(*point, MouseButton::Left.honoring_swap(context.buttons_swapped))?;
            }
            Command::MoveTo(point) => input.move_to(*point)?,
            Command::PressHotkeys(keys) => input.press_hotkeys(keys)?,
            Command::PressKey { key, presses } => {
                input.press_key(*key, *presses)?;
                if *key == Key::Tab {
                    context.tab_presses += presses;
                }
            }
            Command::ClickWidget {
                image,
                region,
                button,
            } => self.click_widget(image, region, *button, context)?,
            Command::CalculateShareSize(position) => {
                self.calculate_share_size(*position, context)?;
            }
            Command::CountTrades => self.count_trades()?,
            Command::GetSymbol(pattern) => {
                let windows = self.desktop.windows.windows()?;
                match windows.iter().find_map(|window| pattern.capture(&window.title)) {
                    Some(symbol) => {
                        info!("Detected symbol {}", symbol);
                        context.symbol = Some(symbol);
                    }
                    None => {
                        return Ok(Flow::Abort(format!(
                            "no window title matches '{}'",
                            pattern.as_str()
                        )))
                    }
                }
            }
            Command::HideWindow(pattern) => {
                for window in self.matching_windows(pattern)? {
                    self.desktop.windows.hide(&window)?;
                }
            }
            Command::ShowWindow(pattern) => {
                for window in self.matching_windows(pattern)? {
                    self.desktop.windows.show(&window)?;
                    self.desktop.windows.set_foreground(&window)?;
                }
            }
            Command::ShowHideWindow(pattern) => self.toggle_windows(pattern)?,
            Command::HideParentWindow => match self.desktop.windows.foreground_parent()? {
                Some(parent) => self.desktop.windows.hide(&parent)?,
                None => debug!("Foreground window has no parent"),
            },
            Command::ShowHideWindowOnClick(pattern) => {
                self.show_hide_window_on_click(pattern, context)?;
            }
            Command::SpeakConfig { section, option } => {
                let text = self.store.require(section, option)?;
                self.desktop.speaker.speak(text)?;
            }
            Command::WaitForKey(key) => {
                if input.wait_for_key(*key)? == KeyWait::Escaped {
                    return Ok(Flow::Abort(format!("escape pressed while waiting for {key}")));
                }
            }
            Command::WaitForPeriod(period) => thread::sleep(*period),
            Command::WaitForPrices { region, kind } => {
                let region = match region {
                    RegionRef::Named(name) => OcrRegion::from_store(self.store, name)?,
                    RegionRef::Inline(region) => *region,
                };
                self.extractor()
                    .extract(&region.rect, *kind, Some(region.index))?;
            }
            Command::WaitForWindow(pattern) => {
                let windows = self.desktop.windows.as_ref();
                self.settings.retry.retry("matching window", || {
                    let found = windows
                        .windows()?
                        .iter()
                        .any(|window| pattern.matches(&window.title));
                    Ok(found.then_some(()))
                })?;
            }
            Command::WriteAltSymbol { first, second } => {
                let symbol = context.symbol.as_deref().ok_or_else(|| {
                    AutomationError::InvalidArgument("write_alt_symbol needs a symbol".into())
                })?;
                let alternative = if symbol == first { second } else { first };
                input.type_text(alternative)?;
            }
            Command::WriteShareSize => {
                let size = context.share_size.ok_or_else(|| {
                    AutomationError::InvalidArgument(
                        "write_share_size needs a computed share size".into(),
                    )
                })?;
                input.type_text(&size.to_string())?;
            }
        }
        Ok(Flow::Continue)
    }

    fn extractor(&self) -> OcrExtractor<'_> {
        OcrExtractor::new(
            self.desktop.screen.as_ref(),
            self.desktop.recognizer.as_ref(),
            &self.settings.ocr,
            self.settings.retry,
        )
    }

    fn matching_windows(&self, pattern: &TitlePattern) -> Result<Vec<WindowInfo>, AutomationError> {
        let windows: Vec<WindowInfo> = self
            .desktop
            .windows
            .windows()?
            .into_iter()
            .filter(|window| pattern.matches(&window.title))
            .collect();
        if windows.is_empty() {
            debug!("No window matches '{}'", pattern.as_str());
        }
        Ok(windows)
    }

    fn toggle_windows(&self, pattern: &TitlePattern) -> Result<(), AutomationError> {
        for window in self.matching_windows(pattern)? {
            if window.visible {
                self.desktop.windows.hide(&window)?;
            } else {
                self.desktop.windows.show(&window)?;
                self.desktop.windows.set_foreground(&window)?;
            }
        }
        Ok(())
    }

    /// Toggles `pattern` windows when the action was started over one of the
    /// clickable windows.
    fn show_hide_window_on_click(
        &self,
        pattern: &TitlePattern,
        context: &AutomationContext,
    ) -> Result<(), AutomationError> {
        let Some(position) = context.previous_position else {
            return Ok(());
        };
        let Some(clicked) = self.desktop.windows.window_at(position)? else {
            return Ok(());
        };

        for title in &self.settings.clickable_windows {
            if TitlePattern::new(title)?.matches(&clicked.title) {
                return self.toggle_windows(pattern);
            }
        }
        debug!("'{}' is not a clickable window", clicked.title);
        Ok(())
    }

    fn click_widget(
        &self,
        image: &Path,
        region: &Rect,
        button: MouseButton,
        context: &AutomationContext,
    ) -> Result<(), AutomationError> {
        let template = Template::load(&self.store.resolve(&image.to_string_lossy()))?;
        let screen = self.desktop.screen.as_ref();
        let found = self.settings.retry.retry("widget on screen", || {
            let captured = screen.capture_region(region)?;
            Ok(template.find_in(&captured))
        })?;

        let center = found.center();
        let target = Point::new(region.x + center.x, region.y + center.y);
        debug!("Widget {:?} found at {}", image, target);
        self.desktop
            .input
            .click(Some(target), button.honoring_swap(context.buttons_swapped))
    }

    fn calculate_share_size(
        &self,
        position: Position,
        context: &mut AutomationContext,
    ) -> Result<(), AutomationError> {
        let settings = self.settings;
        let symbol = context.symbol.clone().ok_or_else(|| {
            AutomationError::InvalidArgument("calculate_share_size needs a symbol".into())
        })?;

        let cash_balance = if settings.fixed_cash_balance > 0.0 {
            settings.fixed_cash_balance
        } else {
            let region = OcrRegion::from_store(self.store, CASH_BALANCE_REGION)?;
            self.extractor()
                .extract_number(&region, ValueKind::Integers)?
        };
        context.cash_balance = Some(cash_balance);

        let margin_ratio = sizing::margin_ratio(
            &settings.margin_ratios_path,
            &symbol,
            settings.customer_margin_ratio,
        )?;

        let price_limit = match sizing::closing_price(&settings.closing_prices_directory, &symbol)? {
            Some(closing_price) => upper_price_limit(closing_price),
            None => {
                debug!("No closing price for {}, reading the price limit", symbol);
                let region = OcrRegion::from_store(self.store, PRICE_LIMIT_REGION)?;
                self.extractor()
                    .extract_number(&region, ValueKind::DecimalNumbers)?
            }
        };

        let size = sizing::share_size(
            cash_balance,
            settings.utilization_ratio,
            margin_ratio,
            price_limit,
            settings.trading_unit,
            position,
        );
        if size == 0 {
            return Err(AutomationError::ZeroShareSize(symbol));
        }
        info!(
            cash_balance,
            margin_ratio, price_limit, "Share size of {} is {}", symbol, size
        );
        context.share_size = Some(size);
        Ok(())
    }

    fn count_trades(&mut self) -> Result<(), AutomationError> {
        let today = self.today.format("%Y-%m-%d").to_string();
        let count = if self.store.get(VARIABLES_SECTION, CURRENT_DATE) == Some(today.as_str()) {
            self.store
                .parse_or(VARIABLES_SECTION, CURRENT_NUMBER_OF_TRADES, 0u32)?
                + 1
        } else {
            self.store.set(VARIABLES_SECTION, CURRENT_DATE, today);
            1
        };
        self.store
            .set(VARIABLES_SECTION, CURRENT_NUMBER_OF_TRADES, count.to_string());
        self.store.save()?;
        info!("Trades today: {}", count);
        Ok(())
    }
}
