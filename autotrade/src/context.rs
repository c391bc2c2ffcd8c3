use crate::errors::AutomationError;
use crate::platforms::InputDriver;
use crate::types::Point;
use tracing::debug;

/// State shared by the commands of one action run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutomationContext {
    /// Pointer position when the action started
    pub previous_position: Option<Point>,
    /// Symbol detected by `get_symbol`
    pub symbol: Option<String>,
    /// Order size computed by `calculate_share_size`
    pub share_size: Option<u64>,
    pub cash_balance: Option<f64>,
    pub buttons_swapped: bool,
    /// How many fields focus has moved through with tab
    pub tab_presses: u32,
}

impl AutomationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh context remembering the current pointer position and button layout.
    /// A position the driver cannot report yet is left unset; only `back_to`
    /// needs it.
    pub fn capture(input: &dyn InputDriver) -> Result<Self, AutomationError> {
        let previous_position = match input.pointer_position() {
            Ok(position) => Some(position),
            Err(e) if e.is_transient() => {
                debug!("Starting without a pointer position: {}", e);
                None
            }
            Err(e) => return Err(e),
        };
        Ok(Self {
            previous_position,
            buttons_swapped: input.buttons_swapped(),
            ..Self::default()
        })
    }
}
