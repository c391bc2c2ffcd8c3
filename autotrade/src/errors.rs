use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Platform-specific error: {0}")]
    PlatformError(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse: {0}")]
    Parse(String),

    #[error("Trading of {0} is suspended")]
    MarginSuspended(String),

    #[error("Computed share size for {0} is zero")]
    ZeroShareSize(String),

    #[error("Undetermined mnemonics: {0}")]
    UndeterminedMnemonics(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AutomationError {
    /// Conditions expected while racing a human-paced screen; callers retry these.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AutomationError::ElementNotFound(_)
                | AutomationError::Parse(_)
                | AutomationError::PlatformError(_)
        )
    }
}
