//! Text-to-speech through the operating system's command-line voice

use super::Speaker;
use crate::errors::AutomationError;
use std::process::{Command, Stdio};
use tracing::debug;

/// Speaks by spawning the platform's speech command and waiting for it.
#[derive(Debug, Default, Clone)]
pub struct CommandSpeaker;

impl CommandSpeaker {
    pub fn new() -> Self {
        Self
    }

    fn command(text: &str) -> Command {
        #[cfg(target_os = "windows")]
        {
            let escaped = text.replace('\'', "''");
            let mut command = Command::new("powershell");
            command.args([
                "-NoProfile",
                "-Command",
                &format!(
                    "Add-Type -AssemblyName System.Speech; \
                     (New-Object System.Speech.Synthesis.SpeechSynthesizer).Speak('{escaped}')"
                ),
            ]);
            command
        }
        #[cfg(target_os = "macos")]
        {
            let mut command = Command::new("say");
            command.arg(text);
            command
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            let mut command = Command::new("espeak");
            command.arg(text);
            command
        }
    }
}

impl Speaker for CommandSpeaker {
    fn speak(&self, text: &str) -> Result<(), AutomationError> {
        debug!("Speaking: {}", text);
        let status = Self::command(text)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| AutomationError::PlatformError(format!("Failed to start speech: {e}")))?;
        if status.success() {
            Ok(())
        } else {
            Err(AutomationError::PlatformError(format!(
                "Speech command exited with {status}"
            )))
        }
    }
}
