//! Scripts that run an action when the operator logs in

use anyhow::{bail, Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

#[cfg(target_os = "windows")]
const EXTENSION: &str = "cmd";
#[cfg(not(target_os = "windows"))]
const EXTENSION: &str = "sh";

/// What the script launches
pub struct StartupTarget<'a> {
    pub executable: &'a Path,
    pub config: &'a Path,
    pub action: &'a str,
    pub wait_for_process: Option<&'a str>,
}

impl StartupTarget<'_> {
    fn command_line(&self) -> String {
        let mut line = format!(
            "\"{}\" --config \"{}\" execute \"{}\"",
            self.executable.display(),
            self.config.display(),
            self.action
        );
        if let Some(process) = self.wait_for_process {
            line.push_str(&format!(" --wait-for-process \"{process}\""));
        }
        line
    }

    pub fn script(&self) -> String {
        if EXTENSION == "cmd" {
            format!("@echo off\r\n{}\r\n", self.command_line())
        } else {
            format!("#!/bin/sh\nexec {}\n", self.command_line())
        }
    }
}

/// The login folder on Windows, the configuration directory elsewhere.
pub fn default_script_path(action: &str) -> Result<PathBuf> {
    let base = dirs::config_dir().context("No configuration directory for this user")?;
    let file_name = format!("autotrade-{action}.{EXTENSION}");
    if cfg!(target_os = "windows") {
        Ok(base
            .join("Microsoft")
            .join("Windows")
            .join("Start Menu")
            .join("Programs")
            .join("Startup")
            .join(file_name))
    } else {
        Ok(base.join("autotrade").join("startup").join(file_name))
    }
}

/// Writes the script to `path`. An existing file is never replaced.
pub fn write_startup_script(path: &Path, target: &StartupTarget<'_>) -> Result<()> {
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(target.script().as_bytes())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}
