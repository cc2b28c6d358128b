//! External build invocation.
//!
//! Runs the runtime's build entry point (`python script/build.py -c Release`)
//! and waits for it. Any unsuccessful exit aborts the run: every later stage
//! assumes the build output directory is populated.

use crate::config::BuildSettings;
use crate::error::{DistError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use std::fmt;
use std::process::{Command, ExitStatus};
use std::time::Duration;
use wait_timeout::ChildExt;

/// A fully specified external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    /// Program to execute.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// Working directory for the process.
    pub working_dir: Utf8PathBuf,
    /// Kill the process after this long.
    pub timeout: Option<Duration>,
}

impl BuildCommand {
    /// Derive the build command from settings.
    #[must_use]
    pub fn from_settings(settings: &BuildSettings) -> Self {
        Self {
            program: settings.python.clone(),
            args: settings.args(),
            working_dir: settings.working_dir.clone(),
            timeout: settings.timeout,
        }
    }
}

impl fmt::Display for BuildCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Abstraction for running external commands.
#[cfg_attr(test, mockall::automock)]
pub trait CommandExecutor {
    /// Run `command` to completion and return its exit status.
    ///
    /// The child inherits stdout and stderr so build progress stays visible.
    ///
    /// # Errors
    ///
    /// Returns [`DistError::Io`] if the process cannot be spawned and
    /// [`DistError::BuildTimedOut`] if the timeout elapses.
    fn run(&self, command: &BuildCommand) -> Result<ExitStatus>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, command: &BuildCommand) -> Result<ExitStatus> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .current_dir(command.working_dir.as_std_path())
            .spawn()?;

        let Some(timeout) = command.timeout else {
            return Ok(child.wait()?);
        };

        match child.wait_timeout(timeout)? {
            Some(status) => Ok(status),
            None => {
                let _ = child.kill();
                let _ = child.wait();
                Err(DistError::BuildTimedOut {
                    seconds: timeout.as_secs(),
                })
            }
        }
    }
}

/// Runs the external build for a packaging run.
pub struct Builder<'a> {
    executor: &'a dyn CommandExecutor,
}

impl<'a> Builder<'a> {
    /// Create a builder backed by `executor`.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor) -> Self {
        Self { executor }
    }

    /// Run the build unless the settings ask to skip it.
    ///
    /// # Errors
    ///
    /// Returns [`DistError::BuildFailed`] on a non-zero exit status, or any
    /// error raised by the executor.
    pub fn build(&self, settings: &BuildSettings) -> Result<()> {
        if settings.skip {
            info!("Skipping build; packaging existing output");
            return Ok(());
        }

        ensure_script_exists(&settings.script)?;
        let command = BuildCommand::from_settings(settings);
        info!("Building: {command}");

        let status = self.executor.run(&command)?;
        if !status.success() {
            return Err(DistError::BuildFailed {
                status: describe_status(status),
                reason: format!("`{command}` did not complete"),
            });
        }
        Ok(())
    }
}

fn ensure_script_exists(script: &Utf8Path) -> Result<()> {
    if script.is_file() {
        Ok(())
    } else {
        Err(DistError::MissingArtefact {
            path: script.to_owned(),
        })
    }
}

/// Render an exit status for error messages.
#[must_use]
pub fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_owned(),
    }
}
