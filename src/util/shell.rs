//! User-facing output: status lines and download progress.
//!
//! Status lines go to stderr as `{status:>12} {message}`, colored when stderr
//! is a terminal. Diagnostics for the log file go through `tracing` instead.

use std::fmt::Display;
use std::io::{self, IsTerminal};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};

use crate::core::VersionPair;
use crate::ops::DownloadProgress;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// --quiet: errors only, no progress
    Quiet,
    /// Default: status messages + progress bars
    #[default]
    Normal,
    /// -v: status messages, no progress bars
    Verbose,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Detect TTY and use colors if available.
    #[default]
    Auto,
    /// Always use ANSI colors.
    Always,
    /// Never use ANSI colors.
    Never,
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(format!(
                "invalid color choice '{}'; expected 'auto', 'always', or 'never'",
                s
            )),
        }
    }
}

/// Status types for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // Success statuses (green)
    Installed,
    Removed,
    Finished,

    // In-progress statuses (cyan)
    Fetching,
    Downloading,
    Verifying,
    Compiling,

    Info,

    // Warning statuses (yellow)
    Skipped,
    Warning,

    Error,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::Installed => "Installed",
            Status::Removed => "Removed",
            Status::Finished => "Finished",
            Status::Fetching => "Fetching",
            Status::Downloading => "Downloading",
            Status::Verifying => "Verifying",
            Status::Compiling => "Compiling",
            Status::Info => "Info",
            Status::Skipped => "Skipped",
            Status::Warning => "Warning",
            Status::Error => "error",
        }
    }

    fn color_code(&self) -> &'static str {
        match self {
            Status::Installed | Status::Removed | Status::Finished => "\x1b[1;32m",
            Status::Fetching | Status::Downloading | Status::Verifying | Status::Compiling => {
                "\x1b[1;36m"
            }
            Status::Info => "\x1b[1;34m",
            Status::Skipped | Status::Warning => "\x1b[1;33m",
            Status::Error => "\x1b[1;31m",
        }
    }
}

/// Width statuses are right-aligned to.
const STATUS_WIDTH: usize = 12;

/// Central shell for all CLI output.
#[derive(Debug)]
pub struct Shell {
    verbosity: Verbosity,
    use_color: bool,
}

impl Shell {
    pub fn new(verbosity: Verbosity, color: ColorChoice) -> Self {
        let use_color = match color {
            ColorChoice::Auto => io::stderr().is_terminal(),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        };

        Shell {
            verbosity,
            use_color,
        }
    }

    /// Create a shell from CLI flags. Quiet wins over verbose.
    pub fn from_flags(quiet: bool, verbose: bool, color: ColorChoice) -> Self {
        let verbosity = if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        };
        Shell::new(verbosity, color)
    }

    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Print a status message. In quiet mode only errors are printed.
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_quiet() && status != Status::Error {
            return;
        }
        eprintln!("{} {}", self.format_status(status), msg);
    }

    pub fn note(&self, msg: impl Display) {
        self.status(Status::Info, msg);
    }

    pub fn warn(&self, msg: impl Display) {
        self.status(Status::Warning, msg);
    }

    pub fn error(&self, msg: impl Display) {
        self.status(Status::Error, msg);
    }

    fn format_status(&self, status: Status) -> String {
        let text = status.as_str();
        if self.use_color {
            format!(
                "{}{:>width$}\x1b[0m",
                status.color_code(),
                text,
                width = STATUS_WIDTH
            )
        } else {
            format!("{:>width$}", text, width = STATUS_WIDTH)
        }
    }

    /// A download observer that draws a byte progress bar.
    ///
    /// In quiet or verbose mode no bar is drawn; verbose mode prints a status
    /// line per download instead.
    pub fn download_progress(self: &Arc<Self>) -> ShellProgress {
        ShellProgress {
            shell: Arc::clone(self),
            pb: None,
        }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new(Verbosity::Normal, ColorChoice::Auto)
    }
}

/// [`DownloadProgress`] backed by an `indicatif` bar.
pub struct ShellProgress {
    shell: Arc<Shell>,
    pb: Option<ProgressBar>,
}

impl DownloadProgress for ShellProgress {
    fn on_start(&mut self, pair: &VersionPair, total_bytes: Option<u64>) {
        self.shell
            .status(Status::Downloading, format!("zkVyper {}", pair));

        if self.shell.is_quiet() || self.shell.is_verbose() {
            return;
        }

        let pb = match total_bytes {
            Some(total) => {
                let pb = ProgressBar::new(total);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template(
                            "{spinner:.green} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes}",
                        )
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("#>-"),
                );
                pb
            }
            None => ProgressBar::new_spinner(),
        };
        pb.set_message(format!("v{}", pair.compiler));
        self.pb = Some(pb);
    }

    fn on_chunk(&mut self, bytes: u64) {
        if let Some(pb) = &self.pb {
            pb.inc(bytes);
        }
    }

    fn on_finish(&mut self) {
        if let Some(pb) = self.pb.take() {
            pb.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_choice_parse() {
        assert_eq!("auto".parse::<ColorChoice>().unwrap(), ColorChoice::Auto);
        assert_eq!("ALWAYS".parse::<ColorChoice>().unwrap(), ColorChoice::Always);
        assert_eq!("never".parse::<ColorChoice>().unwrap(), ColorChoice::Never);
        assert!("invalid".parse::<ColorChoice>().is_err());
    }

    #[test]
    fn test_status_formatting() {
        let shell = Shell::new(Verbosity::Normal, ColorChoice::Never);

        let formatted = shell.format_status(Status::Installed);
        assert_eq!(formatted.trim(), "Installed");
        assert_eq!(formatted.len(), STATUS_WIDTH);

        let shell = Shell::new(Verbosity::Normal, ColorChoice::Always);
        let colored = shell.format_status(Status::Error);
        assert!(colored.starts_with("\x1b[1;31m"));
        assert!(colored.ends_with("\x1b[0m"));
    }

    #[test]
    fn test_from_flags() {
        assert!(!Shell::from_flags(false, false, ColorChoice::Never).is_quiet());
        assert!(Shell::from_flags(false, true, ColorChoice::Never).is_verbose());

        // Quiet takes precedence
        let shell = Shell::from_flags(true, true, ColorChoice::Never);
        assert!(shell.is_quiet());
        assert!(!shell.is_verbose());
    }

    #[test]
    fn test_quiet_progress_draws_nothing() {
        let shell = Arc::new(Shell::new(Verbosity::Quiet, ColorChoice::Never));
        let mut progress = shell.download_progress();
        progress.on_start(&VersionPair::parse("1.1.1", "0.3.3").unwrap(), Some(10));
        progress.on_chunk(10);
        assert!(progress.pb.is_none());
        progress.on_finish();
    }
}
