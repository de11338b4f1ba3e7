//! Leveled console logger.

use chrono::{DateTime, Utc};
use colored::{Color, Colorize};
use std::fmt;
use std::io::{self, Write};

use super::writer::rainbow;

/// Severity of a log line.
///
/// A line is shown when the logger's verbosity is at least the level's
/// threshold: critical 1, warning 2, info and success 3, debug 4. `Always`
/// lines are shown regardless of verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Shown at any verbosity
    Always,
    /// Failures
    Critical,
    /// Something looks wrong but work continues
    Warning,
    /// Progress
    Info,
    /// Completed work
    Success,
    /// Internal detail
    Debug,
}

impl Level {
    /// Minimum verbosity at which this level is printed
    pub fn threshold(&self) -> i64 {
        match self {
            Level::Always => i64::MIN,
            Level::Critical => 1,
            Level::Warning => 2,
            Level::Info | Level::Success => 3,
            Level::Debug => 4,
        }
    }

    /// Glyph printed in the line prefix
    pub fn label(&self) -> &'static str {
        match self {
            Level::Always => "✿",
            Level::Critical => "✖",
            Level::Warning => "!",
            Level::Info | Level::Success => "✔",
            Level::Debug => "▶",
        }
    }

    fn color(&self) -> Color {
        match self {
            Level::Always => Color::White,
            Level::Critical => Color::Red,
            Level::Warning => Color::Yellow,
            Level::Info => Color::Cyan,
            Level::Success => Color::Green,
            Level::Debug => Color::Magenta,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Logger for command output on the error stream.
///
/// The logger only formats; the caller hands it the stream to write to, so a
/// command context can route log lines wherever its streams point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logger {
    level: i64,
    color: bool,
    fabulous: bool,
    truecolor: bool,
}

impl Logger {
    /// Initialize logger.
    ///
    /// # Arguments
    /// * `level` - Verbosity; lines above it are dropped.
    /// * `color` - Color each line by severity.
    pub fn new(level: i64, color: bool) -> Self {
        Self {
            level,
            color,
            fabulous: false,
            truecolor: false,
        }
    }

    /// Render lines as a rainbow instead of by severity.
    pub fn with_fabulous(mut self, fabulous: bool, truecolor: bool) -> Self {
        self.fabulous = fabulous || truecolor;
        self.truecolor = truecolor;
        self
    }

    /// Verbosity
    pub fn level(&self) -> i64 {
        self.level
    }

    /// Whether severity coloring is on
    pub fn color(&self) -> bool {
        self.color
    }

    /// Whether lines are rendered as a rainbow
    pub fn fabulous(&self) -> bool {
        self.fabulous
    }

    /// Whether a line at `level` would be written
    pub fn enabled(&self, level: Level) -> bool {
        self.level >= level.threshold()
    }

    /// Format a line stamped with `now`, without coloring.
    pub fn format_line(&self, level: Level, message: &str, now: DateTime<Utc>) -> String {
        format!(
            "{} [{}]  {}",
            now.format("%Y-%m-%dT%H:%M:%S%:z"),
            level.label(),
            message
        )
    }

    /// Render a line for `level`, or `None` when the level is filtered out.
    pub fn render(&self, level: Level, message: &str) -> Option<String> {
        if !self.enabled(level) {
            return None;
        }

        let line = self.format_line(level, message, Utc::now());
        let line = if self.fabulous {
            rainbow(&line, 0, self.truecolor)
        } else if self.color {
            line.color(level.color()).to_string()
        } else {
            line
        };
        Some(line)
    }

    /// Write a line to `out` if `level` is enabled.
    pub fn log(&self, out: &mut dyn Write, level: Level, message: &str) -> io::Result<()> {
        match self.render(level, message) {
            Some(line) => writeln!(out, "{}", line),
            None => Ok(()),
        }
    }

    /// Log critical message.
    pub fn critical(&self, out: &mut dyn Write, message: &str) -> io::Result<()> {
        self.log(out, Level::Critical, message)
    }

    /// Log warning message.
    pub fn warning(&self, out: &mut dyn Write, message: &str) -> io::Result<()> {
        self.log(out, Level::Warning, message)
    }

    /// Log info message.
    pub fn info(&self, out: &mut dyn Write, message: &str) -> io::Result<()> {
        self.log(out, Level::Info, message)
    }

    /// Log success message.
    pub fn success(&self, out: &mut dyn Write, message: &str) -> io::Result<()> {
        self.log(out, Level::Success, message)
    }

    /// Log debug message.
    pub fn debug(&self, out: &mut dyn Write, message: &str) -> io::Result<()> {
        self.log(out, Level::Debug, message)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(3, true)
    }
}
