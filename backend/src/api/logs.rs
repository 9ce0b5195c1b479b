//! Load progress logs, streamed to HTTP clients via Server-Sent Events (SSE).
//!
//! Every load publishes [`LogEntry`] values through the global
//! [`LOG_BROADCASTER`]. The CLI turns stdout echo on; the server leaves it
//! off and lets clients subscribe to `/api/logs`.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

/// Log level for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Per-field processing detail (verbose loads only)
    Debug,
    Info,
    Success,
    Warning,
    Error,
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting level (row details are indented under the row)
    #[serde(default)]
    pub indent: u8,
}

impl LogEntry {
    fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self { level, message: message.into(), indent: 0 }
    }

    pub fn debug(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Debug, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    /// Console rendering.
    pub fn render(&self) -> String {
        let prefix = match self.level {
            LogLevel::Debug => "   ·",
            LogLevel::Info => "   ",
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠️",
            LogLevel::Error => "   ❌",
        };
        format!("{}{} {}", "   ".repeat(self.indent as usize), prefix, self.message)
    }
}

/// Global log broadcaster
pub static LOG_BROADCASTER: Lazy<LogBroadcaster> = Lazy::new(LogBroadcaster::new);

/// Broadcasts log entries to all connected SSE clients
pub struct LogBroadcaster {
    sender: broadcast::Sender<LogEntry>,
    echo: AtomicBool,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self {
            sender,
            echo: AtomicBool::new(false),
        }
    }

    /// Print entries to stdout as well as broadcasting them.
    pub fn set_echo(&self, echo: bool) {
        self.echo.store(echo, Ordering::Relaxed);
    }

    /// Send a log entry to all subscribers
    pub fn log(&self, entry: LogEntry) {
        if self.echo.load(Ordering::Relaxed) {
            println!("{}", entry.render());
        }
        // No receivers is fine
        let _ = self.sender.send(entry);
    }

    /// Get a receiver for SSE streaming
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

pub fn log_debug(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::debug(msg).with_indent(1));
}

pub fn log_info(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::info(msg));
}

pub fn log_success(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::success(msg));
}

pub fn log_warning(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::warning(msg));
}

pub fn log_error(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::error(msg));
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    LOG_BROADCASTER.log(LogEntry::info(msg).with_indent(indent));
}

pub fn log_warning_indent(msg: impl Into<String>, indent: u8) {
    LOG_BROADCASTER.log(LogEntry::warning(msg).with_indent(indent));
}
