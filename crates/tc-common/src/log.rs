// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Per-core event log
//!
//! Each core owns one [`LogBuffer`], a fixed ring of entries stamped with the
//! core's tick count. Nothing here allocates or blocks, so recording is safe
//! from the tick interrupt. The context switch itself never logs.

use core::fmt::{self, Write};
use heapless::String;

use crate::types::CoreId;

/// Maximum log message length
pub const MAX_LOG_MESSAGE_LEN: usize = 96;

/// Log buffer size (number of entries)
pub const LOG_BUFFER_SIZE: usize = 32;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    /// Unrecoverable conditions, recorded just before the fatal hook runs
    Error = 0,
    /// Recoverable misuse of the port API
    Warn = 1,
    /// Lifecycle events (init, start, stop)
    Info = 2,
    /// Context builds and reclaims
    Debug = 3,
    /// Per-tick events
    Trace = 4,
}

impl LogLevel {
    /// Single character tag used when rendering entries
    #[must_use]
    pub const fn prefix(&self) -> char {
        match self {
            Self::Error => 'E',
            Self::Warn => 'W',
            Self::Info => 'I',
            Self::Debug => 'D',
            Self::Trace => 'T',
        }
    }
}

/// One recorded event
#[derive(Clone)]
pub struct LogEntry {
    /// Severity
    pub level: LogLevel,
    /// Core that recorded the event
    pub core: CoreId,
    /// Tick count of the recording core
    pub tick: u32,
    /// Port component that recorded the event
    pub source: &'static str,
    /// Rendered message, truncated to `MAX_LOG_MESSAGE_LEN`
    pub message: String<MAX_LOG_MESSAGE_LEN>,
}

impl fmt::Debug for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{:08X}] {} {}: {}",
            self.core,
            self.tick,
            self.level.prefix(),
            self.source,
            self.message
        )
    }
}

/// Writer that drops whatever does not fit instead of failing
struct Truncating<'a>(&'a mut String<MAX_LOG_MESSAGE_LEN>);

impl Write for Truncating<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Ring of log entries owned by one core
pub struct LogBuffer {
    core: CoreId,
    entries: [Option<LogEntry>; LOG_BUFFER_SIZE],
    head: usize,
    len: usize,
    dropped: u32,
    min_level: LogLevel,
}

impl LogBuffer {
    /// Create an empty buffer for `core`
    #[must_use]
    pub const fn new(core: CoreId) -> Self {
        const EMPTY: Option<LogEntry> = None;
        Self {
            core,
            entries: [EMPTY; LOG_BUFFER_SIZE],
            head: 0,
            len: 0,
            dropped: 0,
            min_level: LogLevel::Info,
        }
    }

    /// Core this buffer belongs to
    #[must_use]
    pub const fn core(&self) -> CoreId {
        self.core
    }

    /// Set the minimum level that gets recorded
    pub fn set_min_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    /// Check if a level passes the filter
    #[must_use]
    pub const fn should_log(&self, level: LogLevel) -> bool {
        (level as u8) <= (self.min_level as u8)
    }

    /// Record a formatted message
    pub fn log(&mut self, level: LogLevel, tick: u32, source: &'static str, args: fmt::Arguments<'_>) {
        if !self.should_log(level) {
            return;
        }

        let mut message = String::new();
        let _ = Truncating(&mut message).write_fmt(args);

        let slot = (self.head + self.len) % LOG_BUFFER_SIZE;
        self.entries[slot] = Some(LogEntry {
            level,
            core: self.core,
            tick,
            source,
            message,
        });

        if self.len == LOG_BUFFER_SIZE {
            self.head = (self.head + 1) % LOG_BUFFER_SIZE;
            self.dropped = self.dropped.saturating_add(1);
        } else {
            self.len += 1;
        }
    }

    /// Number of entries held
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Check if buffer is empty
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Entries overwritten since the buffer was created or cleared
    #[must_use]
    pub const fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Most recent entry
    #[must_use]
    pub fn last(&self) -> Option<&LogEntry> {
        if self.len == 0 {
            return None;
        }
        self.entries[(self.head + self.len - 1) % LOG_BUFFER_SIZE].as_ref()
    }

    /// Drop all entries
    pub fn clear(&mut self) {
        self.entries.iter_mut().for_each(|e| *e = None);
        self.head = 0;
        self.len = 0;
        self.dropped = 0;
    }

    /// Iterate over entries, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> + '_ {
        (0..self.len).filter_map(move |i| self.entries[(self.head + i) % LOG_BUFFER_SIZE].as_ref())
    }
}

/// Record an error
#[macro_export]
macro_rules! log_error {
    ($buffer:expr, $tick:expr, $source:expr, $($arg:tt)*) => {
        $buffer.log($crate::log::LogLevel::Error, $tick, $source, format_args!($($arg)*))
    };
}

/// Record a warning
#[macro_export]
macro_rules! log_warn {
    ($buffer:expr, $tick:expr, $source:expr, $($arg:tt)*) => {
        $buffer.log($crate::log::LogLevel::Warn, $tick, $source, format_args!($($arg)*))
    };
}

/// Record a lifecycle event
#[macro_export]
macro_rules! log_info {
    ($buffer:expr, $tick:expr, $source:expr, $($arg:tt)*) => {
        $buffer.log($crate::log::LogLevel::Info, $tick, $source, format_args!($($arg)*))
    };
}

/// Record a debug event
#[macro_export]
macro_rules! log_debug {
    ($buffer:expr, $tick:expr, $source:expr, $($arg:tt)*) => {
        $buffer.log($crate::log::LogLevel::Debug, $tick, $source, format_args!($($arg)*))
    };
}

/// Record a per-tick event
#[macro_export]
macro_rules! log_trace {
    ($buffer:expr, $tick:expr, $source:expr, $($arg:tt)*) => {
        $buffer.log($crate::log::LogLevel::Trace, $tick, $source, format_args!($($arg)*))
    };
}
