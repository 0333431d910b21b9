// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Error types for the TriCore scheduling port
//!
//! This module defines the unified error type returned by the recoverable
//! parts of the port API. Conditions that leave the context-save hardware in
//! an inconsistent state are never returned through this type: they go to
//! the fatal path instead.

use core::fmt;

/// Result type alias for port operations
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the port
///
/// Each variant maps to a stable numeric code (see [`Error::code`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    // =========================================================================
    // Context Store Errors (0x01xx)
    // =========================================================================
    /// The free context pool has no records left
    CsaExhausted,
    /// A context handle does not name a record of this core's store
    InvalidContext,
    /// A context chain is longer than the store (cycle or foreign link)
    CorruptChain,
    /// The store is too small to hold even one task context
    StoreTooSmall,

    // =========================================================================
    // Scheduler Errors (0x02xx)
    // =========================================================================
    /// The port has not been initialized
    NotInitialized,
    /// The scheduler is already running
    AlreadyStarted,
    /// The task is not in a state that allows the operation
    TaskNotDeleted,
    /// The task's context chain has already been returned to the pool
    AlreadyReclaimed,

    // =========================================================================
    // Timer and Interrupt Errors (0x03xx)
    // =========================================================================
    /// Timer configuration cannot produce a tick
    TimerError,
    /// Interrupt priority is out of range or above the kernel threshold
    InvalidPriority,

    // =========================================================================
    // General Errors (0xFFxx)
    // =========================================================================
    /// Core identifier is out of range or not a CPU core
    InvalidCore,
    /// Invalid state for the operation
    InvalidState,
    /// Internal error (should not occur)
    InternalError,
}

impl Error {
    /// Get the error code for this error
    ///
    /// Error codes are organized by category:
    /// - 0x01xx: Context store errors
    /// - 0x02xx: Scheduler errors
    /// - 0x03xx: Timer and interrupt errors
    /// - 0xFFxx: General errors
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::CsaExhausted => 0x0101,
            Self::InvalidContext => 0x0102,
            Self::CorruptChain => 0x0103,
            Self::StoreTooSmall => 0x0104,

            Self::NotInitialized => 0x0201,
            Self::AlreadyStarted => 0x0202,
            Self::TaskNotDeleted => 0x0204,
            Self::AlreadyReclaimed => 0x0205,

            Self::TimerError => 0x0301,
            Self::InvalidPriority => 0x0302,

            Self::InvalidCore => 0xFF02,
            Self::InvalidState => 0xFF03,
            Self::InternalError => 0xFFFF,
        }
    }

    /// Get a short description of the error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::CsaExhausted => "context save area pool exhausted",
            Self::InvalidContext => "invalid context handle",
            Self::CorruptChain => "corrupt context chain",
            Self::StoreTooSmall => "context store too small",
            Self::NotInitialized => "port not initialized",
            Self::AlreadyStarted => "scheduler already started",
            Self::TaskNotDeleted => "task not deleted",
            Self::AlreadyReclaimed => "context already reclaimed",
            Self::TimerError => "timer error",
            Self::InvalidPriority => "invalid interrupt priority",
            Self::InvalidCore => "invalid core",
            Self::InvalidState => "invalid state",
            Self::InternalError => "internal error",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:04X}] {}", self.code(), self.description())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "[0x{:04X}] {}", self.code(), self.description());
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
