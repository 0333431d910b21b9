// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Time utilities for the TriCore scheduling port
//!
//! The per-core tick counter and the conversion from a tick rate to system
//! timer counts.

/// Logical tick counter (one per tick interrupt)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Ticks(u64);

impl Ticks {
    /// Zero ticks
    pub const ZERO: Self = Self(0);

    /// Get the raw tick count
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Low 32 bits, used as log timestamps
    #[must_use]
    pub const fn as_timestamp(&self) -> u32 {
        self.0 as u32
    }

    /// Advance by one tick
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Timer counts between two tick interrupts
///
/// Returns `None` when the tick rate is zero or faster than the timer.
#[must_use]
pub const fn timer_ticks_per_period(timer_hz: u32, tick_rate_hz: u32) -> Option<u32> {
    if tick_rate_hz == 0 || tick_rate_hz > timer_hz {
        None
    } else {
        Some(timer_hz / tick_rate_hz)
    }
}
