// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Port configuration
//!
//! All configuration is fixed at build time and handed to the port when it
//! is constructed. [`PortConfig::validate`] is called by the port during
//! initialization.

use crate::constants::{
    DEFAULT_MAX_SYSCALL_INTERRUPT_PRIORITY, DEFAULT_TICK_INTERRUPT_PRIORITY, DEFAULT_TICK_RATE_HZ,
    MAX_CORES,
};
use crate::errors::{Error, Result};
use crate::log::LogLevel;
use crate::time::timer_ticks_per_period;
use crate::types::TaskPrivilege;

/// Scheduling port configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortConfig {
    /// Number of CPU cores running the scheduler
    pub num_cores: u8,
    /// Tick interrupt rate in Hz
    pub tick_rate_hz: u32,
    /// Interrupts at or below this priority are masked during kernel calls
    pub max_syscall_interrupt_priority: u8,
    /// Priority of the system timer compare interrupt
    pub tick_interrupt_priority: u8,
    /// Privilege newly built task contexts start with
    pub task_privilege: TaskPrivilege,
    /// Records kept back at the end of the pool for depletion handling
    pub csa_reserve: usize,
    /// Minimum level recorded in each core's log
    pub log_level: LogLevel,
}

impl PortConfig {
    /// Default configuration: one core, 1 kHz tick, supervisor tasks
    pub const DEFAULT: Self = Self {
        num_cores: 1,
        tick_rate_hz: DEFAULT_TICK_RATE_HZ,
        max_syscall_interrupt_priority: DEFAULT_MAX_SYSCALL_INTERRUPT_PRIORITY,
        tick_interrupt_priority: DEFAULT_TICK_INTERRUPT_PRIORITY,
        task_privilege: TaskPrivilege::System,
        csa_reserve: 0,
        log_level: LogLevel::Info,
    };

    /// Configuration for `num_cores` cores, other fields at their defaults
    #[must_use]
    pub const fn for_cores(num_cores: u8) -> Self {
        Self {
            num_cores,
            ..Self::DEFAULT
        }
    }

    /// Check the configuration for values the port cannot run with
    ///
    /// # Errors
    /// - `InvalidCore` if the core count is zero or above `MAX_CORES`
    /// - `TimerError` if the tick rate is zero
    /// - `InvalidPriority` if a priority is zero or the tick interrupt sits
    ///   above the syscall ceiling
    pub const fn validate(&self) -> Result<()> {
        if self.num_cores == 0 || self.num_cores as usize > MAX_CORES {
            return Err(Error::InvalidCore);
        }
        if self.tick_rate_hz == 0 {
            return Err(Error::TimerError);
        }
        if self.max_syscall_interrupt_priority == 0 || self.tick_interrupt_priority == 0 {
            return Err(Error::InvalidPriority);
        }
        if self.tick_interrupt_priority > self.max_syscall_interrupt_priority {
            return Err(Error::InvalidPriority);
        }
        Ok(())
    }

    /// Timer counts per tick for a timer running at `timer_hz`
    ///
    /// # Errors
    /// Returns `TimerError` if the timer is slower than the tick rate.
    pub const fn ticks_per_period(&self, timer_hz: u32) -> Result<u32> {
        match timer_ticks_per_period(timer_hz, self.tick_rate_hz) {
            Some(ticks) => Ok(ticks),
            None => Err(Error::TimerError),
        }
    }
}

impl Default for PortConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
