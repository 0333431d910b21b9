// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Common types for the TriCore scheduling port
//!
//! Core identifiers and task privilege levels shared by the port and the
//! generic kernel built on top of it.

use core::fmt;

use crate::constants::{
    INITIAL_PRIVILEGED_PROGRAM_STATUS_WORD, INITIAL_UNPRIVILEGED_PROGRAM_STATUS_WORD,
    LAST_CORE_HW_ID, MAX_CORES, NON_CPU_CORE_HW_ID, SYSTEM_PROGRAM_STATUS_WORD,
};

/// Logical CPU core index (`0..MAX_CORES`)
///
/// The hardware numbers its cores 0-4 and 6; logical index 5 stands for
/// hardware core 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CoreId(u8);

impl CoreId {
    /// The boot core
    pub const BOOT: Self = Self(0);

    /// Create a core identifier from a logical index
    ///
    /// Returns `None` if `index >= MAX_CORES`.
    #[must_use]
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < MAX_CORES {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Map a raw CORE_ID register value to a logical core
    #[must_use]
    pub const fn from_hw(raw: u32) -> Option<Self> {
        match raw {
            NON_CPU_CORE_HW_ID => None,
            LAST_CORE_HW_ID => Some(Self(5)),
            0..=4 => Some(Self(raw as u8)),
            _ => None,
        }
    }

    /// Raw CORE_ID register value for this core
    #[must_use]
    pub const fn to_hw(self) -> u32 {
        if self.0 == 5 {
            LAST_CORE_HW_ID
        } else {
            self.0 as u32
        }
    }

    /// Logical index, usable for per-core arrays
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cpu{}", self.0)
    }
}

/// Privilege a new task starts with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskPrivilege {
    /// Supervisor mode on register set 0
    #[default]
    System,
    /// IO level 1 on protection register set 1
    Privileged,
    /// IO level 0 (user) on protection register set 1
    Unprivileged,
}

impl TaskPrivilege {
    /// Program status word loaded into a new task's upper context
    #[must_use]
    pub const fn initial_psw(self) -> u32 {
        match self {
            Self::System => SYSTEM_PROGRAM_STATUS_WORD,
            Self::Privileged => INITIAL_PRIVILEGED_PROGRAM_STATUS_WORD,
            Self::Unprivileged => INITIAL_UNPRIVILEGED_PROGRAM_STATUS_WORD,
        }
    }
}
