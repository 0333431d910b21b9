// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Fatal conditions
//!
//! Once the context store is starved or corrupt there is no safe way back
//! into task code, so these conditions never surface as `Err`. The port
//! disables interrupts, captures a [`FatalState`] for post-mortem debugging,
//! records it in the core's log and hands it to the installed
//! [`FatalHook`], which must not return.

use core::fmt;

use tc_common::{log_error, CoreId};

use crate::arch::{CoreRegister, Cpu, Trap};
use crate::port::CorePort;

/// Hook invoked on a fatal condition
pub type FatalHook = fn(&FatalState) -> !;

/// Why the port stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalReason {
    /// No free context records left for a new task
    CsaExhausted,
    /// Syscall trap with an identifier the port does not implement
    InvalidTrap(u32),
    /// A context instruction trapped
    Trap(Trap),
    /// A link word names no record, or a switch found no saved context
    InvalidContext,
    /// The first restore could not be performed
    StartFailed,
    /// The kernel's allocator ran out of memory
    MallocFailed,
    /// A context chain is longer than the store
    CorruptChain,
}

impl fmt::Display for FatalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CsaExhausted => f.write_str("context save areas exhausted"),
            Self::InvalidTrap(id) => write!(f, "invalid syscall trap {id}"),
            Self::Trap(trap) => write!(f, "context trap {trap}"),
            Self::InvalidContext => f.write_str("invalid context link"),
            Self::StartFailed => f.write_str("scheduler start failed"),
            Self::MallocFailed => f.write_str("allocation failed"),
            Self::CorruptChain => f.write_str("corrupt context chain"),
        }
    }
}

/// Core state captured when a fatal condition is raised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatalState {
    /// What went wrong
    pub reason: FatalReason,
    /// Core that raised it
    pub core: CoreId,
    /// Free list head at the time
    pub fcx: u32,
    /// Call chain head at the time
    pub pcxi: u32,
    /// Interrupt control register before interrupts were disabled
    pub icr: u32,
    /// Ticks handled on the core
    pub ticks: u64,
}

/// Default hook: spin forever with interrupts off
pub fn loop_forever(_state: &FatalState) -> ! {
    loop {
        core::hint::spin_loop();
    }
}

impl<C: Cpu, const N: usize> CorePort<C, N> {
    /// Raise a fatal condition on this core
    pub(crate) fn fatal(&mut self, reason: FatalReason) -> ! {
        let icr = self.cpu.mfcr(CoreRegister::Icr);
        self.cpu.disable();
        let state = FatalState {
            reason,
            core: self.core,
            fcx: self.cpu.mfcr(CoreRegister::Fcx),
            pcxi: self.cpu.mfcr(CoreRegister::Pcxi),
            icr,
            ticks: self.ticks.as_u64(),
        };
        log_error!(
            self.log,
            self.ticks.as_timestamp(),
            "fatal",
            "{} fcx={:#07X} pcxi={:#010X}",
            reason,
            state.fcx,
            state.pcxi
        );
        (self.fatal_hook)(&state)
    }

    /// Allocation failure hook for the kernel; never returns
    pub fn malloc_failed(&mut self) -> ! {
        self.fatal(FatalReason::MallocFailed)
    }

    /// Replace the fatal hook
    pub fn set_fatal_hook(&mut self, hook: FatalHook) {
        self.fatal_hook = hook;
    }
}
