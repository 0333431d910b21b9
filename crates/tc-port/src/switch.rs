// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Switch engine
//!
//! Runs after `svlcx`, so PCXI names the lower context of the task being
//! suspended. With interrupts disabled the engine stores PCXI into the
//! current task, lets the kernel select the next task and loads that task's
//! saved context into PCXI. The following `rslcx` and return then resume the
//! selected task where it was suspended.
//!
//! The switch path does not log.

use tc_common::constants::SYSCALL_TASK_YIELD;

use crate::arch::{CoreRegister, Cpu};
use crate::csa::{CsaLink, CsaMemory};
use crate::fatal::FatalReason;
use crate::kernel::Kernel;
use crate::port::CorePort;

impl<C: Cpu, const N: usize> CorePort<C, N> {
    /// Save the current task, select the next and restore it into PCXI
    pub fn switch_context<K: Kernel>(&mut self, kernel: &mut K) {
        let ie = self.cpu.disable();
        self.cpu.dsync();

        let saved = CsaLink::from_raw(self.cpu.mfcr(CoreRegister::Pcxi));
        if saved.is_upper() || !self.csa.contains(saved) {
            self.fatal(FatalReason::InvalidContext);
        }
        kernel.set_current_context(self.core, saved);

        kernel.switch_context(self.core);

        let next = kernel.current_context(self.core);
        if next.is_upper() || !self.csa.contains(next) {
            self.fatal(FatalReason::InvalidContext);
        }
        self.cpu.mtcr(CoreRegister::Pcxi, next.raw());
        self.cpu.isync();
        self.cpu.restore(ie);

        self.stats.context_switches += 1;
    }

    /// Voluntary yield from task code
    pub fn yield_now<K: Kernel>(&mut self, kernel: &mut K) {
        if let Err(trap) = self.cpu.svlcx(&mut self.csa) {
            self.fatal(FatalReason::Trap(trap));
        }
        self.stats.yields += 1;
        self.switch_context(kernel);
        if let Err(trap) = self.cpu.rslcx(&mut self.csa) {
            self.fatal(FatalReason::Trap(trap));
        }
    }

    /// Syscall trap dispatcher
    ///
    /// `SYSCALL_TASK_YIELD` yields; any other identifier is fatal.
    pub fn trap_yield<K: Kernel>(&mut self, kernel: &mut K, id: u32) {
        match id {
            SYSCALL_TASK_YIELD => self.yield_now(kernel),
            other => self.fatal(FatalReason::InvalidTrap(other)),
        }
    }
}
