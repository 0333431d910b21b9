// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Scheduler start
//!
//! Starting is a restore of the first task's context: arm the tick, put
//! SYSCON and PSW into their task state, point PCXI at the first task's
//! lower context and execute `rslcx` followed by `ret`. The `ret` lands on
//! the task entry with the argument in A4 and the stack in A10.

use tc_common::constants::INITIAL_SYSCON;
use tc_common::{log_info, Error, Result};

use crate::arch::{CoreRegister, Cpu, Psw, TickTimer};
use crate::csa::{CsaLink, CsaMemory};
use crate::fatal::FatalReason;
use crate::kernel::Kernel;
use crate::port::{CorePort, PortState};

impl<C: Cpu, const N: usize> CorePort<C, N> {
    /// Run the start sequence up to the final `ret`
    ///
    /// On return the lower context of the first task has been restored,
    /// PCXI names its upper context and interrupts are enabled. Returns the
    /// handle that was restored.
    ///
    /// # Errors
    /// - `AlreadyStarted` if the scheduler is running
    /// - `NotInitialized` if the free list has not been formatted
    /// - `InvalidState` if the scheduler has been ended
    /// - `InvalidContext` if the kernel's current task has no lower context
    ///   in this core's store
    pub fn prepare_start<K: Kernel, T: TickTimer>(
        &mut self,
        kernel: &K,
        timer: &mut T,
    ) -> Result<CsaLink> {
        match self.state {
            PortState::Running => return Err(Error::AlreadyStarted),
            PortState::Initialized => {}
            PortState::Uninitialized => return Err(Error::NotInitialized),
            PortState::Stopped => return Err(Error::InvalidState),
        }

        let first = kernel.current_context(self.core);
        if first.is_null() || first.is_upper() || !self.csa.contains(first) {
            return Err(Error::InvalidContext);
        }

        timer.init_compare(
            self.core,
            self.tick_period,
            self.config.tick_interrupt_priority,
        );

        self.cpu.disable();
        self.cpu.mtcr(CoreRegister::Syscon, INITIAL_SYSCON);
        self.cpu.isync();

        let psw = Psw::from_bits_retain(self.cpu.mfcr(CoreRegister::Psw))
            .difference(Psw::CDC | Psw::CDE);
        self.cpu.dsync();
        self.cpu.mtcr(CoreRegister::Psw, psw.bits());
        self.cpu.isync();

        self.cpu.dsync();
        self.cpu.mtcr(CoreRegister::Pcxi, first.raw());
        self.cpu.isync();

        if let Err(trap) = self.cpu.rslcx(&mut self.csa) {
            self.fatal(FatalReason::Trap(trap));
        }

        self.cpu.enable();
        self.state = PortState::Running;

        log_info!(
            self.log,
            self.ticks.as_timestamp(),
            "start",
            "first context {:?}",
            first
        );
        Ok(first)
    }

    /// Start the scheduler on this core; never returns
    ///
    /// A start that cannot restore the first task is fatal.
    pub fn start_scheduler<K: Kernel, T: TickTimer>(&mut self, kernel: &K, timer: &mut T) -> ! {
        if self.prepare_start(kernel, timer).is_err() {
            self.fatal(FatalReason::StartFailed);
        }
        if let Err(trap) = self.cpu.ret(&mut self.csa) {
            self.fatal(FatalReason::Trap(trap));
        }
        self.cpu.park()
    }

    /// Stop scheduling on this core
    ///
    /// Nothing is torn down; the records of every task stay where they are.
    pub fn end_scheduler(&mut self) {
        self.state = PortState::Stopped;
        log_info!(self.log, self.ticks.as_timestamp(), "start", "scheduler ended");
    }
}
