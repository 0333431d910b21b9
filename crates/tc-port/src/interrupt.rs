// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Interrupt priority masking
//!
//! Kernel calls from interrupt handlers run with ICR.CCPN raised to the
//! configured syscall ceiling, which holds off every interrupt at or below
//! it while leaving higher priorities free to nest.

use crate::arch::{icr, CoreRegister, Cpu};
use crate::port::CorePort;

impl<C: Cpu, const N: usize> CorePort<C, N> {
    /// Raise CCPN to the syscall ceiling; returns the previous CCPN
    ///
    /// Interrupts are enabled on return.
    pub fn set_interrupt_mask_from_isr(&mut self) -> u8 {
        self.cpu.disable();
        let current = self.cpu.mfcr(CoreRegister::Icr);
        self.cpu.mtcr(
            CoreRegister::Icr,
            icr::with_ccpn(current, self.config.max_syscall_interrupt_priority),
        );
        self.cpu.isync();
        self.cpu.enable();
        icr::ccpn(current)
    }

    /// Put CCPN back to a value returned by
    /// [`CorePort::set_interrupt_mask_from_isr`]
    ///
    /// Interrupts are enabled on return.
    pub fn clear_interrupt_mask_from_isr(&mut self, saved: u8) {
        self.cpu.disable();
        let current = self.cpu.mfcr(CoreRegister::Icr);
        self.cpu.mtcr(CoreRegister::Icr, icr::with_ccpn(current, saved));
        self.cpu.isync();
        self.cpu.enable();
    }
}
