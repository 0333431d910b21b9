// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Tick handler
//!
//! The system timer has no auto-reload, so each tick moves the comparator
//! one period past its previous value rather than past "now". A late handler
//! therefore never drifts: at worst the next compare is already behind the
//! counter and fires immediately, catching up the lost tick.

use tc_common::log_trace;

use crate::arch::{Cpu, TickTimer};
use crate::fatal::FatalReason;
use crate::kernel::Kernel;
use crate::port::CorePort;

impl<C: Cpu, const N: usize> CorePort<C, N> {
    /// Handle one tick: reload the comparator, account the tick with kernel
    /// priorities masked, and switch if the kernel asks for it
    pub fn tick_handler<K: Kernel, T: TickTimer>(&mut self, kernel: &mut K, timer: &mut T) {
        timer.increase_compare(self.core, self.tick_period);

        let mask = self.set_interrupt_mask_from_isr();
        let switch_due = kernel.increment_tick(self.core);
        self.clear_interrupt_mask_from_isr(mask);

        self.ticks = self.ticks.next();
        log_trace!(
            self.log,
            self.ticks.as_timestamp(),
            "tick",
            "switch due: {}",
            switch_due
        );

        if switch_due {
            self.stats.tick_switches += 1;
            self.switch_context(kernel);
        }
    }

    /// Body of the tick interrupt vector: save the lower context, run the
    /// handler and restore whichever lower context PCXI names afterwards
    pub fn system_tick_isr<K: Kernel, T: TickTimer>(&mut self, kernel: &mut K, timer: &mut T) {
        if let Err(trap) = self.cpu.svlcx(&mut self.csa) {
            self.fatal(FatalReason::Trap(trap));
        }
        self.tick_handler(kernel, timer);
        if let Err(trap) = self.cpu.rslcx(&mut self.csa) {
            self.fatal(FatalReason::Trap(trap));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use tc_common::constants::{
        DEFAULT_MAX_SYSCALL_INTERRUPT_PRIORITY, DEFAULT_STM_FREQUENCY_HZ,
        DEFAULT_TICK_INTERRUPT_PRIORITY,
    };
    use tc_common::{CoreId, PortConfig};

    use super::*;
    use crate::arch::sim::{SimCpu, SimStm, TICK_VECTOR};
    use crate::arch::{icr, CoreRegister, Trap};
    use crate::csa::{CsaLink, CsaMemory};
    use crate::testing::{started_port_with_timer, MockKernel};

    /// Simulated core that publishes ICR after every write to it
    struct IcrMirrorCpu {
        inner: SimCpu,
        icr: Rc<Cell<u32>>,
    }

    impl IcrMirrorCpu {
        fn publish(&self) {
            self.icr.set(self.inner.mfcr(CoreRegister::Icr));
        }
    }

    impl Cpu for IcrMirrorCpu {
        fn mfcr(&self, reg: CoreRegister) -> u32 {
            self.inner.mfcr(reg)
        }

        fn mtcr(&mut self, reg: CoreRegister, value: u32) {
            self.inner.mtcr(reg, value);
            self.publish();
        }

        fn disable(&mut self) -> bool {
            let enabled = self.inner.disable();
            self.publish();
            enabled
        }

        fn enable(&mut self) {
            self.inner.enable();
            self.publish();
        }

        fn dsync(&mut self) {
            self.inner.dsync();
        }

        fn isync(&mut self) {
            self.inner.isync();
        }

        fn svlcx<M: CsaMemory>(&mut self, csa: &mut M) -> Result<(), Trap> {
            self.inner.svlcx(csa)
        }

        fn rslcx<M: CsaMemory>(&mut self, csa: &mut M) -> Result<(), Trap> {
            self.inner.rslcx(csa)
        }

        fn ret<M: CsaMemory>(&mut self, csa: &mut M) -> Result<(), Trap> {
            self.inner.ret(csa)
        }
    }

    /// Kernel that records ICR as it was when each hook ran
    struct IcrRecordingKernel {
        inner: MockKernel,
        icr: Rc<Cell<u32>>,
        at_tick: Option<u32>,
        at_switch: Option<u32>,
    }

    impl Kernel for IcrRecordingKernel {
        fn current_context(&self, core: CoreId) -> CsaLink {
            self.inner.current_context(core)
        }

        fn set_current_context(&mut self, core: CoreId, context: CsaLink) {
            self.inner.set_current_context(core, context);
        }

        fn switch_context(&mut self, core: CoreId) {
            self.at_switch = Some(self.icr.get());
            self.inner.switch_context(core);
        }

        fn increment_tick(&mut self, core: CoreId) -> bool {
            self.at_tick = Some(self.icr.get());
            self.inner.increment_tick(core)
        }
    }

    #[test]
    fn test_kernel_hooks_run_under_tick_masking() {
        let icr_seen = Rc::new(Cell::new(0));
        let cpu = IcrMirrorCpu {
            inner: SimCpu::new(0),
            icr: Rc::clone(&icr_seen),
        };
        let mut port = CorePort::<IcrMirrorCpu, 8>::new(cpu, PortConfig::DEFAULT).unwrap();
        let mut stm = SimStm::new(DEFAULT_STM_FREQUENCY_HZ);
        port.init(&stm).unwrap();

        let mut kernel = IcrRecordingKernel {
            inner: MockKernel::new(),
            icr: icr_seen,
            at_tick: None,
            at_switch: None,
        };
        for i in 0..2 {
            let handle = port
                .init_context(MockKernel::entry(i), MockKernel::arg(i), MockKernel::stack(i))
                .unwrap();
            kernel.inner.add_task(handle);
        }
        port.prepare_start(&kernel, &mut stm).unwrap();
        let (cpu, csa) = port.cpu_and_csa_mut();
        cpu.ret(csa).unwrap();
        cpu.inner
            .interrupt_entry(csa, DEFAULT_TICK_INTERRUPT_PRIORITY, TICK_VECTOR)
            .unwrap();

        port.system_tick_isr(&mut kernel, &mut stm);

        let at_tick = kernel.at_tick.unwrap();
        assert!(icr::ie(at_tick));
        assert_eq!(icr::ccpn(at_tick), DEFAULT_MAX_SYSCALL_INTERRUPT_PRIORITY);

        let at_switch = kernel.at_switch.unwrap();
        assert!(!icr::ie(at_switch));
        assert_eq!(kernel.inner.current_index(), 1);

        // The handler leaves the vector's own priority in place.
        assert_eq!(
            icr::ccpn(port.cpu().mfcr(CoreRegister::Icr)),
            DEFAULT_TICK_INTERRUPT_PRIORITY
        );
        assert_eq!(port.ticks().as_u64(), 1);

        let (cpu, csa) = port.cpu_and_csa_mut();
        cpu.inner.rfe(csa).unwrap();
        assert_eq!(cpu.inner.regs.pc, MockKernel::entry(1));
        assert!(cpu.inner.interrupts_enabled());
        assert_eq!(cpu.inner.ccpn(), 0);
    }

    #[test]
    fn test_comparator_advances_by_one_period() {
        let mut kernel = MockKernel::new();
        let (mut port, mut stm) = started_port_with_timer::<8>(&mut kernel, 2);
        let core = port.core();
        let period = port.tick_period();
        let first = stm.compare(core);

        stm.advance(core, u64::from(period));
        assert!(port.tick_interrupt(&mut kernel, &mut stm));
        assert_eq!(stm.compare(core), first.wrapping_add(period));
        assert_eq!(kernel.tick_calls(), 1);
        assert_eq!(port.ticks().as_u64(), 1);
    }

    #[test]
    fn test_late_tick_keeps_schedule() {
        let mut kernel = MockKernel::new();
        let (mut port, mut stm) = started_port_with_timer::<8>(&mut kernel, 2);
        let core = port.core();
        let period = port.tick_period();
        let first = stm.compare(core);

        // Handler runs late by most of a period.
        stm.advance(core, u64::from(period) + u64::from(period) * 3 / 4);
        assert!(port.tick_interrupt(&mut kernel, &mut stm));
        assert_eq!(stm.compare(core), first.wrapping_add(period));
        assert_eq!(kernel.tick_calls(), 1);

        // The next compare is only a quarter period away.
        stm.advance(core, u64::from(period) / 4);
        assert!(port.tick_interrupt(&mut kernel, &mut stm));
        assert_eq!(stm.compare(core), first.wrapping_add(2 * period));
        assert_eq!(kernel.tick_calls(), 2);
    }

    #[test]
    fn test_tick_without_switch_resumes_same_task() {
        let mut kernel = MockKernel::new();
        kernel.switch_every(0);
        let (mut port, mut stm) = started_port_with_timer::<8>(&mut kernel, 2);
        let core = port.core();
        port.cpu_mut().regs.pc = MockKernel::entry(0) + 0x40;
        port.cpu_mut().regs.d[1] = 11;

        stm.advance(core, u64::from(port.tick_period()));
        assert!(port.tick_interrupt(&mut kernel, &mut stm));
        assert_eq!(kernel.current_index(), 0);
        assert_eq!(port.cpu().regs.pc, MockKernel::entry(0) + 0x40);
        assert_eq!(port.cpu().regs.d[1], 11);
        assert_eq!(port.stats().tick_switches, 0);
        assert_eq!(port.stats().context_switches, 0);
    }

    #[test]
    fn test_tick_switch_and_interrupt_state() {
        let mut kernel = MockKernel::new();
        let (mut port, mut stm) = started_port_with_timer::<8>(&mut kernel, 2);
        let core = port.core();

        stm.advance(core, u64::from(port.tick_period()));
        assert!(port.tick_interrupt(&mut kernel, &mut stm));
        assert_eq!(kernel.current_index(), 1);
        assert_eq!(port.cpu().regs.pc, MockKernel::entry(1));
        assert_eq!(port.stats().tick_switches, 1);
        assert!(port.cpu().interrupts_enabled());
        assert_eq!(port.cpu().ccpn(), 0);
    }

    #[test]
    fn test_no_interrupt_while_masked() {
        let mut kernel = MockKernel::new();
        let (mut port, mut stm) = started_port_with_timer::<8>(&mut kernel, 2);
        let core = port.core();
        stm.advance(core, u64::from(port.tick_period()));

        let mask = port.set_interrupt_mask_from_isr();
        assert!(!port.tick_interrupt(&mut kernel, &mut stm));
        port.clear_interrupt_mask_from_isr(mask);
        assert!(port.tick_interrupt(&mut kernel, &mut stm));
        assert_eq!(kernel.tick_calls(), 1);
    }

    #[test]
    fn test_unused_timer_is_idle() {
        let stm = SimStm::new(1_000);
        assert_eq!(stm.priority(tc_common::CoreId::BOOT), None);
    }
}
