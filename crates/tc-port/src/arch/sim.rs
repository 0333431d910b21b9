// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Simulated TriCore core and system timer
//!
//! [`SimCpu`] keeps the core special function registers and a register file
//! and executes the context instructions against a [`CsaMemory`] with the
//! same linking, tagging and trap rules as the hardware. [`SimStm`] is a
//! per-core free running counter with one compare channel.
//!
//! The `impl CorePort<SimCpu, N>` block at the end drives whole hardware
//! sequences (interrupt entry, task calls, returns) around the port entry
//! points.

use tc_common::constants::{ICR_IE, MAX_CORES};
use tc_common::CoreId;

use super::{icr, CoreRegister, Cpu, TickTimer, Trap};
use crate::csa::{lower, upper, CsaLink, CsaMemory};
use crate::fatal::FatalReason;
use crate::kernel::Kernel;
use crate::port::CorePort;

/// Code address the simulated yield entry point lives at
pub const YIELD_ENTRY: u32 = 0x8000_0100;

/// Code address of the simulated syscall trap vector
pub const SYSCALL_VECTOR: u32 = 0x8000_0200;

/// Code address of the simulated tick interrupt vector
pub const TICK_VECTOR: u32 = 0x8000_0300;

/// General purpose registers and program counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegisterFile {
    /// Data registers D0-D15
    pub d: [u32; 16],
    /// Address registers A0-A15
    pub a: [u32; 16],
    /// Program counter
    pub pc: u32,
}

impl RegisterFile {
    /// Stack pointer (A10)
    #[must_use]
    pub const fn sp(&self) -> u32 {
        self.a[10]
    }

    /// Return address (A11)
    #[must_use]
    pub const fn ra(&self) -> u32 {
        self.a[11]
    }
}

/// Barrier counters, for checking ordering in tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Barriers {
    /// `dsync` executed
    pub dsync: u32,
    /// `isync` executed
    pub isync: u32,
}

/// Simulated TriCore CPU core
#[derive(Debug, Clone)]
pub struct SimCpu {
    core_id: u32,
    pcxi: u32,
    fcx: u32,
    lcx: u32,
    psw: u32,
    icr: u32,
    syscon: u32,
    /// General purpose register file
    pub regs: RegisterFile,
    barriers: Barriers,
}

impl SimCpu {
    /// Reset state of the core with hardware CORE_ID `core_id`
    ///
    /// Interrupts start enabled at CCPN 0, the way the kernel runs tasks.
    #[must_use]
    pub const fn new(core_id: u32) -> Self {
        Self {
            core_id,
            pcxi: 0,
            fcx: 0,
            lcx: 0,
            psw: 0x0000_0B80,
            icr: ICR_IE,
            syscon: 0,
            regs: RegisterFile {
                d: [0; 16],
                a: [0; 16],
                pc: 0,
            },
            barriers: Barriers { dsync: 0, isync: 0 },
        }
    }

    /// Core for a logical core identifier
    #[must_use]
    pub const fn for_core(core: CoreId) -> Self {
        Self::new(core.to_hw())
    }

    /// Barrier counters
    #[must_use]
    pub const fn barriers(&self) -> Barriers {
        self.barriers
    }

    /// Current PCXI as a link
    #[must_use]
    pub const fn pcxi(&self) -> CsaLink {
        CsaLink::from_raw(self.pcxi)
    }

    /// Current FCX as a link
    #[must_use]
    pub const fn fcx(&self) -> CsaLink {
        CsaLink::from_raw(self.fcx)
    }

    /// Global interrupt enable
    #[must_use]
    pub const fn interrupts_enabled(&self) -> bool {
        icr::ie(self.icr)
    }

    /// Current CPU priority number
    #[must_use]
    pub const fn ccpn(&self) -> u8 {
        icr::ccpn(self.icr)
    }

    /// Check if an interrupt at `priority` would be taken now
    #[must_use]
    pub const fn can_preempt(&self, priority: u8) -> bool {
        self.interrupts_enabled() && priority > self.ccpn()
    }

    /// Take the free list head for a context save
    ///
    /// Returns the record and whether the depletion trap follows the save.
    fn take_free<M: CsaMemory>(&mut self, csa: &mut M) -> Result<(CsaLink, bool), Trap> {
        let head = CsaLink::from_raw(self.fcx);
        if head.is_null() {
            return Err(Trap::FreeContextListUnderflow);
        }
        let next = csa.record(head).ok_or(Trap::DataAccess)?.link();
        let depleted = self.lcx != 0 && head.id() == CsaLink::from_raw(self.lcx).id();
        self.fcx = next.untagged().raw();
        Ok((head, depleted))
    }

    /// Record PCXI as a link to `saved` and report depletion
    fn link_saved(&mut self, saved: CsaLink, upper_context: bool, depleted: bool) -> Result<(), Trap> {
        self.pcxi = CsaLink::tagged(
            saved.id(),
            upper_context,
            self.interrupts_enabled(),
            self.ccpn(),
        )
        .raw();
        if depleted {
            Err(Trap::FreeContextListDepletion)
        } else {
            Ok(())
        }
    }

    fn save_upper<M: CsaMemory>(&mut self, csa: &mut M) -> Result<(), Trap> {
        let (head, depleted) = self.take_free(csa)?;
        let regs = self.regs;
        let record = csa.record_mut(head).ok_or(Trap::DataAccess)?;
        let words = record.words_mut();
        words[upper::PCXI] = self.pcxi;
        words[upper::PSW] = self.psw;
        words[upper::A10] = regs.a[10];
        words[upper::A11] = regs.a[11];
        words[upper::D8..upper::D8 + 4].copy_from_slice(&regs.d[8..12]);
        words[upper::A12..upper::A12 + 4].copy_from_slice(&regs.a[12..16]);
        words[upper::D12..upper::D12 + 4].copy_from_slice(&regs.d[12..16]);
        self.link_saved(head, true, depleted)
    }

    /// Check PCXI before a restore of the given kind
    fn restore_target(&self, want_upper: bool) -> Result<CsaLink, Trap> {
        let pcxi = CsaLink::from_raw(self.pcxi);
        if pcxi.is_null() {
            return Err(Trap::CallStackUnderflow);
        }
        if pcxi.is_upper() != want_upper {
            return Err(Trap::ContextType);
        }
        Ok(pcxi)
    }

    /// Return a restored record to the free list and follow its link
    fn release_restored<M: CsaMemory>(&mut self, csa: &mut M, pcxi: CsaLink) -> Result<(), Trap> {
        let record = csa.record_mut(pcxi).ok_or(Trap::DataAccess)?;
        let previous = record.link();
        record.set_link(CsaLink::from_raw(self.fcx));
        self.fcx = pcxi.untagged().raw();
        self.pcxi = previous.raw();
        Ok(())
    }

    fn restore_upper<M: CsaMemory>(&mut self, csa: &mut M) -> Result<CsaLink, Trap> {
        let pcxi = self.restore_target(true)?;
        let record = csa.record(pcxi).ok_or(Trap::DataAccess)?;
        let words = *record.words();
        self.regs.pc = self.regs.a[11];
        self.psw = words[upper::PSW];
        self.regs.a[10] = words[upper::A10];
        self.regs.a[11] = words[upper::A11];
        self.regs.d[8..12].copy_from_slice(&words[upper::D8..upper::D8 + 4]);
        self.regs.a[12..16].copy_from_slice(&words[upper::A12..upper::A12 + 4]);
        self.regs.d[12..16].copy_from_slice(&words[upper::D12..upper::D12 + 4]);
        self.release_restored(csa, pcxi)?;
        Ok(pcxi)
    }

    /// `call target`: save the upper context and jump
    ///
    /// # Errors
    /// Returns the trap raised by the upper context save.
    pub fn call<M: CsaMemory>(&mut self, csa: &mut M, target: u32) -> Result<(), Trap> {
        self.save_upper(csa)?;
        self.regs.a[11] = self.regs.pc;
        self.regs.pc = target;
        Ok(())
    }

    /// Take an interrupt at `priority`: save the upper context, mask and
    /// jump to `vector`
    ///
    /// # Errors
    /// Returns the trap raised by the upper context save.
    pub fn interrupt_entry<M: CsaMemory>(
        &mut self,
        csa: &mut M,
        priority: u8,
        vector: u32,
    ) -> Result<(), Trap> {
        let saved = self.save_upper(csa);
        self.regs.a[11] = self.regs.pc;
        self.regs.pc = vector;
        self.icr = icr::with_ccpn(icr::with_ie(self.icr, false), priority);
        saved
    }

    /// Take a synchronous trap: save the upper context, mask and jump to
    /// `vector` without changing CCPN
    ///
    /// # Errors
    /// Returns the trap raised by the upper context save.
    pub fn trap_entry<M: CsaMemory>(&mut self, csa: &mut M, vector: u32) -> Result<(), Trap> {
        let priority = self.ccpn();
        self.interrupt_entry(csa, priority, vector)
    }

    /// Return from exception: like `ret`, and also reload IE and CCPN from
    /// the PCXI tags
    ///
    /// # Errors
    /// Returns the trap raised by the restore.
    pub fn rfe<M: CsaMemory>(&mut self, csa: &mut M) -> Result<(), Trap> {
        let link = self.restore_upper(csa)?;
        self.icr = icr::with_ccpn(icr::with_ie(self.icr, link.pie()), link.pcpn());
        Ok(())
    }
}

impl Cpu for SimCpu {
    fn mfcr(&self, reg: CoreRegister) -> u32 {
        match reg {
            CoreRegister::Pcxi => self.pcxi,
            CoreRegister::Psw => self.psw,
            CoreRegister::Pc => self.regs.pc,
            CoreRegister::Syscon => self.syscon,
            CoreRegister::CoreId => self.core_id,
            CoreRegister::Icr => self.icr,
            CoreRegister::Fcx => self.fcx,
            CoreRegister::Lcx => self.lcx,
        }
    }

    fn mtcr(&mut self, reg: CoreRegister, value: u32) {
        match reg {
            CoreRegister::Pcxi => self.pcxi = value,
            CoreRegister::Psw => self.psw = value,
            CoreRegister::Pc => self.regs.pc = value,
            CoreRegister::Syscon => self.syscon = value,
            CoreRegister::CoreId => {}
            CoreRegister::Icr => self.icr = value,
            CoreRegister::Fcx => self.fcx = value,
            CoreRegister::Lcx => self.lcx = value,
        }
    }

    fn disable(&mut self) -> bool {
        let was = self.interrupts_enabled();
        self.icr = icr::with_ie(self.icr, false);
        was
    }

    fn enable(&mut self) {
        self.icr = icr::with_ie(self.icr, true);
    }

    fn dsync(&mut self) {
        self.barriers.dsync += 1;
    }

    fn isync(&mut self) {
        self.barriers.isync += 1;
    }

    fn svlcx<M: CsaMemory>(&mut self, csa: &mut M) -> Result<(), Trap> {
        let (head, depleted) = self.take_free(csa)?;
        let regs = self.regs;
        let record = csa.record_mut(head).ok_or(Trap::DataAccess)?;
        let words = record.words_mut();
        words[lower::PCXI] = self.pcxi;
        words[lower::A11] = regs.a[11];
        words[lower::A2] = regs.a[2];
        words[lower::A3] = regs.a[3];
        words[lower::D0..lower::D0 + 4].copy_from_slice(&regs.d[0..4]);
        words[lower::A4..lower::A4 + 4].copy_from_slice(&regs.a[4..8]);
        words[lower::D4..lower::D4 + 4].copy_from_slice(&regs.d[4..8]);
        self.link_saved(head, false, depleted)
    }

    fn rslcx<M: CsaMemory>(&mut self, csa: &mut M) -> Result<(), Trap> {
        let pcxi = self.restore_target(false)?;
        let record = csa.record(pcxi).ok_or(Trap::DataAccess)?;
        let words = *record.words();
        self.regs.a[11] = words[lower::A11];
        self.regs.a[2] = words[lower::A2];
        self.regs.a[3] = words[lower::A3];
        self.regs.d[0..4].copy_from_slice(&words[lower::D0..lower::D0 + 4]);
        self.regs.a[4..8].copy_from_slice(&words[lower::A4..lower::A4 + 4]);
        self.regs.d[4..8].copy_from_slice(&words[lower::D4..lower::D4 + 4]);
        self.release_restored(csa, pcxi)
    }

    fn ret<M: CsaMemory>(&mut self, csa: &mut M) -> Result<(), Trap> {
        self.restore_upper(csa).map(|_| ())
    }
}

// ============================================================================
// System timer
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
struct CompareChannel {
    counter: u64,
    compare: u32,
    priority: u8,
    armed: bool,
    pending: bool,
}

impl CompareChannel {
    /// Compare match on the low 32 counter bits, tolerant of wrap
    fn matched(&self) -> bool {
        self.armed && (self.counter as u32).wrapping_sub(self.compare) as i32 >= 0
    }
}

/// Simulated system timer with one compare channel per core
#[derive(Debug, Clone)]
pub struct SimStm {
    frequency: u32,
    channels: [CompareChannel; MAX_CORES],
}

impl SimStm {
    /// Timer counting at `frequency` Hz
    #[must_use]
    pub fn new(frequency: u32) -> Self {
        Self {
            frequency,
            channels: [CompareChannel::default(); MAX_CORES],
        }
    }

    /// Advance the counter of `core` by `counts`
    pub fn advance(&mut self, core: CoreId, counts: u64) {
        let channel = &mut self.channels[core.index()];
        channel.counter = channel.counter.wrapping_add(counts);
        if channel.matched() {
            channel.pending = true;
        }
    }

    /// Acknowledge the compare interrupt of `core`, returning whether one
    /// was pending
    pub fn take_pending(&mut self, core: CoreId) -> bool {
        core::mem::take(&mut self.channels[core.index()].pending)
    }

    /// Current comparator value
    #[must_use]
    pub fn compare(&self, core: CoreId) -> u32 {
        self.channels[core.index()].compare
    }

    /// Current counter value
    #[must_use]
    pub fn counter(&self, core: CoreId) -> u64 {
        self.channels[core.index()].counter
    }

    /// Interrupt priority programmed for `core`, if armed
    #[must_use]
    pub fn priority(&self, core: CoreId) -> Option<u8> {
        let channel = &self.channels[core.index()];
        channel.armed.then_some(channel.priority)
    }
}

impl TickTimer for SimStm {
    fn frequency(&self) -> u32 {
        self.frequency
    }

    fn init_compare(&mut self, core: CoreId, ticks: u32, priority: u8) {
        let channel = &mut self.channels[core.index()];
        channel.compare = (channel.counter as u32).wrapping_add(ticks);
        channel.priority = priority;
        channel.armed = true;
        channel.pending = false;
    }

    fn increase_compare(&mut self, core: CoreId, ticks: u32) {
        let channel = &mut self.channels[core.index()];
        channel.compare = channel.compare.wrapping_add(ticks);
        if channel.matched() {
            channel.pending = true;
        }
    }
}

// ============================================================================
// Hardware sequences around the port entry points
// ============================================================================

impl<const N: usize> CorePort<SimCpu, N> {
    fn trap_or_fatal(&mut self, result: Result<(), Trap>) {
        if let Err(trap) = result {
            self.fatal(FatalReason::Trap(trap));
        }
    }

    /// Start the scheduler and return into the first task
    ///
    /// Runs the start sequence up to the final `ret`, then executes that
    /// `ret` so the register file holds the first task's state.
    ///
    /// # Errors
    /// Whatever [`CorePort::prepare_start`] rejects.
    pub fn launch<K: Kernel, T: TickTimer>(&mut self, kernel: &K, timer: &mut T) -> tc_common::Result<CsaLink> {
        let first = self.prepare_start(kernel, timer)?;
        let result = self.cpu.ret(&mut self.csa);
        self.trap_or_fatal(result);
        Ok(first)
    }

    /// Task code calling the voluntary yield entry point
    pub fn task_yield<K: Kernel>(&mut self, kernel: &mut K) {
        let result = self.cpu.call(&mut self.csa, YIELD_ENTRY);
        self.trap_or_fatal(result);
        self.yield_now(kernel);
        let result = self.cpu.ret(&mut self.csa);
        self.trap_or_fatal(result);
    }

    /// Task code raising the syscall trap with identifier `id`
    pub fn syscall<K: Kernel>(&mut self, kernel: &mut K, id: u32) {
        let result = self.cpu.trap_entry(&mut self.csa, SYSCALL_VECTOR);
        self.trap_or_fatal(result);
        self.trap_yield(kernel, id);
        let result = self.cpu.rfe(&mut self.csa);
        self.trap_or_fatal(result);
    }

    /// Deliver the tick interrupt if the timer has one pending and the core
    /// would take it
    ///
    /// Returns whether the interrupt was taken.
    pub fn tick_interrupt<K: Kernel>(&mut self, kernel: &mut K, timer: &mut SimStm) -> bool {
        let priority = self.config.tick_interrupt_priority;
        if !self.cpu.can_preempt(priority) || !timer.take_pending(self.core) {
            return false;
        }
        let result = self.cpu.interrupt_entry(&mut self.csa, priority, TICK_VECTOR);
        self.trap_or_fatal(result);
        self.system_tick_isr(kernel, timer);
        let result = self.cpu.rfe(&mut self.csa);
        self.trap_or_fatal(result);
        true
    }

    /// Task code making a plain function call (grows the context chain)
    pub fn task_call(&mut self, target: u32) {
        let result = self.cpu.call(&mut self.csa, target);
        self.trap_or_fatal(result);
    }

    /// Task code returning from a function call
    pub fn task_return(&mut self) {
        let result = self.cpu.ret(&mut self.csa);
        self.trap_or_fatal(result);
    }
}
