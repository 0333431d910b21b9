// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Per-core port instances
//!
//! A [`CorePort`] owns everything one core needs: its CPU handle, its
//! context store and free list, its configuration, statistics and log. All of
//! it is touched only from that core, with interrupts disabled around the
//! free list and PCXI updates. [`Port`] groups one `CorePort` per core and
//! routes the tick interrupt by core identifier.
//!
//! The operations themselves live in their own modules: [`crate::pool`],
//! [`crate::context`], [`crate::switch`], [`crate::tick`],
//! [`crate::reclaim`] and [`crate::start`].

use heapless::Vec;
use tc_common::constants::MAX_CORES;
use tc_common::{log_info, CoreId, Error, LogBuffer, PortConfig, Result, Ticks};

use crate::arch::{CoreRegister, Cpu, TickTimer};
use crate::csa::{CsaArena, CsaMemory};
use crate::fatal::{loop_forever, FatalHook};
use crate::kernel::Kernel;

/// Port lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    /// Free list not yet formatted
    Uninitialized,
    /// Free list formatted; contexts may be built
    Initialized,
    /// First task restored; ticks and yields switch tasks
    Running,
    /// The kernel asked the scheduler to end
    Stopped,
}

/// Port statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PortStats {
    /// Task contexts built
    pub contexts_built: u64,
    /// Context switches performed
    pub context_switches: u64,
    /// Voluntary yields
    pub yields: u64,
    /// Ticks after which the kernel asked for a switch
    pub tick_switches: u64,
    /// Context records returned to the free list
    pub records_reclaimed: u64,
    /// Tasks whose chain was reclaimed
    pub tasks_reclaimed: u64,
    /// Fewest free records seen after building a context
    pub min_free_records: usize,
}

/// Scheduling port for one core
pub struct CorePort<C: Cpu, const N: usize> {
    pub(crate) core: CoreId,
    pub(crate) cpu: C,
    pub(crate) csa: CsaArena<N>,
    pub(crate) config: PortConfig,
    pub(crate) state: PortState,
    pub(crate) stats: PortStats,
    pub(crate) ticks: Ticks,
    pub(crate) tick_period: u32,
    pub(crate) log: LogBuffer,
    pub(crate) fatal_hook: FatalHook,
}

impl<C: Cpu, const N: usize> CorePort<C, N> {
    /// Create the port for the core `cpu` runs on
    ///
    /// # Errors
    /// `InvalidCore` if the CPU reports a CORE_ID that is not a CPU core.
    pub fn new(cpu: C, config: PortConfig) -> Result<Self> {
        let core = CoreId::from_hw(cpu.core_id()).ok_or(Error::InvalidCore)?;
        let mut log = LogBuffer::new(core);
        log.set_min_level(config.log_level);

        Ok(Self {
            core,
            cpu,
            csa: CsaArena::new(),
            config,
            state: PortState::Uninitialized,
            stats: PortStats::default(),
            ticks: Ticks::ZERO,
            tick_period: 0,
            log,
            fatal_hook: loop_forever,
        })
    }

    /// Format the free list and load FCX and LCX
    ///
    /// Every record of this core's store is overwritten, so this runs from
    /// startup code before any call chain lives in the store. PCXI is left
    /// alone: the caller's own chain stays valid and its next call takes a
    /// record from the new free list.
    ///
    /// # Errors
    /// - `InvalidState` if already initialized
    /// - configuration errors from [`PortConfig::validate`]
    /// - `TimerError` if the timer cannot produce the tick rate
    /// - `StoreTooSmall` if the store cannot hold a task plus the reserve
    pub fn init<T: TickTimer>(&mut self, timer: &T) -> Result<()> {
        if self.state != PortState::Uninitialized {
            return Err(Error::InvalidState);
        }
        self.config.validate()?;
        if self.core.index() >= self.config.num_cores as usize {
            return Err(Error::InvalidCore);
        }
        let period = self.config.ticks_per_period(timer.frequency())?;
        let (fcx, lcx) = self.csa.format(self.config.csa_reserve)?;

        let ie = self.cpu.disable();
        self.cpu.dsync();
        self.cpu.mtcr(CoreRegister::Fcx, fcx.raw());
        self.cpu.mtcr(CoreRegister::Lcx, lcx.raw());
        self.cpu.isync();
        self.cpu.restore(ie);

        self.tick_period = period;
        self.stats = PortStats {
            min_free_records: N,
            ..PortStats::default()
        };
        self.state = PortState::Initialized;

        log_info!(
            self.log,
            self.ticks.as_timestamp(),
            "init",
            "{} records, reserve {}, tick period {}",
            N,
            self.config.csa_reserve,
            period
        );
        Ok(())
    }

    /// Core this port serves
    #[must_use]
    pub const fn core(&self) -> CoreId {
        self.core
    }

    /// Lifecycle state
    #[must_use]
    pub const fn state(&self) -> PortState {
        self.state
    }

    /// Statistics
    #[must_use]
    pub const fn stats(&self) -> &PortStats {
        &self.stats
    }

    /// Tick interrupts handled
    #[must_use]
    pub const fn ticks(&self) -> Ticks {
        self.ticks
    }

    /// Timer counts between ticks (0 before init)
    #[must_use]
    pub const fn tick_period(&self) -> u32 {
        self.tick_period
    }

    /// Configuration
    #[must_use]
    pub const fn config(&self) -> &PortConfig {
        &self.config
    }

    /// Event log
    #[must_use]
    pub const fn log(&self) -> &LogBuffer {
        &self.log
    }

    /// CPU handle
    #[must_use]
    pub const fn cpu(&self) -> &C {
        &self.cpu
    }

    /// Mutable CPU handle
    pub fn cpu_mut(&mut self) -> &mut C {
        &mut self.cpu
    }

    /// Context store
    #[must_use]
    pub const fn csa(&self) -> &CsaArena<N> {
        &self.csa
    }

    /// CPU and context store together, for driving context instructions
    pub fn cpu_and_csa_mut(&mut self) -> (&mut C, &mut CsaArena<N>) {
        (&mut self.cpu, &mut self.csa)
    }

    /// Number of records in the store
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.csa.capacity()
    }
}

/// Ports for every core of the system
pub struct Port<C: Cpu, const N: usize, const CORES: usize> {
    cores: [CorePort<C, N>; CORES],
}

impl<C: Cpu, const N: usize, const CORES: usize> Port<C, N, CORES> {
    /// Create one port per CPU
    ///
    /// # Errors
    /// `InvalidCore` if `CORES` disagrees with the configuration, exceeds
    /// `MAX_CORES`, or two CPUs report the same core.
    pub fn new(cpus: [C; CORES], config: PortConfig) -> Result<Self> {
        if CORES == 0 || CORES > MAX_CORES || CORES != config.num_cores as usize {
            return Err(Error::InvalidCore);
        }

        let mut cores: Vec<CorePort<C, N>, CORES> = Vec::new();
        for cpu in cpus {
            let port = CorePort::new(cpu, config)?;
            if cores.iter().any(|other| other.core == port.core) {
                return Err(Error::InvalidCore);
            }
            cores.push(port).map_err(|_| Error::InvalidCore)?;
        }

        let cores = cores.into_array().map_err(|_| Error::InternalError)?;
        Ok(Self { cores })
    }

    /// Initialize every core
    ///
    /// # Errors
    /// The first error any core's [`CorePort::init`] returns.
    pub fn init<T: TickTimer>(&mut self, timer: &T) -> Result<()> {
        self.cores.iter_mut().try_for_each(|port| port.init(timer))
    }

    /// Port of `core`
    #[must_use]
    pub fn core(&self, core: CoreId) -> Option<&CorePort<C, N>> {
        self.cores.iter().find(|port| port.core == core)
    }

    /// Mutable port of `core`
    pub fn core_mut(&mut self, core: CoreId) -> Option<&mut CorePort<C, N>> {
        self.cores.iter_mut().find(|port| port.core == core)
    }

    /// Port of the core with hardware CORE_ID `raw`
    pub fn core_for_hw(&mut self, raw: u32) -> Option<&mut CorePort<C, N>> {
        CoreId::from_hw(raw).and_then(|core| self.core_mut(core))
    }

    /// Iterate over all cores
    pub fn iter(&self) -> impl Iterator<Item = &CorePort<C, N>> + '_ {
        self.cores.iter()
    }

    /// Tick interrupt entry for every core
    ///
    /// One handler serves all cores; the vector of each core passes its own
    /// identifier.
    ///
    /// # Errors
    /// `InvalidCore` if no port serves `core`.
    pub fn system_tick_isr<K: Kernel, T: TickTimer>(
        &mut self,
        core: CoreId,
        kernel: &mut K,
        timer: &mut T,
    ) -> Result<()> {
        let port = self.core_mut(core).ok_or(Error::InvalidCore)?;
        port.system_tick_isr(kernel, timer);
        Ok(())
    }
}
