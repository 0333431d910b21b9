// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Integration tests for tc-port
//!
//! These tests drive the port through the simulated core and timer the way
//! a kernel would: build task contexts, start, yield, take ticks and
//! reclaim deleted tasks, checking the context store stays consistent.

use tc_common::constants::{DEFAULT_STM_FREQUENCY_HZ, MAX_CORES};
use tc_port::arch::sim::{SimCpu, SimStm};
use tc_port::{
    CoreId, CorePort, CsaLink, FatalState, Kernel, PortConfig, TaskControlBlock, TaskId, TaskState,
};

fn panic_hook(state: &FatalState) -> ! {
    panic!("fatal {:?}", state.reason)
}

/// Round-robin kernel with per-core selection
struct RoundRobin {
    tasks: Vec<TaskControlBlock>,
    current: [Option<usize>; MAX_CORES],
    ticks: [u64; MAX_CORES],
    selections: u64,
}

impl RoundRobin {
    fn new() -> Self {
        Self {
            tasks: Vec::new(),
            current: [None; MAX_CORES],
            ticks: [0; MAX_CORES],
            selections: 0,
        }
    }

    fn add(&mut self, core: CoreId, handle: CsaLink) -> usize {
        let index = self.tasks.len();
        self.tasks.push(TaskControlBlock::new(
            TaskId(index as u16),
            core,
            handle,
            "worker",
        ));
        if self.current[core.index()].is_none() {
            self.current[core.index()] = Some(index);
            self.tasks[index].state = TaskState::Running;
        }
        index
    }

    fn current(&self, core: CoreId) -> usize {
        self.current[core.index()].expect("core has a task")
    }
}

impl Kernel for RoundRobin {
    fn current_context(&self, core: CoreId) -> CsaLink {
        self.current[core.index()].map_or(CsaLink::NULL, |i| self.tasks[i].saved_context)
    }

    fn set_current_context(&mut self, core: CoreId, context: CsaLink) {
        if let Some(i) = self.current[core.index()] {
            self.tasks[i].saved_context = context;
        }
    }

    fn switch_context(&mut self, core: CoreId) {
        let Some(from) = self.current[core.index()] else {
            return;
        };
        let len = self.tasks.len();
        for step in 1..=len {
            let next = (from + step) % len;
            let task = &self.tasks[next];
            if task.core == core && task.state.is_alive() {
                if self.tasks[from].state == TaskState::Running {
                    self.tasks[from].state = TaskState::Ready;
                }
                self.tasks[next].state = TaskState::Running;
                self.current[core.index()] = Some(next);
                self.selections += 1;
                return;
            }
        }
    }

    fn increment_tick(&mut self, core: CoreId) -> bool {
        self.ticks[core.index()] += 1;
        true
    }
}

fn entry(i: usize) -> u32 {
    0x8000_4000 + 0x200 * i as u32
}

fn stack(i: usize) -> u32 {
    0x7000_0000 + 0x800 * (i as u32 + 1)
}

fn ready_port<const N: usize>() -> CorePort<SimCpu, N> {
    let mut port = CorePort::new(SimCpu::new(0), PortConfig::DEFAULT).expect("port");
    port.init(&SimStm::new(DEFAULT_STM_FREQUENCY_HZ)).expect("init");
    port.set_fatal_hook(panic_hook);
    port
}

mod lifecycle_tests {
    use super::*;

    #[test]
    #[should_panic(expected = "CsaExhausted")]
    fn test_third_task_exhausts_four_records() {
        let mut port = ready_port::<4>();
        let mut kernel = RoundRobin::new();
        for i in 0..2 {
            let handle = port.init_context(entry(i), i as u32, stack(i)).expect("build");
            kernel.add(CoreId::BOOT, handle);
        }
        assert_eq!(port.free_records(), 0);
        assert_eq!(port.stats().min_free_records, 0);

        let _ = port.init_context(entry(2), 2, stack(2));
    }

    #[test]
    fn test_ping_pong_in_four_records() {
        let mut port = ready_port::<4>();
        let mut kernel = RoundRobin::new();
        for i in 0..2 {
            let handle = port.init_context(entry(i), i as u32, stack(i)).expect("build");
            kernel.add(CoreId::BOOT, handle);
        }
        let mut stm = SimStm::new(DEFAULT_STM_FREQUENCY_HZ);
        port.launch(&kernel, &mut stm).expect("launch");
        // Task 1 still holds its initial pair.
        assert_eq!(port.free_records(), 2);

        for round in 0..10 {
            port.task_yield(&mut kernel);
            assert_eq!(kernel.current(CoreId::BOOT), (round + 1) % 2);
            assert_eq!(port.cpu().regs.sp(), stack((round + 1) % 2));
            assert_eq!(port.free_records(), 2);
        }
        assert_eq!(port.stats().context_switches, 10);
    }

    #[test]
    fn test_start_is_logged() {
        let mut port = ready_port::<8>();
        let mut kernel = RoundRobin::new();
        let handle = port.init_context(entry(0), 0, stack(0)).expect("build");
        kernel.add(CoreId::BOOT, handle);
        port.launch(&kernel, &mut SimStm::new(DEFAULT_STM_FREQUENCY_HZ))
            .expect("launch");

        let sources: Vec<_> = port.log().iter().map(|e| e.source).collect();
        assert!(sources.contains(&"init"));
        assert!(sources.contains(&"start"));
    }
}

mod switch_tests {
    use super::*;

    const RECORDS: usize = 32;
    const TASKS: usize = 3;
    const MAX_DEPTH: usize = 3;

    /// Deterministic pseudo-random numbers
    struct Lcg(u64);

    impl Lcg {
        fn next_below(&mut self, bound: u32) -> u32 {
            self.0 = self
                .0
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            ((self.0 >> 33) as u32) % bound
        }
    }

    fn marker(i: usize) -> u32 {
        0x1111_0000 + i as u32
    }

    #[test]
    fn test_random_yield_tick_interleaving() {
        let mut port = ready_port::<RECORDS>();
        let mut kernel = RoundRobin::new();
        for i in 0..TASKS {
            let handle = port.init_context(entry(i), i as u32, stack(i)).expect("build");
            kernel.add(CoreId::BOOT, handle);
        }
        let mut stm = SimStm::new(DEFAULT_STM_FREQUENCY_HZ);
        port.launch(&kernel, &mut stm).expect("launch");

        let core = port.core();
        let period = u64::from(port.tick_period());
        let mut rng = Lcg(0xC0FFEE);
        let mut started = [false; TASKS];
        let mut depth = [0usize; TASKS];
        started[0] = true;

        for _ in 0..1000 {
            let running = kernel.current(core);

            // Live registers belong to the task the kernel selected last.
            assert_eq!(port.cpu().regs.sp(), stack(running));
            if started[running] {
                assert_eq!(port.cpu().regs.d[2], marker(running));
                assert_eq!(port.cpu().regs.d[9], marker(running) << 4);
            } else {
                assert_eq!(port.cpu().regs.pc, entry(running));
                assert_eq!(port.cpu().regs.a[4], running as u32);
                started[running] = true;
            }
            port.cpu_mut().regs.d[2] = marker(running);
            port.cpu_mut().regs.d[9] = marker(running) << 4;

            match rng.next_below(4) {
                0 => port.task_yield(&mut kernel),
                1 => {
                    stm.advance(core, period);
                    assert!(port.tick_interrupt(&mut kernel, &mut stm));
                }
                2 if depth[running] < MAX_DEPTH => {
                    port.task_call(entry(running) + 0x40);
                    depth[running] += 1;
                }
                _ if depth[running] > 0 => {
                    port.task_return();
                    depth[running] -= 1;
                }
                _ => port.task_yield(&mut kernel),
            }

            // Every record is either free or held by exactly one task chain.
            let running = kernel.current(core);
            let mut held = port.chain_len(port.cpu().pcxi()).expect("running chain");
            for (i, tcb) in kernel.tasks.iter().enumerate() {
                if i != running {
                    held += port.chain_len(tcb.saved_context).expect("saved chain");
                }
            }
            assert_eq!(port.free_records() + held, RECORDS);
        }

        assert_eq!(
            port.stats().context_switches,
            port.stats().yields + port.stats().tick_switches
        );
        assert_eq!(port.stats().context_switches, kernel.selections);
    }
}

mod reclaim_tests {
    use super::*;

    #[test]
    fn test_preempted_chain_fully_reclaimed() {
        const RECORDS: usize = 16;
        let mut port = ready_port::<RECORDS>();
        let mut kernel = RoundRobin::new();
        for i in 0..2 {
            let handle = port.init_context(entry(i), i as u32, stack(i)).expect("build");
            kernel.add(CoreId::BOOT, handle);
        }
        let mut stm = SimStm::new(DEFAULT_STM_FREQUENCY_HZ);
        port.launch(&kernel, &mut stm).expect("launch");
        let core = port.core();

        // Task 0 is two calls deep when the tick preempts it.
        port.task_call(entry(0) + 0x10);
        port.task_call(entry(0) + 0x20);
        stm.advance(core, u64::from(port.tick_period()));
        assert!(port.tick_interrupt(&mut kernel, &mut stm));
        assert_eq!(kernel.current(core), 1);
        assert_eq!(port.chain_len(kernel.tasks[0].saved_context), Ok(4));
        assert_eq!(port.free_records(), RECORDS - 4);

        kernel.tasks[0].delete();
        assert_eq!(port.reclaim_task(&mut kernel.tasks[0]), Ok(4));
        assert_eq!(port.free_records(), RECORDS);
        assert_eq!(kernel.tasks[0].state, TaskState::Reclaimed);

        // The survivor keeps running alone.
        port.task_yield(&mut kernel);
        assert_eq!(kernel.current(core), 1);
        assert_eq!(port.cpu().regs.sp(), stack(1));
    }

    #[test]
    fn test_reclaim_requires_deleted_task() {
        let mut port = ready_port::<8>();
        let mut kernel = RoundRobin::new();
        let handle = port.init_context(entry(0), 0, stack(0)).expect("build");
        kernel.add(CoreId::BOOT, handle);

        assert_eq!(
            port.reclaim_task(&mut kernel.tasks[0]),
            Err(tc_port::Error::TaskNotDeleted)
        );
        assert_eq!(port.free_records(), 6);
    }
}

mod port_tests {
    use super::*;
    use tc_port::{Port, PortState};

    #[test]
    fn test_tick_routed_to_its_core() {
        let config = PortConfig::for_cores(2);
        let mut port =
            Port::<SimCpu, 8, 2>::new([SimCpu::new(0), SimCpu::new(1)], config).expect("port");
        let mut stm = SimStm::new(DEFAULT_STM_FREQUENCY_HZ);
        port.init(&stm).expect("init");

        let mut kernel = RoundRobin::new();
        for raw in 0..2u8 {
            let core = CoreId::new(raw).expect("core");
            let cp = port.core_mut(core).expect("core port");
            cp.set_fatal_hook(panic_hook);
            for i in 0..2 {
                let handle = cp.init_context(entry(i), i as u32, stack(i)).expect("build");
                kernel.add(core, handle);
            }
            cp.launch(&kernel, &mut stm).expect("launch");
        }
        assert!(port.iter().all(|p| p.state() == PortState::Running));

        let core1 = CoreId::new(1).expect("core");
        let period = port.core(core1).expect("core port").tick_period();
        {
            let cp = port.core_mut(core1).expect("core port");
            let (cpu, csa) = cp.cpu_and_csa_mut();
            cpu.interrupt_entry(csa, 40, 0x8000_0300).expect("interrupt entry");
        }
        stm.advance(core1, u64::from(period));
        port.system_tick_isr(core1, &mut kernel, &mut stm).expect("routed");
        {
            let cp = port.core_mut(core1).expect("core port");
            let (cpu, csa) = cp.cpu_and_csa_mut();
            cpu.rfe(csa).expect("rfe");
        }

        assert_eq!(kernel.ticks, [0, 1, 0, 0, 0, 0]);
        assert_eq!(kernel.current(CoreId::BOOT), 0);
        assert_eq!(kernel.current(core1), 3);
        assert_eq!(port.core(core1).expect("core port").cpu().regs.pc, entry(1));
        assert_eq!(port.core(CoreId::BOOT).expect("core port").ticks().as_u64(), 0);

        let absent = CoreId::new(4).expect("core");
        assert_eq!(
            port.system_tick_isr(absent, &mut kernel, &mut stm),
            Err(tc_port::Error::InvalidCore)
        );
    }
}
