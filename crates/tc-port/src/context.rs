// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Initial task context construction
//!
//! A new task is two records: a lower context holding the entry address
//! (A11) and the argument (A4) and linking to an upper context holding the
//! stack pointer (A10) and the initial PSW. The handle of a task is the link
//! to its lower context. Restoring it with `rslcx` followed by `rfe` or `ret`
//! starts the task at its entry with every other register zero.

use tc_common::constants::{CSAS_PER_TASK, INITIAL_PCXI_UPPER_CONTEXT_WORD};
use tc_common::{log_debug, Error, Result};

use crate::arch::Cpu;
use crate::csa::{lower, upper, CsaLink, CsaMemory};
use crate::fatal::FatalReason;
use crate::port::{CorePort, PortState};

/// Code address of a task entry point
pub type CodeAddr = u32;

impl<C: Cpu, const N: usize> CorePort<C, N> {
    /// Build the initial context of a task
    ///
    /// Returns the saved-context handle to store in the task's control
    /// block. Running out of records is fatal.
    ///
    /// # Errors
    /// `NotInitialized` if the free list has not been formatted.
    pub fn init_context(&mut self, entry: CodeAddr, arg: u32, stack_top: u32) -> Result<CsaLink> {
        if self.state == PortState::Uninitialized {
            return Err(Error::NotInitialized);
        }

        let lower_link = match self.acquire(CSAS_PER_TASK) {
            Ok(link) => link,
            Err(Error::CsaExhausted) => self.fatal(FatalReason::CsaExhausted),
            Err(_) => self.fatal(FatalReason::InvalidContext),
        };
        self.cpu.dsync();

        let psw = self.config.task_privilege.initial_psw();
        let Some(upper_link) = self.csa.record(lower_link).map(|record| record.link()) else {
            self.fatal(FatalReason::InvalidContext);
        };
        let Some(upper_record) = self.csa.record_mut(upper_link) else {
            self.fatal(FatalReason::InvalidContext);
        };
        upper_record.clear();
        upper_record.set_word(upper::A10, stack_top);
        upper_record.set_word(upper::PSW, psw);

        let Some(lower_record) = self.csa.record_mut(lower_link) else {
            self.fatal(FatalReason::InvalidContext);
        };
        lower_record.clear();
        lower_record.set_word(lower::A4, arg);
        lower_record.set_word(lower::A11, entry);
        lower_record.set_link(CsaLink::from_raw(
            INITIAL_PCXI_UPPER_CONTEXT_WORD | upper_link.id(),
        ));

        self.cpu.dsync();

        self.stats.contexts_built += 1;
        let free = self.free_records();
        self.stats.min_free_records = self.stats.min_free_records.min(free);

        log_debug!(
            self.log,
            self.ticks.as_timestamp(),
            "context",
            "built {:?} entry={:#010X} sp={:#010X}, {} free",
            lower_link,
            entry,
            stack_top,
            free
        );
        Ok(lower_link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{formatted_port, formatted_port_with, panic_hook};
    use tc_common::{PortConfig, TaskPrivilege};

    #[test]
    fn test_layout_of_new_context() {
        let mut port = formatted_port::<4>();
        let handle = port.init_context(0x8000_1000, 0xCAFE, 0x7000_2000).unwrap();
        assert_eq!(handle, CsaLink::from_raw(1));

        let lower_record = *port.csa().record(handle).unwrap();
        let link = lower_record.link();
        assert_eq!(link.raw(), 0x0030_0000 | 2);
        assert!(link.is_upper());
        assert_eq!(lower_record.word(lower::A11), 0x8000_1000);
        assert_eq!(lower_record.word(lower::A4), 0xCAFE);

        let upper_record = *port.csa().record(link).unwrap();
        assert!(upper_record.link().is_null());
        assert_eq!(upper_record.word(upper::A10), 0x7000_2000);
        assert_eq!(upper_record.word(upper::PSW), 0x0000_08FF);

        let nonzero_lower = lower_record.words().iter().filter(|w| **w != 0).count();
        let nonzero_upper = upper_record.words().iter().filter(|w| **w != 0).count();
        assert_eq!(nonzero_lower, 3);
        assert_eq!(nonzero_upper, 2);
    }

    #[test]
    fn test_stale_record_contents_cleared() {
        let mut port = formatted_port::<4>();
        {
            let (_, csa) = port.cpu_and_csa_mut();
            for slot in 0..4 {
                let record = csa.record_mut(CsaLink::from_raw(slot + 1)).unwrap();
                for word in 1..16 {
                    record.set_word(word, 0xDEAD_0000 | word as u32);
                }
            }
        }
        let handle = port.init_context(0x100, 0, 0x200).unwrap();
        let lower_record = port.csa().record(handle).unwrap();
        assert_eq!(lower_record.word(lower::D0), 0);
        assert_eq!(lower_record.word(lower::A2), 0);
    }

    #[test]
    fn test_privilege_selects_psw() {
        let config = PortConfig {
            task_privilege: TaskPrivilege::Unprivileged,
            ..PortConfig::DEFAULT
        };
        let mut port = formatted_port_with::<4>(config);
        let handle = port.init_context(0x100, 0, 0x200).unwrap();
        let link = port.csa().record(handle).unwrap().link();
        assert_eq!(port.csa().record(link).unwrap().word(upper::PSW), 0x0000_10FF);
    }

    #[test]
    fn test_build_updates_stats_and_barriers() {
        let mut port = formatted_port::<6>();
        let before = port.cpu().barriers();
        port.init_context(0x100, 0, 0x200).unwrap();
        let after = port.cpu().barriers();
        assert!(after.dsync >= before.dsync + 2);
        assert_eq!(port.stats().contexts_built, 1);
        assert_eq!(port.stats().min_free_records, 4);
        assert!(port.cpu().interrupts_enabled());
    }

    #[test]
    fn test_build_before_init_is_rejected() {
        use crate::arch::sim::SimCpu;
        let mut port = CorePort::<SimCpu, 4>::new(SimCpu::new(0), PortConfig::DEFAULT).unwrap();
        assert_eq!(port.init_context(0x100, 0, 0x200), Err(Error::NotInitialized));
    }

    #[test]
    #[should_panic(expected = "CsaExhausted")]
    fn test_exhaustion_is_fatal() {
        let mut port = formatted_port::<3>();
        port.set_fatal_hook(panic_hook);
        port.init_context(0x100, 0, 0x200).unwrap();
        let _ = port.init_context(0x100, 0, 0x300);
    }
}
