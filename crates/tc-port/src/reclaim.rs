// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Deferred reclamation of deleted tasks' context chains
//!
//! A deleted task's chain may still be the call chain of the core when it is
//! deleted, so its records are only returned once the kernel's cleanup task
//! runs. The whole chain goes back, including records added by calls and
//! preemptions since the task's context was built.

use tc_common::{log_debug, log_warn, Error, Result};

use crate::arch::Cpu;
use crate::csa::{CsaLink, CsaMemory};
use crate::fatal::FatalReason;
use crate::port::CorePort;
use crate::task::{TaskControlBlock, TaskState};

impl<C: Cpu, const N: usize> CorePort<C, N> {
    /// Return the chain starting at `handle` to the free list
    ///
    /// Link tags are stripped on the way to the tail. Returns the number of
    /// records reclaimed. A chain longer than the store is fatal.
    ///
    /// The task owning `handle` must never run again; reclaiming a live
    /// chain corrupts it.
    pub fn reclaim(&mut self, handle: CsaLink) -> usize {
        let head = handle.untagged();
        if head.is_null() {
            return 0;
        }

        let mut tail = head;
        let mut count = 1;
        loop {
            let Some(record) = self.csa.record_mut(tail) else {
                self.fatal(FatalReason::InvalidContext);
            };
            let next = record.link().untagged();
            if next.is_null() {
                break;
            }
            record.set_link(next);
            tail = next;
            count += 1;
            if count > N {
                self.fatal(FatalReason::CorruptChain);
            }
        }

        self.release(head, tail);

        self.stats.records_reclaimed += count as u64;
        count
    }

    /// Reclaim a deleted task's chain and mark it reclaimed
    ///
    /// # Errors
    /// - `InvalidCore` if the task's records belong to another core
    /// - `AlreadyReclaimed` if the chain has already been returned
    /// - `TaskNotDeleted` if the task may still run
    pub fn reclaim_task(&mut self, tcb: &mut TaskControlBlock) -> Result<usize> {
        if tcb.core != self.core {
            return Err(Error::InvalidCore);
        }
        match tcb.state {
            TaskState::Deleted => {}
            TaskState::Reclaimed => {
                log_warn!(
                    self.log,
                    self.ticks.as_timestamp(),
                    "reclaim",
                    "task {} already reclaimed",
                    tcb.id.0
                );
                return Err(Error::AlreadyReclaimed);
            }
            _ => return Err(Error::TaskNotDeleted),
        }

        let count = self.reclaim(tcb.saved_context);
        tcb.saved_context = CsaLink::NULL;
        tcb.state = TaskState::Reclaimed;
        self.stats.tasks_reclaimed += 1;

        log_debug!(
            self.log,
            self.ticks.as_timestamp(),
            "reclaim",
            "task {} '{}': {} records",
            tcb.id.0,
            tcb.name(),
            count
        );
        Ok(count)
    }
}
