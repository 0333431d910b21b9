// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Task control block
//!
//! The part of a task the port cares about. The saved-context handle is the
//! first field, where a stack-based port would keep the stack pointer.

use heapless::String;
use tc_common::CoreId;

use crate::csa::CsaLink;

/// Maximum task name length
pub const MAX_TASK_NAME_LEN: usize = 16;

/// Task identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u16);

/// Task lifecycle as far as the port is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting to be selected
    Ready,
    /// Selected on its core
    Running,
    /// Waiting on an event
    Blocked,
    /// Suspended by the kernel
    Suspended,
    /// Deleted; its context chain still holds records
    Deleted,
    /// Context chain returned to the free list
    Reclaimed,
}

impl TaskState {
    /// Check if the task may still be scheduled
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !matches!(self, Self::Deleted | Self::Reclaimed)
    }
}

/// Task control block
#[derive(Debug, Clone)]
#[repr(C)]
pub struct TaskControlBlock {
    /// Link to the task's lower context
    pub saved_context: CsaLink,
    /// Task identifier
    pub id: TaskId,
    /// Core the task's context records belong to
    pub core: CoreId,
    /// Lifecycle state
    pub state: TaskState,
    name: String<MAX_TASK_NAME_LEN>,
}

impl TaskControlBlock {
    /// Control block for a task whose context has been built
    #[must_use]
    pub fn new(id: TaskId, core: CoreId, saved_context: CsaLink, name: &str) -> Self {
        let mut tcb = Self {
            saved_context,
            id,
            core,
            state: TaskState::Ready,
            name: String::new(),
        };
        tcb.set_name(name);
        tcb
    }

    /// Set the name, truncated to `MAX_TASK_NAME_LEN` bytes on a character
    /// boundary
    pub fn set_name(&mut self, name: &str) {
        self.name.clear();
        for c in name.chars() {
            if self.name.push(c).is_err() {
                break;
            }
        }
    }

    /// Task name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mark the task deleted; it must never be selected again
    pub fn delete(&mut self) {
        self.state = TaskState::Deleted;
    }
}
