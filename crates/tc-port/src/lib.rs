// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! TriCore Scheduling Port
//!
//! The hardware-facing core of a preemptive RTOS on TriCore, where task
//! state lives in linked context save areas instead of on the stack:
//!
//! - **Pool**: Free-list allocator over the per-core context store
//! - **Context**: Initial lower/upper context of a new task
//! - **Switch**: Save/select/restore around the kernel's scheduler
//! - **Tick**: Periodic tick from the system timer compare
//! - **Reclaim**: Return of deleted tasks' context chains
//! - **Start**: First restore into the first task
//! - **Arch**: CPU and timer traits, plus a simulated core for the host
//!
//! # Usage
//!
//! ```rust,ignore
//! use tc_port::{CorePort, PortConfig};
//!
//! let mut port = CorePort::<_, 256>::new(cpu, PortConfig::DEFAULT)?;
//! port.init(&timer)?;
//!
//! let handle = port.init_context(task_entry as u32, 0, stack_top)?;
//! kernel.add_task(handle);
//!
//! // Restore the first task (never returns)
//! port.start_scheduler(&kernel, &mut timer);
//! ```

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

pub mod arch;
pub mod context;
pub mod csa;
pub mod fatal;
pub mod interrupt;
pub mod kernel;
pub mod pool;
pub mod port;
pub mod reclaim;
pub mod start;
pub mod switch;
pub mod task;
pub mod tick;

// Re-export commonly used types
pub use arch::{Cpu, TickTimer, Trap};
pub use context::CodeAddr;
pub use csa::{Csa, CsaArena, CsaLink, CsaMemory};
pub use fatal::{FatalHook, FatalReason, FatalState};
pub use kernel::Kernel;
pub use port::{CorePort, Port, PortState, PortStats};
pub use task::{TaskControlBlock, TaskId, TaskState};
pub use tc_common::{CoreId, Error, PortConfig, Result, TaskPrivilege};
