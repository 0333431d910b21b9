// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Interface to the generic kernel
//!
//! The port never decides which task runs. It calls back into the kernel for
//! task selection and tick accounting, and reads and writes the saved
//! context of each core's current task through this trait.

use tc_common::CoreId;

use crate::csa::CsaLink;

/// Services the port consumes from the kernel
///
/// Every method may be called with interrupts disabled on `core` and must
/// not block.
pub trait Kernel {
    /// Saved-context handle of the task currently selected on `core`
    fn current_context(&self, core: CoreId) -> CsaLink;

    /// Store `context` as the saved-context handle of the current task on
    /// `core`
    fn set_current_context(&mut self, core: CoreId, context: CsaLink);

    /// Select the next task to run on `core`
    fn switch_context(&mut self, core: CoreId);

    /// Advance logical time on `core`; returns whether a switch is due
    fn increment_tick(&mut self, core: CoreId) -> bool;
}
