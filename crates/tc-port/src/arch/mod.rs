// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Architecture interface
//!
//! The port talks to the core through the [`Cpu`] trait (core special
//! function registers, interrupt enable, barriers and the context
//! instructions) and to the system timer through [`TickTimer`].
//!
//! [`sim`] provides a host implementation of both that executes the context
//! instructions against a [`CsaMemory`](crate::csa::CsaMemory).

pub mod sim;

use core::fmt;

use tc_common::constants::{ICR_CCPN_MASK, ICR_IE};
use tc_common::CoreId;

use crate::csa::CsaMemory;

// ============================================================================
// Core special function registers
// ============================================================================

/// Core special function registers used by the port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreRegister {
    /// Previous context information (head of the call chain)
    Pcxi,
    /// Program status word
    Psw,
    /// Program counter
    Pc,
    /// System configuration (memory protection enable)
    Syscon,
    /// Core identification
    CoreId,
    /// Interrupt control (CCPN, IE)
    Icr,
    /// Free context list head
    Fcx,
    /// Free context list limit
    Lcx,
}

bitflags::bitflags! {
    /// Program status word
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Psw: u32 {
        /// Call depth counter; all ones disables call depth counting
        const CDC = 0x0000_007F;
        /// Call depth count enable
        const CDE = 1 << 7;
        /// Global address register write permission
        const GW = 1 << 8;
        /// Interrupt stack in use
        const IS = 1 << 9;
        /// IO privilege, low bit
        const IO0 = 1 << 10;
        /// IO privilege, high bit
        const IO1 = 1 << 11;
        /// Protection register set, low bit
        const PRS0 = 1 << 12;
        /// Protection register set, high bit
        const PRS1 = 1 << 13;
        /// Safe task identifier
        const S = 1 << 14;
    }
}

/// ICR field helpers
pub mod icr {
    use super::{ICR_CCPN_MASK, ICR_IE};

    /// Current CPU priority number
    #[must_use]
    pub const fn ccpn(icr: u32) -> u8 {
        (icr & ICR_CCPN_MASK) as u8
    }

    /// Global interrupt enable
    #[must_use]
    pub const fn ie(icr: u32) -> bool {
        icr & ICR_IE != 0
    }

    /// `icr` with its CCPN field replaced
    #[must_use]
    pub const fn with_ccpn(icr: u32, ccpn: u8) -> u32 {
        (icr & !ICR_CCPN_MASK) | ccpn as u32
    }

    /// `icr` with IE set or cleared
    #[must_use]
    pub const fn with_ie(icr: u32, ie: bool) -> u32 {
        if ie {
            icr | ICR_IE
        } else {
            icr & !ICR_IE
        }
    }
}

// ============================================================================
// Traps
// ============================================================================

/// Synchronous traps raised by the context instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trap {
    /// Context save with an empty free list (FCU)
    FreeContextListUnderflow,
    /// Context save consumed the LCX record (FCD)
    FreeContextListDepletion,
    /// Restore found an upper context where a lower was expected, or the
    /// other way round (CTYP)
    ContextType,
    /// Restore with no saved context (CSU)
    CallStackUnderflow,
    /// Link word names no record of the store
    DataAccess,
}

impl Trap {
    /// Trap class and identification number
    #[must_use]
    pub const fn class_tin(self) -> (u8, u8) {
        match self {
            Self::FreeContextListDepletion => (3, 1),
            Self::FreeContextListUnderflow => (3, 4),
            Self::CallStackUnderflow => (3, 5),
            Self::ContextType => (3, 6),
            Self::DataAccess => (4, 2),
        }
    }
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (class, tin) = self.class_tin();
        write!(f, "{self:?} (class {class}, tin {tin})")
    }
}

// ============================================================================
// CPU and timer seams
// ============================================================================

/// One TriCore CPU core as seen by the port
///
/// Context instructions take the record store explicitly. A core that
/// manages CSAs in hardware ignores it.
pub trait Cpu {
    /// Raw CORE_ID register value
    fn core_id(&self) -> u32 {
        self.mfcr(CoreRegister::CoreId)
    }

    /// Move from core register
    fn mfcr(&self, reg: CoreRegister) -> u32;

    /// Move to core register
    fn mtcr(&mut self, reg: CoreRegister, value: u32);

    /// Clear ICR.IE and return its previous value
    fn disable(&mut self) -> bool;

    /// Set ICR.IE
    fn enable(&mut self);

    /// Set ICR.IE back to a value returned by [`Cpu::disable`]
    fn restore(&mut self, enabled: bool) {
        if enabled {
            self.enable();
        }
    }

    /// Data synchronization barrier
    fn dsync(&mut self);

    /// Instruction synchronization barrier
    fn isync(&mut self);

    /// Save the lower context to a fresh record and link it in front of PCXI
    ///
    /// # Errors
    /// Returns the trap the instruction raises.
    fn svlcx<M: CsaMemory>(&mut self, csa: &mut M) -> Result<(), Trap>;

    /// Restore the lower context named by PCXI and free its record
    ///
    /// # Errors
    /// Returns the trap the instruction raises.
    fn rslcx<M: CsaMemory>(&mut self, csa: &mut M) -> Result<(), Trap>;

    /// Return from call: jump to A11 and restore the upper context
    ///
    /// # Errors
    /// Returns the trap the instruction raises.
    fn ret<M: CsaMemory>(&mut self, csa: &mut M) -> Result<(), Trap>;

    /// Stop executing on this core
    fn park(&mut self) -> ! {
        loop {
            core::hint::spin_loop();
        }
    }
}

/// Per-core system timer compare channel
pub trait TickTimer {
    /// Counter frequency in Hz
    fn frequency(&self) -> u32;

    /// Arm the first compare `ticks` counts from now at `priority`
    fn init_compare(&mut self, core: CoreId, ticks: u32, priority: u8);

    /// Move the comparator `ticks` counts past its previous value
    fn increase_compare(&mut self, core: CoreId, ticks: u32);
}
