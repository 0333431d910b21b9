// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Architectural constants for the TriCore scheduling port
//!
//! Register encodings and fixed sizes used by the context store, the switch
//! protocol and the tick interrupt. Values follow the TriCore 1.6 core
//! architecture.

// =============================================================================
// Context Save Areas
// =============================================================================

/// Number of 32-bit words in one context save area
pub const CSA_WORDS: usize = 16;

/// Identifier bits of a context link word (segment and offset)
pub const FCX_MASK: u32 = 0x000F_FFFF;

/// Largest identifier a link word can carry
pub const MAX_CSA_ID: u32 = FCX_MASK;

/// Context records needed to hold one suspended task (lower + upper)
pub const CSAS_PER_TASK: usize = 2;

// =============================================================================
// PCXI (Previous Context Information)
// =============================================================================

/// PCXI.UL: the linked context is an upper context
pub const PCXI_UL: u32 = 1 << 20;

/// PCXI.PIE: previous interrupt enable
pub const PCXI_PIE: u32 = 1 << 21;

/// PCXI.PCPN shift (previous CPU priority number)
pub const PCXI_PCPN_SHIFT: u32 = 22;

/// PCXI.PCPN mask (after shifting)
pub const PCXI_PCPN_MASK: u32 = 0xFF;

/// Link word stored in a freshly built lower context: upper, interrupts on
pub const INITIAL_PCXI_UPPER_CONTEXT_WORD: u32 = PCXI_UL | PCXI_PIE;

// =============================================================================
// PSW (Program Status Word)
// =============================================================================

/// Supervisor mode, register set 0, call depth counting disabled
pub const SYSTEM_PROGRAM_STATUS_WORD: u32 = 0x0000_08FF;

/// IO level 1, register set 1, call depth counting disabled
pub const INITIAL_PRIVILEGED_PROGRAM_STATUS_WORD: u32 = 0x0000_14FF;

/// IO level 0, register set 1, call depth counting disabled
pub const INITIAL_UNPRIVILEGED_PROGRAM_STATUS_WORD: u32 = 0x0000_10FF;

// =============================================================================
// ICR (Interrupt Control Register) and SYSCON
// =============================================================================

/// ICR.CCPN mask (current CPU priority number)
pub const ICR_CCPN_MASK: u32 = 0x0000_00FF;

/// ICR.IE: global interrupt enable
pub const ICR_IE: u32 = 1 << 15;

/// SYSCON value loaded at scheduler start (memory protection off)
pub const INITIAL_SYSCON: u32 = 0x0000_0000;

// =============================================================================
// Scheduling
// =============================================================================

/// Maximum number of CPU cores served by one port instance
pub const MAX_CORES: usize = 6;

/// Hardware CORE_ID value of the sixth CPU core
pub const LAST_CORE_HW_ID: u32 = 6;

/// Hardware CORE_ID value that does not belong to a CPU core
pub const NON_CPU_CORE_HW_ID: u32 = 5;

/// Syscall trap identifier for a voluntary task yield
pub const SYSCALL_TASK_YIELD: u32 = 0;

/// Default priority of the system timer compare interrupt
pub const DEFAULT_TICK_INTERRUPT_PRIORITY: u8 = 40;

/// Default ceiling for interrupts allowed to call kernel services
pub const DEFAULT_MAX_SYSCALL_INTERRUPT_PRIORITY: u8 = 64;

/// Default tick rate (1000 Hz = 1ms tick)
pub const DEFAULT_TICK_RATE_HZ: u32 = 1000;

/// Default system timer frequency (100 MHz)
pub const DEFAULT_STM_FREQUENCY_HZ: u32 = 100_000_000;
