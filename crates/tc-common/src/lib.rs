// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! TriCore port common library
//!
//! Types, error definitions, configuration and the per-core event log shared
//! by the scheduling port and the kernel that drives it.
//!
//! # Features
//!
//! - `std`: Enable standard library support (disabled by default for embedded)
//! - `defmt`: Enable defmt formatting of errors for on-target debugging
//!
//! No heap allocations are performed. Buffers use fixed-size arrays or
//! heapless collections.

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(feature = "std")]
extern crate std;

pub mod config;
pub mod constants;
pub mod errors;
pub mod log;
pub mod time;
pub mod types;

pub use config::PortConfig;
pub use errors::{Error, Result};
pub use log::{LogBuffer, LogEntry, LogLevel};
pub use time::Ticks;
pub use types::*;
