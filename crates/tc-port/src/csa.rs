// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Context Save Area store
//!
//! A CSA is a 16-word record. Free records form a singly linked list whose
//! head lives in the FCX register; a suspended task is a chain of records
//! starting at its lower context. Records are named by link words, not
//! addresses: the low 20 bits carry the record identifier and the bits above
//! carry tags (`PCXI.UL`, `PCXI.PIE`, `PCXI.PCPN`).
//!
//! On the host the store is a [`CsaArena`], where slot `i` is identifier
//! `i + 1` and identifier 0 terminates a chain.

use core::fmt;

use tc_common::constants::{
    CSAS_PER_TASK, CSA_WORDS, FCX_MASK, MAX_CSA_ID, PCXI_PCPN_MASK, PCXI_PCPN_SHIFT, PCXI_PIE,
    PCXI_UL,
};
use tc_common::{Error, Result};

/// Word offsets inside an upper context record
pub mod upper {
    /// Link to the previous context
    pub const PCXI: usize = 0;
    /// Program status word
    pub const PSW: usize = 1;
    /// A10, the stack pointer
    pub const A10: usize = 2;
    /// A11, the return address
    pub const A11: usize = 3;
    /// D8 (D9 to D11 follow)
    pub const D8: usize = 4;
    /// A12 (A13 to A15 follow)
    pub const A12: usize = 8;
    /// D12 (D13 to D15 follow)
    pub const D12: usize = 12;
}

/// Word offsets inside a lower context record
pub mod lower {
    /// Link to the previous context
    pub const PCXI: usize = 0;
    /// A11, the return address (task entry for a new context)
    pub const A11: usize = 1;
    /// A2
    pub const A2: usize = 2;
    /// A3
    pub const A3: usize = 3;
    /// D0 (D1 to D3 follow)
    pub const D0: usize = 4;
    /// A4 (A5 to A7 follow); A4 carries the task argument
    pub const A4: usize = 8;
    /// D4 (D5 to D7 follow)
    pub const D4: usize = 12;
}

/// A tagged link word naming a context record
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CsaLink(u32);

impl CsaLink {
    /// The chain terminator
    pub const NULL: Self = Self(0);

    /// Wrap a raw link word (as read from FCX, PCXI or a record's word 0)
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw link word including tags
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Record identifier without tags
    #[must_use]
    pub const fn id(self) -> u32 {
        self.0 & FCX_MASK
    }

    /// Check if the link terminates a chain
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.id() == 0
    }

    /// Same record, tags cleared
    #[must_use]
    pub const fn untagged(self) -> Self {
        Self(self.id())
    }

    /// Check the `UL` tag (link names an upper context)
    #[must_use]
    pub const fn is_upper(self) -> bool {
        self.0 & PCXI_UL != 0
    }

    /// Previous interrupt enable carried by the link
    #[must_use]
    pub const fn pie(self) -> bool {
        self.0 & PCXI_PIE != 0
    }

    /// Previous CPU priority number carried by the link
    #[must_use]
    pub const fn pcpn(self) -> u8 {
        ((self.0 >> PCXI_PCPN_SHIFT) & PCXI_PCPN_MASK) as u8
    }

    /// Build a tagged link the way a context save does
    #[must_use]
    pub const fn tagged(id: u32, upper: bool, pie: bool, pcpn: u8) -> Self {
        let mut raw = id & FCX_MASK;
        if upper {
            raw |= PCXI_UL;
        }
        if pie {
            raw |= PCXI_PIE;
        }
        raw |= (pcpn as u32 & PCXI_PCPN_MASK) << PCXI_PCPN_SHIFT;
        Self(raw)
    }

    /// Arena slot for this link, if it names a record
    #[must_use]
    pub const fn slot(self) -> Option<usize> {
        match self.id() {
            0 => None,
            id => Some(id as usize - 1),
        }
    }
}

impl fmt::Debug for CsaLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CsaLink({:#07X}", self.id())?;
        if self.0 & !FCX_MASK != 0 {
            write!(f, " tags={:#010X}", self.0 & !FCX_MASK)?;
        }
        f.write_str(")")
    }
}

/// One 16-word context save area
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Csa {
    words: [u32; CSA_WORDS],
}

impl Csa {
    /// An all-zero record
    pub const ZERO: Self = Self {
        words: [0; CSA_WORDS],
    };

    /// Link stored in word 0
    #[must_use]
    pub const fn link(&self) -> CsaLink {
        CsaLink(self.words[0])
    }

    /// Overwrite word 0
    pub fn set_link(&mut self, link: CsaLink) {
        self.words[0] = link.0;
    }

    /// Read a word; offsets past the record read as zero
    #[must_use]
    pub fn word(&self, index: usize) -> u32 {
        self.words.get(index).copied().unwrap_or(0)
    }

    /// Write a word; offsets past the record are ignored
    pub fn set_word(&mut self, index: usize, value: u32) {
        if let Some(word) = self.words.get_mut(index) {
            *word = value;
        }
    }

    /// All sixteen words
    #[must_use]
    pub const fn words(&self) -> &[u32; CSA_WORDS] {
        &self.words
    }

    /// Mutable access to all sixteen words
    pub fn words_mut(&mut self) -> &mut [u32; CSA_WORDS] {
        &mut self.words
    }

    /// Zero every word
    pub fn clear(&mut self) {
        self.words = [0; CSA_WORDS];
    }
}

impl Default for Csa {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Debug for Csa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Csa")
            .field("link", &self.link())
            .field("words", &&self.words[1..])
            .finish()
    }
}

/// Record storage addressed by link words
///
/// The port reads and writes records only through this trait. On silicon an
/// implementation converts the identifier to a segment address; on the host
/// [`CsaArena`] indexes an array.
pub trait CsaMemory {
    /// Number of records in the store
    fn capacity(&self) -> usize;

    /// Record named by `link` (tags ignored)
    fn record(&self, link: CsaLink) -> Option<&Csa>;

    /// Mutable record named by `link` (tags ignored)
    fn record_mut(&mut self, link: CsaLink) -> Option<&mut Csa>;

    /// Check if `link` names a record of this store
    fn contains(&self, link: CsaLink) -> bool {
        self.record(link).is_some()
    }
}

/// Fixed pool of `N` context records owned by one core
pub struct CsaArena<const N: usize> {
    records: [Csa; N],
}

impl<const N: usize> CsaArena<N> {
    /// Create a zeroed arena
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: [Csa::ZERO; N],
        }
    }

    /// Link every record into one free list
    ///
    /// Returns `(fcx, lcx)`: the list head and the record whose consumption
    /// raises the depletion trap. With `reserve == 0` no depletion record is
    /// set and `lcx` is null. Otherwise `reserve` records remain on the list
    /// once the `lcx` record has been taken.
    ///
    /// # Errors
    /// `StoreTooSmall` if the arena cannot hold one task context plus the
    /// reserve, or has more records than link words can name.
    pub fn format(&mut self, reserve: usize) -> Result<(CsaLink, CsaLink)> {
        if N < CSAS_PER_TASK + reserve || N > MAX_CSA_ID as usize {
            return Err(Error::StoreTooSmall);
        }

        for (slot, record) in self.records.iter_mut().enumerate() {
            record.clear();
            let next = if slot + 1 < N { slot as u32 + 2 } else { 0 };
            record.set_link(CsaLink(next));
        }

        let fcx = CsaLink(1);
        let lcx = if reserve == 0 {
            CsaLink::NULL
        } else {
            CsaLink((N - reserve) as u32)
        };
        Ok((fcx, lcx))
    }
}

impl<const N: usize> Default for CsaArena<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> CsaMemory for CsaArena<N> {
    fn capacity(&self) -> usize {
        N
    }

    fn record(&self, link: CsaLink) -> Option<&Csa> {
        link.slot().and_then(|slot| self.records.get(slot))
    }

    fn record_mut(&mut self, link: CsaLink) -> Option<&mut Csa> {
        link.slot().and_then(|slot| self.records.get_mut(slot))
    }
}
