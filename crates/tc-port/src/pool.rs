// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Free-list allocator
//!
//! Acquires chains of records from the head of this core's free list and
//! splices chains back in front of it. Both run with interrupts disabled on
//! the core, which makes them indivisible with respect to its interrupt
//! handlers. Other cores never touch this list.

use tc_common::{Error, Result};

use crate::arch::{CoreRegister, Cpu};
use crate::csa::{CsaLink, CsaMemory};
use crate::fatal::FatalReason;
use crate::port::CorePort;

impl<C: Cpu, const N: usize> CorePort<C, N> {
    /// Detach `count` chained records from the head of the free list
    ///
    /// Returns the first record; its chain is `count` long and the last
    /// record's link is null. The free list is left untouched on failure.
    ///
    /// # Errors
    /// - `CsaExhausted` if fewer than `count` records are free
    /// - `InvalidContext` if the free list names a record outside the store
    pub(crate) fn acquire(&mut self, count: usize) -> Result<CsaLink> {
        let ie = self.cpu.disable();
        self.cpu.dsync();
        let result = self.detach_free(count);
        self.cpu.isync();
        self.cpu.restore(ie);
        result
    }

    fn detach_free(&mut self, count: usize) -> Result<CsaLink> {
        let head = CsaLink::from_raw(self.cpu.mfcr(CoreRegister::Fcx)).untagged();
        if count == 0 || head.is_null() {
            return Err(Error::CsaExhausted);
        }

        let mut tail = head;
        for _ in 1..count {
            let next = self.csa.record(tail).ok_or(Error::InvalidContext)?.link();
            if next.is_null() {
                return Err(Error::CsaExhausted);
            }
            tail = next.untagged();
        }

        let record = self.csa.record_mut(tail).ok_or(Error::InvalidContext)?;
        let rest = record.link();
        record.set_link(CsaLink::NULL);
        self.cpu.mtcr(CoreRegister::Fcx, rest.untagged().raw());
        Ok(head)
    }

    /// Splice the chain `head..=tail` in front of the free list
    ///
    /// The chain must be detached from every task and acyclic; `tail`'s link
    /// is overwritten.
    pub(crate) fn release(&mut self, head: CsaLink, tail: CsaLink) {
        let ie = self.cpu.disable();
        self.cpu.dsync();
        let free = CsaLink::from_raw(self.cpu.mfcr(CoreRegister::Fcx));
        let Some(record) = self.csa.record_mut(tail) else {
            self.fatal(FatalReason::InvalidContext);
        };
        record.set_link(free);
        self.cpu.dsync();
        self.cpu.mtcr(CoreRegister::Fcx, head.untagged().raw());
        self.cpu.isync();
        self.cpu.restore(ie);
    }

    /// Length of the chain starting at `head`, following links until null
    ///
    /// # Errors
    /// - `InvalidContext` if a link names a record outside the store
    /// - `CorruptChain` if the chain is longer than the store
    pub fn chain_len(&self, head: CsaLink) -> Result<usize> {
        let mut link = head;
        let mut len = 0;
        while !link.is_null() {
            if len == N {
                return Err(Error::CorruptChain);
            }
            link = self.csa.record(link).ok_or(Error::InvalidContext)?.link();
            len += 1;
        }
        Ok(len)
    }

    /// Count the records on the free list
    ///
    /// A free list that cannot be walked is fatal.
    pub fn free_records(&mut self) -> usize {
        let fcx = CsaLink::from_raw(self.cpu.mfcr(CoreRegister::Fcx));
        match self.chain_len(fcx) {
            Ok(count) => count,
            Err(Error::CorruptChain) => self.fatal(FatalReason::CorruptChain),
            Err(_) => self.fatal(FatalReason::InvalidContext),
        }
    }
}
