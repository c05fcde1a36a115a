// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.


//! Bit-packed `depth × width` grid of saturating counters.
//!
//! Cells are laid out row-major and packed `64 / bits` to an [`AtomicU64`]
//! word, low bits first. Every supported width divides 64, so no cell straddles
//! a word and each cell update is a single compare-and-swap on its word.

use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use crate::error::Error;

/// Register widths, in bits, that tile a 64-bit word.
pub const SUPPORTED_COUNTER_BITS: [u8; 4] = [4, 8, 16, 32];

const MAX_REGISTER_BYTES: usize = 1 << 35; // 32 GiB

pub(crate) struct RegisterArray {
    words: Box<[AtomicU64]>,
    width: usize,
    depth: usize,
    bits: u32,
    /// log2 of cells per word
    cells_shift: u32,
    mask: u64,
}

impl RegisterArray {
    pub fn new(width: usize, depth: usize, counter_bits: u8) -> Result<Self, Error> {
        if width == 0 {
            return Err(
                Error::invalid_parameters("width must be at least 1").with_context("width", width)
            );
        }
        if depth == 0 {
            return Err(
                Error::invalid_parameters("depth must be at least 1").with_context("depth", depth)
            );
        }
        if !SUPPORTED_COUNTER_BITS.contains(&counter_bits) {
            return Err(Error::invalid_parameters(format!(
                "counter bits must be one of {SUPPORTED_COUNTER_BITS:?}"
            ))
            .with_context("counter_bits", counter_bits));
        }
        let num_cells = width.checked_mul(depth).ok_or_else(|| {
            Error::invalid_parameters("width * depth overflows the address space")
                .with_context("width", width)
                .with_context("depth", depth)
        })?;

        let bits = counter_bits as u32;
        let cells_shift = (u64::BITS / bits).trailing_zeros();
        let num_words = num_cells.div_ceil(1 << cells_shift);
        if num_words > MAX_REGISTER_BYTES / size_of::<u64>() {
            return Err(Error::invalid_parameters(format!(
                "registers would exceed {MAX_REGISTER_BYTES} bytes"
            ))
            .with_context("width", width)
            .with_context("depth", depth)
            .with_context("counter_bits", counter_bits));
        }
        let words = (0..num_words).map(|_| AtomicU64::new(0)).collect();

        Ok(Self {
            words,
            width,
            depth,
            bits,
            cells_shift,
            mask: u64::MAX >> (u64::BITS - bits),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn counter_bits(&self) -> u8 {
        self.bits as u8
    }

    /// Largest value a cell can hold.
    pub fn max_value(&self) -> u32 {
        self.mask as u32
    }

    /// Bytes held by the packed words.
    pub fn memory_bytes(&self) -> usize {
        self.words.len() * size_of::<u64>()
    }

    /// Maps a cell to its word index and bit offset within that word.
    #[inline]
    fn locate(&self, row: usize, column: usize) -> (usize, u32) {
        debug_assert!(row < self.depth && column < self.width);
        let cell = row * self.width + column;
        let lane = cell & ((1 << self.cells_shift) - 1);
        (cell >> self.cells_shift, lane as u32 * self.bits)
    }

    #[inline]
    pub fn get(&self, row: usize, column: usize) -> u32 {
        let (word, shift) = self.locate(row, column);
        ((self.words[word].load(Ordering::Relaxed) >> shift) & self.mask) as u32
    }

    /// Atomically replaces the cell value `v` with `f(v)`.
    ///
    /// `f` is re-evaluated against the freshly observed value whenever another
    /// writer changed the containing word first. Returning `None` leaves the
    /// cell untouched. Returns the value written, if any.
    pub fn update(&self, row: usize, column: usize, f: impl Fn(u32) -> Option<u32>) -> Option<u32> {
        let (word, shift) = self.locate(row, column);
        let slot = &self.words[word];
        let mut current = slot.load(Ordering::Relaxed);
        loop {
            let value = ((current >> shift) & self.mask) as u32;
            let next = f(value)?;
            debug_assert!(next as u64 <= self.mask, "{next} does not fit in {} bits", self.bits);
            let updated = (current & !(self.mask << shift)) | ((next as u64) << shift);
            match slot.compare_exchange_weak(
                current,
                updated,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Some(next),
                Err(actual) => current = actual,
            }
        }
    }

    /// Zeroes every cell.
    pub fn clear(&mut self) {
        for word in self.words.iter_mut() {
            *word.get_mut() = 0;
        }
    }
}

impl fmt::Debug for RegisterArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterArray")
            .field("width", &self.width)
            .field("depth", &self.depth)
            .field("bits", &self.bits)
            .field("words", &self.words.len())
            .finish()
    }
}
