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


//! Register index derivation.
//!
//! A key is hashed once with 128-bit MurmurHash3; the two 64-bit halves act as
//! the independent base hashes `h1` and `h2` of a double-hashing scheme, so the
//! index of row `i` is `(h1 + i * h2) mod width`.

/// Seed used when the caller does not choose one.
pub const DEFAULT_HASH_SEED: u32 = 9001;

/// Derives `depth` column indices in `[0, width)` from a key.
///
/// The derivation is a pure function of `(seed, key, row)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashFamily {
    seed: u32,
    width: u64,
    depth: usize,
}

impl HashFamily {
    /// Creates a family over a `depth × width` grid.
    ///
    /// `width` must be non-zero; the sketch validates this before construction.
    pub fn new(seed: u32, width: usize, depth: usize) -> Self {
        debug_assert!(width > 0, "width must be non-zero");
        Self {
            seed,
            width: width as u64,
            depth,
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Returns the column index for every row, in row order.
    pub fn indices(&self, key: &[u8]) -> RowIndices {
        let (h1, h2) = mur3::murmurhash3_x64_128(key, self.seed);
        RowIndices {
            h1,
            h2,
            width: self.width,
            row: 0,
            depth: self.depth,
        }
    }
}

/// Iterator over `(row, column)` pairs for one key.
#[derive(Debug, Clone)]
pub struct RowIndices {
    h1: u64,
    h2: u64,
    width: u64,
    row: usize,
    depth: usize,
}

impl Iterator for RowIndices {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.row >= self.depth {
            return None;
        }
        let row = self.row;
        let combined = self.h1.wrapping_add((row as u64).wrapping_mul(self.h2));
        self.row += 1;
        Some((row, (combined % self.width) as usize))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.depth - self.row;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RowIndices {}
