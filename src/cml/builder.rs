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


use crate::cml::CountMinLogSketch;
use crate::cml::DEFAULT_BASE;
use crate::cml::DEFAULT_COUNTER_BITS;
use crate::cml::DEFAULT_DELTA;
use crate::cml::DEFAULT_EPSILON;
use crate::error::Error;
use crate::hash::DEFAULT_HASH_SEED;

/// Builder for [`CountMinLogSketch`].
///
/// Width and depth are either given directly or derived from the `epsilon`
/// and `delta` bounds; an explicit value wins over the derived one. All
/// parameters are validated together by [`build`](Self::build).
///
/// # Examples
///
/// ```
/// use countminlog::cml::CountMinLogSketchBuilder;
///
/// let sketch = CountMinLogSketchBuilder::default()
///     .width(4096)
///     .delta(0.001)
///     .counter_bits(4)
///     .base(1.5)
///     .build()
///     .unwrap();
/// assert_eq!(sketch.width(), 4096);
/// assert_eq!(sketch.depth(), 7);
/// assert_eq!(sketch.counter_bits(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct CountMinLogSketchBuilder {
    width: Option<usize>,
    depth: Option<usize>,
    epsilon: f64,
    delta: f64,
    counter_bits: u8,
    base: f64,
    seed: u32,
}

impl Default for CountMinLogSketchBuilder {
    fn default() -> Self {
        Self {
            width: None,
            depth: None,
            epsilon: DEFAULT_EPSILON,
            delta: DEFAULT_DELTA,
            counter_bits: DEFAULT_COUNTER_BITS,
            base: DEFAULT_BASE,
            seed: DEFAULT_HASH_SEED,
        }
    }
}

impl CountMinLogSketchBuilder {
    /// Sets the number of counters per row, overriding `epsilon`.
    pub fn width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    /// Sets the number of rows, overriding `delta`.
    pub fn depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Sets the relative error bound used to derive the width.
    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Sets the failure probability used to derive the depth.
    pub fn delta(mut self, delta: f64) -> Self {
        self.delta = delta;
        self
    }

    /// Sets the bits per counter (4, 8, 16 or 32).
    pub fn counter_bits(mut self, counter_bits: u8) -> Self {
        self.counter_bits = counter_bits;
        self
    }

    /// Sets the growth base of the counter law.
    pub fn base(mut self, base: f64) -> Self {
        self.base = base;
        self
    }

    /// Sets the hash seed.
    ///
    /// Sketches built with different seeds place keys in different cells.
    pub fn seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    /// Builds the sketch.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidParameters`](crate::error::ErrorKind::InvalidParameters)
    /// describing the first parameter found out of range.
    pub fn build(self) -> Result<CountMinLogSketch, Error> {
        let width = match self.width {
            Some(width) => width,
            None => CountMinLogSketch::suggest_width(self.epsilon)?,
        };
        let depth = match self.depth {
            Some(depth) => depth,
            None => CountMinLogSketch::suggest_depth(self.delta)?,
        };
        CountMinLogSketch::from_parts(width, depth, self.counter_bits, self.base, self.seed)
    }
}
