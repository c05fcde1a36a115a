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


use std::f64::consts::E;
use std::fmt;

use crate::cml::CountMinLogSketchBuilder;
use crate::cml::DEFAULT_BASE;
use crate::cml::DEFAULT_DELTA;
use crate::cml::DEFAULT_EPSILON;
use crate::cml::codec::CounterCodec;
use crate::cml::registers::RegisterArray;
use crate::cml::update::ConservativeUpdatePolicy;
use crate::common::random::RandomSource;
use crate::common::random::ThreadRandom;
use crate::error::Error;
use crate::hash::DEFAULT_HASH_SEED;
use crate::hash::HashFamily;

/// Count-Min-Log sketch for approximate frequency estimation.
///
/// Keys are opaque byte strings. Each key maps to one counter per row; a
/// counter stores the exponent of a logarithmic count, so a few bits cover
/// many orders of magnitude. Updates only touch the key's minimum counters
/// and advance them with probability `base^-v`.
///
/// Both [`increase_count`](Self::increase_count) and
/// [`frequency`](Self::frequency) take `&self`; the sketch can be shared
/// between threads as is.
pub struct CountMinLogSketch {
    hashes: HashFamily,
    codec: CounterCodec,
    registers: RegisterArray,
}

impl CountMinLogSketch {
    /// Creates a sketch with explicit dimensions and the default base.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidParameters`](crate::error::ErrorKind::InvalidParameters)
    /// if `width` or `depth` is zero or `counter_bits` is not one of 4, 8, 16
    /// or 32.
    ///
    /// # Examples
    ///
    /// ```
    /// use countminlog::cml::CountMinLogSketch;
    ///
    /// let sketch = CountMinLogSketch::new(2048, 4, 8).unwrap();
    /// assert_eq!(sketch.width(), 2048);
    /// assert_eq!(sketch.depth(), 4);
    /// assert_eq!(sketch.max_counter_value(), 255);
    /// ```
    pub fn new(width: usize, depth: usize, counter_bits: u8) -> Result<Self, Error> {
        Self::with_base(width, depth, counter_bits, DEFAULT_BASE)
    }

    /// Creates a sketch with explicit dimensions and growth base.
    ///
    /// A base closer to one keeps small counts exact; a larger base reaches
    /// higher counts with the same number of bits.
    ///
    /// # Errors
    ///
    /// In addition to the checks of [`new`](Self::new), fails if `base` is not
    /// a finite number above one or if the largest counter value would decode
    /// to infinity.
    ///
    /// # Examples
    ///
    /// ```
    /// use countminlog::cml::CountMinLogSketch;
    ///
    /// let sketch = CountMinLogSketch::with_base(1024, 3, 8, 1.08).unwrap();
    /// assert!(sketch.max_frequency() > 1e8);
    ///
    /// // 1.08^65535 does not fit in an f64
    /// assert!(CountMinLogSketch::with_base(1024, 3, 16, 1.08).is_err());
    /// ```
    pub fn with_base(
        width: usize,
        depth: usize,
        counter_bits: u8,
        base: f64,
    ) -> Result<Self, Error> {
        Self::from_parts(width, depth, counter_bits, base, DEFAULT_HASH_SEED)
    }

    /// Creates a 16-bit sketch sized for relative error `epsilon` with
    /// probability at least `1 - delta`.
    ///
    /// # Errors
    ///
    /// Fails if either bound is outside the open interval `(0, 1)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use countminlog::cml::CountMinLogSketch;
    ///
    /// let sketch = CountMinLogSketch::for_epsilon_delta(0.01, 0.05).unwrap();
    /// assert_eq!(sketch.width(), 272);
    /// assert_eq!(sketch.depth(), 3);
    ///
    /// assert!(CountMinLogSketch::for_epsilon_delta(0.0, 0.05).is_err());
    /// ```
    pub fn for_epsilon_delta(epsilon: f64, delta: f64) -> Result<Self, Error> {
        CountMinLogSketchBuilder::default()
            .epsilon(epsilon)
            .delta(delta)
            .build()
    }

    /// Creates a sketch with the crate defaults: `epsilon = 0.0001`,
    /// `delta = 0.01`, 16-bit counters and base `1.00026`.
    pub fn default_sketch() -> Result<Self, Error> {
        Self::for_epsilon_delta(DEFAULT_EPSILON, DEFAULT_DELTA)
    }

    /// Returns a builder for creating a sketch.
    ///
    /// # Examples
    ///
    /// ```
    /// use countminlog::cml::CountMinLogSketch;
    ///
    /// let sketch = CountMinLogSketch::builder()
    ///     .epsilon(0.001)
    ///     .depth(4)
    ///     .counter_bits(8)
    ///     .base(1.08)
    ///     .seed(7)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(sketch.width(), 2719);
    /// assert_eq!(sketch.depth(), 4);
    /// assert_eq!(sketch.seed(), 7);
    /// ```
    pub fn builder() -> CountMinLogSketchBuilder {
        CountMinLogSketchBuilder::default()
    }

    pub(crate) fn from_parts(
        width: usize,
        depth: usize,
        counter_bits: u8,
        base: f64,
        seed: u32,
    ) -> Result<Self, Error> {
        let registers = RegisterArray::new(width, depth, counter_bits)?;
        let codec = CounterCodec::new(base, registers.max_value())
            .map_err(|err| err.with_context("counter_bits", counter_bits))?;
        let hashes = HashFamily::new(seed, width, depth);

        tracing::debug!(
            width,
            depth,
            counter_bits,
            base,
            seed,
            bytes = registers.memory_bytes(),
            "created count-min-log sketch"
        );

        Ok(Self {
            hashes,
            codec,
            registers,
        })
    }

    /// Width needed for relative error `epsilon`: `ceil(e / epsilon)`.
    ///
    /// # Errors
    ///
    /// Fails if `epsilon` is outside `(0, 1)`.
    pub fn suggest_width(epsilon: f64) -> Result<usize, Error> {
        if !(epsilon > 0.0 && epsilon < 1.0) {
            return Err(Error::invalid_parameters("epsilon must be in (0, 1)")
                .with_context("epsilon", epsilon));
        }
        Ok((E / epsilon).ceil() as usize)
    }

    /// Depth needed for failure probability `delta`: `ceil(ln(1 / delta))`.
    ///
    /// # Errors
    ///
    /// Fails if `delta` is outside `(0, 1)`.
    pub fn suggest_depth(delta: f64) -> Result<usize, Error> {
        if !(delta > 0.0 && delta < 1.0) {
            return Err(
                Error::invalid_parameters("delta must be in (0, 1)").with_context("delta", delta)
            );
        }
        Ok((1.0 / delta).ln().ceil().max(1.0) as usize)
    }

    // ========================================================================
    // Update and Query
    // ========================================================================

    /// Records one occurrence of `key`.
    ///
    /// Randomness comes from a generator owned by the calling thread.
    ///
    /// # Examples
    ///
    /// ```
    /// use countminlog::cml::CountMinLogSketch;
    ///
    /// let sketch = CountMinLogSketch::default_sketch().unwrap();
    /// for _ in 0..5 {
    ///     sketch.increase_count(b"cookie:42/strategy:7");
    /// }
    /// assert!(sketch.frequency(b"cookie:42/strategy:7") >= 1.0);
    /// ```
    pub fn increase_count(&self, key: impl AsRef<[u8]>) {
        self.increase_count_with(key, &mut ThreadRandom);
    }

    /// Records one occurrence of `key`, drawing randomness from `rng`.
    ///
    /// # Examples
    ///
    /// ```
    /// use countminlog::cml::CountMinLogSketch;
    /// use countminlog::common::random::ZeroSource;
    ///
    /// let sketch = CountMinLogSketch::default_sketch().unwrap();
    /// for _ in 0..5 {
    ///     sketch.increase_count_with(b"key", &mut ZeroSource);
    /// }
    /// assert_eq!(sketch.frequency(b"key") as u64, 5);
    /// ```
    pub fn increase_count_with<R: RandomSource + ?Sized>(
        &self,
        key: impl AsRef<[u8]>,
        rng: &mut R,
    ) {
        let draw = rng.next_f64();
        let cells = self.hashes.indices(key.as_ref());
        ConservativeUpdatePolicy::new(&self.registers, &self.codec).apply(cells, draw);
    }

    /// Estimated number of occurrences of `key`.
    ///
    /// The estimate is the smallest decoded counter across rows. It never
    /// exceeds [`max_frequency`](Self::max_frequency).
    pub fn frequency(&self, key: impl AsRef<[u8]>) -> f64 {
        // decode is monotone, so the smallest counter decodes to the smallest estimate
        let minimum = self
            .hashes
            .indices(key.as_ref())
            .map(|(row, column)| self.registers.get(row, column))
            .min()
            .unwrap_or(0);
        self.codec.decode(minimum)
    }

    /// Zeroes every counter.
    pub fn reset(&mut self) {
        self.registers.clear();
    }

    // ========================================================================
    // Parameters
    // ========================================================================

    /// Counters per row.
    pub fn width(&self) -> usize {
        self.registers.width()
    }

    /// Number of rows.
    pub fn depth(&self) -> usize {
        self.registers.depth()
    }

    /// Bits per counter.
    pub fn counter_bits(&self) -> u8 {
        self.registers.counter_bits()
    }

    pub fn base(&self) -> f64 {
        self.codec.base()
    }

    pub fn seed(&self) -> u32 {
        self.hashes.seed()
    }

    /// Largest raw counter value, `2^counter_bits - 1`.
    pub fn max_counter_value(&self) -> u32 {
        self.registers.max_value()
    }

    /// Largest estimate the sketch can return.
    pub fn max_frequency(&self) -> f64 {
        self.codec.decode(self.registers.max_value())
    }

    /// Relative error bound implied by the width: `e / width`.
    pub fn relative_error(&self) -> f64 {
        E / self.width() as f64
    }

    /// Probability that an estimate stays within the error bound:
    /// `1 - e^-depth`.
    pub fn confidence(&self) -> f64 {
        1.0 - (-(self.depth() as f64)).exp()
    }

    /// Bytes allocated for the counters.
    pub fn memory_bytes(&self) -> usize {
        self.registers.memory_bytes()
    }

    /// The counter law used to decode estimates.
    pub fn codec(&self) -> &CounterCodec {
        &self.codec
    }
}

impl fmt::Debug for CountMinLogSketch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountMinLogSketch")
            .field("width", &self.width())
            .field("depth", &self.depth())
            .field("counter_bits", &self.counter_bits())
            .field("base", &self.base())
            .field("seed", &self.seed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::random::XorShift64;
    use crate::common::random::ZeroSource;

    #[test]
    fn test_suggestions() {
        assert_eq!(CountMinLogSketch::suggest_width(0.01).unwrap(), 272);
        assert_eq!(CountMinLogSketch::suggest_width(0.0001).unwrap(), 27183);
        assert_eq!(CountMinLogSketch::suggest_depth(0.05).unwrap(), 3);
        assert_eq!(CountMinLogSketch::suggest_depth(0.01).unwrap(), 5);
        assert_eq!(CountMinLogSketch::suggest_depth(0.99).unwrap(), 1);
        assert!(CountMinLogSketch::suggest_width(f64::NAN).is_err());
        assert!(CountMinLogSketch::suggest_depth(1.0).is_err());
    }

    #[test]
    fn test_frequency_of_unseen_key_is_zero() {
        let sketch = CountMinLogSketch::new(64, 3, 8).unwrap();
        assert_eq!(sketch.frequency(b"never seen"), 0.0);
        assert_eq!(sketch.frequency(b""), 0.0);
    }

    #[test]
    fn test_rows_stay_in_lockstep_for_isolated_key() {
        let sketch = CountMinLogSketch::with_base(1 << 12, 4, 8, 1.3).unwrap();
        let mut rng = XorShift64::seeded(99);
        for _ in 0..300 {
            sketch.increase_count_with(b"solo", &mut rng);
        }
        let values: Vec<u32> = sketch
            .hashes
            .indices(b"solo")
            .map(|(row, column)| sketch.registers.get(row, column))
            .collect();
        assert!(values.windows(2).all(|w| w[0] == w[1]), "{values:?}");
    }

    #[test]
    fn test_reset_clears_counts() {
        let mut sketch = CountMinLogSketch::new(32, 2, 4).unwrap();
        for _ in 0..7 {
            sketch.increase_count_with(b"k", &mut ZeroSource);
        }
        assert!(sketch.frequency(b"k") > 0.0);
        sketch.reset();
        assert_eq!(sketch.frequency(b"k"), 0.0);
    }

    #[test]
    fn test_debug_lists_parameters() {
        let sketch = CountMinLogSketch::new(10, 2, 8).unwrap();
        let rendered = format!("{sketch:?}");
        assert!(rendered.contains("width: 10"));
        assert!(rendered.contains("counter_bits: 8"));
    }
}
