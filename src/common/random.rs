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


//! Shared random utilities for sketches.

use std::cell::Cell;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

const GOLDEN_GAMMA: u64 = 0x9e3779b97f4a7c15;

/// 2^-53, the spacing of doubles in `[0.5, 1)`.
const F64_UNIT: f64 = 1.0 / (1u64 << 53) as f64;

/// Random number source for sketches.
pub trait RandomSource {
    /// Returns the next random 64-bit value.
    fn next_u64(&mut self) -> u64;

    /// Returns a uniform value in `[0, 1)` built from the top 53 bits of
    /// [`next_u64`](Self::next_u64).
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * F64_UNIT
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn next_u64(&mut self) -> u64 {
        (**self).next_u64()
    }
}

/// Xorshift-based random generator for sketch operations.
#[derive(Debug, Clone, Copy)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Creates a new generator using the provided seed.
    pub fn seeded(seed: u64) -> Self {
        let state = if seed == 0 { GOLDEN_GAMMA } else { seed };
        Self { state }
    }
}

impl Default for XorShift64 {
    fn default() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        Self::seeded(nanos as u64 ^ (std::process::id() as u64))
    }
}

impl RandomSource for XorShift64 {
    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

/// A source whose every draw is zero.
///
/// Zero is below every increment probability, so a sketch driven by this
/// source increments each selected counter on every request and behaves like a
/// deterministic conservative-update count-min sketch over register values.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroSource;

impl RandomSource for ZeroSource {
    fn next_u64(&mut self) -> u64 {
        0
    }
}

// Threads created within the same clock tick must not share a stream.
static NEXT_STREAM: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static THREAD_RNG: Cell<XorShift64> = Cell::new(thread_seeded());
}

fn thread_seeded() -> XorShift64 {
    let stream = NEXT_STREAM.fetch_add(GOLDEN_GAMMA, Ordering::Relaxed);
    let base = XorShift64::default().state;
    XorShift64::seeded(splitmix64(base ^ stream))
}

fn splitmix64(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(GOLDEN_GAMMA);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

/// Handle to the calling thread's generator.
///
/// Each thread lazily owns an independently seeded [`XorShift64`]; draws
/// through this handle advance it in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_u64(&mut self) -> u64 {
        THREAD_RNG.with(|cell| {
            let mut rng = cell.get();
            let value = rng.next_u64();
            cell.set(rng);
            value
        })
    }
}
