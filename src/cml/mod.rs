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


//! Count-Min-Log sketch implementation for frequency estimation.
//!
//! A Count-Min-Log sketch is a count-min sketch whose counters hold the
//! exponent of a logarithmic count instead of the count itself. With `b`-bit
//! counters and growth base `x`, a counter at `v` stands for
//! `(x^v - 1) / (x - 1)` occurrences and advances with probability `x^-v`.
//! Small counts stay close to exact while a 16-bit counter spans about eleven
//! orders of magnitude.
//!
//! Updates use the conservative rule: only counters at the minimum among the
//! key's rows are offered an increment. Queries return the smallest decoded
//! counter.
//!
//! # Usage
//!
//! ```rust
//! use countminlog::cml::CountMinLogSketch;
//!
//! let sketch = CountMinLogSketch::for_epsilon_delta(0.001, 0.01).unwrap();
//!
//! for _ in 0..5 {
//!     sketch.increase_count(b"apple");
//! }
//! sketch.increase_count(b"banana");
//!
//! assert!(sketch.frequency(b"apple") >= sketch.frequency(b"banana"));
//! assert_eq!(sketch.frequency(b"cherry"), 0.0);
//! ```
//!
//! # Counter Widths
//!
//! | bits | max raw value | max estimate at base 1.00026 |
//! |------|---------------|------------------------------|
//! | 4    | 15            | ~15                          |
//! | 8    | 255           | ~264                         |
//! | 16   | 65 535        | ~9.6e10                      |
//!
//! Wider ranges at small widths come from a larger base:
//!
//! ```rust
//! use countminlog::cml::CountMinLogSketch;
//!
//! let sketch = CountMinLogSketch::with_base(1 << 16, 4, 8, 1.08).unwrap();
//! assert!(sketch.max_frequency() > 1e9);
//! ```

mod builder;
mod codec;
mod registers;
mod sketch;
mod update;

pub use self::builder::CountMinLogSketchBuilder;
pub use self::codec::CounterCodec;
pub use self::registers::SUPPORTED_COUNTER_BITS;
pub use self::sketch::CountMinLogSketch;

/// Default relative error bound.
pub const DEFAULT_EPSILON: f64 = 0.0001;

/// Default failure probability.
pub const DEFAULT_DELTA: f64 = 0.01;

/// Default bits per counter.
pub const DEFAULT_COUNTER_BITS: u8 = 16;

/// Default growth base of the counter law.
pub const DEFAULT_BASE: f64 = 1.00026;
