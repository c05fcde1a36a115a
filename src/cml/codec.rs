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


//! The logarithmic counter law.
//!
//! A register holding `v` stands for `(base^v - 1) / (base - 1)` observations.
//! Advancing from `v` to `v + 1` adds `base^v` to that value, so incrementing
//! with probability `base^-v` keeps the decoded value an unbiased estimate of
//! the number of increment requests.

use crate::error::Error;

/// Maps register values to approximate counts and back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterCodec {
    base: f64,
    ln_base: f64,
    max_value: u32,
}

impl CounterCodec {
    /// Creates the codec for counters holding at most `max_value`.
    ///
    /// Fails when `base` is not a finite number above one, or when the largest
    /// register value would decode to a non-finite count.
    pub fn new(base: f64, max_value: u32) -> Result<Self, Error> {
        if !base.is_finite() || base <= 1.0 {
            return Err(Error::invalid_parameters("base must be a finite number greater than 1")
                .with_context("base", base));
        }
        let codec = Self {
            base,
            ln_base: base.ln(),
            max_value,
        };
        let ceiling = codec.decode(max_value);
        if !ceiling.is_finite() {
            return Err(Error::invalid_parameters(
                "base is too large for the counter width: the largest counter value overflows",
            )
            .with_context("base", base)
            .with_context("max_value", max_value));
        }
        Ok(codec)
    }

    pub fn base(&self) -> f64 {
        self.base
    }

    /// Largest register value.
    pub fn max_value(&self) -> u32 {
        self.max_value
    }

    /// Approximate count represented by register value `value`.
    ///
    /// `decode(0) == 0`, `decode(1) == 1`, and the function is strictly
    /// increasing.
    pub fn decode(&self, value: u32) -> f64 {
        if value == 0 {
            return 0.0;
        }
        (value as f64 * self.ln_base).exp_m1() / (self.base - 1.0)
    }

    /// Register value whose decoded count is nearest to `count`, clamped to
    /// `[0, max_value]`.
    pub fn encode(&self, count: f64) -> u32 {
        if count.is_nan() || count <= 0.0 {
            return 0;
        }
        let exact = (count * (self.base - 1.0)).ln_1p() / self.ln_base;
        let below = (exact.floor() as u64).min(self.max_value as u64) as u32;
        if below == self.max_value {
            return below;
        }
        // the law is not linear, so compare in count space
        let above = below + 1;
        if count - self.decode(below) <= self.decode(above) - count {
            below
        } else {
            above
        }
    }

    /// Probability that a request advances a counter currently at `value`.
    pub fn increment_probability(&self, value: u32) -> f64 {
        (-(value as f64) * self.ln_base).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(base: f64, bits: u32) -> CounterCodec {
        let max_value = ((1u64 << bits) - 1) as u32;
        CounterCodec::new(base, max_value).unwrap()
    }

    #[test]
    fn test_decode_first_values() {
        let codec = codec(1.08, 8);
        assert_eq!(codec.decode(0), 0.0);
        assert!((codec.decode(1) - 1.0).abs() < 1e-12);
        assert!((codec.decode(2) - 2.08).abs() < 1e-12);
        assert!((codec.decode(3) - (1.0 + 1.08 + 1.08 * 1.08)).abs() < 1e-12);
    }

    #[test]
    fn test_decode_strictly_increasing() {
        for (base, bits) in [(1.00026, 16), (1.08, 8), (1.5, 4), (1.00026, 8)] {
            let codec = codec(base, bits);
            let mut previous = codec.decode(0);
            for v in 1..=codec.max_value() {
                let current = codec.decode(v);
                assert!(current > previous, "decode({v}) not increasing for base {base}");
                previous = current;
            }
        }
    }

    #[test]
    fn test_encode_inverts_decode() {
        for (base, bits) in [(1.00026, 16), (1.08, 8), (1.5, 4), (1.3, 8)] {
            let codec = codec(base, bits);
            for v in 0..=codec.max_value() {
                assert_eq!(codec.encode(codec.decode(v)), v, "base {base}, value {v}");
            }
        }
    }

    #[test]
    fn test_encode_clamps() {
        let codec = codec(1.5, 4);
        assert_eq!(codec.encode(-3.0), 0);
        assert_eq!(codec.encode(f64::NAN), 0);
        assert_eq!(codec.encode(f64::INFINITY), 15);
        assert_eq!(codec.encode(codec.decode(15) * 10.0), 15);
    }

    #[test]
    fn test_increment_probability_is_geometric() {
        let codec = codec(1.08, 8);
        assert_eq!(codec.increment_probability(0), 1.0);
        for v in 1..=50 {
            let expected = 1.08f64.powi(-(v as i32));
            assert!((codec.increment_probability(v) - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_expected_step_is_one_observation() {
        let codec = codec(1.08, 8);
        for v in 0..200 {
            let step = codec.decode(v + 1) - codec.decode(v);
            let expected = codec.increment_probability(v) * step;
            assert!((expected - 1.0).abs() < 1e-9, "value {v}: {expected}");
        }
    }

    #[test]
    fn test_rejects_invalid_base() {
        for base in [1.0, 0.5, -2.0, f64::NAN, f64::INFINITY] {
            assert!(CounterCodec::new(base, 255).is_err(), "base {base}");
        }
    }

    #[test]
    fn test_rejects_overflowing_ceiling() {
        // 1.08^65535 is far beyond f64::MAX
        assert!(CounterCodec::new(1.08, u16::MAX as u32).is_err());
        assert!(CounterCodec::new(1.00026, u16::MAX as u32).is_ok());
    }
}
