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


//! The update rule: conservative selection followed by probabilistic advance.

use crate::cml::codec::CounterCodec;
use crate::cml::registers::RegisterArray;

/// Decides whether a request advances a counter.
///
/// A counter at `v` moves to `v + 1` when the uniform `draw` falls below
/// `base^-v`. Saturated counters never move.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ProbabilisticIncrementer<'a> {
    codec: &'a CounterCodec,
}

impl<'a> ProbabilisticIncrementer<'a> {
    pub fn new(codec: &'a CounterCodec) -> Self {
        Self { codec }
    }

    pub fn try_increment(&self, value: u32, draw: f64) -> u32 {
        if value >= self.codec.max_value() {
            return value;
        }
        if draw < self.codec.increment_probability(value) {
            value + 1
        } else {
            value
        }
    }
}

/// Restricts an update to the counters at the row minimum.
///
/// Counters above the minimum already carry weight from colliding keys;
/// advancing them would only widen the overestimate.
#[derive(Debug)]
pub(crate) struct ConservativeUpdatePolicy<'a> {
    registers: &'a RegisterArray,
    incrementer: ProbabilisticIncrementer<'a>,
}

impl<'a> ConservativeUpdatePolicy<'a> {
    pub fn new(registers: &'a RegisterArray, codec: &'a CounterCodec) -> Self {
        Self {
            registers,
            incrementer: ProbabilisticIncrementer::new(codec),
        }
    }

    /// Offers one increment request to the cells of a key.
    ///
    /// Cells are selected from a single snapshot of their values. Each selected
    /// cell is then advanced atomically: if a concurrent writer moved it in the
    /// meantime, the decision is re-taken against the value actually found
    /// rather than overwriting that writer's increment. Every selected cell sees
    /// the same `draw`, which keeps rows that agree on a key's count in lockstep.
    ///
    /// Returns the number of cells advanced.
    pub fn apply(&self, cells: impl Iterator<Item = (usize, usize)>, draw: f64) -> usize {
        let snapshot: Vec<(usize, usize, u32)> = cells
            .map(|(row, column)| (row, column, self.registers.get(row, column)))
            .collect();
        let Some(minimum) = snapshot.iter().map(|&(_, _, value)| value).min() else {
            return 0;
        };
        if minimum >= self.registers.max_value() {
            tracing::trace!(minimum, "count-min-log counters saturated");
            return 0;
        }

        let mut advanced = 0;
        for &(row, column, value) in &snapshot {
            if value != minimum {
                continue;
            }
            let written = self.registers.update(row, column, |current| {
                let next = self.incrementer.try_increment(current, draw);
                (next != current).then_some(next)
            });
            if written.is_some() {
                advanced += 1;
            }
        }
        advanced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::random::RandomSource;
    use crate::common::random::XorShift64;

    fn codec(base: f64, registers: &RegisterArray) -> CounterCodec {
        CounterCodec::new(base, registers.max_value()).unwrap()
    }

    fn set(registers: &RegisterArray, row: usize, column: usize, value: u32) {
        registers.update(row, column, |_| Some(value));
    }

    #[test]
    fn test_try_increment_saturates() {
        let codec = CounterCodec::new(1.5, 15).unwrap();
        let incrementer = ProbabilisticIncrementer::new(&codec);
        assert_eq!(incrementer.try_increment(15, 0.0), 15);
        assert_eq!(incrementer.try_increment(14, 0.0), 15);
    }

    #[test]
    fn test_try_increment_threshold() {
        let codec = CounterCodec::new(2.0, 255).unwrap();
        let incrementer = ProbabilisticIncrementer::new(&codec);
        // p(0) = 1, p(1) = 0.5, p(2) = 0.25
        assert_eq!(incrementer.try_increment(0, 0.999), 1);
        assert_eq!(incrementer.try_increment(1, 0.49), 2);
        assert_eq!(incrementer.try_increment(1, 0.5), 1);
        assert_eq!(incrementer.try_increment(2, 0.24), 3);
        assert_eq!(incrementer.try_increment(2, 0.26), 2);
    }

    #[test]
    fn test_try_increment_frequency_matches_probability() {
        let codec = CounterCodec::new(1.1, 255).unwrap();
        let incrementer = ProbabilisticIncrementer::new(&codec);
        let mut rng = XorShift64::seeded(17);
        let trials = 100_000;
        let value = 10;
        let advanced = (0..trials)
            .filter(|_| incrementer.try_increment(value, rng.next_f64()) == value + 1)
            .count();
        let expected = codec.increment_probability(value) * trials as f64;
        assert!(
            (advanced as f64 - expected).abs() < 0.02 * trials as f64,
            "advanced {advanced}, expected {expected}"
        );
    }

    #[test]
    fn test_only_minimum_cells_advance() {
        let registers = RegisterArray::new(8, 3, 8).unwrap();
        let codec = codec(1.08, &registers);
        let policy = ConservativeUpdatePolicy::new(&registers, &codec);
        set(&registers, 0, 1, 4);
        set(&registers, 1, 6, 2);
        set(&registers, 2, 3, 2);

        let cells = [(0, 1), (1, 6), (2, 3)];
        assert_eq!(policy.apply(cells.into_iter(), 0.0), 2);
        assert_eq!(registers.get(0, 1), 4);
        assert_eq!(registers.get(1, 6), 3);
        assert_eq!(registers.get(2, 3), 3);

        // 4, 3, 3 -> 4, 4, 4 -> 5, 5, 5
        assert_eq!(policy.apply(cells.into_iter(), 0.0), 2);
        assert_eq!(policy.apply(cells.into_iter(), 0.0), 3);
        assert_eq!(registers.get(0, 1), 5);
        assert_eq!(registers.get(1, 6), 5);
        assert_eq!(registers.get(2, 3), 5);
    }

    #[test]
    fn test_rejected_draw_changes_nothing() {
        let registers = RegisterArray::new(4, 2, 8).unwrap();
        let codec = codec(2.0, &registers);
        let policy = ConservativeUpdatePolicy::new(&registers, &codec);
        set(&registers, 0, 0, 3);
        set(&registers, 1, 0, 3);
        // p(3) = 0.125
        assert_eq!(policy.apply([(0, 0), (1, 0)].into_iter(), 0.2), 0);
        assert_eq!(registers.get(0, 0), 3);
        assert_eq!(registers.get(1, 0), 3);
        assert_eq!(policy.apply([(0, 0), (1, 0)].into_iter(), 0.1), 2);
    }

    #[test]
    fn test_colliding_key_does_not_advance_private_row() {
        // key a -> (0,0) (1,0) (2,5); key b -> (0,0) (1,0) (2,7)
        let registers = RegisterArray::new(8, 3, 16).unwrap();
        let codec = codec(1.00026, &registers);
        let policy = ConservativeUpdatePolicy::new(&registers, &codec);
        let a = [(0, 0), (1, 0), (2, 5)];
        let b = [(0, 0), (1, 0), (2, 7)];

        for _ in 0..10 {
            policy.apply(a.into_iter(), 0.0);
        }
        assert_eq!(registers.get(2, 5), 10);
        for _ in 0..25 {
            policy.apply(b.into_iter(), 0.0);
        }
        // b's private row catches up to the shared cells first, then all advance together
        assert_eq!(registers.get(2, 7), 25);
        assert_eq!(registers.get(0, 0), 25);
        assert_eq!(registers.get(1, 0), 25);
        assert_eq!(registers.get(2, 5), 10, "a's private row must not move on b's updates");
    }

    #[test]
    fn test_saturated_cells_are_skipped() {
        let registers = RegisterArray::new(2, 2, 4).unwrap();
        let codec = codec(1.5, &registers);
        let policy = ConservativeUpdatePolicy::new(&registers, &codec);
        set(&registers, 0, 1, 15);
        set(&registers, 1, 0, 15);
        assert_eq!(policy.apply([(0, 1), (1, 0)].into_iter(), 0.0), 0);
        assert_eq!(registers.get(0, 1), 15);
    }

    #[test]
    fn test_concurrent_keys_sharing_words() {
        // one 16-bit row of width 4 is exactly one word; thread t owns column t
        let registers = RegisterArray::new(4, 3, 16).unwrap();
        let codec = codec(1.00026, &registers);
        std::thread::scope(|scope| {
            for column in 0..4 {
                let registers = &registers;
                let codec = &codec;
                scope.spawn(move || {
                    let policy = ConservativeUpdatePolicy::new(registers, codec);
                    let cells = [(0, column), (1, column), (2, column)];
                    for _ in 0..500 {
                        policy.apply(cells.into_iter(), 0.0);
                    }
                });
            }
        });
        for row in 0..3 {
            for column in 0..4 {
                assert_eq!(registers.get(row, column), 500);
            }
        }
    }
}
