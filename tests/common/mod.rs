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


//! Key construction shared by the integration tests.

/// Builds a 24-byte key: a 16-byte digest of the cookie id followed by the
/// strategy id in ASCII, zero padded.
pub fn cookie_strategy_key(cookie: u32, strategy: u32) -> [u8; 24] {
    let (h1, h2) = mur3::murmurhash3_x64_128(cookie.to_string().as_bytes(), 0);
    let mut key = [0u8; 24];
    key[..8].copy_from_slice(&h1.to_le_bytes());
    key[8..16].copy_from_slice(&h2.to_le_bytes());
    let strategy = strategy.to_string();
    let len = strategy.len().min(8);
    key[16..16 + len].copy_from_slice(&strategy.as_bytes()[..len]);
    key
}

/// Every cookie × strategy key, cookie-major.
pub fn cookie_strategy_keys(
    num_cookies: u32,
    num_strategies: u32,
) -> impl Iterator<Item = [u8; 24]> {
    (0..num_cookies).flat_map(move |cookie| {
        (0..num_strategies).map(move |strategy| cookie_strategy_key(cookie, strategy))
    })
}
