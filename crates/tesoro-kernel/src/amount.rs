// Copyright 2025 Tesoro Maintainers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// An amount of coins, in indivisible units.
pub type Amount = u64;

/// Maximum circulating supply, bounding every amount a pool can ever see.
pub const MAX_COIN_SUPPLY: Amount = 45_000_000_000_000_000;

#[cfg(any(test, feature = "test-utils"))]
pub use tests::any_amount;

#[cfg(any(test, feature = "test-utils"))]
mod tests {
    use super::*;
    use proptest::prelude::*;

    prop_compose! {
        pub fn any_amount()(amount in 0..=MAX_COIN_SUPPLY) -> Amount {
            amount
        }
    }
}
