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

use std::{
    fmt,
    ops::{Add, Sub},
    str::FromStr,
};

#[cfg(any(test, feature = "test-utils"))]
use proptest::prelude::{Arbitrary, BoxedStrategy, Strategy};

/// Height of a produced block. Blocks number the timeline along which stake
/// movements and rewards are ordered.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    PartialOrd,
    Ord,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[repr(transparent)]
pub struct BlockNumber(u64);

impl BlockNumber {
    pub fn new(number: u64) -> Self {
        Self(number)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BlockNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BlockNumber {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(BlockNumber)
    }
}

impl From<u64> for BlockNumber {
    fn from(number: u64) -> BlockNumber {
        BlockNumber(number)
    }
}

impl From<BlockNumber> for u64 {
    fn from(number: BlockNumber) -> u64 {
        number.0
    }
}

impl Add<u64> for BlockNumber {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        BlockNumber(self.0 + rhs)
    }
}

impl Sub<BlockNumber> for BlockNumber {
    type Output = u64;

    fn sub(self, rhs: BlockNumber) -> Self::Output {
        self.0 - rhs.0
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Arbitrary for BlockNumber {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (0..u64::MAX).prop_map(BlockNumber::from).boxed()
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use tests::any_block_number;

#[cfg(any(test, feature = "test-utils"))]
mod tests {
    use super::*;
    use proptest::prelude::*;

    prop_compose! {
        pub fn any_block_number()(number in any::<u64>()) -> BlockNumber {
            BlockNumber::from(number)
        }
    }
}
