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

use num::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(any(test, feature = "test-utils"))]
use proptest::prelude::{Arbitrary, BoxedStrategy, Strategy};

/// Number of decimal digits carried by a [`FixedDecimal`].
///
/// Ledger amounts fit in a `u64` and the circulating supply is capped below
/// 2^56 indivisible units, so one unit divided across the largest possible
/// pool is at least 10^-17. Eighteen digits therefore represent every such
/// division with a full digit to spare, while `u64::MAX × 10^18` still fits
/// comfortably within the `u128` backing word.
pub const DECIMALS: u32 = 18;

const SCALE: u128 = 10u128.pow(DECIMALS);

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ArithmeticError {
    #[error("result exceeds the representable range")]
    Overflow,
    #[error("subtraction below zero")]
    Underflow,
    #[error("division by zero")]
    DivisionByZero,
}

/// An exact, non-negative decimal number with [`DECIMALS`] fractional digits,
/// backed by a `u128`.
///
/// All operations are explicit and fallible where the representable range can
/// be exceeded; nothing ever wraps silently. Multiplication and division widen
/// through [`BigUint`] and truncate toward zero, so repeated rounding can only
/// lose value, never invent it.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct FixedDecimal(u128);

impl FixedDecimal {
    pub const ZERO: FixedDecimal = FixedDecimal(0);

    /// Lift a whole number of units. Total: `u64::MAX × 10^18 < u128::MAX`.
    pub fn from_integer(n: u64) -> Self {
        FixedDecimal(n as u128 * SCALE)
    }

    /// The truncated quotient `numerator / denominator`.
    pub fn from_ratio(numerator: u64, denominator: u64) -> Result<Self, ArithmeticError> {
        if denominator == 0 {
            return Err(ArithmeticError::DivisionByZero);
        }
        Ok(FixedDecimal(
            numerator as u128 * SCALE / denominator as u128,
        ))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: &Self) -> Result<Self, ArithmeticError> {
        self.0
            .checked_add(other.0)
            .map(FixedDecimal)
            .ok_or(ArithmeticError::Overflow)
    }

    pub fn checked_sub(&self, other: &Self) -> Result<Self, ArithmeticError> {
        self.0
            .checked_sub(other.0)
            .map(FixedDecimal)
            .ok_or(ArithmeticError::Underflow)
    }

    /// The product `self × other`, truncated toward zero back to single scale.
    ///
    /// The double-scale intermediate is carried by a [`BigUint`], so the only
    /// failure mode is a final value past the backing word.
    pub fn mul_truncate(&self, other: &Self) -> Result<Self, ArithmeticError> {
        let wide = BigUint::from(self.0) * BigUint::from(other.0) / BigUint::from(SCALE);
        u128::try_from(wide)
            .map(FixedDecimal)
            .map_err(|_| ArithmeticError::Overflow)
    }

    /// The quotient `self / other`, truncated toward zero.
    pub fn div_truncate(&self, other: &Self) -> Result<Self, ArithmeticError> {
        if other.0 == 0 {
            return Err(ArithmeticError::DivisionByZero);
        }
        let wide = BigUint::from(self.0) * BigUint::from(SCALE) / BigUint::from(other.0);
        u128::try_from(wide)
            .map(FixedDecimal)
            .map_err(|_| ArithmeticError::Overflow)
    }

    /// Truncate to a whole number of units.
    pub fn to_integer_floor(&self) -> Result<u64, ArithmeticError> {
        u64::try_from(self.0 / SCALE).map_err(|_| ArithmeticError::Overflow)
    }
}

impl fmt::Display for FixedDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let integer = self.0 / SCALE;
        let fraction = self.0 % SCALE;
        if fraction == 0 {
            write!(f, "{integer}")
        } else {
            let digits = format!("{fraction:0width$}", width = DECIMALS as usize);
            write!(f, "{integer}.{}", digits.trim_end_matches('0'))
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Arbitrary for FixedDecimal {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (0..u128::MAX / SCALE).prop_map(FixedDecimal).boxed()
    }
}
