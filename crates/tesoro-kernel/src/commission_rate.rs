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

use crate::Amount;
use std::fmt;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvalidCommissionRate {
    #[error("commission rate has a zero denominator")]
    ZeroDenominator,
    #[error("commission rate {numerator}/{denominator} is greater than one")]
    GreaterThanOne { numerator: u64, denominator: u64 },
}

/// The operator's share of pool rewards, as a rational number in [0, 1].
///
/// Validated at construction; a value of this type is always a well-formed
/// rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct CommissionRate {
    numerator: u64,
    denominator: u64,
}

impl CommissionRate {
    pub fn new(numerator: u64, denominator: u64) -> Result<Self, InvalidCommissionRate> {
        if denominator == 0 {
            return Err(InvalidCommissionRate::ZeroDenominator);
        }
        if numerator > denominator {
            return Err(InvalidCommissionRate::GreaterThanOne {
                numerator,
                denominator,
            });
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    pub const fn zero() -> Self {
        Self {
            numerator: 0,
            denominator: 1,
        }
    }

    pub fn numerator(&self) -> u64 {
        self.numerator
    }

    pub fn denominator(&self) -> u64 {
        self.denominator
    }

    /// The commission levied on `amount`, truncated toward zero. The remainder
    /// `amount - levy` is what gets shared amongst delegators.
    ///
    /// Exact in `u128`: `amount × numerator` is at most `(2^64 - 1)^2`.
    pub fn levy(&self, amount: Amount) -> Amount {
        let levied = amount as u128 * self.numerator as u128 / self.denominator as u128;
        // levy <= amount because numerator <= denominator.
        levied as Amount
    }
}

impl fmt::Display for CommissionRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use tests::any_commission_rate;

#[cfg(any(test, feature = "test-utils"))]
mod tests {
    use super::*;
    use proptest::prelude::*;

    prop_compose! {
        pub fn any_commission_rate()(
            denominator in 1u64..=10_000,
        )(
            numerator in 0..=denominator,
            denominator in Just(denominator),
        ) -> CommissionRate {
            // Cannot fail: the numerator is drawn below the denominator.
            CommissionRate::new(numerator, denominator)
                .unwrap_or_else(|_| CommissionRate::zero())
        }
    }
}
