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

use fixed_decimal::FixedDecimal;
use serde::ser::SerializeStruct;
use std::fmt;
use tesoro_kernel::Amount;

/// Aggregate view over a pool's ledger, consumed by the host to decide pool
/// activity/health policy (which lives outside this core).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolTotals {
    /// Sum of all live delegations' stake.
    pub accumulated_stake: Amount,

    /// Block rewards received but not yet folded into the ratio.
    pub pending_block_reward: Amount,

    /// The operator's settled, unwithdrawn share.
    pub accumulated_commission: Amount,

    /// Commission plus every delegation's settled, unwithdrawn rewards.
    pub outstanding_rewards: Amount,

    /// Cumulative reward per unit of stake since the pool's inception.
    pub current_ratio: FixedDecimal,
}

impl serde::Serialize for PoolTotals {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("PoolTotals", 5)?;
        s.serialize_field("accumulated_stake", &self.accumulated_stake)?;
        s.serialize_field("pending_block_reward", &self.pending_block_reward)?;
        s.serialize_field("accumulated_commission", &self.accumulated_commission)?;
        s.serialize_field("outstanding_rewards", &self.outstanding_rewards)?;
        s.serialize_field("current_ratio", &self.current_ratio.to_string())?;
        s.end()
    }
}

impl fmt::Display for PoolTotals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stake={} pending={} commission={} outstanding={} ratio={}",
            self.accumulated_stake,
            self.pending_block_reward,
            self.accumulated_commission,
            self.outstanding_rewards,
            self.current_ratio,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_the_ratio_as_a_decimal_string() {
        let totals = PoolTotals {
            accumulated_stake: 40,
            pending_block_reward: 0,
            accumulated_commission: 200,
            outstanding_rewards: 900,
            current_ratio: FixedDecimal::from_ratio(1, 2).unwrap(),
        };

        let json = serde_json::to_value(&totals).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "accumulated_stake": 40,
                "pending_block_reward": 0,
                "accumulated_commission": 200,
                "outstanding_rewards": 900,
                "current_ratio": "0.5",
            })
        );
    }
}
