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

//! The naive recomputation model, used only as a correctness oracle in tests.
//!
//! On every block it walks every delegator and credits its exact proportional
//! share, truncated. This is O(delegators) per block and therefore never on
//! the production path; its value is that it is obviously correct, so the
//! lazy ratio-accumulator implementation can be checked against it on
//! arbitrary event sequences.

use std::collections::BTreeMap;
use tesoro_kernel::{Amount, CommissionRate, DelegatorId};

#[derive(Debug, Default, Clone)]
struct ReferenceAccount {
    stake: Amount,
    rewards: Amount,
    withdrawn: Amount,
}

#[derive(Debug, Clone)]
pub struct ReferenceModel {
    commission_rate: CommissionRate,
    accumulated_commission: Amount,
    accounts: BTreeMap<DelegatorId, ReferenceAccount>,
}

impl ReferenceModel {
    pub fn new(commission_rate: CommissionRate) -> Self {
        Self {
            commission_rate,
            accumulated_commission: 0,
            accounts: BTreeMap::new(),
        }
    }

    /// Credit a block reward eagerly: commission first, then one truncated
    /// proportional share `stake_i × shared / total_stake` per delegator.
    pub fn on_block(&mut self, reward: Amount) {
        let total: u128 = self
            .accounts
            .values()
            .map(|account| account.stake as u128)
            .sum();
        assert!(total > 0, "a zero-stake pool cannot receive a reward");

        let commission = self.commission_rate.levy(reward);
        let shared = reward - commission;
        self.accumulated_commission += commission;

        for account in self.accounts.values_mut() {
            if account.stake > 0 {
                let share = account.stake as u128 * shared as u128 / total;
                account.rewards += share as Amount;
            }
        }
    }

    pub fn join(&mut self, delegator: DelegatorId, new_total_stake: Amount) {
        self.accounts.entry(delegator).or_default().stake = new_total_stake;
    }

    #[allow(clippy::expect_used)]
    pub fn unstake(&mut self, delegator: DelegatorId, amount: Amount) {
        let account = self
            .accounts
            .get_mut(&delegator)
            .expect("unstake from an unknown delegator");
        account.stake -= amount;
    }

    pub fn withdraw(&mut self, delegator: DelegatorId, limit: Amount) -> Amount {
        let Some(account) = self.accounts.get_mut(&delegator) else {
            return 0;
        };
        let released = limit.min(account.rewards);
        account.rewards -= released;
        account.withdrawn += released;
        released
    }

    pub fn set_commission_rate(&mut self, rate: CommissionRate) {
        self.commission_rate = rate;
    }

    pub fn stake_of(&self, delegator: &DelegatorId) -> Amount {
        self.accounts
            .get(delegator)
            .map(|account| account.stake)
            .unwrap_or(0)
    }

    pub fn rewards_of(&self, delegator: &DelegatorId) -> Amount {
        self.accounts
            .get(delegator)
            .map(|account| account.rewards)
            .unwrap_or(0)
    }

    pub fn withdrawn_of(&self, delegator: &DelegatorId) -> Amount {
        self.accounts
            .get(delegator)
            .map(|account| account.withdrawn)
            .unwrap_or(0)
    }

    pub fn accumulated_commission(&self) -> Amount {
        self.accumulated_commission
    }
}
