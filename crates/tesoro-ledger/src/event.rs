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

use crate::pool::{PoolError, RewardPool};
use tesoro_kernel::{Amount, BlockNumber, CommissionRate, DelegatorId};

/// One entry of a pool's ordered input stream. Events for one pool must
/// arrive in non-decreasing block order, and every event dated to block B
/// before the `BlockProduced` notification for B; [`RewardPool`] asserts this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolEvent {
    Join {
        delegator: DelegatorId,
        block: BlockNumber,
        new_total_stake: Amount,
    },
    Unstake {
        delegator: DelegatorId,
        block: BlockNumber,
        amount: Amount,
    },
    Withdraw {
        delegator: DelegatorId,
        block: BlockNumber,
        limit: Amount,
    },
    BlockProduced {
        block: BlockNumber,
        reward: Amount,
    },
    CommissionChange {
        rate: CommissionRate,
        block: BlockNumber,
    },
}

impl PoolEvent {
    pub fn block(&self) -> BlockNumber {
        match self {
            PoolEvent::Join { block, .. }
            | PoolEvent::Unstake { block, .. }
            | PoolEvent::Withdraw { block, .. }
            | PoolEvent::BlockProduced { block, .. }
            | PoolEvent::CommissionChange { block, .. } => *block,
        }
    }
}

/// An outbound value transfer owed by the host after an event was applied.
///
/// Effects are returned as data once all ledger fields hold their
/// post-operation values, never dispatched from within the pool: a transfer
/// that re-enters the pool can only observe a self-consistent ledger and
/// cannot extract more than is owed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Transfer settled rewards to a delegator.
    PayReward {
        delegator: DelegatorId,
        amount: Amount,
    },
    /// Return unstaked principal to a delegator.
    ReleaseStake {
        delegator: DelegatorId,
        amount: Amount,
    },
}

impl RewardPool {
    /// Apply one event of the input stream, returning the outbound effects the
    /// host must execute. Zero-amount effects are elided.
    pub fn apply(&mut self, event: &PoolEvent) -> Result<Vec<Effect>, PoolError> {
        match *event {
            PoolEvent::Join {
                delegator,
                block,
                new_total_stake,
            } => {
                self.on_join(delegator, block, new_total_stake)?;
                Ok(vec![])
            }
            PoolEvent::Unstake {
                delegator,
                block,
                amount,
            } => {
                let released = self.unstake(delegator, block, amount)?;
                Ok(vec![Effect::ReleaseStake {
                    delegator,
                    amount: released,
                }])
            }
            PoolEvent::Withdraw {
                delegator,
                block,
                limit,
            } => {
                let released = self.on_withdraw(delegator, block, limit)?;
                if released == 0 {
                    Ok(vec![])
                } else {
                    Ok(vec![Effect::PayReward {
                        delegator,
                        amount: released,
                    }])
                }
            }
            PoolEvent::BlockProduced { block, reward } => {
                self.on_block(block, reward)?;
                Ok(vec![])
            }
            PoolEvent::CommissionChange { rate, block } => {
                self.on_commission_change(rate, block)?;
                Ok(vec![])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tesoro_kernel::CommissionRate;

    fn delegator(tag: u8) -> DelegatorId {
        DelegatorId::new([tag; 32])
    }

    fn block(number: u64) -> BlockNumber {
        BlockNumber::new(number)
    }

    #[test]
    fn a_stream_of_events_produces_the_owed_transfers() {
        let mut pool = RewardPool::new(CommissionRate::zero());
        let a = delegator(1);

        let stream = [
            PoolEvent::Join {
                delegator: a,
                block: block(1),
                new_total_stake: 10,
            },
            PoolEvent::BlockProduced {
                block: block(2),
                reward: 1000,
            },
            PoolEvent::Unstake {
                delegator: a,
                block: block(3),
                amount: 4,
            },
            PoolEvent::Withdraw {
                delegator: a,
                block: block(4),
                limit: Amount::MAX,
            },
        ];

        let effects = stream
            .iter()
            .map(|event| pool.apply(event))
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert_eq!(
            effects,
            vec![
                vec![],
                vec![],
                vec![Effect::ReleaseStake {
                    delegator: a,
                    amount: 4
                }],
                vec![Effect::PayReward {
                    delegator: a,
                    amount: 1000
                }],
            ]
        );
    }

    #[test]
    fn zero_amount_withdrawals_emit_no_effect() {
        let mut pool = RewardPool::new(CommissionRate::zero());

        let effects = pool
            .apply(&PoolEvent::Withdraw {
                delegator: delegator(7),
                block: block(1),
                limit: 100,
            })
            .unwrap();

        assert_eq!(effects, vec![]);
    }

    #[test]
    fn a_failed_event_reports_the_underlying_error() {
        let mut pool = RewardPool::new(CommissionRate::zero());

        let result = pool.apply(&PoolEvent::Unstake {
            delegator: delegator(1),
            block: block(1),
            amount: 5,
        });

        assert!(matches!(result, Err(PoolError::Precondition(_))));
    }

    #[test]
    fn events_expose_their_block() {
        let event = PoolEvent::BlockProduced {
            block: block(42),
            reward: 1,
        };
        assert_eq!(event.block(), block(42));
    }
}
