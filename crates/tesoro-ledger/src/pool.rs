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

use crate::summary::PoolTotals;
use fixed_decimal::{ArithmeticError, FixedDecimal};
use std::collections::BTreeMap;
use tesoro_kernel::{Amount, BlockNumber, CommissionRate, DelegatorId};
use thiserror::Error;
use tracing::{debug, info, trace};

const EVENT_TARGET: &str = "tesoro::ledger::pool";

// Errors
// ----------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Error)]
pub enum PreconditionViolation {
    #[error("stake must be strictly positive")]
    NonPositiveStake,

    #[error("block reward must be strictly positive")]
    NonPositiveReward,

    #[error("unstake amount must be strictly positive")]
    NonPositiveUnstake,

    #[error("unstake of {requested} exceeds the {available} staked by {delegator}")]
    UnstakeExceedsStake {
        delegator: DelegatorId,
        requested: Amount,
        available: Amount,
    },

    #[error("no live delegation for {delegator}")]
    UnknownDelegation { delegator: DelegatorId },

    #[error("event at block {block} arrived after an event at block {latest}")]
    NonMonotonicBlock {
        block: BlockNumber,
        latest: BlockNumber,
    },

    #[error("event dated block {block} arrived after the reward for block {rewarded}")]
    StakeChangeAfterReward {
        block: BlockNumber,
        rewarded: BlockNumber,
    },

    #[error("a second reward arrived for block {block}")]
    DuplicateBlockReward { block: BlockNumber },
}

/// Defensive checks on the pool's own bookkeeping. Any of these firing means
/// the ledger is corrupt, not that the caller misbehaved.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("pending reward of {pending} with no stake at flush time")]
    PendingRewardWithoutStake { pending: Amount },

    #[error("accumulated stake underflow")]
    AccumulatedStakeUnderflow,

    #[error("outstanding rewards underflow")]
    OutstandingRewardsUnderflow,
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error(transparent)]
    Precondition(#[from] PreconditionViolation),

    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

fn checked_add(left: Amount, right: Amount) -> Result<Amount, ArithmeticError> {
    left.checked_add(right).ok_or(ArithmeticError::Overflow)
}

// Delegation
// ----------------------------------------------------------------------------

/// The pool-side record of one delegator's position.
///
/// A record is created on first join with no history; every subsequent
/// join/leave fully settles it and replaces it. Once the stake is fully
/// released, the record lingers (with `stake == 0`) until its settled rewards
/// are withdrawn down to zero, at which point it is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delegation {
    /// Principal currently staked. Zero only for fully-unstaked records that
    /// still hold settled rewards.
    stake: Amount,

    /// The pool's cumulative reward ratio at the moment this record was
    /// (re)created. Rewards earned before that moment are already settled.
    starting_ratio: FixedDecimal,

    /// Block at which this record was (re)created.
    starting_block: BlockNumber,

    /// Rewards earned and settled, not yet withdrawn.
    settled_rewards: Amount,
}

impl Delegation {
    pub fn stake(&self) -> Amount {
        self.stake
    }

    pub fn starting_block(&self) -> BlockNumber {
        self.starting_block
    }

    pub fn settled_rewards(&self) -> Amount {
        self.settled_rewards
    }

    /// Reward accrued since the snapshot was taken: `stake × (ratio now −
    /// ratio at snapshot)`, truncated toward zero so rounding always favors
    /// the pool.
    ///
    /// This is the single settlement computation shared by join, leave and
    /// withdraw. When the ratio has not moved since the snapshot (e.g. a
    /// same-block join-then-leave), it yields exactly zero.
    fn unsettled_since(&self, current_ratio: &FixedDecimal) -> Result<Amount, ArithmeticError> {
        let progress = current_ratio.checked_sub(&self.starting_ratio)?;
        FixedDecimal::from_integer(self.stake)
            .mul_truncate(&progress)?
            .to_integer_floor()
    }
}

// Aggregates
// ----------------------------------------------------------------------------

/// The pool's scalar bookkeeping, kept separate from the delegation map so
/// operations can stage every fallible computation on a copy and commit it in
/// one assignment. A failed operation therefore observably mutates nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Aggregates {
    /// Sum of all live delegations' stake.
    accumulated_stake: Amount,

    /// Cumulative reward per unit of stake since the pool's inception.
    /// Non-decreasing; unchanged across any period with zero stake.
    current_ratio: FixedDecimal,

    /// Block rewards received but not yet folded into the ratio.
    pending_block_reward: Amount,

    /// The operator's settled, unwithdrawn share.
    accumulated_commission: Amount,

    /// Conservation counter: `accumulated_commission` plus every delegation's
    /// settled, unwithdrawn rewards.
    outstanding_rewards: Amount,
}

impl Aggregates {
    fn new() -> Self {
        Self {
            accumulated_stake: 0,
            current_ratio: FixedDecimal::ZERO,
            pending_block_reward: 0,
            accumulated_commission: 0,
            outstanding_rewards: 0,
        }
    }

    /// Fold the pending reward into the cumulative ratio, levying commission
    /// at the given rate first. Settling a delegation without flushing first
    /// would charge the pending reward to the wrong period, so every
    /// settlement path goes through here.
    fn flush(&mut self, rate: &CommissionRate) -> Result<Amount, PoolError> {
        if self.pending_block_reward == 0 {
            return Ok(0);
        }
        if self.accumulated_stake == 0 {
            return Err(InvariantViolation::PendingRewardWithoutStake {
                pending: self.pending_block_reward,
            }
            .into());
        }

        let flushed = self.pending_block_reward;
        let commission = rate.levy(flushed);
        let shared = flushed - commission;

        self.current_ratio = self
            .current_ratio
            .checked_add(&FixedDecimal::from_ratio(shared, self.accumulated_stake)?)?;
        self.accumulated_commission = checked_add(self.accumulated_commission, commission)?;
        self.outstanding_rewards = checked_add(self.outstanding_rewards, commission)?;
        self.pending_block_reward = 0;

        Ok(flushed)
    }

    /// Settle a delegation against the (already flushed) ratio: credit its
    /// accrued reward to the outstanding counter and release its stake from
    /// the pool total. Returns the accrued reward; the caller decides what the
    /// replacement record looks like.
    fn settle(&mut self, delegation: &Delegation) -> Result<Amount, PoolError> {
        let unsettled = delegation.unsettled_since(&self.current_ratio)?;
        self.outstanding_rewards = checked_add(self.outstanding_rewards, unsettled)?;
        self.accumulated_stake = self
            .accumulated_stake
            .checked_sub(delegation.stake)
            .ok_or(InvariantViolation::AccumulatedStakeUnderflow)?;
        Ok(unsettled)
    }
}

// RewardPool
// ----------------------------------------------------------------------------

/// One pool's reward ledger: the cumulative-ratio accumulator, the per
/// delegator records, and the ordering watermarks for the host's event
/// stream.
///
/// The host serializes calls per pool; each operation is a single atomic
/// transition that either fully applies or fails leaving the state untouched.
/// Outbound value transfers are *returned* to the host (as amounts and
/// [`crate::event::Effect`]s), never performed from within, so a reentrant
/// call can only ever observe fully-updated balances.
pub struct RewardPool {
    commission_rate: CommissionRate,
    aggregates: Aggregates,
    delegations: BTreeMap<DelegatorId, Delegation>,

    /// Lifetime withdrawn totals. Survives the removal of a drained
    /// delegation record.
    withdrawn: BTreeMap<DelegatorId, Amount>,

    /// Highest block number seen from any event.
    last_event_block: Option<BlockNumber>,

    /// Highest block number for which a reward notification has arrived.
    /// Events dated at or below this watermark are contract violations: every
    /// event dated to block B must be delivered before the reward for B.
    last_reward_block: Option<BlockNumber>,
}

impl RewardPool {
    pub fn new(commission_rate: CommissionRate) -> Self {
        Self {
            commission_rate,
            aggregates: Aggregates::new(),
            delegations: BTreeMap::new(),
            withdrawn: BTreeMap::new(),
            last_event_block: None,
            last_reward_block: None,
        }
    }

    // Operations ─────────────────────────────────────────────────────────────

    /// Record the reward for a produced block.
    ///
    /// Deliberately touches `pending_block_reward` only: folding into the
    /// ratio is deferred to the next settlement, so N consecutive blocks cost
    /// O(1) total rather than O(N).
    pub fn on_block(&mut self, block: BlockNumber, reward: Amount) -> Result<(), PoolError> {
        self.assert_reward_order(block)?;
        if reward == 0 {
            return Err(PreconditionViolation::NonPositiveReward.into());
        }

        let pending = checked_add(self.aggregates.pending_block_reward, reward)?;

        self.aggregates.pending_block_reward = pending;
        self.last_event_block = Some(block);
        self.last_reward_block = Some(block);

        trace!(target: EVENT_TARGET, %block, %reward, %pending, "pool.block");
        Ok(())
    }

    /// (Re)delegate, setting the delegator's staked principal to
    /// `new_total_stake`.
    ///
    /// An existing live delegation is first settled and released, so the new
    /// record starts a fresh period at the current ratio. Settled rewards are
    /// carried over, untouched.
    pub fn on_join(
        &mut self,
        delegator: DelegatorId,
        block: BlockNumber,
        new_total_stake: Amount,
    ) -> Result<(), PoolError> {
        self.assert_event_order(block)?;
        if new_total_stake == 0 {
            return Err(PreconditionViolation::NonPositiveStake.into());
        }

        let mut aggregates = self.aggregates;
        aggregates.flush(&self.commission_rate)?;

        let settled_rewards = match self.delegations.get(&delegator) {
            Some(previous) if previous.stake > 0 => {
                let unsettled = aggregates.settle(previous)?;
                checked_add(previous.settled_rewards, unsettled)?
            }
            Some(previous) => previous.settled_rewards,
            None => 0,
        };

        aggregates.accumulated_stake = checked_add(aggregates.accumulated_stake, new_total_stake)?;
        let delegation = Delegation {
            stake: new_total_stake,
            starting_ratio: aggregates.current_ratio,
            starting_block: block,
            settled_rewards,
        };

        self.aggregates = aggregates;
        self.delegations.insert(delegator, delegation);
        self.last_event_block = Some(block);

        debug!(target: EVENT_TARGET, %delegator, %block, stake = %new_total_stake, "pool.join");
        Ok(())
    }

    /// Release `amount` of staked principal. A partial unstake settles the
    /// whole delegation and immediately re-joins the remainder at the same
    /// block; there is no separate code path for it.
    ///
    /// Returns the released principal, to be transferred back by the host.
    pub fn unstake(
        &mut self,
        delegator: DelegatorId,
        block: BlockNumber,
        amount: Amount,
    ) -> Result<Amount, PoolError> {
        self.assert_event_order(block)?;
        if amount == 0 {
            return Err(PreconditionViolation::NonPositiveUnstake.into());
        }

        let delegation = match self.delegations.get(&delegator) {
            Some(delegation) if delegation.stake > 0 => delegation,
            Some(_) | None => {
                return Err(PreconditionViolation::UnknownDelegation { delegator }.into())
            }
        };
        if amount > delegation.stake {
            return Err(PreconditionViolation::UnstakeExceedsStake {
                delegator,
                requested: amount,
                available: delegation.stake,
            }
            .into());
        }

        let mut aggregates = self.aggregates;
        aggregates.flush(&self.commission_rate)?;
        let unsettled = aggregates.settle(delegation)?;
        let settled_rewards = checked_add(delegation.settled_rewards, unsettled)?;

        let remainder = delegation.stake - amount;
        aggregates.accumulated_stake = checked_add(aggregates.accumulated_stake, remainder)?;
        let replacement = Delegation {
            stake: remainder,
            starting_ratio: aggregates.current_ratio,
            starting_block: block,
            settled_rewards,
        };

        self.aggregates = aggregates;
        if replacement.stake == 0 && replacement.settled_rewards == 0 {
            self.delegations.remove(&delegator);
        } else {
            self.delegations.insert(delegator, replacement);
        }
        self.last_event_block = Some(block);

        debug!(target: EVENT_TARGET, %delegator, %block, %amount, %remainder, "pool.unstake");
        Ok(amount)
    }

    /// Release up to `limit` of the delegator's settled rewards.
    ///
    /// A live delegation is settled first (leave-then-rejoin at the unchanged
    /// stake), so everything accrued up to this block becomes withdrawable. A
    /// request past the settled balance is satisfied partially; a delegator
    /// with nothing settled receives zero, not an error.
    ///
    /// Returns the released amount, to be transferred by the host.
    pub fn on_withdraw(
        &mut self,
        delegator: DelegatorId,
        block: BlockNumber,
        limit: Amount,
    ) -> Result<Amount, PoolError> {
        self.assert_event_order(block)?;

        let Some(delegation) = self.delegations.get(&delegator) else {
            self.last_event_block = Some(block);
            return Ok(0);
        };

        let mut aggregates = self.aggregates;
        let replacement = if delegation.stake > 0 {
            aggregates.flush(&self.commission_rate)?;
            let unsettled = aggregates.settle(delegation)?;
            let settled_rewards = checked_add(delegation.settled_rewards, unsettled)?;
            aggregates.accumulated_stake =
                checked_add(aggregates.accumulated_stake, delegation.stake)?;
            Delegation {
                stake: delegation.stake,
                starting_ratio: aggregates.current_ratio,
                starting_block: block,
                settled_rewards,
            }
        } else {
            delegation.clone()
        };

        let released = limit.min(replacement.settled_rewards);
        let remaining = replacement.settled_rewards - released;
        aggregates.outstanding_rewards = aggregates
            .outstanding_rewards
            .checked_sub(released)
            .ok_or(InvariantViolation::OutstandingRewardsUnderflow)?;
        let lifetime = checked_add(self.withdrawn_of(&delegator), released)?;

        self.aggregates = aggregates;
        if replacement.stake == 0 && remaining == 0 {
            self.delegations.remove(&delegator);
        } else {
            self.delegations.insert(
                delegator,
                Delegation {
                    settled_rewards: remaining,
                    ..replacement
                },
            );
        }
        if released > 0 {
            self.withdrawn.insert(delegator, lifetime);
        }
        self.last_event_block = Some(block);

        debug!(target: EVENT_TARGET, %delegator, %block, %released, %remaining, "pool.withdraw");
        Ok(released)
    }

    /// Release the operator's entire accumulated commission.
    ///
    /// Returns the released amount, to be transferred by the host.
    pub fn on_withdraw_operator(&mut self) -> Result<Amount, PoolError> {
        let released = self.aggregates.accumulated_commission;
        let outstanding = self
            .aggregates
            .outstanding_rewards
            .checked_sub(released)
            .ok_or(InvariantViolation::OutstandingRewardsUnderflow)?;

        self.aggregates.accumulated_commission = 0;
        self.aggregates.outstanding_rewards = outstanding;

        debug!(target: EVENT_TARGET, %released, "pool.withdraw_operator");
        Ok(released)
    }

    /// Install a new commission rate.
    ///
    /// The pending period is flushed at the *old* rate first: reward is always
    /// charged at the rate in effect when it was earned, never retroactively.
    pub fn on_commission_change(
        &mut self,
        new_rate: CommissionRate,
        block: BlockNumber,
    ) -> Result<(), PoolError> {
        self.assert_event_order(block)?;

        let mut aggregates = self.aggregates;
        aggregates.flush(&self.commission_rate)?;

        let old_rate = self.commission_rate;
        self.aggregates = aggregates;
        self.commission_rate = new_rate;
        self.last_event_block = Some(block);

        info!(target: EVENT_TARGET, %block, %old_rate, %new_rate, "pool.commission_change");
        Ok(())
    }

    // Queries ────────────────────────────────────────────────────────────────

    pub fn commission_rate(&self) -> CommissionRate {
        self.commission_rate
    }

    /// The delegator's live staked principal; zero without a live delegation.
    pub fn stake_of(&self, delegator: &DelegatorId) -> Amount {
        self.delegations
            .get(delegator)
            .map(|delegation| delegation.stake)
            .unwrap_or(0)
    }

    /// The delegator's settled, unwithdrawn rewards. Rewards accrued since the
    /// last settlement are not included until the delegation is next touched.
    pub fn settled_rewards_of(&self, delegator: &DelegatorId) -> Amount {
        self.delegations
            .get(delegator)
            .map(|delegation| delegation.settled_rewards)
            .unwrap_or(0)
    }

    /// The delegator's lifetime withdrawn total.
    pub fn withdrawn_of(&self, delegator: &DelegatorId) -> Amount {
        self.withdrawn.get(delegator).copied().unwrap_or(0)
    }

    pub fn delegation_of(&self, delegator: &DelegatorId) -> Option<&Delegation> {
        self.delegations.get(delegator)
    }

    /// Aggregate view, consumed by the host's pool-health policy.
    pub fn totals(&self) -> PoolTotals {
        PoolTotals {
            accumulated_stake: self.aggregates.accumulated_stake,
            pending_block_reward: self.aggregates.pending_block_reward,
            accumulated_commission: self.aggregates.accumulated_commission,
            outstanding_rewards: self.aggregates.outstanding_rewards,
            current_ratio: self.aggregates.current_ratio,
        }
    }

    // Ordering ───────────────────────────────────────────────────────────────

    fn assert_event_order(&self, block: BlockNumber) -> Result<(), PreconditionViolation> {
        if let Some(latest) = self.last_event_block {
            if block < latest {
                return Err(PreconditionViolation::NonMonotonicBlock { block, latest });
            }
        }
        if let Some(rewarded) = self.last_reward_block {
            if block <= rewarded {
                return Err(PreconditionViolation::StakeChangeAfterReward { block, rewarded });
            }
        }
        Ok(())
    }

    fn assert_reward_order(&self, block: BlockNumber) -> Result<(), PreconditionViolation> {
        if let Some(latest) = self.last_event_block {
            if block < latest {
                return Err(PreconditionViolation::NonMonotonicBlock { block, latest });
            }
        }
        if let Some(rewarded) = self.last_reward_block {
            if block <= rewarded {
                return Err(PreconditionViolation::DuplicateBlockReward { block });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn delegator(tag: u8) -> DelegatorId {
        DelegatorId::new([tag; 32])
    }

    fn block(number: u64) -> BlockNumber {
        BlockNumber::new(number)
    }

    fn pool() -> RewardPool {
        RewardPool::new(CommissionRate::zero())
    }

    fn sum_of_live_stake(pool: &RewardPool) -> Amount {
        pool.delegations
            .values()
            .map(|delegation| delegation.stake)
            .sum()
    }

    fn sum_of_settled(pool: &RewardPool) -> Amount {
        pool.delegations
            .values()
            .map(|delegation| delegation.settled_rewards)
            .sum()
    }

    #[test]
    fn sole_staker_earns_the_whole_reward() {
        let mut pool = pool();
        let a = delegator(1);

        pool.on_join(a, block(2), 2).unwrap();
        pool.on_block(block(5), 5000).unwrap();

        assert_eq!(pool.on_withdraw(a, block(6), Amount::MAX), Ok(5000));
        assert_eq!(pool.withdrawn_of(&a), 5000);
    }

    #[test]
    fn two_stakers_split_proportionally() {
        let mut pool = pool();
        let (a, b) = (delegator(1), delegator(2));

        pool.on_join(a, block(2), 2).unwrap();
        pool.on_join(b, block(3), 3).unwrap();
        pool.on_block(block(5), 5000).unwrap();

        assert_eq!(pool.on_withdraw(a, block(6), Amount::MAX), Ok(2000));
        assert_eq!(pool.on_withdraw(b, block(6), Amount::MAX), Ok(3000));
    }

    #[test]
    fn shares_accumulate_across_blocks() {
        let mut pool = pool();
        let (a, b) = (delegator(1), delegator(2));

        pool.on_join(a, block(3001), 2).unwrap();
        pool.on_join(b, block(3003), 3).unwrap();
        pool.on_block(block(3005), 5000).unwrap();
        pool.on_block(block(3008), 5000).unwrap();

        assert_eq!(pool.on_withdraw(a, block(3009), Amount::MAX), Ok(4000));
        assert_eq!(pool.on_withdraw(b, block(3009), Amount::MAX), Ok(6000));
    }

    #[test]
    fn withdraw_below_settled_keeps_the_remainder_queryable() {
        let mut pool = pool();
        let a = delegator(1);

        pool.on_join(a, block(1), 10).unwrap();
        pool.on_block(block(2), 700).unwrap();

        assert_eq!(pool.on_withdraw(a, block(3), 300), Ok(300));
        assert_eq!(pool.settled_rewards_of(&a), 400);
        assert_eq!(pool.withdrawn_of(&a), 300);

        assert_eq!(pool.on_withdraw(a, block(4), Amount::MAX), Ok(400));
        assert_eq!(pool.settled_rewards_of(&a), 0);
        assert_eq!(pool.withdrawn_of(&a), 700);
    }

    #[test]
    fn same_block_rejoin_settles_nothing() {
        let mut pool = pool();
        let a = delegator(1);

        pool.on_join(a, block(1), 5).unwrap();
        pool.on_join(a, block(1), 5).unwrap();

        assert_eq!(pool.settled_rewards_of(&a), 0);
        assert_eq!(pool.stake_of(&a), 5);
        assert_eq!(pool.totals().accumulated_stake, 5);
    }

    #[test]
    fn rejoin_replaces_the_stake_rather_than_adding() {
        let mut pool = pool();
        let a = delegator(1);

        pool.on_join(a, block(1), 5).unwrap();
        pool.on_join(a, block(2), 8).unwrap();

        assert_eq!(pool.stake_of(&a), 8);
        assert_eq!(pool.totals().accumulated_stake, 8);
    }

    #[test]
    fn rejoin_settles_earlier_rewards() {
        let mut pool = pool();
        let a = delegator(1);

        pool.on_join(a, block(1), 4).unwrap();
        pool.on_block(block(2), 1000).unwrap();
        pool.on_join(a, block(3), 4).unwrap();

        assert_eq!(pool.settled_rewards_of(&a), 1000);
        // The second period starts at the post-flush ratio: no double count.
        assert_eq!(pool.on_withdraw(a, block(4), Amount::MAX), Ok(1000));
    }

    #[test]
    fn partial_unstake_keeps_earning_on_the_remainder() {
        let mut pool = pool();
        let a = delegator(1);

        pool.on_join(a, block(1), 10).unwrap();
        pool.on_block(block(2), 1000).unwrap();
        assert_eq!(pool.unstake(a, block(3), 4), Ok(4));

        assert_eq!(pool.stake_of(&a), 6);
        assert_eq!(pool.settled_rewards_of(&a), 1000);

        pool.on_block(block(4), 600).unwrap();
        assert_eq!(pool.on_withdraw(a, block(5), Amount::MAX), Ok(1600));
    }

    #[test]
    fn full_unstake_keeps_settled_rewards_withdrawable() {
        let mut pool = pool();
        let a = delegator(1);

        pool.on_join(a, block(1), 10).unwrap();
        pool.on_block(block(2), 1000).unwrap();
        assert_eq!(pool.unstake(a, block(3), 10), Ok(10));

        assert_eq!(pool.stake_of(&a), 0);
        assert_eq!(pool.settled_rewards_of(&a), 1000);
        assert_eq!(pool.on_withdraw(a, block(4), Amount::MAX), Ok(1000));
        // Fully drained: the record is gone.
        assert!(pool.delegation_of(&a).is_none());
    }

    #[test]
    fn rejoin_after_full_unstake_carries_settled_rewards() {
        let mut pool = pool();
        let a = delegator(1);

        pool.on_join(a, block(1), 10).unwrap();
        pool.on_block(block(2), 1000).unwrap();
        pool.unstake(a, block(3), 10).unwrap();
        pool.on_join(a, block(4), 7).unwrap();

        assert_eq!(pool.stake_of(&a), 7);
        assert_eq!(pool.settled_rewards_of(&a), 1000);
    }

    #[test]
    fn commission_is_levied_before_sharing() {
        let mut pool = RewardPool::new(CommissionRate::new(1, 10).unwrap());
        let a = delegator(1);

        pool.on_join(a, block(1), 5).unwrap();
        pool.on_block(block(2), 1000).unwrap();

        assert_eq!(pool.on_withdraw(a, block(3), Amount::MAX), Ok(900));
        assert_eq!(pool.totals().accumulated_commission, 100);
        assert_eq!(pool.on_withdraw_operator(), Ok(100));
        assert_eq!(pool.totals().accumulated_commission, 0);
        assert_eq!(pool.totals().outstanding_rewards, 0);
    }

    #[test]
    fn commission_change_flushes_at_the_old_rate() {
        let mut pool = RewardPool::new(CommissionRate::new(1, 2).unwrap());
        let a = delegator(1);

        pool.on_join(a, block(1), 5).unwrap();
        pool.on_block(block(2), 1000).unwrap();
        // Earned under 50%: the change must not recharge it at 0%.
        pool.on_commission_change(CommissionRate::zero(), block(3))
            .unwrap();
        pool.on_block(block(4), 1000).unwrap();

        assert_eq!(pool.on_withdraw(a, block(5), Amount::MAX), Ok(500 + 1000));
        assert_eq!(pool.totals().accumulated_commission, 500);
    }

    #[test]
    fn withdraw_without_a_delegation_yields_zero() {
        let mut pool = pool();
        assert_eq!(pool.on_withdraw(delegator(9), block(1), 100), Ok(0));
    }

    #[test]
    fn queries_are_idempotent() {
        let mut pool = pool();
        let a = delegator(1);

        pool.on_join(a, block(1), 10).unwrap();
        pool.on_block(block(2), 777).unwrap();

        let before = (
            pool.stake_of(&a),
            pool.settled_rewards_of(&a),
            pool.withdrawn_of(&a),
            pool.totals(),
        );
        let after = (
            pool.stake_of(&a),
            pool.settled_rewards_of(&a),
            pool.withdrawn_of(&a),
            pool.totals(),
        );
        assert_eq!(before, after);
    }

    #[test]
    fn accumulated_stake_tracks_live_delegations() {
        let mut pool = pool();

        pool.on_join(delegator(1), block(1), 10).unwrap();
        pool.on_join(delegator(2), block(1), 20).unwrap();
        pool.on_block(block(2), 500).unwrap();
        pool.unstake(delegator(1), block(3), 4).unwrap();

        assert_eq!(pool.totals().accumulated_stake, sum_of_live_stake(&pool));
    }

    #[test]
    fn outstanding_covers_commission_plus_settled() {
        let mut pool = RewardPool::new(CommissionRate::new(1, 5).unwrap());

        pool.on_join(delegator(1), block(1), 10).unwrap();
        pool.on_join(delegator(2), block(1), 30).unwrap();
        pool.on_block(block(2), 1000).unwrap();
        pool.unstake(delegator(1), block(3), 10).unwrap();
        pool.on_withdraw(delegator(2), block(4), 100).unwrap();

        let totals = pool.totals();
        assert_eq!(
            totals.outstanding_rewards,
            totals.accumulated_commission + sum_of_settled(&pool)
        );
    }

    #[test]
    fn ratio_is_untouched_while_rewards_stay_pending() {
        let mut pool = pool();

        pool.on_join(delegator(1), block(1), 10).unwrap();
        let ratio = pool.totals().current_ratio;
        pool.on_block(block(2), 1000).unwrap();
        pool.on_block(block(3), 1000).unwrap();

        assert_eq!(pool.totals().current_ratio, ratio);
        assert_eq!(pool.totals().pending_block_reward, 2000);
    }

    #[test]
    fn truncation_dust_stays_with_the_pool() {
        let mut pool = pool();
        let (a, b) = (delegator(1), delegator(2));

        // 100 over 3+3 stake: each earns floor(3 × 100/6) = 50; no dust here,
        // so pick 7 stakes: each earns floor(7 × (100/14)) = 49 with 2 dust.
        pool.on_join(a, block(1), 7).unwrap();
        pool.on_join(b, block(1), 7).unwrap();
        pool.on_block(block(2), 100).unwrap();

        let paid_a = pool.on_withdraw(a, block(3), Amount::MAX).unwrap();
        let paid_b = pool.on_withdraw(b, block(3), Amount::MAX).unwrap();
        assert!(paid_a + paid_b <= 100);
        assert_eq!(paid_a, paid_b);
    }

    #[test_case(0 => matches Err(PoolError::Precondition(PreconditionViolation::NonPositiveStake)))]
    #[test_case(1 => matches Ok(()))]
    fn join_requires_positive_stake(stake: Amount) -> Result<(), PoolError> {
        pool().on_join(delegator(1), block(1), stake)
    }

    #[test]
    fn reward_must_be_positive() {
        let mut pool = pool();
        pool.on_join(delegator(1), block(1), 10).unwrap();
        assert_eq!(
            pool.on_block(block(2), 0),
            Err(PoolError::Precondition(
                PreconditionViolation::NonPositiveReward
            ))
        );
    }

    #[test]
    fn unstake_requires_a_live_delegation() {
        let mut pool = pool();
        assert_eq!(
            pool.unstake(delegator(1), block(1), 1),
            Err(PoolError::Precondition(
                PreconditionViolation::UnknownDelegation {
                    delegator: delegator(1)
                }
            ))
        );
    }

    #[test]
    fn unstake_cannot_exceed_stake() {
        let mut pool = pool();
        pool.on_join(delegator(1), block(1), 10).unwrap();
        assert_eq!(
            pool.unstake(delegator(1), block(2), 11),
            Err(PoolError::Precondition(
                PreconditionViolation::UnstakeExceedsStake {
                    delegator: delegator(1),
                    requested: 11,
                    available: 10,
                }
            ))
        );
    }

    #[test]
    fn failed_operations_mutate_nothing() {
        let mut pool = pool();
        pool.on_join(delegator(1), block(1), 10).unwrap();
        pool.on_block(block(2), 500).unwrap();

        let totals = pool.totals();
        assert!(pool.unstake(delegator(1), block(3), 11).is_err());
        assert_eq!(pool.totals(), totals);
        assert_eq!(pool.stake_of(&delegator(1)), 10);
    }

    #[test]
    fn events_must_not_go_back_in_time() {
        let mut pool = pool();
        pool.on_join(delegator(1), block(5), 10).unwrap();
        assert_eq!(
            pool.on_join(delegator(2), block(4), 10),
            Err(PoolError::Precondition(
                PreconditionViolation::NonMonotonicBlock {
                    block: block(4),
                    latest: block(5),
                }
            ))
        );
    }

    #[test]
    fn events_for_a_block_must_precede_its_reward() {
        let mut pool = pool();
        pool.on_join(delegator(1), block(1), 10).unwrap();
        pool.on_block(block(5), 500).unwrap();
        assert_eq!(
            pool.on_join(delegator(2), block(5), 10),
            Err(PoolError::Precondition(
                PreconditionViolation::StakeChangeAfterReward {
                    block: block(5),
                    rewarded: block(5),
                }
            ))
        );
    }

    #[test]
    fn a_block_is_rewarded_at_most_once() {
        let mut pool = pool();
        pool.on_join(delegator(1), block(1), 10).unwrap();
        pool.on_block(block(5), 500).unwrap();
        assert_eq!(
            pool.on_block(block(5), 500),
            Err(PoolError::Precondition(
                PreconditionViolation::DuplicateBlockReward { block: block(5) }
            ))
        );
    }

    #[test]
    fn reward_with_no_stake_is_rejected_at_flush() {
        let mut pool = pool();
        let a = delegator(1);
        // A reward sneaks in while the pool is empty; the corruption is
        // detected on the next settlement.
        pool.on_block(block(1), 500).unwrap();
        assert_eq!(
            pool.on_join(a, block(2), 10),
            Err(PoolError::Invariant(
                InvariantViolation::PendingRewardWithoutStake { pending: 500 }
            ))
        );
    }
}
