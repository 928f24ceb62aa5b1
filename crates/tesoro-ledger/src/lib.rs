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

//! Lazy, exact-arithmetic reward distribution for delegated stake pools.
//!
//! A pool receives variable per-block rewards and owes each delegator a share
//! proportional to its stake. Rather than crediting every delegator on every
//! block, the pool maintains a monotonic cumulative reward ratio (total reward
//! earned per unit of stake since inception) and a per-delegation snapshot of
//! that ratio; a delegation's earned reward is `stake × (ratio now − ratio at
//! last settlement)`, computed only when that delegation is touched. Every
//! operation is O(1) in the number of delegators.

pub mod event;
pub mod pool;
pub mod summary;

#[cfg(any(test, feature = "test-utils"))]
pub mod reference;
