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

mod amount;
mod block_number;
mod commission_rate;
mod delegator_id;

pub use amount::{Amount, MAX_COIN_SUPPLY};
pub use block_number::BlockNumber;
pub use commission_rate::{CommissionRate, InvalidCommissionRate};
pub use delegator_id::DelegatorId;

#[cfg(any(test, feature = "test-utils"))]
pub use amount::any_amount;
#[cfg(any(test, feature = "test-utils"))]
pub use block_number::any_block_number;
#[cfg(any(test, feature = "test-utils"))]
pub use commission_rate::any_commission_rate;
#[cfg(any(test, feature = "test-utils"))]
pub use delegator_id::any_delegator_id;
