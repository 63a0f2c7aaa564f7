// Copyright 2025 itscheems
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

use crate::queue::MatchQueue;

/// Matching engine state
///
/// This structure holds everything guarded by the engine's critical
/// section:
/// - The queue of pending requests
/// - Counters reported through `EngineStats`
pub struct MatchingEngineState {
	/// Pending requests in insertion order
	pub queue: MatchQueue,
	/// Pairs formed since start (or since the last reset)
	pub pairs_formed: u64,
	/// Batch passes executed
	pub sweeps: u64,
}

impl MatchingEngineState {
	pub fn new() -> Self {
		Self {
			queue: MatchQueue::new(),
			pairs_formed: 0,
			sweeps: 0,
		}
	}

	/// Reset state to initial conditions
	pub fn reset(&mut self) {
		self.queue.clear();
		self.pairs_formed = 0;
		self.sweeps = 0;
	}
}

impl Default for MatchingEngineState {
	fn default() -> Self {
		Self::new()
	}
}
