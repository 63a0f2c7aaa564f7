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

mod state;

pub use state::MatchingEngineState;

use std::{
	collections::HashSet,
	convert::Infallible,
	fmt::Display,
	sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use buddy_sdk::types::{MatchOutcome, MatchReason};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
	clock::{Clock, SystemClock},
	policy::MatchPolicy,
	snapshot::QueueSnapshot,
	types::{MatchRequest, MatchingError, validate_user_id},
};

/// Configuration for the matching engine
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
	pub policy: MatchPolicy,
	/// Log every candidate score at debug level
	pub verbose_logging: bool,
}

/// Point-in-time counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
	pub queued: usize,
	pub pairs_formed: u64,
	pub sweeps: u64,
}

/// Matchmaking engine over a shared queue of pending requests
///
/// All reads and writes of the queue happen under one mutex. A matching
/// attempt reads, filters, scores, selects and removes both users inside
/// a single acquisition, so two concurrent attempts can never consume the
/// same candidate. A batch pass holds the lock for the whole pass.
///
/// The engine owns no threads and never evicts on its own: timeouts are
/// computed lazily from the injected clock whenever a caller asks.
pub struct MatchingEngine {
	state: Mutex<MatchingEngineState>,
	clock: Arc<dyn Clock>,
	config: EngineConfig,
}

/// What a matching attempt decided, detached from the queue borrow
enum Decision {
	Unknown,
	Wait { session_id: String, timed_out: bool },
	Pair {
		session_id: String,
		partner: String,
		score: f64,
	},
}

impl MatchingEngine {
	pub fn new(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
		Self {
			state: Mutex::new(MatchingEngineState::new()),
			clock,
			config,
		}
	}

	/// Engine driven by real wall-clock time
	pub fn with_system_clock(config: EngineConfig) -> Self {
		Self::new(config, Arc::new(SystemClock))
	}

	// Every mutation leaves the state consistent before the next
	// statement, so a panic elsewhere cannot leave a half-applied pair.
	fn lock(&self) -> MutexGuard<'_, MatchingEngineState> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	pub fn now(&self) -> DateTime<Utc> {
		self.clock.now()
	}

	pub fn policy(&self) -> &MatchPolicy {
		&self.config.policy
	}

	/// Insert or replace the user's pending request
	pub fn enqueue(&self, request: MatchRequest) -> Result<(), MatchingError> {
		request.validate()?;

		let user_id = request.user_id.clone();
		let replaced = self.lock().queue.upsert(request);

		debug!(
			target: "engine",
			user_id = %user_id,
			replaced = replaced.is_some(),
			"Request enqueued"
		);
		Ok(())
	}

	/// Remove the user's pending request; returns whether one existed
	pub fn withdraw(&self, user_id: &str) -> bool {
		let removed = self.lock().queue.remove(user_id).is_some();
		if removed {
			debug!(target: "engine", user_id = %user_id, "Request withdrawn");
		}
		removed
	}

	pub fn contains(&self, user_id: &str) -> bool {
		self.lock().queue.contains(user_id)
	}

	pub fn size(&self) -> usize {
		self.lock().queue.len()
	}

	/// Copy of the user's pending request
	pub fn get(&self, user_id: &str) -> Option<MatchRequest> {
		self.lock().queue.get(user_id).cloned()
	}

	/// Copies of all pending requests in queue order
	pub fn pending(&self) -> Vec<MatchRequest> {
		self.lock().queue.iter().cloned().collect()
	}

	/// Empty the queue and reset counters
	pub fn clear(&self) {
		self.lock().reset();
		info!(target: "engine", "Queue cleared");
	}

	/// Withdraw every request that has waited past the timeout
	///
	/// Never called by the engine itself. Returns the evicted user ids in
	/// queue order.
	pub fn evict_timed_out(&self) -> Vec<String> {
		let mut state = self.lock();
		let now = self.clock.now();

		let expired: Vec<String> = state
			.queue
			.iter()
			.filter(|request| self.config.policy.is_timed_out(request, now))
			.map(|request| request.user_id.clone())
			.collect();

		for user_id in &expired {
			state.queue.remove(user_id);
		}

		if !expired.is_empty() {
			info!(target: "engine", evicted = expired.len(), "Timed-out requests evicted");
		}
		expired
	}

	pub fn stats(&self) -> EngineStats {
		let state = self.lock();
		EngineStats {
			queued: state.queue.len(),
			pairs_formed: state.pairs_formed,
			sweeps: state.sweeps,
		}
	}

	/// Try to pair one user right now
	///
	/// On success both users are removed from the queue before the lock is
	/// released. A blank id is a caller error; an unknown id is reported as
	/// `no_match`, indistinguishable from "nobody compatible".
	pub fn find_match(&self, user_id: &str) -> Result<MatchOutcome, MatchingError> {
		let outcome = self.match_pending_with(user_id, |_| Ok::<(), MatchingError>(()))?;
		Ok(outcome.unwrap_or_else(|| MatchOutcome::unmatched(String::new(), MatchReason::NoMatch)))
	}

	/// Try to pair one user, removing the pair only once `commit` accepts it
	///
	/// `commit` runs while the queue is still locked. If it fails, both
	/// users keep their places and the error is returned. `Ok(None)` means
	/// the user has no pending request.
	pub fn match_pending_with<E, F>(&self, user_id: &str, commit: F) -> Result<Option<MatchOutcome>, E>
	where
		E: From<MatchingError>,
		F: FnOnce(&MatchOutcome) -> Result<(), E>,
	{
		validate_user_id(user_id)?;

		let mut state = self.lock();
		let now = self.clock.now();
		self.match_locked(&mut state, user_id, now, commit)
	}

	/// Insert or replace the request and try to pair it, in one acquisition
	///
	/// No concurrent attempt can take the user between the two steps. A
	/// rejected commit leaves the new request queued.
	pub fn enqueue_and_match_with<E, F>(&self, request: MatchRequest, commit: F) -> Result<MatchOutcome, E>
	where
		E: From<MatchingError>,
		F: FnOnce(&MatchOutcome) -> Result<(), E>,
	{
		request.validate()?;

		let user_id = request.user_id.clone();
		let mut state = self.lock();
		let replaced = state.queue.upsert(request);
		debug!(
			target: "engine",
			user_id = %user_id,
			replaced = replaced.is_some(),
			"Request enqueued"
		);

		let now = self.clock.now();
		let outcome = self.match_locked(&mut state, &user_id, now, commit)?;
		Ok(outcome.unwrap_or_else(|| MatchOutcome::unmatched(String::new(), MatchReason::NoMatch)))
	}

	/// Resolve as many pairs as possible in one pass over the queue
	///
	/// Users are visited in queue order. A user already consumed as
	/// someone's partner earlier in the pass is skipped. One outcome is
	/// returned per visited user, matched or not.
	pub fn process_queue(&self) -> Vec<MatchOutcome> {
		self.process_queue_with(|_| Ok::<(), Infallible>(()))
	}

	/// Batch pass where every pair must be accepted by `commit`
	///
	/// A rejected pair stays queued and its requester is reported as not
	/// matched for this pass.
	pub fn process_queue_with<E, F>(&self, mut commit: F) -> Vec<MatchOutcome>
	where
		E: Display,
		F: FnMut(&MatchOutcome) -> Result<(), E>,
	{
		let mut state = self.lock();
		let now = self.clock.now();

		let mut consumed: HashSet<String> = HashSet::new();
		let mut outcomes = Vec::with_capacity(state.queue.len());

		for user_id in state.queue.user_ids() {
			if consumed.contains(&user_id) {
				continue;
			}

			let outcome = match self.match_locked(&mut state, &user_id, now, &mut commit) {
				Ok(Some(outcome)) => outcome,
				Ok(None) => continue,
				Err(e) => {
					warn!(target: "engine", user_id = %user_id, error = %e, "Pair rejected, both users stay queued");
					self.waiting_outcome(&state, &user_id, now)
				}
			};
			if let Some(pair) = &outcome.participants {
				consumed.extend(pair.iter().cloned());
			}
			outcomes.push(outcome);
		}

		state.sweeps += 1;

		let matched = outcomes.iter().filter(|o| o.matched).count();
		debug!(
			target: "engine",
			visited = outcomes.len(),
			pairs = matched,
			remaining = state.queue.len(),
			"Batch pass complete"
		);

		outcomes
	}

	/// Capture the queue in insertion order
	pub fn snapshot(&self) -> QueueSnapshot {
		let state = self.lock();
		QueueSnapshot {
			taken_at: self.clock.now(),
			entries: state.queue.iter().cloned().collect(),
		}
	}

	/// Replace the queue with the snapshot's entries, keeping their order
	///
	/// Every entry is validated first; on error the current queue is left
	/// untouched. Returns the number of restored entries.
	pub fn restore(&self, snapshot: QueueSnapshot) -> Result<usize, MatchingError> {
		for entry in &snapshot.entries {
			entry.validate()?;
		}

		let mut state = self.lock();
		state.queue.clear();
		for entry in snapshot.entries {
			state.queue.upsert(entry);
		}

		let restored = state.queue.len();
		info!(
			target: "engine",
			restored,
			taken_at = %snapshot.taken_at,
			"Queue restored from snapshot"
		);
		Ok(restored)
	}

	/// Unmatched outcome for a user who is still queued
	fn waiting_outcome(&self, state: &MatchingEngineState, user_id: &str, now: DateTime<Utc>) -> MatchOutcome {
		match state.queue.get(user_id) {
			Some(request) if self.config.policy.is_timed_out(request, now) => {
				MatchOutcome::unmatched(request.session_id.clone(), MatchReason::Timeout)
			}
			Some(request) => MatchOutcome::unmatched(request.session_id.clone(), MatchReason::NoMatch),
			None => MatchOutcome::unmatched(String::new(), MatchReason::NoMatch),
		}
	}

	/// Filter, score, select, commit and remove; caller holds the lock
	fn match_locked<E, F>(
		&self,
		state: &mut MatchingEngineState,
		user_id: &str,
		now: DateTime<Utc>,
		commit: F,
	) -> Result<Option<MatchOutcome>, E>
	where
		F: FnOnce(&MatchOutcome) -> Result<(), E>,
	{
		let policy = &self.config.policy;

		let decision = match state.queue.get(user_id) {
			None => Decision::Unknown,
			Some(requester) => {
				let candidates: Vec<&MatchRequest> = state
					.queue
					.iter()
					.filter(|candidate| policy.is_compatible(requester, candidate))
					.collect();

				if self.config.verbose_logging {
					for candidate in &candidates {
						debug!(
							target: "engine",
							user_id = %user_id,
							candidate = %candidate.user_id,
							score = policy.score(requester, candidate, now),
							"Scored candidate"
						);
					}
				}

				match policy.select_best(requester, candidates, now) {
					Some(best) => Decision::Pair {
						session_id: requester.session_id.clone(),
						partner: best.request.user_id.clone(),
						score: best.score,
					},
					None => Decision::Wait {
						session_id: requester.session_id.clone(),
						timed_out: policy.is_timed_out(requester, now),
					},
				}
			}
		};

		match decision {
			Decision::Unknown => Ok(None),
			Decision::Wait {
				session_id,
				timed_out,
			} => {
				let reason = if timed_out {
					MatchReason::Timeout
				} else {
					MatchReason::NoMatch
				};
				debug!(target: "engine", user_id = %user_id, ?reason, "No partner available");
				Ok(Some(MatchOutcome::unmatched(session_id, reason)))
			}
			Decision::Pair {
				session_id,
				partner,
				score,
			} => {
				let outcome = MatchOutcome::paired(session_id, user_id, partner.clone(), now);
				commit(&outcome)?;

				state.queue.remove(user_id);
				state.queue.remove(&partner);
				state.pairs_formed += 1;

				info!(
					target: "engine",
					user_id = %user_id,
					partner = %partner,
					session_id = %outcome.session_id,
					score,
					"Pair formed"
				);
				Ok(Some(outcome))
			}
		}
	}
}
