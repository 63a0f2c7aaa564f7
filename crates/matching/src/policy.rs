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

//! Compatibility filter and scoring policy
//!
//! Every matching path (single request, batch pass, any storage-backed
//! queue) goes through `MatchPolicy`, so filter, score and tie-break
//! semantics live in exactly one place.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::MatchRequest;

/// Default maximum start-time skew between partners (5 minutes)
pub const DEFAULT_START_WINDOW_SECS: u64 = 5 * 60;

/// Default wait after which an unmatched request reports `timeout`
pub const DEFAULT_MATCH_TIMEOUT_SECS: u64 = 60;

/// Filter thresholds and score weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchPolicy {
	/// Maximum |start_time| difference for two requests to be compatible
	pub start_window_secs: u64,
	/// Minimum wait before an empty candidate set is reported as `timeout`
	pub timeout_secs: u64,
	pub base_score: f64,
	/// Added once per direction of partner preference
	pub preference_bonus: f64,
	/// Added when both sides carry the same non-empty timezone
	pub timezone_bonus: f64,
	/// Cap on the candidate-wait bonus (one point per second waited)
	pub max_fairness_bonus: f64,
}

impl Default for MatchPolicy {
	fn default() -> Self {
		Self {
			start_window_secs: DEFAULT_START_WINDOW_SECS,
			timeout_secs: DEFAULT_MATCH_TIMEOUT_SECS,
			base_score: 100.0,
			preference_bonus: 50.0,
			timezone_bonus: 20.0,
			max_fairness_bonus: 30.0,
		}
	}
}

/// A candidate with its computed score
#[derive(Debug, Clone, Copy)]
pub struct ScoredCandidate<'a> {
	pub request: &'a MatchRequest,
	pub score: f64,
}

fn seconds_between(a: DateTime<Utc>, b: DateTime<Utc>) -> f64 {
	(a - b).num_milliseconds() as f64 / 1000.0
}

impl MatchPolicy {
	/// Hard filter: different user, same duration, start times within the window
	pub fn is_compatible(&self, requester: &MatchRequest, candidate: &MatchRequest) -> bool {
		if candidate.user_id == requester.user_id {
			return false;
		}
		if candidate.duration != requester.duration {
			return false;
		}

		let skew_ms = (requester.start_time - candidate.start_time)
			.num_milliseconds()
			.unsigned_abs();
		skew_ms <= self.start_window_secs.saturating_mul(1000)
	}

	/// Whether an unmatched request has waited long enough to report `timeout`
	pub fn is_timed_out(&self, request: &MatchRequest, now: DateTime<Utc>) -> bool {
		let waited_ms = (now - request.requested_at).num_milliseconds();
		waited_ms >= 0 && waited_ms as u64 >= self.timeout_secs.saturating_mul(1000)
	}

	/// Score a compatible candidate for `requester` (larger is better)
	///
	/// One point is lost per second of start-time skew, so among otherwise
	/// equal candidates the closest start time wins; preference bonuses can
	/// outweigh up to a minute or two of skew.
	pub fn score(&self, requester: &MatchRequest, candidate: &MatchRequest, now: DateTime<Utc>) -> f64 {
		let mut score = self.base_score;

		if requester.prefers(&candidate.user_id) {
			score += self.preference_bonus;
		}
		if candidate.prefers(&requester.user_id) {
			score += self.preference_bonus;
		}

		score -= seconds_between(requester.start_time, candidate.start_time).abs();

		if let (Some(a), Some(b)) = (requester.timezone(), candidate.timezone())
			&& a == b
		{
			score += self.timezone_bonus;
		}

		let waited = seconds_between(now, candidate.requested_at).max(0.0);
		score += waited.min(self.max_fairness_bonus);

		score
	}

	/// Pick the best candidate from `candidates`, which must be in queue order
	///
	/// Highest score wins; equal scores go to the earliest `requested_at`;
	/// after that the earlier queue position is kept.
	pub fn select_best<'a, I>(
		&self,
		requester: &MatchRequest,
		candidates: I,
		now: DateTime<Utc>,
	) -> Option<ScoredCandidate<'a>>
	where
		I: IntoIterator<Item = &'a MatchRequest>,
	{
		let mut best: Option<ScoredCandidate<'a>> = None;

		for candidate in candidates {
			let scored = ScoredCandidate {
				request: candidate,
				score: self.score(requester, candidate, now),
			};

			best = match best {
				None => Some(scored),
				Some(current) => {
					let better = match scored.score.total_cmp(&current.score) {
						Ordering::Greater => true,
						Ordering::Less => false,
						Ordering::Equal => {
							scored.request.requested_at < current.request.requested_at
						}
					};
					if better { Some(scored) } else { Some(current) }
				}
			};
		}

		best
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use buddy_sdk::types::SessionDuration;
	use chrono::Duration;

	fn at(ts: &str) -> DateTime<Utc> {
		ts.parse().unwrap()
	}

	fn request(user: &str, duration: SessionDuration, start: &str) -> MatchRequest {
		let start = at(start);
		MatchRequest::new(user, format!("session-{}", user), duration, start, start)
	}

	#[test]
	fn test_duration_is_a_hard_filter() {
		let policy = MatchPolicy::default();
		let a = request("a", SessionDuration::Standard, "2026-01-20T10:00:00Z");
		let b = request("b", SessionDuration::Short, "2026-01-20T10:00:00Z");
		assert!(!policy.is_compatible(&a, &b));
	}

	#[test]
	fn test_start_window_is_inclusive() {
		let policy = MatchPolicy::default();
		let a = request("a", SessionDuration::Standard, "2026-01-20T10:00:00Z");
		let edge = request("b", SessionDuration::Standard, "2026-01-20T10:05:00Z");
		let past_edge = request("c", SessionDuration::Standard, "2026-01-20T10:05:00.001Z");
		let before = request("d", SessionDuration::Standard, "2026-01-20T09:56:00Z");

		assert!(policy.is_compatible(&a, &edge));
		assert!(!policy.is_compatible(&a, &past_edge));
		assert!(policy.is_compatible(&a, &before));
	}

	#[test]
	fn test_self_is_never_a_candidate() {
		let policy = MatchPolicy::default();
		let a = request("a", SessionDuration::Standard, "2026-01-20T10:00:00Z");
		assert!(!policy.is_compatible(&a, &a.clone()));
	}

	#[test]
	fn test_score_components() {
		let policy = MatchPolicy::default();
		let now = at("2026-01-20T09:00:00Z");

		let mut a = request("a", SessionDuration::Standard, "2026-01-20T10:00:00Z");
		let mut b = request("b", SessionDuration::Standard, "2026-01-20T10:00:10Z");
		a.requested_at = now;
		b.requested_at = now - Duration::seconds(12);

		// base 100, 10s skew, 12s waited
		assert_eq!(policy.score(&a, &b, now), 102.0);

		a = a.with_preferred_partners(["b"]).with_timezone("Asia/Tokyo");
		b = b.with_preferred_partners(["a"]).with_timezone("Asia/Tokyo");
		assert_eq!(policy.score(&a, &b, now), 222.0);
	}

	#[test]
	fn test_fairness_bonus_is_capped() {
		let policy = MatchPolicy::default();
		let now = at("2026-01-20T09:00:00Z");
		let a = request("a", SessionDuration::Standard, "2026-01-20T10:00:00Z");
		let mut b = request("b", SessionDuration::Standard, "2026-01-20T10:00:00Z");

		b.requested_at = now - Duration::minutes(10);
		assert_eq!(policy.score(&a, &b, now), 130.0);

		b.requested_at = now + Duration::seconds(5);
		assert_eq!(policy.score(&a, &b, now), 100.0);
	}

	#[test]
	fn test_timeout_threshold() {
		let policy = MatchPolicy::default();
		let now = at("2026-01-20T09:00:00Z");
		let mut a = request("a", SessionDuration::Standard, "2026-01-20T10:00:00Z");

		a.requested_at = now - Duration::seconds(59);
		assert!(!policy.is_timed_out(&a, now));
		a.requested_at = now - Duration::seconds(60);
		assert!(policy.is_timed_out(&a, now));
	}

	#[test]
	fn test_equal_scores_prefer_earliest_request() {
		let policy = MatchPolicy::default();
		let now = at("2026-01-20T09:00:00Z");
		let a = request("a", SessionDuration::Standard, "2026-01-20T10:00:00Z");

		// Both waited past the fairness cap, so their scores are equal.
		let mut b = request("b", SessionDuration::Standard, "2026-01-20T10:00:00Z");
		let mut c = request("c", SessionDuration::Standard, "2026-01-20T10:00:00Z");
		b.requested_at = now - Duration::minutes(5);
		c.requested_at = now - Duration::minutes(8);

		let best = policy.select_best(&a, [&b, &c], now).unwrap();
		assert_eq!(best.request.user_id, "c");
	}
}
