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

use buddy_matching::MatchRequest;
use buddy_sdk::types::SessionDuration;
use chrono::{DateTime, Duration, Utc};

#[derive(Clone, Copy)]
pub enum Scenario {
	/// Same duration and start time: every attempt can pair
	Uniform,
	/// Durations and start times spread so most candidates are filtered out
	Fragmented,
	/// Uniform, plus each user prefers a handful of others
	Preferences,
}

pub struct RequestGenerator {
	thread_id: usize,
	counter: u64,
	scenario: Scenario,
	base_start: DateTime<Utc>,
}

impl RequestGenerator {
	pub fn new(thread_id: usize, scenario: Scenario) -> Self {
		Self {
			thread_id,
			counter: 0,
			scenario,
			base_start: "2026-01-20T10:00:00Z".parse().unwrap(),
		}
	}

	pub fn user_id(thread_id: usize, counter: u64) -> String {
		format!("t{}-u{}", thread_id, counter)
	}

	pub fn next_request(&mut self, now: DateTime<Utc>) -> MatchRequest {
		self.counter += 1;
		let user_id = Self::user_id(self.thread_id, self.counter);
		let session_id = format!("s-{}", user_id);

		match self.scenario {
			Scenario::Uniform => {
				MatchRequest::new(user_id, session_id, SessionDuration::Standard, self.base_start, now)
			}
			Scenario::Fragmented => {
				let duration = SessionDuration::ALL[(self.counter % 3) as usize];
				// 24 start slots 15 minutes apart, never inside each other's window
				let slot = (self.counter / 3) % 24;
				let start = self.base_start + Duration::minutes(15 * slot as i64);
				MatchRequest::new(user_id, session_id, duration, start, now)
			}
			Scenario::Preferences => {
				let preferred = (1..=5).map(|k| Self::user_id(self.thread_id, self.counter + k * 7));
				MatchRequest::new(user_id, session_id, SessionDuration::Standard, self.base_start, now)
					.with_timezone(if self.counter.is_multiple_of(2) { "Europe/Berlin" } else { "America/New_York" })
					.with_preferred_partners(preferred)
			}
		}
	}

	pub fn batch(&mut self, count: usize, now: DateTime<Utc>) -> Vec<MatchRequest> {
		(0..count).map(|_| self.next_request(now)).collect()
	}
}
