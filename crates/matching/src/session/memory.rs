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

use buddy_sdk::types::{SessionParticipant, SessionRecord, SessionStatus};
use chrono::{DateTime, Utc};
use dashmap::{DashMap, mapref::entry::Entry};
use tracing::{debug, info};

use super::{SessionStore, SessionStoreError};

/// In-memory session store
///
/// Non-persistent; sessions live for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
	sessions: DashMap<String, SessionRecord>,
	/// user id -> session id of their latest pairing
	latest: DashMap<String, String>,
}

impl MemorySessionStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.sessions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sessions.is_empty()
	}
}

fn same_pair(record: &SessionRecord, participants: &[String; 2]) -> bool {
	record.participants.len() == 2
		&& participants
			.iter()
			.all(|user| record.participants.iter().any(|p| &p.user_id == user))
}

impl SessionStore for MemorySessionStore {
	fn activate(
		&self,
		session_id: &str,
		participants: &[String; 2],
		joined_at: DateTime<Utc>,
	) -> Result<SessionRecord, SessionStoreError> {
		if session_id.trim().is_empty() {
			return Err(SessionStoreError::InvalidSession(
				"session id must not be blank".to_string(),
			));
		}
		if participants[0] == participants[1] {
			return Err(SessionStoreError::InvalidSession(format!(
				"session {} needs two distinct participants",
				session_id
			)));
		}

		match self.sessions.entry(session_id.to_string()) {
			Entry::Occupied(existing) => {
				let record = existing.get();
				if same_pair(record, participants) {
					Ok(record.clone())
				} else {
					Err(SessionStoreError::Conflict {
						session_id: session_id.to_string(),
					})
				}
			}
			Entry::Vacant(slot) => {
				let record = SessionRecord {
					session_id: session_id.to_string(),
					status: SessionStatus::Active,
					participants: participants
						.iter()
						.map(|user_id| SessionParticipant {
							user_id: user_id.clone(),
							joined_at,
						})
						.collect(),
					updated_at: joined_at,
				};
				slot.insert(record.clone());
				for user_id in participants {
					self.latest.insert(user_id.clone(), session_id.to_string());
				}

				info!(
					target: "session",
					session_id = %session_id,
					first = %participants[0],
					second = %participants[1],
					"Session activated"
				);
				Ok(record)
			}
		}
	}

	fn get(&self, session_id: &str) -> Option<SessionRecord> {
		self.sessions.get(session_id).map(|r| r.value().clone())
	}

	fn find_active_for(&self, user_id: &str) -> Option<SessionRecord> {
		let session_id = self.latest.get(user_id)?.value().clone();
		self.sessions
			.get(&session_id)
			.filter(|r| r.status == SessionStatus::Active)
			.map(|r| r.value().clone())
	}

	fn release(&self, user_id: &str) {
		if self.latest.remove(user_id).is_some() {
			debug!(target: "session", user_id = %user_id, "Latest session released");
		}
	}
}
