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

mod memory;

use buddy_sdk::types::{MatchOutcome, SessionRecord};
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use memory::MemorySessionStore;

#[derive(Debug, Error)]
pub enum SessionStoreError {
	#[error("Invalid session: {0}")]
	InvalidSession(String),
	#[error("Session {session_id} is already active with other participants")]
	Conflict { session_id: String },
	#[error("Session storage error: {0}")]
	StorageError(String),
}

/// Downstream record of which users share a session
///
/// The engine never writes here itself. Whoever receives a matched
/// outcome (request handler, sweeper) forwards it so that both users end
/// up as participants of the requester's session.
pub trait SessionStore: Send + Sync {
	/// Mark the session active with exactly these two participants
	///
	/// Activating again with the same pair returns the existing record
	/// unchanged. A different pair is a conflict.
	fn activate(
		&self,
		session_id: &str,
		participants: &[String; 2],
		joined_at: DateTime<Utc>,
	) -> Result<SessionRecord, SessionStoreError>;

	fn get(&self, session_id: &str) -> Option<SessionRecord>;

	/// Active session the user was last paired into, unless released since
	fn find_active_for(&self, user_id: &str) -> Option<SessionRecord>;

	/// Forget which session the user was last paired into
	///
	/// Called when the user asks for a new partner or withdraws, so an
	/// earlier pairing is no longer reported as their current match. The
	/// session record itself is kept.
	fn release(&self, user_id: &str);

	/// Forward a matched outcome; unmatched outcomes are ignored
	fn apply_outcome(&self, outcome: &MatchOutcome) -> Result<Option<SessionRecord>, SessionStoreError> {
		match (&outcome.participants, outcome.matched_at) {
			(Some(participants), Some(at)) if outcome.matched => {
				self.activate(&outcome.session_id, participants, at).map(Some)
			}
			_ => Ok(None),
		}
	}
}
