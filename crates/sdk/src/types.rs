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

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected session length
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported session duration: {0} minutes (expected 25, 50 or 75)")]
pub struct DurationError(pub u32);

/// Permitted session lengths
///
/// Serialized as the plain number of minutes, so `50` on the wire
/// deserializes into `SessionDuration::Standard` and anything outside
/// the permitted set is rejected at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SessionDuration {
	Short,
	Standard,
	Extended,
}

impl SessionDuration {
	pub const ALL: [SessionDuration; 3] = [
		SessionDuration::Short,
		SessionDuration::Standard,
		SessionDuration::Extended,
	];

	pub fn minutes(self) -> u32 {
		match self {
			SessionDuration::Short => 25,
			SessionDuration::Standard => 50,
			SessionDuration::Extended => 75,
		}
	}
}

impl TryFrom<u32> for SessionDuration {
	type Error = DurationError;

	fn try_from(minutes: u32) -> Result<Self, Self::Error> {
		match minutes {
			25 => Ok(SessionDuration::Short),
			50 => Ok(SessionDuration::Standard),
			75 => Ok(SessionDuration::Extended),
			other => Err(DurationError(other)),
		}
	}
}

impl From<SessionDuration> for u32 {
	fn from(duration: SessionDuration) -> Self {
		duration.minutes()
	}
}

impl fmt::Display for SessionDuration {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} min", self.minutes())
	}
}

/// Decision code attached to every match outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
	/// A partner was found and both users left the queue
	Matched,
	/// Nobody compatible right now; keep polling
	NoMatch,
	/// Nobody compatible and the request has waited past the timeout
	Timeout,
	/// Reserved for a solo-session fallback chosen by the caller
	SoloMode,
}

/// Result of a matching attempt for one user
///
/// `participants` and `matched_at` are present only when `matched` is true.
/// `reason` is always present so callers can branch on a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOutcome {
	pub matched: bool,
	/// Session the outcome refers to (the requester's own)
	pub session_id: String,
	/// Unordered pair of matched user ids
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub participants: Option<[String; 2]>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub matched_at: Option<DateTime<Utc>>,
	pub reason: MatchReason,
}

impl MatchOutcome {
	/// Successful pairing
	pub fn paired(
		session_id: impl Into<String>,
		requester: impl Into<String>,
		partner: impl Into<String>,
		matched_at: DateTime<Utc>,
	) -> Self {
		Self {
			matched: true,
			session_id: session_id.into(),
			participants: Some([requester.into(), partner.into()]),
			matched_at: Some(matched_at),
			reason: MatchReason::Matched,
		}
	}

	/// Non-matched outcome with the given decision code
	pub fn unmatched(session_id: impl Into<String>, reason: MatchReason) -> Self {
		Self {
			matched: false,
			session_id: session_id.into(),
			participants: None,
			matched_at: None,
			reason,
		}
	}

	/// Whether the given user is one of the participants
	pub fn involves(&self, user_id: &str) -> bool {
		self.participants
			.as_ref()
			.is_some_and(|pair| pair.iter().any(|p| p == user_id))
	}

	/// The other participant, if `user_id` is part of the pair
	pub fn partner_of(&self, user_id: &str) -> Option<&str> {
		let [a, b] = self.participants.as_ref()?;
		if a == user_id {
			Some(b)
		} else if b == user_id {
			Some(a)
		} else {
			None
		}
	}
}

/// Request body for asking to be paired
///
/// The requesting user is identified by the transport (authenticated
/// upstream), never by the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPartnerRequest {
	pub session_id: String,
	pub duration: SessionDuration,
	pub start_time: DateTime<Utc>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timezone: Option<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub preferred_partner_ids: Vec<String>,
}

/// Response from a withdrawal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawResponse {
	pub user_id: String,
	/// Whether an entry was actually removed
	pub withdrawn: bool,
}

/// Response from a batch pass over the whole queue
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
	pub matched_pairs: usize,
	pub remaining: usize,
	pub outcomes: Vec<MatchOutcome>,
}

/// Session lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
	Scheduled,
	Active,
	Completed,
	Cancelled,
}

/// A user attached to a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionParticipant {
	pub user_id: String,
	pub joined_at: DateTime<Utc>,
}

/// Session record as held by the session store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
	pub session_id: String,
	pub status: SessionStatus,
	pub participants: Vec<SessionParticipant>,
	pub updated_at: DateTime<Utc>,
}

/// Health endpoint payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
	pub status: String,
	pub service: String,
	pub queued: usize,
	pub pairs_formed: u64,
	pub sweeps: u64,
}
