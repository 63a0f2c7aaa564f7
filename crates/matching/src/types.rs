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

use std::collections::BTreeSet;

use buddy_sdk::types::SessionDuration;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's request to be paired, as held in the queue
///
/// The request has already been authenticated and admitted by the
/// transport layer; the engine only checks that the identifiers are
/// present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRequest {
	/// Opaque id of the waiting user (queue key)
	pub user_id: String,
	/// Session row this request binds to once matched
	pub session_id: String,
	/// Requested session length; must be equal on both sides of a pair
	pub duration: SessionDuration,
	/// When the user wants the session to begin
	pub start_time: DateTime<Utc>,
	/// When the request entered the queue (fairness and timeout)
	pub requested_at: DateTime<Utc>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timezone: Option<String>,
	#[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
	pub preferred_partner_ids: BTreeSet<String>,
}

impl MatchRequest {
	pub fn new(
		user_id: impl Into<String>,
		session_id: impl Into<String>,
		duration: SessionDuration,
		start_time: DateTime<Utc>,
		requested_at: DateTime<Utc>,
	) -> Self {
		Self {
			user_id: user_id.into(),
			session_id: session_id.into(),
			duration,
			start_time,
			requested_at,
			timezone: None,
			preferred_partner_ids: BTreeSet::new(),
		}
	}

	pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
		self.timezone = Some(timezone.into());
		self
	}

	pub fn with_preferred_partners<I, S>(mut self, partners: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.preferred_partner_ids = partners.into_iter().map(Into::into).collect();
		self
	}

	/// Whether this request names `user_id` as a preferred partner
	pub fn prefers(&self, user_id: &str) -> bool {
		self.preferred_partner_ids.contains(user_id)
	}

	/// Non-empty timezone, if any
	pub fn timezone(&self) -> Option<&str> {
		self.timezone.as_deref().filter(|tz| !tz.is_empty())
	}

	/// Structural well-formedness check applied on enqueue
	pub fn validate(&self) -> Result<(), MatchingError> {
		validate_user_id(&self.user_id)?;
		if self.session_id.trim().is_empty() {
			return Err(MatchingError::InvalidRequest(format!(
				"session id is blank for user {}",
				self.user_id
			)));
		}
		Ok(())
	}
}

/// Error types for matching operations
///
/// Only structural misuse is an error. "Nobody compatible" and
/// "waited too long" are reported through `MatchOutcome::reason`.
#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
	#[error("Invalid user id: {0:?}")]
	InvalidUserId(String),
	#[error("Invalid request: {0}")]
	InvalidRequest(String),
}

/// Reject blank identifiers
pub(crate) fn validate_user_id(user_id: &str) -> Result<(), MatchingError> {
	if user_id.trim().is_empty() {
		return Err(MatchingError::InvalidUserId(user_id.to_string()));
	}
	Ok(())
}
