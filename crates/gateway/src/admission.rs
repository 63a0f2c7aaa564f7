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

//! Admission control for Gateway
//!
//! Checks applied before a request reaches the matching engine:
//! - Rate limiting per user
//! - Start time inside the bookable range
//! - Body shape the engine does not check itself (blank ids, list sizes)
//!
//! Duration legality needs no check here: `SessionDuration` only
//! deserializes from 25, 50 or 75.

use std::{num::NonZeroU32, sync::Arc, time::Duration};

use buddy_sdk::types::RequestPartnerRequest;
use chrono::{DateTime, Utc};
use governor::{Quota, RateLimiter};
use moka::sync::Cache;
use thiserror::Error;

use crate::{auth::Principal, config::MAX_PREFERRED_PARTNERS};

/// Error types for admission control
#[derive(Debug, Error)]
pub enum AdmissionError {
	#[error("Invalid request: {0}")]
	InvalidRequest(String),
	#[error("Rate limit exceeded")]
	RateLimitExceeded,
	#[error("Start time {0} is outside the bookable range")]
	StartTimeOutOfRange(DateTime<Utc>),
}

type UserRateLimiter = Arc<
	RateLimiter<
		governor::state::direct::NotKeyed,
		governor::state::InMemoryState,
		governor::clock::DefaultClock,
	>,
>;

/// Limits applied by the admission controller
#[derive(Debug, Clone)]
pub struct AdmissionConfig {
	pub requests_per_second: u32,
	pub burst: u32,
	/// Latest bookable start, relative to now
	pub max_advance_booking: chrono::Duration,
	/// Earliest accepted start, relative to now (the matching window)
	pub max_start_lag: chrono::Duration,
	pub limiter_idle: Duration,
	pub limiter_max_capacity: u64,
}

/// Admission controller
///
/// One `governor` limiter per user, held in a `moka` cache so users who
/// go quiet stop costing memory.
pub struct AdmissionController {
	rate_limiters: Cache<String, UserRateLimiter>,
	quota: Quota,
	max_advance_booking: chrono::Duration,
	max_start_lag: chrono::Duration,
}

impl AdmissionController {
	pub fn new(config: &AdmissionConfig) -> Self {
		let quota = Quota::per_second(NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN))
			.allow_burst(NonZeroU32::new(config.burst).unwrap_or(NonZeroU32::MIN));

		let rate_limiters = Cache::builder()
			.max_capacity(config.limiter_max_capacity)
			.time_to_idle(config.limiter_idle)
			.build();

		Self {
			rate_limiters,
			quota,
			max_advance_booking: config.max_advance_booking,
			max_start_lag: config.max_start_lag,
		}
	}

	/// Check rate limit for a user
	pub fn check_rate_limit(&self, principal: &Principal) -> Result<(), AdmissionError> {
		let limiter = self
			.rate_limiters
			.get_with(principal.id().to_string(), || Arc::new(RateLimiter::direct(self.quota)));

		limiter
			.check()
			.map_err(|_| AdmissionError::RateLimitExceeded)
	}

	/// Validate a request-a-partner body
	pub fn validate_request(
		&self,
		request: &RequestPartnerRequest,
		now: DateTime<Utc>,
	) -> Result<(), AdmissionError> {
		if request.session_id.trim().is_empty() {
			return Err(AdmissionError::InvalidRequest(
				"sessionId is required".to_string(),
			));
		}

		if request.start_time < now - self.max_start_lag
			|| request.start_time > now + self.max_advance_booking
		{
			return Err(AdmissionError::StartTimeOutOfRange(request.start_time));
		}

		if let Some(timezone) = &request.timezone
			&& timezone.len() > 64
		{
			return Err(AdmissionError::InvalidRequest(
				"timezone is too long".to_string(),
			));
		}

		if request.preferred_partner_ids.len() > MAX_PREFERRED_PARTNERS {
			return Err(AdmissionError::InvalidRequest(format!(
				"at most {} preferred partners are allowed",
				MAX_PREFERRED_PARTNERS
			)));
		}
		if request
			.preferred_partner_ids
			.iter()
			.any(|id| id.trim().is_empty())
		{
			return Err(AdmissionError::InvalidRequest(
				"preferred partner ids must not be blank".to_string(),
			));
		}

		Ok(())
	}
}
