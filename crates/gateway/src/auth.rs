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

//! Caller identity for Gateway
//!
//! Gateway does not authenticate users itself. An upstream layer (API
//! gateway, session middleware) verifies the caller and forwards the
//! resulting user id in the `X-User-Id` header. This module only extracts
//! and sanity-checks that id.
//!
//! # Identity Model
//!
//! - **Principal**: the authenticated user on whose behalf a request runs
//! - **AuthContext**: request metadata the identity is read from
//! - **AuthProvider**: pluggable extraction, so deployments can switch to
//!   e.g. JWT claims without touching the handlers
//!
//! Identity never comes from the request body. A body cannot name another
//! user as the requester.

use actix_web::http::header::HeaderMap;
use buddy_sdk::USER_ID_HEADER;
use thiserror::Error;

/// Longest accepted user id
pub const MAX_USER_ID_LEN: usize = 128;

/// Error types for identity extraction
#[derive(Debug, Error)]
pub enum AuthError {
	#[error("Missing X-User-Id header")]
	MissingUserId,
	#[error("Invalid user id: {0}")]
	InvalidUserId(String),
}

/// The authenticated user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
	user_id: String,
}

impl Principal {
	/// Build a principal after checking the id's shape
	///
	/// Accepts 1 to `MAX_USER_ID_LEN` visible ASCII characters.
	pub fn new(user_id: &str) -> Result<Self, AuthError> {
		if user_id.is_empty() {
			return Err(AuthError::InvalidUserId("empty".to_string()));
		}
		if user_id.len() > MAX_USER_ID_LEN {
			return Err(AuthError::InvalidUserId(format!(
				"longer than {} characters",
				MAX_USER_ID_LEN
			)));
		}
		if !user_id.bytes().all(|b| b.is_ascii_graphic()) {
			return Err(AuthError::InvalidUserId(
				"only visible ASCII characters are allowed".to_string(),
			));
		}

		Ok(Self {
			user_id: user_id.to_string(),
		})
	}

	pub fn id(&self) -> &str {
		&self.user_id
	}
}

/// Request metadata identity is extracted from
pub struct AuthContext<'a> {
	pub http_headers: &'a HeaderMap,
}

impl<'a> AuthContext<'a> {
	pub fn from_http(headers: &'a HeaderMap) -> Self {
		Self {
			http_headers: headers,
		}
	}
}

/// Authentication provider trait
pub trait AuthProvider: Send + Sync {
	fn authenticate(&self, ctx: &AuthContext) -> Result<Principal, AuthError>;
}

/// Trusts the `X-User-Id` header set by the upstream auth layer
pub struct HeaderAuthProvider;

impl AuthProvider for HeaderAuthProvider {
	fn authenticate(&self, ctx: &AuthContext) -> Result<Principal, AuthError> {
		let value = ctx
			.http_headers
			.get(USER_ID_HEADER)
			.ok_or(AuthError::MissingUserId)?;

		let user_id = value
			.to_str()
			.map_err(|e| AuthError::InvalidUserId(format!("Invalid header: {}", e)))?;

		Principal::new(user_id)
	}
}
