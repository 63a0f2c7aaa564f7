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

use std::time::Duration;

use reqwest::{Client as ReqwestClient, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::types::{
	HealthResponse, MatchOutcome, RequestPartnerRequest, SessionRecord, SweepResponse,
	WithdrawResponse,
};

/// Header carrying the already-authenticated user id
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Error types for client operations
#[derive(Debug, Error)]
pub enum ClientError {
	#[error("Network error: {0}")]
	Network(String),
	#[error("Serialization error: {0}")]
	Serialization(String),
	#[error("Server error: {0}")]
	Server(String),
	#[error("Not found: {0}")]
	NotFound(String),
	#[error("Client setup error: {0}")]
	Setup(String),
}

/// Client for the matchmaking gateway
///
/// Every call acts on behalf of one user, passed explicitly; the
/// gateway expects that id to have been authenticated upstream.
pub struct Client {
	base_url: String,
	client: ReqwestClient,
}

impl Client {
	/// Create a new client with the default 30s timeout
	pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
		Self::with_config(base_url, Duration::from_secs(30))
	}

	/// Create a new client with a custom request timeout
	pub fn with_config(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
		let client = ReqwestClient::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| ClientError::Setup(e.to_string()))?;

		Ok(Self {
			base_url: base_url.into().trim_end_matches('/').to_string(),
			client,
		})
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}

	/// Enqueue the user and try to pair them immediately
	pub async fn request_partner(
		&self,
		user_id: &str,
		request: &RequestPartnerRequest,
	) -> Result<MatchOutcome, ClientError> {
		let builder = self
			.client
			.post(self.url("/api/v1/match"))
			.header(USER_ID_HEADER, user_id)
			.json(request);
		Self::send_json(builder).await
	}

	/// Re-run matching for a user already in the queue
	pub async fn poll(&self, user_id: &str) -> Result<MatchOutcome, ClientError> {
		let builder = self
			.client
			.get(self.url("/api/v1/match"))
			.header(USER_ID_HEADER, user_id);
		Self::send_json(builder).await
	}

	/// Leave the queue
	pub async fn withdraw(&self, user_id: &str) -> Result<WithdrawResponse, ClientError> {
		let builder = self
			.client
			.delete(self.url("/api/v1/match"))
			.header(USER_ID_HEADER, user_id);
		Self::send_json(builder).await
	}

	/// Trigger a batch pass over the whole queue
	pub async fn sweep(&self) -> Result<SweepResponse, ClientError> {
		let builder = self.client.post(self.url("/api/v1/match/sweep"));
		Self::send_json(builder).await
	}

	/// Fetch a session record
	pub async fn session(&self, session_id: &str) -> Result<SessionRecord, ClientError> {
		let builder = self
			.client
			.get(self.url(&format!("/api/v1/sessions/{}", session_id)));
		Self::send_json(builder).await
	}

	/// Check gateway health
	pub async fn health_check(&self) -> Result<HealthResponse, ClientError> {
		Self::send_json(self.client.get(self.url("/health"))).await
	}

	async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ClientError> {
		let response = builder
			.send()
			.await
			.map_err(|e| ClientError::Network(format!("Request failed: {}", e)))?;

		let response = Self::check_status(response).await?;

		response
			.json()
			.await
			.map_err(|e| ClientError::Serialization(format!("Failed to parse response: {}", e)))
	}

	async fn check_status(response: Response) -> Result<Response, ClientError> {
		let status = response.status();
		if status.is_success() {
			return Ok(response);
		}

		let error_text = response
			.text()
			.await
			.unwrap_or_else(|_| format!("HTTP {}", status));

		if status == StatusCode::NOT_FOUND {
			Err(ClientError::NotFound(error_text))
		} else {
			Err(ClientError::Server(format!("{}: {}", status, error_text)))
		}
	}
}

/// Synchronous client wrapper
///
/// Runs the async client on its own tokio runtime; handy for scripts and
/// admin tooling that sweep the queue outside an async context.
pub struct SyncClient {
	client: Client,
	runtime: tokio::runtime::Runtime,
}

impl SyncClient {
	pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
		let runtime = tokio::runtime::Runtime::new()
			.map_err(|e| ClientError::Setup(format!("Failed to create tokio runtime: {}", e)))?;
		Ok(Self {
			client: Client::new(base_url)?,
			runtime,
		})
	}

	pub fn request_partner(
		&self,
		user_id: &str,
		request: &RequestPartnerRequest,
	) -> Result<MatchOutcome, ClientError> {
		self.runtime
			.block_on(self.client.request_partner(user_id, request))
	}

	pub fn poll(&self, user_id: &str) -> Result<MatchOutcome, ClientError> {
		self.runtime.block_on(self.client.poll(user_id))
	}

	pub fn withdraw(&self, user_id: &str) -> Result<WithdrawResponse, ClientError> {
		self.runtime.block_on(self.client.withdraw(user_id))
	}

	pub fn sweep(&self) -> Result<SweepResponse, ClientError> {
		self.runtime.block_on(self.client.sweep())
	}
}
