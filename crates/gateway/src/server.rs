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

use std::sync::Arc;

use actix_web::{App, HttpResponse, HttpServer, error::InternalError, web};
use anyhow::{Context, Result};
use buddy_matching::{
	FileSnapshotStorage, MatchingEngine, MemorySessionStore, SessionStore, SnapshotError,
	SnapshotStorage, Sweeper,
};
use tracing::{error, info};

use crate::{
	admission::{AdmissionConfig, AdmissionController},
	auth::{AuthProvider, HeaderAuthProvider},
	config::GatewayRuntimeConfig,
	middleware::LoggingMiddleware,
	routes::configure_routes,
};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct GatewayState {
	pub engine: Arc<MatchingEngine>,
	pub sessions: Arc<dyn SessionStore>,
	pub admission: Arc<AdmissionController>,
	pub auth_provider: Arc<dyn AuthProvider>,
	/// Whether `/match/sweep` withdraws timed-out requests
	pub evict_timed_out: bool,
}

/// Gateway server
///
/// Owns the engine for the lifetime of the process. On start the queue is
/// restored from the configured snapshot file; on shutdown it is written
/// back, so pending requests survive a restart.
pub struct GatewayServer {
	config: GatewayRuntimeConfig,
	state: GatewayState,
	snapshots: Option<FileSnapshotStorage>,
}

impl GatewayServer {
	pub fn new(config: GatewayRuntimeConfig) -> Result<Self> {
		let matching = &config.matching;
		let engine = Arc::new(MatchingEngine::with_system_clock(matching.engine_config()));

		let snapshots = matching.snapshot_path.clone().map(FileSnapshotStorage::new);
		if let Some(storage) = &snapshots {
			match storage.load_latest() {
				Ok(snapshot) => {
					let restored = engine
						.restore(snapshot)
						.context("Snapshot contains an invalid request")?;
					info!(target: "server", restored, path = %storage.path().display(), "Queue restored");
				}
				Err(SnapshotError::NotFound) => {
					info!(target: "server", path = %storage.path().display(), "No snapshot, starting with an empty queue");
				}
				Err(e) => return Err(e).context("Failed to load queue snapshot"),
			}
		}

		let admission = AdmissionController::new(&AdmissionConfig {
			requests_per_second: config.rate_limit_rps,
			burst: config.rate_limit_burst,
			max_advance_booking: chrono::Duration::seconds(
				i64::try_from(config.max_advance_booking_secs).unwrap_or(i64::MAX / 1000),
			),
			max_start_lag: chrono::Duration::seconds(
				i64::try_from(matching.policy.start_window_secs).unwrap_or(i64::MAX / 1000),
			),
			limiter_idle: std::time::Duration::from_secs(config.limiter_idle_secs),
			limiter_max_capacity: config.limiter_max_capacity,
		});

		let state = GatewayState {
			engine,
			sessions: Arc::new(MemorySessionStore::new()),
			admission: Arc::new(admission),
			auth_provider: Arc::new(HeaderAuthProvider),
			evict_timed_out: matching.evict_timed_out,
		};

		Ok(Self {
			config,
			state,
			snapshots,
		})
	}

	/// Run the HTTP server until it is stopped (SIGINT/SIGTERM)
	pub async fn serve(mut self) -> Result<()> {
		let sweeper = match self.config.matching.sweeper_config() {
			Some(sweeper_config) => Some(
				Sweeper::start(
					self.state.engine.clone(),
					self.state.sessions.clone(),
					sweeper_config,
				)
				.context("Failed to start sweeper")?,
			),
			None => {
				info!(target: "server", "Sweeper disabled; batch passes only via /api/v1/match/sweep");
				None
			}
		};

		let state = self.state.clone();
		let max_body_bytes = self.config.max_body_bytes;

		let server = HttpServer::new(move || {
			let json_config = web::JsonConfig::default()
				.limit(max_body_bytes)
				.error_handler(|err, _req| {
					let body = serde_json::json!({ "error": err.to_string() });
					InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
				});

			App::new()
				.app_data(web::Data::new(state.clone()))
				.app_data(json_config)
				.wrap(LoggingMiddleware)
				.configure(configure_routes)
		})
		.workers(self.config.workers)
		.bind(self.config.bind_addr)
		.with_context(|| format!("Failed to bind {}", self.config.bind_addr))?;

		info!(
			target: "server",
			addr = %self.config.bind_addr,
			workers = self.config.workers,
			"Gateway listening"
		);

		let result = server.run().await.context("HTTP server error");

		if let Some(sweeper) = sweeper {
			sweeper.shutdown();
		}
		self.persist_queue();

		result
	}

	fn persist_queue(&mut self) {
		let Some(storage) = self.snapshots.as_mut() else {
			return;
		};

		let snapshot = self.state.engine.snapshot();
		if let Err(e) = storage.save(&snapshot) {
			error!(target: "server", error = %e, "Failed to persist queue snapshot");
		}
	}
}
