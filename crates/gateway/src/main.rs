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

//! Buddy Gateway Service
//!
//! HTTP front door for the matching engine. Callers arrive already
//! authenticated by an upstream layer, which forwards their user id in the
//! `X-User-Id` header. The gateway applies admission control, turns a
//! "request a partner" call into enqueue plus an immediate matching
//! attempt, and records matched pairs in the session store.

mod admission;
mod auth;
mod config;
mod handlers;
mod logging;
mod middleware;
mod routes;
mod server;

use anyhow::{Context, Result};
use tracing::info;

use crate::{config::GatewayRuntimeConfig, logging::init_logging};
use server::GatewayServer;

#[actix_rt::main]
async fn main() -> Result<()> {
	init_logging()?;

	let config = GatewayRuntimeConfig::from_env()?;
	info!(target: "server", "Starting Buddy Gateway on {}", config.bind_addr);
	info!(
		target: "server",
		window_secs = config.matching.policy.start_window_secs,
		timeout_secs = config.matching.policy.timeout_secs,
		sweep_interval_ms = config.matching.sweep_interval_ms,
		evict_timed_out = config.matching.evict_timed_out,
		"Matching policy loaded"
	);

	let server = GatewayServer::new(config).context("Failed to create gateway server")?;
	server.serve().await.context("Gateway server failed")?;

	info!(target: "server", "Gateway stopped");
	Ok(())
}
