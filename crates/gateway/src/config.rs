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

use std::{env, net::SocketAddr, str::FromStr};

use anyhow::{Context, Result};
use buddy_matching::MatchingConfig;

// Logging configuration constants
/// Default log level (can be overridden by RUST_LOG environment variable)
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default log directory component name
pub const LOG_COMPONENT_NAME: &str = "gateway";

/// Default console output enabled (can be overridden by LOG_TO_CONSOLE environment variable)
pub const DEFAULT_LOG_TO_CONSOLE: bool = false;

// Server configuration constants
/// Default HTTP server bind address (can be overridden by GATEWAY_BIND_ADDR environment variable)
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Default maximum HTTP request body size in bytes (can be overridden by GATEWAY_MAX_BODY_BYTES)
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024;

// Admission configuration constants
/// Default requests-per-second limit per user (can be overridden by GATEWAY_RATE_LIMIT_RPS)
pub const DEFAULT_RATE_LIMIT_RPS: u32 = 5;

/// Default burst capacity per user (can be overridden by GATEWAY_RATE_LIMIT_BURST)
pub const DEFAULT_RATE_LIMIT_BURST: u32 = 10;

/// How far ahead a session may be booked (can be overridden by GATEWAY_MAX_ADVANCE_BOOKING_SECS)
pub const DEFAULT_MAX_ADVANCE_BOOKING_SECS: u64 = 7 * 24 * 60 * 60;

/// Idle time after which a user's rate limiter is dropped (GATEWAY_LIMITER_IDLE_SECS)
pub const DEFAULT_LIMITER_IDLE_SECS: u64 = 10 * 60;

/// Upper bound on tracked rate limiters (GATEWAY_LIMITER_MAX_CAPACITY)
pub const DEFAULT_LIMITER_MAX_CAPACITY: u64 = 100_000;

/// Longest accepted preferred-partner list
pub const MAX_PREFERRED_PARTNERS: usize = 50;

#[derive(Debug, Clone)]
pub struct GatewayRuntimeConfig {
	pub bind_addr: SocketAddr,
	pub workers: usize,
	pub max_body_bytes: usize,
	pub rate_limit_rps: u32,
	pub rate_limit_burst: u32,
	pub max_advance_booking_secs: u64,
	pub limiter_idle_secs: u64,
	pub limiter_max_capacity: u64,
	pub matching: MatchingConfig,
}

impl Default for GatewayRuntimeConfig {
	fn default() -> Self {
		Self {
			bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
			workers: num_cpus::get(),
			max_body_bytes: DEFAULT_MAX_BODY_BYTES,
			rate_limit_rps: DEFAULT_RATE_LIMIT_RPS,
			rate_limit_burst: DEFAULT_RATE_LIMIT_BURST,
			max_advance_booking_secs: DEFAULT_MAX_ADVANCE_BOOKING_SECS,
			limiter_idle_secs: DEFAULT_LIMITER_IDLE_SECS,
			limiter_max_capacity: DEFAULT_LIMITER_MAX_CAPACITY,
			matching: MatchingConfig::default(),
		}
	}
}

/// Read a variable, falling back to `default` when it is unset or unparsable
fn env_or<T: FromStr>(key: &str, default: T) -> T {
	env::var(key)
		.ok()
		.and_then(|v| v.parse().ok())
		.unwrap_or(default)
}

impl GatewayRuntimeConfig {
	pub fn from_env() -> Result<Self> {
		dotenv::dotenv().ok();

		let bind_addr_str =
			env::var("GATEWAY_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
		let bind_addr = bind_addr_str
			.parse()
			.with_context(|| format!("Invalid bind address: {}", bind_addr_str))?;

		let matching = match env::var("MATCHING_CONFIG_FILE") {
			Ok(path) => MatchingConfig::from_file(&path)
				.with_context(|| format!("Failed to load matching config from {}", path))?,
			Err(_) => MatchingConfig::from_env().context("Failed to load matching config")?,
		};

		Ok(Self {
			bind_addr,
			workers: env_or("GATEWAY_WORKERS", num_cpus::get()).max(1),
			max_body_bytes: env_or("GATEWAY_MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES),
			rate_limit_rps: env_or("GATEWAY_RATE_LIMIT_RPS", DEFAULT_RATE_LIMIT_RPS).max(1),
			rate_limit_burst: env_or("GATEWAY_RATE_LIMIT_BURST", DEFAULT_RATE_LIMIT_BURST).max(1),
			max_advance_booking_secs: env_or(
				"GATEWAY_MAX_ADVANCE_BOOKING_SECS",
				DEFAULT_MAX_ADVANCE_BOOKING_SECS,
			),
			limiter_idle_secs: env_or("GATEWAY_LIMITER_IDLE_SECS", DEFAULT_LIMITER_IDLE_SECS),
			limiter_max_capacity: env_or("GATEWAY_LIMITER_MAX_CAPACITY", DEFAULT_LIMITER_MAX_CAPACITY),
			matching,
		})
	}
}
