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

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{engine::EngineConfig, policy::MatchPolicy, sweeper::SweeperConfig};

/// Matchmaking configuration
///
/// Environment keys use the `MATCHING_` prefix with `__` between nested
/// levels, e.g. `MATCHING_POLICY__START_WINDOW_SECS=600`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
	pub policy: MatchPolicy,
	/// Pause between sweeper passes; 0 disables the sweeper
	pub sweep_interval_ms: u64,
	/// Let the sweeper withdraw requests that reported `timeout`
	pub evict_timed_out: bool,
	/// JSON file the queue is persisted to across restarts
	pub snapshot_path: Option<PathBuf>,
	pub verbose_logging: bool,
}

impl MatchingConfig {
	/// Load configuration from environment variables
	pub fn from_env() -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(Self::environment())
			.build()?;

		cfg.try_deserialize()
	}

	/// Load configuration from file, with environment overrides
	pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::File::with_name(path))
			.add_source(Self::environment())
			.build()?;

		cfg.try_deserialize()
	}

	fn environment() -> config::Environment {
		config::Environment::with_prefix("MATCHING")
			.prefix_separator("_")
			.separator("__")
			.try_parsing(true)
	}

	pub fn engine_config(&self) -> EngineConfig {
		EngineConfig {
			policy: self.policy.clone(),
			verbose_logging: self.verbose_logging,
		}
	}

	/// Sweeper settings, `None` when sweeping is disabled
	pub fn sweeper_config(&self) -> Option<SweeperConfig> {
		(self.sweep_interval_ms > 0).then(|| SweeperConfig {
			interval: Duration::from_millis(self.sweep_interval_ms),
			evict_timed_out: self.evict_timed_out,
		})
	}
}
