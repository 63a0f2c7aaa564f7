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

use std::{
	io,
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	thread::{self, JoinHandle},
	time::{Duration, Instant},
};

use buddy_sdk::types::MatchOutcome;
use tracing::{debug, error, info, warn};

use crate::{engine::MatchingEngine, session::SessionStore};

/// Longest uninterrupted sleep, so shutdown is observed promptly
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Configuration for the Sweeper
#[derive(Debug, Clone)]
pub struct SweeperConfig {
	/// Pause between batch passes
	pub interval: Duration,
	/// Withdraw requests whose outcome in a pass was `timeout`
	pub evict_timed_out: bool,
}

impl Default for SweeperConfig {
	fn default() -> Self {
		Self {
			interval: Duration::from_secs(1),
			evict_timed_out: false,
		}
	}
}

/// Result of one batch pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
	pub matched_pairs: usize,
	pub evicted: usize,
	pub remaining: usize,
}

/// Run one batch pass and forward its results
///
/// Each pair is activated in the session store before it leaves the
/// queue. A pair the store refuses is logged and both users stay queued.
pub fn sweep_once(
	engine: &MatchingEngine,
	store: &dyn SessionStore,
	evict_timed_out: bool,
) -> (Vec<MatchOutcome>, SweepSummary) {
	let outcomes = engine.process_queue_with(|outcome| {
		store.apply_outcome(outcome).map(|_| ()).inspect_err(|e| {
			error!(
				target: "sweeper",
				session_id = %outcome.session_id,
				error = %e,
				"Failed to activate session for matched pair"
			);
		})
	});

	let mut summary = SweepSummary {
		matched_pairs: outcomes.iter().filter(|o| o.matched).count(),
		..SweepSummary::default()
	};

	if evict_timed_out {
		summary.evicted = engine.evict_timed_out().len();
	}

	summary.remaining = engine.size();
	(outcomes, summary)
}

/// Sweeper - periodically resolves the whole queue
///
/// Runs `process_queue` on a dedicated thread. The engine stays passive;
/// this is the caller-side scheduler that decides when batch passes
/// happen and what to do with timed-out requests.
pub struct Sweeper {
	thread_handle: Option<JoinHandle<()>>,
	shutdown: Arc<AtomicBool>,
}

impl Sweeper {
	pub fn start(
		engine: Arc<MatchingEngine>,
		store: Arc<dyn SessionStore>,
		config: SweeperConfig,
	) -> io::Result<Self> {
		let shutdown = Arc::new(AtomicBool::new(false));
		let shutdown_clone = shutdown.clone();

		let thread_handle = thread::Builder::new()
			.name("sweeper".to_string())
			.spawn(move || {
				info!(
					target: "sweeper",
					interval_ms = config.interval.as_millis() as u64,
					evict_timed_out = config.evict_timed_out,
					"Sweeper started"
				);
				Self::run_loop(&engine, store.as_ref(), &config, &shutdown_clone);
				info!(target: "sweeper", "Sweeper stopped");
			})?;

		Ok(Self {
			thread_handle: Some(thread_handle),
			shutdown,
		})
	}

	fn run_loop(
		engine: &MatchingEngine,
		store: &dyn SessionStore,
		config: &SweeperConfig,
		shutdown: &AtomicBool,
	) {
		loop {
			let deadline = Instant::now() + config.interval;
			while Instant::now() < deadline {
				if shutdown.load(Ordering::Relaxed) {
					return;
				}
				thread::sleep(SLEEP_SLICE.min(deadline.saturating_duration_since(Instant::now())));
			}
			if shutdown.load(Ordering::Relaxed) {
				return;
			}

			let start = Instant::now();
			let (_, summary) = sweep_once(engine, store, config.evict_timed_out);

			if summary.matched_pairs > 0 || summary.evicted > 0 {
				info!(
					target: "sweeper",
					pairs = summary.matched_pairs,
					evicted = summary.evicted,
					remaining = summary.remaining,
					elapsed_us = start.elapsed().as_micros() as u64,
					"Sweep pass"
				);
			} else {
				debug!(target: "sweeper", remaining = summary.remaining, "Sweep pass, nothing resolved");
			}
		}
	}

	pub fn shutdown(mut self) {
		info!(target: "sweeper", "Shutting down sweeper");
		self.stop();
	}

	fn stop(&mut self) {
		self.shutdown.store(true, Ordering::Relaxed);

		if let Some(handle) = self.thread_handle.take()
			&& let Err(e) = handle.join()
		{
			warn!(target: "sweeper", error = ?e, "Sweeper thread panicked");
		}
	}
}

impl Drop for Sweeper {
	fn drop(&mut self) {
		self.stop();
	}
}
