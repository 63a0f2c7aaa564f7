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
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Clone)]
pub struct BenchMetrics {
	pub requested: Arc<AtomicU64>,
	pub matched: Arc<AtomicU64>,
	pub start_time: std::time::Instant,
}

impl BenchMetrics {
	pub fn new() -> Self {
		Self {
			requested: Arc::new(AtomicU64::new(0)),
			matched: Arc::new(AtomicU64::new(0)),
			start_time: std::time::Instant::now(),
		}
	}

	pub fn record(&self, matched: bool) {
		self.requested.fetch_add(1, Ordering::Relaxed);
		if matched {
			self.matched.fetch_add(1, Ordering::Relaxed);
		}
	}

	pub fn report(&self) -> BenchReport {
		let elapsed = self.start_time.elapsed().as_secs_f64();
		let requested = self.requested.load(Ordering::Relaxed);
		let matched = self.matched.load(Ordering::Relaxed);

		BenchReport {
			total_requested: requested,
			total_matched: matched,
			throughput: requested as f64 / elapsed,
		}
	}
}

pub struct BenchReport {
	pub total_requested: u64,
	pub total_matched: u64,
	pub throughput: f64,
}
