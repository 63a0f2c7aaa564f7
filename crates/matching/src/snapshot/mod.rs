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

mod storage;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::MatchRequest;
pub use storage::{FileSnapshotStorage, MemorySnapshotStorage, SnapshotStorage};

/// Error types for snapshot operations
#[derive(Debug, Error)]
pub enum SnapshotError {
	#[error("Failed to save snapshot: {0}")]
	SaveFailed(String),
	#[error("Failed to load snapshot: {0}")]
	LoadFailed(String),
	#[error("Snapshot corrupted: {0}")]
	Corrupted(String),
	#[error("No snapshot available")]
	NotFound,
}

/// Pending requests captured at one instant
///
/// `entries` are in queue order, so restoring a snapshot rebuilds the
/// queue with every user in their original position. Timeouts keep
/// counting from each entry's `requested_at`, not from the restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
	pub taken_at: DateTime<Utc>,
	pub entries: Vec<MatchRequest>,
}

impl QueueSnapshot {
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
