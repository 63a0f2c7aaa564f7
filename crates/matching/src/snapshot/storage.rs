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
	fs, io,
	path::{Path, PathBuf},
};

use tracing::{debug, info};

use super::{QueueSnapshot, SnapshotError};

/// Persistence layer for queue snapshots
///
/// Only the most recent snapshot matters; saving replaces the previous one.
pub trait SnapshotStorage: Send {
	fn save(&mut self, snapshot: &QueueSnapshot) -> Result<(), SnapshotError>;

	/// Load the most recent snapshot, `NotFound` if none was ever saved
	fn load_latest(&self) -> Result<QueueSnapshot, SnapshotError>;
}

/// In-memory snapshot storage for tests and ephemeral deployments
#[derive(Debug, Default)]
pub struct MemorySnapshotStorage {
	latest: Option<QueueSnapshot>,
	saves: usize,
}

impl MemorySnapshotStorage {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of successful saves
	pub fn saves(&self) -> usize {
		self.saves
	}
}

impl SnapshotStorage for MemorySnapshotStorage {
	fn save(&mut self, snapshot: &QueueSnapshot) -> Result<(), SnapshotError> {
		self.latest = Some(snapshot.clone());
		self.saves += 1;
		Ok(())
	}

	fn load_latest(&self) -> Result<QueueSnapshot, SnapshotError> {
		self.latest.clone().ok_or(SnapshotError::NotFound)
	}
}

/// Single JSON file on local disk
///
/// Writes go to a sibling `.tmp` file that is then renamed over the
/// target, so a crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileSnapshotStorage {
	path: PathBuf,
}

impl FileSnapshotStorage {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn temp_path(&self) -> PathBuf {
		let mut name = self.path.file_name().unwrap_or_default().to_os_string();
		name.push(".tmp");
		self.path.with_file_name(name)
	}
}

impl SnapshotStorage for FileSnapshotStorage {
	fn save(&mut self, snapshot: &QueueSnapshot) -> Result<(), SnapshotError> {
		let data = serde_json::to_vec_pretty(snapshot)
			.map_err(|e| SnapshotError::SaveFailed(e.to_string()))?;

		if let Some(parent) = self.path.parent()
			&& !parent.as_os_str().is_empty()
		{
			fs::create_dir_all(parent).map_err(|e| SnapshotError::SaveFailed(e.to_string()))?;
		}

		let temp = self.temp_path();
		fs::write(&temp, &data).map_err(|e| SnapshotError::SaveFailed(e.to_string()))?;
		fs::rename(&temp, &self.path).map_err(|e| SnapshotError::SaveFailed(e.to_string()))?;

		info!(
			target: "snapshot",
			path = %self.path.display(),
			entries = snapshot.len(),
			size_bytes = data.len(),
			"Snapshot saved"
		);
		Ok(())
	}

	fn load_latest(&self) -> Result<QueueSnapshot, SnapshotError> {
		let data = match fs::read(&self.path) {
			Ok(data) => data,
			Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(SnapshotError::NotFound),
			Err(e) => return Err(SnapshotError::LoadFailed(e.to_string())),
		};

		let snapshot: QueueSnapshot =
			serde_json::from_slice(&data).map_err(|e| SnapshotError::Corrupted(e.to_string()))?;

		debug!(
			target: "snapshot",
			path = %self.path.display(),
			entries = snapshot.len(),
			"Snapshot loaded"
		);
		Ok(snapshot)
	}
}
