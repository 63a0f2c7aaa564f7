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

//! Buddy Matching Engine
//!
//! Pairs users who ask for an accountability session with a compatible
//! partner. Requests wait in an insertion-ordered queue; a matching
//! attempt filters the queue by duration and start-time window, scores
//! the survivors and removes the winning pair atomically.
//!
//! Architecture:
//! - One mutex-guarded queue; every pairing decision is a single critical section
//! - Injected clock, so timeouts and fairness are deterministic under test
//! - Passive engine: batch passes and eviction are driven by the caller (see `sweeper`)
//! - Session store and queue snapshots as pluggable traits

pub mod clock;
pub mod config;
pub mod engine;
pub mod policy;
pub mod queue;
pub mod session;
pub mod snapshot;
pub mod sweeper;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::MatchingConfig;
pub use engine::{EngineConfig, EngineStats, MatchingEngine};
pub use policy::MatchPolicy;
pub use queue::MatchQueue;
pub use session::{MemorySessionStore, SessionStore, SessionStoreError};
pub use snapshot::{FileSnapshotStorage, MemorySnapshotStorage, QueueSnapshot, SnapshotError, SnapshotStorage};
pub use sweeper::{SweepSummary, Sweeper, SweeperConfig, sweep_once};
pub use types::*;
