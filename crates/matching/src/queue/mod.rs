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

use std::collections::{BTreeMap, HashMap};

use crate::types::MatchRequest;

#[derive(Debug, Clone)]
struct QueuedEntry {
	/// Position key in `order`
	seq: u64,
	request: MatchRequest,
}

/// Insertion-ordered queue of pending match requests, keyed by user id
///
/// Iteration order is the order in which users first entered the queue.
/// Replacing a user's request keeps their original position, so
/// re-submitting never costs a user their place.
///
/// The queue itself is single-threaded; `MatchingEngine` wraps it in the
/// critical section that makes pairing atomic.
#[derive(Debug, Clone, Default)]
pub struct MatchQueue {
	entries: HashMap<String, QueuedEntry>,
	/// seq -> user id, in insertion order
	order: BTreeMap<u64, String>,
	next_seq: u64,
}

impl MatchQueue {
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert or replace the entry for `request.user_id`
	///
	/// Returns the replaced request, if any.
	pub fn upsert(&mut self, request: MatchRequest) -> Option<MatchRequest> {
		if let Some(entry) = self.entries.get_mut(&request.user_id) {
			return Some(std::mem::replace(&mut entry.request, request));
		}

		let seq = self.next_seq;
		self.next_seq += 1;
		self.order.insert(seq, request.user_id.clone());
		self.entries
			.insert(request.user_id.clone(), QueuedEntry { seq, request });
		None
	}

	pub fn remove(&mut self, user_id: &str) -> Option<MatchRequest> {
		let entry = self.entries.remove(user_id)?;
		self.order.remove(&entry.seq);
		Some(entry.request)
	}

	pub fn get(&self, user_id: &str) -> Option<&MatchRequest> {
		self.entries.get(user_id).map(|e| &e.request)
	}

	pub fn contains(&self, user_id: &str) -> bool {
		self.entries.contains_key(user_id)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn clear(&mut self) {
		self.entries.clear();
		self.order.clear();
	}

	/// Requests in insertion order
	pub fn iter(&self) -> impl Iterator<Item = &MatchRequest> + '_ {
		self.order
			.values()
			.filter_map(|user_id| self.entries.get(user_id).map(|e| &e.request))
	}

	/// User ids in insertion order, detached from the queue borrow
	pub fn user_ids(&self) -> Vec<String> {
		self.order.values().cloned().collect()
	}
}
