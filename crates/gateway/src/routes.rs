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

use actix_web::web;

use crate::handlers;

/// Configure API routes for the gateway
///
/// - `/api/v1/match` - request a partner, poll, withdraw
/// - `/api/v1/match/sweep` - batch pass over the whole queue
/// - `/api/v1/sessions/{session_id}` - session lookup
/// - `/health` - health check with engine counters
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
	cfg.service(
		web::scope("/api/v1")
			.route("/match", web::post().to(handlers::request_partner))
			.route("/match", web::get().to(handlers::poll_match))
			.route("/match", web::delete().to(handlers::withdraw))
			.route("/match/sweep", web::post().to(handlers::sweep))
			.route("/sessions/{session_id}", web::get().to(handlers::get_session)),
	)
	.route("/health", web::get().to(handlers::health));
}
