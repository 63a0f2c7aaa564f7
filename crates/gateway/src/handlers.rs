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

use actix_web::{HttpRequest, HttpResponse, http::StatusCode, web};
use buddy_matching::{MatchRequest, MatchingError, SessionStoreError, sweep_once};
use buddy_sdk::types::{
	HealthResponse, MatchOutcome, RequestPartnerRequest, SweepResponse, WithdrawResponse,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
	admission::AdmissionError,
	auth::{AuthContext, AuthError, Principal},
	server::GatewayState,
};

/// Error types for gateway operations
#[derive(Debug, Error)]
pub enum GatewayError {
	#[error("Authentication error: {0}")]
	Auth(#[from] AuthError),
	#[error("Admission error: {0}")]
	Admission(#[from] AdmissionError),
	#[error("Matching error: {0}")]
	Matching(#[from] MatchingError),
	#[error("Session error: {0}")]
	Session(#[from] SessionStoreError),
	#[error("Not found: {0}")]
	NotFound(String),
}

impl actix_web::ResponseError for GatewayError {
	fn status_code(&self) -> StatusCode {
		match self {
			GatewayError::Auth(_) => StatusCode::UNAUTHORIZED,
			GatewayError::Admission(AdmissionError::RateLimitExceeded) => StatusCode::TOO_MANY_REQUESTS,
			GatewayError::Admission(_) => StatusCode::BAD_REQUEST,
			GatewayError::Matching(_) => StatusCode::BAD_REQUEST,
			GatewayError::Session(SessionStoreError::Conflict { .. }) => StatusCode::CONFLICT,
			GatewayError::Session(SessionStoreError::InvalidSession(_)) => StatusCode::BAD_REQUEST,
			GatewayError::Session(SessionStoreError::StorageError(_)) => {
				StatusCode::INTERNAL_SERVER_ERROR
			}
			GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
		}
	}

	fn error_response(&self) -> HttpResponse {
		HttpResponse::build(self.status_code()).json(serde_json::json!({
			"error": self.to_string()
		}))
	}
}

fn authenticate(state: &GatewayState, req: &HttpRequest) -> Result<Principal, GatewayError> {
	let auth_ctx = AuthContext::from_http(req.headers());
	Ok(state.auth_provider.authenticate(&auth_ctx)?)
}

/// Activate the session for a matched outcome
fn record_match(state: &GatewayState, outcome: &MatchOutcome) -> Result<(), GatewayError> {
	if let Some(record) = state.sessions.apply_outcome(outcome)? {
		info!(
			target: "server",
			session_id = %record.session_id,
			"Session activated for matched pair"
		);
	}
	Ok(())
}

/// Health check endpoint
pub async fn health(state: web::Data<GatewayState>) -> HttpResponse {
	let stats = state.engine.stats();
	HttpResponse::Ok().json(HealthResponse {
		status: "ok".to_string(),
		service: "buddy-gateway".to_string(),
		queued: stats.queued,
		pairs_formed: stats.pairs_formed,
		sweeps: stats.sweeps,
	})
}

/// Handle a request for a partner
///
/// Enqueues (or replaces) the caller's request with `requestedAt = now`,
/// then immediately tries to match it. Not finding a partner is a normal
/// 200 response with `reason` set to `no_match` or `timeout`; the request
/// stays queued for later polls. A session id that already names a
/// session is refused before anything is queued.
pub async fn request_partner(
	state: web::Data<GatewayState>,
	req: HttpRequest,
	body: web::Json<RequestPartnerRequest>,
) -> Result<HttpResponse, GatewayError> {
	let principal = authenticate(&state, &req)?;
	state.admission.check_rate_limit(&principal)?;

	let now = state.engine.now();
	state.admission.validate_request(&body, now)?;

	let RequestPartnerRequest {
		session_id,
		duration,
		start_time,
		timezone,
		preferred_partner_ids,
	} = body.into_inner();

	let mut request = MatchRequest::new(principal.id(), session_id, duration, start_time, now)
		.with_preferred_partners(preferred_partner_ids);
	if let Some(timezone) = timezone {
		request = request.with_timezone(timezone);
	}

	if state.sessions.get(&request.session_id).is_some() {
		return Err(SessionStoreError::Conflict {
			session_id: request.session_id,
		}
		.into());
	}

	state.sessions.release(principal.id());
	let outcome = state
		.engine
		.enqueue_and_match_with(request, |outcome| record_match(&state, outcome))?;

	Ok(HttpResponse::Ok().json(outcome))
}

/// Poll for a partner
///
/// While the caller is queued this re-runs matching. Once they have been
/// taken as someone else's partner, the session they joined since their
/// latest request is reported as a matched outcome. 404 when neither
/// applies.
pub async fn poll_match(
	state: web::Data<GatewayState>,
	req: HttpRequest,
) -> Result<HttpResponse, GatewayError> {
	let principal = authenticate(&state, &req)?;
	state.admission.check_rate_limit(&principal)?;
	let user_id = principal.id();

	if let Some(outcome) = state
		.engine
		.match_pending_with(user_id, |outcome| record_match(&state, outcome))?
	{
		return Ok(HttpResponse::Ok().json(outcome));
	}

	let record = state
		.sessions
		.find_active_for(user_id)
		.ok_or_else(|| GatewayError::NotFound(format!("no pending request for {}", user_id)))?;

	let partner = record
		.participants
		.iter()
		.find(|p| p.user_id != user_id)
		.ok_or_else(|| GatewayError::NotFound(format!("session {} has no partner", record.session_id)))?;

	Ok(HttpResponse::Ok().json(MatchOutcome::paired(
		record.session_id.clone(),
		user_id,
		partner.user_id.clone(),
		partner.joined_at,
	)))
}

/// Withdraw the caller's pending request (idempotent)
///
/// Also forgets the caller's latest pairing, so later polls return 404.
pub async fn withdraw(
	state: web::Data<GatewayState>,
	req: HttpRequest,
) -> Result<HttpResponse, GatewayError> {
	let principal = authenticate(&state, &req)?;
	let withdrawn = state.engine.withdraw(principal.id());
	state.sessions.release(principal.id());

	Ok(HttpResponse::Ok().json(WithdrawResponse {
		user_id: principal.id().to_string(),
		withdrawn,
	}))
}

/// Run one batch pass over the whole queue
pub async fn sweep(state: web::Data<GatewayState>) -> HttpResponse {
	let (outcomes, summary) = sweep_once(&state.engine, state.sessions.as_ref(), state.evict_timed_out);
	if summary.evicted > 0 {
		warn!(target: "server", evicted = summary.evicted, "Timed-out requests evicted by sweep");
	}

	HttpResponse::Ok().json(SweepResponse {
		matched_pairs: summary.matched_pairs,
		remaining: summary.remaining,
		outcomes,
	})
}

/// Look up a session record
pub async fn get_session(
	state: web::Data<GatewayState>,
	path: web::Path<String>,
) -> Result<HttpResponse, GatewayError> {
	let session_id = path.into_inner();
	let record = state
		.sessions
		.get(&session_id)
		.ok_or_else(|| GatewayError::NotFound(format!("session {}", session_id)))?;

	Ok(HttpResponse::Ok().json(record))
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use actix_web::{App, test};
	use buddy_matching::{EngineConfig, ManualClock, MatchingEngine, MemorySessionStore};
	use buddy_sdk::types::{MatchReason, SessionDuration, SessionRecord, SessionStatus};
	use chrono::{DateTime, Utc};

	use super::*;
	use crate::{
		admission::{AdmissionConfig, AdmissionController},
		auth::HeaderAuthProvider,
		routes::configure_routes,
	};

	fn now() -> DateTime<Utc> {
		"2026-01-20T09:00:00Z".parse().unwrap()
	}

	fn create_state(burst: u32) -> (GatewayState, ManualClock) {
		let clock = ManualClock::new(now());
		let engine = Arc::new(MatchingEngine::new(EngineConfig::default(), Arc::new(clock.clone())));
		let admission = AdmissionController::new(&AdmissionConfig {
			requests_per_second: 1,
			burst,
			max_advance_booking: chrono::Duration::days(7),
			max_start_lag: chrono::Duration::minutes(5),
			limiter_idle: std::time::Duration::from_secs(60),
			limiter_max_capacity: 1_000,
		});

		let state = GatewayState {
			engine,
			sessions: Arc::new(MemorySessionStore::new()),
			admission: Arc::new(admission),
			auth_provider: Arc::new(HeaderAuthProvider),
			evict_timed_out: false,
		};
		(state, clock)
	}

	fn body(session_id: &str, duration: SessionDuration) -> RequestPartnerRequest {
		RequestPartnerRequest {
			session_id: session_id.to_string(),
			duration,
			start_time: "2026-01-20T10:00:00Z".parse().unwrap(),
			timezone: None,
			preferred_partner_ids: Vec::new(),
		}
	}

	macro_rules! init_app {
		($state:expr) => {
			test::init_service(
				App::new()
					.app_data(web::Data::new($state))
					.configure(configure_routes),
			)
			.await
		};
	}

	fn post_match(user: &str, body: &RequestPartnerRequest) -> test::TestRequest {
		test::TestRequest::post()
			.uri("/api/v1/match")
			.insert_header(("X-User-Id", user))
			.set_json(body)
	}

	#[actix_web::test]
	async fn test_second_request_is_matched_and_session_activated() {
		let (state, _) = create_state(10);
		let app = init_app!(state.clone());

		let first: MatchOutcome =
			test::call_and_read_body_json(&app, post_match("alice", &body("s-alice", SessionDuration::Standard)).to_request())
				.await;
		assert!(!first.matched);
		assert_eq!(first.reason, MatchReason::NoMatch);

		let second: MatchOutcome =
			test::call_and_read_body_json(&app, post_match("bob", &body("s-bob", SessionDuration::Standard)).to_request())
				.await;
		assert!(second.matched);
		assert_eq!(second.session_id, "s-bob");
		assert_eq!(second.partner_of("bob"), Some("alice"));

		let req = test::TestRequest::get().uri("/api/v1/sessions/s-bob").to_request();
		let record: SessionRecord = test::call_and_read_body_json(&app, req).await;
		assert_eq!(record.status, SessionStatus::Active);
		assert_eq!(record.participants.len(), 2);
		assert_eq!(state.engine.size(), 0);
	}

	#[actix_web::test]
	async fn test_poll_reports_timeout_then_partner_session() {
		let (state, clock) = create_state(10);
		let app = init_app!(state);

		let req = post_match("alice", &body("s-alice", SessionDuration::Short)).to_request();
		test::call_service(&app, req).await;

		clock.advance(chrono::Duration::seconds(61));
		let req = test::TestRequest::get()
			.uri("/api/v1/match")
			.insert_header(("X-User-Id", "alice"))
			.to_request();
		let outcome: MatchOutcome = test::call_and_read_body_json(&app, req).await;
		assert_eq!(outcome.reason, MatchReason::Timeout);

		let req = post_match("bob", &body("s-bob", SessionDuration::Short)).to_request();
		let outcome: MatchOutcome = test::call_and_read_body_json(&app, req).await;
		assert!(outcome.matched);

		let req = test::TestRequest::get()
			.uri("/api/v1/match")
			.insert_header(("X-User-Id", "alice"))
			.to_request();
		let outcome: MatchOutcome = test::call_and_read_body_json(&app, req).await;
		assert!(outcome.matched);
		assert_eq!(outcome.session_id, "s-bob");
		assert_eq!(outcome.partner_of("alice"), Some("bob"));
	}

	#[actix_web::test]
	async fn test_poll_unknown_user_is_not_found() {
		let (state, _) = create_state(10);
		let app = init_app!(state);

		let req = test::TestRequest::get()
			.uri("/api/v1/match")
			.insert_header(("X-User-Id", "ghost"))
			.to_request();
		let resp = test::call_service(&app, req).await;
		assert_eq!(resp.status(), StatusCode::NOT_FOUND);
	}

	#[actix_web::test]
	async fn test_missing_identity_is_unauthorized() {
		let (state, _) = create_state(10);
		let app = init_app!(state);

		let req = test::TestRequest::post()
			.uri("/api/v1/match")
			.set_json(body("s-1", SessionDuration::Standard))
			.to_request();
		let resp = test::call_service(&app, req).await;
		assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
	}

	#[actix_web::test]
	async fn test_illegal_duration_is_rejected() {
		let (state, _) = create_state(10);
		let app = init_app!(state.clone());

		let req = test::TestRequest::post()
			.uri("/api/v1/match")
			.insert_header(("X-User-Id", "alice"))
			.set_json(serde_json::json!({
				"sessionId": "s-1",
				"duration": 30,
				"startTime": "2026-01-20T10:00:00Z"
			}))
			.to_request();
		let resp = test::call_service(&app, req).await;

		assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
		assert_eq!(state.engine.size(), 0);
	}

	#[actix_web::test]
	async fn test_rate_limit_returns_429() {
		let (state, _) = create_state(1);
		let app = init_app!(state);

		let req = post_match("alice", &body("s-alice", SessionDuration::Standard)).to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

		let req = post_match("alice", &body("s-alice", SessionDuration::Standard)).to_request();
		assert_eq!(
			test::call_service(&app, req).await.status(),
			StatusCode::TOO_MANY_REQUESTS
		);
	}

	#[actix_web::test]
	async fn test_reused_session_id_conflicts() {
		let (state, _) = create_state(10);
		let app = init_app!(state.clone());

		for user in ["alice", "bob"] {
			let req = post_match(user, &body("shared", SessionDuration::Extended)).to_request();
			test::call_service(&app, req).await;
		}
		for user in ["carol", "dave"] {
			let req = post_match(user, &body("other", SessionDuration::Extended)).to_request();
			test::call_service(&app, req).await;
		}

		let req = post_match("erin", &body("x", SessionDuration::Short)).to_request();
		test::call_service(&app, req).await;
		let req = post_match("frank", &body("shared", SessionDuration::Short)).to_request();
		let resp = test::call_service(&app, req).await;
		assert_eq!(resp.status(), StatusCode::CONFLICT);

		// erin was never paired, so she keeps her place
		assert!(state.engine.contains("erin"));
		assert!(!state.engine.contains("frank"));
		let req = test::TestRequest::get()
			.uri("/api/v1/match")
			.insert_header(("X-User-Id", "erin"))
			.to_request();
		let outcome: MatchOutcome = test::call_and_read_body_json(&app, req).await;
		assert_eq!(outcome.reason, MatchReason::NoMatch);
		assert_eq!(outcome.session_id, "x");

		let req = post_match("frank", &body("f-2", SessionDuration::Short)).to_request();
		let outcome: MatchOutcome = test::call_and_read_body_json(&app, req).await;
		assert!(outcome.matched);
		assert_eq!(outcome.partner_of("frank"), Some("erin"));
	}

	#[actix_web::test]
	async fn test_conflicting_pair_leaves_both_queued() {
		let (state, _) = create_state(10);
		let app = init_app!(state.clone());

		let req = post_match("frank", &body("f-1", SessionDuration::Short)).to_request();
		test::call_service(&app, req).await;
		state.engine.enqueue(MatchRequest::new(
			"erin",
			"e-1",
			SessionDuration::Short,
			"2026-01-20T10:00:00Z".parse().unwrap(),
			now(),
		))
		.unwrap();
		// f-1 is claimed by another pair while frank waits
		state
			.sessions
			.activate("f-1", &["x".to_string(), "y".to_string()], now())
			.unwrap();

		let req = test::TestRequest::get()
			.uri("/api/v1/match")
			.insert_header(("X-User-Id", "frank"))
			.to_request();
		let resp = test::call_service(&app, req).await;
		assert_eq!(resp.status(), StatusCode::CONFLICT);

		assert!(state.engine.contains("frank"));
		assert!(state.engine.contains("erin"));
		assert_eq!(state.engine.stats().pairs_formed, 0);
	}

	#[actix_web::test]
	async fn test_poll_after_withdraw_ignores_earlier_pairing() {
		let (state, _) = create_state(10);
		let app = init_app!(state);

		let req = post_match("alice", &body("s-alice", SessionDuration::Standard)).to_request();
		test::call_service(&app, req).await;
		let req = post_match("bob", &body("s-bob", SessionDuration::Standard)).to_request();
		let outcome: MatchOutcome = test::call_and_read_body_json(&app, req).await;
		assert!(outcome.matched);

		let req = post_match("alice", &body("s-alice-2", SessionDuration::Standard)).to_request();
		let outcome: MatchOutcome = test::call_and_read_body_json(&app, req).await;
		assert_eq!(outcome.reason, MatchReason::NoMatch);

		let req = test::TestRequest::delete()
			.uri("/api/v1/match")
			.insert_header(("X-User-Id", "alice"))
			.to_request();
		let resp: WithdrawResponse = test::call_and_read_body_json(&app, req).await;
		assert!(resp.withdrawn);

		let req = test::TestRequest::get()
			.uri("/api/v1/match")
			.insert_header(("X-User-Id", "alice"))
			.to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

		// bob never asked again, so his pairing still answers
		let req = test::TestRequest::get()
			.uri("/api/v1/match")
			.insert_header(("X-User-Id", "bob"))
			.to_request();
		let outcome: MatchOutcome = test::call_and_read_body_json(&app, req).await;
		assert_eq!(outcome.session_id, "s-bob");
		assert_eq!(outcome.partner_of("bob"), Some("alice"));
	}

	#[actix_web::test]
	async fn test_withdraw_and_sweep() {
		let (state, _) = create_state(10);
		let app = init_app!(state.clone());

		for (user, duration) in [
			("alice", SessionDuration::Short),
			("bob", SessionDuration::Standard),
			("carol", SessionDuration::Short),
		] {
			state
				.engine
				.enqueue(MatchRequest::new(
					user,
					format!("s-{}", user),
					duration,
					"2026-01-20T10:00:00Z".parse().unwrap(),
					now(),
				))
				.unwrap();
		}

		let req = test::TestRequest::delete()
			.uri("/api/v1/match")
			.insert_header(("X-User-Id", "bob"))
			.to_request();
		let resp: WithdrawResponse = test::call_and_read_body_json(&app, req).await;
		assert!(resp.withdrawn);

		let req = test::TestRequest::post().uri("/api/v1/match/sweep").to_request();
		let resp: SweepResponse = test::call_and_read_body_json(&app, req).await;
		assert_eq!(resp.matched_pairs, 1);
		assert_eq!(resp.remaining, 0);
		assert!(state.sessions.get("s-alice").is_some());

		let req = test::TestRequest::get().uri("/health").to_request();
		let health: HealthResponse = test::call_and_read_body_json(&app, req).await;
		assert_eq!(health.pairs_formed, 1);
		assert_eq!(health.sweeps, 1);
	}
}
