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

use std::future::{Ready, ready};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use actix_web::{
	Error,
	dev::{Service, ServiceRequest, ServiceResponse, Transform},
	http::header::{HeaderName, HeaderValue},
};
use tracing::{Instrument, error, info, warn};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Logging middleware for actix-web
///
/// Opens an `http_request` span per request carrying a fresh request id,
/// logs status and latency on completion, and echoes the id back in the
/// `X-Request-Id` response header.
pub struct LoggingMiddleware;

impl<S, B> Transform<S, ServiceRequest> for LoggingMiddleware
where
	S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
	S::Future: 'static,
	B: 'static,
{
	type Response = ServiceResponse<B>;
	type Error = Error;
	type InitError = ();
	type Transform = LoggingMiddlewareInner<S>;
	type Future = Ready<Result<Self::Transform, Self::InitError>>;

	fn new_transform(&self, service: S) -> Self::Future {
		ready(Ok(LoggingMiddlewareInner {
			service: Rc::new(service),
		}))
	}
}

pub struct LoggingMiddlewareInner<S> {
	service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for LoggingMiddlewareInner<S>
where
	S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
	S::Future: 'static,
	B: 'static,
{
	type Response = ServiceResponse<B>;
	type Error = Error;
	type Future = Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>>>>;

	fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
		self.service.poll_ready(cx)
	}

	fn call(&self, req: ServiceRequest) -> Self::Future {
		let service = self.service.clone();
		let request_id = Uuid::new_v4().to_string();
		let span = tracing::info_span!(
			target: "server",
			"http_request",
			method = %req.method(),
			path = %req.path(),
			request_id = %request_id,
		);

		Box::pin(
			async move {
				let start = std::time::Instant::now();
				let res = service.call(req).await;
				let duration_ms = start.elapsed().as_millis() as u64;

				match res {
					Ok(mut response) => {
						let status = response.status();
						if status.is_server_error() {
							error!(target: "server", status = status.as_u16(), duration_ms, "Request completed");
						} else if status.is_client_error() {
							warn!(target: "server", status = status.as_u16(), duration_ms, "Request completed");
						} else {
							info!(target: "server", status = status.as_u16(), duration_ms, "Request completed");
						}

						if let Ok(value) = HeaderValue::from_str(&request_id) {
							response
								.headers_mut()
								.insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
						}
						Ok(response)
					}
					Err(e) => {
						error!(target: "server", error = %e, duration_ms, "Request failed");
						Err(e)
					}
				}
			}
			.instrument(span),
		)
	}
}
