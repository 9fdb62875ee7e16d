//! Request executor: one logical request, bounded retries, per-attempt deadline
//!
//! The executor knows nothing about authentication beyond attaching the
//! bearer token it is handed. Any HTTP response, whatever its status, ends
//! the retry loop; only transport failures are retried.

use crate::error::{ApiError, ApiResult};
use crate::request::{join_url, ApiRequest, RequestBody};
use crate::transport::{OutgoingRequest, RawResponse, Transport};
use marina_core::retry::{retry, RetryConfig};
use marina_telemetry::{metrics, Timer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Request correlation ID header
pub const X_REQUEST_ID: &str = "X-Request-ID";

const ACCEPT_DEFAULT: &str = "application/json, text/plain, */*";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Issues requests with a deadline and a bounded retry policy
#[derive(Debug)]
pub struct Executor {
    transport: Arc<dyn Transport>,
    base_url: String,
    timeout: Duration,
    retry: RetryConfig,
}

impl Executor {
    /// Create an executor
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        timeout: Duration,
        retry: RetryConfig,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            timeout,
            retry,
        }
    }

    /// Per-attempt deadline
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Retry policy
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Execute `request`, retrying transport failures
    ///
    /// Returns the first HTTP response received, or the last failure once
    /// the attempt budget is spent. Timeouts are retried only when
    /// `retry_on_timeout` is set.
    pub async fn execute(&self, request: &ApiRequest, bearer: Option<&str>) -> ApiResult<RawResponse> {
        let request_id = Uuid::new_v4().to_string();
        let outgoing = self.prepare(request, bearer, &request_id)?;
        let retry_on_timeout = self.retry.retry_on_timeout;
        let request_id = request_id.as_str();

        let result = retry(
            &self.retry,
            |e: &ApiError| e.is_retryable(retry_on_timeout),
            |attempt| {
                let outgoing = outgoing.clone();
                async move { self.attempt(outgoing, attempt, request_id).await }
            },
        )
        .await;

        match result {
            Ok(done) => {
                debug!(
                    request_id = %request_id,
                    status = done.value.status,
                    attempts = done.attempts,
                    elapsed_ms = done.total_duration.as_millis(),
                    "Request completed"
                );
                Ok(done.value)
            }
            Err(e) => {
                warn!(
                    request_id = %request_id,
                    method = %request.method(),
                    path = request.path(),
                    error = %e,
                    "Request failed"
                );
                Err(e)
            }
        }
    }

    async fn attempt(
        &self,
        outgoing: OutgoingRequest,
        attempt: u32,
        request_id: &str,
    ) -> ApiResult<RawResponse> {
        metrics().increment("http.attempts");
        if attempt > 0 {
            metrics().increment("http.retries");
        }

        debug!(
            request_id = %request_id,
            attempt = attempt + 1,
            method = %outgoing.method,
            url = %outgoing.url,
            "Sending request"
        );

        let timer = Timer::start("http.attempt_ms");
        // Dropping the send future on expiry cancels the in-flight call
        match tokio::time::timeout(self.timeout, self.transport.send(outgoing)).await {
            Ok(Ok(response)) => {
                timer.stop();
                Ok(response)
            }
            Ok(Err(e)) => {
                let err = e.into_api_error(self.timeout);
                if err.is_timeout() {
                    metrics().increment("http.timeouts");
                }
                Err(err)
            }
            Err(_) => {
                metrics().increment("http.timeouts");
                Err(ApiError::Timeout(self.timeout))
            }
        }
    }

    /// Resolve the URL and merge headers: defaults, then caller headers
    /// (same name replaces), then the bearer token
    fn prepare(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
        request_id: &str,
    ) -> ApiResult<OutgoingRequest> {
        let mut headers: Vec<(String, String)> = vec![
            ("Accept".to_string(), ACCEPT_DEFAULT.to_string()),
            (X_REQUEST_ID.to_string(), request_id.to_string()),
        ];
        if matches!(request.body(), RequestBody::Json(_)) {
            headers.push(("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string()));
        }

        for (name, value) in request.headers() {
            headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
            headers.push((name.clone(), value.clone()));
        }

        if let Some(token) = bearer {
            headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case("authorization"));
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }

        Ok(OutgoingRequest {
            method: request.method().clone(),
            url: join_url(&self.base_url, request.path())?,
            headers,
            body: request.body().clone(),
        })
    }
}
