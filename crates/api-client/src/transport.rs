//! The network boundary
//!
//! The executor talks to the network only through [`Transport`]. Production
//! code uses [`ReqwestTransport`]; tests plug in scripted transports to
//! count attempts and simulate failures that a live server cannot produce.

use crate::error::ApiError;
use crate::request::RequestBody;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderValue, USER_AGENT};
use reqwest::{Client, Method};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A fully prepared request: absolute URL and final headers
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL
    pub url: String,
    /// Headers in send order
    pub headers: Vec<(String, String)>,
    /// Body
    pub body: RequestBody,
}

impl OutgoingRequest {
    /// First header with the given name, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A response with its body fully read
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: Vec<(String, String)>,
    /// Body bytes
    pub body: Bytes,
}

impl RawResponse {
    /// Create a response
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// First header with the given name, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Declared `Content-Type`
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Failure below HTTP
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Could not connect (refused, DNS, TLS)
    #[error("connection failed: {0}")]
    Connect(String),
    /// Connection dropped mid-request or body read failed
    #[error("connection interrupted: {0}")]
    Interrupted(String),
    /// The transport's own deadline fired
    #[error("transport timed out")]
    TimedOut,
    /// The request could not be built
    #[error("invalid request: {0}")]
    Invalid(String),
}

impl TransportError {
    /// Map to the normalized error taxonomy
    pub fn into_api_error(self, timeout: Duration) -> ApiError {
        match self {
            Self::Connect(msg) | Self::Interrupted(msg) => ApiError::Network(msg),
            Self::TimedOut => ApiError::Timeout(timeout),
            Self::Invalid(msg) => ApiError::InvalidRequest(msg),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::TimedOut
        } else if err.is_builder() {
            Self::Invalid(err.to_string())
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::Interrupted(err.to_string())
        }
    }
}

/// Sends one prepared request
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Perform the round-trip and read the whole body
    async fn send(&self, request: OutgoingRequest) -> Result<RawResponse, TransportError>;
}

/// `reqwest`-backed transport
///
/// No client-level timeout is configured; the executor owns the deadline.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: Client,
}

impl ReqwestTransport {
    /// Create a transport with the given user agent
    pub fn new(user_agent: &str) -> Result<Self, ApiError> {
        let mut default_headers = reqwest::header::HeaderMap::new();
        let agent = HeaderValue::from_str(user_agent)
            .map_err(|_| ApiError::config(format!("Invalid user agent: {user_agent:?}")))?;
        default_headers.insert(USER_AGENT, agent);

        let inner = Client::builder()
            .default_headers(default_headers)
            .build()
            .map_err(|e| ApiError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { inner })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: OutgoingRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self.inner.request(request.method, &request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.body(
                serde_json::to_vec(&value).map_err(|e| TransportError::Invalid(e.to_string()))?,
            ),
            RequestBody::Form(form) => builder.multipart(
                form.to_multipart()
                    .map_err(|e| TransportError::Invalid(e.to_string()))?,
            ),
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = RawResponse::new(
            200,
            vec![("Content-Type".to_string(), "application/json".to_string())],
            "{}",
        );

        assert_eq!(response.content_type(), Some("application/json"));
        assert_eq!(response.header("CONTENT-TYPE"), Some("application/json"));
        assert!(response.header("etag").is_none());
        assert!(response.is_success());
    }

    #[test]
    fn test_transport_error_mapping() {
        let timeout = Duration::from_secs(5);

        assert_eq!(
            TransportError::Connect("refused".into()).into_api_error(timeout),
            ApiError::Network("refused".into())
        );
        assert_eq!(
            TransportError::TimedOut.into_api_error(timeout),
            ApiError::Timeout(timeout)
        );
        assert!(matches!(
            TransportError::Invalid("bad url".into()).into_api_error(timeout),
            ApiError::InvalidRequest(_)
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_failure() {
        // Bind then drop to get a port nobody listens on
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let transport = ReqwestTransport::new("marina-test").unwrap();

        let err = transport
            .send(OutgoingRequest {
                method: Method::GET,
                url: format!("http://127.0.0.1:{port}/boats"),
                headers: Vec::new(),
                body: RequestBody::Empty,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Connect(_)));
    }
}
