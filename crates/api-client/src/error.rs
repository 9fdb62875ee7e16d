//! Error types for the API client and the classifier that builds them
//!
//! Every failure the access layer can hit ends up as an [`ApiError`]. The
//! classifier functions at the bottom of this module turn a non-2xx response
//! body into the right variant, following the backend's error body
//! convention: `message`, then the `errors` map, then `title`, then the raw
//! body, then the HTTP status line.

use marina_core::ErrorCode;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Status reported for failures that never produced an HTTP response
pub const INTERNAL_STATUS: u16 = 500;

/// Coarse classification of an [`ApiError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request never reached the server
    Network,
    /// No response within the configured deadline
    Timeout,
    /// The server answered with a non-2xx status
    Http,
    /// 401 that survived a failed or skipped refresh
    Auth,
    /// Field-level validation failures reported by the server
    Validation,
    /// A 2xx body did not match the expected type
    Decode,
    /// Local failure: credential store, configuration, request building
    Internal,
}

/// A single server-reported validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Field name as reported by the server
    pub field: String,
    /// Human-readable description
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// API client errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Connection refused, DNS failure, reset, or a broken body stream
    #[error("Network error: {0}")]
    Network(String),

    /// Request timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// API returned an error response
    #[error("API error ({status}): {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Message extracted from the response
        message: String,
    },

    /// Authentication could not be restored
    #[error("Authentication failed: {message}")]
    Auth {
        /// Message extracted from the 401 response
        message: String,
    },

    /// Structured validation failure
    #[error("Validation failed ({status}): {message}")]
    Validation {
        /// HTTP status code
        status: u16,
        /// Summary message
        message: String,
        /// Field errors in the order the server sent them
        errors: Vec<FieldError>,
    },

    /// A successful body could not be turned into the requested type
    #[error("Failed to decode response ({status}): {message}")]
    Decode {
        /// HTTP status code of the successful response
        status: u16,
        /// Deserializer message
        message: String,
    },

    /// Credential store failure
    #[error("Credential store error: {0}")]
    Credentials(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The request could not be built (bad URL, unserializable body)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP status error
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a decode error for a successful response
    pub fn decode(status: u16, message: impl fmt::Display) -> Self {
        Self::Decode {
            status,
            message: message.to_string(),
        }
    }

    /// Classification of this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::Network,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Http { .. } => ErrorKind::Http,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Credentials(_) | Self::Config(_) | Self::InvalidRequest(_) => ErrorKind::Internal,
        }
    }

    /// Status code reported in the result envelope
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Http { status, .. }
            | Self::Validation { status, .. }
            | Self::Decode { status, .. } => *status,
            Self::Auth { .. } => StatusCode::UNAUTHORIZED.as_u16(),
            Self::Network(_)
            | Self::Timeout(_)
            | Self::Credentials(_)
            | Self::Config(_)
            | Self::InvalidRequest(_) => INTERNAL_STATUS,
        }
    }

    /// Human-readable message without the variant prefix
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Http { message, .. }
            | Self::Auth { message }
            | Self::Validation { message, .. }
            | Self::Decode { message, .. } => message.clone(),
            Self::Network(message)
            | Self::Credentials(message)
            | Self::Config(message)
            | Self::InvalidRequest(message) => message.clone(),
            Self::Timeout(_) => self.to_string(),
        }
    }

    /// Field errors for validation failures, empty otherwise
    #[must_use]
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::Validation { errors, .. } => errors,
            _ => &[],
        }
    }

    /// Transport-level failure that is worth another attempt
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Whether the deadline elapsed
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Whether the executor should try again
    #[must_use]
    pub fn is_retryable(&self, retry_on_timeout: bool) -> bool {
        self.is_transient() || (retry_on_timeout && self.is_timeout())
    }

    /// Check if this is a client error (4xx)
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status()) && self.kind() != ErrorKind::Internal
    }

    /// Check if this is a server error (5xx)
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Http { status, .. } if *status >= 500)
    }
}

impl From<marina_core::Error> for ApiError {
    fn from(err: marina_core::Error) -> Self {
        let message = match &err.suggestion {
            Some(suggestion) => format!("{err}. {suggestion}"),
            None => err.to_string(),
        };
        match err.code {
            ErrorCode::InvalidConfigValue => Self::Config(message),
            _ => Self::Credentials(message),
        }
    }
}

/// Message and field errors pulled out of an error body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetails {
    /// Best available human-readable message
    pub message: String,
    /// Field errors, possibly empty
    pub errors: Vec<FieldError>,
}

/// Classify a non-2xx response into an [`ApiError`]
///
/// A body carrying a non-empty `errors` map becomes `Validation`; anything
/// else becomes `Http`.
pub fn classify_status(status: u16, body: &[u8]) -> ApiError {
    let details = extract_error_details(status, body);
    if details.errors.is_empty() {
        ApiError::Http {
            status,
            message: details.message,
        }
    } else {
        ApiError::Validation {
            status,
            message: details.message,
            errors: details.errors,
        }
    }
}

/// Classify a 401 that could not be recovered
pub fn classify_unauthorized(body: &[u8]) -> ApiError {
    ApiError::auth(extract_error_details(StatusCode::UNAUTHORIZED.as_u16(), body).message)
}

/// Pull a message and field errors out of an error body
pub fn extract_error_details(status: u16, body: &[u8]) -> ErrorDetails {
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return ErrorDetails {
            message: status_line(status),
            errors: Vec::new(),
        };
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => {
            let errors = map.get("errors").map(field_errors).unwrap_or_default();
            let message = map
                .get("message")
                .and_then(message_text)
                .or_else(|| summarize(&errors))
                .or_else(|| map.get("title").and_then(message_text))
                .unwrap_or_else(|| Value::Object(map).to_string());
            ErrorDetails { message, errors }
        }
        Ok(Value::String(s)) if !s.trim().is_empty() => ErrorDetails {
            message: s,
            errors: Vec::new(),
        },
        Ok(Value::Null) => ErrorDetails {
            message: status_line(status),
            errors: Vec::new(),
        },
        Ok(other) => ErrorDetails {
            message: other.to_string(),
            errors: Vec::new(),
        },
        Err(_) => ErrorDetails {
            message: trimmed.to_string(),
            errors: Vec::new(),
        },
    }
}

/// `"404 Not Found"` style status line
pub fn status_line(status: u16) -> String {
    match StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
    {
        Some(reason) => format!("{status} {reason}"),
        None => format!("HTTP {status}"),
    }
}

/// A `message` may be a string or a list of strings
fn message_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            (!parts.is_empty()).then(|| parts.join("; "))
        }
        _ => None,
    }
}

/// `errors` as `{field: [messages]}`, `{field: message}` or `[messages]`
fn field_errors(value: &Value) -> Vec<FieldError> {
    match value {
        Value::Object(map) => map
            .iter()
            .flat_map(|(field, messages)| {
                let messages: Vec<String> = match messages {
                    Value::Array(items) => items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect(),
                    Value::String(s) => vec![s.clone()],
                    _ => Vec::new(),
                };
                messages.into_iter().map(move |message| FieldError {
                    field: field.clone(),
                    message,
                })
            })
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|message| FieldError {
                field: String::new(),
                message: message.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn summarize(errors: &[FieldError]) -> Option<String> {
    if errors.is_empty() {
        return None;
    }
    Some(
        errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; "),
    )
}
