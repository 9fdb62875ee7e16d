//! Request description handed to the access layer
//!
//! An [`ApiRequest`] is plain data: method, relative path, extra headers and
//! a body. Builder methods consume and return the request, so a value that
//! has been handed to the client is never mutated again. The executor clones
//! it for every attempt, which is why multipart bodies are kept as a
//! [`FormPayload`] and only turned into a `reqwest` form at send time.

use crate::error::{ApiError, ApiResult};
use bytes::Bytes;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

/// Request body variants
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// No body
    Empty,
    /// JSON document, sent with `Content-Type: application/json`
    Json(Value),
    /// Multipart form; the transport picks the boundary
    Form(FormPayload),
}

/// One part of a multipart form
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    /// Plain text field
    Text {
        /// Field name
        name: String,
        /// Field value
        value: String,
    },
    /// File field
    File {
        /// Field name
        name: String,
        /// File name reported to the server
        file_name: String,
        /// MIME type, if known
        mime: Option<String>,
        /// File contents
        bytes: Bytes,
    },
}

/// Multipart form that can be rebuilt for every attempt
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormPayload {
    parts: Vec<FormPart>,
}

impl FormPayload {
    /// Create an empty form
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Add a file field
    #[must_use]
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: impl Into<Bytes>,
        mime: Option<&str>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            file_name: file_name.into(),
            mime: mime.map(str::to_string),
            bytes: bytes.into(),
        });
        self
    }

    /// Parts in insertion order
    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    /// Build a fresh `reqwest` multipart form
    pub fn to_multipart(&self) -> ApiResult<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();
        for part in &self.parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
                FormPart::File {
                    name,
                    file_name,
                    mime,
                    bytes,
                } => {
                    let mut file = reqwest::multipart::Part::bytes(bytes.to_vec())
                        .file_name(file_name.clone());
                    if let Some(mime) = mime {
                        file = file
                            .mime_str(mime)
                            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
                    }
                    form.part(name.clone(), file)
                }
            };
        }
        Ok(form)
    }
}

/// A single logical API call
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    body: RequestBody,
    anonymous: bool,
}

impl ApiRequest {
    /// Create a request with no body
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: RequestBody::Empty,
            anonymous: false,
        }
    }

    /// GET request
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// POST request
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// PUT request
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// PATCH request
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// DELETE request
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a serializable JSON body
    pub fn json<B: Serialize + ?Sized>(self, body: &B) -> ApiResult<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to serialize body: {e}")))?;
        Ok(self.json_value(value))
    }

    /// Attach an already-built JSON body
    #[must_use]
    pub fn json_value(mut self, value: Value) -> Self {
        self.body = RequestBody::Json(value);
        self
    }

    /// Attach a multipart form body
    #[must_use]
    pub fn form(mut self, form: FormPayload) -> Self {
        self.body = RequestBody::Form(form);
        self
    }

    /// Add a header; it overrides any default header with the same name
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Never attach a bearer token and never refresh on 401
    #[must_use]
    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    /// HTTP method
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path relative to the base URL
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Caller-supplied headers
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Body
    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    /// Whether authentication is skipped
    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }
}

/// Join a base URL and a path relative to it
///
/// Paths that carry their own scheme (`https://other.host/x`) are rejected:
/// the bearer token is only ever sent to the configured origin.
pub fn join_url(base_url: &str, path: &str) -> ApiResult<String> {
    if has_scheme(path) {
        return Err(ApiError::InvalidRequest(format!(
            "request path must be relative to the base URL, got {path:?}"
        )));
    }
    Ok(format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    ))
}

/// `scheme:` prefix per RFC 3986: a letter, then letters, digits, `+`, `-` or `.`
fn has_scheme(path: &str) -> bool {
    path.split_once(':').is_some_and(|(scheme, _)| {
        let mut chars = scheme.chars();
        chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("http://localhost:5000/api/", "/boats/7").unwrap(),
            "http://localhost:5000/api/boats/7"
        );
        assert_eq!(
            join_url("http://localhost:5000/api", "boats?from=2024-06-01T10:00").unwrap(),
            "http://localhost:5000/api/boats?from=2024-06-01T10:00"
        );
        assert_eq!(
            join_url("http://localhost:5000/api", "//cdn.example/x.pdf").unwrap(),
            "http://localhost:5000/api/cdn.example/x.pdf"
        );
    }

    #[test]
    fn test_join_url_rejects_other_origins() {
        for path in ["https://cdn.example/x.pdf", "HTTP://evil.test", "ftp://files.test/a", "mailto:ana@example.com"] {
            assert!(
                matches!(join_url("http://localhost:5000/api", path), Err(ApiError::InvalidRequest(_))),
                "{path} should be rejected"
            );
        }
    }

    #[test]
    fn test_builder_produces_immutable_value() {
        let request = ApiRequest::post("bookings")
            .json(&json!({"boatId": 7}))
            .unwrap()
            .header("X-Trace", "1");

        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.path(), "bookings");
        assert_eq!(request.body(), &RequestBody::Json(json!({"boatId": 7})));
        assert_eq!(request.headers(), &[("X-Trace".to_string(), "1".to_string())]);
        assert!(!request.is_anonymous());
        assert!(request.clone().anonymous().is_anonymous());
    }

    #[test]
    fn test_form_payload_keeps_part_order() {
        let form = FormPayload::new()
            .text("caption", "Deck")
            .file("image", "deck.jpg", vec![1_u8, 2, 3], Some("image/jpeg"));

        assert_eq!(form.parts().len(), 2);
        assert!(matches!(&form.parts()[0], FormPart::Text { name, .. } if name == "caption"));
        assert!(form.to_multipart().is_ok());
    }

    #[test]
    fn test_form_payload_rejects_bad_mime() {
        let form = FormPayload::new().file("image", "x", vec![0_u8], Some("not a mime"));
        assert!(matches!(form.to_multipart(), Err(ApiError::InvalidRequest(_))));
    }
}
