//! Response body decoding
//!
//! A successful body is classified by its declared content type and its
//! content. A JSON-typed body that fails to parse falls back to text rather
//! than becoming an error.

use crate::error::{ApiError, ApiResult};
use crate::transport::RawResponse;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decoded body of a successful response
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Empty or whitespace-only body
    Empty,
    /// Parsed JSON document
    Json(Value),
    /// Raw text, kept verbatim
    Text(String),
}

impl Payload {
    /// The payload as an optional JSON value; text becomes a JSON string
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Empty => None,
            Self::Json(value) => Some(value),
            Self::Text(text) => Some(Value::String(text)),
        }
    }

    /// Deserialize into `T`; an empty payload yields `None`
    pub fn into_typed<T: DeserializeOwned>(self, status: u16) -> ApiResult<Option<T>> {
        match self.into_value() {
            None => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| ApiError::decode(status, e)),
        }
    }

    /// Whether there is no data
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Decode a response body
pub fn decode(response: &RawResponse) -> Payload {
    let text = String::from_utf8_lossy(&response.body);
    if text.trim().is_empty() {
        return Payload::Empty;
    }

    if response.content_type().is_some_and(is_json_content_type) {
        if let Ok(value) = serde_json::from_str(&text) {
            return Payload::Json(value);
        }
    }

    Payload::Text(text.into_owned())
}

/// `application/json` or any `+json` media type, parameters ignored
pub fn is_json_content_type(content_type: &str) -> bool {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    media_type == "application/json" || media_type.ends_with("+json")
}

/// A binary download
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    /// Body bytes, untouched
    pub bytes: Bytes,
    /// Declared `Content-Type`
    pub content_type: Option<String>,
    /// File name from `Content-Disposition`
    pub filename: Option<String>,
}

impl Download {
    /// Build from a successful response
    pub fn from_response(response: RawResponse) -> Self {
        let content_type = response.content_type().map(str::to_string);
        let filename = response
            .header("content-disposition")
            .and_then(filename_from_disposition);
        Self {
            bytes: response.body,
            content_type,
            filename,
        }
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the body is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// File name from a `Content-Disposition` header
///
/// `filename*=UTF-8''...` wins over `filename="..."`, which wins over a bare
/// `filename=...`.
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let params: Vec<(String, &str)> = split_params(header)
        .into_iter()
        .skip(1)
        .filter_map(|param| {
            let (key, value) = param.split_once('=')?;
            Some((key.trim().to_ascii_lowercase(), value.trim()))
        })
        .collect();

    let extended = params
        .iter()
        .find(|(key, _)| key == "filename*")
        .and_then(|(_, value)| decode_extended(value));
    if extended.is_some() {
        return extended;
    }

    params
        .iter()
        .find(|(key, _)| key == "filename")
        .map(|(_, value)| unquote(value))
        .filter(|name| !name.is_empty())
}

/// RFC 5987 `charset'lang'percent-encoded`
fn decode_extended(value: &str) -> Option<String> {
    let value = unquote(value);
    let encoded = value.splitn(3, '\'').nth(2).unwrap_or(value.as_str());
    urlencoding::decode(encoded)
        .ok()
        .map(|name| name.into_owned())
        .filter(|name| !name.is_empty())
}

/// Split on `;` outside double quotes
fn split_params(header: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in header.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                params.push(&header[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(&header[start..]);
    params
}

/// Strip surrounding quotes and undo `\"` / `\\` escapes
fn unquote(value: &str) -> String {
    let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) else {
        return value.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            _ => out.push(c),
        }
    }
    out
}
