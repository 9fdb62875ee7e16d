//! Endpoint-specific API implementations
//!
//! Each module provides a typed interface for one group of backend routes.
//! They are thin: build a path and a payload, hand it to [`MarinaClient`],
//! and return the envelope. Operations that must produce a value (login,
//! creation, updates) convert an error envelope into `Err`.
//!
//! ## Route map
//!
//! | Module | Routes | Description |
//! |--------|--------|-------------|
//! | `auth` | `auth/*` | Login, registration, session, password reset |
//! | `boats` | `boats`, `boats/{id}`, `boats/{id}/images` | Listings CRUD and photos |
//! | `bookings` | `bookings`, `bookings/{id}/*` | Reservations and invoices |
//! | `users` | `users/{id}`, `users/profile` | Public profiles and own profile |
//! | `availability` | `boats/{id}/availability*` | Calendar per boat |
//! | `dashboard` | `dashboard/owner`, `dashboard/renter` | Aggregated summaries |
//!
//! [`MarinaClient`]: crate::client::MarinaClient

pub mod auth;
pub mod availability;
pub mod boats;
pub mod bookings;
pub mod dashboard;
pub mod users;

pub use auth::AuthApi;
pub use availability::AvailabilityApi;
pub use boats::BoatsApi;
pub use bookings::BookingsApi;
pub use dashboard::DashboardApi;
pub use users::UsersApi;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One page of a list endpoint
///
/// Accepts a bare array or an object with `items` (or `data`/`results`) and
/// optional paging fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Total across all pages, if reported
    pub total: Option<u64>,
    /// 1-based page number, if reported
    pub page: Option<u32>,
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Page<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Shape<T> {
            Bare(Vec<T>),
            Wrapped {
                #[serde(alias = "data", alias = "results")]
                items: Vec<T>,
                #[serde(default, alias = "totalCount")]
                total: Option<u64>,
                #[serde(default)]
                page: Option<u32>,
            },
        }

        Ok(match Shape::deserialize(deserializer)? {
            Shape::Bare(items) => Self {
                items,
                total: None,
                page: None,
            },
            Shape::Wrapped { items, total, page } => Self { items, total, page },
        })
    }
}

/// Identifiers arrive as numbers or strings; keep them as strings
pub(crate) fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("invalid id: {other}"))),
    }
}

/// Optional variant of [`id_string`]
pub(crate) fn opt_id_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!("invalid id: {other}"))),
    }
}

/// Percent-encode one path segment
pub(crate) fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// `path?k=v&...` with unset values skipped
pub(crate) fn with_query(path: &str, params: &[(&str, Option<String>)]) -> String {
    let query: Vec<String> = params
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_ref()
                .map(|v| format!("{key}={}", urlencoding::encode(v)))
        })
        .collect();
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{}", query.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Item {
        #[serde(deserialize_with = "id_string")]
        id: String,
    }

    #[test]
    fn test_page_shapes() {
        let bare: Page<Item> = serde_json::from_value(json!([{"id": 1}, {"id": "b"}])).unwrap();
        assert_eq!(bare.items.len(), 2);
        assert_eq!(bare.items[0].id, "1");
        assert!(bare.total.is_none());

        let wrapped: Page<Item> =
            serde_json::from_value(json!({"data": [{"id": 3}], "totalCount": 40, "page": 2})).unwrap();
        assert_eq!(wrapped.items[0].id, "3");
        assert_eq!(wrapped.total, Some(40));
        assert_eq!(wrapped.page, Some(2));
    }

    #[test]
    fn test_query_building() {
        assert_eq!(with_query("boats", &[("page", None)]), "boats");
        assert_eq!(
            with_query(
                "boats",
                &[("location", Some("Split, HR".to_string())), ("page", Some("2".to_string()))]
            ),
            "boats?location=Split%2C%20HR&page=2"
        );
        assert_eq!(segment("a/b"), "a%2Fb");
    }
}
