//! Token refresh with single-flight coordination
//!
//! At most one refresh exchange runs at a time. Callers that hit a 401 while
//! an exchange is pending join it and observe the same outcome.

use crate::error::extract_error_details;
use crate::executor::Executor;
use crate::request::ApiRequest;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use marina_core::credentials::{CredentialPair, CredentialStore};
use marina_telemetry::metrics;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Refresh endpoint, relative to the base URL
pub const REFRESH_PATH: &str = "auth/refresh";

/// Failure reason when the session was replaced or ended mid-refresh
pub const SESSION_ENDED: &str = "session ended during refresh";

/// Result of a refresh attempt
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// A new pair is stored
    Refreshed(CredentialPair),
    /// The exchange failed and the store was cleared
    Failed(String),
}

impl RefreshOutcome {
    /// New access token, if the refresh succeeded
    pub fn access_token(&self) -> Option<&str> {
        match self {
            Self::Refreshed(pair) => Some(&pair.access_token),
            Self::Failed(_) => None,
        }
    }
}

struct InFlight {
    id: u64,
    future: Shared<BoxFuture<'static, RefreshOutcome>>,
}

/// Serializes refresh exchanges against one credential store
pub struct RefreshCoordinator {
    executor: Arc<Executor>,
    store: Arc<dyn CredentialStore>,
    inflight: Mutex<Option<InFlight>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("store", &self.store)
            .field("in_flight", &self.slot().is_some())
            .finish_non_exhaustive()
    }
}

impl RefreshCoordinator {
    /// Create a coordinator
    pub fn new(executor: Arc<Executor>, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            executor,
            store,
            inflight: Mutex::new(None),
            next_id: AtomicU64::new(0),
        }
    }

    /// Obtain a fresh access token after `stale_token` was rejected
    ///
    /// Joins a pending exchange if there is one. If the stored access token
    /// already differs from `stale_token`, another caller refreshed in the
    /// meantime and the stored pair is returned without a new exchange.
    pub async fn refresh(&self, stale_token: Option<&str>) -> RefreshOutcome {
        let (id, future) = {
            let mut slot = self.slot();
            match slot.as_ref() {
                Some(pending) => {
                    debug!("Joining pending token refresh");
                    (pending.id, pending.future.clone())
                }
                None => {
                    if let Some(pair) = self.already_refreshed(stale_token) {
                        debug!("Access token already rotated; skipping refresh");
                        return RefreshOutcome::Refreshed(pair);
                    }
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let future = exchange(Arc::clone(&self.executor), Arc::clone(&self.store))
                        .boxed()
                        .shared();
                    *slot = Some(InFlight {
                        id,
                        future: future.clone(),
                    });
                    (id, future)
                }
            }
        };

        let outcome = future.await;

        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|pending| pending.id == id) {
            *slot = None;
        }
        outcome
    }

    fn already_refreshed(&self, stale_token: Option<&str>) -> Option<CredentialPair> {
        let stale = stale_token?;
        match self.store.load() {
            Ok(Some(pair)) if pair.access_token != stale => Some(pair),
            _ => None,
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn exchange(executor: Arc<Executor>, store: Arc<dyn CredentialStore>) -> RefreshOutcome {
    let (stored, generation) = match store.load_versioned() {
        Ok(versioned) => versioned,
        Err(e) => return fail(store.as_ref(), None, e.to_string()),
    };
    let Some(refresh_token) = stored.and_then(|pair| pair.refresh_token) else {
        return fail(store.as_ref(), Some(generation), "no refresh token stored".to_string());
    };

    metrics().increment("auth.refresh.started");
    info!("Refreshing access token");

    let request = ApiRequest::post(REFRESH_PATH)
        .json_value(json!({ "refreshToken": refresh_token }))
        .anonymous();

    let response = match executor.execute(&request, None).await {
        Ok(response) => response,
        Err(e) => return fail(store.as_ref(), Some(generation), e.to_string()),
    };

    if !response.is_success() {
        let details = extract_error_details(response.status, &response.body);
        return fail(
            store.as_ref(),
            Some(generation),
            format!("refresh rejected ({}): {}", response.status, details.message),
        );
    }

    let grant = serde_json::from_slice::<Value>(&response.body)
        .ok()
        .as_ref()
        .and_then(parse_token_grant);
    let Some(grant) = grant else {
        return fail(store.as_ref(), Some(generation), "unrecognized refresh response".to_string());
    };

    let pair = grant.into_pair(Some(refresh_token));
    match store.replace_if_current(Some(&pair), generation) {
        Ok(true) => {
            info!(expires_at = ?pair.expires_at, "Access token refreshed");
            RefreshOutcome::Refreshed(pair)
        }
        Ok(false) => {
            metrics().increment("auth.refresh.failed");
            warn!("Credentials changed while refreshing; discarding the new tokens");
            RefreshOutcome::Failed(SESSION_ENDED.to_string())
        }
        Err(e) => fail(store.as_ref(), Some(generation), e.to_string()),
    }
}

/// Clear the store unless someone else wrote to it since `generation`
fn fail(store: &dyn CredentialStore, generation: Option<u64>, reason: String) -> RefreshOutcome {
    metrics().increment("auth.refresh.failed");
    warn!(reason = %reason, "Token refresh failed; clearing credentials");
    let cleared = match generation {
        Some(generation) => store.replace_if_current(None, generation),
        None => store.clear().map(|()| true),
    };
    match cleared {
        Ok(true) => {}
        Ok(false) => debug!("Credentials changed while refreshing; leaving them in place"),
        Err(e) => warn!(error = %e, "Failed to clear credentials"),
    }
    RefreshOutcome::Failed(reason)
}

/// Tokens issued by login, registration or refresh
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenGrant {
    /// Access token
    #[serde(rename = "accessToken", alias = "access_token")]
    pub access_token: String,
    /// Refresh token, if rotated
    #[serde(default, rename = "refreshToken", alias = "refresh_token")]
    pub refresh_token: Option<String>,
    /// Absolute expiry
    #[serde(
        default,
        rename = "expiresAt",
        alias = "expires_at",
        deserialize_with = "lenient_timestamp"
    )]
    pub expires_at: Option<DateTime<Utc>>,
    /// Lifetime in seconds, used when no absolute expiry is given
    #[serde(default, rename = "expiresIn", alias = "expires_in")]
    pub expires_in: Option<i64>,
}

impl TokenGrant {
    /// Build the pair to store; `fallback_refresh` is kept if none was issued
    pub fn into_pair(self, fallback_refresh: Option<String>) -> CredentialPair {
        let expires_at = self.expires_at.or_else(|| {
            self.expires_in
                .and_then(ChronoDuration::try_seconds)
                .map(|lifetime| Utc::now() + lifetime)
        });
        CredentialPair::new(self.access_token, self.refresh_token.or(fallback_refresh))
            .with_expiry(expires_at)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GrantShape {
    TopLevel(TokenGrant),
    Nested {
        tokens: TokenGrant,
    },
    Bare {
        token: String,
        #[serde(default, rename = "refreshToken", alias = "refresh_token")]
        refresh_token: Option<String>,
    },
}

/// Recognize a token grant: top-level fields, under `tokens`, or a bare `token`
pub fn parse_token_grant(value: &Value) -> Option<TokenGrant> {
    match GrantShape::deserialize(value).ok()? {
        GrantShape::TopLevel(grant) | GrantShape::Nested { tokens: grant } => Some(grant),
        GrantShape::Bare {
            token,
            refresh_token,
        } => Some(TokenGrant {
            access_token: token,
            refresh_token,
            expires_at: None,
            expires_in: None,
        }),
    }
    .filter(|grant| !grant.access_token.is_empty())
}

/// RFC 3339 string or Unix epoch (seconds or milliseconds); anything else is ignored
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| match value {
        Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(|epoch| {
            if epoch > 10_000_000_000 {
                DateTime::from_timestamp_millis(epoch)
            } else {
                DateTime::from_timestamp(epoch, 0)
            }
        }),
        _ => None,
    }))
}
