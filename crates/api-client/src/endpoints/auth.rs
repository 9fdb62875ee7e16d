//! Authentication endpoints
//!
//! Login and registration are anonymous: they never carry a stale bearer
//! token and a 401 from them never triggers a refresh. On success the issued
//! token pair replaces whatever the credential store held.

use super::opt_id_string;
use crate::client::MarinaClient;
use crate::envelope::Envelope;
use crate::error::{ApiError, ApiResult};
use crate::refresh::parse_token_grant;
use crate::request::ApiRequest;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;

/// Authentication API interface
#[derive(Clone, Debug)]
pub struct AuthApi {
    client: MarinaClient,
}

impl AuthApi {
    /// Create a new auth API interface
    pub(crate) fn new(client: MarinaClient) -> Self {
        Self { client }
    }

    /// Log in and store the issued tokens
    ///
    /// The envelope carries the user; the token pair is already stored when
    /// it is returned.
    ///
    /// POST /auth/login
    pub async fn login(&self, credentials: &LoginRequest) -> Envelope<User> {
        let envelope = match ApiRequest::post("auth/login").json(credentials) {
            Ok(request) => self.authenticate(request.anonymous()).await,
            Err(e) => Envelope::failure(e),
        };
        if let Some(user) = envelope.data() {
            info!(user_id = ?user.id, "Logged in");
        }
        envelope
    }

    /// Create an account and store the issued tokens
    ///
    /// POST /auth/register
    pub async fn register(&self, account: &RegisterRequest) -> Envelope<User> {
        let envelope = match ApiRequest::post("auth/register").json(account) {
            Ok(request) => self.authenticate(request.anonymous()).await,
            Err(e) => Envelope::failure(e),
        };
        if let Some(user) = envelope.data() {
            info!(user_id = ?user.id, "Registered");
        }
        envelope
    }

    /// End the session; local tokens are cleared even if the server call fails
    ///
    /// POST /auth/logout
    pub async fn logout(&self) -> ApiResult<()> {
        self.client.logout().await
    }

    /// Current user
    ///
    /// GET /auth/me
    pub async fn me(&self) -> Envelope<User> {
        self.client.get("auth/me").await
    }

    /// Request a password reset email
    ///
    /// POST /auth/forgot-password
    pub async fn forgot_password(&self, email: &str) -> Envelope<Value> {
        let request = ApiRequest::post("auth/forgot-password")
            .json_value(json!({ "email": email }))
            .anonymous();
        self.client.send(request).await
    }

    /// Set a new password with a reset token
    ///
    /// POST /auth/reset-password
    pub async fn reset_password(&self, reset: &ResetPasswordRequest) -> Envelope<Value> {
        match ApiRequest::post("auth/reset-password").json(reset) {
            Ok(request) => self.client.send(request.anonymous()).await,
            Err(e) => Envelope::failure(e),
        }
    }

    async fn authenticate(&self, request: ApiRequest) -> Envelope<User> {
        let envelope: Envelope<Value> = self.client.send(request).await;
        let status = envelope.status();
        match envelope.into_data().and_then(|body| self.store_grant(status, &body)) {
            Ok(user) => Envelope::success(status, Some(user)),
            Err(e) => Envelope::failure(e),
        }
    }

    /// Save the tokens from a login/registration body and pull out the user
    fn store_grant(&self, status: u16, body: &Value) -> ApiResult<User> {
        let grant = parse_token_grant(body)
            .ok_or_else(|| ApiError::decode(status, "response did not contain tokens"))?;
        let user = body
            .get("user")
            .cloned()
            .ok_or_else(|| ApiError::decode(status, "response did not contain a user"))?;
        let user: User = serde_json::from_value(user).map_err(|e| ApiError::decode(status, e))?;

        self.client.credentials().save(&grant.into_pair(None))?;
        Ok(user)
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Login credentials
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    /// Account email
    pub email: String,
    /// Password
    pub password: String,
}

impl LoginRequest {
    /// Create login credentials
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// New account
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Account email
    pub email: String,
    /// Password
    pub password: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// `owner` or `renter`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Contact phone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

/// Password reset with the emailed token
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    /// Account email
    pub email: String,
    /// Token from the reset email
    pub token: String,
    /// New password
    pub new_password: String,
}

/// A marketplace user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User ID
    #[serde(default, deserialize_with = "opt_id_string")]
    pub id: Option<String>,
    /// Email
    #[serde(default)]
    pub email: Option<String>,
    /// Given name
    #[serde(default)]
    pub first_name: Option<String>,
    /// Family name
    #[serde(default)]
    pub last_name: Option<String>,
    /// Role, e.g. `owner` or `renter`
    #[serde(default)]
    pub role: Option<String>,
    /// Any other fields the server sent
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// "First Last", falling back to the email
    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            self.email.clone().unwrap_or_default()
        } else {
            name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use marina_core::credentials::{CredentialPair, CredentialStore, MemoryCredentialStore};
    use marina_core::retry::RetryConfig;
    use std::sync::Arc;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, store: Arc<MemoryCredentialStore>) -> MarinaClient {
        let config = ClientConfig::default()
            .with_base_url(server.uri())
            .with_retry(RetryConfig::no_retry());
        MarinaClient::with_store(config, store).unwrap()
    }

    #[test]
    fn test_user_deserialize() {
        let user: User = serde_json::from_value(json!({
            "id": 42,
            "email": "skipper@example.com",
            "firstName": "Ana",
            "lastName": "Horvat",
            "role": "owner",
            "avatarUrl": "https://cdn.example/a.png"
        }))
        .unwrap();

        assert_eq!(user.id.as_deref(), Some("42"));
        assert_eq!(user.display_name(), "Ana Horvat");
        assert_eq!(user.extra["avatarUrl"], "https://cdn.example/a.png");
    }

    #[test]
    fn test_register_request_serialize() {
        let body = serde_json::to_value(RegisterRequest {
            email: "a@b.c".into(),
            password: "pw".into(),
            first_name: "Ana".into(),
            last_name: "Horvat".into(),
            ..RegisterRequest::default()
        })
        .unwrap();

        assert_eq!(body["firstName"], "Ana");
        assert!(body.get("role").is_none());
    }

    #[tokio::test]
    async fn test_login_stores_tokens_and_returns_user() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(json!({"email": "a@b.c", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "accessToken": "A",
                "refreshToken": "R",
                "user": {"id": 1, "email": "a@b.c"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryCredentialStore::new());
        let client = client_for(&server, store.clone());

        let envelope = client.auth().login(&LoginRequest::new("a@b.c", "pw")).await;

        assert!(envelope.is_success());
        assert_eq!(envelope.status(), 200);
        assert_eq!(envelope.data().and_then(|user| user.id.as_deref()), Some("1"));
        let pair = store.load().unwrap().unwrap();
        assert_eq!(pair.access_token, "A");
        assert_eq!(pair.refresh_token.as_deref(), Some("R"));
    }

    #[tokio::test]
    async fn test_register_accepts_nested_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/register"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "tokens": {"accessToken": "A", "refreshToken": "R"},
                "user": {"id": "u-1"}
            })))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryCredentialStore::new());
        let client = client_for(&server, store.clone());
        let account = RegisterRequest {
            email: "a@b.c".into(),
            password: "pw".into(),
            ..RegisterRequest::default()
        };

        let envelope = client.auth().register(&account).await;

        assert_eq!(envelope.status(), 201);
        let user = envelope.into_data().unwrap();
        assert_eq!(user.id.as_deref(), Some("u-1"));
        assert_eq!(store.access_token().unwrap().as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_failed_login_leaves_store_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid email or password"})))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryCredentialStore::with_pair(CredentialPair::new(
            "old",
            Some("old-r".into()),
        )));
        let client = client_for(&server, store.clone());

        let envelope = client.auth().login(&LoginRequest::new("a@b.c", "wrong")).await;

        assert_eq!(envelope.status(), 401);
        assert_eq!(envelope.error(), Some(&ApiError::auth("Invalid email or password")));
        assert_eq!(store.access_token().unwrap().as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn test_login_without_tokens_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": {"id": 1}})))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryCredentialStore::new());
        let client = client_for(&server, store.clone());

        let envelope = client.auth().login(&LoginRequest::new("a@b.c", "pw")).await;

        assert_eq!(envelope.status(), 200);
        assert!(matches!(envelope.error(), Some(ApiError::Decode { status: 200, .. })));
        assert!(store.load().unwrap().is_none());
    }
}
