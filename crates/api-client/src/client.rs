//! Main API client implementation
//!
//! [`MarinaClient`] is the authentication gateway: it attaches the stored
//! bearer token, hands the request to the [`Executor`], and on a 401 asks the
//! [`RefreshCoordinator`] for a new token before replaying the request once.
//! Every call ends in an [`Envelope`]; expected failures never panic or
//! escape as `Err`.

use crate::config::ClientConfig;
use crate::decode::{decode, Download, Payload};
use crate::endpoints::{AuthApi, AvailabilityApi, BoatsApi, BookingsApi, DashboardApi, UsersApi};
use crate::envelope::Envelope;
use crate::error::{classify_status, classify_unauthorized, ApiError, ApiResult};
use crate::executor::Executor;
use crate::refresh::{RefreshCoordinator, RefreshOutcome};
use crate::request::{ApiRequest, FormPayload};
use crate::transport::{RawResponse, ReqwestTransport, Transport};
use marina_core::credentials::{CredentialStore, FileCredentialStore};
use marina_telemetry::{metrics, Timer};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Logout endpoint, relative to the base URL
pub const LOGOUT_PATH: &str = "auth/logout";

/// Marina API client with token refresh and bounded retries
///
/// Cheap to clone; clones share the executor, the credential store and the
/// refresh coordinator.
#[derive(Clone, Debug)]
pub struct MarinaClient {
    config: Arc<ClientConfig>,
    executor: Arc<Executor>,
    credentials: Arc<dyn CredentialStore>,
    refresher: Arc<RefreshCoordinator>,
}

impl MarinaClient {
    /// Create a new client with configuration from the environment
    pub fn new() -> ApiResult<Self> {
        let config = ClientConfig::from_env()?;
        Self::with_config(config)
    }

    /// Create a client with a file-backed credential store
    pub fn with_config(config: ClientConfig) -> ApiResult<Self> {
        config.validate()?;
        let store = match &config.credentials_path {
            Some(path) => FileCredentialStore::new(path),
            None => FileCredentialStore::at_default_location()?,
        };
        Self::with_store(config, Arc::new(store))
    }

    /// Create a client with a custom credential store
    pub fn with_store(config: ClientConfig, credentials: Arc<dyn CredentialStore>) -> ApiResult<Self> {
        let transport = ReqwestTransport::new(&config.user_agent)?;
        Self::with_transport(config, credentials, Arc::new(transport))
    }

    /// Create a client with a custom store and transport
    pub fn with_transport(
        config: ClientConfig,
        credentials: Arc<dyn CredentialStore>,
        transport: Arc<dyn Transport>,
    ) -> ApiResult<Self> {
        config.validate()?;

        let executor = Arc::new(Executor::new(
            transport,
            config.base_url.clone(),
            config.timeout,
            config.retry.clone(),
        ));
        let refresher = Arc::new(RefreshCoordinator::new(
            Arc::clone(&executor),
            Arc::clone(&credentials),
        ));

        Ok(Self {
            config: Arc::new(config),
            executor,
            credentials,
            refresher,
        })
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Credential store shared by every clone of this client
    #[must_use]
    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    /// Whether an access token is stored
    pub fn is_authenticated(&self) -> bool {
        matches!(self.credentials.access_token(), Ok(Some(_)))
    }

    // -------------------------------------------------------------------------
    // Endpoint API accessors
    // -------------------------------------------------------------------------

    /// Access authentication endpoints
    #[must_use]
    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.clone())
    }

    /// Access boat listing endpoints
    #[must_use]
    pub fn boats(&self) -> BoatsApi {
        BoatsApi::new(self.clone())
    }

    /// Access booking endpoints
    #[must_use]
    pub fn bookings(&self) -> BookingsApi {
        BookingsApi::new(self.clone())
    }

    /// Access user profile endpoints
    #[must_use]
    pub fn users(&self) -> UsersApi {
        UsersApi::new(self.clone())
    }

    /// Access availability calendar endpoints
    #[must_use]
    pub fn availability(&self) -> AvailabilityApi {
        AvailabilityApi::new(self.clone())
    }

    /// Access dashboard endpoints
    #[must_use]
    pub fn dashboard(&self) -> DashboardApi {
        DashboardApi::new(self.clone())
    }

    // -------------------------------------------------------------------------
    // Request entry points
    // -------------------------------------------------------------------------

    /// Send a request and deserialize the body into `T`
    ///
    /// Empty bodies yield `data: None`. Text bodies deserialize as a JSON
    /// string, so `T = String` or `T = serde_json::Value` accepts anything.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Envelope<T> {
        self.dispatch(&request, |payload, status| payload.into_typed(status))
            .await
    }

    /// Send a request and return the decoded payload untyped
    pub async fn send_raw(&self, request: ApiRequest) -> Envelope<Payload> {
        self.dispatch(&request, |payload, _| {
            Ok((!payload.is_empty()).then_some(payload))
        })
        .await
    }

    /// Download a binary body
    pub async fn download(&self, path: &str) -> Envelope<Download> {
        let request = ApiRequest::get(path).header("Accept", "*/*");
        let timer = Timer::start("http.request_ms");
        let envelope = match self.execute_authenticated(&request).await {
            Ok(response) if response.is_success() => {
                let status = response.status;
                let download = Download::from_response(response);
                debug!(path, bytes = download.len(), "Download complete");
                Envelope::success(status, Some(download))
            }
            Ok(response) => Envelope::failure(classify_failure(&response)),
            Err(e) => Envelope::failure(e),
        };
        timer.stop();
        envelope
    }

    /// GET `path`
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Envelope<T> {
        self.send(ApiRequest::get(path)).await
    }

    /// POST a JSON body to `path`
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Envelope<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        match ApiRequest::post(path).json(body) {
            Ok(request) => self.send(request).await,
            Err(e) => Envelope::failure(e),
        }
    }

    /// PUT a JSON body to `path`
    pub async fn put<T, B>(&self, path: &str, body: &B) -> Envelope<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        match ApiRequest::put(path).json(body) {
            Ok(request) => self.send(request).await,
            Err(e) => Envelope::failure(e),
        }
    }

    /// PATCH a JSON body to `path`
    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Envelope<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        match ApiRequest::patch(path).json(body) {
            Ok(request) => self.send(request).await,
            Err(e) => Envelope::failure(e),
        }
    }

    /// DELETE `path`
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Envelope<T> {
        self.send(ApiRequest::delete(path)).await
    }

    /// POST a multipart form to `path`
    pub async fn upload<T: DeserializeOwned>(&self, path: &str, form: FormPayload) -> Envelope<T> {
        self.send(ApiRequest::post(path).form(form)).await
    }

    /// Tell the server, then forget the stored credentials
    ///
    /// The server call is best-effort and never goes through the refresh
    /// path: a 401 here just means the session is already gone. Local
    /// credentials are cleared whatever its outcome.
    pub async fn logout(&self) -> ApiResult<()> {
        if let Ok(Some(token)) = self.credentials.access_token() {
            let request = ApiRequest::post(LOGOUT_PATH);
            match self.executor.execute(&request, Some(&token)).await {
                Ok(response) if response.is_success() => debug!("Server-side session ended"),
                Ok(response) => debug!(status = response.status, "Server-side logout rejected"),
                Err(e) => debug!(error = %e, "Server-side logout failed"),
            }
        }
        self.credentials.clear()?;
        metrics().increment("auth.logout");
        info!("Logged out");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Gateway
    // -------------------------------------------------------------------------

    async fn dispatch<T>(
        &self,
        request: &ApiRequest,
        convert: impl FnOnce(Payload, u16) -> ApiResult<Option<T>>,
    ) -> Envelope<T> {
        let timer = Timer::start("http.request_ms");
        let envelope = match self.execute_authenticated(request).await {
            Ok(response) if response.is_success() => {
                let status = response.status;
                match convert(decode(&response), status) {
                    Ok(data) => Envelope::success(status, data),
                    Err(e) => Envelope::failure(e),
                }
            }
            Ok(response) => Envelope::failure(classify_failure(&response)),
            Err(e) => Envelope::failure(e),
        };
        timer.stop();

        if let Some(e) = envelope.error() {
            debug!(
                method = %request.method(),
                path = request.path(),
                status = envelope.status(),
                kind = ?e.kind(),
                "Request returned an error"
            );
        }
        envelope
    }

    /// Attach the token, execute, and on 401 refresh and replay once
    ///
    /// Returns the response that should be classified: the original one, the
    /// replay's, or the original 401 if the refresh failed.
    async fn execute_authenticated(&self, request: &ApiRequest) -> ApiResult<RawResponse> {
        if request.is_anonymous() {
            return self.executor.execute(request, None).await;
        }

        let token = self.credentials.access_token()?;
        let response = self.executor.execute(request, token.as_deref()).await?;
        if response.status != StatusCode::UNAUTHORIZED.as_u16() {
            return Ok(response);
        }

        debug!(path = request.path(), "Access token rejected; refreshing");
        match self.refresher.refresh(token.as_deref()).await {
            RefreshOutcome::Refreshed(pair) => {
                debug!(path = request.path(), "Replaying request with refreshed token");
                self.executor
                    .execute(request, Some(&pair.access_token))
                    .await
            }
            RefreshOutcome::Failed(reason) => {
                warn!(path = request.path(), reason = %reason, "Session could not be restored");
                Ok(response)
            }
        }
    }
}

fn classify_failure(response: &RawResponse) -> ApiError {
    if response.status == StatusCode::UNAUTHORIZED.as_u16() {
        classify_unauthorized(&response.body)
    } else {
        classify_status(response.status, &response.body)
    }
}
