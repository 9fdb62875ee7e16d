//! Resilient HTTP access layer for the Marina boat-rental marketplace
//!
//! Every resource call funnels through [`MarinaClient`], which provides:
//!
//! - **Bounded retries**: network failures are retried with linear backoff
//! - **Per-attempt deadline**: a slow attempt is cancelled and reported as a timeout
//! - **Transparent refresh**: a 401 triggers one shared token refresh and a single replay
//! - **Content negotiation**: JSON, text, empty and binary bodies
//! - **Normalized errors**: one taxonomy with field-level validation details
//!
//! # Example
//!
//! ```rust,no_run
//! use marina_api_client::endpoints::auth::LoginRequest;
//! use marina_api_client::MarinaClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = MarinaClient::new()?;
//!
//!     let user = client
//!         .auth()
//!         .login(&LoginRequest::new("ana@example.com", "secret"))
//!         .await
//!         .into_data()?;
//!     println!("Welcome {}", user.display_name());
//!
//!     let boat = client.boats().get("7").await.into_data()?;
//!     println!("{} sleeps {:?}", boat.name, boat.capacity);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod decode;
pub mod endpoints;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod refresh;
pub mod request;
pub mod transport;

pub use client::MarinaClient;
pub use config::{ClientConfig, Environment};
pub use decode::{Download, Payload};
pub use envelope::Envelope;
pub use error::{ApiError, ApiResult, ErrorKind, FieldError};
pub use request::{ApiRequest, FormPayload, RequestBody};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::client::MarinaClient;
    pub use crate::config::{ClientConfig, Environment};
    pub use crate::decode::{Download, Payload};
    pub use crate::endpoints::{
        AuthApi, AvailabilityApi, BoatsApi, BookingsApi, DashboardApi, UsersApi,
    };
    pub use crate::envelope::Envelope;
    pub use crate::error::{ApiError, ApiResult, ErrorKind};
    pub use crate::request::{ApiRequest, FormPayload};
}
