//! Core building blocks for the Marina marketplace client
//!
//! This crate holds the pieces that do not depend on HTTP:
//!
//! - **Error handling**: structured errors with codes, context, and recovery suggestions
//! - **Retry**: bounded retry with linear backoff for transient failures
//! - **Credentials**: durable storage for the access/refresh token pair
//!
//! # Example
//!
//! ```rust,no_run
//! use marina_core::credentials::{CredentialPair, CredentialStore, FileCredentialStore};
//!
//! let store = FileCredentialStore::at_default_location().expect("no data dir");
//! store
//!     .save(&CredentialPair::new("access", Some("refresh".to_string())))
//!     .expect("Failed to save credentials");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod credentials;
pub mod error;
pub mod retry;

pub use error::{Error, ErrorCode, Result, ResultExt};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::credentials::{
        CredentialPair, CredentialStore, FileCredentialStore, MemoryCredentialStore,
    };
    pub use crate::error::{exit_codes, Error, ErrorCode, Result, ResultExt};
    pub use crate::retry::{retry, RetryConfig, RetryResult};
}
