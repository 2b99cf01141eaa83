// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # genlog Fetch
//!
//! Host APIs and Google service clients for genlog.
//!
//! ## Host APIs
//!
//! - [`host::http`] - HTTP client with tracing, retries, and domain allowlist
//! - [`host::keychain`] - Secure credential storage (system keychain)
//!
//! ## Google Clients
//!
//! - [`google::TokenSource`] - OAuth access tokens for a service account
//! - [`google::DriveLogStore`] - Drive folders as the usage-log store
//! - [`google::ImagenClient`] - Vertex AI Imagen image generation
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use genlog_fetch::{HttpClient, google::{AnyCredentialProvider, DriveLogStore, TokenSource}};
//!
//! let creds = AnyCredentialProvider::resolve(None).credentials()?;
//! let http = HttpClient::for_google(Duration::from_secs(60))?;
//! let tokens = Arc::new(TokenSource::with_default_scopes(http.clone(), creds));
//! let store = DriveLogStore::new(http, tokens);
//! ```

pub mod error;
pub mod google;
pub mod host;
pub mod retry;

// Errors
pub use error::{HttpError, KeychainError};
pub use google::GoogleError;

// Host APIs
pub use host::{
    http::{HttpClient, ResponseExt},
    keychain::{KeychainApi, SystemKeychain},
};

// Retry
pub use retry::RetryStrategy;
