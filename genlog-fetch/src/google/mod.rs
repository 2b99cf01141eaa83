//! Google service clients.
//!
//! - [`auth`] - Service-account JWT exchange and token caching
//! - [`credentials`] - Where the service-account key comes from
//! - [`drive`] - Drive v3 as a [`genlog_core::RemoteLogStore`]
//! - [`imagen`] - Vertex AI Imagen as a [`genlog_core::ImageSynthesizer`]

pub mod auth;
pub mod credentials;
pub mod drive;
pub mod error;
pub mod imagen;

pub use auth::{CLOUD_PLATFORM_SCOPE, DRIVE_SCOPE, TokenSource};
pub use credentials::{
    AnyCredentialProvider, CREDENTIALS_ENV_VAR, FileCredentialProvider, KeychainCredentialProvider,
};
pub use drive::DriveLogStore;
pub use error::GoogleError;
pub use imagen::{DEFAULT_LOCATION, DEFAULT_MODEL, ImagenClient, ImagenClientBuilder};
