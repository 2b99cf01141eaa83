//! Host APIs for genlog.
//!
//! - [`keychain`] - Secure credential storage (system keychain)
//! - [`http`] - HTTP client with tracing and domain allowlist

pub mod http;
pub mod keychain;

// Re-export key types
pub use http::{HttpClient, ResponseExt};
pub use keychain::{KeychainApi, SystemKeychain};
