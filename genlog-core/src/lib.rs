// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # genlog Core
//!
//! Core types, models, and traits shared by the genlog crates.
//!
//! - Domain models (log entries, tables, blobs, sessions, images, credentials)
//! - Error types
//! - Trait definitions for the external services
//! - Pure logic: prompt decoration and log row encoding
//!
//! ## Key Types
//!
//! ### Usage Log
//! - [`LogEntry`] - One generation event
//! - [`LogTable`] - The append-only table (one blob in one container)
//! - [`BlobRef`], [`BlobContent`], [`Revision`] - What stores hand back
//!
//! ### Generation
//! - [`GenerationParams`] - Aspect ratio, negative prompt, seed
//! - [`GeneratedImage`] - Returned image payload
//!
//! ### Session & Credentials
//! - [`Session`] - Authenticated user, passed explicitly to handlers
//! - [`ServiceCredentials`] - Service-account key
//!
//! ### Service Seams
//! - [`RemoteLogStore`], [`ImageSynthesizer`], [`CredentialProvider`]

pub mod error;
pub mod models;
pub mod prompt;
pub mod row;
pub mod traits;

// Re-export error types
pub use error::{BlobStoreError, CoreError};

// Re-export all model types
pub use models::{
    // Log
    DEFAULT_TABLE_NAME,
    LOG_HEADER,
    LogEntry,
    LogTable,
    TABLE_MIME_TYPE,
    artifact_name,
    numbered_name,
    // Blobs
    BlobContent,
    BlobRef,
    Revision,
    // Generation
    AspectRatio,
    GeneratedImage,
    GenerationParams,
    ImageFormat,
    PersonGeneration,
    // Session & credentials
    AccessPolicy,
    DEFAULT_TOKEN_URI,
    ServiceCredentials,
    Session,
};

// Re-export pure helpers
pub use prompt::{ASPECT_DIRECTIVE, LIGHTING_PHRASE, aspect_directive, decorate};
pub use row::LineTerminator;

// Re-export traits
pub use traits::{CredentialProvider, ImageSynthesizer, RemoteLogStore};
