//! Domain models for genlog.
//!
//! ## Submodules
//!
//! - [`entry`] - Log entries, the log table, artifact naming
//! - [`blob`] - Blob references, contents, revisions
//! - [`image`] - Generation parameters and generated images
//! - [`session`] - User sessions and access policy
//! - [`credentials`] - Service-account credentials

mod blob;
mod credentials;
mod entry;
mod image;
mod session;

pub use blob::{BlobContent, BlobRef, Revision};
pub use credentials::{DEFAULT_TOKEN_URI, ServiceCredentials};
pub use entry::{
    DEFAULT_TABLE_NAME, LOG_HEADER, LogEntry, LogTable, TABLE_MIME_TYPE, artifact_name,
    numbered_name,
};
pub use image::{AspectRatio, GeneratedImage, GenerationParams, ImageFormat, PersonGeneration};
pub use session::{AccessPolicy, Session};
