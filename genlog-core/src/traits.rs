//! Trait definitions for genlog.
//!
//! These are the seams to the external services: the blob store holding the
//! usage log, the image synthesizer, and the credential source. Everything
//! above them is testable with in-memory implementations.

use std::future::Future;

use crate::error::{BlobStoreError, CoreError};
use crate::models::{BlobContent, BlobRef, GeneratedImage, GenerationParams, Revision, ServiceCredentials};

/// A key-addressed blob store organized in containers.
///
/// Only whole-blob operations are required; no partial append.
pub trait RemoteLogStore: Send + Sync {
    /// Lists blobs named exactly `name` inside `container_id`.
    ///
    /// Implementations must scope the lookup to the container; a global name
    /// search would collide with unrelated files.
    fn list(
        &self,
        name: &str,
        container_id: &str,
    ) -> impl Future<Output = Result<Vec<BlobRef>, BlobStoreError>> + Send;

    /// Creates a new blob.
    fn create(
        &self,
        name: &str,
        container_id: &str,
        mime_type: &str,
        content: Vec<u8>,
    ) -> impl Future<Output = Result<BlobRef, BlobStoreError>> + Send;

    /// Reads a blob's full content.
    fn read_content(
        &self,
        blob_id: &str,
    ) -> impl Future<Output = Result<BlobContent, BlobStoreError>> + Send;

    /// Replaces a blob's full content.
    ///
    /// With `expected` set, the update must fail with
    /// [`BlobStoreError::Conflict`] if the blob's current revision differs.
    fn update_content(
        &self,
        blob_id: &str,
        content: Vec<u8>,
        expected: Option<&Revision>,
    ) -> impl Future<Output = Result<BlobRef, BlobStoreError>> + Send;
}

/// Turns a prompt into at most one image.
pub trait ImageSynthesizer: Send + Sync {
    /// Generates an image.
    ///
    /// `Ok(None)` means the service answered but returned no image (for
    /// example because every sample was filtered).
    fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> impl Future<Output = Result<Option<GeneratedImage>, CoreError>> + Send;

    /// Model identifier, for display.
    fn model(&self) -> &str;
}

/// Supplies service credentials from a secret store.
pub trait CredentialProvider: Send + Sync {
    /// Loads the credentials.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Credentials` if no usable credentials exist.
    fn credentials(&self) -> Result<ServiceCredentials, CoreError>;

    /// Short description of where credentials come from.
    fn source(&self) -> String;
}
