//! Google Drive v3 client for the usage log.
//!
//! Drive has no conditional writes, so [`DriveLogStore::update_content`]
//! compares the file's `version` just before uploading. A writer that lands
//! between that check and the upload is not detected.

use std::sync::Arc;

use genlog_core::{BlobContent, BlobRef, BlobStoreError, RemoteLogStore, Revision};
use reqwest::{Method, Response};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use super::auth::TokenSource;
use super::error::GoogleError;
use crate::host::http::{HttpClient, ResponseExt};

// ============================================================================
// Constants
// ============================================================================

const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";

/// Metadata fields requested for every file.
const FILE_FIELDS: &str = "id,name,version";

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default, rename = "mimeType")]
    mime_type: Option<String>,
}

impl From<DriveFile> for BlobRef {
    fn from(file: DriveFile) -> Self {
        let blob = BlobRef::new(file.id, file.name);
        match file.version {
            Some(v) => blob.with_revision(Revision::new(v)),
            None => blob,
        }
    }
}

// ============================================================================
// Query Helpers
// ============================================================================

/// Escapes a value for a Drive `q` string literal.
fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Builds the exact-name, single-folder lookup query.
pub(crate) fn name_query(name: &str, folder_id: &str) -> String {
    format!(
        "name = '{}' and '{}' in parents and trashed = false",
        escape_query_value(name),
        escape_query_value(folder_id)
    )
}

/// Builds a `multipart/related` body: JSON metadata part, then the content.
pub(crate) fn multipart_body(
    boundary: &str,
    metadata: &serde_json::Value,
    mime_type: &str,
    content: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(format!("\r\n--{boundary}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Type: {mime_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

// ============================================================================
// Drive Store
// ============================================================================

/// [`RemoteLogStore`] backed by Google Drive (folders are containers).
#[derive(Debug, Clone)]
pub struct DriveLogStore {
    http: HttpClient,
    tokens: Arc<TokenSource>,
}

impl DriveLogStore {
    /// Creates a Drive store.
    pub fn new(http: HttpClient, tokens: Arc<TokenSource>) -> Self {
        Self { http, tokens }
    }

    async fn token(&self) -> Result<String, GoogleError> {
        self.tokens.access_token().await
    }

    /// Turns an unsuccessful response into a [`GoogleError`].
    async fn check(&self, response: Response) -> Result<Response, GoogleError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let retry_after = response.retry_after_secs();
        let body = response.text().await.unwrap_or_default();
        let err = GoogleError::from_status(status, &body, retry_after);
        if matches!(err, GoogleError::AuthenticationFailed(_)) {
            self.tokens.invalidate().await;
        }
        warn!(status = %status, error = %err, "Drive request failed");
        Err(err)
    }

    async fn parse<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, GoogleError> {
        response
            .json()
            .await
            .map_err(|e| GoogleError::Parse(e.to_string()))
    }

    async fn metadata(&self, file_id: &str) -> Result<DriveFile, GoogleError> {
        let token = self.token().await?;
        let url = format!("{FILES_URL}/{file_id}");
        let response = self
            .http
            .get_with_bearer(
                &url,
                &token,
                &[("fields", "id,name,version,mimeType"), ("supportsAllDrives", "true")],
            )
            .await?;
        Self::parse(self.check(response).await?).await
    }

    async fn list_files(&self, name: &str, folder_id: &str) -> Result<Vec<BlobRef>, GoogleError> {
        let token = self.token().await?;
        let query = name_query(name, folder_id);
        let fields = format!("files({FILE_FIELDS})");
        let response = self
            .http
            .get_with_bearer(
                FILES_URL,
                &token,
                &[
                    ("q", query.as_str()),
                    ("fields", fields.as_str()),
                    ("spaces", "drive"),
                    ("supportsAllDrives", "true"),
                    ("includeItemsFromAllDrives", "true"),
                ],
            )
            .await?;
        let list: FileList = Self::parse(self.check(response).await?).await?;
        Ok(list.files.into_iter().map(BlobRef::from).collect())
    }

    async fn create_file(
        &self,
        name: &str,
        folder_id: &str,
        mime_type: &str,
        content: Vec<u8>,
    ) -> Result<BlobRef, GoogleError> {
        let token = self.token().await?;
        let boundary = format!("genlog-{}", uuid::Uuid::new_v4().simple());
        let metadata = serde_json::json!({
            "name": name,
            "parents": [folder_id],
            "mimeType": mime_type,
        });
        let body = multipart_body(&boundary, &metadata, mime_type, &content);

        let response = self
            .http
            .send_bytes_with_bearer(
                Method::POST,
                UPLOAD_URL,
                &token,
                &[
                    ("uploadType", "multipart"),
                    ("fields", FILE_FIELDS),
                    ("supportsAllDrives", "true"),
                ],
                &format!("multipart/related; boundary={boundary}"),
                body,
            )
            .await?;
        let file: DriveFile = Self::parse(self.check(response).await?).await?;
        info!(file_id = %file.id, "Created Drive file");
        Ok(file.into())
    }

    async fn download(&self, file_id: &str) -> Result<BlobContent, GoogleError> {
        let meta = self.metadata(file_id).await?;
        let token = self.token().await?;
        let url = format!("{FILES_URL}/{file_id}");
        let response = self
            .http
            .get_with_bearer(&url, &token, &[("alt", "media"), ("supportsAllDrives", "true")])
            .await?;
        let bytes = self
            .check(response)
            .await?
            .bytes()
            .await
            .map_err(|e| GoogleError::Http(e.into()))?;
        debug!(bytes = bytes.len(), version = ?meta.version, "Downloaded Drive file");
        Ok(BlobContent::new(bytes.to_vec(), meta.version.map(Revision::new)))
    }

    async fn upload(
        &self,
        file_id: &str,
        content: Vec<u8>,
        expected: Option<&Revision>,
    ) -> Result<BlobRef, GoogleError> {
        let meta = self.metadata(file_id).await?;
        if let Some(expected) = expected {
            let actual = meta.version.clone().unwrap_or_default();
            if actual != expected.as_str() {
                debug!(expected = %expected, actual = %actual, "Drive version moved");
                return Err(GoogleError::VersionConflict {
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        let token = self.token().await?;
        let url = format!("{UPLOAD_URL}/{file_id}");
        let mime_type = meta
            .mime_type
            .unwrap_or_else(|| genlog_core::TABLE_MIME_TYPE.to_string());
        let response = self
            .http
            .send_bytes_with_bearer(
                Method::PATCH,
                &url,
                &token,
                &[
                    ("uploadType", "media"),
                    ("fields", FILE_FIELDS),
                    ("supportsAllDrives", "true"),
                ],
                &mime_type,
                content,
            )
            .await?;
        let file: DriveFile = Self::parse(self.check(response).await?).await?;
        Ok(file.into())
    }
}

impl RemoteLogStore for DriveLogStore {
    #[instrument(skip(self))]
    async fn list(&self, name: &str, container_id: &str) -> Result<Vec<BlobRef>, BlobStoreError> {
        Ok(self.list_files(name, container_id).await?)
    }

    #[instrument(skip(self, content), fields(bytes = content.len()))]
    async fn create(
        &self,
        name: &str,
        container_id: &str,
        mime_type: &str,
        content: Vec<u8>,
    ) -> Result<BlobRef, BlobStoreError> {
        Ok(self.create_file(name, container_id, mime_type, content).await?)
    }

    #[instrument(skip(self))]
    async fn read_content(&self, blob_id: &str) -> Result<BlobContent, BlobStoreError> {
        Ok(self.download(blob_id).await?)
    }

    #[instrument(skip(self, content), fields(bytes = content.len()))]
    async fn update_content(
        &self,
        blob_id: &str,
        content: Vec<u8>,
        expected: Option<&Revision>,
    ) -> Result<BlobRef, BlobStoreError> {
        Ok(self.upload(blob_id, content, expected).await?)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_query_scopes_to_folder() {
        assert_eq!(
            name_query("usage_log.csv", "folder123"),
            "name = 'usage_log.csv' and 'folder123' in parents and trashed = false"
        );
    }

    #[test]
    fn test_name_query_escapes_quotes() {
        assert_eq!(
            name_query(r"o'brien\log.csv", "f"),
            r"name = 'o\'brien\\log.csv' and 'f' in parents and trashed = false"
        );
    }

    #[test]
    fn test_multipart_body_layout() {
        let metadata = serde_json::json!({"name": "usage_log.csv"});
        let body = multipart_body("b0", &metadata, "text/csv", b"Timestamp\n");
        let text = String::from_utf8(body).unwrap();

        assert!(text.starts_with("--b0\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n"));
        assert!(text.contains(r#"{"name":"usage_log.csv"}"#));
        assert!(text.contains("\r\n--b0\r\nContent-Type: text/csv\r\n\r\nTimestamp\n\r\n--b0--\r\n"));
    }

    #[test]
    fn test_drive_file_to_blob_ref() {
        let file: DriveFile =
            serde_json::from_str(r#"{"id":"abc","name":"usage_log.csv","version":"12"}"#).unwrap();
        let blob = BlobRef::from(file);
        assert_eq!(blob.id, "abc");
        assert_eq!(blob.revision, Some(Revision::new("12")));
    }

    #[test]
    fn test_file_list_tolerates_missing_files() {
        let list: FileList = serde_json::from_str("{}").unwrap();
        assert!(list.files.is_empty());
    }
}
