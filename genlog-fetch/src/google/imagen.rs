//! Vertex AI Imagen client.
//!
//! Calls the publisher model `:predict` endpoint with a single instance and
//! decodes the first returned image.

use std::sync::Arc;
use std::time::Instant;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use genlog_core::{CoreError, GeneratedImage, GenerationParams, ImageFormat, ImageSynthesizer};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::auth::TokenSource;
use super::error::GoogleError;
use crate::host::http::{HttpClient, ResponseExt};

/// Default Vertex AI region.
pub const DEFAULT_LOCATION: &str = "us-central1";

/// Default Imagen model.
pub const DEFAULT_MODEL: &str = "imagen-3.0-generate-002";

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: [Instance<'a>; 1],
    parameters: Parameters<'a>,
}

#[derive(Debug, Serialize)]
struct Instance<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Parameters<'a> {
    sample_count: u32,
    aspect_ratio: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_prompt: Option<&'a str>,
    person_generation: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    add_watermark: bool,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    rai_filtered_reason: Option<String>,
}

fn build_request<'a>(prompt: &'a str, params: &'a GenerationParams) -> PredictRequest<'a> {
    PredictRequest {
        instances: [Instance { prompt }],
        parameters: Parameters {
            sample_count: 1,
            aspect_ratio: params.aspect_ratio.as_str(),
            negative_prompt: params
                .negative_prompt
                .as_deref()
                .filter(|n| !n.trim().is_empty()),
            person_generation: params.person_generation.as_str(),
            seed: params.seed,
            // The backend rejects seeds on watermarked requests.
            add_watermark: params.add_watermark && params.seed.is_none(),
        },
    }
}

/// Decodes the first usable prediction. `Ok(None)` when nothing came back.
fn parse_response(response: PredictResponse) -> Result<Option<GeneratedImage>, GoogleError> {
    for prediction in response.predictions {
        if let Some(reason) = prediction.rai_filtered_reason.as_deref() {
            warn!(reason, "Prediction filtered");
        }
        let Some(encoded) = prediction.bytes_base64_encoded else {
            continue;
        };
        let data = BASE64
            .decode(encoded.as_bytes())
            .map_err(|e| GoogleError::Parse(format!("invalid image data: {e}")))?;
        if data.is_empty() {
            continue;
        }
        let declared = prediction
            .mime_type
            .as_deref()
            .and_then(ImageFormat::from_mime_type)
            .unwrap_or_default();
        return Ok(Some(GeneratedImage::new(data, declared)));
    }
    Ok(None)
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`ImagenClient`].
#[derive(Debug, Clone)]
pub struct ImagenClientBuilder {
    location: String,
    model: String,
    project_id: Option<String>,
}

impl Default for ImagenClientBuilder {
    fn default() -> Self {
        Self {
            location: DEFAULT_LOCATION.to_string(),
            model: DEFAULT_MODEL.to_string(),
            project_id: None,
        }
    }
}

impl ImagenClientBuilder {
    /// Sets the Vertex AI region.
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Sets the model.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Overrides the project (defaults to the service account's project).
    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Builds the client.
    pub fn build(self, http: HttpClient, tokens: Arc<TokenSource>) -> ImagenClient {
        let project_id = self
            .project_id
            .unwrap_or_else(|| tokens.project_id().to_string());
        ImagenClient {
            http,
            tokens,
            project_id,
            location: self.location,
            model: self.model,
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// [`ImageSynthesizer`] backed by Vertex AI Imagen.
#[derive(Debug, Clone)]
pub struct ImagenClient {
    http: HttpClient,
    tokens: Arc<TokenSource>,
    project_id: String,
    location: String,
    model: String,
}

impl ImagenClient {
    /// Starts a builder.
    pub fn builder() -> ImagenClientBuilder {
        ImagenClientBuilder::default()
    }

    /// Predict endpoint for the configured model.
    pub fn endpoint(&self) -> String {
        format!(
            "https://{loc}-aiplatform.googleapis.com/v1/projects/{project}/locations/{loc}/publishers/google/models/{model}:predict",
            loc = self.location,
            project = self.project_id,
            model = self.model,
        )
    }

    async fn predict(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<Option<GeneratedImage>, GoogleError> {
        let token = self.tokens.access_token().await?;
        let request = build_request(prompt, params);
        let started = Instant::now();

        let response = self
            .http
            .post_json_with_bearer(&self.endpoint(), &token, &request)
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = response.retry_after_secs();
            let body = response.text().await.unwrap_or_default();
            let err = GoogleError::from_status(status, &body, retry_after);
            if matches!(err, GoogleError::AuthenticationFailed(_)) {
                self.tokens.invalidate().await;
            }
            return Err(err);
        }

        let parsed: PredictResponse = response
            .json()
            .await
            .map_err(|e| GoogleError::Parse(e.to_string()))?;

        Ok(parse_response(parsed)?.map(|mut image| {
            image.model = Some(self.model.clone());
            image.elapsed = Some(started.elapsed());
            image
        }))
    }
}

impl ImageSynthesizer for ImagenClient {
    #[instrument(skip(self, prompt, params), fields(model = %self.model, aspect = %params.aspect_ratio))]
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<Option<GeneratedImage>, CoreError> {
        debug!(prompt_len = prompt.len(), "Requesting image");
        let image = self.predict(prompt, params).await?;
        match &image {
            Some(img) => info!(bytes = img.len(), format = ?img.format, "Image generated"),
            None => warn!("Model returned no image"),
        }
        Ok(image)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Tests
// ============================================================================
