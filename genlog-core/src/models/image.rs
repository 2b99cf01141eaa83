//! Image generation types.
//!
//! - [`GenerationParams`] - Parameters sent with a prompt
//! - [`GeneratedImage`] - Image payload returned by a synthesizer
//! - [`ImageFormat`] - Encoded image formats
//! - [`AspectRatio`] - Aspect ratios the generator accepts

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::CoreError;

// ============================================================================
// Image Format
// ============================================================================

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG (lossless).
    #[default]
    Png,
    /// JPEG (lossy).
    Jpeg,
    /// WebP.
    WebP,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Maps a MIME type to a format.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detects the format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }
        if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }
        None
    }
}

// ============================================================================
// Aspect Ratio
// ============================================================================

/// Aspect ratios accepted by the image generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 1:1
    #[default]
    #[serde(rename = "1:1")]
    Square,
    /// 16:9
    #[serde(rename = "16:9")]
    Landscape,
    /// 9:16
    #[serde(rename = "9:16")]
    Portrait,
    /// 4:3
    #[serde(rename = "4:3")]
    Standard,
    /// 3:4
    #[serde(rename = "3:4")]
    StandardPortrait,
}

impl AspectRatio {
    /// Returns the `W:H` form sent to the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
            Self::Standard => "4:3",
            Self::StandardPortrait => "3:4",
        }
    }

    /// All supported ratios.
    pub fn all() -> &'static [AspectRatio] {
        &[
            Self::Square,
            Self::Landscape,
            Self::Portrait,
            Self::Standard,
            Self::StandardPortrait,
        ]
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|r| r.as_str() == s.trim())
            .ok_or_else(|| CoreError::InvalidConfig(format!("unsupported aspect ratio: {s}")))
    }
}

/// Whether generated images may contain people.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonGeneration {
    /// No people at all.
    DontAllow,
    /// Adults only.
    #[default]
    AllowAdult,
    /// Adults and minors.
    AllowAll,
}

impl PersonGeneration {
    /// Returns the API value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DontAllow => "dont_allow",
            Self::AllowAdult => "allow_adult",
            Self::AllowAll => "allow_all",
        }
    }
}

// ============================================================================
// Generation Params
// ============================================================================

/// Parameters for one generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    /// Output aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// What the image should not contain.
    pub negative_prompt: Option<String>,
    /// Person generation policy.
    pub person_generation: PersonGeneration,
    /// Seed for reproducible output (disables watermarking on the backend).
    pub seed: Option<u32>,
    /// Ask the backend to embed an invisible watermark.
    pub add_watermark: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            aspect_ratio: AspectRatio::Square,
            negative_prompt: None,
            person_generation: PersonGeneration::AllowAdult,
            seed: None,
            add_watermark: true,
        }
    }
}

impl GenerationParams {
    /// Sets the aspect ratio.
    pub fn with_aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.aspect_ratio = ratio;
        self
    }

    /// Sets the negative prompt.
    pub fn with_negative_prompt(mut self, negative: impl Into<String>) -> Self {
        self.negative_prompt = Some(negative.into());
        self
    }

    /// Sets the seed.
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = Some(seed);
        self
    }
}

// ============================================================================
// Generated Image
// ============================================================================

/// An image returned by a synthesizer.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    /// Encoded image bytes.
    pub data: Vec<u8>,
    /// Encoding of `data`.
    pub format: ImageFormat,
    /// Model that produced the image.
    pub model: Option<String>,
    /// Wall time of the request.
    pub elapsed: Option<Duration>,
}

impl GeneratedImage {
    /// Creates an image, preferring the format detected from the bytes.
    pub fn new(data: Vec<u8>, declared: ImageFormat) -> Self {
        let format = ImageFormat::from_magic_bytes(&data).unwrap_or(declared);
        Self {
            data,
            format,
            model: None,
            elapsed: None,
        }
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
