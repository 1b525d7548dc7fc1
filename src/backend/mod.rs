//! The remote extraction service, seen as a source of result shapes.

pub mod http;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::media::MediaAsset;
use crate::region::Region;
use crate::trim::TrimRange;

pub use http::HttpBackend;

pub const DEFAULT_PIXEL_SIZE: u32 = 2;
pub const DEFAULT_THRESHOLD: u8 = 127;
pub const DEFAULT_BLUR_RADIUS: u8 = 0;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("could not read {path}: {source}")]
    Upload {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl BackendError {
    /// The message shown to the user when `operation` (e.g. "upload file") fails.
    pub fn user_message(&self, operation: &str) -> String {
        match self {
            BackendError::Server { message, .. } => format!("Failed to {operation}: {message}"),
            BackendError::Upload { .. } => format!("Failed to {operation}: {self}"),
            BackendError::Transport(_) | BackendError::Malformed(_) => format!(
                "Failed to {operation}. Please check your connection and try again."
            ),
        }
    }
}

/// Body of a successful `extract` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub colors: Vec<Vec<i64>>,
    #[serde(default)]
    pub is_video: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub regions: Vec<Region>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub reserve_colors: Vec<Vec<i64>>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub reserve_regions: Vec<Region>,
}

impl ExtractionResult {
    /// Regions are only meaningful for still images.
    pub fn effective_regions(&self) -> (&[Region], &[Region]) {
        if self.is_video {
            (&[], &[])
        } else {
            (&self.regions, &self.reserve_regions)
        }
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractRequest {
    pub num_colors: usize,
    /// Segment to analyze; only sent for videos.
    pub trim: Option<TrimRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PosterizeParams {
    pub pixel_size: u32,
    pub num_colors: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineArtParams {
    pub threshold: u8,
    pub blur_radius: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendParams {
    pub posterize: PosterizeParams,
    pub line_art: LineArtParams,
}

/// One method per backend call. Implementations must be shareable with a
/// worker thread.
pub trait ColorBackend: Send + Sync {
    fn extract(
        &self,
        asset: &MediaAsset,
        request: &ExtractRequest,
    ) -> Result<ExtractionResult, BackendError>;

    /// Posterized PNG bytes.
    fn posterize(&self, asset: &MediaAsset, params: &PosterizeParams)
        -> Result<Vec<u8>, BackendError>;

    /// Posterized SVG text.
    fn posterize_svg(
        &self,
        asset: &MediaAsset,
        params: &PosterizeParams,
    ) -> Result<String, BackendError>;

    /// Line-art PNG bytes.
    fn line_art(&self, asset: &MediaAsset, params: &LineArtParams) -> Result<Vec<u8>, BackendError>;

    /// Line-art SVG text.
    fn line_art_svg(&self, asset: &MediaAsset, params: &LineArtParams)
        -> Result<String, BackendError>;

    /// Posterize and line art blended into one PNG.
    fn blend_art(&self, asset: &MediaAsset, params: &BlendParams) -> Result<Vec<u8>, BackendError>;
}
