//! Generation port: the boundary between the session and the 3D backend.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::BlueprintError;
use crate::intake::UploadedAsset;
use crate::settings::{GenerationSettings, Style, ViewAngle};

/// Request envelope sent to the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Blueprint as a base64 data URL.
    pub image: String,
    /// Free-text description, may be empty.
    pub description: String,
    /// Camera angle.
    pub view_angle: ViewAngle,
    /// Rendering style.
    pub style: Style,
}

impl GenerateRequest {
    /// Assemble a request from a validated asset and the current settings.
    #[must_use]
    pub fn new(asset: &UploadedAsset, settings: &GenerationSettings) -> Self {
        Self {
            image: asset.data_url.clone(),
            description: settings.description.clone(),
            view_angle: settings.view_angle,
            style: settings.style,
        }
    }
}

/// Response envelope returned by the backend.
///
/// `success == true` without `image_url` is a failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    /// Whether the backend considers the call successful.
    #[serde(default)]
    pub success: bool,
    /// Location of the produced image, absolute or origin-relative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Backend processing time in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
    /// Human-readable failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A successfully generated visualization.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    /// Absolute URL of the image.
    pub url: String,
    /// Backend processing time in seconds.
    pub processing_time: f64,
}

/// Boxed future type returned by [`GenerationBackend::generate`].
pub type GenerateFuture<'a> =
    Pin<Box<dyn Future<Output = Result<GeneratedImage, BlueprintError>> + Send + 'a>>;

/// Turns a blueprint plus settings into a rendered visualization.
pub trait GenerationBackend: Send + Sync {
    /// Issue one generation request.
    fn generate(&self, request: &GenerateRequest) -> GenerateFuture<'_>;
}
