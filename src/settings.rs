//! Generation parameters and their partial-update semantics.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Camera angle for the rendered visualization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ViewAngle {
    /// Three-quarter perspective view.
    #[default]
    Perspective,
    /// Plan view from above.
    Top,
    /// Front elevation.
    Front,
    /// Side elevation.
    Side,
}

/// Artistic style for the rendered visualization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    /// Photo-realistic rendering.
    #[default]
    Realistic,
    /// Technical line drawing.
    Technical,
    /// Simplified cartoon look.
    Cartoon,
}

impl ViewAngle {
    /// Wire name used in request bodies.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Perspective => "perspective",
            Self::Top => "top",
            Self::Front => "front",
            Self::Side => "side",
        }
    }
}

impl Style {
    /// Wire name used in request bodies.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Realistic => "realistic",
            Self::Technical => "technical",
            Self::Cartoon => "cartoon",
        }
    }
}

impl fmt::Display for ViewAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The mutable generation parameters of one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationSettings {
    /// Camera angle.
    pub view_angle: ViewAngle,
    /// Rendering style.
    pub style: Style,
    /// Free-text description of the blueprint, may be empty.
    pub description: String,
}

/// A partial update to [`GenerationSettings`]. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    /// New camera angle.
    pub view_angle: Option<ViewAngle>,
    /// New rendering style.
    pub style: Option<Style>,
    /// New description.
    pub description: Option<String>,
}

impl GenerationSettings {
    /// Shallow-merge `patch` into these settings.
    ///
    /// No validation happens here; the enum fields are already constrained
    /// by their types.
    pub fn patch(&mut self, patch: SettingsPatch) {
        if let Some(view_angle) = patch.view_angle {
            self.view_angle = view_angle;
        }
        if let Some(style) = patch.style {
            self.style = style;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
    }
}
