//! Upload intake: validation of user-selected blueprint files.
//!
//! Both input routes (file picker and drag-and-drop) funnel into [`submit`],
//! which applies one policy and produces a data-URL asset ready for JSON
//! transport.

use std::path::Path;

use base64::Engine;

use crate::error::BlueprintError;

/// Default upload cap: 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const PDF_MIME: &str = "application/pdf";
const FALLBACK_MIME: &str = "application/octet-stream";

/// Where a file came from. Has no effect on validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    /// Click-to-browse file picker.
    Picker,
    /// Drag-and-drop onto the upload area.
    Drop,
}

/// A file as handed over by the user, before validation.
#[derive(Debug, Clone)]
pub struct RawInput {
    /// File name, used for extension-based type detection and display.
    pub name: String,
    /// MIME type reported by the caller, if any.
    pub mime_type: Option<String>,
    /// File contents.
    pub bytes: Vec<u8>,
    /// Input route.
    pub source: InputSource,
}

impl RawInput {
    /// Read a file from disk as a picker selection.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn from_path(path: &Path) -> Result<Self, BlueprintError> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self { name, mime_type: None, bytes, source: InputSource::Picker })
    }
}

/// Accepted types and size cap, shared by every input route.
#[derive(Debug, Clone, Copy)]
pub struct IntakePolicy {
    /// Maximum accepted size in bytes.
    pub max_bytes: usize,
    /// Whether `application/pdf` is accepted next to `image/*`.
    pub allow_pdf: bool,
}

impl Default for IntakePolicy {
    fn default() -> Self {
        Self { max_bytes: DEFAULT_MAX_UPLOAD_BYTES, allow_pdf: true }
    }
}

impl IntakePolicy {
    fn accepts(&self, mime_type: &str) -> bool {
        mime_type.starts_with("image/") || (self.allow_pdf && mime_type == PDF_MIME)
    }
}

/// A validated blueprint, encoded for transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    /// Original file name.
    pub name: String,
    /// Resolved MIME type.
    pub mime_type: String,
    /// Size of the original bytes.
    pub byte_size: usize,
    /// `data:<mime>;base64,<payload>` representation.
    pub data_url: String,
}

/// Validate `input` against `policy` and encode it as a data URL.
///
/// # Errors
///
/// Returns [`BlueprintError::UnsupportedType`], [`BlueprintError::TooLarge`]
/// or [`BlueprintError::EmptyFile`] when the file is rejected.
pub fn submit(input: RawInput, policy: &IntakePolicy) -> Result<UploadedAsset, BlueprintError> {
    let mime_type =
        input.mime_type.clone().unwrap_or_else(|| detect_mime(&input.name, &input.bytes));

    if !policy.accepts(&mime_type) {
        return Err(BlueprintError::UnsupportedType { mime_type });
    }
    if input.bytes.is_empty() {
        return Err(BlueprintError::EmptyFile(input.name));
    }
    if input.bytes.len() > policy.max_bytes {
        return Err(BlueprintError::TooLarge { size: input.bytes.len(), limit: policy.max_bytes });
    }

    let data_url = to_data_url(&mime_type, &input.bytes);
    Ok(UploadedAsset { name: input.name, mime_type, byte_size: input.bytes.len(), data_url })
}

/// Encode bytes as a base64 data URL.
#[must_use]
pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{mime_type};base64,{encoded}")
}

/// Resolve a MIME type from the file extension, falling back to content sniffing.
#[must_use]
pub fn detect_mime(name: &str, bytes: &[u8]) -> String {
    let ext = Path::new(name).extension().map(|e| e.to_string_lossy().to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => return PDF_MIME.to_string(),
        Some("svg") => return "image/svg+xml".to_string(),
        _ => {}
    }
    if let Some(format) = ext.as_deref().and_then(image::ImageFormat::from_extension) {
        return format.to_mime_type().to_string();
    }

    if bytes.starts_with(b"%PDF-") {
        PDF_MIME.to_string()
    } else if let Ok(format) = image::guess_format(bytes) {
        format.to_mime_type().to_string()
    } else {
        FALLBACK_MIME.to_string()
    }
}

/// Drag-and-drop events on the upload area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragEvent {
    /// Pointer entered the area while dragging.
    Enter,
    /// Pointer moved over the area while dragging.
    Over,
    /// Pointer left the area.
    Leave,
    /// Files were dropped.
    Drop,
}

/// Purely visual highlight state of the upload area.
#[derive(Debug, Clone, Copy, Default)]
pub struct DropZone {
    drag_active: bool,
}

impl DropZone {
    /// Apply a drag event.
    pub fn handle(&mut self, event: DragEvent) {
        self.drag_active = matches!(event, DragEvent::Enter | DragEvent::Over);
    }

    /// Whether the area should be highlighted.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.drag_active
    }
}
