//! Result presentation and client-side download of generated images.

use std::fmt;
use std::path::{Path, PathBuf};

use reqwest::{Client, Url};

use crate::error::BlueprintError;
use crate::ports::generation::GeneratedImage;
use crate::session::SessionState;

/// What the preview canvas shows.
#[derive(Debug, Clone, PartialEq)]
pub enum Canvas {
    /// A request is outstanding.
    Generating,
    /// The produced image.
    Image(GeneratedImage),
    /// Nothing generated yet.
    Empty,
}

/// Rendered view of the result area.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    /// Canvas content.
    pub canvas: Canvas,
    /// Error banner text.
    pub banner: Option<String>,
    /// Whether the download action is offered.
    pub download_enabled: bool,
}

/// Decide what to show. A pending request wins over any stale image.
#[must_use]
pub fn render(result: Option<&GeneratedImage>, is_generating: bool, error: Option<&str>) -> View {
    let canvas = match (is_generating, result) {
        (true, _) => Canvas::Generating,
        (false, Some(image)) => Canvas::Image(image.clone()),
        (false, None) => Canvas::Empty,
    };
    let download_enabled = matches!(canvas, Canvas::Image(_));
    View { canvas, banner: error.map(str::to_string), download_enabled }
}

impl From<&SessionState> for View {
    fn from(state: &SessionState) -> Self {
        render(state.result.as_ref(), state.is_generating, state.error.as_deref())
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref banner) = self.banner {
            writeln!(f, "Error: {banner}")?;
        }
        match &self.canvas {
            Canvas::Generating => {
                write!(f, "Generating 3D visualization, usually 10-15 seconds...")
            }
            Canvas::Image(image) => {
                write!(f, "Result: {} (generated in {:.1}s)", image.url, image.processing_time)
            }
            Canvas::Empty => write!(f, "No visualization generated yet"),
        }
    }
}

/// File name for a saved result, `blueprint3d-<unix millis>.png`.
#[must_use]
pub fn download_filename(timestamp_millis: i64) -> String {
    format!("blueprint3d-{timestamp_millis}.png")
}

/// Fetches generated images and saves them locally.
pub struct Downloader {
    client: Client,
    allowed_hosts: Vec<String>,
}

impl Downloader {
    /// Create a downloader restricted to `allowed_hosts`.
    #[must_use]
    pub fn new(allowed_hosts: Vec<String>) -> Self {
        Self { client: Client::new(), allowed_hosts }
    }

    /// Fetch the image bytes and write them into `dir`.
    ///
    /// # Errors
    ///
    /// Every failure is reported as [`BlueprintError::Download`].
    pub async fn download(
        &self,
        image: &GeneratedImage,
        dir: &Path,
    ) -> Result<PathBuf, BlueprintError> {
        let url = Url::parse(&image.url)
            .map_err(|e| BlueprintError::Download(format!("invalid URL '{}': {e}", image.url)))?;
        let host = url.host_str().unwrap_or_default();
        if !self.allowed_hosts.iter().any(|h| h.eq_ignore_ascii_case(host)) {
            return Err(BlueprintError::Download(format!(
                "host '{host}' is not an allowed image domain"
            )));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BlueprintError::Download(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(BlueprintError::Download(format!("server answered {status}")));
        }
        let bytes = response.bytes().await.map_err(|e| BlueprintError::Download(e.to_string()))?;

        let path = dir.join(download_filename(chrono::Utc::now().timestamp_millis()));
        std::fs::create_dir_all(dir).and_then(|()| std::fs::write(&path, &bytes)).map_err(|e| {
            BlueprintError::Download(format!("cannot write {}: {e}", path.display()))
        })?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "image saved");
        Ok(path)
    }
}
