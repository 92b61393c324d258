//! Session state container for one upload-to-generation flow.
//!
//! [`Session`] owns all mutable UI state. Readers take immutable
//! [`SessionState`] snapshots; writers go through the methods here.
//! Every [`Session::generate`] call captures a monotonic token and only the
//! outcome carrying the latest token is applied.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::error::BlueprintError;
use crate::intake::{self, DragEvent, DropZone, IntakePolicy, InputSource, RawInput, UploadedAsset};
use crate::ports::generation::{GenerateRequest, GeneratedImage, GenerationBackend};
use crate::preview::PreviewStore;
use crate::settings::{GenerationSettings, SettingsPatch};

/// Snapshot of everything a view needs to render.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Currently selected blueprint.
    pub asset: Option<UploadedAsset>,
    /// Preview URL of the selected blueprint.
    pub preview_url: Option<String>,
    /// Generation parameters.
    pub settings: GenerationSettings,
    /// True while the latest generate call is outstanding.
    pub is_generating: bool,
    /// Result of the latest successful generation.
    pub result: Option<GeneratedImage>,
    /// Message of the latest failed generation.
    pub error: Option<String>,
    /// Whether a drag is hovering over the upload area.
    pub drag_active: bool,
}

#[derive(Debug, Default)]
struct Inner {
    state: SessionState,
    drop_zone: DropZone,
    previews: PreviewStore,
}

/// Owner of one session's state.
#[derive(Debug)]
pub struct Session {
    inner: Mutex<Inner>,
    latest_token: AtomicU64,
    policy: IntakePolicy,
}

impl Session {
    /// Create an empty session using `policy` for every upload route.
    #[must_use]
    pub fn new(policy: IntakePolicy) -> Self {
        Self { inner: Mutex::new(Inner::default()), latest_token: AtomicU64::new(0), policy }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Poisoning is ignored: every write is a single field store.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.lock().state.clone()
    }

    /// Validate and select a blueprint.
    ///
    /// On rejection nothing changes. On acceptance the previous preview is
    /// revoked, any previous result or error is cleared and a generate call
    /// still in flight for the old blueprint becomes stale.
    ///
    /// # Errors
    ///
    /// Returns the intake rejection.
    pub fn select(&self, input: RawInput) -> Result<(), BlueprintError> {
        let preview_bytes = input.bytes.clone();
        let source = input.source;
        let asset = intake::submit(input, &self.policy)?;

        let mut inner = self.lock();
        if source == InputSource::Drop {
            inner.drop_zone.handle(DragEvent::Drop);
            inner.state.drag_active = false;
        }
        if let Some(old) = inner.state.preview_url.take() {
            inner.previews.revoke(&old);
        }
        let url = inner.previews.create(preview_bytes);
        tracing::debug!(
            name = %asset.name,
            mime = %asset.mime_type,
            bytes = asset.byte_size,
            "blueprint selected"
        );

        inner.state.preview_url = Some(url);
        inner.state.asset = Some(asset);
        inner.state.result = None;
        inner.state.error = None;
        // Stale guards never clear the flag, so reset it here.
        self.latest_token.fetch_add(1, Ordering::SeqCst);
        inner.state.is_generating = false;
        Ok(())
    }

    /// Feed a drag event to the upload area.
    pub fn drag(&self, event: DragEvent) {
        let mut inner = self.lock();
        inner.drop_zone.handle(event);
        inner.state.drag_active = inner.drop_zone.is_active();
    }

    /// Shallow-merge new generation settings.
    pub fn patch_settings(&self, patch: SettingsPatch) {
        self.lock().state.settings.patch(patch);
    }

    /// Number of preview URLs still held.
    #[must_use]
    pub fn live_previews(&self) -> usize {
        self.lock().previews.live_count()
    }

    /// Generate a visualization for the selected blueprint.
    ///
    /// Without a selection this fails with [`BlueprintError::NoImage`] and
    /// touches neither state nor network. Otherwise the previous result and
    /// error are cleared and `is_generating` stays set until this call
    /// resolves or is dropped. If another call started or a new blueprint was
    /// selected in the meantime, the outcome is discarded and
    /// [`BlueprintError::Superseded`] returned.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's failure, `NoImage` or `Superseded`.
    pub async fn generate(
        &self,
        backend: &dyn GenerationBackend,
    ) -> Result<GeneratedImage, BlueprintError> {
        let (token, request) = {
            let mut inner = self.lock();
            let asset = inner.state.asset.as_ref().ok_or(BlueprintError::NoImage)?;
            let request = GenerateRequest::new(asset, &inner.state.settings);
            let token = self.latest_token.fetch_add(1, Ordering::SeqCst) + 1;
            inner.state.is_generating = true;
            inner.state.result = None;
            inner.state.error = None;
            (token, request)
        };

        let guard = InFlight { session: self, token };
        let outcome = backend.generate(&request).await;
        guard.settle(outcome)
    }

    fn is_latest(&self, token: u64) -> bool {
        self.latest_token.load(Ordering::SeqCst) == token
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.previews.clear();
        inner.state.preview_url = None;
    }
}

/// Clears `is_generating` for its token on every exit path.
struct InFlight<'a> {
    session: &'a Session,
    token: u64,
}

impl InFlight<'_> {
    fn settle(
        self,
        outcome: Result<GeneratedImage, BlueprintError>,
    ) -> Result<GeneratedImage, BlueprintError> {
        let applied = {
            let mut inner = self.session.lock();
            let latest = self.session.is_latest(self.token);
            if latest {
                match &outcome {
                    Ok(image) => inner.state.result = Some(image.clone()),
                    Err(e) => inner.state.error = Some(e.to_string()),
                }
            }
            latest
        };

        if applied {
            outcome
        } else {
            tracing::debug!(token = self.token, "discarding stale generation outcome");
            Err(BlueprintError::Superseded)
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut inner = self.session.lock();
        if self.session.is_latest(self.token) {
            inner.state.is_generating = false;
        }
    }
}
