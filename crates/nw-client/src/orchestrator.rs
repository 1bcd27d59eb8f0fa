//! Generation orchestrator.
//!
//! Drives one "turn this recording into a document" attempt:
//!
//! ```text
//! Idle -> CheckingQuota -> AcquiringUploadCapability -> Uploading -> Polling
//!      -> Succeeded | Failed(reason)
//! ```
//!
//! Every attempt captures a generation number. `reset()` bumps it; each await
//! point races the stage against that change and each state write re-checks
//! it, so a retired attempt can neither block nor overwrite the fresh state.

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use nw_models::{file_stem, mime_for_file_name};

use crate::api::{GenerationBackend, QuotaStatus};
use crate::config::PollPolicy;
use crate::error::{ClientError, ClientResult};
use crate::notify::{Notification, Notifier};

/// Document shown before anything has been generated.
pub const PLACEHOLDER_DOCUMENT: &str = "# Your generated documentation";

const UPLOAD_SUCCEEDED: &str = "Video uploaded successfully! Video is being processed...";
const GENERATION_SUCCEEDED: &str = "Documentation generated successfully!";
const RESET_MESSAGE: &str = "You can upload a new video to generate documentation.";
const EMPTY_DOCUMENT: &str = "The document is empty. Nothing to copy.";

/// Where an attempt currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationState {
    Idle,
    CheckingQuota,
    AcquiringUploadCapability,
    Uploading,
    /// `attempt` is 0 until the first poll fires.
    Polling { attempt: u32 },
    Succeeded,
    Failed(GenerationFailure),
}

impl GenerationState {
    /// Whether an attempt is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            GenerationState::CheckingQuota
                | GenerationState::AcquiringUploadCapability
                | GenerationState::Uploading
                | GenerationState::Polling { .. }
        )
    }
}

/// Terminal failure of an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationFailure {
    NoFileSelected,
    QuotaExceeded,
    QuotaCheckError,
    CapabilityError,
    UploadError { forbidden: bool, status: Option<u16> },
    Timeout,
}

impl fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationFailure::NoFileSelected => f.write_str("no file selected"),
            GenerationFailure::QuotaExceeded => f.write_str("quota exceeded"),
            GenerationFailure::QuotaCheckError => f.write_str("quota check failed"),
            GenerationFailure::CapabilityError => f.write_str("upload capability unavailable"),
            GenerationFailure::UploadError { status: Some(s), .. } => {
                write!(f, "upload rejected with status {}", s)
            }
            GenerationFailure::UploadError { status: None, .. } => f.write_str("upload failed"),
            GenerationFailure::Timeout => f.write_str("document not ready in time"),
        }
    }
}

/// Result of one poll tick. Neither variant ends polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Ready(String),
    NotReadyYet,
    FetchFailedTransient,
}

/// The recording chosen for the next attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    /// Build a selection, deriving the MIME type from the name when absent.
    pub fn new(name: impl Into<String>, mime_type: Option<&str>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = mime_type
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| mime_for_file_name(&name).to_string());
        Self {
            name,
            mime_type,
            bytes,
        }
    }
}

/// Why `run` stopped early.
enum Stop {
    Retired,
    Failed(GenerationFailure, String),
}

impl Stop {
    fn failed(failure: GenerationFailure, message: impl Into<String>) -> Self {
        Stop::Failed(failure, message.into())
    }
}

struct Inner {
    state: GenerationState,
    file: Option<SelectedFile>,
    document: String,
}

/// Orchestrates quota check, upload and polling for a generated document.
pub struct DocumentGenerator {
    backend: Arc<dyn GenerationBackend>,
    notifier: Arc<dyn Notifier>,
    poll: PollPolicy,
    inner: Mutex<Inner>,
    generation: watch::Sender<u64>,
}

impl DocumentGenerator {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        notifier: Arc<dyn Notifier>,
        poll: PollPolicy,
    ) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            backend,
            notifier,
            poll,
            inner: Mutex::new(Inner {
                state: GenerationState::Idle,
                file: None,
                document: PLACEHOLDER_DOCUMENT.to_string(),
            }),
            generation,
        }
    }

    pub async fn state(&self) -> GenerationState {
        self.inner.lock().await.state.clone()
    }

    /// Retained document text.
    pub async fn document(&self) -> String {
        self.inner.lock().await.document.clone()
    }

    /// Replace the retained document (user edits).
    pub async fn set_document(&self, text: impl Into<String>) {
        self.inner.lock().await.document = text.into();
    }

    /// Document text for copying, or `None` with an error notification when empty.
    pub async fn copy_document(&self) -> Option<String> {
        let inner = self.inner.lock().await;
        if inner.document.trim().is_empty() {
            self.notifier.notify(Notification::error(EMPTY_DOCUMENT));
            return None;
        }
        Some(inner.document.clone())
    }

    /// Select a recording from disk.
    pub async fn select_file(&self, path: impl AsRef<Path>) -> ClientResult<()> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClientError::Config(format!("{} has no file name", path.display())))?
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        info!(file = %name, bytes = bytes.len(), "Selected recording");
        self.select(SelectedFile::new(name, None, bytes)).await;
        Ok(())
    }

    /// Select an in-memory recording.
    pub async fn select_bytes(&self, name: &str, mime_type: Option<&str>, bytes: Vec<u8>) {
        self.select(SelectedFile::new(name, mime_type, bytes)).await;
    }

    async fn select(&self, file: SelectedFile) {
        let mut inner = self.inner.lock().await;
        if matches!(
            inner.state,
            GenerationState::Succeeded | GenerationState::Failed(_)
        ) {
            inner.state = GenerationState::Idle;
        }
        inner.file = Some(file);
    }

    /// Return to `Idle`, dropping the selection, the document and any
    /// in-flight attempt.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        self.generation.send_modify(|g| *g += 1);
        inner.state = GenerationState::Idle;
        inner.file = None;
        inner.document = PLACEHOLDER_DOCUMENT.to_string();
        info!(generation = *self.generation.borrow(), "Generator reset");
        self.notifier.notify(Notification::info(RESET_MESSAGE));
    }

    /// Run one attempt with the selected file and return the final state.
    ///
    /// Returns immediately with the current state if an attempt is already
    /// in flight. After a `reset()` mid-attempt the returned state is the
    /// post-reset one.
    pub async fn generate(&self) -> GenerationState {
        let (generation, file) = {
            let mut inner = self.inner.lock().await;
            if inner.state.is_busy() {
                warn!(state = ?inner.state, "Generation already in progress");
                return inner.state.clone();
            }
            let Some(file) = inner.file.clone() else {
                let failure = GenerationFailure::NoFileSelected;
                warn!(failure = %failure, "Generation rejected");
                self.notifier
                    .notify(Notification::error("Please select a video file to upload."));
                inner.state = GenerationState::Failed(failure);
                return inner.state.clone();
            };
            inner.state = GenerationState::CheckingQuota;
            (*self.generation.borrow(), file)
        };

        let mut retired = self.generation.subscribe();
        let outcome = self.run(generation, &mut retired, file).await;

        let mut inner = self.inner.lock().await;
        if *self.generation.borrow() != generation {
            debug!(generation, "Discarding result of retired attempt");
            return inner.state.clone();
        }
        match outcome {
            Ok(document) => {
                info!(bytes = document.len(), "Document generated");
                inner.document = document;
                inner.state = GenerationState::Succeeded;
                self.notifier.notify(Notification::success(GENERATION_SUCCEEDED));
            }
            Err(Stop::Failed(failure, message)) => {
                error!(failure = %failure, "Generation failed");
                self.notifier.notify(Notification::error(message));
                inner.state = GenerationState::Failed(failure);
            }
            Err(Stop::Retired) => {}
        }
        inner.state.clone()
    }

    async fn run(
        &self,
        generation: u64,
        retired: &mut watch::Receiver<u64>,
        file: SelectedFile,
    ) -> Result<String, Stop> {
        match until_retired(retired, generation, self.backend.check_quota()).await? {
            Ok(QuotaStatus::Granted { count }) => info!(count = ?count, "Usage granted"),
            Ok(QuotaStatus::Exceeded) => {
                return Err(Stop::failed(
                    GenerationFailure::QuotaExceeded,
                    "You have used the free limit. Please sign up!",
                ))
            }
            Err(e) => {
                warn!(error = %e, "Usage check failed");
                let message = if e.is_transport() {
                    "Error checking usage. Please try again."
                } else {
                    "Error checking usage limit."
                };
                return Err(Stop::failed(GenerationFailure::QuotaCheckError, message));
            }
        }

        self.advance(generation, GenerationState::AcquiringUploadCapability, None)
            .await?;
        let capability = match until_retired(
            retired,
            generation,
            self.backend.acquire_upload(&file.name, &file.mime_type),
        )
        .await?
        {
            Ok(capability) => capability,
            Err(e) => {
                warn!(error = %e, "Failed to get upload URL");
                let message = match e {
                    ClientError::Status { message, .. } if !message.trim().is_empty() => message,
                    ClientError::Status { .. } => "Failed to get upload URL.".to_string(),
                    ClientError::InvalidResponse(_) => "Invalid response from server.".to_string(),
                    _ => "An error occurred while getting the upload URL.".to_string(),
                };
                return Err(Stop::failed(GenerationFailure::CapabilityError, message));
            }
        };

        self.advance(generation, GenerationState::Uploading, None).await?;
        let upload = self
            .backend
            .upload(&capability.upload_url, &file.mime_type, file.bytes);
        if let Err(e) = until_retired(retired, generation, upload).await? {
            warn!(error = %e, key = %capability.key, "Upload failed");
            let failure = GenerationFailure::UploadError {
                forbidden: e.is_forbidden(),
                status: e.status_code(),
            };
            let message = match e.status_code() {
                Some(403) => "Upload failed: Forbidden. Check your permissions.".to_string(),
                Some(status) => format!("Upload failed with status {}", status),
                None => "An error occurred during the file upload.".to_string(),
            };
            return Err(Stop::failed(failure, message));
        }
        info!(key = %capability.key, "Recording uploaded");

        self.advance(
            generation,
            GenerationState::Polling { attempt: 0 },
            Some(Notification::success(UPLOAD_SUCCEEDED)),
        )
        .await?;

        let stem = file_stem(&capability.key);
        self.poll_document(generation, retired, stem).await
    }

    /// Poll once per interval until the document is fetched or the attempt
    /// ceiling is reached. Ticks never overlap: each one awaits its requests
    /// before the next is scheduled.
    async fn poll_document(
        &self,
        generation: u64,
        retired: &mut watch::Receiver<u64>,
        stem: &str,
    ) -> Result<String, Stop> {
        let period = self.poll.period();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        for attempt in 1..=self.poll.max_attempts {
            until_retired(retired, generation, ticker.tick()).await?;
            self.advance(generation, GenerationState::Polling { attempt }, None)
                .await?;

            match until_retired(retired, generation, self.poll_once(stem)).await? {
                PollOutcome::Ready(document) => return Ok(document),
                PollOutcome::NotReadyYet => debug!(stem, attempt, "Document not ready yet"),
                PollOutcome::FetchFailedTransient => debug!(stem, attempt, "Retrying fetch"),
            }
        }

        warn!(stem, attempts = self.poll.max_attempts, "Polling ceiling reached");
        Err(Stop::failed(
            GenerationFailure::Timeout,
            "Documentation took too long. Please try again later.",
        ))
    }

    async fn poll_once(&self, stem: &str) -> PollOutcome {
        let url = match self.backend.acquire_read(stem).await {
            Ok(Some(url)) => url,
            Ok(None) => return PollOutcome::NotReadyYet,
            Err(e) => {
                debug!(error = %e, "Read capability request failed");
                return PollOutcome::NotReadyYet;
            }
        };

        match self.backend.fetch_document(&url).await {
            Ok(document) => PollOutcome::Ready(document),
            Err(e) => {
                warn!(error = %e, "Failed to fetch generated document");
                PollOutcome::FetchFailedTransient
            }
        }
    }

    /// Move to `state` unless the attempt has been retired.
    async fn advance(
        &self,
        generation: u64,
        state: GenerationState,
        notification: Option<Notification>,
    ) -> Result<(), Stop> {
        let mut inner = self.inner.lock().await;
        if *self.generation.borrow() != generation {
            return Err(Stop::Retired);
        }
        debug!(state = ?state, "Generation state changed");
        inner.state = state;
        if let Some(notification) = notification {
            self.notifier.notify(notification);
        }
        Ok(())
    }
}

/// Await `fut` unless the generation moves on first.
async fn until_retired<F: Future>(
    retired: &mut watch::Receiver<u64>,
    generation: u64,
    fut: F,
) -> Result<F::Output, Stop> {
    tokio::select! {
        biased;
        _ = retired.wait_for(|current| *current != generation) => Err(Stop::Retired),
        output = fut => Ok(output),
    }
}
