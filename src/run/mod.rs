//! Extraction run: submit button, status banner and the downloaded score.

use std::path::PathBuf;

use thiserror::Error;

use crate::backend::{BackendError, ExecuteOutcome, SheetBackend};
use crate::form::{FormError, FormState};
use crate::storage::{Artifact, ArtifactKind, ArtifactStore, StorageError};

pub const RUN_LABEL: &str = "Run";
pub const RUN_BUSY_LABEL: &str = "Processing...";

const PROCESSING_MESSAGE: &str = "Analyzing the video and extracting the score.";
const ABORTED_MESSAGE: &str = "The extraction stopped before the server replied. Please try again.";

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Invalid(#[from] FormError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("could not store the score: {0}")]
    Storage(#[from] StorageError),
    #[error("an extraction is already running")]
    AlreadyRunning,
    #[error("no score has been downloaded yet")]
    NothingToDownload,
}

pub type RunResult<T> = std::result::Result<T, RunError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Processing,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBanner {
    pub kind: StatusKind,
    pub message: String,
}

impl StatusBanner {
    fn new(kind: StatusKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunControl {
    busy: bool,
}

impl RunControl {
    pub fn enabled(&self) -> bool {
        !self.busy
    }

    pub fn label(&self) -> &'static str {
        if self.busy {
            RUN_BUSY_LABEL
        } else {
            RUN_LABEL
        }
    }
}

/// Re-enables the run control when a run ends, whichever way it ends.
struct ControlRestore<'a>(&'a mut RunControl);

impl Drop for ControlRestore<'_> {
    fn drop(&mut self) {
        self.0.busy = false;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Saved(PathBuf),
    Inspection {
        session_id: String,
        inspect_url: String,
    },
}

/// Proof that [`RunFlow::begin`] accepted the form; consumed by `complete`.
#[must_use]
#[derive(Debug)]
pub struct RunTicket {
    inspection_mode: bool,
}

#[derive(Debug, Default)]
pub struct RunFlow {
    control: RunControl,
    status: Option<StatusBanner>,
    artifact: Option<Artifact>,
}

impl RunFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn control(&self) -> RunControl {
        self.control
    }

    pub fn status(&self) -> Option<&StatusBanner> {
        self.status.as_ref()
    }

    pub fn download_enabled(&self) -> bool {
        self.artifact.is_some()
    }

    /// Validates the form and switches the control to its busy state.
    ///
    /// Nothing is sent when validation fails. The previous score is released
    /// before the new run starts.
    pub fn begin<S: ArtifactStore + ?Sized>(
        &mut self,
        form: &FormState,
        store: &S,
    ) -> RunResult<RunTicket> {
        if self.control.busy {
            return Err(RunError::AlreadyRunning);
        }
        if let Err(err) = form.validate() {
            tracing::info!(field = err.field().key(), %err, "run rejected by validation");
            self.status = Some(StatusBanner::new(StatusKind::Error, err.to_string()));
            return Err(err.into());
        }

        if let Some(previous) = self.artifact.take() {
            if let Err(err) = store.discard(&previous) {
                tracing::warn!(?err, path = %previous.temp_path.display(), "failed to release previous score");
            }
        }

        self.control.busy = true;
        self.status = Some(StatusBanner::new(StatusKind::Processing, PROCESSING_MESSAGE));
        Ok(RunTicket {
            inspection_mode: form.inspection_mode,
        })
    }

    /// Applies the `/execute` result; the control is idle again afterwards.
    pub fn complete<S: ArtifactStore + ?Sized>(
        &mut self,
        ticket: RunTicket,
        result: Result<ExecuteOutcome, BackendError>,
        store: &S,
    ) -> RunResult<RunOutcome> {
        let Self {
            control,
            status,
            artifact,
        } = self;
        let _restore = ControlRestore(control);

        let outcome = result.map_err(RunError::from).and_then(|outcome| match outcome {
            ExecuteOutcome::Pdf(bytes) => {
                let staged = store.stage(ArtifactKind::ScorePdf, &bytes)?;
                let saved = store.save(&staged);
                *artifact = Some(staged);
                Ok(RunOutcome::Saved(saved?))
            }
            ExecuteOutcome::Inspection {
                session_id,
                inspect_url,
            } => Ok(RunOutcome::Inspection {
                session_id,
                inspect_url,
            }),
        });

        *status = Some(match &outcome {
            Ok(RunOutcome::Saved(path)) => StatusBanner::new(
                StatusKind::Success,
                format!(
                    "PDF created and saved to {}. Use the download button to save it again.",
                    path.display()
                ),
            ),
            Ok(RunOutcome::Inspection { .. }) => StatusBanner::new(
                StatusKind::Success,
                "Frames captured. Review them on the inspection page to build the final PDF.",
            ),
            Err(err) => StatusBanner::new(StatusKind::Error, failure_message(err)),
        });

        match &outcome {
            Ok(outcome) => {
                tracing::info!(?outcome, inspection = ticket.inspection_mode, "run finished")
            }
            Err(err) => tracing::warn!(%err, "run failed"),
        }
        outcome
    }

    /// Ends a run whose `/execute` result never arrived.
    pub fn abort(&mut self, ticket: RunTicket) {
        let _restore = ControlRestore(&mut self.control);
        self.status = Some(StatusBanner::new(StatusKind::Error, ABORTED_MESSAGE));
        tracing::warn!(inspection = ticket.inspection_mode, "run aborted without a result");
    }

    /// Runs `/execute` on the calling thread.
    pub fn submit<B, S>(&mut self, form: &FormState, backend: &B, store: &S) -> RunResult<RunOutcome>
    where
        B: SheetBackend + ?Sized,
        S: ArtifactStore + ?Sized,
    {
        let ticket = self.begin(form, store)?;
        let result = backend.execute(form);
        self.complete(ticket, result, store)
    }

    /// Saves the last score again (manual download button).
    pub fn download_again<S: ArtifactStore + ?Sized>(&self, store: &S) -> RunResult<PathBuf> {
        let artifact = self.artifact.as_ref().ok_or(RunError::NothingToDownload)?;
        Ok(store.save(artifact)?)
    }

    /// Drops the staged score, e.g. when the window closes.
    pub fn release<S: ArtifactStore + ?Sized>(&mut self, store: &S) {
        if let Some(artifact) = self.artifact.take() {
            if let Err(err) = store.discard(&artifact) {
                tracing::warn!(?err, "failed to release score");
            }
        }
    }
}

fn failure_message(err: &RunError) -> String {
    match err {
        RunError::Backend(BackendError::Transport(err)) => {
            format!("Server connection failed: {err}")
        }
        RunError::Backend(err) => format!("Failed: {err}"),
        other => other.to_string(),
    }
}
