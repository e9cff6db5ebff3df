//! Manual review of an inspection session.
//!
//! The backend renders the candidate frames of a session as a gallery. The
//! user keeps the pages that belong in the score and the kept filenames are
//! sent to `/finalize`, which answers with the assembled PDF.

use std::path::PathBuf;

use thiserror::Error;

use crate::backend::{BackendError, SheetBackend};
use crate::storage::{ArtifactKind, ArtifactStore, StorageError};

pub const FINALIZE_LABEL: &str = "Create PDF and download";
pub const FINALIZE_BUSY_LABEL: &str = "Generating...";

#[derive(Debug, Error)]
pub enum InspectError {
    #[error("session id could not be found")]
    MissingSession,
    #[error("select at least one image")]
    EmptySelection,
    #[error("a PDF is already being generated")]
    Busy,
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("could not store the score: {0}")]
    Storage(#[from] StorageError),
}

pub type InspectResult<T> = std::result::Result<T, InspectError>;

/// Session id from the page data attribute, else the last path segment.
///
/// A path ending in `/` has an empty last segment and yields `None`.
pub fn resolve_session_id(data_attr: Option<&str>, path: &str) -> Option<String> {
    if let Some(id) = data_attr.map(str::trim).filter(|id| !id.is_empty()) {
        return Some(id.to_string());
    }
    path.rsplit('/')
        .next()
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct GalleryItem {
    filename: String,
    selected: bool,
}

/// Gallery filenames in display order with their toggle state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    items: Vec<GalleryItem>,
}

impl SelectionSet {
    pub fn new<I, S>(filenames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut items: Vec<GalleryItem> = Vec::new();
        for filename in filenames {
            let filename = filename.into();
            if items.iter().any(|item| item.filename == filename) {
                continue;
            }
            items.push(GalleryItem {
                filename,
                selected: false,
            });
        }
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.filename.as_str())
    }

    /// Flips one item; returns the new state, or `None` for unknown names.
    pub fn toggle(&mut self, filename: &str) -> Option<bool> {
        let item = self.items.iter_mut().find(|item| item.filename == filename)?;
        item.selected = !item.selected;
        tracing::debug!(%filename, selected = item.selected, "toggled gallery item");
        Some(item.selected)
    }

    pub fn set_all(&mut self, selected: bool) {
        for item in &mut self.items {
            item.selected = selected;
        }
    }

    pub fn is_selected(&self, filename: &str) -> bool {
        self.items
            .iter()
            .any(|item| item.selected && item.filename == filename)
    }

    pub fn selected(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|item| item.selected)
            .map(|item| item.filename.clone())
            .collect()
    }
}

struct BusyRestore<'a>(&'a mut bool);

impl Drop for BusyRestore<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

#[derive(Debug)]
pub struct InspectFlow {
    session_id: String,
    selection: SelectionSet,
    busy: bool,
}

impl InspectFlow {
    pub fn new(session_id: Option<String>, selection: SelectionSet) -> InspectResult<Self> {
        let session_id = session_id
            .filter(|id| !id.is_empty())
            .ok_or(InspectError::MissingSession)?;
        tracing::info!(%session_id, images = selection.len(), "inspection session opened");
        Ok(Self {
            session_id,
            selection,
            busy: false,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionSet {
        &mut self.selection
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn button_label(&self) -> &'static str {
        if self.busy {
            FINALIZE_BUSY_LABEL
        } else {
            FINALIZE_LABEL
        }
    }

    /// Builds the final PDF from the selected images and saves it.
    pub fn finalize<B, S>(&mut self, backend: &B, store: &S) -> InspectResult<PathBuf>
    where
        B: SheetBackend + ?Sized,
        S: ArtifactStore + ?Sized,
    {
        if self.busy {
            return Err(InspectError::Busy);
        }
        let selected = self.selection.selected();
        if selected.is_empty() {
            return Err(InspectError::EmptySelection);
        }

        let Self {
            session_id, busy, ..
        } = self;
        *busy = true;
        let _restore = BusyRestore(busy);

        let bytes = backend.finalize(session_id, &selected)?;
        let artifact = store.stage(ArtifactKind::FinalPdf, &bytes)?;
        let saved = store.save(&artifact);
        if let Err(err) = store.discard(&artifact) {
            tracing::warn!(?err, "failed to remove staged final score");
        }
        let saved = saved?;
        tracing::info!(%session_id, pages = selected.len(), path = %saved.display(), "final score saved");
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendResult, ExecuteOutcome};
    use crate::form::FormState;
    use crate::storage::StorageService;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingBackend {
        finalized: RefCell<Vec<(String, Vec<String>)>>,
        fail_with: Option<String>,
    }

    impl SheetBackend for RecordingBackend {
        fn get_frame(&self, _url: &str, _start_time: &str) -> BackendResult<Vec<u8>> {
            unreachable!("not used by inspection")
        }

        fn execute(&self, _form: &FormState) -> BackendResult<ExecuteOutcome> {
            unreachable!("not used by inspection")
        }

        fn finalize(&self, session_id: &str, images: &[String]) -> BackendResult<Vec<u8>> {
            self.finalized
                .borrow_mut()
                .push((session_id.to_string(), images.to_vec()));
            match &self.fail_with {
                Some(message) => Err(BackendError::Server {
                    status: 500,
                    message: message.clone(),
                }),
                None => Ok(b"%PDF-final".to_vec()),
            }
        }

        fn fetch_thumbnail(&self, _url: &str) -> BackendResult<Vec<u8>> {
            unreachable!("not used by inspection")
        }

        fn inspect_url(&self, session_id: &str) -> String {
            format!("http://host/inspect/{session_id}")
        }
    }

    #[test]
    fn session_id_prefers_data_attribute() {
        assert_eq!(
            resolve_session_id(Some("abc"), "/inspect/xyz").as_deref(),
            Some("abc")
        );
        assert_eq!(
            resolve_session_id(Some(""), "/inspect/550e8400").as_deref(),
            Some("550e8400")
        );
        assert_eq!(
            resolve_session_id(None, "/inspect/550e8400").as_deref(),
            Some("550e8400")
        );
        assert_eq!(resolve_session_id(None, "/inspect/550e8400/"), None);
        assert_eq!(resolve_session_id(None, "/"), None);
    }

    #[test]
    fn selection_keeps_gallery_order() {
        let mut set = SelectionSet::new(["p3.png", "p1.png", "p2.png", "p1.png"]);
        assert_eq!(set.len(), 3);
        assert_eq!(set.toggle("p2.png"), Some(true));
        assert_eq!(set.toggle("p3.png"), Some(true));
        assert_eq!(set.toggle("missing.png"), None);
        assert_eq!(set.selected(), vec!["p3.png", "p2.png"]);

        assert_eq!(set.toggle("p3.png"), Some(false));
        assert!(!set.is_selected("p3.png"));
        assert_eq!(set.selected(), vec!["p2.png"]);
    }

    #[test]
    fn empty_selection_is_rejected_before_network() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let store = StorageService::with_paths(dir.path().join("rt"), dir.path().join("dl"));
        let backend = RecordingBackend::default();
        let mut flow = InspectFlow::new(Some("s1".into()), SelectionSet::new(["a.png"]))
            .expect("session exists");

        let err = flow
            .finalize(&backend, &store)
            .expect_err("nothing selected");
        assert!(matches!(err, InspectError::EmptySelection));
        assert!(backend.finalized.borrow().is_empty());
    }

    #[test]
    fn finalize_posts_selection_and_saves_final_score() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let store = StorageService::with_paths(dir.path().join("rt"), dir.path().join("dl"));
        let backend = RecordingBackend::default();
        let mut flow = InspectFlow::new(Some("s1".into()), SelectionSet::new(["a.png", "b.png"]))
            .expect("session exists");
        flow.selection_mut().set_all(true);

        let path = flow.finalize(&backend, &store).expect("finalize succeeds");

        assert!(path.ends_with("final_score.pdf"));
        assert_eq!(std::fs::read(&path).expect("saved pdf"), b"%PDF-final");
        assert_eq!(
            backend.finalized.borrow().as_slice(),
            &[("s1".to_string(), vec!["a.png".to_string(), "b.png".to_string()])]
        );
        assert!(!flow.is_busy());
        assert_eq!(flow.button_label(), FINALIZE_LABEL);
    }

    #[test]
    fn server_failure_releases_busy_flag() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let store = StorageService::with_paths(dir.path().join("rt"), dir.path().join("dl"));
        let backend = RecordingBackend {
            fail_with: Some("session expired".to_string()),
            ..RecordingBackend::default()
        };
        let mut flow = InspectFlow::new(Some("s1".into()), SelectionSet::new(["a.png"]))
            .expect("session exists");
        flow.selection_mut().toggle("a.png");

        let err = flow.finalize(&backend, &store).expect_err("server fails");
        assert_eq!(err.to_string(), "session expired");
        assert!(!flow.is_busy());
    }

    #[test]
    fn missing_session_is_an_error() {
        assert!(matches!(
            InspectFlow::new(None, SelectionSet::default()),
            Err(InspectError::MissingSession)
        ));
    }
}
