use std::cell::RefCell;

use scorecap::backend::{BackendError, BackendResult, ExecuteOutcome, SheetBackend};
use scorecap::form::{Coordinate, FormState};
use scorecap::geometry::{CropRegion, SurfaceBounds};
use scorecap::inspect::{resolve_session_id, InspectFlow, SelectionSet};
use scorecap::page::{FormEvent, PageEffect, SelectorPage};
use scorecap::run::{RunFlow, RunOutcome, StatusKind};
use scorecap::storage::StorageService;
use scorecap::url_state::{decode_query, encode_query, share_link, FileHistory, History, MemoryHistory};

/// Backend double recording what the client sent.
#[derive(Default)]
struct FakeBackend {
    executed: RefCell<Vec<Vec<(&'static str, String)>>>,
    finalized: RefCell<Vec<Vec<String>>>,
}

impl SheetBackend for FakeBackend {
    fn get_frame(&self, _url: &str, _start_time: &str) -> BackendResult<Vec<u8>> {
        Err(BackendError::InvalidResponse {
            message: "frames are not served here".to_string(),
        })
    }

    fn execute(&self, form: &FormState) -> BackendResult<ExecuteOutcome> {
        self.executed.borrow_mut().push(form.multipart_fields());
        if form.inspection_mode {
            Ok(ExecuteOutcome::Inspection {
                session_id: "550e8400".to_string(),
                inspect_url: self.inspect_url("550e8400"),
            })
        } else {
            Ok(ExecuteOutcome::Pdf(b"%PDF-1.7 score".to_vec()))
        }
    }

    fn finalize(&self, _session_id: &str, selected_images: &[String]) -> BackendResult<Vec<u8>> {
        self.finalized.borrow_mut().push(selected_images.to_vec());
        Ok(b"%PDF-1.7 final".to_vec())
    }

    fn fetch_thumbnail(&self, _thumbnail_url: &str) -> BackendResult<Vec<u8>> {
        Ok(Vec::new())
    }

    fn inspect_url(&self, session_id: &str) -> String {
        format!("http://backend.test/inspect/{session_id}")
    }
}

fn field<'a>(fields: &'a [(&'static str, String)], name: &str) -> &'a str {
    fields
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.as_str())
        .expect("field should be sent")
}

#[test]
fn dragged_region_survives_share_link_round_trip() {
    let surface = SurfaceBounds::new(500.0, 250.0);
    let mut page = SelectorPage::new(MemoryHistory::default());
    page.handle(FormEvent::UrlInput(
        "https://www.youtube.com/watch?v=abc12345678".to_string(),
    ));
    page.handle(FormEvent::FieldInput(
        scorecap::form::FormField::Threshold,
        "2.5".to_string(),
    ));

    assert!(page.pointer_down(400.0, 75.0, surface));
    page.pointer_move(-40.0, 300.0, surface);
    page.pointer_up();

    let expected = CropRegion::new(0, 80, 30, 100);
    assert_eq!(page.form().region(), expected);

    let link = share_link("https://scorecap.test/", page.form()).expect("share link");
    let query = link.split_once('?').map(|(_, q)| q).expect("link has a query");

    let (restored, effects) = SelectorPage::load(MemoryHistory::with_query(query));
    assert_eq!(restored.form().region(), expected);
    assert_eq!(restored.form().threshold, "2.5");
    assert_eq!(restored.form().url, page.form().url);
    assert_eq!(restored.overlay(), page.overlay());
    assert!(effects
        .iter()
        .any(|effect| matches!(effect, PageEffect::ThumbnailChanged(Some(_)))));
}

#[test]
fn codec_round_trip_keeps_typed_values() {
    let mut form = FormState::default();
    form.threshold = "2.5".to_string();
    form.coordinates.get_mut(Coordinate::XStart).set_from_slider(10);
    form.coordinates.get_mut(Coordinate::XEnd).set_from_number("90");

    let decoded = decode_query(&encode_query(&form));
    let mut restored = SelectorPage::new(MemoryHistory::default());
    restored.restore(&encode_query(&form));

    assert_eq!(decoded.len(), 9);
    assert_eq!(restored.form().threshold, "2.5");
    assert_eq!(restored.form().coordinates.get(Coordinate::XStart).number(), "10");
    assert_eq!(restored.form().coordinates.get(Coordinate::XEnd).slider(), 90);
}

#[test]
fn file_history_restores_last_session_after_restart() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let history = FileHistory::new(dir.path().join("state").join("last_session"));

    let mut first = SelectorPage::new(history.clone());
    first.handle(FormEvent::SliderInput(Coordinate::YStart, 40));
    first.handle(FormEvent::NumberInput(Coordinate::YEnd, "60".to_string()));
    assert!(history.current_query().is_some());

    let (second, _) = SelectorPage::load(history);
    assert_eq!(second.form().region(), CropRegion::new(0, 100, 40, 60));
}

#[test]
fn run_then_review_produces_both_scores() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let storage = StorageService::with_paths(dir.path().join("runtime"), dir.path().join("Downloads"));
    let backend = FakeBackend::default();

    let mut page = SelectorPage::new(MemoryHistory::default());
    page.restore("url=https%3A%2F%2Fyoutu.be%2Fabc12345678&x_start=10&x_end=90&frame_interval_sec=0.5");

    let mut flow = RunFlow::new();
    let outcome = flow
        .submit(page.form(), &backend, &storage)
        .expect("pdf run should succeed");
    let RunOutcome::Saved(score) = outcome else {
        panic!("expected a direct pdf");
    };
    assert_eq!(std::fs::read(score).expect("score saved"), b"%PDF-1.7 score");
    assert_eq!(flow.status().map(|status| status.kind), Some(StatusKind::Success));

    page.handle(FormEvent::InspectionToggled(true));
    let outcome = flow
        .submit(page.form(), &backend, &storage)
        .expect("inspection run should succeed");
    let RunOutcome::Inspection { inspect_url, .. } = outcome else {
        panic!("expected an inspection session");
    };

    let sent = backend.executed.borrow();
    assert_eq!(sent.len(), 2);
    assert_eq!(field(&sent[0], "x_start"), "10");
    assert_eq!(field(&sent[0], "frame_interval_sec"), "0.5");
    assert_eq!(field(&sent[0], "inspection_mode"), "false");
    assert_eq!(field(&sent[1], "inspection_mode"), "true");

    let path = inspect_url
        .split_once("://")
        .and_then(|(_, rest)| rest.split_once('/'))
        .map(|(_, path)| format!("/{path}"))
        .expect("inspect url has a path");
    let mut review = InspectFlow::new(
        resolve_session_id(None, &path),
        SelectionSet::new(["page_001.png", "page_002.png", "page_003.png"]),
    )
    .expect("session id resolves");
    assert_eq!(review.session_id(), "550e8400");
    review.selection_mut().toggle("page_003.png");
    review.selection_mut().toggle("page_001.png");

    let final_score = review.finalize(&backend, &storage).expect("finalize succeeds");
    assert!(final_score.ends_with("final_score.pdf"));
    assert_eq!(
        backend.finalized.borrow().as_slice(),
        &[vec!["page_001.png".to_string(), "page_003.png".to_string()]]
    );
}

#[test]
fn out_of_range_interval_blocks_the_run() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let storage = StorageService::with_paths(dir.path().join("runtime"), dir.path().join("Downloads"));
    let backend = FakeBackend::default();
    let mut page = SelectorPage::new(MemoryHistory::default());
    page.handle(FormEvent::FieldInput(
        scorecap::form::FormField::FrameIntervalSec,
        "3.1".to_string(),
    ));

    let mut flow = RunFlow::new();
    assert!(flow.submit(page.form(), &backend, &storage).is_err());
    assert!(backend.executed.borrow().is_empty());
    assert!(flow.control().enabled());
}
