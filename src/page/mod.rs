//! Crop-selector page component.
//!
//! `SelectorPage` owns every piece of per-session UI state (form controls,
//! drag session, preview surface content, frame-request tokens and the
//! session history entry). Front-ends forward widget signals as
//! [`FormEvent`]s and pointer callbacks, then apply the returned
//! [`PageEffect`]s to their widgets.

use crate::form::{Coordinate, FormField, FormState};
use crate::geometry::{OverlayBox, SurfaceBounds};
use crate::preview::{FrameImage, FrameRequests, PreviewSource, RequestToken};
use crate::selector::DragSelector;
use crate::url_state::{decode_query, encode_query, History};
use crate::video::{extract_video_id, thumbnail_url};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
    UrlInput(String),
    UrlBlur,
    StartTimeChanged(String),
    /// Plain text field edit (end time, threshold, frame interval).
    FieldInput(FormField, String),
    SliderInput(Coordinate, i32),
    NumberInput(Coordinate, String),
    InspectionToggled(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageEffect {
    /// Both controls of the coordinate must be re-read from the form.
    ControlsChanged(Coordinate),
    OverlayChanged(OverlayBox),
    /// Thumbnail link to show, or `None` to clear the surface.
    ThumbnailChanged(Option<String>),
    /// A decoded frame replaced the surface content.
    FrameShown,
    FetchFrame {
        token: RequestToken,
        url: String,
        start_time: String,
    },
    HistoryReplaced(String),
}

pub struct SelectorPage<H: History> {
    form: FormState,
    selector: DragSelector,
    frames: FrameRequests,
    source: PreviewSource,
    overlay: OverlayBox,
    history: H,
    restoring: bool,
    drag_changed_region: bool,
}

impl<H: History> SelectorPage<H> {
    pub fn new(history: H) -> Self {
        let form = FormState::default();
        let overlay = OverlayBox::for_region(form.region());
        Self {
            form,
            selector: DragSelector::new(),
            frames: FrameRequests::new(),
            source: PreviewSource::Empty,
            overlay,
            history,
            restoring: false,
            drag_changed_region: false,
        }
    }

    /// Creates the page and restores the form from the history entry, if any.
    pub fn load(history: H) -> (Self, Vec<PageEffect>) {
        let mut page = Self::new(history);
        let effects = match page.history.current_query() {
            Some(query) => page.restore(&query),
            None => Vec::new(),
        };
        (page, effects)
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn overlay(&self) -> OverlayBox {
        self.overlay
    }

    pub fn source(&self) -> &PreviewSource {
        &self.source
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn frame_loading(&self) -> bool {
        self.frames.loading()
    }

    pub fn is_dragging(&self) -> bool {
        self.selector.is_dragging()
    }

    pub fn share_query(&self) -> String {
        encode_query(&self.form)
    }

    pub fn handle(&mut self, event: FormEvent) -> Vec<PageEffect> {
        tracing::trace!(?event, "form event");
        let mut effects = Vec::new();
        let tracked_change = match event {
            FormEvent::UrlInput(url) => {
                self.form.url = url;
                effects.push(self.refresh_thumbnail());
                true
            }
            FormEvent::UrlBlur => {
                if !self.form.start_time.is_empty() {
                    effects.extend(self.request_frame());
                }
                false
            }
            FormEvent::StartTimeChanged(start_time) => {
                self.form.start_time = start_time;
                effects.extend(self.request_frame());
                true
            }
            FormEvent::FieldInput(FormField::Coordinate(coordinate), raw) => {
                return self.handle(FormEvent::NumberInput(coordinate, raw));
            }
            FormEvent::FieldInput(FormField::InspectionMode, raw) => {
                self.form.set_value(FormField::InspectionMode, &raw);
                false
            }
            FormEvent::FieldInput(field, raw) => {
                self.form.set_value(field, &raw);
                true
            }
            FormEvent::SliderInput(coordinate, value) => {
                self.form
                    .coordinates
                    .get_mut(coordinate)
                    .set_from_slider(value);
                effects.push(PageEffect::ControlsChanged(coordinate));
                effects.push(self.refresh_overlay());
                true
            }
            FormEvent::NumberInput(coordinate, raw) => {
                self.form
                    .coordinates
                    .get_mut(coordinate)
                    .set_from_number(&raw);
                effects.push(PageEffect::ControlsChanged(coordinate));
                effects.push(self.refresh_overlay());
                true
            }
            FormEvent::InspectionToggled(enabled) => {
                self.form.inspection_mode = enabled;
                false
            }
        };

        if tracked_change && !self.restoring {
            effects.push(self.replace_history());
        }
        effects
    }

    /// Applies a query string, then replays each restored value as an input
    /// event so the overlay, thumbnail and frame preview follow.
    pub fn restore(&mut self, query: &str) -> Vec<PageEffect> {
        let values = decode_query(query);
        if values.is_empty() {
            return Vec::new();
        }
        tracing::info!(fields = values.len(), "restoring form from session query");

        self.restoring = true;
        let mut effects = Vec::new();
        for (field, value) in values {
            self.form.set_value(field, &value);
            let event = match field {
                FormField::Url => FormEvent::UrlInput(value),
                FormField::StartTime => FormEvent::StartTimeChanged(value),
                FormField::Coordinate(coordinate) => FormEvent::NumberInput(coordinate, value),
                other => FormEvent::FieldInput(other, value),
            };
            effects.extend(self.handle(event));
        }
        self.restoring = false;

        effects.push(self.replace_history());
        effects
    }

    pub fn pointer_down(&mut self, px_x: f64, px_y: f64, bounds: SurfaceBounds) -> bool {
        self.drag_changed_region = false;
        self.selector.pointer_down(px_x, px_y, bounds)
    }

    pub fn pointer_move(&mut self, px_x: f64, px_y: f64, bounds: SurfaceBounds) -> Vec<PageEffect> {
        let Some(region) = self.selector.pointer_move(px_x, px_y, bounds) else {
            return Vec::new();
        };
        self.form.coordinates.set_region(region);
        self.drag_changed_region = true;

        let mut effects: Vec<PageEffect> = Coordinate::ALL
            .into_iter()
            .map(PageEffect::ControlsChanged)
            .collect();
        effects.push(self.refresh_overlay());
        effects
    }

    pub fn pointer_up(&mut self) -> Vec<PageEffect> {
        let was_dragging = self.selector.is_dragging();
        self.selector.pointer_up();
        if was_dragging && std::mem::take(&mut self.drag_changed_region) {
            return vec![self.replace_history()];
        }
        Vec::new()
    }

    /// Delivers a frame-preview response; stale responses are ignored.
    pub fn frame_loaded(
        &mut self,
        token: RequestToken,
        result: Result<FrameImage, String>,
    ) -> Vec<PageEffect> {
        if !self.frames.finish(token) {
            return Vec::new();
        }
        match result {
            Ok(frame) => {
                tracing::debug!(
                    token = token.value(),
                    width = frame.width,
                    height = frame.height,
                    "frame preview loaded"
                );
                self.source = PreviewSource::Frame(frame);
                vec![PageEffect::FrameShown]
            }
            Err(err) => {
                tracing::warn!(token = token.value(), %err, "frame preview failed");
                Vec::new()
            }
        }
    }

    fn refresh_overlay(&mut self) -> PageEffect {
        self.overlay = OverlayBox::for_region(self.form.region());
        PageEffect::OverlayChanged(self.overlay)
    }

    fn refresh_thumbnail(&mut self) -> PageEffect {
        match extract_video_id(&self.form.url) {
            Some(video_id) => {
                let url = thumbnail_url(&video_id);
                self.source = PreviewSource::Thumbnail(url.clone());
                PageEffect::ThumbnailChanged(Some(url))
            }
            None => {
                self.source = PreviewSource::Empty;
                PageEffect::ThumbnailChanged(None)
            }
        }
    }

    fn request_frame(&mut self) -> Option<PageEffect> {
        extract_video_id(&self.form.url)?;
        let token = self.frames.begin();
        Some(PageEffect::FetchFrame {
            token,
            url: self.form.url.clone(),
            start_time: self.form.start_time.clone(),
        })
    }

    fn replace_history(&mut self) -> PageEffect {
        let query = encode_query(&self.form);
        self.history.replace_query(&query);
        PageEffect::HistoryReplaced(query)
    }
}
