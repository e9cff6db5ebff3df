use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gtk4::prelude::*;
use gtk4::{EventControllerFocus, GestureDrag};

use crate::backend::{HttpBackend, SheetBackend};
use crate::form::{Coordinate, FormField};
use crate::page::{FormEvent, PageEffect, SelectorPage};
use crate::preview::{FrameImage, PreviewSource};
use crate::url_state::FileHistory;

use super::form_panel::FormWidgets;
use super::preview_canvas::PreviewCanvas;
use super::worker::spawn_worker;

/// Binds one `SelectorPage` to the window widgets.
pub(super) struct PageSession {
    pub(super) page: RefCell<SelectorPage<FileHistory>>,
    pub(super) form: FormWidgets,
    pub(super) canvas: PreviewCanvas,
    backend: HttpBackend,
    syncing: Cell<bool>,
}

impl PageSession {
    pub(super) fn new(
        page: SelectorPage<FileHistory>,
        form: FormWidgets,
        canvas: PreviewCanvas,
        backend: HttpBackend,
    ) -> Rc<Self> {
        Rc::new(Self {
            page: RefCell::new(page),
            form,
            canvas,
            backend,
            syncing: Cell::new(false),
        })
    }

    /// Pushes model values into widgets without feeding them back as input.
    fn with_sync_suppressed(&self, update: impl FnOnce()) {
        let previous = self.syncing.replace(true);
        update();
        self.syncing.set(previous);
    }

    pub(super) fn show_restored(self: &Rc<Self>, effects: Vec<PageEffect>) {
        self.with_sync_suppressed(|| self.form.fill(self.page.borrow().form()));
        self.apply(effects);
    }

    pub(super) fn dispatch(self: &Rc<Self>, event: FormEvent) {
        if self.syncing.get() {
            return;
        }
        let effects = self.page.borrow_mut().handle(event);
        self.apply(effects);
    }

    pub(super) fn apply(self: &Rc<Self>, effects: Vec<PageEffect>) {
        for effect in effects {
            match effect {
                PageEffect::ControlsChanged(coordinate) => {
                    let pair = self.page.borrow().form().coordinates.get(coordinate).clone();
                    self.with_sync_suppressed(|| {
                        self.form
                            .show_coordinate(coordinate, pair.slider(), pair.number())
                    });
                }
                PageEffect::OverlayChanged(overlay) => self.canvas.set_overlay(overlay),
                PageEffect::ThumbnailChanged(None) => self.canvas.set_pixbuf(None),
                PageEffect::ThumbnailChanged(Some(url)) => self.load_thumbnail(url),
                PageEffect::FrameShown => {
                    if let PreviewSource::Frame(frame) = self.page.borrow().source() {
                        self.canvas.show_image_bytes(&frame.bytes);
                    }
                }
                PageEffect::FetchFrame {
                    token,
                    url,
                    start_time,
                } => {
                    self.canvas.set_loading(true);
                    let backend = self.backend.clone();
                    let session = self.clone();
                    spawn_worker(
                        "frame",
                        move || {
                            backend
                                .get_frame(&url, &start_time)
                                .map_err(|err| err.to_string())
                                .and_then(|bytes| {
                                    FrameImage::decode(bytes).map_err(|err| err.to_string())
                                })
                        },
                        move |result| {
                            let result = result
                                .unwrap_or_else(|| Err("frame worker stopped".to_string()));
                            let effects = session.page.borrow_mut().frame_loaded(token, result);
                            session
                                .canvas
                                .set_loading(session.page.borrow().frame_loading());
                            session.apply(effects);
                        },
                    );
                }
                PageEffect::HistoryReplaced(query) => {
                    tracing::trace!(%query, "session query replaced");
                }
            }
        }
    }

    fn load_thumbnail(self: &Rc<Self>, url: String) {
        let backend = self.backend.clone();
        let session = self.clone();
        let requested = url.clone();
        spawn_worker(
            "thumbnail",
            move || backend.fetch_thumbnail(&requested),
            move |result| {
                let still_current = matches!(
                    session.page.borrow().source(),
                    PreviewSource::Thumbnail(current) if *current == url
                );
                if !still_current {
                    return;
                }
                match result {
                    Some(Ok(bytes)) => session.canvas.show_image_bytes(&bytes),
                    Some(Err(err)) => tracing::warn!(%url, %err, "thumbnail unavailable"),
                    None => tracing::warn!(%url, "thumbnail worker stopped"),
                }
            },
        );
    }
}

fn connect_text_field(session: &Rc<PageSession>, entry: &gtk4::Entry, field: FormField) {
    let session = session.clone();
    entry.connect_changed(move |entry| {
        session.dispatch(FormEvent::FieldInput(field, entry.text().to_string()));
    });
}

/// Start time reacts on commit (Enter or focus loss) when the text changed.
fn connect_start_time(session: &Rc<PageSession>) {
    let commit = {
        let session = session.clone();
        move || {
            let text = session.form.start_time.text().to_string();
            if session.page.borrow().form().start_time == text {
                return;
            }
            session.dispatch(FormEvent::StartTimeChanged(text));
        }
    };

    let on_activate = commit.clone();
    session
        .form
        .start_time
        .connect_activate(move |_| on_activate());

    let focus = EventControllerFocus::new();
    focus.connect_leave(move |_| commit());
    session.form.start_time.add_controller(focus);
}

fn connect_coordinate(session: &Rc<PageSession>, coordinate: Coordinate) {
    let row = session.form.row(coordinate);

    let slider_session = session.clone();
    row.scale.connect_value_changed(move |scale| {
        slider_session.dispatch(FormEvent::SliderInput(coordinate, scale.value().round() as i32));
    });

    let number_session = session.clone();
    row.entry.connect_changed(move |entry| {
        number_session.dispatch(FormEvent::NumberInput(coordinate, entry.text().to_string()));
    });
}

pub(super) fn connect_form_signals(session: &Rc<PageSession>) {
    {
        let session_for_input = session.clone();
        session.form.url_entry.connect_changed(move |entry| {
            session_for_input.dispatch(FormEvent::UrlInput(entry.text().to_string()));
        });

        let session_for_blur = session.clone();
        let focus = EventControllerFocus::new();
        focus.connect_leave(move |_| session_for_blur.dispatch(FormEvent::UrlBlur));
        session.form.url_entry.add_controller(focus);
    }

    connect_start_time(session);
    connect_text_field(session, &session.form.end_time, FormField::EndTime);
    connect_text_field(session, &session.form.threshold, FormField::Threshold);
    connect_text_field(
        session,
        &session.form.frame_interval,
        FormField::FrameIntervalSec,
    );
    for coordinate in Coordinate::ALL {
        connect_coordinate(session, coordinate);
    }

    let toggle_session = session.clone();
    session.form.inspection.connect_toggled(move |button| {
        toggle_session.dispatch(FormEvent::InspectionToggled(button.is_active()));
    });
}

/// Drag gesture on the preview; the implicit grab keeps updates flowing outside the surface.
pub(super) fn connect_drag_selector(session: &Rc<PageSession>) {
    let gesture = GestureDrag::new();
    gesture.set_button(gtk4::gdk::BUTTON_PRIMARY);

    let begin_session = session.clone();
    gesture.connect_drag_begin(move |_, start_x, start_y| {
        let bounds = begin_session.canvas.bounds();
        if !begin_session
            .page
            .borrow_mut()
            .pointer_down(start_x, start_y, bounds)
        {
            tracing::debug!(?bounds, "drag ignored on unsized preview");
        }
    });

    let update_session = session.clone();
    gesture.connect_drag_update(move |gesture, offset_x, offset_y| {
        let Some((start_x, start_y)) = gesture.start_point() else {
            return;
        };
        let bounds = update_session.canvas.bounds();
        let effects = update_session.page.borrow_mut().pointer_move(
            start_x + offset_x,
            start_y + offset_y,
            bounds,
        );
        update_session.apply(effects);
    });

    let end_session = session.clone();
    gesture.connect_drag_end(move |_, _, _| {
        let effects = end_session.page.borrow_mut().pointer_up();
        end_session.apply(effects);
    });

    session.canvas.area.add_controller(gesture);
}
