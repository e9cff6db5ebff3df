use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gtk4::prelude::*;
use gtk4::{
    Align, ApplicationWindow, Box as GtkBox, Button, Entry, Label, Orientation, Popover,
    PositionType, TextView, Widget, Window, WrapMode,
};

use crate::backend::{BugReport, BugReporter};
use crate::tour::{progress_label, PopoverSide, TourAnchor, TourEvent, TourMachine};

use super::worker::spawn_worker;

/// Popover that walks through the tour steps, re-anchored on every step.
#[derive(Clone)]
pub(super) struct TourPopover {
    popover: Popover,
    title: Label,
    description: Label,
    progress: Label,
    previous: Button,
    next: Button,
    machine: Rc<RefCell<TourMachine>>,
    anchors: Rc<dyn Fn(TourAnchor) -> Widget>,
    moving: Rc<Cell<bool>>,
}

impl TourPopover {
    pub(super) fn build(anchors: impl Fn(TourAnchor) -> Widget + 'static) -> Self {
        let title = Label::new(None);
        title.add_css_class("heading");
        title.set_xalign(0.0);
        let description = Label::new(None);
        description.set_wrap(true);
        description.set_max_width_chars(40);
        description.set_xalign(0.0);
        let progress = Label::new(None);
        progress.add_css_class("dim-label");

        let skip = Button::with_label("Skip");
        skip.add_css_class("flat");
        let previous = Button::with_label("Previous");
        let next = Button::with_label("Next");
        next.add_css_class("suggested-action");

        let footer = GtkBox::new(Orientation::Horizontal, 6);
        footer.append(&skip);
        let spacer = GtkBox::new(Orientation::Horizontal, 0);
        spacer.set_hexpand(true);
        footer.append(&spacer);
        footer.append(&progress);
        footer.append(&previous);
        footer.append(&next);

        let content = GtkBox::new(Orientation::Vertical, 8);
        content.append(&title);
        content.append(&description);
        content.append(&footer);

        let popover = Popover::new();
        popover.set_child(Some(&content));
        popover.set_autohide(true);

        let tour = Self {
            popover,
            title,
            description,
            progress,
            previous,
            next,
            machine: Rc::new(RefCell::new(TourMachine::new())),
            anchors: Rc::new(anchors),
            moving: Rc::new(Cell::new(false)),
        };

        let on_skip = tour.clone();
        skip.connect_clicked(move |_| on_skip.send(TourEvent::Skip));
        let on_previous = tour.clone();
        tour.previous
            .connect_clicked(move |_| on_previous.send(TourEvent::Previous));
        let on_next = tour.clone();
        tour.next.connect_clicked(move |_| {
            let event = if on_next.machine.borrow().is_last_step() {
                TourEvent::Done
            } else {
                TourEvent::Next
            };
            on_next.send(event);
        });
        let on_closed = tour.clone();
        tour.popover.connect_closed(move |_| {
            if !on_closed.moving.get() && on_closed.machine.borrow().is_active() {
                on_closed.send(TourEvent::Skip);
            }
        });

        tour
    }

    pub(super) fn start(&self) {
        self.send(TourEvent::Start);
    }

    fn send(&self, event: TourEvent) {
        if let Err(err) = self.machine.borrow_mut().transition(event) {
            tracing::debug!(%err, "tour event ignored");
            return;
        }
        self.show_current();
    }

    fn show_current(&self) {
        let current = self.machine.borrow().current_step();
        self.moving.set(true);
        self.popover.popdown();
        if self.popover.parent().is_some() {
            self.popover.unparent();
        }

        if let Some((index, step)) = current {
            let anchor = (self.anchors)(step.anchor);
            self.popover.set_parent(&anchor);
            self.popover.set_position(match step.side {
                PopoverSide::Top => PositionType::Top,
                PopoverSide::Bottom => PositionType::Bottom,
            });
            self.title.set_text(step.title);
            self.description.set_text(step.description);
            self.progress.set_text(&progress_label(index));
            self.previous.set_sensitive(index > 0);
            self.next.set_label(if self.machine.borrow().is_last_step() {
                "Done"
            } else {
                "Next"
            });
            self.popover.popup();
        }
        self.moving.set(false);
    }
}

/// Modal window for an anonymous bug report.
pub(super) fn present_bug_report(parent: &ApplicationWindow, reporter: BugReporter) {
    let window = Window::builder()
        .title("Report a bug")
        .transient_for(parent)
        .modal(true)
        .default_width(420)
        .default_height(320)
        .build();

    let message = TextView::new();
    message.set_wrap_mode(WrapMode::WordChar);
    message.set_vexpand(true);
    let email = Entry::new();
    email.set_placeholder_text(Some("Email for a reply (optional)"));
    let feedback = Label::new(None);
    feedback.set_wrap(true);
    feedback.set_xalign(0.0);
    let send = Button::with_label("Send");
    send.add_css_class("suggested-action");
    send.set_halign(Align::End);

    let content = GtkBox::new(Orientation::Vertical, 8);
    content.set_margin_top(12);
    content.set_margin_bottom(12);
    content.set_margin_start(12);
    content.set_margin_end(12);
    content.append(&Label::new(Some("What went wrong?")));
    content.append(&message);
    content.append(&email);
    content.append(&feedback);
    content.append(&send);
    window.set_child(Some(&content));

    let dialog = window.clone();
    send.connect_clicked(move |button| {
        let buffer = message.buffer();
        let (start, end) = buffer.bounds();
        let text = buffer.text(&start, &end, false).to_string();
        if text.trim().is_empty() {
            feedback.set_text("Please describe the problem first.");
            return;
        }
        let reply_to = email.text().to_string();
        let report = BugReport::new(text, Some(reply_to.as_str()).filter(|r| !r.is_empty()));

        button.set_sensitive(false);
        feedback.set_text("Sending...");
        let reporter = reporter.clone();
        let button = button.clone();
        let feedback = feedback.clone();
        let dialog = dialog.clone();
        spawn_worker(
            "bug-report",
            move || reporter.submit(&report),
            move |result| {
                button.set_sensitive(true);
                match result {
                    Some(Ok(())) => dialog.close(),
                    Some(Err(err)) => {
                        feedback.set_text(&format!("Could not send the report: {err}"))
                    }
                    None => feedback.set_text("Could not send the report."),
                }
            },
        );
    });

    window.present();
}
