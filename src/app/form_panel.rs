use gtk4::prelude::*;
use gtk4::{Align, Box as GtkBox, CheckButton, Entry, Frame, Label, Orientation, Scale};

use crate::form::{Coordinate, FormField, FormState};
use crate::geometry::{PERCENT_MAX, PERCENT_MIN};

const NUMBER_ENTRY_CHARS: i32 = 4;

pub(super) struct CoordinateRow {
    pub(super) scale: Scale,
    pub(super) entry: Entry,
}

/// Widgets of the extraction form, one per `FormState` control.
pub(super) struct FormWidgets {
    pub(super) root: GtkBox,
    pub(super) url_entry: Entry,
    pub(super) time_box: GtkBox,
    pub(super) start_time: Entry,
    pub(super) end_time: Entry,
    pub(super) coordinates: [CoordinateRow; 4],
    pub(super) advanced_box: Frame,
    pub(super) threshold: Entry,
    pub(super) frame_interval: Entry,
    pub(super) inspection: CheckButton,
}

fn labeled(label: &str, child: &impl IsA<gtk4::Widget>) -> GtkBox {
    let row = GtkBox::new(Orientation::Horizontal, 8);
    let title = Label::new(Some(label));
    title.set_halign(Align::Start);
    title.set_width_chars(14);
    title.set_xalign(0.0);
    row.append(&title);
    row.append(child);
    row
}

fn coordinate_row(coordinate: Coordinate) -> (GtkBox, CoordinateRow) {
    let scale = Scale::with_range(Orientation::Horizontal, PERCENT_MIN, PERCENT_MAX, 1.0);
    scale.set_digits(0);
    scale.set_round_digits(0);
    scale.set_draw_value(false);
    scale.set_hexpand(true);

    let entry = Entry::new();
    entry.set_width_chars(NUMBER_ENTRY_CHARS);
    entry.set_max_width_chars(NUMBER_ENTRY_CHARS);
    entry.set_input_purpose(gtk4::InputPurpose::Number);

    let controls = GtkBox::new(Orientation::Horizontal, 6);
    controls.set_hexpand(true);
    controls.append(&scale);
    controls.append(&entry);
    (
        labeled(coordinate.label(), &controls),
        CoordinateRow { scale, entry },
    )
}

impl FormWidgets {
    pub(super) fn build() -> Self {
        let root = GtkBox::new(Orientation::Vertical, 8);

        let url_entry = Entry::new();
        url_entry.set_hexpand(true);
        url_entry.set_placeholder_text(Some("https://www.youtube.com/watch?v=..."));
        url_entry.set_input_purpose(gtk4::InputPurpose::Url);
        root.append(&labeled("Video URL", &url_entry));

        let start_time = Entry::new();
        start_time.set_placeholder_text(Some("0:00"));
        let end_time = Entry::new();
        end_time.set_placeholder_text(Some("end of video"));
        let time_box = GtkBox::new(Orientation::Vertical, 8);
        time_box.append(&labeled("Start time", &start_time));
        time_box.append(&labeled("End time", &end_time));
        root.append(&time_box);

        let region_box = GtkBox::new(Orientation::Vertical, 4);
        let coordinates = Coordinate::ALL.map(|coordinate| {
            let (row_box, row) = coordinate_row(coordinate);
            region_box.append(&row_box);
            row
        });
        root.append(&region_box);

        let threshold = Entry::new();
        threshold.set_tooltip_text(Some("Change sensitivity, 0.5 to 15.0"));
        let frame_interval = Entry::new();
        frame_interval.set_tooltip_text(Some("Seconds between sampled frames, up to 3.0"));
        let inspection = CheckButton::with_label("Review pages before building the PDF");
        let advanced_inner = GtkBox::new(Orientation::Vertical, 8);
        advanced_inner.set_margin_top(8);
        advanced_inner.set_margin_bottom(8);
        advanced_inner.set_margin_start(8);
        advanced_inner.set_margin_end(8);
        advanced_inner.append(&labeled("Threshold", &threshold));
        advanced_inner.append(&labeled("Frame interval", &frame_interval));
        advanced_inner.append(&inspection);
        let advanced_box = Frame::new(Some("Advanced settings"));
        advanced_box.set_child(Some(&advanced_inner));
        root.append(&advanced_box);

        Self {
            root,
            url_entry,
            time_box,
            start_time,
            end_time,
            coordinates,
            advanced_box,
            threshold,
            frame_interval,
            inspection,
        }
    }

    pub(super) fn row(&self, coordinate: Coordinate) -> &CoordinateRow {
        &self.coordinates[coordinate.index()]
    }

    /// Writes both controls of a coordinate; callers suppress the echo signals.
    pub(super) fn show_coordinate(&self, coordinate: Coordinate, slider: i32, number: &str) {
        let row = self.row(coordinate);
        row.scale.set_value(f64::from(slider));
        if row.entry.text() != number {
            row.entry.set_text(number);
        }
    }

    pub(super) fn fill(&self, form: &FormState) {
        self.url_entry.set_text(&form.url);
        self.start_time.set_text(&form.start_time);
        self.end_time.set_text(&form.end_time);
        for coordinate in Coordinate::ALL {
            let pair = form.coordinates.get(coordinate);
            self.show_coordinate(coordinate, pair.slider(), pair.number());
        }
        self.threshold.set_text(&form.threshold);
        self.frame_interval.set_text(&form.frame_interval_sec);
        self.inspection.set_active(form.inspection_mode);
    }

    pub(super) fn focus(&self, field: FormField) {
        let focused = match field {
            FormField::Url => self.url_entry.grab_focus(),
            FormField::StartTime => self.start_time.grab_focus(),
            FormField::EndTime => self.end_time.grab_focus(),
            FormField::Coordinate(coordinate) => self.row(coordinate).entry.grab_focus(),
            FormField::Threshold => self.threshold.grab_focus(),
            FormField::FrameIntervalSec => self.frame_interval.grab_focus(),
            FormField::InspectionMode => self.inspection.grab_focus(),
        };
        if !focused {
            tracing::debug!(field = field.key(), "field could not take focus");
        }
    }
}
