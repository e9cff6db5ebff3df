//! First-run walkthrough of the main window.

mod error;
mod machine;

pub use error::{TourError, TourResult};
pub use machine::{TourEvent, TourMachine, TourState};

/// Widget a tour step points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TourAnchor {
    UrlEntry,
    TimeFields,
    PreviewSurface,
    AdvancedSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopoverSide {
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TourStep {
    pub anchor: TourAnchor,
    pub title: &'static str,
    pub description: &'static str,
    pub side: PopoverSide,
}

pub static TOUR_STEPS: [TourStep; 4] = [
    TourStep {
        anchor: TourAnchor::UrlEntry,
        title: "1. Video address",
        description: "Paste the YouTube link of the video you want to extract a score from.",
        side: PopoverSide::Bottom,
    },
    TourStep {
        anchor: TourAnchor::TimeFields,
        title: "2. Time range",
        description: "Enter where extraction should start and where it should stop.",
        side: PopoverSide::Bottom,
    },
    TourStep {
        anchor: TourAnchor::PreviewSurface,
        title: "3. Score area",
        description: "Drag over this box to frame the sheet music. \
                      The sliders below allow fine adjustment.",
        side: PopoverSide::Top,
    },
    TourStep {
        anchor: TourAnchor::AdvancedSettings,
        title: "4. Advanced settings",
        description: "Sensitivity and sampling interval. Usually these do not need changing.",
        side: PopoverSide::Top,
    },
];

/// Progress text shown in the popover footer, e.g. `2 of 4`.
pub fn progress_label(index: usize) -> String {
    format!("{} of {}", index + 1, TOUR_STEPS.len())
}
