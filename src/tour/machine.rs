use super::error::{TourError, TourResult};
use super::{TourStep, TOUR_STEPS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TourState {
    #[default]
    NotStarted,
    Showing(usize),
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TourEvent {
    Start,
    Next,
    Previous,
    /// Skip button, Escape or a click outside the popover.
    Skip,
    Done,
}

#[derive(Debug, Default)]
pub struct TourMachine {
    state: TourState,
}

impl TourMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TourState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, TourState::Showing(_))
    }

    pub fn current_step(&self) -> Option<(usize, &'static TourStep)> {
        match self.state {
            TourState::Showing(index) => TOUR_STEPS.get(index).map(|step| (index, step)),
            _ => None,
        }
    }

    pub fn is_last_step(&self) -> bool {
        self.state == TourState::Showing(TOUR_STEPS.len() - 1)
    }

    pub fn can_transition(&self, event: TourEvent) -> bool {
        self.next_state(event).is_some()
    }

    pub fn next_state(&self, event: TourEvent) -> Option<TourState> {
        let last = TOUR_STEPS.len() - 1;
        match (self.state, event) {
            (TourState::NotStarted | TourState::Finished, TourEvent::Start) => {
                Some(TourState::Showing(0))
            }
            (TourState::Showing(index), TourEvent::Next) if index < last => {
                Some(TourState::Showing(index + 1))
            }
            (TourState::Showing(index), TourEvent::Previous) if index > 0 => {
                Some(TourState::Showing(index - 1))
            }
            (TourState::Showing(index), TourEvent::Done) if index == last => {
                Some(TourState::Finished)
            }
            (TourState::Showing(_), TourEvent::Skip) => Some(TourState::Finished),
            _ => None,
        }
    }

    pub fn transition(&mut self, event: TourEvent) -> TourResult<TourState> {
        tracing::debug!(from = ?self.state, ?event, "tour transition");
        let next = self.next_state(event).ok_or_else(|| {
            let from = self.state;
            tracing::warn!(?from, ?event, "invalid tour transition requested");
            TourError::InvalidTransition { from, event }
        })?;
        self.state = next;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tour::TourAnchor;

    #[test]
    fn walks_all_steps_in_order() {
        let mut tour = TourMachine::new();
        tour.transition(TourEvent::Start).expect("start");
        let mut anchors = Vec::new();
        loop {
            let (_, step) = tour.current_step().expect("active step");
            anchors.push(step.anchor);
            if tour.is_last_step() {
                break;
            }
            tour.transition(TourEvent::Next).expect("next");
        }
        tour.transition(TourEvent::Done).expect("done on last step");

        assert_eq!(
            anchors,
            vec![
                TourAnchor::UrlEntry,
                TourAnchor::TimeFields,
                TourAnchor::PreviewSurface,
                TourAnchor::AdvancedSettings,
            ]
        );
        assert_eq!(tour.state(), TourState::Finished);
        assert!(tour.current_step().is_none());
    }

    #[test]
    fn skip_ends_tour_from_any_step() {
        let mut tour = TourMachine::new();
        tour.transition(TourEvent::Start).expect("start");
        tour.transition(TourEvent::Next).expect("next");
        tour.transition(TourEvent::Skip).expect("skip");
        assert!(!tour.is_active());

        tour.transition(TourEvent::Start).expect("tour can be replayed");
        assert_eq!(tour.state(), TourState::Showing(0));
    }

    #[test]
    fn boundary_events_are_rejected_without_moving() {
        let mut tour = TourMachine::new();
        assert!(!tour.can_transition(TourEvent::Next));

        tour.transition(TourEvent::Start).expect("start");
        let err = tour
            .transition(TourEvent::Previous)
            .expect_err("no step before the first");
        assert!(matches!(
            err,
            TourError::InvalidTransition {
                from: TourState::Showing(0),
                event: TourEvent::Previous
            }
        ));
        assert!(!tour.can_transition(TourEvent::Done));
        assert_eq!(tour.state(), TourState::Showing(0));
    }

    #[test]
    fn progress_label_counts_from_one() {
        assert_eq!(crate::tour::progress_label(0), "1 of 4");
        assert_eq!(crate::tour::progress_label(3), "4 of 4");
    }
}
