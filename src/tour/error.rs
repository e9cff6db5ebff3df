use super::machine::{TourEvent, TourState};
use thiserror::Error;

pub type TourResult<T> = std::result::Result<T, TourError>;

#[derive(Debug, Error)]
pub enum TourError {
    #[error("invalid tour transition: from {from:?} using event {event:?}")]
    InvalidTransition { from: TourState, event: TourEvent },
}
