use crate::backend::BackendError;
use crate::form::FormError;
use crate::inspect::InspectError;
use crate::preview::PreviewError;
use crate::run::RunError;
use crate::storage::StorageError;
use crate::tour::TourError;
use crate::url_state::UrlStateError;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    UrlState(#[from] UrlStateError),
    #[error(transparent)]
    Preview(#[from] PreviewError),
    #[error(transparent)]
    Run(#[from] RunError),
    #[error(transparent)]
    Inspect(#[from] InspectError),
    #[error(transparent)]
    Tour(#[from] TourError),
}
