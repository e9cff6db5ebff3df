//! Pointer-drag crop selection over the preview surface.

use crate::geometry::{CropRegion, PercentPoint, SurfaceBounds};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        origin: PercentPoint,
    },
}

/// Idle/Dragging machine fed by surface pointer events.
///
/// Move and release events are expected from the whole window, not only the
/// surface, so a drag that leaves the surface keeps tracking; the internal
/// state alone decides whether they have any effect.
#[derive(Debug, Default)]
pub struct DragSelector {
    state: DragState,
}

impl DragSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Starts a drag at a surface-relative pixel position.
    ///
    /// Returns `false` and stays idle when the surface has no usable size.
    pub fn pointer_down(&mut self, px_x: f64, px_y: f64, bounds: SurfaceBounds) -> bool {
        let Some(origin) = bounds.to_percent(px_x, px_y) else {
            tracing::debug!(?bounds, "ignoring drag start on unusable preview surface");
            return false;
        };
        tracing::trace!(?origin, "crop drag started");
        self.state = DragState::Dragging { origin };
        true
    }

    /// Region spanned by the drag origin and the current pointer position.
    pub fn pointer_move(
        &mut self,
        px_x: f64,
        px_y: f64,
        bounds: SurfaceBounds,
    ) -> Option<CropRegion> {
        let DragState::Dragging { origin } = self.state else {
            return None;
        };
        let current = bounds.to_percent(px_x, px_y)?;
        Some(CropRegion::from_corners(origin, current))
    }

    pub fn pointer_up(&mut self) {
        if self.is_dragging() {
            tracing::trace!("crop drag finished");
        }
        self.state = DragState::Idle;
    }
}
