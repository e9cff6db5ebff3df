/// Percentage-space primitives shared by the selector, the form and the preview surface.

pub const PERCENT_MIN: f64 = 0.0;
pub const PERCENT_MAX: f64 = 100.0;

pub fn clamp_percent(value: f64) -> f64 {
    value.clamp(PERCENT_MIN, PERCENT_MAX)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentPoint {
    pub x: f64,
    pub y: f64,
}

impl PercentPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Allocated size of the preview surface in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceBounds {
    pub width: f64,
    pub height: f64,
}

impl SurfaceBounds {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Converts a surface-relative pointer position into clamped percentages.
    ///
    /// Returns `None` for a hidden or zero-sized surface, where the division
    /// would not produce a finite value.
    pub fn to_percent(&self, px_x: f64, px_y: f64) -> Option<PercentPoint> {
        if !self.is_usable() || !px_x.is_finite() || !px_y.is_finite() {
            return None;
        }
        Some(PercentPoint::new(
            clamp_percent(px_x / self.width * PERCENT_MAX),
            clamp_percent(px_y / self.height * PERCENT_MAX),
        ))
    }
}

/// Rectangular crop area in whole percent of the preview surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x_start: i32,
    pub x_end: i32,
    pub y_start: i32,
    pub y_end: i32,
}

impl CropRegion {
    pub const FULL: CropRegion = CropRegion::new(0, 100, 0, 100);

    pub const fn new(x_start: i32, x_end: i32, y_start: i32, y_end: i32) -> Self {
        Self {
            x_start,
            x_end,
            y_start,
            y_end,
        }
    }

    /// Builds a region spanning two corners in either order.
    ///
    /// Start edges take the minimum and end edges the maximum before rounding,
    /// so reverse-direction drags still produce an ordered region.
    pub fn from_corners(a: PercentPoint, b: PercentPoint) -> Self {
        Self {
            x_start: a.x.min(b.x).round() as i32,
            x_end: a.x.max(b.x).round() as i32,
            y_start: a.y.min(b.y).round() as i32,
            y_end: a.y.max(b.y).round() as i32,
        }
    }

    pub const fn is_ordered(&self) -> bool {
        self.x_start <= self.x_end && self.y_start <= self.y_end
    }
}

impl Default for CropRegion {
    fn default() -> Self {
        Self::FULL
    }
}

/// Overlay box placement in percent of the preview surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayBox {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl OverlayBox {
    pub fn for_region(region: CropRegion) -> Self {
        Self {
            left: region.x_start,
            top: region.y_start,
            width: extent(region.x_start, region.x_end),
            height: extent(region.y_start, region.y_end),
        }
    }

    /// Pixel rectangle `(x, y, width, height)` on a surface of the given size.
    pub fn to_pixels(self, bounds: SurfaceBounds) -> (f64, f64, f64, f64) {
        let scale_x = bounds.width / PERCENT_MAX;
        let scale_y = bounds.height / PERCENT_MAX;
        (
            f64::from(self.left) * scale_x,
            f64::from(self.top) * scale_y,
            f64::from(self.width) * scale_x,
            f64::from(self.height) * scale_y,
        )
    }

    /// CSS-like description, handy for status lines and logs.
    pub fn describe(&self) -> String {
        format!(
            "left: {}%; top: {}%; width: {}%; height: {}%",
            self.left, self.top, self.width, self.height
        )
    }
}

/// `end - start` floored at zero; coordinates are unbounded so the
/// difference is taken in `i64` and saturated back.
fn extent(start: i32, end: i32) -> i32 {
    let span = (i64::from(end) - i64::from(start)).max(0);
    i32::try_from(span).unwrap_or(i32::MAX)
}

impl Default for OverlayBox {
    fn default() -> Self {
        Self::for_region(CropRegion::FULL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_percent_clamps_positions_outside_the_surface() {
        let bounds = SurfaceBounds::new(200.0, 100.0);
        assert_eq!(
            bounds.to_percent(-40.0, 250.0),
            Some(PercentPoint::new(0.0, 100.0))
        );
        assert_eq!(
            bounds.to_percent(50.0, 25.0),
            Some(PercentPoint::new(25.0, 25.0))
        );
    }

    #[test]
    fn to_percent_rejects_zero_sized_surface() {
        assert_eq!(SurfaceBounds::new(0.0, 100.0).to_percent(1.0, 1.0), None);
        assert_eq!(SurfaceBounds::new(100.0, 0.0).to_percent(1.0, 1.0), None);
        assert_eq!(
            SurfaceBounds::new(f64::NAN, 100.0).to_percent(1.0, 1.0),
            None
        );
    }

    #[test]
    fn from_corners_orders_reverse_drags() {
        let region =
            CropRegion::from_corners(PercentPoint::new(80.0, 10.0), PercentPoint::new(20.0, 30.0));
        assert_eq!(region, CropRegion::new(20, 80, 10, 30));
        assert!(region.is_ordered());
    }

    #[test]
    fn from_corners_rounds_to_nearest_percent() {
        let region =
            CropRegion::from_corners(PercentPoint::new(10.4, 10.6), PercentPoint::new(49.5, 70.2));
        assert_eq!(region, CropRegion::new(10, 50, 11, 70));
    }

    #[test]
    fn overlay_box_floors_inverted_extent_at_zero() {
        let overlay = OverlayBox::for_region(CropRegion::new(60, 40, 90, 10));
        assert_eq!(overlay.left, 60);
        assert_eq!(overlay.top, 90);
        assert_eq!(overlay.width, 0);
        assert_eq!(overlay.height, 0);
    }

    #[test]
    fn overlay_box_handles_extreme_coordinates() {
        let overlay = OverlayBox::for_region(CropRegion::new(-5, i32::MAX, 70, 100));
        assert_eq!(overlay.left, -5);
        assert_eq!(overlay.width, i32::MAX);
        assert_eq!(overlay.height, 30);

        let overlay = OverlayBox::for_region(CropRegion::new(i32::MIN, 1, i32::MAX, i32::MIN));
        assert_eq!(overlay.width, i32::MAX);
        assert_eq!(overlay.height, 0);
    }

    #[test]
    fn overlay_box_maps_to_surface_pixels() {
        let overlay = OverlayBox::for_region(CropRegion::new(10, 60, 70, 100));
        let (x, y, w, h) = overlay.to_pixels(SurfaceBounds::new(400.0, 200.0));
        assert_eq!((x, y, w, h), (40.0, 140.0, 200.0, 60.0));
        assert_eq!(
            overlay.describe(),
            "left: 10%; top: 70%; width: 50%; height: 30%"
        );
    }
}
