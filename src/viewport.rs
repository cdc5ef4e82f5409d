use crate::config::ViewportConfig;
use crate::projection::Point;

/// Axis-aligned rectangle in map coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    /// Finite, strictly positive width and height.
    pub fn has_area(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Formats the rectangle as an SVG `viewBox` attribute.
    pub fn to_view_box(&self) -> String {
        format!("{} {} {} {}", self.x, self.y, self.width, self.height)
    }
}

/// Pixel size of the element the map is drawn into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSize {
    pub width: f64,
    pub height: f64,
}

impl SurfaceSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Owns the visible window into a fixed-size map coordinate space.
///
/// Every mutation is followed by clamping: the size stays within
/// `[min_zoom_fraction, 1.0]` of the full extent and the origin may overshoot
/// an edge by at most `edge_allowance` of the current size, so the map can
/// never leave the view entirely.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportController {
    full: Rect,
    current: Rect,
    config: ViewportConfig,
}

impl ViewportController {
    pub fn new(full: Rect) -> Self {
        Self::with_config(full, ViewportConfig::default())
    }

    pub fn with_config(full: Rect, config: ViewportConfig) -> Self {
        if !full.has_area() {
            log::warn!("degenerate viewport extent {full:?}");
        }
        Self {
            full,
            current: full,
            config,
        }
    }

    pub fn viewport(&self) -> Rect {
        self.current
    }

    pub fn full_extent(&self) -> Rect {
        self.full
    }

    /// Current width relative to the full extent; 1.0 when fully zoomed out.
    pub fn zoom_fraction(&self) -> f64 {
        if !self.full.has_area() {
            return 1.0;
        }
        self.current.width / self.full.width
    }

    pub fn is_zoomed(&self) -> bool {
        self.zoom_fraction() < 1.0 - f64::EPSILON
    }

    /// Scales the viewport by `factor` (< 1 zooms in) keeping `focus` at the
    /// same relative position. Defaults to the viewport center.
    pub fn zoom_by(&mut self, factor: f64, focus: Option<Point>) -> Rect {
        if !factor.is_finite() || factor <= 0.0 {
            return self.current;
        }

        let focus = focus.unwrap_or_else(|| self.current.center());
        let old = self.current;

        let width = self.clamp_size(old.width * factor, self.full.width);
        let height = self.clamp_size(old.height * factor, self.full.height);

        let rel_x = if old.width > 0.0 {
            (focus.x - old.x) / old.width
        } else {
            0.5
        };
        let rel_y = if old.height > 0.0 {
            (focus.y - old.y) / old.height
        } else {
            0.5
        };

        self.current = self.clamp(Rect::new(
            focus.x - rel_x * width,
            focus.y - rel_y * height,
            width,
            height,
        ));
        self.current
    }

    pub fn reset_to_full_extent(&mut self) -> Rect {
        log::debug!("viewport reset to full extent");
        self.current = self.full;
        self.current
    }

    /// Translates by a fraction of the current size, so pan speed does not
    /// depend on the zoom level or surface resolution.
    pub fn pan(&mut self, dx_fraction: f64, dy_fraction: f64) -> Rect {
        if !dx_fraction.is_finite() || !dy_fraction.is_finite() {
            return self.current;
        }

        let old = self.current;
        self.current = self.clamp(Rect::new(
            old.x + dx_fraction * old.width,
            old.y + dy_fraction * old.height,
            old.width,
            old.height,
        ));
        self.current
    }

    /// Zooms in on `at`, or resets when already zoomed past the reset threshold.
    pub fn double_tap(&mut self, at: Point) -> Rect {
        if self.zoom_fraction() < self.config.reset_threshold {
            self.reset_to_full_extent()
        } else {
            self.zoom_by(self.config.double_tap_zoom, Some(at))
        }
    }

    /// Converts a surface pixel position into map coordinates.
    pub fn screen_to_map(&self, screen: Point, surface: SurfaceSize) -> Point {
        let fx = if surface.width > 0.0 {
            screen.x / surface.width
        } else {
            0.5
        };
        let fy = if surface.height > 0.0 {
            screen.y / surface.height
        } else {
            0.5
        };

        Point::new(
            self.current.x + fx * self.current.width,
            self.current.y + fy * self.current.height,
        )
    }

    fn clamp_size(&self, value: f64, full: f64) -> f64 {
        let min = (full * self.config.min_zoom_fraction).min(full);
        clamp_range(value, min, full)
    }

    fn clamp(&self, rect: Rect) -> Rect {
        let allowance = self.config.edge_allowance.clamp(0.0, 0.5);
        let width = self.clamp_size(rect.width, self.full.width);
        let height = self.clamp_size(rect.height, self.full.height);

        let min_x = self.full.x - allowance * width;
        let max_x = self.full.right() - (1.0 - allowance) * width;
        let min_y = self.full.y - allowance * height;
        let max_y = self.full.bottom() - (1.0 - allowance) * height;

        Rect::new(
            clamp_range(rect.x, min_x, max_x),
            clamp_range(rect.y, min_y, max_y),
            width,
            height,
        )
    }
}

/// `f64::clamp` that settles on the midpoint of an inverted or NaN range.
fn clamp_range(value: f64, min: f64, max: f64) -> f64 {
    if min <= max {
        value.clamp(min, max)
    } else {
        (min + max) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> Rect {
        Rect::new(0.0, 0.0, 1000.0, 800.0)
    }

    fn assert_close(left: f64, right: f64) {
        assert!((left - right).abs() < 1e-9, "{left} != {right}");
    }

    #[test]
    fn zoom_around_center_then_reset() {
        let mut controller = ViewportController::new(full());

        let zoomed = controller.zoom_by(0.5, Some(Point::new(500.0, 400.0)));
        assert_eq!(zoomed.width, 500.0);
        assert_eq!(zoomed.height, 400.0);
        assert_eq!(zoomed.center(), Point::new(500.0, 400.0));

        assert_eq!(controller.reset_to_full_extent(), full());
    }

    #[test]
    fn zoom_defaults_to_viewport_center() {
        let mut controller = ViewportController::new(full());
        let zoomed = controller.zoom_by(0.5, None);

        assert_eq!(zoomed, Rect::new(250.0, 200.0, 500.0, 400.0));
    }

    #[test]
    fn zoom_preserves_relative_focus_position() {
        let mut controller = ViewportController::new(full());
        controller.zoom_by(0.6, Some(Point::new(400.0, 300.0)));

        let focus = Point::new(430.0, 350.0);
        let before = controller.viewport();
        let after = controller.zoom_by(0.8, Some(focus));

        assert_close(
            (focus.x - before.x) / before.width,
            (focus.x - after.x) / after.width,
        );
        assert_close(
            (focus.y - before.y) / before.height,
            (focus.y - after.y) / after.height,
        );
    }

    #[test]
    fn zoom_is_bounded_both_ways() {
        let mut controller = ViewportController::new(full());

        for _ in 0..20 {
            controller.zoom_by(0.5, Some(Point::new(10.0, 10.0)));
        }
        assert_close(controller.viewport().width, 150.0);
        assert_close(controller.viewport().height, 120.0);

        for _ in 0..20 {
            controller.zoom_by(3.0, None);
        }
        assert_eq!(controller.viewport().width, 1000.0);
        assert_eq!(controller.viewport().height, 800.0);
    }

    #[test]
    fn pan_is_a_fraction_of_current_size() {
        let mut controller = ViewportController::new(full());
        controller.zoom_by(0.5, None);

        let panned = controller.pan(0.1, -0.1);
        assert_close(panned.x, 300.0);
        assert_close(panned.y, 160.0);
    }

    #[test]
    fn pan_overshoot_is_limited_to_ten_percent() {
        let mut controller = ViewportController::new(full());
        controller.zoom_by(0.5, None);

        let left = controller.pan(-10.0, -10.0);
        assert_close(left.x, -50.0);
        assert_close(left.y, -40.0);

        let right = controller.pan(100.0, 100.0);
        assert_close(right.x, 1000.0 - 0.9 * 500.0);
        assert_close(right.y, 800.0 - 0.9 * 400.0);
        assert!(right.intersects(&full()));
    }

    #[test]
    fn invalid_inputs_are_absorbed() {
        let mut controller = ViewportController::new(full());

        assert_eq!(controller.zoom_by(f64::NAN, None), full());
        assert_eq!(controller.zoom_by(-2.0, None), full());
        assert_eq!(controller.pan(f64::INFINITY, 0.0), full());
    }

    #[test]
    fn double_tap_zooms_in_then_resets() {
        let mut controller = ViewportController::new(full());
        let tap = Point::new(500.0, 400.0);

        let zoomed = controller.double_tap(tap);
        assert_close(zoomed.width, 400.0);
        assert_eq!(zoomed.center(), tap);

        assert_eq!(controller.double_tap(tap), full());
        assert!(!controller.is_zoomed());
    }

    #[test]
    fn screen_points_map_into_current_viewport() {
        let mut controller = ViewportController::new(full());
        controller.zoom_by(0.5, None);

        let point = controller.screen_to_map(Point::new(100.0, 80.0), SurfaceSize::new(200.0, 160.0));
        assert_eq!(point, Point::new(500.0, 400.0));
    }

    #[test]
    fn view_box_attribute_formatting() {
        assert_eq!(full().to_view_box(), "0 0 1000 800");
    }

    #[test]
    fn degenerate_extents_never_panic() {
        let mut inverted = ViewportController::new(Rect::new(0.0, 0.0, -1000.0, 800.0));
        let panned = inverted.pan(0.1, 0.0);
        assert!(panned.x.is_finite());
        inverted.zoom_by(0.5, Some(Point::new(10.0, 10.0)));
        inverted.double_tap(Point::new(0.0, 0.0));

        let mut undefined = ViewportController::new(Rect::new(0.0, 0.0, f64::NAN, 800.0));
        undefined.zoom_by(0.5, None);
        undefined.pan(0.2, 0.2);
        assert_eq!(undefined.zoom_fraction(), 1.0);
    }
}
