use crate::config::GestureConfig;
use crate::projection::Point;
use crate::viewport::{SurfaceSize, ViewportController};

/// Current phase of a touch sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureState {
    Idle,
    /// One finger down, not yet moved beyond the tap slop.
    Pressed { start: Point, last: Point },
    Dragging { last: Point },
    Pinching { distance: f64 },
}

/// What a completed touch sequence amounted to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureOutcome {
    Tap(Point),
    DoubleTap(Point),
    /// The sequence moved or pinched; any click it produces must be ignored.
    Gesture,
}

/// Turns raw touch events into viewport updates and tap classification.
///
/// Touch positions are in surface pixels relative to the map element.
/// Once a sequence has dragged or pinched it stays marked as a gesture until
/// the next sequence starts, which is what suppresses the trailing click.
#[derive(Debug, Clone)]
pub struct GestureTracker {
    state: GestureState,
    config: GestureConfig,
    surface: SurfaceSize,
    gestured: bool,
    last_tap: Option<(Point, f64)>,
}

impl GestureTracker {
    pub fn new(surface: SurfaceSize) -> Self {
        Self::with_config(surface, GestureConfig::default())
    }

    pub fn with_config(surface: SurfaceSize, config: GestureConfig) -> Self {
        Self {
            state: GestureState::Idle,
            config,
            surface,
            gestured: false,
            last_tap: None,
        }
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn set_surface(&mut self, surface: SurfaceSize) {
        self.surface = surface;
    }

    /// True while, or right after, a drag or pinch in the current sequence.
    pub fn gesture_in_progress(&self) -> bool {
        self.gestured
            || matches!(
                self.state,
                GestureState::Dragging { .. } | GestureState::Pinching { .. }
            )
    }

    pub fn touch_start(&mut self, touches: &[Point]) {
        match touches {
            [] => {}
            [only] => {
                if self.state == GestureState::Idle {
                    self.gestured = false;
                    self.state = GestureState::Pressed {
                        start: *only,
                        last: *only,
                    };
                }
            }
            [first, second, ..] => {
                self.gestured = true;
                self.state = GestureState::Pinching {
                    distance: first.distance_to(*second),
                };
            }
        }
    }

    /// Applies a move event. Returns true when the viewport changed.
    pub fn touch_move(&mut self, touches: &[Point], viewport: &mut ViewportController) -> bool {
        match (self.state, touches) {
            (GestureState::Pinching { distance }, [first, second, ..]) => {
                let next = first.distance_to(*second);
                self.state = GestureState::Pinching { distance: next };
                if distance <= 0.0 || next <= 0.0 {
                    return false;
                }
                let focus = viewport.screen_to_map(first.midpoint(*second), self.surface);
                // fingers moving apart shrink the viewport
                viewport.zoom_by(distance / next, Some(focus));
                true
            }
            (GestureState::Pressed { start, last }, [current, ..]) => {
                if start.distance_to(*current) <= self.config.tap_slop_px {
                    self.state = GestureState::Pressed {
                        start,
                        last: *current,
                    };
                    return false;
                }
                self.gestured = true;
                self.state = GestureState::Dragging { last: *current };
                self.pan_between(last, *current, viewport)
            }
            (GestureState::Dragging { last }, [current, ..]) => {
                self.state = GestureState::Dragging { last: *current };
                self.pan_between(last, *current, viewport)
            }
            _ => false,
        }
    }

    /// Applies an end event. `remaining` lists the touches still down and
    /// `time_ms` is the event timestamp used for double-tap detection.
    pub fn touch_end(
        &mut self,
        remaining: &[Point],
        time_ms: f64,
        viewport: &mut ViewportController,
    ) -> Option<GestureOutcome> {
        if let [still_down, ..] = remaining {
            if matches!(self.state, GestureState::Pinching { .. }) {
                self.state = GestureState::Dragging { last: *still_down };
            }
            return None;
        }

        let finished = self.state;
        self.state = GestureState::Idle;

        match finished {
            GestureState::Idle => None,
            GestureState::Pressed { last, .. } => Some(self.classify_tap(last, time_ms, viewport)),
            GestureState::Dragging { .. } | GestureState::Pinching { .. } => {
                self.last_tap = None;
                Some(GestureOutcome::Gesture)
            }
        }
    }

    pub fn touch_cancel(&mut self) {
        self.state = GestureState::Idle;
        self.last_tap = None;
    }

    fn classify_tap(
        &mut self,
        at: Point,
        time_ms: f64,
        viewport: &mut ViewportController,
    ) -> GestureOutcome {
        let is_double = self.last_tap.is_some_and(|(previous, previous_ms)| {
            time_ms - previous_ms <= self.config.double_tap_ms
                && previous.distance_to(at) <= self.config.tap_slop_px * 4.0
        });

        if is_double {
            self.last_tap = None;
            self.gestured = true;
            let focus = viewport.screen_to_map(at, self.surface);
            viewport.double_tap(focus);
            GestureOutcome::DoubleTap(at)
        } else {
            self.last_tap = Some((at, time_ms));
            GestureOutcome::Tap(at)
        }
    }

    fn pan_between(&self, from: Point, to: Point, viewport: &mut ViewportController) -> bool {
        if !viewport.is_zoomed() || self.surface.width <= 0.0 || self.surface.height <= 0.0 {
            return false;
        }
        // content follows the finger, so the window moves the opposite way
        viewport.pan(
            -(to.x - from.x) / self.surface.width,
            -(to.y - from.y) / self.surface.height,
        );
        true
    }
}
