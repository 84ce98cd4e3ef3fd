use crate::geometry::Point;

const MIN_TENTHS: u8 = 5;
const MAX_TENTHS: u8 = 30;
const DEFAULT_TENTHS: u8 = 10;

/// Uniform canvas zoom, 0.5..=3.0 in steps of 0.1.
///
/// Kept as a count of tenths so repeated steps never accumulate float error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zoom {
    tenths: u8,
}

impl Default for Zoom {
    fn default() -> Self {
        Self {
            tenths: DEFAULT_TENTHS,
        }
    }
}

impl Zoom {
    pub const MIN: f32 = MIN_TENTHS as f32 / 10.0;
    pub const MAX: f32 = MAX_TENTHS as f32 / 10.0;

    /// Nearest step to `factor`, clamped to the allowed range.
    pub fn from_factor(factor: f32) -> Self {
        let tenths = if factor.is_finite() {
            (factor * 10.0)
                .round()
                .clamp(MIN_TENTHS as f32, MAX_TENTHS as f32) as u8
        } else {
            DEFAULT_TENTHS
        };
        Self { tenths }
    }

    pub fn factor(self) -> f32 {
        self.tenths as f32 / 10.0
    }

    pub fn percent(self) -> u32 {
        self.tenths as u32 * 10
    }

    /// Returns `false` when already at the upper bound.
    pub fn zoom_in(&mut self) -> bool {
        let next = (self.tenths + 1).min(MAX_TENTHS);
        let changed = next != self.tenths;
        self.tenths = next;
        changed
    }

    /// Returns `false` when already at the lower bound.
    pub fn zoom_out(&mut self) -> bool {
        let next = self.tenths.saturating_sub(1).max(MIN_TENTHS);
        let changed = next != self.tenths;
        self.tenths = next;
        changed
    }
}

/// Maps between zoom-invariant canvas units and screen points.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    /// Screen position of the canvas panel's top-left corner.
    pub origin: Point,
    /// Screen offset of canvas (0, 0) from `origin`.
    pub pan: Point,
    pub zoom: Zoom,
}

impl Viewport {
    /// Screen position of canvas (0, 0).
    pub fn canvas_origin(&self) -> Point {
        self.origin + self.pan
    }

    pub fn to_screen(&self, canvas: Point) -> Point {
        self.canvas_origin() + canvas * self.zoom.factor()
    }

    pub fn to_canvas(&self, screen: Point) -> Point {
        (screen - self.canvas_origin()) / self.zoom.factor()
    }

    /// Shifts the view by a screen delta.
    pub fn pan_by(&mut self, delta: Point) {
        self.pan = self.pan + delta;
    }

    pub fn to_canvas_delta(&self, delta: Point) -> Point {
        delta / self.zoom.factor()
    }

    pub fn scale(&self, length: f32) -> f32 {
        length * self.zoom.factor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_steps_in_and_out_round_trip() {
        let mut zoom = Zoom::default();
        for _ in 0..10 {
            assert!(zoom.zoom_in());
        }
        assert_eq!(zoom.factor(), 2.0);
        for _ in 0..10 {
            assert!(zoom.zoom_out());
        }
        assert_eq!(zoom, Zoom::default());
        assert_eq!(zoom.factor(), 1.0);
    }

    #[test]
    fn clamps_at_bounds() {
        let mut zoom = Zoom::default();
        for _ in 0..40 {
            zoom.zoom_in();
        }
        assert_eq!(zoom.factor(), Zoom::MAX);
        assert!(!zoom.zoom_in());
        assert_eq!(zoom.factor(), 3.0);

        for _ in 0..40 {
            zoom.zoom_out();
        }
        assert_eq!(zoom.factor(), Zoom::MIN);
        assert!(!zoom.zoom_out());
        assert_eq!(zoom.factor(), 0.5);
    }

    #[test]
    fn from_factor_rounds_and_clamps() {
        assert_eq!(Zoom::from_factor(1.26).factor(), 1.3);
        assert_eq!(Zoom::from_factor(0.1).factor(), 0.5);
        assert_eq!(Zoom::from_factor(12.0).factor(), 3.0);
        assert_eq!(Zoom::from_factor(f32::NAN), Zoom::default());
        assert_eq!(Zoom::from_factor(1.5).percent(), 150);
    }

    #[test]
    fn viewport_transforms_are_inverse() {
        let viewport = Viewport {
            origin: Point::new(200.0, 80.0),
            zoom: Zoom::from_factor(1.5),
            ..Default::default()
        };
        let canvas = Point::new(40.0, 60.0);
        let screen = viewport.to_screen(canvas);
        assert_eq!(screen, Point::new(260.0, 170.0));
        assert_eq!(viewport.to_canvas(screen), canvas);
        assert_eq!(viewport.to_canvas_delta(Point::new(15.0, -30.0)), Point::new(10.0, -20.0));
    }

    #[test]
    fn repeated_projection_does_not_drift() {
        let viewport = Viewport {
            origin: Point::new(13.0, 7.0),
            zoom: Zoom::from_factor(1.7),
            ..Default::default()
        };
        let canvas = Point::new(70.0, 70.0);
        let first = viewport.to_screen(canvas);
        let second = viewport.to_screen(canvas);
        assert_eq!(first, second);
    }

    #[test]
    fn panned_view_round_trips() {
        let mut viewport = Viewport {
            origin: Point::new(100.0, 50.0),
            zoom: Zoom::from_factor(2.0),
            ..Default::default()
        };
        viewport.pan_by(Point::new(-300.0, -120.0));
        viewport.pan_by(Point::new(20.0, 0.0));
        assert_eq!(viewport.pan, Point::new(-280.0, -120.0));

        // Far corner of a zoomed plan brought back into the panel.
        let canvas = Point::new(600.0, 400.0);
        let screen = viewport.to_screen(canvas);
        assert_eq!(screen, Point::new(1020.0, 730.0));
        assert_eq!(viewport.to_canvas(screen), canvas);
    }
}
