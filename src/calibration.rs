//! Two-point scale calibration.
//!
//! The user marks a reference segment on the backdrop and types its real
//! length. Points are canvas units, so the resulting scale is independent
//! of the zoom it was measured at.

use crate::error::{EditorError, Result};
use crate::geometry::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalibrationMode {
    /// Two separate clicks.
    #[default]
    ClickPair,
    /// Click, move with a rubber band, click again.
    Drag,
}

impl CalibrationMode {
    pub fn label(self) -> &'static str {
        match self {
            CalibrationMode::ClickPair => "Two clicks",
            CalibrationMode::Drag => "Rubber band",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CalibrationState {
    #[default]
    Idle,
    FirstPointArmed { start: Point },
    Dragging { start: Point, current: Point },
    AwaitingDistance { start: Point, end: Point },
}

/// Pixels-per-meter factor and the segment it was measured on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub start: Point,
    pub end: Point,
    pub pixels_per_meter: f32,
}

impl Scale {
    pub fn from_reference(start: Point, end: Point, meters: f32) -> Result<Self> {
        if !meters.is_finite() || meters <= 0.0 {
            return Err(EditorError::InvalidDistance(meters.to_string()));
        }
        let pixels = start.distance(end);
        if pixels <= f32::EPSILON {
            return Err(EditorError::DegenerateReference);
        }
        Ok(Self {
            start,
            end,
            pixels_per_meter: pixels / meters,
        })
    }

    pub fn to_meters(&self, pixels: f32) -> f32 {
        pixels / self.pixels_per_meter
    }
}

/// Parses a user-typed distance in meters. Accepts a decimal comma.
pub fn parse_distance(input: &str) -> Result<f32> {
    let trimmed = input.trim();
    trimmed
        .replace(',', ".")
        .parse::<f32>()
        .ok()
        .filter(|meters| meters.is_finite() && *meters > 0.0)
        .ok_or_else(|| EditorError::InvalidDistance(trimmed.to_string()))
}

#[derive(Debug, Clone, Default)]
pub struct Calibrator {
    pub mode: CalibrationMode,
    enabled: bool,
    state: CalibrationState,
    scale: Option<Scale>,
}

impl Calibrator {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn scale(&self) -> Option<&Scale> {
        self.scale.as_ref()
    }

    pub fn awaiting_distance(&self) -> bool {
        matches!(self.state, CalibrationState::AwaitingDistance { .. })
    }

    /// Turns calibration on, or off again discarding any half-finished
    /// reference.
    pub fn toggle(&mut self) {
        if self.enabled {
            self.cancel();
        } else {
            self.enabled = true;
            self.state = CalibrationState::Idle;
        }
    }

    /// Leaves calibration without touching the existing scale.
    pub fn cancel(&mut self) {
        self.enabled = false;
        self.state = CalibrationState::Idle;
    }

    /// Canvas click while calibrating. Returns `true` if it was consumed.
    pub fn click(&mut self, point: Point) -> bool {
        if !self.enabled {
            return false;
        }
        self.state = match (self.state, self.mode) {
            (CalibrationState::Idle, CalibrationMode::ClickPair) => {
                CalibrationState::FirstPointArmed { start: point }
            }
            (CalibrationState::Idle, CalibrationMode::Drag) => CalibrationState::Dragging {
                start: point,
                current: point,
            },
            (CalibrationState::FirstPointArmed { start }, _)
            | (CalibrationState::Dragging { start, .. }, _) => {
                CalibrationState::AwaitingDistance { start, end: point }
            }
            (awaiting @ CalibrationState::AwaitingDistance { .. }, _) => awaiting,
        };
        true
    }

    /// Rubber-band update while dragging.
    pub fn pointer_moved(&mut self, point: Point) {
        if let CalibrationState::Dragging { current, .. } = &mut self.state {
            *current = point;
        }
    }

    /// Segment to draw as a preview, if any.
    pub fn preview(&self) -> Option<(Point, Point)> {
        match self.state {
            CalibrationState::Dragging { start, current } => Some((start, current)),
            CalibrationState::AwaitingDistance { start, end } => Some((start, end)),
            _ => None,
        }
    }

    /// Binds the pending reference segment to `input` meters. On error the
    /// segment stays pending so the user can correct the value.
    pub fn confirm(&mut self, input: &str) -> Result<Scale> {
        let CalibrationState::AwaitingDistance { start, end } = self.state else {
            return Err(EditorError::NoPendingReference);
        };
        let meters = parse_distance(input)?;
        let scale = match Scale::from_reference(start, end, meters) {
            Ok(scale) => scale,
            Err(err) => {
                self.cancel();
                return Err(err);
            }
        };
        tracing::info!(
            pixels_per_meter = scale.pixels_per_meter,
            meters,
            "scale calibrated"
        );
        self.scale = Some(scale);
        self.cancel();
        Ok(scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn armed(mode: CalibrationMode) -> Calibrator {
        let mut calibrator = Calibrator {
            mode,
            ..Default::default()
        };
        calibrator.toggle();
        calibrator
    }

    #[test]
    fn click_pair_produces_twenty_pixels_per_meter() {
        let mut calibrator = armed(CalibrationMode::ClickPair);
        assert!(calibrator.click(Point::new(0.0, 0.0)));
        assert_eq!(
            calibrator.state(),
            CalibrationState::FirstPointArmed {
                start: Point::new(0.0, 0.0)
            }
        );
        calibrator.click(Point::new(100.0, 0.0));
        assert!(calibrator.awaiting_distance());

        let scale = calibrator.confirm("5").unwrap();
        assert_eq!(scale.pixels_per_meter, 20.0);
        assert_eq!(scale.to_meters(200.0), 10.0);
        assert_eq!(calibrator.state(), CalibrationState::Idle);
        assert!(!calibrator.is_enabled());
        assert_eq!(calibrator.scale(), Some(&scale));
    }

    #[test]
    fn drag_mode_tracks_rubber_band() {
        let mut calibrator = armed(CalibrationMode::Drag);
        calibrator.click(Point::new(10.0, 10.0));
        calibrator.pointer_moved(Point::new(40.0, 50.0));
        assert_eq!(
            calibrator.preview(),
            Some((Point::new(10.0, 10.0), Point::new(40.0, 50.0)))
        );
        calibrator.click(Point::new(40.0, 50.0));
        let scale = calibrator.confirm("2,5").unwrap();
        assert_eq!(scale.pixels_per_meter, 20.0);
    }

    #[test]
    fn cancelling_after_one_point_records_nothing() {
        let mut calibrator = armed(CalibrationMode::ClickPair);
        calibrator.click(Point::new(0.0, 0.0));
        calibrator.toggle();
        assert_eq!(calibrator.state(), CalibrationState::Idle);
        assert!(!calibrator.is_enabled());
        assert!(calibrator.scale().is_none());
        assert!(!calibrator.click(Point::new(5.0, 5.0)));
    }

    #[test]
    fn invalid_distances_are_rejected_and_keep_the_reference() {
        let mut calibrator = armed(CalibrationMode::ClickPair);
        calibrator.click(Point::new(0.0, 0.0));
        calibrator.click(Point::new(100.0, 0.0));

        for input in ["abc", "0", "-3", "NaN", "", "inf"] {
            assert!(
                matches!(calibrator.confirm(input), Err(EditorError::InvalidDistance(_))),
                "{input:?} accepted"
            );
            assert!(calibrator.awaiting_distance());
        }
        assert!(calibrator.scale().is_none());
    }

    #[test]
    fn zero_length_reference_is_rejected() {
        let mut calibrator = armed(CalibrationMode::ClickPair);
        calibrator.click(Point::new(3.0, 3.0));
        calibrator.click(Point::new(3.0, 3.0));
        assert_eq!(calibrator.confirm("1"), Err(EditorError::DegenerateReference));
        assert!(calibrator.scale().is_none());
        assert_eq!(calibrator.state(), CalibrationState::Idle);
    }

    #[test]
    fn recalibration_overwrites_scale() {
        let mut calibrator = armed(CalibrationMode::ClickPair);
        calibrator.click(Point::new(0.0, 0.0));
        calibrator.click(Point::new(100.0, 0.0));
        calibrator.confirm("5").unwrap();

        calibrator.toggle();
        calibrator.click(Point::new(0.0, 0.0));
        calibrator.click(Point::new(0.0, 300.0));
        calibrator.confirm("10").unwrap();
        assert_eq!(calibrator.scale().map(|s| s.pixels_per_meter), Some(30.0));
    }

    #[test]
    fn confirm_without_reference_fails() {
        let mut calibrator = Calibrator::default();
        assert_eq!(calibrator.confirm("5"), Err(EditorError::NoPendingReference));
    }
}
