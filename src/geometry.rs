//! Plain 2D primitives shared by the editor core.
//!
//! Nothing here knows about egui; the UI converts to and from `egui::Pos2`
//! at the edge.

use std::ops::{Add, Div, Mul, Sub};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Point) -> f32 {
        (other - self).length()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Point {
    type Output = Point;

    fn mul(self, rhs: f32) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Point {
    type Output = Point;

    fn div(self, rhs: f32) -> Point {
        Point::new(self.x / rhs, self.y / rhs)
    }
}

/// Sum of the Euclidean lengths of consecutive point pairs.
pub fn polyline_length(points: &[Point]) -> f32 {
    points
        .iter()
        .tuple_windows()
        .map(|(a, b)| a.distance(*b))
        .sum()
}

/// Shortest distance from `p` to the segment `a..b`.
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let ab = b - a;
    let len_sq = ab.x * ab.x + ab.y * ab.y;
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let ap = p - a;
    let t = ((ap.x * ab.x + ap.y * ab.y) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// `f32::INFINITY` for fewer than two points.
pub fn distance_to_polyline(p: Point, points: &[Point]) -> f32 {
    points
        .iter()
        .tuple_windows()
        .map(|(a, b)| distance_to_segment(p, *a, *b))
        .fold(f32::INFINITY, f32::min)
}
