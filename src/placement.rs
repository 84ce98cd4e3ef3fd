use crate::geometry::Point;
use crate::model::IconId;
use crate::zoom::{Viewport, Zoom};

/// Canvas position of a glyph dropped with the pointer at `pointer`, grabbed
/// `grab_offset` screen points from its top-left corner.
pub fn drop_position(pointer: Point, canvas_origin: Point, grab_offset: Point, zoom: Zoom) -> Point {
    (pointer - canvas_origin - grab_offset) / zoom.factor()
}

/// An icon held down by the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct IconDrag {
    pub icon: IconId,
    press_pointer: Point,
    start: Point,
}

impl IconDrag {
    pub fn new(icon: IconId, press_pointer: Point, start: Point) -> Self {
        Self {
            icon,
            press_pointer,
            start,
        }
    }

    /// Position for the current pointer. The viewport is passed in by the
    /// caller on every event so a zoom change mid-drag is picked up.
    pub fn target(&self, pointer: Point, viewport: &Viewport) -> Point {
        self.start + viewport.to_canvas_delta(pointer - self.press_pointer)
    }

    pub fn start(&self) -> Point {
        self.start
    }
}
