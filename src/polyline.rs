//! Bend points on lines.
//!
//! A line renders as `[center(from), vertices.., center(to)]`. Vertices are
//! stored in canvas units and never follow icon movement.

use crate::diagram::Diagram;
use crate::error::{EditorError, Result};
use crate::geometry::Point;
use crate::model::{Line, LineId};

impl Diagram {
    /// Canvas-space point list of a line, `None` if an endpoint is gone.
    pub fn polyline(&self, line: &Line) -> Option<Vec<Point>> {
        let start = self.icon_center(&line.from)?;
        let end = self.icon_center(&line.to)?;
        let mut points = Vec::with_capacity(line.vertices.len() + 2);
        points.push(start);
        points.extend_from_slice(&line.vertices);
        points.push(end);
        Some(points)
    }

    /// Appends a vertex to the end of the line's vertex list and returns its
    /// index.
    pub fn insert_vertex(&mut self, line: LineId, point: Point) -> Result<usize> {
        let line = self.line_mut(line)?;
        line.vertices.push(point);
        Ok(line.vertices.len() - 1)
    }

    pub fn move_vertex(&mut self, line: LineId, index: usize, point: Point) -> Result<()> {
        let vertex = self
            .line_mut(line)?
            .vertices
            .get_mut(index)
            .ok_or(EditorError::VertexOutOfRange { line, index })?;
        *vertex = point;
        Ok(())
    }

    pub fn delete_vertex(&mut self, line: LineId, index: usize) -> Result<Point> {
        let vertices = &mut self.line_mut(line)?.vertices;
        if index >= vertices.len() {
            return Err(EditorError::VertexOutOfRange { line, index });
        }
        Ok(vertices.remove(index))
    }

    pub fn vertex(&self, line: LineId, index: usize) -> Option<Point> {
        self.line(line)?.vertices.get(index).copied()
    }
}

/// A vertex being dragged. The grab offset keeps the vertex from jumping to
/// the pointer when it is pressed off-center.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexDrag {
    pub line: LineId,
    pub index: usize,
    grab_offset: Point,
    start: Point,
}

impl VertexDrag {
    pub fn new(line: LineId, index: usize, vertex: Point, pointer: Point) -> Self {
        Self {
            line,
            index,
            grab_offset: pointer - vertex,
            start: vertex,
        }
    }

    /// New vertex position for a pointer at `pointer` (canvas units).
    pub fn target(&self, pointer: Point) -> Point {
        pointer - self.grab_offset
    }

    pub fn start(&self) -> Point {
        self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ElementKind, IconId};
    use pretty_assertions::assert_eq;

    fn two_connected() -> (Diagram, LineId, IconId) {
        let mut diagram = Diagram::default();
        let a = diagram.place_icon(ElementKind::Bulb, Point::new(0.0, 0.0));
        let b = diagram.place_icon(ElementKind::Switch, Point::new(100.0, 0.0));
        let line = diagram.connect(&a, &b).unwrap();
        (diagram, line, a)
    }

    #[test]
    fn polyline_runs_center_to_center_through_vertices() {
        let (mut diagram, line, _) = two_connected();
        diagram.insert_vertex(line, Point::new(50.0, 80.0)).unwrap();
        diagram.insert_vertex(line, Point::new(90.0, 80.0)).unwrap();

        let points = diagram.polyline(diagram.line(line).unwrap()).unwrap();
        assert_eq!(
            points,
            vec![
                Point::new(20.0, 20.0),
                Point::new(50.0, 80.0),
                Point::new(90.0, 80.0),
                Point::new(120.0, 20.0),
            ]
        );
    }

    #[test]
    fn vertices_stay_put_when_an_endpoint_moves() {
        let (mut diagram, line, a) = two_connected();
        diagram.insert_vertex(line, Point::new(50.0, 80.0)).unwrap();
        diagram.move_icon(&a, Point::new(0.0, 200.0)).unwrap();

        let points = diagram.polyline(diagram.line(line).unwrap()).unwrap();
        assert_eq!(points[0], Point::new(20.0, 220.0));
        assert_eq!(points[1], Point::new(50.0, 80.0));
    }

    #[test]
    fn new_vertices_always_append() {
        let (mut diagram, line, _) = two_connected();
        assert_eq!(diagram.insert_vertex(line, Point::new(90.0, 0.0)).unwrap(), 0);
        assert_eq!(diagram.insert_vertex(line, Point::new(10.0, 0.0)).unwrap(), 1);
        assert_eq!(diagram.vertex(line, 1), Some(Point::new(10.0, 0.0)));
    }

    #[test]
    fn delete_vertex_shifts_later_ones_down() {
        let (mut diagram, line, _) = two_connected();
        for x in [10.0, 20.0, 30.0] {
            diagram.insert_vertex(line, Point::new(x, 0.0)).unwrap();
        }
        assert_eq!(diagram.delete_vertex(line, 1).unwrap(), Point::new(20.0, 0.0));
        assert_eq!(
            diagram.line(line).unwrap().vertices,
            vec![Point::new(10.0, 0.0), Point::new(30.0, 0.0)]
        );
        assert_eq!(
            diagram.delete_vertex(line, 5),
            Err(EditorError::VertexOutOfRange { line, index: 5 })
        );
    }

    #[test]
    fn removing_a_line_keeps_other_lines_vertices_aligned() {
        let mut diagram = Diagram::default();
        let ids: Vec<IconId> = (0..4)
            .map(|i| diagram.place_icon(ElementKind::Sensor, Point::new(i as f32 * 50.0, 0.0)))
            .collect();
        let first = diagram.connect(&ids[0], &ids[1]).unwrap();
        let second = diagram.connect(&ids[1], &ids[2]).unwrap();
        let third = diagram.connect(&ids[2], &ids[3]).unwrap();
        diagram.insert_vertex(first, Point::new(1.0, 1.0)).unwrap();
        diagram.insert_vertex(second, Point::new(2.0, 2.0)).unwrap();
        diagram.insert_vertex(third, Point::new(3.0, 3.0)).unwrap();

        let removed = diagram.remove_line_at(1).unwrap();
        assert_eq!(removed.id, second);
        assert_eq!(removed.vertices, vec![Point::new(2.0, 2.0)]);

        assert_eq!(diagram.line_index(third), Some(1));
        assert_eq!(diagram.lines()[1].vertices, vec![Point::new(3.0, 3.0)]);
        assert_eq!(diagram.lines()[0].vertices, vec![Point::new(1.0, 1.0)]);
    }

    #[test]
    fn vertex_drag_preserves_grab_offset() {
        let drag = VertexDrag::new(LineId::new(), 0, Point::new(50.0, 50.0), Point::new(53.0, 48.0));
        assert_eq!(drag.target(Point::new(63.0, 58.0)), Point::new(60.0, 60.0));
        assert_eq!(drag.start(), Point::new(50.0, 50.0));
    }
}
