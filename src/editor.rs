//! Interaction facade over the diagram.
//!
//! The UI forwards pointer events here in screen points; everything below
//! works in canvas units. Handlers read the current zoom and diagram on each
//! call rather than holding on to them between events.

use crate::calibration::{Calibrator, Scale};
use crate::diagram::{Diagram, Snapshot};
use crate::error::{EditorError, Result};
use crate::geometry::{distance_to_polyline, Point};
use crate::history::History;
use crate::lengths::{self, CableReport};
use crate::model::{ElementKind, Icon, IconId, IconParams, Line, LineId, ICON_EXTENT};
use crate::placement::{drop_position, IconDrag};
use crate::polyline::VertexDrag;
use crate::zoom::{Viewport, Zoom};

#[derive(Debug, Clone)]
enum Drag {
    Icon { drag: IconDrag, before: Snapshot },
    Vertex { drag: VertexDrag, before: Snapshot },
}

#[derive(Debug, Clone, Default)]
pub struct Editor {
    diagram: Diagram,
    pub viewport: Viewport,
    pub calibrator: Calibrator,
    history: History,
    drag: Option<Drag>,
}

impl Editor {
    pub fn new(history_depth: usize) -> Self {
        Self {
            history: History::new(history_depth),
            ..Default::default()
        }
    }

    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    pub fn zoom(&self) -> Zoom {
        self.viewport.zoom
    }

    pub fn set_canvas_origin(&mut self, origin: Point) {
        self.viewport.origin = origin;
    }

    /// Scrolls the plan under the panel by a screen delta.
    pub fn pan_by(&mut self, delta: Point) {
        self.viewport.pan_by(delta);
    }

    pub fn reset_view(&mut self) {
        self.viewport.pan = Point::ZERO;
    }

    pub fn zoom_in(&mut self) -> bool {
        let changed = self.viewport.zoom.zoom_in();
        if changed {
            tracing::debug!(zoom = self.viewport.zoom.factor(), "zoom in");
        }
        changed
    }

    pub fn zoom_out(&mut self) -> bool {
        let changed = self.viewport.zoom.zoom_out();
        if changed {
            tracing::debug!(zoom = self.viewport.zoom.factor(), "zoom out");
        }
        changed
    }

    /// Places a palette glyph released at `pointer`.
    pub fn drop_icon(&mut self, kind: ElementKind, pointer: Point, grab_offset: Point) -> IconId {
        let position = drop_position(pointer, self.viewport.canvas_origin(), grab_offset, self.viewport.zoom);
        self.history.record(self.diagram.snapshot());
        self.diagram.place_icon(kind, position)
    }

    pub fn click_icon(&mut self, id: &IconId) -> Result<Option<LineId>> {
        let before = self.diagram.snapshot();
        let created = self.diagram.click_icon(id)?;
        if created.is_some() {
            self.history.record(before);
        }
        Ok(created)
    }

    pub fn delete_icon(&mut self, id: &IconId) -> Result<()> {
        let before = self.diagram.snapshot();
        self.diagram.delete_icon(id)?;
        self.history.record(before);
        if matches!(&self.drag, Some(Drag::Icon { drag, .. }) if &drag.icon == id) {
            self.drag = None;
        }
        Ok(())
    }

    pub fn set_params(&mut self, id: &IconId, params: IconParams) -> Result<()> {
        let before = self.diagram.snapshot();
        self.diagram.set_params(id, params)?;
        self.history.record(before);
        Ok(())
    }

    pub fn press_icon(&mut self, id: &IconId, pointer: Point) -> Result<()> {
        let start = self
            .diagram
            .icon(id)
            .map(|icon| icon.position)
            .ok_or_else(|| EditorError::UnknownIcon(id.clone()))?;
        self.drag = Some(Drag::Icon {
            drag: IconDrag::new(id.clone(), pointer, start),
            before: self.diagram.snapshot(),
        });
        Ok(())
    }

    pub fn press_vertex(&mut self, line: LineId, index: usize, pointer: Point) -> Result<()> {
        let vertex = self
            .diagram
            .vertex(line, index)
            .ok_or(EditorError::VertexOutOfRange { line, index })?;
        self.drag = Some(Drag::Vertex {
            drag: VertexDrag::new(line, index, vertex, self.viewport.to_canvas(pointer)),
            before: self.diagram.snapshot(),
        });
        Ok(())
    }

    /// Pointer motion over the canvas: moves whatever is held and updates
    /// the calibration rubber band.
    pub fn pointer_moved(&mut self, pointer: Point) -> Result<()> {
        let canvas = self.viewport.to_canvas(pointer);
        self.calibrator.pointer_moved(canvas);
        match &self.drag {
            Some(Drag::Icon { drag, .. }) => {
                let target = drag.target(pointer, &self.viewport);
                let icon = drag.icon.clone();
                let touched = self.diagram.move_icon(&icon, target)?;
                tracing::trace!(%icon, lines = touched.len(), "icon dragged");
            }
            Some(Drag::Vertex { drag, .. }) => {
                let target = drag.target(canvas);
                self.diagram.move_vertex(drag.line, drag.index, target)?;
            }
            None => {}
        }
        Ok(())
    }

    /// Ends a drag. Returns `true` if something moved, in which case one undo
    /// step is recorded for the whole drag.
    pub fn release(&mut self) -> bool {
        let moved = match self.drag.take() {
            Some(Drag::Icon { drag, before }) => {
                let moved = self
                    .diagram
                    .icon(&drag.icon)
                    .is_some_and(|icon| icon.position != drag.start());
                moved.then_some(before)
            }
            Some(Drag::Vertex { drag, before }) => {
                let moved = self
                    .diagram
                    .vertex(drag.line, drag.index)
                    .is_some_and(|vertex| vertex != drag.start());
                moved.then_some(before)
            }
            None => None,
        };
        match moved {
            Some(before) => {
                self.history.record(before);
                true
            }
            None => false,
        }
    }

    pub fn clear_selection(&mut self) {
        self.diagram.clear_selection();
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Bends `line` at the screen position `pointer`.
    pub fn insert_vertex_at(&mut self, line: LineId, pointer: Point) -> Result<usize> {
        let before = self.diagram.snapshot();
        let index = self
            .diagram
            .insert_vertex(line, self.viewport.to_canvas(pointer))?;
        self.history.record(before);
        Ok(index)
    }

    pub fn delete_vertex(&mut self, line: LineId, index: usize) -> Result<()> {
        let before = self.diagram.snapshot();
        self.diagram.delete_vertex(line, index)?;
        self.history.record(before);
        Ok(())
    }

    pub fn remove_line(&mut self, line: LineId) -> Result<()> {
        let before = self.diagram.snapshot();
        self.diagram.remove_line(line)?;
        self.history.record(before);
        Ok(())
    }

    /// Screen-space rendering of a line.
    pub fn screen_polyline(&self, line: &Line) -> Option<Vec<Point>> {
        let points = self.diagram.polyline(line)?;
        Some(points.into_iter().map(|p| self.viewport.to_screen(p)).collect())
    }

    /// Screen top-left and side length of an icon.
    pub fn icon_screen_bounds(&self, icon: &Icon) -> (Point, f32) {
        (
            self.viewport.to_screen(icon.position),
            self.viewport.scale(ICON_EXTENT),
        )
    }

    /// Topmost line whose stroke is within `tolerance` screen points.
    pub fn line_at(&self, pointer: Point, tolerance: f32) -> Option<LineId> {
        self.diagram.lines().iter().rev().find_map(|line| {
            let points = self.screen_polyline(line)?;
            (distance_to_polyline(pointer, &points) <= tolerance).then_some(line.id)
        })
    }

    pub fn calibration_click(&mut self, pointer: Point) -> bool {
        let canvas = self.viewport.to_canvas(pointer);
        self.calibrator.click(canvas)
    }

    pub fn confirm_calibration(&mut self, input: &str) -> Result<Scale> {
        self.calibrator.confirm(input)
    }

    pub fn cable_report(&self) -> CableReport {
        lengths::aggregate(&self.diagram, self.calibrator.scale())
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        self.drag = None;
        self.history.undo(&mut self.diagram)
    }

    pub fn redo(&mut self) -> bool {
        self.drag = None;
        self.history.redo(&mut self.diagram)
    }
}
