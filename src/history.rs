use crate::diagram::{Diagram, Snapshot};

pub const DEFAULT_DEPTH: usize = 50;

/// Bounded undo/redo stacks of diagram snapshots.
#[derive(Debug, Clone)]
pub struct History {
    undo: Vec<Snapshot>,
    redo: Vec<Snapshot>,
    depth: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_DEPTH)
    }
}

impl History {
    pub fn new(depth: usize) -> Self {
        Self {
            undo: vec![],
            redo: vec![],
            depth: depth.max(1),
        }
    }

    /// Records the state before a change.
    pub fn record(&mut self, snapshot: Snapshot) {
        self.undo.push(snapshot);
        if self.undo.len() > self.depth {
            self.undo.remove(0);
        }
        self.redo.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo(&mut self, diagram: &mut Diagram) -> bool {
        let Some(snapshot) = self.undo.pop() else {
            return false;
        };
        self.redo.push(diagram.snapshot());
        diagram.restore(snapshot);
        true
    }

    pub fn redo(&mut self, diagram: &mut Diagram) -> bool {
        let Some(snapshot) = self.redo.pop() else {
            return false;
        };
        self.undo.push(diagram.snapshot());
        diagram.restore(snapshot);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::model::ElementKind;

    #[test]
    fn undo_then_redo_round_trips() {
        let mut diagram = Diagram::default();
        let mut history = History::default();

        history.record(diagram.snapshot());
        let id = diagram.place_icon(ElementKind::Switch, Point::new(1.0, 2.0));

        assert!(history.undo(&mut diagram));
        assert!(diagram.icons().is_empty());
        assert!(history.can_redo());

        assert!(history.redo(&mut diagram));
        assert_eq!(diagram.icons()[0].id, id);
        assert!(!history.redo(&mut diagram));
    }

    #[test]
    fn depth_bound_drops_oldest() {
        let mut diagram = Diagram::default();
        let mut history = History::new(2);
        for i in 0..3 {
            history.record(diagram.snapshot());
            diagram.place_icon(ElementKind::Bulb, Point::new(i as f32, 0.0));
        }
        assert!(history.undo(&mut diagram));
        assert!(history.undo(&mut diagram));
        assert!(!history.undo(&mut diagram));
        assert_eq!(diagram.icons().len(), 1);
    }

    #[test]
    fn recording_clears_redo() {
        let mut diagram = Diagram::default();
        let mut history = History::default();
        history.record(diagram.snapshot());
        diagram.place_icon(ElementKind::Bulb, Point::ZERO);
        history.undo(&mut diagram);
        history.record(diagram.snapshot());
        assert!(!history.can_redo());
    }
}
