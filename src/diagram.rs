//! Icons, the lines between them and the pending click selection.
//!
//! Lines only reference icons by id; endpoint coordinates are resolved from
//! the icons every time they are needed, so moving an icon never rewrites a
//! line.

use crate::error::{EditorError, Result};
use crate::geometry::Point;
use crate::model::{ElementKind, Icon, IconId, IconParams, Line, LineId};

#[derive(Debug, Clone, Default)]
pub struct Diagram {
    icons: Vec<Icon>,
    lines: Vec<Line>,
    pending: Vec<IconId>,
}

/// Copy of the undoable part of a diagram.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    icons: Vec<Icon>,
    lines: Vec<Line>,
}

impl Diagram {
    pub fn icons(&self) -> &[Icon] {
        &self.icons
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn icon(&self, id: &IconId) -> Option<&Icon> {
        self.icons.iter().find(|icon| &icon.id == id)
    }

    fn icon_mut(&mut self, id: &IconId) -> Result<&mut Icon> {
        self.icons
            .iter_mut()
            .find(|icon| &icon.id == id)
            .ok_or_else(|| EditorError::UnknownIcon(id.clone()))
    }

    pub fn line(&self, id: LineId) -> Option<&Line> {
        self.lines.iter().find(|line| line.id == id)
    }

    pub(crate) fn line_mut(&mut self, id: LineId) -> Result<&mut Line> {
        self.lines
            .iter_mut()
            .find(|line| line.id == id)
            .ok_or(EditorError::UnknownLine(id))
    }

    pub fn line_index(&self, id: LineId) -> Option<usize> {
        self.lines.iter().position(|line| line.id == id)
    }

    pub fn pending_selection(&self) -> &[IconId] {
        &self.pending
    }

    pub fn clear_selection(&mut self) {
        self.pending.clear();
    }

    /// Adds an icon at `position` and returns its freshly generated id.
    pub fn place_icon(&mut self, kind: ElementKind, position: Point) -> IconId {
        let id = self.generate_id(kind);
        tracing::debug!(%id, x = position.x, y = position.y, "placed icon");
        self.icons.push(Icon {
            id: id.clone(),
            kind,
            position,
            params: None,
        });
        id
    }

    fn generate_id(&self, kind: ElementKind) -> IconId {
        let base = format!("{kind}-{}", chrono::Utc::now().timestamp_millis());
        let mut candidate = IconId::new(base.clone());
        let mut suffix = 1;
        while self.icon(&candidate).is_some() {
            candidate = IconId::new(format!("{base}-{suffix}"));
            suffix += 1;
        }
        candidate
    }

    /// Repositions an icon and returns the lines that end on it.
    pub fn move_icon(&mut self, id: &IconId, position: Point) -> Result<Vec<LineId>> {
        self.icon_mut(id)?.position = position;
        Ok(self.incident_lines(id).collect())
    }

    pub fn incident_lines<'a>(&'a self, id: &'a IconId) -> impl Iterator<Item = LineId> + 'a {
        self.lines
            .iter()
            .filter(move |line| line.touches(id))
            .map(|line| line.id)
    }

    /// Removes an icon together with every line that touches it.
    pub fn delete_icon(&mut self, id: &IconId) -> Result<Icon> {
        let index = self
            .icons
            .iter()
            .position(|icon| &icon.id == id)
            .ok_or_else(|| EditorError::UnknownIcon(id.clone()))?;
        let icon = self.icons.remove(index);
        let before = self.lines.len();
        self.lines.retain(|line| !line.touches(id));
        self.pending.retain(|pending| pending != id);
        tracing::debug!(%id, removed_lines = before - self.lines.len(), "deleted icon");
        Ok(icon)
    }

    pub fn set_params(&mut self, id: &IconId, params: IconParams) -> Result<()> {
        self.icon_mut(id)?.params = Some(params);
        Ok(())
    }

    /// Registers a click on an icon. The second distinct icon clicked in a
    /// row is connected to the first one.
    pub fn click_icon(&mut self, id: &IconId) -> Result<Option<LineId>> {
        if self.icon(id).is_none() {
            return Err(EditorError::UnknownIcon(id.clone()));
        }
        match self.pending.first().cloned() {
            None => {
                self.pending.push(id.clone());
                Ok(None)
            }
            Some(first) if &first == id => {
                self.pending.clear();
                Ok(None)
            }
            Some(first) => {
                self.pending.clear();
                self.connect(&first, id).map(Some)
            }
        }
    }

    pub fn connect(&mut self, from: &IconId, to: &IconId) -> Result<LineId> {
        for id in [from, to] {
            if self.icon(id).is_none() {
                return Err(EditorError::UnknownIcon(id.clone()));
            }
        }
        let id = LineId::new();
        self.lines.push(Line {
            id,
            from: from.clone(),
            to: to.clone(),
            vertices: Vec::new(),
        });
        tracing::debug!(line = %id, %from, %to, "connected icons");
        Ok(id)
    }

    /// Removes the line at `index`; later lines shift down and keep their
    /// own vertices.
    pub fn remove_line_at(&mut self, index: usize) -> Result<Line> {
        if index >= self.lines.len() {
            return Err(EditorError::LineIndexOutOfRange(index));
        }
        Ok(self.lines.remove(index))
    }

    pub fn remove_line(&mut self, id: LineId) -> Result<Line> {
        let index = self.line_index(id).ok_or(EditorError::UnknownLine(id))?;
        self.remove_line_at(index)
    }

    pub fn icon_center(&self, id: &IconId) -> Option<Point> {
        self.icon(id).map(Icon::center)
    }

    /// Shared group of both endpoints, if they agree.
    pub fn line_group(&self, line: &Line) -> Option<&str> {
        let from = self.icon(&line.from)?.group()?;
        let to = self.icon(&line.to)?.group()?;
        (from == to).then_some(from)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            icons: self.icons.clone(),
            lines: self.lines.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: Snapshot) {
        self.icons = snapshot.icons;
        self.lines = snapshot.lines;
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_icons(count: usize) -> (Diagram, Vec<IconId>) {
        let mut diagram = Diagram::default();
        let ids = (0..count)
            .map(|i| diagram.place_icon(ElementKind::Bulb, Point::new(i as f32 * 100.0, 0.0)))
            .collect();
        (diagram, ids)
    }

    fn grouped(group: &str) -> IconParams {
        IconParams {
            group: group.into(),
            ..Default::default()
        }
    }

    #[test]
    fn generated_ids_are_unique() {
        let (diagram, ids) = with_icons(5);
        for (i, id) in ids.iter().enumerate() {
            assert!(id.as_str().starts_with("bulb-"));
            assert!(!ids[i + 1..].contains(id));
        }
        assert_eq!(diagram.icons().len(), 5);
    }

    #[test]
    fn each_click_pair_creates_one_line_in_click_order() {
        let (mut diagram, ids) = with_icons(4);

        assert_eq!(diagram.click_icon(&ids[2]).unwrap(), None);
        let first = diagram.click_icon(&ids[0]).unwrap().unwrap();
        assert!(diagram.pending_selection().is_empty());

        assert_eq!(diagram.click_icon(&ids[1]).unwrap(), None);
        let second = diagram.click_icon(&ids[3]).unwrap().unwrap();

        assert_eq!(diagram.lines().len(), 2);
        let first = diagram.line(first).unwrap();
        assert_eq!((&first.from, &first.to), (&ids[2], &ids[0]));
        let second = diagram.line(second).unwrap();
        assert_eq!((&second.from, &second.to), (&ids[1], &ids[3]));
    }

    #[test]
    fn clicking_the_pending_icon_again_cancels() {
        let (mut diagram, ids) = with_icons(1);
        diagram.click_icon(&ids[0]).unwrap();
        assert_eq!(diagram.click_icon(&ids[0]).unwrap(), None);
        assert!(diagram.pending_selection().is_empty());
        assert!(diagram.lines().is_empty());
    }

    #[test]
    fn clicking_unknown_icon_fails() {
        let mut diagram = Diagram::default();
        let ghost = IconId::new("ghost");
        assert_eq!(diagram.click_icon(&ghost), Err(EditorError::UnknownIcon(ghost)));
    }

    #[test]
    fn deleting_icon_removes_only_incident_lines() {
        let (mut diagram, ids) = with_icons(4);
        let ab = diagram.connect(&ids[0], &ids[1]).unwrap();
        let bc = diagram.connect(&ids[1], &ids[2]).unwrap();
        let cd = diagram.connect(&ids[2], &ids[3]).unwrap();
        let da = diagram.connect(&ids[3], &ids[0]).unwrap();

        diagram.click_icon(&ids[1]).unwrap();
        diagram.delete_icon(&ids[1]).unwrap();

        let remaining: Vec<LineId> = diagram.lines().iter().map(|l| l.id).collect();
        assert_eq!(remaining, vec![cd, da]);
        assert!(diagram.line(ab).is_none());
        assert!(diagram.line(bc).is_none());
        assert!(diagram.pending_selection().is_empty());
        assert!(diagram.icon(&ids[1]).is_none());
    }

    #[test]
    fn moving_icon_reports_incident_lines_and_keeps_references() {
        let (mut diagram, ids) = with_icons(3);
        let ab = diagram.connect(&ids[0], &ids[1]).unwrap();
        diagram.connect(&ids[1], &ids[2]).unwrap();

        let touched = diagram.move_icon(&ids[0], Point::new(5.0, 5.0)).unwrap();
        assert_eq!(touched, vec![ab]);
        let line = diagram.line(ab).unwrap();
        assert_eq!((&line.from, &line.to), (&ids[0], &ids[1]));
        assert_eq!(diagram.icon_center(&ids[0]), Some(Point::new(25.0, 25.0)));
    }

    #[test]
    fn remove_line_at_checks_bounds() {
        let (mut diagram, ids) = with_icons(2);
        diagram.connect(&ids[0], &ids[1]).unwrap();
        assert_eq!(diagram.remove_line_at(3), Err(EditorError::LineIndexOutOfRange(3)));
        diagram.remove_line_at(0).unwrap();
        assert!(diagram.lines().is_empty());
    }

    #[test]
    fn line_group_requires_matching_groups() {
        let (mut diagram, ids) = with_icons(3);
        let ab = diagram.connect(&ids[0], &ids[1]).unwrap();
        let bc = diagram.connect(&ids[1], &ids[2]).unwrap();
        diagram.set_params(&ids[0], grouped("A")).unwrap();
        diagram.set_params(&ids[1], grouped("A")).unwrap();
        diagram.set_params(&ids[2], grouped("B")).unwrap();

        let ab = diagram.line(ab).unwrap().clone();
        let bc = diagram.line(bc).unwrap().clone();
        assert_eq!(diagram.line_group(&ab), Some("A"));
        assert_eq!(diagram.line_group(&bc), None);
    }

    #[test]
    fn restore_replaces_contents_and_clears_selection() {
        let (mut diagram, ids) = with_icons(2);
        let saved = diagram.snapshot();
        diagram.connect(&ids[0], &ids[1]).unwrap();
        diagram.click_icon(&ids[0]).unwrap();

        diagram.restore(saved.clone());
        assert!(diagram.lines().is_empty());
        assert!(diagram.pending_selection().is_empty());
        assert_eq!(diagram.snapshot(), saved);
    }
}
