//! Cable length per group.
//!
//! Geometry is measured in canvas units, the same space the scale is
//! calibrated in, so totals do not depend on the zoom at report time.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::calibration::Scale;
use crate::diagram::Diagram;
use crate::geometry::polyline_length;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measure {
    Meters(f32),
    Pixels(f32),
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measure::Meters(v) => write!(f, "{v:.2} m"),
            Measure::Pixels(v) => write!(f, "{v:.2} px"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupLength {
    pub group: String,
    /// Summed polyline length, canvas units.
    pub pixels: f32,
    /// Sum of member icons' cable drops, meters.
    pub drop_allowance: f32,
    pub total: Measure,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CableReport {
    pub groups: Vec<GroupLength>,
}

impl CableReport {
    pub fn is_calibrated(&self) -> bool {
        self.groups
            .first()
            .is_some_and(|g| matches!(g.total, Measure::Meters(_)))
    }
}

impl fmt::Display for CableReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.groups.is_empty() {
            return f.write_str("No grouped lines. Give both ends of a line the same group.");
        }
        for (i, group) in self.groups.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "Group {}: {}", group.group, group.total)?;
            if matches!(group.total, Measure::Meters(_)) && group.drop_allowance > 0.0 {
                write!(f, " (drops: {:.2} m)", group.drop_allowance)?;
            }
        }
        Ok(())
    }
}

/// Sums grouped line lengths. Each icon's cable drop counts once for its
/// group, no matter how many lines touch it.
pub fn aggregate(diagram: &Diagram, scale: Option<&Scale>) -> CableReport {
    let mut pixels: BTreeMap<&str, f32> = BTreeMap::new();
    for line in diagram.lines() {
        let Some(group) = diagram.line_group(line) else {
            continue;
        };
        let Some(points) = diagram.polyline(line) else {
            continue;
        };
        *pixels.entry(group).or_insert(0.0) += polyline_length(&points);
    }

    let mut counted = BTreeSet::new();
    let mut drops: BTreeMap<&str, f32> = BTreeMap::new();
    for icon in diagram.icons() {
        let (Some(group), Some(params)) = (icon.group(), icon.params.as_ref()) else {
            continue;
        };
        if pixels.contains_key(group) && counted.insert(&icon.id) {
            *drops.entry(group).or_insert(0.0) += params.cable_drop();
        }
    }

    let groups = pixels
        .into_iter()
        .map(|(group, length)| {
            let drop_allowance = drops.get(group).copied().unwrap_or(0.0);
            let total = match scale {
                Some(scale) => Measure::Meters(scale.to_meters(length) + drop_allowance),
                None => Measure::Pixels(length),
            };
            GroupLength {
                group: group.to_string(),
                pixels: length,
                drop_allowance,
                total,
            }
        })
        .collect();

    CableReport { groups }
}
