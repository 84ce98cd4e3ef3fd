use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::geometry::Point;

/// Side length of every placed icon, in canvas units.
pub const ICON_EXTENT: f32 = 40.0;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ElementKind {
    Bulb,
    Sensor,
    Switch,
    MainPanel,
}

impl ElementKind {
    pub fn label(self) -> &'static str {
        match self {
            ElementKind::Bulb => "Bulb",
            ElementKind::Sensor => "Sensor",
            ElementKind::Switch => "Switch",
            ElementKind::MainPanel => "Main panel",
        }
    }

    /// Panels are the feed point, not a consumer, so their parameters are
    /// kept local.
    pub fn reports_parameters(self) -> bool {
        self != ElementKind::MainPanel
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IconId(String);

impl IconId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IconId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineId(Uuid);

impl LineId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LineId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parameters entered for an icon, stored verbatim as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconParams {
    pub group: String,
    pub name: String,
    pub voltage: String,
    pub kind: String,
    pub power: String,
    pub interface: String,
    /// Vertical cable drop at the icon, meters.
    pub cable: String,
}

impl IconParams {
    pub fn group(&self) -> Option<&str> {
        let group = self.group.trim();
        (!group.is_empty()).then_some(group)
    }

    /// Zero when empty or not a number.
    pub fn cable_drop(&self) -> f32 {
        self.cable
            .trim()
            .replace(',', ".")
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(0.0)
    }

    /// Non-empty fields as `(label, value)` pairs, in form order.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        [
            ("Group", self.group.as_str()),
            ("Name", self.name.as_str()),
            ("Voltage", self.voltage.as_str()),
            ("Type", self.kind.as_str()),
            ("Power", self.power.as_str()),
            ("Interface", self.interface.as_str()),
            ("Cable", self.cable.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Icon {
    pub id: IconId,
    pub kind: ElementKind,
    /// Top-left corner, canvas units.
    pub position: Point,
    pub params: Option<IconParams>,
}

impl Icon {
    pub fn center(&self) -> Point {
        self.position + Point::new(ICON_EXTENT / 2.0, ICON_EXTENT / 2.0)
    }

    pub fn group(&self) -> Option<&str> {
        self.params.as_ref().and_then(IconParams::group)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub id: LineId,
    pub from: IconId,
    pub to: IconId,
    /// Bend points in insertion order, canvas units.
    pub vertices: Vec<Point>,
}

impl Line {
    pub fn touches(&self, icon: &IconId) -> bool {
        &self.from == icon || &self.to == icon
    }
}
