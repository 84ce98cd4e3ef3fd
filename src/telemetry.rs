//! Fire-and-forget reporting of icon parameters and cable lengths.

use once_cell::sync::Lazy;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;

use crate::lengths::{CableReport, Measure};
use crate::model::{ElementKind, IconParams};

static CLIENT: Lazy<reqwest::blocking::Client> = Lazy::new(reqwest::blocking::Client::new);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParameterRecord {
    #[serde(rename = "elementType")]
    pub element_type: ElementKind,
    pub group: String,
    pub name: String,
    pub voltage: String,
    #[serde(rename = "Type")]
    pub kind: String,
    pub power: String,
    pub interface: String,
    pub cable: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LengthRecord {
    #[serde(rename = "elementType")]
    pub element_type: &'static str,
    pub group: String,
    pub length: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TelemetryEvent {
    Parameters(ParameterRecord),
    CableLength(LengthRecord),
}

impl TelemetryEvent {
    /// `None` for element kinds whose parameters are not reported.
    pub fn parameters(kind: ElementKind, params: &IconParams) -> Option<Self> {
        kind.reports_parameters().then(|| {
            TelemetryEvent::Parameters(ParameterRecord {
                element_type: kind,
                group: params.group.clone(),
                name: params.name.clone(),
                voltage: params.voltage.clone(),
                kind: params.kind.clone(),
                power: params.power.clone(),
                interface: params.interface.clone(),
                cable: params.cable.clone(),
            })
        })
    }

    /// One event per group, and only for a calibrated report.
    pub fn cable_lengths(report: &CableReport) -> Vec<Self> {
        report
            .groups
            .iter()
            .filter_map(|group| match group.total {
                Measure::Meters(meters) => Some(TelemetryEvent::CableLength(LengthRecord {
                    element_type: "cableLength",
                    group: group.group.clone(),
                    length: format!("{meters:.2}"),
                })),
                Measure::Pixels(_) => None,
            })
            .collect()
    }
}

pub trait TelemetrySink {
    fn publish(&self, event: TelemetryEvent);
}

/// Posts events as plain-text JSON on a background thread. Failures are
/// logged and otherwise ignored.
#[derive(Debug, Clone, Default)]
pub struct HttpTelemetry {
    url: Option<String>,
}

impl HttpTelemetry {
    pub fn new(url: Option<String>) -> Self {
        Self {
            url: url.filter(|u| !u.trim().is_empty()),
        }
    }
}

impl TelemetrySink for HttpTelemetry {
    fn publish(&self, event: TelemetryEvent) {
        let body = match serde_json::to_string(&event) {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(%err, "telemetry event not serializable");
                return;
            }
        };
        let Some(url) = self.url.clone() else {
            tracing::debug!(%body, "no telemetry endpoint configured, dropping event");
            return;
        };
        std::thread::spawn(move || {
            let result = CLIENT
                .post(&url)
                .header(CONTENT_TYPE, "text/plain;charset=utf-8")
                .body(body)
                .send();
            match result {
                Ok(response) => {
                    tracing::debug!(status = %response.status(), "telemetry delivered")
                }
                Err(err) => tracing::warn!(%err, "telemetry post failed"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lengths::GroupLength;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::{Duration, Instant};

    #[test]
    fn parameter_event_uses_wire_field_names() {
        let params = IconParams {
            group: "L1".into(),
            name: "Hall".into(),
            voltage: "230".into(),
            kind: "LED".into(),
            power: "12".into(),
            interface: String::new(),
            cable: "1.5".into(),
        };
        let event = TelemetryEvent::parameters(ElementKind::Bulb, &params).unwrap();
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "elementType": "bulb",
                "Group": "L1",
                "Name": "Hall",
                "Voltage": "230",
                "Type": "LED",
                "Power": "12",
                "Interface": "",
                "Cable": "1.5",
            })
        );
    }

    #[test]
    fn panel_parameters_are_not_reported() {
        assert_eq!(
            TelemetryEvent::parameters(ElementKind::MainPanel, &IconParams::default()),
            None
        );
    }

    fn report(total: Measure) -> CableReport {
        CableReport {
            groups: vec![GroupLength {
                group: "A".into(),
                pixels: 200.0,
                drop_allowance: 0.0,
                total,
            }],
        }
    }

    #[test]
    fn cable_length_events_only_when_calibrated() {
        let events = TelemetryEvent::cable_lengths(&report(Measure::Meters(10.0)));
        assert_eq!(
            serde_json::to_value(&events[0]).unwrap(),
            json!({ "elementType": "cableLength", "Group": "A", "Length": "10.00" })
        );
        assert!(TelemetryEvent::cable_lengths(&report(Measure::Pixels(200.0))).is_empty());
    }

    #[test]
    fn blank_url_means_disabled() {
        assert_eq!(HttpTelemetry::new(Some("  ".into())).url, None);
        // Publishing without an endpoint must not panic or block.
        HttpTelemetry::default().publish(TelemetryEvent::cable_lengths(&report(
            Measure::Meters(1.0),
        ))[0].clone());
    }

    #[test]
    fn unreachable_endpoint_leaves_report_untouched() {
        let telemetry = HttpTelemetry::new(Some("http://127.0.0.1:1/log".into()));
        let report = report(Measure::Meters(12.5));
        let before = report.to_string();

        let started = Instant::now();
        for event in TelemetryEvent::cable_lengths(&report) {
            telemetry.publish(event);
        }
        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(report.to_string(), before);
    }
}
