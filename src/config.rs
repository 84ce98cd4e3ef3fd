use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::history::DEFAULT_DEPTH;

pub const TELEMETRY_URL_VAR: &str = "SCHEMAPLAN_TELEMETRY_URL";
pub const PDFIUM_LIB_VAR: &str = "SCHEMAPLAN_PDFIUM_LIB";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Endpoint receiving parameter and cable-length events.
    pub telemetry_url: Option<String>,
    pub pdfium_library: Option<PathBuf>,
    /// Backdrop rasterization density; 96 is one pixel per canvas unit.
    pub render_dpi: f32,
    pub show_grid: bool,
    pub history_depth: usize,
    pub log_filter: String,
    pub ui_scale: f32,
    /// Canvas zoom at startup, clamped to the supported range.
    pub default_zoom: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            telemetry_url: None,
            pdfium_library: None,
            render_dpi: 300.0,
            show_grid: true,
            history_depth: DEFAULT_DEPTH,
            log_filter: "info".to_string(),
            ui_scale: 1.0,
            default_zoom: 1.0,
        }
    }
}

impl Settings {
    /// Settings file, then environment overrides. A missing file is not an
    /// error.
    pub fn load() -> anyhow::Result<Self> {
        let mut settings = match Self::path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub fn path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "schemaplan").map(|dirs| dirs.config_dir().join("settings.json"))
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing settings in {}", path.display()))
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(TELEMETRY_URL_VAR).filter(|v| !v.trim().is_empty()) {
            self.telemetry_url = Some(url);
        }
        if let Some(lib) = lookup(PDFIUM_LIB_VAR).filter(|v| !v.trim().is_empty()) {
            self.pdfium_library = Some(PathBuf::from(lib));
        }
    }

    /// Factor applied to the PDF page when rasterizing.
    pub fn render_scale(&self) -> f32 {
        if self.render_dpi.is_finite() && self.render_dpi > 0.0 {
            self.render_dpi / 96.0
        } else {
            300.0 / 96.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = std::env::temp_dir().join(format!("schemaplan-config-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");
        fs::write(&path, r#"{ "telemetry_url": "http://localhost:9000/log", "show_grid": false }"#)
            .unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(
            settings,
            Settings {
                telemetry_url: Some("http://localhost:9000/log".into()),
                show_grid: false,
                ..Settings::default()
            }
        );
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = std::env::temp_dir().join(format!("schemaplan-config-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let err = Settings::from_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("settings.json"));
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut settings = Settings {
            telemetry_url: Some("http://file".into()),
            ..Settings::default()
        };
        settings.apply_overrides(|key| match key {
            TELEMETRY_URL_VAR => Some("http://env".into()),
            PDFIUM_LIB_VAR => Some(String::new()),
            _ => None,
        });
        assert_eq!(settings.telemetry_url.as_deref(), Some("http://env"));
        assert_eq!(settings.pdfium_library, None);
    }

    #[test]
    fn render_scale_defaults_to_300_dpi() {
        let mut settings = Settings::default();
        assert_eq!(settings.render_scale(), 300.0 / 96.0);
        settings.render_dpi = -1.0;
        assert_eq!(settings.render_scale(), 300.0 / 96.0);
        settings.render_dpi = 192.0;
        assert_eq!(settings.render_scale(), 2.0);
    }
}
