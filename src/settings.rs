/// Application settings
///
/// Settings are stored as JSON in the user's data directory:
/// - Linux: ~/.local/share/crackscan/settings.json
/// - macOS: ~/Library/Application Support/crackscan/settings.json
/// - Windows: %APPDATA%\crackscan\settings.json
///
/// A missing or unreadable settings file is never an error; defaults are used.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{InspectError, Result};
use crate::state::record::DEFAULT_CRACK_THRESHOLD;

/// Directory name used under the data and cache directories
pub const APP_DIR_NAME: &str = "crackscan";

/// Classifier artifact looked up when no path is configured
pub const MODEL_FILE_NAME: &str = "crack_detection_model.onnx";

/// How embedded geotags are reported
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GeoTagMode {
    /// Decode real GPS coordinates from EXIF
    #[default]
    Decode,
    /// Report a fixed coordinate string whenever any EXIF data is present
    Placeholder,
}

impl std::str::FromStr for GeoTagMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "decode" => Ok(GeoTagMode::Decode),
            "placeholder" => Ok(GeoTagMode::Placeholder),
            other => Err(format!("unknown geotag mode '{}'", other)),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Classifier artifact
    pub model_path: PathBuf,
    /// Scan history JSON file
    pub history_path: PathBuf,
    /// Where overlay PNGs are written
    pub overlay_dir: PathBuf,
    pub geotag_mode: GeoTagMode,
    /// Sort survey folders by file name instead of filesystem order
    pub sort_batch_input: bool,
    /// Confidence strictly above this is a crack
    pub crack_threshold: f32,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = app_data_dir();
        Self {
            model_path: data_dir.join(MODEL_FILE_NAME),
            history_path: data_dir.join("history.json"),
            overlay_dir: app_cache_dir().join("overlays"),
            geotag_mode: GeoTagMode::default(),
            sort_batch_input: false,
            crack_threshold: DEFAULT_CRACK_THRESHOLD,
        }
    }
}

impl Settings {
    /// Default location of the settings file
    pub fn default_path() -> PathBuf {
        app_data_dir().join("settings.json")
    }

    /// Load settings, falling back to defaults when the file is absent or corrupt
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(Some(settings)) => settings,
            Ok(None) => Self::default(),
            Err(e) => {
                tracing::warn!("⚠️  Ignoring settings file: {}", e);
                Self::default()
            }
        }
    }

    /// Load settings; `Ok(None)` when the file does not exist
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(path).map_err(|e| InspectError::io(path, e))?;
        let mut settings: Settings =
            serde_json::from_str(&json).map_err(|e| InspectError::Persistence {
                path: path.to_path_buf(),
                source: e,
            })?;
        settings.sanitize();

        Ok(Some(settings))
    }

    /// Reset values that can't be used to their defaults
    fn sanitize(&mut self) {
        if !(0.0..=1.0).contains(&self.crack_threshold) {
            tracing::warn!(
                "⚠️  crack_threshold {} is outside [0, 1], using {}",
                self.crack_threshold,
                DEFAULT_CRACK_THRESHOLD
            );
            self.crack_threshold = DEFAULT_CRACK_THRESHOLD;
        }
    }

    /// Write settings as pretty JSON, creating the parent directory
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| InspectError::io(parent, e))?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| InspectError::Persistence {
            path: path.to_path_buf(),
            source: e,
        })?;

        fs::write(path, json).map_err(|e| InspectError::io(path, e))?;
        tracing::info!("💾 Settings saved to {}", path.display());
        Ok(())
    }
}

/// Application data directory (not created)
pub fn app_data_dir() -> PathBuf {
    let mut path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));

    path.push(APP_DIR_NAME);
    path
}

/// Application cache directory (not created)
pub fn app_cache_dir() -> PathBuf {
    let mut path = dirs_next::cache_dir()
        .or_else(dirs_next::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));

    path.push(APP_DIR_NAME);
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_or_default(&dir.path().join("settings.json"));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.crack_threshold, 0.5);
        assert!(!settings.sort_batch_input);
        assert_eq!(settings.geotag_mode, GeoTagMode::Decode);
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(Settings::load(&path).is_err());
        assert_eq!(Settings::load_or_default(&path), Settings::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "geotag_mode": "placeholder", "sort_batch_input": true }"#).unwrap();

        let settings = Settings::load_or_default(&path);
        assert_eq!(settings.geotag_mode, GeoTagMode::Placeholder);
        assert!(settings.sort_batch_input);
        assert_eq!(settings.history_path, Settings::default().history_path);
    }

    #[test]
    fn test_out_of_range_threshold_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "crack_threshold": 3.0, "sort_batch_input": true }"#).unwrap();

        let settings = Settings::load(&path).unwrap().unwrap();
        assert_eq!(settings.crack_threshold, DEFAULT_CRACK_THRESHOLD);
        assert!(settings.sort_batch_input);

        fs::write(&path, r#"{ "crack_threshold": -0.25 }"#).unwrap();
        assert_eq!(Settings::load_or_default(&path).crack_threshold, DEFAULT_CRACK_THRESHOLD);

        fs::write(&path, r#"{ "crack_threshold": 0.8 }"#).unwrap();
        assert_eq!(Settings::load_or_default(&path).crack_threshold, 0.8);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.crack_threshold = 0.7;
        settings.model_path = PathBuf::from("/models/crack.onnx");
        settings.save(&path).unwrap();

        let restored = Settings::load(&path).unwrap().unwrap();
        assert_eq!(settings, restored);
    }

    #[test]
    fn test_geotag_mode_parsing() {
        assert_eq!("decode".parse::<GeoTagMode>(), Ok(GeoTagMode::Decode));
        assert_eq!("Placeholder".parse::<GeoTagMode>(), Ok(GeoTagMode::Placeholder));
        assert!("gps".parse::<GeoTagMode>().is_err());
    }
}
