use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::intake::FormKind;

pub const API_URL_ENV: &str = "GUESTBOOK_API_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuestbookConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub intake: IntakeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    #[serde(default)]
    pub read_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CameraConfig {
    #[serde(default)]
    pub device_id: i32,
    #[serde(default = "default_frame_width")]
    pub frame_width: u32,
    #[serde(default = "default_frame_height")]
    pub frame_height: u32,
    #[serde(default = "default_true")]
    pub mirrored: bool,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntakeConfig {
    #[serde(default = "default_redirect_delay_ms")]
    pub redirect_delay_ms: u64,
    #[serde(default)]
    pub default_tab: FormKind,
}

fn default_base_url() -> String { "http://localhost:8000/api".to_string() }
fn default_frame_width() -> u32 { 320 }
fn default_frame_height() -> u32 { 240 }
fn default_true() -> bool { true }
fn default_jpeg_quality() -> u8 { 92 }
fn default_redirect_delay_ms() -> u64 { 1000 }

impl Default for GuestbookConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            camera: CameraConfig::default(),
            intake: IntakeConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_secs: None,
            read_timeout_secs: None,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_id: 0,
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
            mirrored: default_true(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            redirect_delay_ms: default_redirect_delay_ms(),
            default_tab: FormKind::default(),
        }
    }
}

impl IntakeConfig {
    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }
}

impl GuestbookConfig {
    /// `$XDG_CONFIG_HOME/guestbook/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("guestbook").join("config.json"))
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the user config and apply environment overrides. Errors fall
    /// back to the defaults so the kiosk always starts.
    pub fn load_or_default() -> Self {
        let mut config = match Self::default_path() {
            Some(path) => match Self::load(&path) {
                Ok(config) => {
                    info!("Using configuration from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("{}; using defaults", e);
                    Self::default()
                }
            },
            None => Self::default(),
        };
        config.apply_api_url_override(std::env::var(API_URL_ENV).ok());
        config
    }

    pub fn apply_api_url_override(&mut self, url: Option<String>) {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            info!("API base URL overridden to {}", url);
            self.api.base_url = url;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().expect("tempdir");
        let config = GuestbookConfig::load(&dir.path().join("absent.json")).expect("load");
        assert_eq!(config, GuestbookConfig::default());
        assert_eq!(config.api.base_url, "http://localhost:8000/api");
        assert_eq!((config.camera.frame_width, config.camera.frame_height), (320, 240));
        assert_eq!(config.intake.redirect_delay(), Duration::from_millis(1000));
        assert_eq!(config.intake.default_tab, FormKind::Parent);
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let mut file = NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"api": {{"base_url": "http://10.0.0.5/api", "read_timeout_secs": 15}},
                "intake": {{"default_tab": "general"}}}}"#
        )
        .expect("write");

        let config = GuestbookConfig::load(file.path()).expect("load");
        assert_eq!(config.api.base_url, "http://10.0.0.5/api");
        assert_eq!(config.api.read_timeout_secs, Some(15));
        assert_eq!(config.api.connect_timeout_secs, None);
        assert!(config.camera.mirrored);
        assert_eq!(config.intake.default_tab, FormKind::General);
        assert_eq!(config.intake.redirect_delay_ms, 1000);
    }

    #[test]
    fn empty_object_equals_defaults() {
        let mut file = NamedTempFile::new().expect("temp file");
        write!(file, "{{}}").expect("write");

        let config = GuestbookConfig::load(file.path()).expect("load");
        assert_eq!(config, GuestbookConfig::default());
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = NamedTempFile::new().expect("temp file");
        write!(file, "{{ not json").expect("write");

        let err = GuestbookConfig::load(file.path()).expect_err("parse error");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn blank_override_is_ignored() {
        let mut config = GuestbookConfig::default();
        config.apply_api_url_override(Some("  ".to_string()));
        assert_eq!(config.api.base_url, "http://localhost:8000/api");

        config.apply_api_url_override(Some("https://tamu.sekolah.sch.id/api".to_string()));
        assert_eq!(config.api.base_url, "https://tamu.sekolah.sch.id/api");
    }
}
