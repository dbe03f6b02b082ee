//! Run configuration
//!
//! The four input directories plus pairing and logging options. Every field has a
//! default so a partial JSON file (or none at all) is enough to start a run.

use crate::error::ReconcileError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// How subject ids are matched against human-coding filenames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairingMode {
    /// Reject a subject id that matches more than one file in a directory
    #[default]
    Strict,
    /// Take the first match in sorted filename order
    Permissive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub log_level: String,
    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_level(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Automated per-frame annotation files (`<subject_id>_annotation.txt`)
    #[serde(default = "ReconcileConfig::default_automated_dir")]
    pub automated_dir: PathBuf,
    /// Human trial-definition files (`Trials.onset`, `Trials.offset`)
    #[serde(default = "ReconcileConfig::default_human_input_dir")]
    pub human_input_dir: PathBuf,
    /// Human aggregated looking-time files
    #[serde(default = "ReconcileConfig::default_human_output_dir")]
    pub human_output_dir: PathBuf,
    /// Session videos (`<subject_id>.<video_extension>`)
    #[serde(default = "ReconcileConfig::default_video_dir")]
    pub video_dir: PathBuf,
    #[serde(default = "ReconcileConfig::default_video_extension")]
    pub video_extension: String,
    #[serde(default)]
    pub pairing: PairingMode,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            automated_dir: Self::default_automated_dir(),
            human_input_dir: Self::default_human_input_dir(),
            human_output_dir: Self::default_human_output_dir(),
            video_dir: Self::default_video_dir(),
            video_extension: Self::default_video_extension(),
            pairing: PairingMode::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ReconcileConfig {
    fn default_automated_dir() -> PathBuf {
        PathBuf::from("annotations")
    }

    fn default_human_input_dir() -> PathBuf {
        PathBuf::from("human_input")
    }

    fn default_human_output_dir() -> PathBuf {
        PathBuf::from("human_output")
    }

    fn default_video_dir() -> PathBuf {
        PathBuf::from("videos")
    }

    fn default_video_extension() -> String {
        "mp4".to_string()
    }

    /// Parse configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, ReconcileError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self, ReconcileError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Named directories, in the order they are checked
    pub fn directories(&self) -> [(&'static str, &Path); 4] {
        [
            ("automated_dir", self.automated_dir.as_path()),
            ("human_input_dir", self.human_input_dir.as_path()),
            ("human_output_dir", self.human_output_dir.as_path()),
            ("video_dir", self.video_dir.as_path()),
        ]
    }

    /// Check that every configured directory exists
    pub fn validate(&self) -> Result<(), ReconcileError> {
        for (name, dir) in self.directories() {
            if !dir.is_dir() {
                return Err(ReconcileError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} does not exist: {}", name, dir.display()),
                )));
            }
        }
        if self.video_extension.trim().is_empty() {
            return Err(ReconcileError::ParseError(
                "config: video_extension must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Expected video location for a subject
    pub fn video_path(&self, subject_id: &str) -> PathBuf {
        let extension = self.video_extension.trim_start_matches('.');
        self.video_dir.join(format!("{}.{}", subject_id, extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ReconcileConfig::from_json(
            r#"{ "automated_dir": "/data/icatcher", "pairing": "permissive" }"#,
        )
        .unwrap();

        assert_eq!(config.automated_dir, PathBuf::from("/data/icatcher"));
        assert_eq!(config.human_input_dir, PathBuf::from("human_input"));
        assert_eq!(config.pairing, PairingMode::Permissive);
        assert_eq!(config.logging, LoggingConfig::default());
        assert_eq!(config.video_extension, "mp4");
    }

    #[test]
    fn test_video_path() {
        let config = ReconcileConfig {
            video_dir: PathBuf::from("videos"),
            video_extension: ".mov".to_string(),
            ..Default::default()
        };
        assert_eq!(config.video_path("S01"), PathBuf::from("videos/S01.mov"));
    }

    #[test]
    fn test_validate_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ReconcileConfig {
            automated_dir: dir.path().to_path_buf(),
            human_input_dir: dir.path().to_path_buf(),
            human_output_dir: dir.path().to_path_buf(),
            video_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        config.video_dir = dir.path().join("missing");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_json() {
        assert!(ReconcileConfig::from_json("not json").is_err());
    }
}
