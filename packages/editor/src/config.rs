//! Editor configuration, read from `blockpad.config.json`

use crate::errors::EditorError;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_NAME: &str = "blockpad.config.json";

/// Blockpad editor configuration file format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Reserved text that, confirmed with Enter, opens the image picker
    #[serde(default = "default_image_command")]
    pub image_command: String,

    /// Fold text blocks left adjacent after an image between them is removed
    #[serde(default)]
    pub merge_adjacent_text: bool,

    /// Buffered upload results waiting to be committed
    #[serde(default = "default_upload_channel_capacity")]
    pub upload_channel_capacity: usize,
}

fn default_image_command() -> String {
    "/image".to_string()
}

fn default_upload_channel_capacity() -> usize {
    32
}

impl EditorConfig {
    /// Load config from a directory, falling back to defaults
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, EditorError> {
        let config_path = dir.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: EditorConfig = serde_json::from_str(&content)?;
            tracing::debug!(path = %config_path.display(), "loaded editor config");
            Ok(config)
        } else {
            Ok(EditorConfig::default())
        }
    }

    /// Write config into a directory
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<(), EditorError> {
        let config_path = dir.as_ref().join(DEFAULT_CONFIG_NAME);
        std::fs::write(config_path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            image_command: default_image_command(),
            merge_adjacent_text: false,
            upload_channel_capacity: default_upload_channel_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "imageCommand": "/img",
            "mergeAdjacentText": true
        }"#;

        let config: EditorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.image_command, "/img");
        assert!(config.merge_adjacent_text);
        assert_eq!(config.upload_channel_capacity, 32);
    }

    #[test]
    fn test_default_config() {
        let config = EditorConfig::default();
        assert_eq!(config.image_command, "/image");
        assert!(!config.merge_adjacent_text);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EditorConfig::load(dir.path()).unwrap();
        assert_eq!(config, EditorConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = EditorConfig {
            image_command: "/pic".to_string(),
            ..EditorConfig::default()
        };

        config.save(dir.path()).unwrap();
        assert_eq!(EditorConfig::load(dir.path()).unwrap(), config);
    }
}
