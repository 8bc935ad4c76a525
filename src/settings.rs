use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use tracing::warn;

const APP_DIR: &str = "taskboard";
const DEFAULT_DB_FILE: &str = "tasks.sqlite";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub database_path: Option<PathBuf>,
    pub keybindings: KeybindingsConfig,
}

/// Per-context action overrides, keyed by action id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct KeybindingsConfig {
    pub global: HashMap<String, Vec<String>>,
    pub board: HashMap<String, Vec<String>>,
    pub form: HashMap<String, Vec<String>>,
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push(APP_DIR);
        path.push("settings.toml");
        Some(path)
    }

    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        Self::load_from_path(&path)
    }

    pub fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(mut settings) => {
                    settings.validate();
                    settings
                }
                Err(error) => {
                    warn!(
                        "failed to parse settings config '{}': {}",
                        path.display(),
                        error
                    );
                    Self::default()
                }
            },
            Err(error) => {
                warn!(
                    "failed to read settings config '{}': {}",
                    path.display(),
                    error
                );
                Self::default()
            }
        }
    }

    /// Database location: explicit override, then settings, then the data dir.
    pub fn resolve_database_path(&self, cli_override: Option<&Path>) -> anyhow::Result<PathBuf> {
        if let Some(path) = cli_override {
            return Ok(path.to_path_buf());
        }
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }
        default_database_path()
    }

    fn validate(&mut self) {
        if self
            .database_path
            .as_ref()
            .is_some_and(|path| path.as_os_str().is_empty())
        {
            warn!("empty database_path in settings config; using the default location");
            self.database_path = None;
        }
    }
}

pub fn default_database_path() -> anyhow::Result<PathBuf> {
    let data_dir =
        dirs::data_local_dir().ok_or_else(|| anyhow!("unable to determine local data directory"))?;
    Ok(data_dir.join(APP_DIR).join(DEFAULT_DB_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings_file_path(temp_dir: &TempDir) -> PathBuf {
        temp_dir.path().join(APP_DIR).join("settings.toml")
    }

    fn write_settings(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().expect("settings path should have parent"))
            .expect("failed to create config dir");
        fs::write(path, contents).expect("failed to write settings");
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().expect("temp dir");
        let settings = Settings::load_from_path(&settings_file_path(&temp_dir));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_malformed_toml() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = settings_file_path(&temp_dir);
        write_settings(&path, "database_path = [invalid");

        assert_eq!(Settings::load_from_path(&path), Settings::default());
    }

    #[test]
    fn test_load_partial_toml() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = settings_file_path(&temp_dir);
        write_settings(&path, "[keybindings.board]\ndelete_task = [\"x\"]\n");

        let settings = Settings::load_from_path(&path);
        assert_eq!(settings.database_path, None);
        assert_eq!(
            settings.keybindings.board.get("delete_task"),
            Some(&vec!["x".to_string()])
        );
        assert!(settings.keybindings.form.is_empty());
    }

    #[test]
    fn test_empty_database_path_is_dropped() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = settings_file_path(&temp_dir);
        write_settings(&path, "database_path = \"\"\n");

        assert_eq!(Settings::load_from_path(&path).database_path, None);
    }

    #[test]
    fn test_load_full_toml() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = settings_file_path(&temp_dir);
        write_settings(
            &path,
            "database_path = \"/var/lib/board.sqlite\"\n\n[keybindings.global]\nquit = [\"Ctrl+Q\"]\n",
        );

        let settings = Settings::load_from_path(&path);
        assert_eq!(
            settings.database_path,
            Some(PathBuf::from("/var/lib/board.sqlite"))
        );
        assert_eq!(
            settings.keybindings.global.get("quit"),
            Some(&vec!["Ctrl+Q".to_string()])
        );
    }

    #[test]
    fn test_database_path_precedence() {
        let settings = Settings {
            database_path: Some(PathBuf::from("from-settings.sqlite")),
            ..Settings::default()
        };

        let flag = PathBuf::from("from-flag.sqlite");
        assert_eq!(
            settings.resolve_database_path(Some(flag.as_path())).expect("path"),
            flag
        );
        assert_eq!(
            settings.resolve_database_path(None).expect("path"),
            PathBuf::from("from-settings.sqlite")
        );
    }
}
