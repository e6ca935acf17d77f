use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "kanban";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Where the board files live. Defaults to the platform data directory.
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    pub file_name: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file_name: "kanban.log".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    pub file_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            file_name: "kanban_export.json".to_string(),
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME).context("Could not determine home directory")
}

pub fn get_config_dir() -> Result<PathBuf> {
    // KANBAN_CONFIG_PATH overrides the default config directory
    if let Ok(path) = std::env::var("KANBAN_CONFIG_PATH") {
        return Ok(PathBuf::from(path));
    }
    Ok(project_dirs()?.config_dir().to_path_buf())
}

pub fn get_data_dir(config: &Config) -> Result<PathBuf> {
    if let Ok(path) = std::env::var("KANBAN_DATA_DIR") {
        return Ok(PathBuf::from(path));
    }
    if let Some(path) = &config.storage.data_dir {
        return Ok(path.clone());
    }
    Ok(project_dirs()?.data_dir().to_path_buf())
}

pub fn load_config() -> Result<Config> {
    load_config_from(&get_config_dir()?.join("config.toml"))
}

pub fn load_config_from(config_file: &Path) -> Result<Config> {
    if !config_file.exists() {
        return Ok(Config::default());
    }

    let contents = fs::read_to_string(config_file)
        .with_context(|| format!("Failed to read config file: {}", config_file.display()))?;

    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", config_file.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.export.file_name, "kanban_export.json");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[storage]\ndata_dir = \"/tmp/boards\"\n").unwrap();

        let config = load_config_from(&path).unwrap();

        assert_eq!(config.storage.data_dir, Some(PathBuf::from("/tmp/boards")));
        assert_eq!(config.log, LogConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "storage = 3").unwrap();
        assert!(load_config_from(&path).is_err());
    }
}
