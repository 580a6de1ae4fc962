use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub notes: NotesConfig,
    #[serde(default)]
    pub diagram: DiagramConfig,
    #[serde(default)]
    pub collaborator: CollaboratorConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Root directory for all subject folders and the subject index.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/memory.db")
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotesConfig {
    /// Remove orphaned note files on every regeneration instead of only
    /// when --clean is passed.
    #[serde(default)]
    pub always_clean: bool,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            always_clean: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiagramConfig {
    /// Maximum label length for mindmap key points before truncation.
    #[serde(default = "default_max_label")]
    pub mindmap_max_label: usize,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            mindmap_max_label: default_max_label(),
        }
    }
}

fn default_max_label() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct CollaboratorConfig {
    /// Timeout applied to every external collaborator call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

impl Config {
    /// A default configuration for commands that can run without a
    /// config file on disk.
    pub fn minimal() -> Self {
        Self {
            store: StoreConfig::default(),
            db: DbConfig::default(),
            notes: NotesConfig::default(),
            diagram: DiagramConfig::default(),
            collaborator: CollaboratorConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.diagram.mindmap_max_label < 4 {
        anyhow::bail!("diagram.mindmap_max_label must be >= 4");
    }

    if config.collaborator.timeout_secs == 0 {
        anyhow::bail!("collaborator.timeout_secs must be >= 1");
    }

    Ok(config)
}
