use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PORT: u16 = 4001;
pub const DEFAULT_DATA_DIR: &str = "/opt/middash/data";
pub const DEFAULT_EXPORT_DIR: &str = "/opt/middash/export";

/// Service configuration. Constructed once and passed into the store, the
/// durable writer, and the router, so tests can point everything at a temp
/// directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_export_dir() -> PathBuf {
    PathBuf::from(DEFAULT_EXPORT_DIR)
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            data_dir: default_data_dir(),
            export_dir: default_export_dir(),
        }
    }
}

impl DashConfig {
    /// Load from an optional TOML file, then apply environment overrides
    /// (`PORT`, `MIDDASH_DATA_DIR`, `MIDDASH_EXPORT_DIR`).
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("could not read config file {}", path.display()))?;
                toml::from_str(&content)
                    .with_context(|| format!("could not parse config file {}", path.display()))?
            }
            None => Self::default(),
        };

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(port) = std::env::var("PORT") {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(_) => eprintln!("⚠️  Ignoring invalid PORT value: {}", port),
            }
        }
        if let Ok(dir) = std::env::var("MIDDASH_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("MIDDASH_EXPORT_DIR") {
            self.export_dir = PathBuf::from(dir);
        }
    }

    pub fn servers_file(&self) -> PathBuf {
        self.data_dir.join("data-server.json")
    }

    pub fn commands_file(&self) -> PathBuf {
        self.data_dir.join("commands.json")
    }
}
