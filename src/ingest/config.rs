use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Optional TOML config for the ingest run. CLI flags override these.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    pub input: Option<PathBuf>,
    pub out_places: Option<PathBuf>,
    pub out_index: Option<PathBuf>,
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}
