//! Configuration for contextstore

use eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the context store directory
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Default chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub default_chunk_size: usize,

    /// Default overlap between chunks in characters
    #[serde(default = "default_overlap")]
    pub default_overlap: usize,

    /// Default number of chunks returned by a query
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".contextstore")
}

fn default_chunk_size() -> usize {
    crate::DEFAULT_CHUNK_SIZE
}

fn default_overlap() -> usize {
    crate::DEFAULT_OVERLAP
}

fn default_top_k() -> usize {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            default_chunk_size: default_chunk_size(),
            default_overlap: default_overlap(),
            default_top_k: default_top_k(),
        }
    }
}

impl Config {
    /// Load config from file, or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            return Ok(config);
        }

        // Try default locations
        let default_paths = [
            dirs::config_dir().map(|p| p.join("contextstore").join("config.yml")),
            Some(PathBuf::from("contextstore.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let config: Config = serde_yaml::from_str(&content)?;
                return Ok(config);
            }
        }

        Ok(Config::default())
    }

    /// Reject chunking parameters the chunker cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.default_chunk_size <= self.default_overlap {
            return Err(eyre::eyre!(
                "default_chunk_size ({}) must be greater than default_overlap ({})",
                self.default_chunk_size,
                self.default_overlap
            ));
        }
        if self.default_top_k == 0 {
            return Err(eyre::eyre!("default_top_k must be at least 1"));
        }
        Ok(())
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
