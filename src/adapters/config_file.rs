//! JSON file configuration adapter.
//!
//! Implements [`ConfigPort`] on top of a JSON document on disk.  Missing
//! fields fall back to their defaults; a missing file yields
//! [`SystemConfig::default()`].  The loaded values are always validated.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::SystemConfig;

pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parse and validate a JSON config document.
pub fn parse_config(bytes: &[u8]) -> Result<SystemConfig, ConfigError> {
    let config: SystemConfig = serde_json::from_slice(bytes).map_err(|e| {
        warn!("config: parse error: {}", e);
        ConfigError::Corrupted
    })?;
    config.validate()?;
    Ok(config)
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => {
                let config = parse_config(&bytes)?;
                info!("config: loaded {}", self.path.display());
                Ok(config)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("config: {} not found, using defaults", self.path.display());
                Ok(SystemConfig::default())
            }
            Err(e) => {
                warn!("config: cannot read {}: {}", self.path.display(), e);
                Err(ConfigError::IoError)
            }
        }
    }
}
