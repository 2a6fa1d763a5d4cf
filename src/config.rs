use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    error::{ResizeError, Result},
    models::{default_sizes, Settings, SizePreset},
};

pub const CONFIG_FILE: &str = "banner_resizer.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub settings: Settings,
    pub sizes: Vec<SizePreset>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            sizes: default_sizes(),
        }
    }
}

impl AppConfig {
    pub fn default_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE)
    }

    /// A missing file is not an error and yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let config: Self = serde_json::from_str(&contents).map_err(|e| ResizeError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate(path)?;

        info!(sizes = config.sizes.len(), "Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| ResizeError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        fs::write(path, json)?;
        debug!("Saved config to {}", path.display());
        Ok(())
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let invalid = |reason: &str| ResizeError::Config {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        let settings = &self.settings;
        if !(1..=100).contains(&settings.jpeg_quality) {
            return Err(invalid("jpeg_quality must be between 1 and 100"));
        }
        if settings.max_input_bytes == 0 {
            return Err(invalid("max_input_bytes must be non-zero"));
        }
        if settings.max_side == 0 {
            return Err(invalid("max_side must be non-zero"));
        }

        for (index, size) in self.sizes.iter().enumerate() {
            size.validate().map_err(|e| invalid(&format!("sizes[{}]: {}", index, e)))?;
        }
        Ok(())
    }
}
