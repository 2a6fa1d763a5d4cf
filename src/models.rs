use serde::{Deserialize, Serialize};

use crate::error::{ResizeError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizePreset {
    pub width: u32,
    pub height: u32,
    pub label: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl SizePreset {
    pub fn new(label: &str, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            label: label.to_string(),
            enabled: true,
        }
    }

    /// Builds a user-entered size, trimming the label.
    pub fn custom(label: &str, width: u32, height: u32) -> Result<Self> {
        let preset = Self::new(label.trim(), width, height);
        preset.validate()?;
        Ok(preset)
    }

    /// Both sides must be non-zero and the label must contain something
    /// other than whitespace.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason| ResizeError::InvalidSize {
            width: self.width,
            height: self.height,
            reason,
        };
        if self.width == 0 || self.height == 0 {
            return Err(invalid("width and height must be non-zero"));
        }
        if self.label.trim().is_empty() {
            return Err(invalid("label must not be empty"));
        }
        Ok(())
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn as_string(&self) -> String {
        format!("{} ({}x{})", self.label, self.width, self.height)
    }

    /// Lowercased label with every run of whitespace collapsed into `-`.
    pub fn slug(&self) -> String {
        self.label
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join("-")
    }
}

pub fn default_sizes() -> Vec<SizePreset> {
    vec![
        SizePreset::new("Medium Rectangle", 300, 250),
        SizePreset::new("Leaderboard", 728, 90),
        SizePreset::new("Wide Skyscraper", 160, 600),
        SizePreset::new("Half Page", 300, 600),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub jpeg_quality: u8,
    pub background: [u8; 3],
    pub max_input_bytes: u64,
    pub max_side: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            jpeg_quality: 90,
            background: [255, 255, 255],
            max_input_bytes: 10 * 1024 * 1024,
            max_side: 16384,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub size: SizePreset,
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl ProcessedImage {
    pub fn file_name(&self) -> String {
        format!("{}-{}x{}.jpg", self.size.slug(), self.width, self.height)
    }
}
