use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use placerender_core::ImageSize;

/// Stitcher executable used when none is given on the command line.
pub const DEFAULT_STITCHER: &str = "tile-stitch/stitch";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("image size {width}x{height} is not positive")]
    InvalidSize { width: u32, height: u32 },

    #[error("timeout must be greater than zero")]
    ZeroTimeout,
}

/// Settings for a batch render run. Built once at startup, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Place-list file.
    pub places: PathBuf,
    /// Tile-source URI, or a plain `http(s)` tile URL for the stitcher.
    pub source_uri: String,
    pub size: ImageSize,
    pub output_dir: PathBuf,
    /// Extra tile-source capabilities to register.
    pub requires: Vec<String>,
    pub stitcher: PathBuf,
    /// Upper bound on each external call; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl RenderConfig {
    pub fn new(places: &Path, source_uri: &str, size: ImageSize) -> Result<Self, ConfigError> {
        if source_uri.is_empty() {
            return Err(ConfigError::Missing("a tile source URI"));
        }
        if size.is_empty() {
            return Err(ConfigError::InvalidSize {
                width: size.width,
                height: size.height,
            });
        }
        Ok(Self {
            places: places.to_path_buf(),
            source_uri: source_uri.to_string(),
            size,
            output_dir: PathBuf::from("."),
            requires: Vec::new(),
            stitcher: PathBuf::from(DEFAULT_STITCHER),
            timeout: None,
        })
    }

    pub fn with_output_dir(mut self, dir: &Path) -> Self {
        self.output_dir = dir.to_path_buf();
        self
    }

    pub fn with_requires(mut self, requires: Vec<String>) -> Self {
        self.requires = requires;
        self
    }

    pub fn with_stitcher(mut self, stitcher: &Path) -> Self {
        self.stitcher = stitcher.to_path_buf();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Result<Self, ConfigError> {
        self.timeout = check_timeout(timeout)?;
        Ok(self)
    }

    /// Plain HTTP tile URLs bypass the tile-source registry and go to the stitcher.
    pub fn uses_stitcher(&self) -> bool {
        self.source_uri.starts_with("http")
    }
}

/// Settings for a diff run over two render trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareConfig {
    pub places: PathBuf,
    pub input_dir_a: PathBuf,
    pub input_dir_b: PathBuf,
    /// Receives the difference images.
    pub output_dir: PathBuf,
    /// Receives the annotated side-by-side images.
    pub joined_output_dir: PathBuf,
    pub requires: Vec<String>,
    /// Accepted for symmetry with the renderer; diffing never reads it.
    pub source_uri: Option<String>,
    /// Text drawn along the bottom of each joined image.
    pub label: String,
    pub timeout: Option<Duration>,
}

impl CompareConfig {
    pub fn new(
        places: &Path,
        input_dir_a: Option<&Path>,
        input_dir_b: Option<&Path>,
        joined_output_dir: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let input_dir_a = input_dir_a.ok_or(ConfigError::Missing("--input-dir-a"))?;
        let input_dir_b = input_dir_b.ok_or(ConfigError::Missing("--input-dir-b"))?;
        let joined = joined_output_dir.ok_or(ConfigError::Missing("--joined-output-dir"))?;
        Ok(Self {
            places: places.to_path_buf(),
            input_dir_a: input_dir_a.to_path_buf(),
            input_dir_b: input_dir_b.to_path_buf(),
            output_dir: PathBuf::from("."),
            joined_output_dir: joined.to_path_buf(),
            requires: Vec::new(),
            source_uri: None,
            label: default_label(),
            timeout: None,
        })
    }

    pub fn with_output_dir(mut self, dir: &Path) -> Self {
        self.output_dir = dir.to_path_buf();
        self
    }

    pub fn with_requires(mut self, requires: Vec<String>) -> Self {
        self.requires = requires;
        self
    }

    pub fn with_source_uri(mut self, uri: Option<String>) -> Self {
        self.source_uri = uri;
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Result<Self, ConfigError> {
        self.timeout = check_timeout(timeout)?;
        Ok(self)
    }
}

/// Column captions for the A | B | difference strip, spaced to sit under each panel.
pub fn default_label() -> String {
    format!(
        "end of phase 1{}end of phase 2{}difference",
        " ".repeat(79),
        " ".repeat(81)
    )
}

fn check_timeout(timeout: Option<Duration>) -> Result<Option<Duration>, ConfigError> {
    match timeout {
        Some(t) if t.is_zero() => Err(ConfigError::ZeroTimeout),
        other => Ok(other),
    }
}
