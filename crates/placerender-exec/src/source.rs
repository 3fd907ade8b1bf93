use std::fmt;
use std::path::PathBuf;
use std::process::Command;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use placerender_core::{BBox, ImageSize, LonLat, RenderJob, Zoom};

use crate::process::{ProcessError, ProcessRunner};
use crate::viewport::Viewport;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("no tile source registered for protocol '{0}'")]
    UnknownProtocol(String),

    #[error("tile source URI '{0}' has no protocol")]
    MissingProtocol(String),

    #[error("invalid tile source URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("{source_name} returned an empty image")]
    EmptyImage { source_name: String },

    #[error("{0}")]
    Render(String),
}

/// What a tile source is asked to produce for one job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub center: LonLat,
    pub zoom: Zoom,
    pub size: ImageSize,
    pub bounds: BBox,
}

impl RenderRequest {
    pub fn new(center: LonLat, zoom: Zoom, size: ImageSize) -> Self {
        let bounds = Viewport::new(center, zoom, size).bounds();
        Self {
            center,
            zoom,
            size,
            bounds,
        }
    }

    /// Request for a sized job; `None` for jobs planned without an image size.
    pub fn for_job(job: &RenderJob) -> Option<Self> {
        job.size.map(|size| Self::new(job.coordinate, job.zoom, size))
    }
}

/// A provider of rendered map images.
///
/// Implementations own the whole fetch-and-composite step and hand back
/// encoded PNG bytes for the requested region.
pub trait TileSource: fmt::Debug {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    fn render(&self, request: &RenderRequest) -> Result<Vec<u8>, SourceError>;
}

/// Split `scheme:rest` into its protocol and remainder.
pub fn protocol_of(uri: &str) -> Result<(&str, &str), SourceError> {
    match uri.split_once(':') {
        Some((scheme, rest)) if !scheme.is_empty() => Ok((scheme, rest)),
        _ => Err(SourceError::MissingProtocol(uri.to_string())),
    }
}

/// Tile source backed by an external renderer executable.
///
/// URI form: `command:<program>`. The program is called once per job as
/// `<program> <lon> <lat> <width> <height> <zoom>` and must write the PNG
/// image to stdout.
#[derive(Debug, Clone)]
pub struct CommandSource {
    name: String,
    program: PathBuf,
    runner: ProcessRunner,
}

impl CommandSource {
    pub const PROTOCOL: &'static str = "command";

    pub fn new(program: PathBuf, runner: ProcessRunner) -> Self {
        Self {
            name: format!("{}:{}", Self::PROTOCOL, program.display()),
            program,
            runner,
        }
    }

    pub fn from_uri(uri: &str, runner: ProcessRunner) -> Result<Self, SourceError> {
        let (_, rest) = protocol_of(uri)?;
        let program = rest.trim_start_matches("//");
        if program.is_empty() {
            return Err(SourceError::InvalidUri {
                uri: uri.to_string(),
                reason: "no program given".to_string(),
            });
        }
        Ok(Self::new(PathBuf::from(program), runner))
    }
}

impl TileSource for CommandSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self, request: &RenderRequest) -> Result<Vec<u8>, SourceError> {
        let mut command = Command::new(&self.program);
        command
            .arg(request.center.lon.to_string())
            .arg(request.center.lat.to_string())
            .arg(request.size.width.to_string())
            .arg(request.size.height.to_string())
            .arg(request.zoom.to_string());

        let output = self.runner.run(command)?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            log::debug!("{} stderr: {}", self.name, stderr.trim_end());
        }
        if output.stdout.is_empty() {
            return Err(SourceError::EmptyImage {
                source_name: self.name.clone(),
            });
        }
        Ok(output.stdout)
    }
}
