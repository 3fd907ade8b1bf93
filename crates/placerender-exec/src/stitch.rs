use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use placerender_core::{ImageSize, LonLat, Zoom};

use crate::process::{ProcessError, ProcessRunner};

/// The external tile-stitch executable, which fetches raw tiles from a URL
/// template and assembles them into one image centered on a coordinate.
#[derive(Debug, Clone)]
pub struct Stitcher {
    program: PathBuf,
    runner: ProcessRunner,
}

impl Stitcher {
    pub fn new(program: &Path, runner: ProcessRunner) -> Self {
        Self {
            program: program.to_path_buf(),
            runner,
        }
    }

    /// Arguments for one image: `-o <out> -c -- <lat> <lon> <width> <height> <zoom> <url>`.
    ///
    /// In `-c` (center) mode tile-stitch takes latitude first.
    pub fn args(output: &Path, center: LonLat, size: ImageSize, zoom: Zoom, url: &str) -> Vec<OsString> {
        vec![
            "-o".into(),
            output.as_os_str().to_os_string(),
            "-c".into(),
            "--".into(),
            center.lat.to_string().into(),
            center.lon.to_string().into(),
            size.width.to_string().into(),
            size.height.to_string().into(),
            zoom.to_string().into(),
            url.into(),
        ]
    }

    pub fn stitch(
        &self,
        output: &Path,
        center: LonLat,
        size: ImageSize,
        zoom: Zoom,
        url: &str,
    ) -> Result<(), ProcessError> {
        let mut command = Command::new(&self.program);
        command.args(Self::args(output, center, size, zoom, url));
        let out = self.runner.run(command)?;
        out.log(&self.program.display().to_string());
        Ok(())
    }
}
