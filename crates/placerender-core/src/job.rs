use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::geometry::{ImageSize, LonLat};
use crate::place::{Place, Zoom};

/// Path of the image for `place_name` at `zoom` under `root`: `<root>/<place_name>/z<zoom>.png`.
///
/// Every tree written or read by the tools follows this layout, which is what
/// lets the comparator pair up images from two independent runs.
pub fn job_path(root: &Path, place_name: &str, zoom: Zoom) -> PathBuf {
    root.join(place_name).join(format!("z{}.png", zoom))
}

/// Create the parent directory of `path` and any missing ancestors.
///
/// An existing directory is a no-op, including when another job created it
/// between the check and the call.
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

/// One (place, zoom) unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderJob {
    pub place_name: String,
    pub zoom: Zoom,
    pub coordinate: LonLat,
    /// Image dimensions, present when the run renders images rather than diffing them.
    pub size: Option<ImageSize>,
    pub output_path: PathBuf,
}

impl RenderJob {
    pub fn new(place: &Place, zoom: Zoom, size: Option<ImageSize>, output_dir: &Path) -> Self {
        Self {
            place_name: place.name.clone(),
            zoom,
            coordinate: place.coordinate,
            size,
            output_path: job_path(output_dir, &place.name, zoom),
        }
    }

    /// Short label used in progress logs, e.g. `riverside at z5`.
    pub fn label(&self) -> String {
        format!("{} at z{}", self.place_name, self.zoom)
    }

    /// The same (place, zoom) image under a different root.
    pub fn path_under(&self, root: &Path) -> PathBuf {
        job_path(root, &self.place_name, self.zoom)
    }
}
