//! # placerender exec
//!
//! The external side of a run: tile sources and their registry, the
//! tile-stitch and ImageMagick process wrappers, and the three execution
//! policies (render, stitch, compare) that consume planner jobs.
//!
//! Pixel work is never done here; every image is produced by a tile source
//! or an external executable.

pub mod viewport;
pub mod process;
pub mod source;
pub mod registry;
pub mod stitch;
pub mod imagetool;
pub mod report;
pub mod policy;

pub use viewport::Viewport;
pub use process::{ProcessError, ProcessRunner};
pub use source::{CommandSource, RenderRequest, SourceError, TileSource};
pub use registry::{builtin_catalog, Capability, SkippedCapability, SourceRegistry};
pub use stitch::Stitcher;
pub use imagetool::{ImageMagick, ImageTool};
pub use report::{BatchReport, SkippedJob};
pub use policy::{run_comparator, run_renderer, run_stitcher, ExecError};
