//! # placerender core
//!
//! Place model and the render planner: expands an ordered list of named
//! places into deterministic (place, zoom) render jobs laid out as
//! `<output-dir>/<place>/z<zoom>.png`.
//!
//! Everything downstream (rendering, stitching, diffing) consumes the jobs
//! produced here.

pub mod geometry;
pub mod place;
pub mod job;
pub mod planner;

pub use geometry::{BBox, ImageSize, LonLat};
pub use place::{Place, PlaceError, Zoom};
pub use job::{ensure_parent_dir, job_path, RenderJob};
pub use planner::{plan, Jobs, PlanError, RenderPlanner};
