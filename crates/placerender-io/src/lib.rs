//! # placerender I/O
//!
//! Place-list readers (name mapping and feature collection) and the
//! immutable run configuration shared by the render and compare tools.

pub mod places;
pub mod config;

pub use places::{PlaceFormat, PlaceList, PlaceListError};
pub use config::{CompareConfig, ConfigError, RenderConfig};
