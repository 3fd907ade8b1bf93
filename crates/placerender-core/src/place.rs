use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::LonLat;

/// A zoom level. Web map zooms never leave the 0..=30 range, so a byte is plenty.
pub type Zoom = u8;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaceError {
    #[error("place name is empty")]
    EmptyName,

    #[error("place name '{0}' is not a single path segment")]
    InvalidName(String),

    #[error("place '{name}' has an invalid coordinate ({lon}, {lat})")]
    InvalidCoordinate { name: String, lon: f64, lat: f64 },
}

/// A named region of interest with a render center and an inclusive zoom range.
///
/// The name doubles as the directory name in the output layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub coordinate: LonLat,
    pub minzoom: Zoom,
    pub maxzoom: Zoom,
}

impl Place {
    pub fn new(name: &str, coordinate: LonLat, minzoom: Zoom, maxzoom: Zoom) -> Self {
        Self {
            name: name.to_string(),
            coordinate,
            minzoom,
            maxzoom,
        }
    }

    /// Zoom levels to render, ascending. Empty when `minzoom > maxzoom`.
    pub fn zooms(&self) -> RangeInclusive<Zoom> {
        self.minzoom..=self.maxzoom
    }

    pub fn zoom_count(&self) -> usize {
        if self.minzoom > self.maxzoom {
            0
        } else {
            (self.maxzoom - self.minzoom) as usize + 1
        }
    }

    /// Check that the name is usable as one path segment and the coordinate is sane.
    pub fn validate(&self) -> Result<(), PlaceError> {
        if self.name.is_empty() {
            return Err(PlaceError::EmptyName);
        }
        if self.name.contains(['/', '\\']) || self.name == "." || self.name == ".." {
            return Err(PlaceError::InvalidName(self.name.clone()));
        }
        if !self.coordinate.is_valid() {
            return Err(PlaceError::InvalidCoordinate {
                name: self.name.clone(),
                lon: self.coordinate.lon,
                lat: self.coordinate.lat,
            });
        }
        Ok(())
    }
}
