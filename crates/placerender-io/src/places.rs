//! Place-list readers.
//!
//! Two JSON encodings are accepted and normalized to [`Place`]:
//!
//! - a mapping from place name to `{lon, lat, minzoom, maxzoom}`, kept in
//!   document order;
//! - a feature collection, `{"features": [{"properties": {name, minzoom,
//!   maxzoom}, "geometry": {"coordinates": [lon, lat]}}]}`.
//!
//! The shape is detected from the presence of a top-level `features` key.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use placerender_core::{LonLat, Place, PlaceError, Zoom};

#[derive(Error, Debug)]
pub enum PlaceListError {
    #[error("cannot read place list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("place list is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("place list must be a JSON object (name mapping or feature collection)")]
    UnrecognizedFormat,

    #[error("invalid entry '{entry}': {source}")]
    InvalidEntry {
        entry: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("feature {index} has {count} coordinates, expected [lon, lat]")]
    BadCoordinates { index: usize, count: usize },

    #[error(transparent)]
    InvalidPlace(#[from] PlaceError),

    #[error("place '{0}' appears more than once")]
    DuplicateName(String),

    #[error("place list contains no places")]
    Empty,
}

/// The encoding a place list was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceFormat {
    Mapping,
    FeatureCollection,
}

#[derive(Debug, Deserialize)]
struct MappingEntry {
    lon: f64,
    lat: f64,
    minzoom: Zoom,
    maxzoom: Zoom,
}

#[derive(Debug, Deserialize)]
struct Feature {
    properties: FeatureProperties,
    geometry: FeatureGeometry,
}

#[derive(Debug, Deserialize)]
struct FeatureProperties {
    name: String,
    minzoom: Zoom,
    maxzoom: Zoom,
}

#[derive(Debug, Deserialize)]
struct FeatureGeometry {
    coordinates: Vec<f64>,
}

/// Places read from a list, in list order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceList {
    pub format: PlaceFormat,
    pub places: Vec<Place>,
}

impl PlaceList {
    /// Read and normalize a place list from a JSON file.
    pub fn load(path: &Path) -> Result<Self, PlaceListError> {
        let json = fs::read_to_string(path).map_err(|source| PlaceListError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let list = Self::from_json(&json)?;
        log::info!(
            "Loaded {} places from {} ({:?})",
            list.places.len(),
            path.display(),
            list.format
        );
        Ok(list)
    }

    pub fn from_json(json: &str) -> Result<Self, PlaceListError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, PlaceListError> {
        let Value::Object(mut root) = value else {
            return Err(PlaceListError::UnrecognizedFormat);
        };

        let (format, places) = match root.remove("features") {
            Some(features) => (PlaceFormat::FeatureCollection, from_features(features)?),
            None => (PlaceFormat::Mapping, from_mapping(root)?),
        };

        if places.is_empty() {
            return Err(PlaceListError::Empty);
        }
        let mut seen = HashSet::new();
        for place in &places {
            place.validate()?;
            if !seen.insert(place.name.as_str()) {
                return Err(PlaceListError::DuplicateName(place.name.clone()));
            }
            if place.minzoom > place.maxzoom {
                log::warn!(
                    "Place '{}' has minzoom {} > maxzoom {}; it will not be rendered",
                    place.name,
                    place.minzoom,
                    place.maxzoom
                );
            }
        }

        Ok(Self { format, places })
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}

fn from_mapping(entries: Map<String, Value>) -> Result<Vec<Place>, PlaceListError> {
    entries
        .into_iter()
        .map(|(name, value)| -> Result<Place, PlaceListError> {
            let entry: MappingEntry =
                serde_json::from_value(value).map_err(|source| PlaceListError::InvalidEntry {
                    entry: name.clone(),
                    source,
                })?;
            Ok(Place::new(
                &name,
                LonLat::new(entry.lon, entry.lat),
                entry.minzoom,
                entry.maxzoom,
            ))
        })
        .collect()
}

fn from_features(features: Value) -> Result<Vec<Place>, PlaceListError> {
    let features: Vec<Value> =
        serde_json::from_value(features).map_err(|source| PlaceListError::InvalidEntry {
            entry: "features".to_string(),
            source,
        })?;

    features
        .into_iter()
        .enumerate()
        .map(|(index, value)| -> Result<Place, PlaceListError> {
            let feature: Feature =
                serde_json::from_value(value).map_err(|source| PlaceListError::InvalidEntry {
                    entry: format!("features[{}]", index),
                    source,
                })?;
            let coords = &feature.geometry.coordinates;
            // GeoJSON positions may carry altitude after lon/lat
            if coords.len() < 2 {
                return Err(PlaceListError::BadCoordinates {
                    index,
                    count: coords.len(),
                });
            }
            Ok(Place::new(
                &feature.properties.name,
                LonLat::new(coords[0], coords[1]),
                feature.properties.minzoom,
                feature.properties.maxzoom,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use placerender_core::{RenderJob, RenderPlanner};

    const MAPPING: &str = r#"{
        "zurich": {"lon": 8.54, "lat": 47.37, "minzoom": 4, "maxzoom": 6},
        "austin": {"lon": -97.74, "lat": 30.27, "minzoom": 10, "maxzoom": 10},
        "bergen": {"lon": 5.32, "lat": 60.39, "minzoom": 2, "maxzoom": 3}
    }"#;

    const FEATURES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature",
             "properties": {"name": "zurich", "minzoom": 4, "maxzoom": 6},
             "geometry": {"type": "Point", "coordinates": [8.54, 47.37]}},
            {"type": "Feature",
             "properties": {"name": "austin", "minzoom": 10, "maxzoom": 10},
             "geometry": {"type": "Point", "coordinates": [-97.74, 30.27]}},
            {"type": "Feature",
             "properties": {"name": "bergen", "minzoom": 2, "maxzoom": 3},
             "geometry": {"type": "Point", "coordinates": [5.32, 60.39, 12.0]}}
        ]
    }"#;

    #[test]
    fn test_mapping_keeps_document_order() {
        let list = PlaceList::from_json(MAPPING).unwrap();
        assert_eq!(list.format, PlaceFormat::Mapping);
        let names: Vec<&str> = list.places.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["zurich", "austin", "bergen"]);
        assert_eq!(list.places[1].coordinate, LonLat::new(-97.74, 30.27));
    }

    #[test]
    fn test_feature_collection() {
        let list = PlaceList::from_json(FEATURES).unwrap();
        assert_eq!(list.format, PlaceFormat::FeatureCollection);
        assert_eq!(list.len(), 3);
        assert_eq!(list.places[2].coordinate, LonLat::new(5.32, 60.39));
    }

    #[test]
    fn test_encodings_plan_identically() {
        let tmp = tempfile::tempdir().unwrap();
        let mapping = PlaceList::from_json(MAPPING).unwrap();
        let features = PlaceList::from_json(FEATURES).unwrap();
        assert_eq!(mapping.places, features.places);

        let jobs = |places: &[Place]| -> Vec<RenderJob> {
            RenderPlanner::new(places, tmp.path())
                .unwrap()
                .jobs()
                .map(Result::unwrap)
                .collect()
        };
        let a = jobs(&mapping.places);
        let b = jobs(&features.places);
        assert_eq!(a.len(), 6);
        assert_eq!(a, b);
    }

    #[test]
    fn test_load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("places.json");
        fs::write(&path, MAPPING).unwrap();
        assert_eq!(PlaceList::load(&path).unwrap().len(), 3);

        let missing = PlaceList::load(&tmp.path().join("missing.json"));
        assert!(matches!(missing, Err(PlaceListError::Io { .. })));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            PlaceList::from_json("[1, 2]"),
            Err(PlaceListError::UnrecognizedFormat)
        ));
        assert!(matches!(
            PlaceList::from_json("{}"),
            Err(PlaceListError::Empty)
        ));
        assert!(matches!(
            PlaceList::from_json(r#"{"a": {"lon": 1.0, "lat": 2.0, "minzoom": 1}}"#),
            Err(PlaceListError::InvalidEntry { .. })
        ));
        assert!(matches!(
            PlaceList::from_json(r#"{"a/b": {"lon": 1.0, "lat": 2.0, "minzoom": 1, "maxzoom": 2}}"#),
            Err(PlaceListError::InvalidPlace(PlaceError::InvalidName(_)))
        ));
        let short = r#"{"features": [{"properties": {"name": "x", "minzoom": 1, "maxzoom": 1},
                        "geometry": {"coordinates": [1.0]}}]}"#;
        assert!(matches!(
            PlaceList::from_json(short),
            Err(PlaceListError::BadCoordinates { index: 0, count: 1 })
        ));
    }

    #[test]
    fn test_rejects_duplicate_feature_names() {
        let dup = r#"{"features": [
            {"properties": {"name": "x", "minzoom": 1, "maxzoom": 1}, "geometry": {"coordinates": [1.0, 2.0]}},
            {"properties": {"name": "x", "minzoom": 2, "maxzoom": 2}, "geometry": {"coordinates": [1.0, 2.0]}}
        ]}"#;
        assert!(matches!(
            PlaceList::from_json(dup),
            Err(PlaceListError::DuplicateName(_))
        ));
    }

    #[test]
    fn test_inverted_range_is_accepted() {
        let list =
            PlaceList::from_json(r#"{"a": {"lon": 1.0, "lat": 2.0, "minzoom": 5, "maxzoom": 2}}"#)
                .unwrap();
        assert_eq!(list.places[0].zoom_count(), 0);
    }
}
