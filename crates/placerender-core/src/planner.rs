use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::geometry::ImageSize;
use crate::job::{ensure_parent_dir, RenderJob};
use crate::place::{Place, Zoom};

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("place list is empty")]
    NoPlaces,

    #[error("image size {width}x{height} is not positive")]
    InvalidSize { width: u32, height: u32 },

    #[error("cannot create output directory for {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Expands an ordered place list into render jobs.
///
/// Places are visited in input order and, within a place, zoom levels
/// ascend from `minzoom` to `maxzoom`. The planner holds no state between
/// calls to [`RenderPlanner::jobs`], so every call yields the same sequence.
#[derive(Debug, Clone)]
pub struct RenderPlanner<'a> {
    places: &'a [Place],
    size: Option<ImageSize>,
    output_dir: PathBuf,
}

impl<'a> RenderPlanner<'a> {
    /// Planner for jobs that have no image size of their own (diffing).
    pub fn new(places: &'a [Place], output_dir: &Path) -> Result<Self, PlanError> {
        if places.is_empty() {
            return Err(PlanError::NoPlaces);
        }
        Ok(Self {
            places,
            size: None,
            output_dir: output_dir.to_path_buf(),
        })
    }

    pub fn with_size(mut self, size: ImageSize) -> Result<Self, PlanError> {
        if size.is_empty() {
            return Err(PlanError::InvalidSize {
                width: size.width,
                height: size.height,
            });
        }
        self.size = Some(size);
        Ok(self)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Total number of jobs the sequence will produce if no directory fails.
    pub fn job_count(&self) -> usize {
        self.places.iter().map(Place::zoom_count).sum()
    }

    /// Lazily produce the jobs, creating each job's output directory before yielding it.
    pub fn jobs(&self) -> Jobs<'a> {
        Jobs {
            places: self.places,
            size: self.size,
            output_dir: self.output_dir.clone(),
            place_index: 0,
            next_zoom: self.places.first().map(|p| p.minzoom),
            failed: false,
        }
    }
}

/// Plan sized render jobs for `places` under `output_dir`.
pub fn plan<'a>(
    places: &'a [Place],
    width: u32,
    height: u32,
    output_dir: &Path,
) -> Result<Jobs<'a>, PlanError> {
    let planner = RenderPlanner::new(places, output_dir)?.with_size(ImageSize::new(width, height))?;
    Ok(planner.jobs())
}

/// Single-pass job iterator returned by [`RenderPlanner::jobs`].
///
/// Yields `Err` once if a directory cannot be created and then ends.
#[derive(Debug)]
pub struct Jobs<'a> {
    places: &'a [Place],
    size: Option<ImageSize>,
    output_dir: PathBuf,
    place_index: usize,
    /// Next zoom to emit for the current place; `None` once its range is done.
    next_zoom: Option<Zoom>,
    failed: bool,
}

impl<'a> Jobs<'a> {
    fn advance_place(&mut self) {
        self.place_index += 1;
        self.next_zoom = self.places.get(self.place_index).map(|p| p.minzoom);
    }
}

impl<'a> Iterator for Jobs<'a> {
    type Item = Result<RenderJob, PlanError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let places = self.places;
        loop {
            let place = places.get(self.place_index)?;
            let zoom = match self.next_zoom {
                Some(z) if z <= place.maxzoom => z,
                _ => {
                    self.advance_place();
                    continue;
                }
            };
            // checked_add keeps maxzoom == Zoom::MAX from wrapping back to 0
            self.next_zoom = zoom.checked_add(1);

            let job = RenderJob::new(place, zoom, self.size, &self.output_dir);
            if let Err(source) = ensure_parent_dir(&job.output_path) {
                self.failed = true;
                return Some(Err(PlanError::CreateDir {
                    path: job.output_path,
                    source,
                }));
            }
            log::trace!("planned {}", job.label());
            return Some(Ok(job));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::LonLat;
    use std::fs;

    fn places() -> Vec<Place> {
        vec![
            Place::new("riverside", LonLat::new(-122.27, 37.80), 3, 5),
            Place::new("harbor", LonLat::new(4.40, 51.22), 10, 11),
        ]
    }

    #[test]
    fn test_job_count_and_order() {
        let tmp = tempfile::tempdir().unwrap();
        let places = places();
        let jobs: Vec<RenderJob> = plan(&places, 512, 256, tmp.path())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(jobs.len(), 5);
        let order: Vec<(&str, Zoom)> = jobs.iter().map(|j| (j.place_name.as_str(), j.zoom)).collect();
        assert_eq!(
            order,
            vec![
                ("riverside", 3),
                ("riverside", 4),
                ("riverside", 5),
                ("harbor", 10),
                ("harbor", 11),
            ]
        );
        assert!(jobs.iter().all(|j| j.size == Some(ImageSize::new(512, 256))));
    }

    #[test]
    fn test_inverted_range_skips_only_that_place() {
        let tmp = tempfile::tempdir().unwrap();
        let places = vec![
            Place::new("a", LonLat::new(0.0, 0.0), 1, 2),
            Place::new("empty", LonLat::new(0.0, 0.0), 9, 4),
            Place::new("b", LonLat::new(0.0, 0.0), 6, 6),
        ];
        let planner = RenderPlanner::new(&places, tmp.path()).unwrap();
        assert_eq!(planner.job_count(), 3);

        let names: Vec<String> = planner.jobs().map(|j| j.unwrap().place_name).collect();
        assert_eq!(names, vec!["a", "a", "b"]);
        assert!(!tmp.path().join("empty").exists());
    }

    #[test]
    fn test_plan_is_deterministic() {
        let tmp = tempfile::tempdir().unwrap();
        let places = places();
        let planner = RenderPlanner::new(&places, tmp.path())
            .unwrap()
            .with_size(ImageSize::new(100, 100))
            .unwrap();
        let first: Vec<RenderJob> = planner.jobs().map(Result::unwrap).collect();
        let second: Vec<RenderJob> = planner.jobs().map(Result::unwrap).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_output_path_convention() {
        let tmp = tempfile::tempdir().unwrap();
        let places = vec![Place::new("riverside", LonLat::new(0.0, 0.0), 5, 5)];
        let job = plan(&places, 1, 1, tmp.path()).unwrap().next().unwrap().unwrap();
        assert_eq!(job.output_path, tmp.path().join("riverside").join("z5.png"));
        assert!(tmp.path().join("riverside").is_dir());
    }

    #[test]
    fn test_directories_created_idempotently() {
        let tmp = tempfile::tempdir().unwrap();
        let places = places();
        for _ in 0..2 {
            let count = plan(&places, 8, 8, tmp.path())
                .unwrap()
                .map(|j| j.unwrap())
                .count();
            assert_eq!(count, 5);
        }
    }

    #[test]
    fn test_directory_failure_ends_sequence() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("harbor"), b"in the way").unwrap();
        let places = places();
        let results: Vec<_> = plan(&places, 8, 8, tmp.path()).unwrap().collect();

        assert_eq!(results.len(), 4);
        assert!(results[..3].iter().all(|r| r.is_ok()));
        assert!(matches!(results[3], Err(PlanError::CreateDir { .. })));
    }

    #[test]
    fn test_max_zoom_does_not_wrap() {
        let tmp = tempfile::tempdir().unwrap();
        let places = vec![Place::new("deep", LonLat::new(0.0, 0.0), Zoom::MAX - 1, Zoom::MAX)];
        let zooms: Vec<Zoom> = RenderPlanner::new(&places, tmp.path())
            .unwrap()
            .jobs()
            .map(|j| j.unwrap().zoom)
            .collect();
        assert_eq!(zooms, vec![Zoom::MAX - 1, Zoom::MAX]);
    }

    #[test]
    fn test_rejects_empty_input() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            RenderPlanner::new(&[], tmp.path()),
            Err(PlanError::NoPlaces)
        ));
        let places = places();
        assert!(matches!(
            plan(&places, 0, 10, tmp.path()),
            Err(PlanError::InvalidSize { .. })
        ));
    }
}
