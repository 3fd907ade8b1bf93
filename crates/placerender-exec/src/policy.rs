//! Job execution policies.
//!
//! Each tool drives the planner's job sequence through one of these loops.
//! They differ in what a failed external call means:
//!
//! | policy | external work | on failure |
//! |---|---|---|
//! | [`run_renderer`] | tile source render + file write | warn, skip job, continue |
//! | [`run_stitcher`] | tile-stitch process | warn, skip job, continue |
//! | [`run_comparator`] | difference, append, annotate | abort the batch |
//!
//! Planner (directory) errors and local file writes are fatal everywhere.
//! Jobs run one at a time in planner order.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use placerender_core::{ensure_parent_dir, PlanError, RenderJob};
use placerender_io::CompareConfig;

use crate::imagetool::ImageTool;
use crate::process::ProcessError;
use crate::report::BatchReport;
use crate::source::{RenderRequest, TileSource};
use crate::stitch::Stitcher;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("job {0} has no image size")]
    MissingSize(String),

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot create directory for {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("input image {0} does not exist")]
    MissingInput(PathBuf),

    #[error("diffing {job} failed: {source}")]
    Diff {
        job: String,
        #[source]
        source: ProcessError,
    },

    #[error("joining {job} failed: {source}")]
    Join {
        job: String,
        #[source]
        source: ProcessError,
    },

    #[error("cannot create temporary file: {0}")]
    TempFile(#[source] io::Error),
}

/// Render every job through `source`, writing the image to the job's output path.
///
/// A render failure is logged and the job skipped; the batch goes on.
pub fn run_renderer<I>(jobs: I, source: &dyn TileSource) -> Result<BatchReport, ExecError>
where
    I: IntoIterator<Item = Result<RenderJob, PlanError>>,
{
    let mut report = BatchReport::default();
    for job in jobs {
        let job = job?;
        log::info!("Rendering {}...", job.label());

        let request =
            RenderRequest::for_job(&job).ok_or_else(|| ExecError::MissingSize(job.label()))?;
        match source.render(&request) {
            Ok(image) => {
                fs::write(&job.output_path, &image).map_err(|source| ExecError::Write {
                    path: job.output_path.clone(),
                    source,
                })?;
                report.record_written(job.output_path);
            }
            Err(e) => {
                log::warn!("Skipping {} ({}): {}", job.label(), source.name(), e);
                report.record_skipped(&job, e.to_string());
            }
        }
    }
    Ok(report)
}

/// Stitch every job from the tile URL template `url`.
///
/// A stitcher failure is logged and the job skipped; the batch goes on.
pub fn run_stitcher<I>(jobs: I, stitcher: &Stitcher, url: &str) -> Result<BatchReport, ExecError>
where
    I: IntoIterator<Item = Result<RenderJob, PlanError>>,
{
    let mut report = BatchReport::default();
    let mut current_place: Option<String> = None;
    for job in jobs {
        let job = job?;
        if current_place.as_deref() != Some(job.place_name.as_str()) {
            log::info!("{}", job.place_name);
            current_place = Some(job.place_name.clone());
        }
        log::info!("Stitching {}...", job.label());

        let size = job.size.ok_or_else(|| ExecError::MissingSize(job.label()))?;
        match stitcher.stitch(&job.output_path, job.coordinate, size, job.zoom, url) {
            Ok(()) => report.record_written(job.output_path),
            Err(e) => {
                log::warn!("Skipping {}: {}", job.label(), e);
                report.record_skipped(&job, e.to_string());
            }
        }
    }
    Ok(report)
}

/// Diff the A and B trees for every job and build the annotated side-by-side strip.
///
/// Each job's `output_path` receives the difference image; the strip goes to
/// the same place/zoom path under `config.joined_output_dir`. The first
/// failure of any external step aborts the batch.
pub fn run_comparator<I>(
    jobs: I,
    config: &CompareConfig,
    tool: &dyn ImageTool,
) -> Result<BatchReport, ExecError>
where
    I: IntoIterator<Item = Result<RenderJob, PlanError>>,
{
    let mut report = BatchReport::default();
    for job in jobs {
        let job = job?;
        log::info!("Diffing {}...", job.label());

        let input_a = job.path_under(&config.input_dir_a);
        let input_b = job.path_under(&config.input_dir_b);
        for input in [&input_a, &input_b] {
            if !input.is_file() {
                return Err(ExecError::MissingInput(input.to_path_buf()));
            }
        }

        tool.difference(&input_a, &input_b, &job.output_path)
            .map_err(|source| ExecError::Diff {
                job: job.label(),
                source,
            })?;
        report.record_written(job.output_path.clone());

        let joined = job.path_under(&config.joined_output_dir);
        join(&job, tool, [&input_a, &input_b, &job.output_path], &config.label, &joined)?;
        report.record_written(joined);
    }
    Ok(report)
}

fn join(
    job: &RenderJob,
    tool: &dyn ImageTool,
    panels: [&PathBuf; 3],
    label: &str,
    joined: &Path,
) -> Result<(), ExecError> {
    ensure_parent_dir(joined).map_err(|source| ExecError::CreateDir {
        path: joined.to_path_buf(),
        source,
    })?;

    // Removed when dropped, after annotate has read it.
    let strip = tempfile::Builder::new()
        .prefix("placecompare-")
        .suffix(".png")
        .tempfile()
        .map_err(ExecError::TempFile)?;

    let join_err = |source: ProcessError| ExecError::Join {
        job: job.label(),
        source,
    };
    let panels: Vec<&Path> = panels.iter().map(|p| p.as_path()).collect();
    tool.append(&panels, strip.path()).map_err(join_err)?;
    tool.annotate(strip.path(), label, joined).map_err(join_err)?;
    Ok(())
}
