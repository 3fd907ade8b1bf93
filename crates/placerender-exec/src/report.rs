use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use placerender_core::{RenderJob, Zoom};

/// A job that was attempted and given up on without stopping the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedJob {
    pub place_name: String,
    pub zoom: Zoom,
    pub reason: String,
}

/// What a batch run produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Files written, in job order.
    pub written: Vec<PathBuf>,
    pub skipped: Vec<SkippedJob>,
}

impl BatchReport {
    pub fn record_written(&mut self, path: PathBuf) {
        self.written.push(path);
    }

    pub fn record_skipped(&mut self, job: &RenderJob, reason: String) {
        self.skipped.push(SkippedJob {
            place_name: job.place_name.clone(),
            zoom: job.zoom,
            reason,
        });
    }

    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    /// One-line summary for the end of a run.
    pub fn summary(&self) -> String {
        format!(
            "{} written, {} skipped",
            self.written.len(),
            self.skipped.len()
        )
    }
}
