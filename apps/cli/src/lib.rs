//! Shared entry points for the `placerender` and `placecompare` binaries.
//!
//! Each binary parses its flags into an immutable config, loads the place
//! list, builds the planner, and hands the jobs to one execution policy.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{ArgAction, Parser};
use thiserror::Error;

use placerender_core::{ImageSize, PlanError, RenderPlanner};
use placerender_exec::{
    builtin_catalog, run_comparator, run_renderer, run_stitcher, BatchReport, ExecError,
    ImageMagick, ProcessRunner, SourceError, SourceRegistry, Stitcher,
};
use placerender_io::config::DEFAULT_STITCHER;
use placerender_io::{CompareConfig, ConfigError, PlaceList, PlaceListError, RenderConfig};

// ── Errors ───────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Places(#[from] PlaceListError),

    #[error("{0}")]
    Plan(#[from] PlanError),

    #[error("{0}")]
    Source(#[from] SourceError),

    #[error("{0}")]
    Exec(#[from] ExecError),
}

impl CliError {
    /// Print the error to stderr and exit with a failure status.
    pub fn exit(&self) -> ! {
        let _ = self.print(&mut io::stderr().lock());
        process::exit(1)
    }

    fn print(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "Error: {}", self)?;
        if let CliError::Source(SourceError::UnknownProtocol(_)) = self {
            writeln!(out, "Plain http(s) URLs go to the stitcher; other protocols need a module (-r).")?;
        }
        Ok(())
    }
}

/// Initialize `env_logger` at `info` unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .init();
}

fn timeout_from_secs(secs: Option<u64>) -> Option<Duration> {
    secs.map(Duration::from_secs)
}

/// Warning for `--require` names that the selected mode never loads.
fn unused_requires(requires: &[String], mode: &str) -> Option<String> {
    if requires.is_empty() {
        return None;
    }
    Some(format!(
        "Ignoring --require {}: {} does not use tile source modules",
        requires.join(", "),
        mode
    ))
}

fn finish(report: BatchReport) -> BatchReport {
    if report.is_clean() {
        log::info!("done: {}", report.summary());
    } else {
        log::warn!("done with skipped jobs: {}", report.summary());
    }
    report
}

// ── Render ───────────────────────────────────────────────────────────

/// Render map images for every place and zoom level in a place list.
#[derive(Parser, Debug)]
#[command(name = "placerender", version, disable_help_flag = true)]
pub struct RenderArgs {
    /// Place list (JSON name mapping or feature collection)
    #[arg(short = 'c', long = "config")]
    pub config: PathBuf,

    /// Image width in pixels
    #[arg(short = 'w', long)]
    pub width: u32,

    /// Image height in pixels
    #[arg(short = 'h', long)]
    pub height: u32,

    /// Root of the `<place>/z<zoom>.png` output tree
    #[arg(short = 'o', long = "output-dir", default_value = ".")]
    pub output_dir: PathBuf,

    /// Additional tile-source module to register (repeatable; unused for http(s) URLs)
    #[arg(short = 'r', long = "require", action = ArgAction::Append)]
    pub require: Vec<String>,

    /// tile-stitch executable used for plain http(s) tile URLs
    #[arg(long, default_value = DEFAULT_STITCHER)]
    pub stitcher: PathBuf,

    /// Give up on an external call after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Tile-source URI, or an http(s) tile URL template for the stitcher
    pub uri: String,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    pub help: Option<bool>,
}

impl RenderArgs {
    pub fn into_config(self) -> Result<RenderConfig, ConfigError> {
        RenderConfig::new(&self.config, &self.uri, ImageSize::new(self.width, self.height))?
            .with_output_dir(&self.output_dir)
            .with_requires(self.require)
            .with_stitcher(&self.stitcher)
            .with_timeout(timeout_from_secs(self.timeout))
    }
}

/// Run a batch render described by `config`.
pub fn render(config: &RenderConfig) -> Result<BatchReport, CliError> {
    let places = PlaceList::load(&config.places)?;
    let planner = RenderPlanner::new(&places.places, &config.output_dir)?.with_size(config.size)?;
    let runner = ProcessRunner::new(config.timeout);
    log::info!(
        "Planned {} jobs into {}",
        planner.job_count(),
        config.output_dir.display()
    );

    let report = if config.uses_stitcher() {
        if let Some(warning) = unused_requires(&config.requires, "stitcher mode") {
            log::warn!("{}", warning);
        }
        let stitcher = Stitcher::new(&config.stitcher, runner);
        run_stitcher(planner.jobs(), &stitcher, &config.source_uri)?
    } else {
        let registry = SourceRegistry::load(builtin_catalog(), &config.requires, runner);
        if !registry.skipped().is_empty() {
            let names: Vec<&str> = registry.skipped().iter().map(|s| s.name.as_str()).collect();
            log::info!("Continuing without modules: {}", names.join(", "));
        }
        let source = registry.open(&config.source_uri)?;
        run_renderer(planner.jobs(), source.as_ref())?
    };

    Ok(finish(report))
}

// ── Compare ──────────────────────────────────────────────────────────

/// Diff two render trees and build labeled side-by-side comparisons.
#[derive(Parser, Debug)]
#[command(name = "placecompare", version)]
pub struct CompareArgs {
    /// Place list (JSON name mapping or feature collection)
    #[arg(short = 'c', long = "config")]
    pub config: PathBuf,

    /// First render tree
    #[arg(short = 'a', long = "input-dir-a")]
    pub input_dir_a: Option<PathBuf>,

    /// Second render tree
    #[arg(short = 'b', long = "input-dir-b")]
    pub input_dir_b: Option<PathBuf>,

    /// Root of the difference image tree
    #[arg(short = 'o', long = "output-dir", default_value = ".")]
    pub output_dir: PathBuf,

    /// Root of the annotated side-by-side tree
    #[arg(short = 'j', long = "joined-output-dir")]
    pub joined_output_dir: Option<PathBuf>,

    /// Tile-source module (accepted for parity with placerender; diffing ignores it)
    #[arg(short = 'r', long = "require", action = ArgAction::Append)]
    pub require: Vec<String>,

    /// Caption drawn under the joined images
    #[arg(long)]
    pub label: Option<String>,

    /// Give up on an external call after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Tile-source URI (parsed but not used when diffing)
    pub uri: Option<String>,
}

impl CompareArgs {
    pub fn into_config(self) -> Result<CompareConfig, ConfigError> {
        let mut config = CompareConfig::new(
            &self.config,
            self.input_dir_a.as_deref(),
            self.input_dir_b.as_deref(),
            self.joined_output_dir.as_deref(),
        )?
        .with_output_dir(&self.output_dir)
        .with_requires(self.require)
        .with_source_uri(self.uri)
        .with_timeout(timeout_from_secs(self.timeout))?;
        if let Some(label) = self.label {
            config = config.with_label(&label);
        }
        Ok(config)
    }
}

/// Run a diff batch described by `config`. Aborts on the first failed job.
pub fn compare(config: &CompareConfig) -> Result<BatchReport, CliError> {
    let places = PlaceList::load(&config.places)?;
    let planner = RenderPlanner::new(&places.places, &config.output_dir)?;
    let tool = ImageMagick::new(ProcessRunner::new(config.timeout));
    log::info!(
        "Comparing {} jobs: {} vs {}",
        planner.job_count(),
        config.input_dir_a.display(),
        config.input_dir_b.display()
    );

    if let Some(warning) = unused_requires(&config.requires, "placecompare") {
        log::warn!("{}", warning);
    }

    let report = run_comparator(planner.jobs(), config, &tool)?;
    Ok(finish(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_render_args_short_flags() {
        let args = RenderArgs::try_parse_from([
            "placerender", "-c", "places.json", "-w", "800", "-h", "600", "-r", "mbtiles", "-r",
            "tilejson", "command:render-map",
        ])
        .unwrap();
        assert_eq!(args.width, 800);
        assert_eq!(args.height, 600);
        assert_eq!(args.require, vec!["mbtiles", "tilejson"]);

        let config = args.into_config().unwrap();
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.size, ImageSize::new(800, 600));
        assert_eq!(config.source_uri, "command:render-map");
    }

    #[test]
    fn test_render_args_require_uri_and_size() {
        assert!(RenderArgs::try_parse_from(["placerender", "-c", "p.json", "-w", "8", "-h", "8"]).is_err());
        assert!(RenderArgs::try_parse_from(["placerender", "-c", "p.json", "-w", "8", "command:x"]).is_err());
        let zero = RenderArgs::try_parse_from(["placerender", "-c", "p.json", "-w", "0", "-h", "8", "command:x"])
            .unwrap();
        assert!(matches!(zero.into_config(), Err(ConfigError::InvalidSize { .. })));
    }

    #[test]
    fn test_compare_args() {
        let args = CompareArgs::try_parse_from([
            "placecompare", "-c", "p.json", "-a", "run1", "-b", "run2", "-o", "diff", "-j", "joined",
            "--timeout", "30",
        ])
        .unwrap();
        let config = args.into_config().unwrap();
        assert_eq!(config.input_dir_a, PathBuf::from("run1"));
        assert_eq!(config.joined_output_dir, PathBuf::from("joined"));
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert!(config.source_uri.is_none());

        let missing = CompareArgs::try_parse_from(["placecompare", "-c", "p.json", "-a", "run1"]).unwrap();
        assert!(matches!(missing.into_config(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_render_unknown_protocol_fails_before_work() {
        let tmp = tempfile::tempdir().unwrap();
        let list = tmp.path().join("places.json");
        fs::write(&list, r#"{"a": {"lon": 1.0, "lat": 2.0, "minzoom": 1, "maxzoom": 1}}"#).unwrap();
        let config = RenderConfig::new(&list, "mbtiles:///nowhere.mbtiles", ImageSize::new(8, 8))
            .unwrap()
            .with_output_dir(&tmp.path().join("out"));
        assert!(matches!(
            render(&config),
            Err(CliError::Source(SourceError::UnknownProtocol(_)))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_render_with_command_source() {
        let tmp = tempfile::tempdir().unwrap();
        let list = tmp.path().join("places.json");
        fs::write(
            &list,
            r#"{"features": [{"properties": {"name": "harbor", "minzoom": 2, "maxzoom": 3},
                              "geometry": {"coordinates": [4.4, 51.2]}}]}"#,
        )
        .unwrap();
        let out = tmp.path().join("out");
        // `echo` prints its arguments, which is enough to stand in for PNG bytes
        let config = RenderConfig::new(&list, "command:echo", ImageSize::new(16, 16))
            .unwrap()
            .with_output_dir(&out);

        let report = render(&config).unwrap();
        assert_eq!(report.written.len(), 2);
        assert_eq!(
            fs::read_to_string(out.join("harbor").join("z3.png")).unwrap(),
            "4.4 51.2 16 16 3\n"
        );
    }

    #[test]
    fn test_render_stitcher_mode_skips_failures() {
        let tmp = tempfile::tempdir().unwrap();
        let list = tmp.path().join("places.json");
        fs::write(&list, r#"{"a": {"lon": 1.0, "lat": 2.0, "minzoom": 1, "maxzoom": 2}}"#).unwrap();
        let config = RenderConfig::new(&list, "https://t.example.org/{z}/{x}/{y}.png", ImageSize::new(8, 8))
            .unwrap()
            .with_output_dir(&tmp.path().join("out"))
            .with_stitcher(&tmp.path().join("no-such-stitch"));

        let report = render(&config).unwrap();
        assert!(report.written.is_empty());
        assert_eq!(report.skipped.len(), 2);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_unused_requires_warning() {
        assert_eq!(unused_requires(&[], "stitcher mode"), None);
        let warning = unused_requires(&["mbtiles".to_string(), "tilejson".to_string()], "placecompare")
            .unwrap();
        assert_eq!(
            warning,
            "Ignoring --require mbtiles, tilejson: placecompare does not use tile source modules"
        );
    }

    #[test]
    fn test_error_printed_once() {
        let err = CliError::Exec(ExecError::MissingInput(PathBuf::from("run1/a/z1.png")));
        let mut out = Vec::new();
        err.print(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Error: input image run1/a/z1.png does not exist\n"
        );

        let err = CliError::Source(SourceError::UnknownProtocol("mbtiles".to_string()));
        let mut out = Vec::new();
        err.print(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("Error:").count(), 1);
        assert!(text.contains("-r"));
    }

    #[test]
    fn test_compare_missing_inputs_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let list = tmp.path().join("places.json");
        fs::write(&list, r#"{"a": {"lon": 1.0, "lat": 2.0, "minzoom": 1, "maxzoom": 2}}"#).unwrap();
        let config = CompareConfig::new(
            &list,
            Some(&tmp.path().join("run1")),
            Some(&tmp.path().join("run2")),
            Some(&tmp.path().join("joined")),
        )
        .unwrap()
        .with_output_dir(&tmp.path().join("diff"));

        assert!(matches!(
            compare(&config),
            Err(CliError::Exec(ExecError::MissingInput(_)))
        ));
    }
}
