use std::path::{Path, PathBuf};
use std::process::Command;

use crate::process::{ProcessError, ProcessRunner};

/// External image operations the comparator needs.
pub trait ImageTool {
    /// Write the per-pixel difference of `a` and `b` to `out`.
    fn difference(&self, a: &Path, b: &Path, out: &Path) -> Result<(), ProcessError>;

    /// Place `inputs` side by side, left to right, into `out`.
    fn append(&self, inputs: &[&Path], out: &Path) -> Result<(), ProcessError>;

    /// Draw `label` along the bottom-left of `input` and write the result to `out`.
    fn annotate(&self, input: &Path, label: &str, out: &Path) -> Result<(), ProcessError>;
}

/// ImageMagick's `composite` and `convert` commands.
#[derive(Debug, Clone)]
pub struct ImageMagick {
    composite: PathBuf,
    convert: PathBuf,
    runner: ProcessRunner,
}

impl ImageMagick {
    pub fn new(runner: ProcessRunner) -> Self {
        Self {
            composite: PathBuf::from("composite"),
            convert: PathBuf::from("convert"),
            runner,
        }
    }

    /// Use explicit executables, e.g. when ImageMagick is not on `PATH`.
    pub fn with_programs(mut self, composite: &Path, convert: &Path) -> Self {
        self.composite = composite.to_path_buf();
        self.convert = convert.to_path_buf();
        self
    }

    fn run(&self, program: &Path, command: Command) -> Result<(), ProcessError> {
        let output = self.runner.run(command)?;
        output.log(&program.display().to_string());
        Ok(())
    }
}

impl ImageTool for ImageMagick {
    fn difference(&self, a: &Path, b: &Path, out: &Path) -> Result<(), ProcessError> {
        let mut command = Command::new(&self.composite);
        command.arg(a).arg(b).args(["-compose", "difference"]).arg(out);
        self.run(&self.composite, command)
    }

    fn append(&self, inputs: &[&Path], out: &Path) -> Result<(), ProcessError> {
        let mut command = Command::new(&self.convert);
        command.args(inputs).arg("+append").arg(out);
        self.run(&self.convert, command)
    }

    fn annotate(&self, input: &Path, label: &str, out: &Path) -> Result<(), ProcessError> {
        let mut command = Command::new(&self.convert);
        command
            .arg(input)
            .args(["-gravity", "southwest"])
            .args(["-stroke", "none"])
            .args(["-fill", "firebrick"])
            .args(["-font", "Arial"])
            .args(["-pointsize", "20"])
            .args(["-annotate", "+10+10", label])
            .arg(out);
        self.run(&self.convert, command)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_missing_executable_is_error() {
        let tool = ImageMagick::new(ProcessRunner::default()).with_programs(
            Path::new("/nonexistent/composite"),
            Path::new("/nonexistent/convert"),
        );
        let err = tool
            .difference(Path::new("a.png"), Path::new("b.png"), Path::new("d.png"))
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }

    #[test]
    fn test_argument_passthrough() {
        // `echo` stands in for both programs; success means every argument was accepted.
        let tool = ImageMagick::new(ProcessRunner::default())
            .with_programs(Path::new("echo"), Path::new("echo"));
        tool.difference(Path::new("a.png"), Path::new("b.png"), Path::new("d.png"))
            .unwrap();
        tool.append(&[Path::new("a.png"), Path::new("b.png")], Path::new("j.png"))
            .unwrap();
        tool.annotate(Path::new("j.png"), "phase 1   phase 2", Path::new("k.png"))
            .unwrap();
    }
}
