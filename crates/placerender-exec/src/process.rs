//! Running external executables.
//!
//! Every external collaborator (stitcher, ImageMagick, command tile sources)
//! goes through [`ProcessRunner`], which captures output, enforces an
//! optional timeout, and turns a non-zero exit into an error.

use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("{program} did not finish within {after:?}")]
    TimedOut { program: String, after: Duration },

    #[error("I/O error while running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Captured result of a successful run.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    /// Log captured text output the way the batch tools report child chatter.
    pub fn log(&self, program: &str) {
        let stdout = String::from_utf8_lossy(&self.stdout);
        let stderr = String::from_utf8_lossy(&self.stderr);
        if !stdout.trim().is_empty() {
            log::info!("{} stdout: {}", program, stdout.trim_end());
        }
        if !stderr.trim().is_empty() {
            log::info!("{} stderr: {}", program, stderr.trim_end());
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Run `command` to completion with stdin closed and both output streams captured.
    pub fn run(&self, mut command: Command) -> Result<ProcessOutput, ProcessError> {
        let program = command.get_program().to_string_lossy().into_owned();
        log::debug!("Running {:?}", command);

        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: program.clone(),
                source,
            })?;

        // Drain both pipes on their own threads so a chatty child cannot block on a full pipe.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let io_err = |source: io::Error| ProcessError::Io {
            program: program.clone(),
            source,
        };
        let deadline = self.timeout.map(|limit| (Instant::now() + limit, limit));
        let status = match deadline {
            None => child.wait().map_err(io_err)?,
            Some((at, limit)) => match wait_until(&mut child, at).map_err(io_err)? {
                Some(status) => status,
                None => {
                    let _ = child.kill();
                    let _ = child.wait();
                    log::warn!("Killed {} after {:?}", program, limit);
                    return Err(ProcessError::TimedOut {
                        program,
                        after: limit,
                    });
                }
            },
        };

        // A process the child left behind can hold the pipes open after the child exits.
        let at = deadline.map(|(at, _)| at);
        let (stdout, stderr) = match (collect(stdout, at), collect(stderr, at)) {
            (Ok(Some(stdout)), Ok(Some(stderr))) => (stdout, stderr),
            (Err(e), _) | (_, Err(e)) => return Err(io_err(e)),
            _ => {
                let after = deadline.map(|(_, limit)| limit).unwrap_or_default();
                log::warn!("{} still holds its output open after {:?}", program, after);
                return Err(ProcessError::TimedOut { program, after });
            }
        };
        let output = ProcessOutput { stdout, stderr };

        if !status.success() {
            return Err(ProcessError::Failed {
                program,
                status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<io::Result<Vec<u8>>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let read = pipe.read_to_end(&mut buf).map(|_| buf);
        let _ = tx.send(read);
    });
    rx
}

/// Wait for a drained pipe. `Ok(None)` means `deadline` passed first.
fn collect(
    pipe: Option<Receiver<io::Result<Vec<u8>>>>,
    deadline: Option<Instant>,
) -> io::Result<Option<Vec<u8>>> {
    let Some(pipe) = pipe else {
        return Ok(Some(Vec::new()));
    };
    let stopped = || io::Error::new(io::ErrorKind::Other, "output reader stopped");
    let read = match deadline {
        None => pipe.recv().map_err(|_| stopped())?,
        Some(at) => match pipe.recv_timeout(at.saturating_duration_since(Instant::now())) {
            Ok(read) => read,
            Err(RecvTimeoutError::Timeout) => return Ok(None),
            Err(RecvTimeoutError::Disconnected) => return Err(stopped()),
        },
    };
    read.map(Some)
}

/// Wait for `child` until `deadline`; `None` means it is still running.
fn wait_until(child: &mut Child, deadline: Instant) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}
