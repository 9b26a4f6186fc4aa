//! External process runner.
//!
//! Every interaction with the encoder (and with the downloader tool) goes
//! through [`ProcessRunner`]: stdout is discarded, stderr is read line by
//! line (lossily decoded) in its own task, and the child is killed if the run is cancelled
//! or the stderr stream breaks.

use std::collections::VecDeque;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::cancel::CancelSignal;
use crate::error::{MediaError, MediaResult};

/// Number of trailing stderr lines kept for error reports.
pub const STDERR_TAIL_LINES: usize = 20;

/// Result of a finished process run.
#[derive(Debug)]
pub struct ProcessOutcome<S> {
    /// State threaded through the stderr line handler
    pub state: S,
    pub status: ExitStatus,
    /// Last [`STDERR_TAIL_LINES`] stderr lines
    pub stderr_tail: Vec<String>,
}

impl<S> ProcessOutcome<S> {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn stderr_text(&self) -> String {
        self.stderr_tail.join("\n")
    }

    /// Turn a non-zero exit into [`MediaError::ProcessFailed`].
    pub fn into_result(self, program: &Path) -> MediaResult<S> {
        if self.status.success() {
            Ok(self.state)
        } else {
            let stderr = self.stderr_text();
            Err(MediaError::process_failed(
                program,
                self.status.code(),
                (!stderr.is_empty()).then_some(stderr),
            ))
        }
    }
}

/// Runner for external processes with stderr scanning and cancellation.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    cancel: CancelSignal,
}

impl ProcessRunner {
    /// Create a runner for the given executable.
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            cancel: CancelSignal::never(),
        }
    }

    /// Set cancellation signal.
    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run the process, feeding each stderr line to `on_line`.
    ///
    /// `state` is moved into the reader task and handed back in the
    /// outcome. A non-zero exit is not an error here; see
    /// [`ProcessOutcome::into_result`].
    pub async fn run<I, A, S, F>(
        &self,
        args: I,
        state: S,
        mut on_line: F,
    ) -> MediaResult<ProcessOutcome<S>>
    where
        I: IntoIterator<Item = A>,
        A: AsRef<OsStr>,
        S: Send + 'static,
        F: FnMut(&mut S, &str) + Send + 'static,
    {
        self.cancel.check()?;

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| match source.kind() {
                std::io::ErrorKind::NotFound => MediaError::ExecutableNotFound(self.program.clone()),
                _ => MediaError::SpawnFailed {
                    program: self.program.clone(),
                    source,
                },
            })?;

        debug!(program = %self.program.display(), pid = child.id(), "Process started");

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("stderr not captured"))?;

        let mut reader_task = tokio::spawn(async move {
            let mut state = state;
            let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
            let mut reader = BufReader::new(stderr);
            let mut buf = Vec::new();

            loop {
                buf.clear();
                if reader.read_until(b'\n', &mut buf).await? == 0 {
                    break;
                }

                // Encoder stat updates are separated by bare carriage returns
                let chunk = String::from_utf8_lossy(&buf);
                for line in chunk.split(|c: char| c == '\r' || c == '\n').filter(|l| !l.is_empty()) {
                    on_line(&mut state, line);
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line.to_string());
                }
            }

            Ok::<_, std::io::Error>((state, Vec::from(tail)))
        });

        let mut cancel = self.cancel.clone();
        let read_result = tokio::select! {
            joined = &mut reader_task => joined,
            _ = cancel.cancelled() => {
                info!(program = %self.program.display(), "Cancelled, killing process");
                reader_task.abort();
                kill(&mut child).await;
                return Err(MediaError::Cancelled);
            }
        };

        let (state, stderr_tail) = match read_result {
            Ok(Ok(read)) => read,
            Ok(Err(e)) => {
                warn!(program = %self.program.display(), error = %e, "Failed reading stderr, killing process");
                kill(&mut child).await;
                return Err(MediaError::Io(e));
            }
            Err(e) => {
                kill(&mut child).await;
                return Err(MediaError::internal(format!("stderr reader task failed: {e}")));
            }
        };

        let status = child.wait().await?;
        debug!(program = %self.program.display(), status = %status, "Process exited");

        Ok(ProcessOutcome {
            state,
            status,
            stderr_tail,
        })
    }
}

async fn kill(child: &mut Child) {
    if let Err(e) = child.kill().await {
        warn!(error = %e, "Failed to kill process");
    }
}

/// Resolve an executable path.
///
/// Bare program names are looked up in `PATH`; paths with a directory
/// component are checked for existence.
pub fn resolve_executable(program: impl AsRef<Path>) -> MediaResult<PathBuf> {
    let program = program.as_ref();
    if program.components().count() > 1 {
        return if program.exists() {
            Ok(program.to_path_buf())
        } else {
            Err(MediaError::ExecutableNotFound(program.to_path_buf()))
        };
    }
    which::which(program).map_err(|_| MediaError::ExecutableNotFound(program.to_path_buf()))
}

/// Check that the encoder executable is available.
pub fn check_encoder(encoder: impl AsRef<Path>) -> MediaResult<PathBuf> {
    resolve_executable(encoder)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn sh() -> ProcessRunner {
        ProcessRunner::new("/bin/sh")
    }

    #[tokio::test]
    async fn test_lines_reach_handler_in_order() {
        let outcome = sh()
            .run(
                ["-c", "echo one >&2; echo two >&2; echo stdout-only"],
                Vec::new(),
                |seen: &mut Vec<String>, line| seen.push(line.to_string()),
            )
            .await
            .unwrap();

        assert!(outcome.success());
        assert_eq!(outcome.state, vec!["one", "two"]);
        assert_eq!(outcome.stderr_tail, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_carriage_returns_split_lines() {
        let outcome = sh()
            .run(
                ["-c", "printf 'frame=1\\rframe=2\\n' >&2"],
                Vec::new(),
                |seen: &mut Vec<String>, line| seen.push(line.to_string()),
            )
            .await
            .unwrap();

        assert_eq!(outcome.state, vec!["frame=1", "frame=2"]);
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_reported_not_raised() {
        let outcome = sh()
            .run(["-c", "echo failing >&2; exit 3"], (), |_, _| {})
            .await
            .unwrap();

        assert!(!outcome.success());
        let err = outcome.into_result(Path::new("/bin/sh")).unwrap_err();
        assert_eq!(err.exit_code(), Some(3));
        assert_eq!(err.stderr(), Some("failing"));
    }

    #[tokio::test]
    async fn test_stderr_tail_is_bounded() {
        let outcome = sh()
            .run(["-c", "i=0; while [ $i -lt 50 ]; do echo line$i >&2; i=$((i+1)); done"], 0usize, |n, _| *n += 1)
            .await
            .unwrap();

        assert_eq!(outcome.state, 50);
        assert_eq!(outcome.stderr_tail.len(), STDERR_TAIL_LINES);
        assert_eq!(outcome.stderr_tail.last().map(String::as_str), Some("line49"));
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let err = ProcessRunner::new("/definitely/not/here/ffmpeg")
            .run(["-version"], (), |_, _| {})
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::ExecutableNotFound(_)));
    }

    #[tokio::test]
    async fn test_cancel_kills_running_process() {
        let (tx, signal) = CancelSignal::channel();
        let runner = sh().with_cancel(signal);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = tx.send(true);
        });

        let started = Instant::now();
        let err = runner
            .run(["-c", "sleep 30"], (), |_, _| {})
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_already_cancelled_does_not_spawn() {
        let (tx, signal) = CancelSignal::channel();
        tx.send(true).unwrap();

        let err = ProcessRunner::new("/definitely/not/here")
            .with_cancel(signal)
            .run(["x"], (), |_, _| {})
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
    }

    #[test]
    fn test_resolve_executable() {
        assert!(resolve_executable("/bin/sh").is_ok());
        assert!(resolve_executable("/no/such/binary").is_err());
        assert!(resolve_executable("sh").is_ok());
    }
}
