//! External command execution utilities.
//!
//! Provides a Builder-based API for running external tools with captured
//! output and a bounded wait.
//!
//! # Examples
//!
//! ```ignore
//! use crate::utils::exec::Cmd;
//!
//! // Simple command
//! Cmd::new("potrace").args(["-s", "in.bmp", "-o", "out.svg"]).run()?;
//!
//! // From a configured command array, killed after 30s
//! Cmd::from_slice(&["sh", "trace.sh"])
//!     .args(["-s", "in.bmp", "-o", "out.svg"])
//!     .timeout(Duration::from_secs(30))
//!     .run()?;
//! ```

use std::{
    ffi::{OsStr, OsString},
    io::{self, Read},
    process::{Child, Command, ExitStatus, Output, Stdio},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};
use thiserror::Error;

/// Poll interval while waiting for a child with a deadline.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Errors from running an external command.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("`{program}` not found on PATH")]
    NotFound { program: String },

    #[error("Failed to spawn `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Command `{program}` failed with {status}\n{stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Command `{program}` timed out after {}s and was killed", .timeout.as_secs_f32())]
    TimedOut { program: String, timeout: Duration },

    #[error("Failed to wait for `{program}`")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

// ============================================================================
// Builder API
// ============================================================================

/// Command builder for external process execution.
#[derive(Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    timeout: Option<Duration>,
}

impl Cmd {
    /// Create a new command builder.
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            ..Default::default()
        }
    }

    /// Create from a command array (e.g., `["potrace"]` or `["sh", "trace.sh"]`).
    pub fn from_slice<S: AsRef<OsStr>>(cmd: &[S]) -> Self {
        match cmd.split_first() {
            Some((program, args)) => Self::new(program).args(args),
            None => Self::default(),
        }
    }

    /// Add a single argument.
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        let arg = arg.as_ref();
        if !arg.is_empty() {
            self.args.push(arg.to_owned());
        }
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            let arg = arg.as_ref();
            if !arg.is_empty() {
                self.args.push(arg.to_owned());
            }
        }
        self
    }

    /// Kill the process if it has not exited after `timeout`.
    ///
    /// Only the direct child is killed. Wrapper scripts should `exec` the
    /// real program so the kill reaches it.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Get the program name for error messages.
    fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    /// Execute the command and return its output.
    ///
    /// A non-zero exit status is an error carrying the captured stderr.
    pub fn run(self) -> Result<Output, ExecError> {
        let program = self.program_name();

        if which::which(&self.program).is_err() {
            return Err(ExecError::NotFound { program });
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => ExecError::NotFound {
                program: program.clone(),
            },
            _ => ExecError::Spawn {
                program: program.clone(),
                source,
            },
        })?;

        // Drain pipes on reader threads so a chatty child cannot block on a full pipe
        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        let status = match self.timeout {
            Some(timeout) => wait_with_deadline(&mut child, timeout, &program)?,
            None => child.wait().map_err(|source| ExecError::Wait {
                program: program.clone(),
                source,
            })?,
        };

        let output = Output {
            status,
            stdout: join_reader(stdout),
            stderr: join_reader(stderr),
        };

        if !output.status.success() {
            return Err(ExecError::Failed {
                program,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Poll the child until it exits or the deadline passes.
///
/// On expiry the child is killed and reaped before returning `TimedOut`.
/// Descendants that still hold the output pipes are not waited for: the
/// reader threads are detached.
fn wait_with_deadline(
    child: &mut Child,
    timeout: Duration,
    program: &str,
) -> Result<ExitStatus, ExecError> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ExecError::TimedOut {
                    program: program.to_string(),
                    timeout,
                });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(source) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ExecError::Wait {
                    program: program.to_string(),
                    source,
                });
            }
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd_builder() {
        let cmd = Cmd::new("echo")
            .arg("hello")
            .args(["world", "!"])
            .timeout(Duration::from_secs(1));

        assert_eq!(cmd.program, OsString::from("echo"));
        assert_eq!(cmd.args.len(), 3);
        assert_eq!(cmd.timeout, Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_from_slice() {
        let cmd = Cmd::from_slice(&["sh", "trace.sh"]).args(["-s", "in.bmp"]);
        assert_eq!(cmd.program, OsString::from("sh"));
        assert_eq!(cmd.args, vec!["trace.sh", "-s", "in.bmp"]);

        let empty = Cmd::from_slice::<&str>(&[]);
        assert!(empty.program.is_empty());
        assert!(empty.args.is_empty());
    }

    #[test]
    fn test_empty_args_filtered() {
        let cmd = Cmd::new("echo").arg("").args(["a", "", "b"]);
        assert_eq!(cmd.args.len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_simple_command() {
        let output = Cmd::new("echo").arg("hello").run().unwrap();
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("hello"));
    }

    #[test]
    fn test_missing_program() {
        let err = Cmd::new("pixtrace-definitely-not-installed").run().unwrap_err();
        assert!(matches!(err, ExecError::NotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_carries_stderr() {
        let err = Cmd::new("sh")
            .args(["-c", "echo broken input >&2; exit 3"])
            .run()
            .unwrap_err();
        match err {
            ExecError::Failed { stderr, status, .. } => {
                assert_eq!(stderr, "broken input");
                assert_eq!(status.code(), Some(3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_child() {
        let start = Instant::now();
        let err = Cmd::new("sh")
            .args(["-c", "sleep 10"])
            .timeout(Duration::from_millis(200))
            .run()
            .unwrap_err();
        assert!(matches!(err, ExecError::TimedOut { .. }));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_returns_while_grandchild_holds_pipes() {
        // No `exec`: `sleep` outlives the killed shell and keeps stdout open
        let start = Instant::now();
        let err = Cmd::new("sh")
            .args(["-c", "sleep 3; true"])
            .timeout(Duration::from_millis(200))
            .run()
            .unwrap_err();
        assert!(matches!(err, ExecError::TimedOut { .. }));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[cfg(unix)]
    #[test]
    fn test_fast_command_within_timeout() {
        let output = Cmd::new("sh")
            .args(["-c", "printf ok"])
            .timeout(Duration::from_secs(5))
            .run()
            .unwrap();
        assert_eq!(output.stdout, b"ok");
    }
}
