use std::ffi::{OsStr, OsString};
use std::io::{self, Read};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use tracing::debug;
use wadiff_tool_api::{ToolError, ToolResult};
use wait_timeout::ChildExt;

/// An external program invoked synchronously, optionally bounded by a timeout.
#[derive(Debug, Clone)]
pub struct ExternalCommand {
    program: OsString,
    timeout: Option<Duration>,
}

impl ExternalCommand {
    /// Program resolved from `env_var`, falling back to `default`.
    pub fn from_env(env_var: &str, default: &str) -> Self {
        let program = std::env::var_os(env_var).unwrap_or_else(|| OsString::from(default));
        Self::new(program)
    }

    /// Invoke `program` without a timeout.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Kill the program when it runs longer than `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run with `args`, requiring exit status 0.
    pub fn run<I, S>(&self, args: I) -> ToolResult<ProcessOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.run_accepting(args, &[0])
    }

    /// Run with `args`, treating any exit code in `accepted` as success.
    pub fn run_accepting<I, S>(&self, args: I, accepted: &[i32]) -> ToolResult<ProcessOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let program = self.program.to_string_lossy().into_owned();
        let mut command = Command::new(&self.program);
        command.args(args);
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        debug!(command = ?command, "spawning collaborator");

        let mut child = command.spawn().map_err(|source| ToolError::Spawn {
            program: program.clone(),
            source,
        })?;

        let stdout_handle = child.stdout.take().map(|mut stdout| {
            thread::spawn(move || -> io::Result<Vec<u8>> {
                let mut buffer = Vec::new();
                stdout.read_to_end(&mut buffer)?;
                Ok(buffer)
            })
        });

        let stderr_handle = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || -> io::Result<Vec<u8>> {
                let mut buffer = Vec::new();
                stderr.read_to_end(&mut buffer)?;
                Ok(buffer)
            })
        });

        if let Some(timeout) = self.timeout {
            match child.wait_timeout(timeout) {
                Ok(Some(_)) => (),
                Ok(None) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ToolError::TimedOut {
                        program,
                        after: timeout,
                    });
                }
                Err(err) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ToolError::message(format!(
                        "failed waiting on {program}: {err}"
                    )));
                }
            }
        }

        let status = child
            .wait()
            .map_err(|err| ToolError::message(format!("failed to reap {program}: {err}")))?;

        let stdout = join_reader(stdout_handle, &program, "stdout")?;
        let stderr = join_reader(stderr_handle, &program, "stderr")?;

        let accepted_status = status.code().is_some_and(|code| accepted.contains(&code));
        if !accepted_status {
            let code = status
                .code()
                .map_or_else(|| "terminated".to_string(), |c| c.to_string());
            return Err(ToolError::Exit {
                program,
                status: code,
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(ProcessOutput {
            stdout,
            stderr,
            code: status.code(),
        })
    }
}

fn join_reader(
    handle: Option<thread::JoinHandle<io::Result<Vec<u8>>>>,
    program: &str,
    stream: &str,
) -> ToolResult<String> {
    match handle {
        Some(handle) => {
            let bytes = handle
                .join()
                .map_err(|_| {
                    ToolError::message(format!("failed to join {program} {stream} reader"))
                })?
                .map_err(|err| {
                    ToolError::message(format!("failed to read {program} {stream}: {err}"))
                })?;
            Ok(String::from_utf8_lossy(&bytes).to_string())
        }
        None => Ok(String::new()),
    }
}

/// Captured output of a finished program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
}
