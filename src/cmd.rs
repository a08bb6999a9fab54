use anyhow::{Context, Result, anyhow};
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, trace, warn};
use wait_timeout::ChildExt;

/// A builder for executing external commands with unified error handling
/// and an optional deadline.
pub struct Cmd<'a> {
    command: &'a str,
    args: Vec<&'a str>,
    timeout: Option<Duration>,
}

impl<'a> Cmd<'a> {
    /// Create a new command builder
    pub fn new(command: &'a str) -> Self {
        Self {
            command,
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Add multiple arguments
    pub fn args(mut self, args: &[&'a str]) -> Self {
        self.args.extend_from_slice(args);
        self
    }

    /// Kill the process if it has not exited after `timeout`
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Execute the command and return its stdout.
    /// Returns an error if the command fails (non-zero exit code) or times out.
    pub fn run(self) -> Result<String> {
        let Cmd {
            command,
            args,
            timeout,
        } = self;

        trace!(command, args = ?args, timeout = ?timeout, "cmd:run start");

        let mut child = Command::new(command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| {
                format!("Failed to execute command: {} {}", command, args.join(" "))
            })?;

        // Drain both pipes while waiting so a chatty child cannot block on a full pipe.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match timeout {
            Some(limit) => match child.wait_timeout(limit)? {
                Some(status) => status,
                None => {
                    kill(&mut child, command);
                    return Err(anyhow!(
                        "Command timed out after {}: {} {}",
                        humantime::format_duration(limit),
                        command,
                        args.join(" ")
                    ));
                }
            },
            None => child.wait()?,
        };

        let stdout = join(stdout);
        let stderr = join(stderr);

        if !status.success() {
            debug!(
                command,
                args = ?args,
                status = ?status.code(),
                stderr = %stderr.trim(),
                "cmd:run failure"
            );
            return Err(anyhow!(
                "Command failed: {} {}\n{}",
                command,
                args.join(" "),
                stderr.trim()
            ));
        }
        trace!(command, bytes = stdout.len(), "cmd:run success");
        Ok(stdout)
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

fn kill(child: &mut Child, command: &str) {
    if let Err(e) = child.kill() {
        warn!(command, error = %e, "cmd:failed to kill timed out process");
    }
    let _ = child.wait();
}
