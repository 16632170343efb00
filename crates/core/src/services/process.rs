use std::ffi::{OsStr, OsString};
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{ExitState, ProcessOutput};

const POLL_INTERVAL: Duration = Duration::from_millis(25);
/// How long output is still collected after the process has exited.
const OUTPUT_GRACE: Duration = Duration::from_secs(2);
/// Lower bound on that window so output already in the pipes is not dropped.
const MIN_OUTPUT_WINDOW: Duration = Duration::from_millis(100);

/// Fully-specified external command: program, arguments, and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub working_dir: PathBuf,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args: Vec::new(), working_dir: working_dir.into() }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Arguments as (lossy) UTF-8 strings, for logging and assertions.
    pub fn arg_strings(&self) -> Vec<String> {
        self.args.iter().map(|a| a.to_string_lossy().to_string()).collect()
    }

    /// Value following a flag such as `-out`, if present.
    pub fn value_after(&self, flag: &str) -> Option<&OsStr> {
        self.args
            .iter()
            .position(|a| a.as_os_str() == OsStr::new(flag))
            .and_then(|idx| self.args.get(idx + 1))
            .map(|a| a.as_os_str())
    }

    /// Single-line rendering of the command for logs.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.arg_strings());
        parts.join(" ")
    }
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to wait for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Runs external commands to completion and captures their merged output.
///
/// Implementations block until the process exits (or is stopped). Tests
/// substitute fakes that never touch a real interpreter.
pub trait ProcessLauncher: Send + Sync {
    fn run(&self, command: &ToolCommand) -> Result<ProcessOutput, LaunchError>;
}

/// Launcher backed by `std::process`, with an optional time box.
#[derive(Debug, Clone, Default)]
pub struct SystemLauncher {
    timeout: Option<Duration>,
}

impl SystemLauncher {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl ProcessLauncher for SystemLauncher {
    fn run(&self, command: &ToolCommand) -> Result<ProcessOutput, LaunchError> {
        let program = command.program.display().to_string();
        debug!(command = %command.display(), cwd = %command.working_dir.display(), "spawning");

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .current_dir(&command.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| LaunchError::Spawn { program: program.clone(), source })?;

        let deadline = self.timeout.map(|limit| Instant::now() + limit);
        let (tx, rx) = mpsc::channel();
        if let Some(stdout) = child.stdout.take() {
            drain(stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            drain(stderr, tx.clone());
        }
        drop(tx);

        let exit = wait_with_deadline(&mut child, self.timeout, deadline)
            .map_err(|source| LaunchError::Wait { program, source })?;
        if matches!(exit, ExitState::TimedOut(_)) {
            warn!(command = %command.display(), "process timed out and was killed");
        }

        let bytes = collect_output(&rx, &exit, deadline);
        Ok(ProcessOutput { exit, log: String::from_utf8_lossy(&bytes).to_string() })
    }
}

// Reader threads are detached: a descendant that inherited the pipes can keep
// them open long after the process itself is gone.
fn drain<R: Read + Send + 'static>(mut source: R, sink: Sender<Vec<u8>>) {
    thread::spawn(move || {
        let mut buf = [0u8; 8192];
        loop {
            match source.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if sink.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
    });
}

/// Gather what the readers produced. Stops at EOF on both pipes, or when the
/// collection window closes (the deadline, capped by `OUTPUT_GRACE`).
fn collect_output(rx: &Receiver<Vec<u8>>, exit: &ExitState, deadline: Option<Instant>) -> Vec<u8> {
    let now = Instant::now();
    let until = if matches!(exit, ExitState::TimedOut(_)) {
        now + MIN_OUTPUT_WINDOW
    } else {
        let grace = now + OUTPUT_GRACE;
        deadline.map_or(grace, |d| d.min(grace)).max(now + MIN_OUTPUT_WINDOW)
    };

    let mut bytes = Vec::new();
    loop {
        match rx.recv_timeout(until.saturating_duration_since(Instant::now())) {
            Ok(chunk) => bytes.extend_from_slice(&chunk),
            Err(RecvTimeoutError::Timeout) => {
                debug!("output pipes still open after exit; keeping partial log");
                bytes.extend(rx.try_iter().flatten());
                break;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    bytes
}

fn wait_with_deadline(
    child: &mut Child,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
) -> io::Result<ExitState> {
    let (Some(limit), Some(deadline)) = (timeout, deadline) else {
        return child.wait().map(exit_state);
    };

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(exit_state(status));
        }
        let now = Instant::now();
        if now >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(ExitState::TimedOut(limit));
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

fn exit_state(status: ExitStatus) -> ExitState {
    status.code().map(ExitState::Exited).unwrap_or(ExitState::Signaled)
}
