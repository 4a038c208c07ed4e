// src/exec/controller.rs

//! Child process lifecycle.
//!
//! [`spawn`] starts the child and returns a [`ProcessHandle`];
//! [`ProcessHandle::wait`] then races the suspension points of a running
//! child against each other:
//!
//! - the next chunk on stdout / stderr
//! - child termination
//! - the task timeout
//! - a termination request through the [`Terminator`]
//! - the kill grace period after a forced termination
//!
//! Whichever fires first drives the next transition. Output read before the
//! child terminated is always delivered before `wait` returns.

use std::io::{self, Write};
use std::process::ExitStatus;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStderr, ChildStdout};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::task::TaskSpec;
use crate::types::Signal;

use super::command::{build_command, describe};
use super::output::StreamDecoder;
use super::state::{ProcessPhase, ProcessState};
use super::OutputObserver;

/// How long a forcibly terminated child may linger before `SIGKILL`.
pub const KILL_GRACE: Duration = Duration::from_secs(2);

/// How long output is still drained after a forced termination.
pub const DRAIN_GRACE: Duration = Duration::from_millis(500);

const READ_BUF_SIZE: usize = 8 * 1024;

/// Requests forced termination of a child.
///
/// Clones share state. The first requested signal wins; later requests are
/// no-ops.
#[derive(Debug, Clone, Default)]
pub struct Terminator {
    token: CancellationToken,
    signal: Arc<OnceLock<Signal>>,
}

impl Terminator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Terminator driven by an existing cancellation token. Cancelling the
    /// token directly requests `SIGTERM`.
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            signal: Arc::default(),
        }
    }

    pub fn terminate(&self, signal: Signal) {
        let _ = self.signal.set(signal);
        self.token.cancel();
    }

    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn requested_signal(&self) -> Signal {
        self.signal.get().copied().unwrap_or_default()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

enum Launch {
    Running(Child),
    Failed(io::Error),
}

/// A spawned (or failed-to-spawn) child.
pub struct ProcessHandle {
    launch: Launch,
    terminator: Terminator,
    timeout: Option<Duration>,
    line_buffered: bool,
    redirect_stderr: bool,
    forward_stderr: bool,
}

/// Spawn the child described by `spec`.
///
/// Never fails: a child that cannot be started yields a handle whose
/// [`ProcessHandle::wait`] reports a synthetic non-zero exit. Must be called
/// from within a Tokio runtime.
pub fn spawn(spec: &TaskSpec, terminator: Terminator) -> ProcessHandle {
    let options = &spec.options;
    let command = describe(spec);

    let launch = match build_command(spec).spawn() {
        Ok(child) => {
            info!(command = %command, pid = child.id(), "child process started");
            Launch::Running(child)
        }
        Err(e) => {
            error!(command = %command, error = %e, "failed to start child process");
            Launch::Failed(e)
        }
    };

    ProcessHandle {
        launch,
        terminator,
        timeout: options.timeout.map(Duration::from_secs),
        line_buffered: options.line_buffered,
        redirect_stderr: options.redirect_stderr,
        forward_stderr: options.forward_stderr,
    }
}

/// Why the controller forced the child down.
#[derive(Debug, Clone, Copy)]
struct Forced {
    signal: Signal,
    timed_out: bool,
}

impl ProcessHandle {
    pub fn phase(&self) -> ProcessPhase {
        match self.launch {
            Launch::Running(_) => ProcessPhase::Running,
            Launch::Failed(_) => ProcessPhase::SpawnFailed,
        }
    }

    pub fn terminator(&self) -> Terminator {
        self.terminator.clone()
    }

    /// Stream output into `observer` until the child terminates, then
    /// return its final state.
    pub async fn wait(self, observer: &mut dyn OutputObserver) -> ProcessState {
        let mut child = match self.launch {
            Launch::Running(child) => child,
            Launch::Failed(err) => return ProcessState::spawn_failed(&err),
        };

        let mut delivery = Delivery {
            observer,
            terminator: self.terminator.clone(),
            stdout: StreamDecoder::new(self.line_buffered),
            stderr: StreamDecoder::new(self.line_buffered),
            redirect_stderr: self.redirect_stderr,
            forward_stderr: self.forward_stderr,
            open: true,
        };
        let mut stdout: Option<ChildStdout> = child.stdout.take();
        let mut stderr: Option<ChildStderr> = child.stderr.take();
        let mut out_buf = vec![0u8; READ_BUF_SIZE];
        let mut err_buf = vec![0u8; READ_BUF_SIZE];

        let token = self.terminator.token().clone();
        let deadline = self.timeout.and_then(|t| Instant::now().checked_add(t));
        let mut kill_at: Option<Instant> = None;
        let mut forced: Option<Forced> = None;

        let status = loop {
            tokio::select! {
                biased;

                _ = token.cancelled(), if forced.is_none() => {
                    let signal = self.terminator.requested_signal();
                    info!(signal = %signal, "termination requested; signalling child");
                    send_signal(&mut child, signal);
                    forced = Some(Forced { signal, timed_out: false });
                    kill_at = Some(Instant::now() + KILL_GRACE);
                }

                _ = sleep_until_opt(deadline), if deadline.is_some() && forced.is_none() => {
                    let signal = Signal::Term;
                    info!(timeout = ?self.timeout, "timeout elapsed; signalling child");
                    send_signal(&mut child, signal);
                    forced = Some(Forced { signal, timed_out: true });
                    kill_at = Some(Instant::now() + KILL_GRACE);
                }

                _ = sleep_until_opt(kill_at), if kill_at.is_some() => {
                    warn!("child still running after {:?}; sending SIGKILL", KILL_GRACE);
                    send_signal(&mut child, Signal::Kill);
                    if let Some(f) = forced.as_mut() {
                        f.signal = Signal::Kill;
                    }
                    kill_at = None;
                }

                read = read_some(&mut stdout, &mut out_buf), if stdout.is_some() => {
                    match read {
                        Ok(n) if n > 0 => delivery.stdout_bytes(&out_buf[..n]),
                        other => close_stream(&mut stdout, "stdout", other),
                    }
                }

                read = read_some(&mut stderr, &mut err_buf), if stderr.is_some() => {
                    match read {
                        Ok(n) if n > 0 => delivery.stderr_bytes(&err_buf[..n]),
                        other => close_stream(&mut stderr, "stderr", other),
                    }
                }

                status = child.wait() => break status,
            }
        };

        // Drain what the child wrote before it went away. A lingering
        // grandchild may keep the pipes open, so the drain is bounded: by
        // DRAIN_GRACE after a forced termination or a late termination
        // request, and by the task timeout (never less than DRAIN_GRACE past
        // the exit) after a natural exit.
        let mut drain_deadline = match forced {
            Some(_) => Some(Instant::now() + DRAIN_GRACE),
            None => deadline.map(|d| d.max(Instant::now() + DRAIN_GRACE)),
        };
        let mut drain_cancelled = false;
        while stdout.is_some() || stderr.is_some() {
            tokio::select! {
                biased;

                _ = sleep_until_opt(drain_deadline), if drain_deadline.is_some() => {
                    warn!("output still open after child exit; dropping the rest");
                    break;
                }

                _ = token.cancelled(), if forced.is_none() && !drain_cancelled => {
                    drain_cancelled = true;
                    let grace = Instant::now() + DRAIN_GRACE;
                    drain_deadline = Some(drain_deadline.map_or(grace, |d| d.min(grace)));
                }

                read = read_some(&mut stdout, &mut out_buf), if stdout.is_some() => {
                    match read {
                        Ok(n) if n > 0 => delivery.stdout_bytes(&out_buf[..n]),
                        other => close_stream(&mut stdout, "stdout", other),
                    }
                }

                read = read_some(&mut stderr, &mut err_buf), if stderr.is_some() => {
                    match read {
                        Ok(n) if n > 0 => delivery.stderr_bytes(&err_buf[..n]),
                        other => close_stream(&mut stderr, "stderr", other),
                    }
                }
            }
        }
        delivery.finish();

        let state = final_state(status, forced);
        info!(
            exit_code = state.exit_code,
            did_timeout = state.did_timeout,
            signal = ?state.signal,
            phase = ?state.phase,
            "child process terminated"
        );
        state
    }
}

/// Routes decoded output to the observer.
struct Delivery<'o> {
    observer: &'o mut dyn OutputObserver,
    terminator: Terminator,
    stdout: StreamDecoder,
    stderr: StreamDecoder,
    redirect_stderr: bool,
    forward_stderr: bool,
    /// Cleared once the observer fails; nothing is delivered afterwards.
    open: bool,
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

impl Delivery<'_> {
    fn stdout_bytes(&mut self, bytes: &[u8]) {
        for chunk in self.stdout.push(bytes) {
            self.send(Stream::Stdout, &chunk);
        }
    }

    fn stderr_bytes(&mut self, bytes: &[u8]) {
        if self.redirect_stderr {
            for chunk in self.stderr.push(bytes) {
                self.send(Stream::Stdout, &chunk);
            }
            return;
        }

        if let Err(e) = io::stderr().write_all(bytes) {
            debug!(error = %e, "failed to copy child stderr");
        }
        if self.forward_stderr {
            for chunk in self.stderr.push(bytes) {
                self.send(Stream::Stderr, &chunk);
            }
        }
    }

    fn finish(&mut self) {
        if let Some(rest) = self.stdout.finish() {
            self.send(Stream::Stdout, &rest);
        }
        if let Some(rest) = self.stderr.finish() {
            if self.redirect_stderr {
                self.send(Stream::Stdout, &rest);
            } else if self.forward_stderr {
                self.send(Stream::Stderr, &rest);
            }
        }
    }

    fn send(&mut self, stream: Stream, chunk: &str) {
        if !self.open {
            return;
        }
        let result = match stream {
            Stream::Stdout => self.observer.on_stdout(chunk),
            Stream::Stderr => self.observer.on_stderr(chunk),
        };
        if let Err(e) = result {
            warn!(error = %e, ?stream, "output channel closed; terminating child");
            self.open = false;
            self.terminator.terminate(Signal::Term);
        }
    }
}

async fn read_some<R: AsyncRead + Unpin>(
    reader: &mut Option<R>,
    buf: &mut [u8],
) -> io::Result<usize> {
    match reader {
        Some(r) => r.read(buf).await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_opt(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn close_stream<R>(reader: &mut Option<R>, name: &str, read: io::Result<usize>) {
    match read {
        Ok(_) => debug!(stream = name, "end of stream"),
        Err(e) => warn!(stream = name, error = %e, "read failed; closing stream"),
    }
    *reader = None;
}

fn send_signal(child: &mut Child, signal: Signal) {
    let Some(pid) = child.id() else {
        debug!(signal = %signal, "child already reaped; nothing to signal");
        return;
    };

    #[cfg(unix)]
    {
        // SAFETY: kill(2) has no memory-safety preconditions.
        let rc = unsafe { libc::kill(pid as libc::pid_t, signal.as_raw()) };
        if rc != 0 {
            warn!(
                pid,
                signal = %signal,
                error = %io::Error::last_os_error(),
                "failed to signal child"
            );
        }
    }

    #[cfg(not(unix))]
    {
        debug!(pid, signal = %signal, "signals unsupported; killing child");
        if let Err(e) = child.start_kill() {
            warn!(pid, error = %e, "failed to kill child");
        }
    }
}

fn final_state(status: io::Result<ExitStatus>, forced: Option<Forced>) -> ProcessState {
    let phase = match forced {
        None => ProcessPhase::Exited,
        Some(Forced { timed_out: true, .. }) => ProcessPhase::TimedOut,
        Some(Forced { timed_out: false, .. }) => ProcessPhase::Killed,
    };

    let status = match status {
        Ok(status) => status,
        Err(e) => {
            error!(error = %e, "failed to collect child exit status");
            return ProcessState {
                exit_code: 1,
                did_timeout: forced.is_some_and(|f| f.timed_out),
                signal: forced.map(|f| f.signal.name().to_string()),
                phase,
            };
        }
    };

    ProcessState {
        exit_code: exit_code(&status),
        did_timeout: forced.is_some_and(|f| f.timed_out),
        signal: forced
            .map(|f| f.signal.name().to_string())
            .or_else(|| exit_signal(&status)),
        phase,
    }
}

fn exit_code(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signo) = status.signal() {
            return 128 + signo;
        }
    }
    1
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<String> {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map(crate::types::signal_name)
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<String> {
    None
}
