// src/exec/mod.rs

//! Process execution layer.
//!
//! Runs exactly one validated task as a child process and streams what it
//! writes to an [`OutputObserver`].
//!
//! - [`command`] turns a [`TaskSpec`](crate::task::TaskSpec) into a
//!   `tokio::process::Command`.
//! - [`controller`] owns the child: output pumping, timeout, termination
//!   requests and kill escalation.
//! - [`output`] decodes raw pipe reads into lines or UTF-8 chunks.
//! - [`state`] holds the terminal [`ProcessState`] reported once the child
//!   is gone.

use std::io;

pub mod command;
pub mod controller;
pub mod output;
pub mod state;

pub use command::build_command;
pub use controller::{ProcessHandle, Terminator, spawn};
pub use state::{ProcessPhase, ProcessState};

/// Receives the child's output as it is produced.
///
/// Chunks arrive in the order the child wrote them within one stream. An
/// `Err` means the consumer is gone; the controller then stops delivering
/// and terminates the child.
pub trait OutputObserver {
    fn on_stdout(&mut self, chunk: &str) -> io::Result<()>;
    fn on_stderr(&mut self, chunk: &str) -> io::Result<()>;
}
