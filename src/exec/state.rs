// src/exec/state.rs

use std::io;

use serde::Serialize;

/// Lifecycle of the child process.
///
/// `Created → Running → {Exited, Killed, TimedOut}`; a child that could not
/// be started goes straight from `Created` to `SpawnFailed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessPhase {
    #[default]
    Created,
    Running,
    Exited,
    Killed,
    TimedOut,
    SpawnFailed,
}

impl ProcessPhase {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ProcessPhase::Created | ProcessPhase::Running)
    }
}

/// Exit code reported when the program could not be found.
pub const EXIT_NOT_FOUND: i32 = 127;

/// Exit code reported when the program could not be executed.
pub const EXIT_NOT_EXECUTABLE: i32 = 126;

/// Terminal status of the child, produced exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessState {
    pub exit_code: i32,
    pub did_timeout: bool,
    /// Signal that ended the child, if termination was signal-driven.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<String>,
    #[serde(skip)]
    pub phase: ProcessPhase,
}

impl ProcessState {
    /// Synthetic state for a child that never started.
    pub fn spawn_failed(err: &io::Error) -> Self {
        let exit_code = match err.kind() {
            io::ErrorKind::NotFound => EXIT_NOT_FOUND,
            io::ErrorKind::PermissionDenied => EXIT_NOT_EXECUTABLE,
            _ => 1,
        };
        Self {
            exit_code,
            did_timeout: false,
            signal: None,
            phase: ProcessPhase::SpawnFailed,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_without_absent_signal() {
        let state = ProcessState {
            exit_code: 0,
            did_timeout: false,
            signal: None,
            phase: ProcessPhase::Exited,
        };
        assert_eq!(
            serde_json::to_string(&state).unwrap(),
            r#"{"exitCode":0,"didTimeout":false}"#
        );
    }

    #[test]
    fn serializes_signal_when_present() {
        let state = ProcessState {
            exit_code: 143,
            did_timeout: true,
            signal: Some("SIGTERM".into()),
            phase: ProcessPhase::TimedOut,
        };
        assert_eq!(
            serde_json::to_string(&state).unwrap(),
            r#"{"exitCode":143,"didTimeout":true,"signal":"SIGTERM"}"#
        );
    }

    #[test]
    fn spawn_failures_get_shell_style_codes() {
        let not_found = io::Error::from(io::ErrorKind::NotFound);
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);

        let state = ProcessState::spawn_failed(&not_found);
        assert_eq!(state.exit_code, 127);
        assert_eq!(state.phase, ProcessPhase::SpawnFailed);
        assert!(state.phase.is_terminal());
        assert_eq!(ProcessState::spawn_failed(&denied).exit_code, 126);
    }
}
