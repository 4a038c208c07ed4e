// src/errors.rs

//! Crate-wide error types.
//!
//! Setup failures (everything that can go wrong before the child is
//! spawned) are [`TaskstreamError`]s and map to a distinct process exit code.
//! Once a child is running, failures are reported as data in the terminal
//! `exit` event instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::exit_codes;
use crate::task::tokenize::TokenizeError;

/// Why a raw task description was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("task description must be a JSON object")]
    NotAnObject,

    #[error("missing command: `{field}` must be a non-empty string or array of strings")]
    MissingCommand { field: &'static str },

    #[error("`cmdLine`: {0}")]
    UnterminatedQuote(#[from] TokenizeError),

    #[error("unknown property `{0}`")]
    UnknownProperty(String),

    #[error("invalid property `{field}`: expected {expected}")]
    InvalidProperty { field: String, expected: String },
}

#[derive(Error, Debug)]
pub enum TaskstreamError {
    #[error("no task identifier: {0}")]
    InputMissing(String),

    #[error("task `{id}` not found at {path:?}")]
    TaskNotFound { id: String, path: PathBuf },

    #[error("task file {path:?} is not valid JSON: {source}")]
    MalformedJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid task: {0}")]
    Validation(#[from] ValidationError),

    #[error("origin {origin:?} is not allowed")]
    OriginMismatch { origin: Option<String> },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskstreamError {
    /// Exit code the controlling program terminates with for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            TaskstreamError::InputMissing(_) => exit_codes::INPUT_MISSING,
            TaskstreamError::TaskNotFound { .. } | TaskstreamError::MalformedJson { .. } => {
                exit_codes::TASK_UNAVAILABLE
            }
            TaskstreamError::Validation(_) => exit_codes::INVALID_TASK,
            TaskstreamError::OriginMismatch { .. } => exit_codes::ORIGIN_MISMATCH,
            TaskstreamError::IoError(_) | TaskstreamError::Other(_) => exit_codes::CHILD_FAILURE,
        }
    }
}

pub type Result<T> = std::result::Result<T, TaskstreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_invalid_task() {
        let err = TaskstreamError::from(ValidationError::UnknownProperty("bogus".into()));
        assert_eq!(err.exit_code(), exit_codes::INVALID_TASK);
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn missing_command_names_the_field() {
        let err = ValidationError::MissingCommand { field: "cmdLine" };
        assert!(err.to_string().contains("cmdLine"));
    }

    #[test]
    fn setup_errors_have_distinct_codes() {
        let missing = TaskstreamError::InputMissing("none given".into());
        let not_found = TaskstreamError::TaskNotFound {
            id: "t".into(),
            path: PathBuf::from("t.json"),
        };
        let origin = TaskstreamError::OriginMismatch { origin: None };

        assert_eq!(missing.exit_code(), exit_codes::INPUT_MISSING);
        assert_eq!(not_found.exit_code(), exit_codes::TASK_UNAVAILABLE);
        assert_eq!(origin.exit_code(), exit_codes::ORIGIN_MISMATCH);
    }
}
