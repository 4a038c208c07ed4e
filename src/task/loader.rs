// src/task/loader.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::{Result, TaskstreamError};
use crate::fs::{FileSystem, RealFileSystem};

pub const TASK_FILE_EXTENSION: &str = "json";

/// Reads task descriptions from `<tasks_dir>/<id>.json`.
#[derive(Debug, Clone)]
pub struct TaskLoader {
    fs: Arc<dyn FileSystem>,
    tasks_dir: PathBuf,
}

impl TaskLoader {
    pub fn new(fs: Arc<dyn FileSystem>, tasks_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            tasks_dir: tasks_dir.into(),
        }
    }

    /// Loader over the real filesystem.
    pub fn from_dir(tasks_dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(RealFileSystem), tasks_dir)
    }

    pub fn tasks_dir(&self) -> &Path {
        &self.tasks_dir
    }

    /// Path of the task file for `id`.
    ///
    /// Ids that could escape the tasks directory are rejected.
    pub fn task_path(&self, id: &str) -> Result<PathBuf> {
        let unusable = id.is_empty()
            || id == "."
            || id == ".."
            || id.contains(['/', '\\', '\0']);
        if unusable {
            return Err(TaskstreamError::InputMissing(format!(
                "task identifier {id:?} is not a plain name"
            )));
        }
        Ok(self
            .tasks_dir
            .join(format!("{id}.{TASK_FILE_EXTENSION}")))
    }

    /// Read and parse the raw task description for `id`.
    pub fn load(&self, id: &str) -> Result<Value> {
        let path = self.task_path(id)?;
        if !self.fs.is_file(&path) {
            return Err(TaskstreamError::TaskNotFound {
                id: id.to_string(),
                path,
            });
        }

        let contents = self.fs.read(&path)?;
        let raw = serde_json::from_slice(&contents)
            .map_err(|source| TaskstreamError::MalformedJson {
                path: path.clone(),
                source,
            })?;

        debug!(task = %id, path = ?path, "task description loaded");
        Ok(raw)
    }

    /// Remove the task file of a one-shot task.
    ///
    /// Failure only logs a warning; the task still runs.
    pub fn consume(&self, id: &str) {
        let path = match self.task_path(id) {
            Ok(path) => path,
            Err(e) => {
                warn!(task = %id, error = %e, "cannot consume one-shot task");
                return;
            }
        };

        match self.fs.remove_file(&path) {
            Ok(()) => info!(task = %id, path = ?path, "one-shot task file removed"),
            Err(e) => warn!(
                task = %id,
                path = ?path,
                error = %e,
                "failed to remove one-shot task file"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn loader(fs: &MockFileSystem) -> TaskLoader {
        TaskLoader::new(Arc::new(fs.clone()), "/tasks")
    }

    #[test]
    fn loads_json_from_tasks_dir() {
        let fs = MockFileSystem::new();
        fs.add_file("/tasks/build.json", r#"{"cmdLine":"make"}"#);

        let raw = loader(&fs).load("build").unwrap();
        assert_eq!(raw["cmdLine"], "make");
    }

    #[test]
    fn missing_file_is_task_not_found() {
        let fs = MockFileSystem::new();
        let err = loader(&fs).load("nope").unwrap_err();
        assert!(matches!(err, TaskstreamError::TaskNotFound { ref id, .. } if id == "nope"));
        assert_eq!(err.exit_code(), crate::exit_codes::TASK_UNAVAILABLE);
    }

    #[test]
    fn bad_json_is_malformed() {
        let fs = MockFileSystem::new();
        fs.add_file("/tasks/broken.json", "{ cmdLine: ");
        let err = loader(&fs).load("broken").unwrap_err();
        assert!(matches!(err, TaskstreamError::MalformedJson { .. }));
        assert_eq!(err.exit_code(), crate::exit_codes::TASK_UNAVAILABLE);
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        let fs = MockFileSystem::new();
        fs.add_file("/tasks/latin1.json", b"{\"cmdLine\":\"echo \xff\"}".to_vec());
        let err = loader(&fs).load("latin1").unwrap_err();
        assert!(matches!(err, TaskstreamError::MalformedJson { .. }));
        assert_eq!(err.exit_code(), crate::exit_codes::TASK_UNAVAILABLE);
    }

    #[test]
    fn path_like_ids_are_rejected() {
        let fs = MockFileSystem::new();
        for id in ["", "..", "../etc/passwd", "a/b", "a\\b"] {
            let err = loader(&fs).task_path(id).unwrap_err();
            assert!(matches!(err, TaskstreamError::InputMissing(_)), "{id:?}");
        }
    }

    #[test]
    fn consume_removes_the_file_once() {
        let fs = MockFileSystem::new();
        fs.add_file("/tasks/once.json", r#"{"cmdLine":"true"}"#);
        let loader = loader(&fs);

        loader.consume("once");
        assert!(!fs.contains("/tasks/once.json"));

        // second removal only warns
        loader.consume("once");
    }
}
