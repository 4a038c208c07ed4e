// src/task/model.rs

use std::collections::BTreeMap;

use serde::Serialize;

/// Validated, normalized task.
///
/// Serializes to the dry-run shape `{"cmdLine": [...], "options": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    /// Command vector; never empty.
    pub cmd_line: Vec<String>,
    pub options: TaskOptions,
}

impl TaskSpec {
    pub fn program(&self) -> &str {
        self.cmd_line.first().map(String::as_str).unwrap_or_default()
    }

    pub fn args(&self) -> &[String] {
        self.cmd_line.get(1..).unwrap_or_default()
    }
}

/// Execution options of a task. Defaults live in
/// [`OPTION_FIELDS`](super::schema::OPTION_FIELDS).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOptions {
    /// Look a bare program name up in `PATH`.
    pub use_path: bool,

    /// Run the joined command line through `shell -c`.
    pub use_shell: bool,

    /// Shell used when `use_shell` is set.
    pub shell: String,

    /// Deliver output one line at a time instead of in raw chunks.
    pub line_buffered: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,

    /// Deliver stderr content as stdout.
    pub redirect_stderr: bool,

    /// Emit `stderr` events.
    pub forward_stderr: bool,

    /// Seconds before the child is forcibly terminated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Remove the task file once the task is started.
    pub one_shot: bool,

    /// Extra variables merged over the ambient environment.
    pub env: BTreeMap<String, String>,
}

impl Default for TaskOptions {
    fn default() -> Self {
        super::schema::default_options()
    }
}
