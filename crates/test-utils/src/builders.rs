#![allow(dead_code)]

use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value, json};

/// Builder for raw task descriptions (the JSON a task file holds).
///
/// Options are only emitted when set, so tests exercise the defaults
/// unless they say otherwise.
#[derive(Debug, Clone)]
pub struct TaskJsonBuilder {
    fields: Map<String, Value>,
}

impl TaskJsonBuilder {
    /// Task with a string command line, tokenized on load.
    pub fn new(cmd_line: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("cmdLine".into(), json!(cmd_line));
        Self { fields }
    }

    /// Task with an already split command vector.
    pub fn argv(cmd_line: &[&str]) -> Self {
        let mut fields = Map::new();
        fields.insert("cmdLine".into(), json!(cmd_line));
        Self { fields }
    }

    pub fn use_path(self, val: bool) -> Self {
        self.set("usePath", json!(val))
    }

    pub fn use_shell(self, val: bool) -> Self {
        self.set("useShell", json!(val))
    }

    pub fn shell(self, shell: &str) -> Self {
        self.set("shell", json!(shell))
    }

    pub fn line_buffered(self, val: bool) -> Self {
        self.set("lineBuffered", json!(val))
    }

    pub fn cwd(self, dir: impl AsRef<Path>) -> Self {
        self.set("cwd", json!(dir.as_ref().to_string_lossy()))
    }

    pub fn redirect_stderr(self, val: bool) -> Self {
        self.set("redirectStderr", json!(val))
    }

    pub fn forward_stderr(self, val: bool) -> Self {
        self.set("forwardStderr", json!(val))
    }

    pub fn timeout(self, secs: u64) -> Self {
        self.set("timeout", json!(secs))
    }

    pub fn one_shot(self, val: bool) -> Self {
        self.set("oneShot", json!(val))
    }

    pub fn env(mut self, name: &str, value: &str) -> Self {
        let env = self
            .fields
            .entry("env")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = env {
            map.insert(name.into(), json!(value));
        }
        self
    }

    /// Arbitrary property, including ones the validator does not know.
    pub fn set(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn build(self) -> Value {
        Value::Object(self.fields)
    }

    /// Write the description to `<dir>/<id>.json` and return the path.
    pub fn write_to(self, dir: impl AsRef<Path>, id: &str) -> io::Result<PathBuf> {
        let path = dir.as_ref().join(format!("{id}.json"));
        std::fs::write(&path, self.build().to_string())?;
        Ok(path)
    }
}
