#![allow(dead_code)]

use std::collections::BTreeMap;

use serde_json::Value;

use taskstream::context::RuntimeContext;
use taskstream::exec::{self, ProcessState, Terminator};
use taskstream::task::{TaskSpec, validate};

pub use taskstream_test_utils::observer::Chunk;
pub use taskstream_test_utils::{RecordingObserver, TaskJsonBuilder, init_tracing, with_timeout};

/// Context with only `PATH` from the real environment, plus `extra`.
pub fn context(extra: &[(&str, &str)]) -> RuntimeContext {
    let mut env = BTreeMap::new();
    if let Ok(path) = std::env::var("PATH") {
        env.insert("PATH".to_string(), path);
    }
    for (k, v) in extra {
        env.insert(k.to_string(), v.to_string());
    }
    RuntimeContext::new(env)
}

/// Validate a raw description leniently against an empty context.
pub fn spec(raw: Value) -> TaskSpec {
    validate(&raw, false, &context(&[]).resolver()).expect("task should validate")
}

/// Run `raw` to completion, recording output.
pub async fn run(raw: Value) -> (ProcessState, RecordingObserver) {
    let mut observer = RecordingObserver::new();
    let handle = exec::spawn(&spec(raw), Terminator::new());
    let state = with_timeout(handle.wait(&mut observer)).await;
    (state, observer)
}

/// Parse line-delimited JSON events.
pub fn events(out: &[u8]) -> Vec<Value> {
    std::str::from_utf8(out)
        .expect("events are UTF-8")
        .lines()
        .map(|l| serde_json::from_str(l).expect("each line is one JSON object"))
        .collect()
}
