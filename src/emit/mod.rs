// src/emit/mod.rs

//! Line-delimited JSON events on stdout.
//!
//! Every event is one JSON object followed by `\n`, written in a single
//! `write_all` and flushed straight away so a consumer sees output as the
//! child produces it. The `exit` event is always the last one.

use std::io::{self, Write};

use serde::Serialize;
use tracing::{debug, trace};

use crate::exec::{OutputObserver, ProcessState};
use crate::task::TaskSpec;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum Event<'a> {
    Stdout { data: &'a str, timestamp: i64 },
    Stderr { data: &'a str, timestamp: i64 },
    Exit { state: &'a ProcessState, timestamp: i64 },
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Serializes events onto a writer.
#[derive(Debug)]
pub struct EventEmitter<W: Write> {
    out: W,
    exited: bool,
}

impl<W: Write> EventEmitter<W> {
    pub fn new(out: W) -> Self {
        Self { out, exited: false }
    }

    pub fn emit(&mut self, event: &Event<'_>) -> io::Result<()> {
        if self.exited {
            trace!("dropping event after exit");
            return Ok(());
        }
        if matches!(event, Event::Exit { .. }) {
            self.exited = true;
        }
        write_line(&mut self.out, event)
    }

    /// Emit the terminal `exit` event.
    pub fn emit_exit(&mut self, state: &ProcessState) -> io::Result<()> {
        debug!(exit_code = state.exit_code, "emitting exit event");
        self.emit(&Event::Exit {
            state,
            timestamp: now_millis(),
        })
    }

    pub fn has_exited(&self) -> bool {
        self.exited
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> OutputObserver for EventEmitter<W> {
    fn on_stdout(&mut self, chunk: &str) -> io::Result<()> {
        self.emit(&Event::Stdout {
            data: chunk,
            timestamp: now_millis(),
        })
    }

    fn on_stderr(&mut self, chunk: &str) -> io::Result<()> {
        self.emit(&Event::Stderr {
            data: chunk,
            timestamp: now_millis(),
        })
    }
}

/// Write the dry-run rendering of a validated task as one JSON line.
pub fn write_dry_run<W: Write>(out: &mut W, spec: &TaskSpec) -> io::Result<()> {
    write_line(out, spec)
}

fn write_line<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> io::Result<()> {
    let mut line = serde_json::to_vec(value).map_err(io::Error::other)?;
    line.push(b'\n');
    out.write_all(&line)?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::exec::ProcessPhase;
    use crate::task::TaskOptions;

    fn lines(buf: &[u8]) -> Vec<Value> {
        std::str::from_utf8(buf)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn exit_state(code: i32) -> ProcessState {
        ProcessState {
            exit_code: code,
            did_timeout: false,
            signal: None,
            phase: ProcessPhase::Exited,
        }
    }

    #[test]
    fn output_events_have_the_wire_shape() {
        let mut emitter = EventEmitter::new(Vec::new());
        emitter.on_stdout("hello \"world\"").unwrap();
        emitter.on_stderr("oops").unwrap();

        let events = lines(&emitter.into_inner());
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["event"], "stdout");
        assert_eq!(events[0]["data"], "hello \"world\"");
        assert!(events[0]["timestamp"].as_i64().unwrap() > 0);
        assert_eq!(events[1]["event"], "stderr");
        assert_eq!(events[1]["data"], "oops");
    }

    #[test]
    fn exit_is_terminal() {
        let mut emitter = EventEmitter::new(Vec::new());
        emitter.on_stdout("a").unwrap();
        emitter.emit_exit(&exit_state(3)).unwrap();
        emitter.on_stdout("late").unwrap();
        emitter.emit_exit(&exit_state(0)).unwrap();
        assert!(emitter.has_exited());

        let events = lines(&emitter.into_inner());
        assert_eq!(events.len(), 2);
        assert_eq!(events[1]["event"], "exit");
        assert_eq!(events[1]["state"], json!({"exitCode": 3, "didTimeout": false}));
    }

    #[test]
    fn multi_line_chunks_stay_one_event() {
        let mut emitter = EventEmitter::new(Vec::new());
        emitter.on_stdout("a\nb\n").unwrap();

        let out = emitter.into_inner();
        assert_eq!(out.iter().filter(|b| **b == b'\n').count(), 1);
        assert_eq!(lines(&out)[0]["data"], "a\nb\n");
    }

    #[test]
    fn dry_run_omits_absent_options() {
        let spec = TaskSpec {
            cmd_line: vec!["echo".into(), "hi".into()],
            options: TaskOptions::default(),
        };
        let mut out = Vec::new();
        write_dry_run(&mut out, &spec).unwrap();

        let value = &lines(&out)[0];
        assert_eq!(value["cmdLine"], json!(["echo", "hi"]));
        assert_eq!(value["options"]["usePath"], true);
        assert!(value["options"].get("cwd").is_none());
        assert!(value["options"].get("timeout").is_none());
    }

    struct Closed;

    impl Write for Closed {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failures_surface_to_the_controller() {
        let mut emitter = EventEmitter::new(Closed);
        let err = emitter.on_stdout("x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
