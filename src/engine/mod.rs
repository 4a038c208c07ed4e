// src/engine/mod.rs

//! Orchestration of a single invocation.
//!
//! [`run_invocation`] walks the fixed pipeline:
//! - origin guard
//! - task id resolution
//! - loading and validating the task description
//! - dry run, or one-shot consumption followed by spawning the child
//! - streaming events until the terminal `exit` event
//!
//! Everything up to the spawn fails with a [`TaskstreamError`] and writes
//! nothing to the event channel. Past the spawn, failures are reported in
//! the `exit` event.
//!
//! [`signals`] relays termination signals received by this process to the
//! running child.

pub mod signals;

use std::io::Write;

use tracing::{debug, info, warn};

use crate::context::RuntimeContext;
use crate::emit::{EventEmitter, write_dry_run};
use crate::errors::{Result, TaskstreamError};
use crate::exec::{self, Terminator};
use crate::exit_codes;
use crate::task::{TaskLoader, TaskSpec, validate};

/// Per-invocation switches.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Reject unknown keys and invalid option values instead of ignoring them.
    pub strict: bool,
    /// Print the resolved task instead of running it.
    pub dry_run: bool,
    /// Origins allowed to run tasks. Empty allows any.
    pub allowed_origins: Vec<String>,
}

/// Run one invocation to completion and return the process exit code.
pub async fn run_invocation<W: Write>(
    ctx: &RuntimeContext,
    loader: &TaskLoader,
    options: &RunOptions,
    out: W,
    terminator: Terminator,
) -> Result<i32> {
    check_origin(ctx, &options.allowed_origins)?;

    let (id, spec) = prepare(ctx, loader, options.strict)?;

    if options.dry_run {
        let mut out = out;
        write_dry_run(&mut out, &spec)?;
        info!(task = %id, "dry run complete; nothing executed");
        return Ok(exit_codes::SUCCESS);
    }

    if terminator.is_requested() {
        warn!(
            task = %id,
            signal = %terminator.requested_signal(),
            "termination requested before spawn; not running task"
        );
        return Ok(exit_codes::CHILD_FAILURE);
    }

    if spec.options.one_shot {
        loader.consume(&id);
    }

    let mut emitter = EventEmitter::new(out);
    let handle = exec::spawn(&spec, terminator);
    let state = handle.wait(&mut emitter).await;

    if let Err(e) = emitter.emit_exit(&state) {
        warn!(task = %id, error = %e, "failed to emit exit event");
    }

    Ok(if state.success() {
        exit_codes::SUCCESS
    } else {
        exit_codes::CHILD_FAILURE
    })
}

/// Resolve, load and validate the task named by `ctx`.
pub fn prepare(
    ctx: &RuntimeContext,
    loader: &TaskLoader,
    strict: bool,
) -> Result<(String, TaskSpec)> {
    let id = ctx
        .task_id()
        .ok_or_else(|| {
            TaskstreamError::InputMissing(
                "pass --task, set TASKSTREAM_TASK or add `task=` to the query string".into(),
            )
        })?
        .to_string();

    let raw = loader.load(&id)?;
    let spec = validate(&raw, strict, &ctx.resolver())?;
    debug!(task = %id, cmd_line = ?spec.cmd_line, options = ?spec.options, "task validated");

    Ok((id, spec))
}

/// Reject the request when origins are restricted and the request origin is
/// absent or not listed.
pub fn check_origin(ctx: &RuntimeContext, allowed: &[String]) -> Result<()> {
    if allowed.is_empty() {
        return Ok(());
    }
    match ctx.origin() {
        Some(origin) if allowed.iter().any(|a| a == origin) => Ok(()),
        origin => {
            warn!(origin = ?origin, allowed = ?allowed, "request origin rejected");
            Err(TaskstreamError::OriginMismatch {
                origin: origin.map(str::to_string),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn loader(fs: &MockFileSystem) -> TaskLoader {
        TaskLoader::new(Arc::new(fs.clone()), "/tasks")
    }

    #[test]
    fn origins_are_unrestricted_by_default() {
        let ctx = RuntimeContext::default();
        assert!(check_origin(&ctx, &[]).is_ok());
    }

    #[test]
    fn origin_must_be_listed() {
        let allowed = vec!["https://ok.example".to_string()];

        let ok = RuntimeContext::default().with_origin("https://ok.example");
        assert!(check_origin(&ok, &allowed).is_ok());

        let other = RuntimeContext::default().with_origin("https://evil.example");
        let err = check_origin(&other, &allowed).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::ORIGIN_MISMATCH);

        let absent = RuntimeContext::default();
        assert!(matches!(
            check_origin(&absent, &allowed),
            Err(TaskstreamError::OriginMismatch { origin: None })
        ));
    }

    #[test]
    fn prepare_needs_a_task_id() {
        let fs = MockFileSystem::new();
        let err = prepare(&RuntimeContext::default(), &loader(&fs), false).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::INPUT_MISSING);
    }

    #[test]
    fn prepare_takes_task_from_query_and_substitutes() {
        let fs = MockFileSystem::new();
        fs.add_file("/tasks/greet.json", r#"{"cmdLine":"echo %name%"}"#);

        let ctx = RuntimeContext::new(BTreeMap::new()).with_query("task=greet&name=ann+lee");
        let (id, spec) = prepare(&ctx, &loader(&fs), true).unwrap();

        assert_eq!(id, "greet");
        assert_eq!(spec.cmd_line, vec!["echo", "ann lee"]);
    }

    #[tokio::test]
    async fn dry_run_writes_spec_and_keeps_file() {
        let fs = MockFileSystem::new();
        fs.add_file("/tasks/t.json", r#"{"cmdLine":["ls","-l"],"timeout":3}"#);
        let options = RunOptions {
            dry_run: true,
            ..RunOptions::default()
        };

        let mut out = Vec::new();
        let code = run_invocation(
            &RuntimeContext::default().with_task_id("t"),
            &loader(&fs),
            &options,
            &mut out,
            Terminator::new(),
        )
        .await
        .unwrap();

        assert_eq!(code, 0);
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["cmdLine"], serde_json::json!(["ls", "-l"]));
        assert_eq!(value["options"]["timeout"], 3);
        assert!(fs.contains("/tasks/t.json"));
    }

    #[tokio::test]
    async fn termination_before_spawn_runs_nothing() {
        let fs = MockFileSystem::new();
        fs.add_file("/tasks/once.json", r#"{"cmdLine":"echo hi","oneShot":true}"#);
        let terminator = Terminator::new();
        terminator.terminate(crate::types::Signal::Int);

        let mut out = Vec::new();
        let code = run_invocation(
            &RuntimeContext::default().with_task_id("once"),
            &loader(&fs),
            &RunOptions::default(),
            &mut out,
            terminator,
        )
        .await
        .unwrap();

        assert_eq!(code, exit_codes::CHILD_FAILURE);
        assert!(out.is_empty());
        assert!(fs.contains("/tasks/once.json"));
    }

    #[tokio::test]
    async fn setup_errors_write_nothing() {
        let fs = MockFileSystem::new();
        fs.add_file("/tasks/bad.json", r#"{"cmdLine":"echo","bogus":1}"#);
        let options = RunOptions {
            strict: true,
            ..RunOptions::default()
        };

        let mut out = Vec::new();
        let err = run_invocation(
            &RuntimeContext::default().with_task_id("bad"),
            &loader(&fs),
            &options,
            &mut out,
            Terminator::new(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.exit_code(), exit_codes::INVALID_TASK);
        assert!(err.to_string().contains("bogus"));
        assert!(out.is_empty());
        assert!(fs.contains("/tasks/bad.json"));
    }
}
