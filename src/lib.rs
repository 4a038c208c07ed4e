// src/lib.rs

pub mod cli;
pub mod context;
pub mod emit;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod exit_codes;
pub mod fs;
pub mod logging;
pub mod task;
pub mod types;
pub mod vars;

use std::io;

use tracing::debug;

use crate::cli::CliArgs;
use crate::context::RuntimeContext;
use crate::engine::RunOptions;
use crate::engine::signals::spawn_signal_relay;
use crate::errors::Result;
use crate::exec::Terminator;
use crate::task::TaskLoader;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - the runtime context (process env, query string, origin)
/// - the task loader over the real filesystem
/// - signal relaying to the child
/// - the invocation pipeline, writing events to stdout
///
/// Returns the exit code for a completed invocation.
pub async fn run(args: CliArgs) -> Result<i32> {
    let mut ctx = RuntimeContext::from_process_env().with_query(&args.query);
    if let Some(task) = &args.task {
        ctx = ctx.with_task_id(task.as_str());
    }

    let loader = TaskLoader::from_dir(&args.tasks_dir);
    let options = RunOptions {
        strict: args.strict,
        dry_run: args.dry_run,
        allowed_origins: args.origins.clone(),
    };

    let terminator = Terminator::new();
    let relay = spawn_signal_relay(terminator.clone())?;

    debug!(
        tasks_dir = ?loader.tasks_dir(),
        strict = options.strict,
        dry_run = options.dry_run,
        "starting invocation"
    );
    let result =
        engine::run_invocation(&ctx, &loader, &options, io::stdout().lock(), terminator).await;

    relay.abort();
    result
}
