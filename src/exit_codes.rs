// src/exit_codes.rs

//! Process exit codes of `taskstream`.
//!
//! - 0: the child exited with code 0, or a dry run succeeded
//! - 1: the child failed (non-zero exit, timeout, forced kill, spawn failure)
//!   or an internal error occurred
//! - 2: no task identifier could be resolved
//! - 3: the task file is missing or is not valid JSON
//! - 4: the task description failed validation
//! - 5: the request origin is not allowed

pub const SUCCESS: i32 = 0;

pub const CHILD_FAILURE: i32 = 1;

pub const INPUT_MISSING: i32 = 2;

pub const TASK_UNAVAILABLE: i32 = 3;

pub const INVALID_TASK: i32 = 4;

pub const ORIGIN_MISMATCH: i32 = 5;
