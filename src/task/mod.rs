// src/task/mod.rs

//! Task descriptions: loading, tokenizing, validating.
//!
//! - [`loader`] finds and parses `<tasks_dir>/<id>.json`.
//! - [`schema`] is the static table of optional fields.
//! - [`tokenize`] splits a `cmdLine` string into argv tokens.
//! - [`validate`] turns the raw JSON into a [`TaskSpec`].

pub mod loader;
pub mod model;
pub mod schema;
pub mod tokenize;
pub mod validate;

pub use loader::TaskLoader;
pub use model::{TaskOptions, TaskSpec};
pub use validate::validate;
