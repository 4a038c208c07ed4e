// src/context/mod.rs

//! Per-invocation runtime context.
//!
//! A [`RuntimeContext`] captures everything an invocation learns from the
//! outside world before doing any work: the task identifier, the variables
//! derived from the request query string, a snapshot of the ambient
//! environment and the request origin. It is built once and only read
//! afterwards.

pub mod query;

use std::collections::BTreeMap;

use crate::vars::VarResolver;

/// Prefix that distinguishes query-string variables from environment ones.
pub const QUERY_VAR_PREFIX: &str = "QS_";

/// Query parameter consulted when no task id is given explicitly.
pub const TASK_QUERY_PARAM: &str = "task";

/// Environment variable carrying the request origin (set by websocketd).
pub const ORIGIN_ENV_VAR: &str = "HTTP_ORIGIN";

#[derive(Debug, Clone, Default)]
pub struct RuntimeContext {
    task_id: Option<String>,
    query_vars: BTreeMap<String, String>,
    env: BTreeMap<String, String>,
    origin: Option<String>,
}

impl RuntimeContext {
    /// Context over an explicit environment snapshot.
    pub fn new(env: BTreeMap<String, String>) -> Self {
        Self {
            env,
            ..Self::default()
        }
    }

    /// Context over the current process environment.
    ///
    /// Non-UTF-8 variables are converted lossily. The origin is taken from
    /// `HTTP_ORIGIN` when present.
    pub fn from_process_env() -> Self {
        let env: BTreeMap<String, String> = std::env::vars_os()
            .map(|(k, v)| {
                (
                    k.to_string_lossy().into_owned(),
                    v.to_string_lossy().into_owned(),
                )
            })
            .collect();
        let origin = env.get(ORIGIN_ENV_VAR).filter(|o| !o.is_empty()).cloned();

        Self {
            origin,
            ..Self::new(env)
        }
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        let task_id = task_id.into();
        self.task_id = (!task_id.is_empty()).then_some(task_id);
        self
    }

    /// Register every parameter of `query` as a `QS_<name>` variable.
    ///
    /// When a name repeats, the first occurrence wins.
    pub fn with_query(mut self, query: &str) -> Self {
        for (name, value) in query::parse_query(query) {
            self.query_vars
                .entry(format!("{QUERY_VAR_PREFIX}{name}"))
                .or_insert(value);
        }
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// The task identifier: the explicit one, else the `task` query parameter.
    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref().or_else(|| {
            self.query_var(TASK_QUERY_PARAM)
                .filter(|id| !id.is_empty())
        })
    }

    /// Look up a query parameter by its bare name (without `QS_`).
    pub fn query_var(&self, name: &str) -> Option<&str> {
        self.query_vars
            .get(&format!("{QUERY_VAR_PREFIX}{name}"))
            .map(String::as_str)
    }

    pub fn query_vars(&self) -> &BTreeMap<String, String> {
        &self.query_vars
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn resolver(&self) -> VarResolver<'_> {
        VarResolver::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_parameters_become_prefixed_variables() {
        let ctx = RuntimeContext::default().with_query("user=ann&user=bob&mode=fast");

        assert_eq!(ctx.query_var("user"), Some("ann"));
        assert_eq!(ctx.query_vars().get("QS_mode").map(String::as_str), Some("fast"));
        assert_eq!(ctx.query_var("missing"), None);
    }

    #[test]
    fn explicit_task_id_beats_query_parameter() {
        let ctx = RuntimeContext::default()
            .with_query("task=from-query")
            .with_task_id("explicit");
        assert_eq!(ctx.task_id(), Some("explicit"));

        let ctx = RuntimeContext::default().with_query("task=from-query");
        assert_eq!(ctx.task_id(), Some("from-query"));
    }

    #[test]
    fn empty_task_ids_are_absent() {
        let ctx = RuntimeContext::default().with_task_id("").with_query("task=");
        assert_eq!(ctx.task_id(), None);
    }
}
