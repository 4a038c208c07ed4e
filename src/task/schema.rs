// src/task/schema.rs

//! Static table of the optional task fields.
//!
//! Validation never reflects over the raw object: every recognized key, its
//! JSON type, its default and its constraints are listed in
//! [`OPTION_FIELDS`], and [`apply`] is the only place that maps a checked
//! JSON value onto [`TaskOptions`].

use std::collections::BTreeMap;

use serde_json::Value;

use super::model::TaskOptions;

/// The one required key.
pub const CMD_LINE: &str = "cmdLine";

pub const ENV: &str = "env";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Boolean,
    Integer,
    Object,
}

impl FieldType {
    pub fn name(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Integer => "integer",
            FieldType::Object => "object",
        }
    }

    pub fn matches(self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Object => value.is_object(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    Bool(bool),
    Str(&'static str),
    EmptyObject,
}

impl FieldDefault {
    pub fn to_value(self) -> Value {
        match self {
            FieldDefault::Bool(b) => Value::Bool(b),
            FieldDefault::Str(s) => Value::String(s.to_string()),
            FieldDefault::EmptyObject => Value::Object(Default::default()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub name: &'static str,
    pub ty: FieldType,
    pub default: Option<FieldDefault>,
    /// Inclusive lower bound for integers.
    pub minimum: Option<i64>,
    /// Minimum length in characters for strings.
    pub min_length: Option<usize>,
}

impl FieldRule {
    const fn new(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            default: None,
            minimum: None,
            min_length: None,
        }
    }

    const fn default_to(mut self, default: FieldDefault) -> Self {
        self.default = Some(default);
        self
    }

    const fn minimum(mut self, minimum: i64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    const fn min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }

    /// Check `value` against the declared type and constraints.
    ///
    /// On failure, returns a description of what was expected.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        if !self.ty.matches(value) {
            return Err(self.expected());
        }
        if let Some(min) = self.minimum {
            let in_range = match value.as_i64() {
                Some(n) => n >= min,
                // Only u64 values beyond i64::MAX get here.
                None => true,
            };
            if !in_range {
                return Err(self.expected());
            }
        }
        if let (Some(min_len), Some(s)) = (self.min_length, value.as_str()) {
            if s.chars().count() < min_len {
                return Err(self.expected());
            }
        }
        Ok(())
    }

    pub fn expected(&self) -> String {
        match (self.minimum, self.min_length) {
            (Some(min), _) => format!("{} >= {}", self.ty.name(), min),
            (_, Some(len)) => format!("{} of at least {} character(s)", self.ty.name(), len),
            _ => self.ty.name().to_string(),
        }
    }
}

use FieldDefault::{Bool, EmptyObject, Str};
use FieldType::{Boolean, Integer, Object, String as Text};

pub const DEFAULT_SHELL: &str = "/bin/sh";

pub const OPTION_FIELDS: &[FieldRule] = &[
    FieldRule::new("usePath", Boolean).default_to(Bool(true)),
    FieldRule::new("useShell", Boolean).default_to(Bool(false)),
    FieldRule::new("shell", Text)
        .default_to(Str(DEFAULT_SHELL))
        .min_length(1),
    FieldRule::new("lineBuffered", Boolean).default_to(Bool(true)),
    FieldRule::new("cwd", Text).min_length(1),
    FieldRule::new("redirectStderr", Boolean).default_to(Bool(false)),
    FieldRule::new("forwardStderr", Boolean).default_to(Bool(false)),
    FieldRule::new("timeout", Integer).minimum(1),
    FieldRule::new("oneShot", Boolean).default_to(Bool(true)),
    FieldRule::new(ENV, Object).default_to(EmptyObject),
];

pub fn rule_for(name: &str) -> Option<&'static FieldRule> {
    OPTION_FIELDS.iter().find(|rule| rule.name == name)
}

/// Store an already-checked `value` for `rule` into `options`.
///
/// `env` is not handled here because its values need substitution; see
/// [`super::validate`].
pub fn apply(options: &mut TaskOptions, rule: &FieldRule, value: &Value) {
    match rule.name {
        "usePath" => set_bool(&mut options.use_path, value),
        "useShell" => set_bool(&mut options.use_shell, value),
        "shell" => {
            if let Some(s) = value.as_str() {
                options.shell = s.to_string();
            }
        }
        "lineBuffered" => set_bool(&mut options.line_buffered, value),
        "cwd" => options.cwd = value.as_str().map(str::to_string),
        "redirectStderr" => set_bool(&mut options.redirect_stderr, value),
        "forwardStderr" => set_bool(&mut options.forward_stderr, value),
        "timeout" => options.timeout = value.as_u64(),
        "oneShot" => set_bool(&mut options.one_shot, value),
        _ => {}
    }
}

fn set_bool(slot: &mut bool, value: &Value) {
    if let Some(b) = value.as_bool() {
        *slot = b;
    }
}

/// Options with every table default applied.
pub fn default_options() -> TaskOptions {
    let mut options = TaskOptions {
        use_path: false,
        use_shell: false,
        shell: String::new(),
        line_buffered: false,
        cwd: None,
        redirect_stderr: false,
        forward_stderr: false,
        timeout: None,
        one_shot: false,
        env: BTreeMap::new(),
    };
    for rule in OPTION_FIELDS {
        if let Some(default) = rule.default {
            apply(&mut options, rule, &default.to_value());
        }
    }
    options
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn defaults_match_the_table() {
        let options = default_options();
        assert!(options.use_path);
        assert!(!options.use_shell);
        assert_eq!(options.shell, "/bin/sh");
        assert!(options.line_buffered);
        assert_eq!(options.cwd, None);
        assert!(!options.redirect_stderr);
        assert!(!options.forward_stderr);
        assert_eq!(options.timeout, None);
        assert!(options.one_shot);
        assert!(options.env.is_empty());
    }

    #[test]
    fn integer_minimum_is_enforced() {
        let rule = rule_for("timeout").unwrap();
        assert!(rule.check(&json!(1)).is_ok());
        assert_eq!(rule.check(&json!(0)).unwrap_err(), "integer >= 1");
        assert!(rule.check(&json!(-3)).is_err());
        assert!(rule.check(&json!(1.5)).is_err());
        assert!(rule.check(&json!("10")).is_err());
    }

    #[test]
    fn string_min_length_is_enforced() {
        let rule = rule_for("cwd").unwrap();
        assert!(rule.check(&json!("/tmp")).is_ok());
        assert!(rule.check(&json!("")).is_err());
        assert!(rule.check(&json!(null)).is_err());
    }

    #[test]
    fn cmd_line_is_not_an_option() {
        assert!(rule_for(CMD_LINE).is_none());
        assert!(rule_for("bogus").is_none());
    }
}
