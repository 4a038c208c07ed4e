// src/task/validate.rs

//! Raw task description → [`TaskSpec`].

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::errors::ValidationError;
use crate::vars::{Escape, VarResolver};

use super::model::TaskSpec;
use super::schema::{self, CMD_LINE, ENV, FieldRule, OPTION_FIELDS};
use super::tokenize;

/// Validate and normalize a raw task description.
///
/// - `cmdLine` is tokenized (string form) or taken as-is (array form) and
///   every token has `%NAME%` references substituted, shell-quoted when the
///   task runs through a shell.
/// - In `strict` mode unknown keys and mistyped or out-of-range values are
///   rejected. Otherwise they are ignored and the field default applies.
/// - `env` values are substituted without escaping.
pub fn validate(
    raw: &Value,
    strict: bool,
    resolver: &VarResolver<'_>,
) -> Result<TaskSpec, ValidationError> {
    let obj = raw.as_object().ok_or(ValidationError::NotAnObject)?;

    let tokens = command_tokens(obj.get(CMD_LINE))?;

    if strict {
        reject_unknown_keys(obj)?;
    }

    let mut options = schema::default_options();
    for rule in OPTION_FIELDS {
        let Some(value) = accepted_value(obj, rule, strict)? else {
            continue;
        };
        if rule.name == ENV {
            options.env = resolve_env(value, strict, resolver)?;
        } else {
            schema::apply(&mut options, rule, value);
        }
    }

    let escape = if options.use_shell {
        Escape::Shell
    } else {
        Escape::None
    };
    let cmd_line = tokens
        .iter()
        .map(|token| resolver.substitute(token, escape))
        .collect();

    Ok(TaskSpec { cmd_line, options })
}

fn missing_command() -> ValidationError {
    ValidationError::MissingCommand { field: CMD_LINE }
}

fn command_tokens(raw: Option<&Value>) -> Result<Vec<String>, ValidationError> {
    let tokens = match raw {
        None | Some(Value::Null) => return Err(missing_command()),
        Some(Value::String(line)) => tokenize::split(line)?,
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ValidationError::InvalidProperty {
                        field: CMD_LINE.to_string(),
                        expected: "string or array of strings".to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(ValidationError::InvalidProperty {
                field: CMD_LINE.to_string(),
                expected: "string or array of strings".to_string(),
            });
        }
    };

    if tokens.is_empty() {
        return Err(missing_command());
    }
    Ok(tokens)
}

fn reject_unknown_keys(obj: &Map<String, Value>) -> Result<(), ValidationError> {
    match obj
        .keys()
        .find(|key| key.as_str() != CMD_LINE && schema::rule_for(key).is_none())
    {
        Some(key) => Err(ValidationError::UnknownProperty(key.clone())),
        None => Ok(()),
    }
}

/// The value of `rule` if present and acceptable.
///
/// Unacceptable values are an error in strict mode and dropped otherwise.
fn accepted_value<'v>(
    obj: &'v Map<String, Value>,
    rule: &FieldRule,
    strict: bool,
) -> Result<Option<&'v Value>, ValidationError> {
    let Some(value) = obj.get(rule.name) else {
        return Ok(None);
    };

    match rule.check(value) {
        Ok(()) => Ok(Some(value)),
        Err(expected) if strict => Err(ValidationError::InvalidProperty {
            field: rule.name.to_string(),
            expected,
        }),
        Err(expected) => {
            if value.is_null() {
                debug!(field = rule.name, "null option value; using default");
            } else {
                warn!(
                    field = rule.name,
                    %expected,
                    value = %value,
                    "ignoring invalid option value; using default"
                );
            }
            Ok(None)
        }
    }
}

fn resolve_env(
    value: &Value,
    strict: bool,
    resolver: &VarResolver<'_>,
) -> Result<BTreeMap<String, String>, ValidationError> {
    let mut env = BTreeMap::new();
    let Some(vars) = value.as_object() else {
        return Ok(env);
    };

    for (name, raw) in vars {
        match raw.as_str() {
            Some(text) => {
                env.insert(name.clone(), resolver.substitute(text, Escape::None));
            }
            None if strict => {
                return Err(ValidationError::InvalidProperty {
                    field: format!("{ENV}.{name}"),
                    expected: "string".to_string(),
                });
            }
            None => warn!(var = %name, "ignoring non-string env value"),
        }
    }

    Ok(env)
}
