//! Variable values, input validation and resolution.
//!
//! User input is checked against the manifest and the kind profile first;
//! only a clean input set is resolved into the mapping templates render with.

use std::fmt;

use indexmap::IndexMap;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::kind::KindProfile;
use crate::manifest::{Manifest, VariableDef, VariableType};
use crate::renderer::TemplateRenderer;

/// A scalar variable value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    String(String),
}

impl Value {
    /// Converts a YAML scalar. Floats keep their textual form; null and
    /// collections have no scalar value.
    pub fn from_yaml(value: &serde_yaml::Value) -> Option<Value> {
        match value {
            serde_yaml::Value::Bool(b) => Some(Value::Boolean(*b)),
            serde_yaml::Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Value::Integer(i)),
                None => Some(Value::String(n.to_string())),
            },
            serde_yaml::Value::String(s) => Some(Value::String(s.clone())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, Value::String(s) if s.trim().is_empty())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

/// User-supplied values, keyed by variable name.
pub type Variables = IndexMap<String, Value>;

/// The flat mapping templates are rendered against.
///
/// Built only by [`resolve`]; read-only once rendering starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedVariables {
    values: IndexMap<String, Value>,
}

impl ResolvedVariables {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Owned copy of a string-valued variable
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(Value::as_str).map(str::to_string)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Rendering context handed to the template engine
    pub fn to_context(&self) -> serde_json::Value {
        serde_json::to_value(&self.values).unwrap_or(serde_json::Value::Null)
    }
}

impl From<Variables> for ResolvedVariables {
    fn from(values: Variables) -> Self {
        Self { values }
    }
}

/// Matches `pattern` at the beginning of `text`; the pattern need not consume all of it.
pub fn matches_at_start(pattern: &Regex, text: &str) -> bool {
    pattern.find(text).is_some_and(|m| m.start() == 0)
}

/// Coerces a raw command-line string into the type the manifest declares.
///
/// Undeclared variables stay strings.
pub fn coerce(definition: Option<&VariableDef>, name: &str, raw: &str) -> Result<Value> {
    let var_type = definition.map(|d| d.var_type).unwrap_or_default();
    match var_type {
        VariableType::Boolean => match raw.to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" | "on" => Ok(Value::Boolean(true)),
            "false" | "no" | "n" | "0" | "off" => Ok(Value::Boolean(false)),
            _ => Err(Error::InvalidArgumentError(format!(
                "variable '{name}' expects a boolean, got '{raw}'"
            ))),
        },
        VariableType::Integer => raw.trim().parse::<i64>().map(Value::Integer).map_err(|_| {
            Error::InvalidArgumentError(format!("variable '{name}' expects an integer, got '{raw}'"))
        }),
        VariableType::String | VariableType::Choice => Ok(Value::String(raw.to_string())),
    }
}

/// Checks user-supplied values against the manifest and the kind profile.
///
/// Never fails; every problem found becomes one message. An empty list means
/// the input may be resolved.
pub fn validate(manifest: &Manifest, profile: &KindProfile, variables: &Variables) -> Vec<String> {
    let mut errors = Vec::new();

    for name in profile.required_variables {
        if variables.contains_key(*name) {
            continue;
        }
        let has_default = manifest
            .variables
            .get(*name)
            .and_then(VariableDef::default_value)
            .is_some_and(|value| !value.is_blank());
        if !has_default {
            errors.push(format!("Missing required {} variable: {}", profile.display_name, name));
        }
    }

    for (name, definition) in &manifest.variables {
        let Some(value) = variables.get(name) else {
            continue;
        };
        let text = value.to_string();

        match (definition.var_type, value) {
            (VariableType::Boolean, Value::Boolean(_)) | (VariableType::Integer, Value::Integer(_)) => {}
            (VariableType::Boolean, _) => {
                errors.push(format!("Variable '{name}' value '{text}' must be a boolean"))
            }
            (VariableType::Integer, _) => {
                errors.push(format!("Variable '{name}' value '{text}' must be an integer"))
            }
            _ => {}
        }

        for rule in profile.format_rules.iter().filter(|r| r.variable == name.as_str()) {
            let accepted = Regex::new(rule.pattern)
                .map(|re| re.is_match(&text))
                .unwrap_or(false);
            if !accepted {
                errors.push(format!("Invalid {} for '{}': {}. {}", rule.label, name, text, rule.hint));
            }
        }

        for rule in profile.allowed_values.iter().filter(|r| r.variable == name.as_str()) {
            if !rule.values.contains(&text.as_str()) {
                errors.push(format!(
                    "Invalid {}: {}. Must be one of: {}",
                    rule.label,
                    text,
                    rule.values.join(", ")
                ));
            }
        }

        if let Some(pattern) = &definition.validation {
            match Regex::new(pattern) {
                Ok(re) if matches_at_start(&re, &text) => {}
                Ok(_) => errors.push(format!(
                    "Variable '{name}' value '{text}' does not match pattern: {pattern}"
                )),
                Err(e) => errors.push(format!("Invalid validation regex for variable '{name}': {e}")),
            }
        }

        if definition.var_type == VariableType::Choice {
            let choices = definition.choice_values();
            if !choices.contains(&text) {
                errors.push(format!(
                    "Variable '{name}' value '{text}' must be one of: {}",
                    choices.join(", ")
                ));
            }
        }
    }

    errors
}

/// Builds the rendering mapping from user values, manifest defaults and computed expressions.
///
/// Computed expressions are evaluated in declaration order, each seeing every
/// value resolved before it. The kind's derivations run last.
pub fn resolve(
    manifest: &Manifest,
    profile: &KindProfile,
    renderer: &dyn TemplateRenderer,
    variables: &Variables,
) -> Result<ResolvedVariables> {
    let mut resolved = ResolvedVariables::from(variables.clone());

    for (name, definition) in &manifest.variables {
        if resolved.contains_key(name) {
            continue;
        }
        if let Some(default) = definition.default_value() {
            debug!("Using default for '{}': {}", name, default);
            resolved.insert(name.clone(), default);
        }
    }

    for (name, expression) in &manifest.computed {
        let context = resolved.to_context();
        let value = renderer.render(expression, &context).map_err(|e| Error::ComputationError {
            name: name.clone(),
            cause: match e {
                Error::RenderError { cause, .. } => cause,
                other => other.to_string(),
            },
        })?;
        debug!("Computed '{}' = '{}'", name, value);
        resolved.insert(name.clone(), Value::String(value));
    }

    (profile.derive)(&mut resolved);

    Ok(resolved)
}
