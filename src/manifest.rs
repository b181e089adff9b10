//! Manifest loading and validation.
//!
//! A manifest is read in two passes: the raw YAML tree is checked first so
//! problems are reported by field and index, then the tree is deserialized
//! into the typed [`Manifest`].

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_yaml::{Mapping, Value as Yaml};

use crate::constants::{DEFAULT_FILES_SOURCE, REQUIRED_FIELDS, VARIABLE_TYPES};
use crate::error::{Error, Result};
use crate::kind::KindProfile;
use crate::variables::{matches_at_start, Value};

/// Parsed template descriptor. Read-only once loaded.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub name: String,
    #[serde(deserialize_with = "scalar_string")]
    pub description: String,
    #[serde(deserialize_with = "scalar_string")]
    pub version: String,
    #[serde(default = "default_files_source")]
    pub files_source: String,
    #[serde(default)]
    pub variables: IndexMap<String, VariableDef>,
    #[serde(default)]
    pub computed: IndexMap<String, String>,
    #[serde(default)]
    pub structure: Vec<StructureEntry>,
    #[serde(default)]
    pub hooks: IndexMap<String, HookDef>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    #[default]
    String,
    Choice,
    Boolean,
    Integer,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VariableDef {
    #[serde(rename = "type", default)]
    pub var_type: VariableType,
    #[serde(default)]
    pub default: Option<Yaml>,
    #[serde(default)]
    pub choices: Vec<Yaml>,
    #[serde(default)]
    pub validation: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl VariableDef {
    pub fn default_value(&self) -> Option<Value> {
        self.default.as_ref().and_then(Value::from_yaml)
    }

    /// Choices in their textual form
    pub fn choice_values(&self) -> Vec<String> {
        self.choices.iter().filter_map(Value::from_yaml).map(|v| v.to_string()).collect()
    }
}

/// One directory-or-file instruction of the `structure` list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StructureEntry {
    Dir { path: String },
    File { path: String, source: String },
}

impl StructureEntry {
    pub fn path(&self) -> &str {
        match self {
            StructureEntry::Dir { path } | StructureEntry::File { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HookDef {
    pub script: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Overrides the kind's default timeout, in seconds
    #[serde(default)]
    pub timeout: Option<u64>,
}

fn default_files_source() -> String {
    DEFAULT_FILES_SOURCE.to_string()
}

fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Yaml::deserialize(deserializer)?;
    Ok(yaml_text(&value))
}

fn yaml_text(value: &Yaml) -> String {
    match Value::from_yaml(value) {
        Some(scalar) => scalar.to_string(),
        None => serde_yaml::to_string(value).unwrap_or_default().trim().to_string(),
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::ValidationError(message.into())
}

/// Returns the first manifest file the profile recognizes under `template_root`.
///
/// # Errors
/// * `Error::NotFound` if none of the candidate files exists
pub fn find_manifest<P: AsRef<Path>>(template_root: P, profile: &KindProfile) -> Result<PathBuf> {
    let template_root = template_root.as_ref();
    profile
        .manifest_files
        .iter()
        .map(|file| template_root.join(file))
        .find(|path| path.is_file())
        .ok_or_else(|| {
            Error::NotFound(format!(
                "{} manifest not found at {} (tried: {})",
                profile.display_name,
                template_root.display(),
                profile.manifest_files.join(", ")
            ))
        })
}

/// Reads and validates the manifest of a template directory.
pub fn load_manifest<P: AsRef<Path>>(template_root: P, profile: &KindProfile) -> Result<Manifest> {
    let manifest_path = find_manifest(template_root, profile)?;
    debug!("Loading manifest from {}", manifest_path.display());
    let content = fs::read_to_string(&manifest_path)?;
    parse_manifest(&content, profile)
}

/// Parses manifest text and validates it against the kind profile.
///
/// # Errors
/// * `Error::ValidationError` for malformed YAML or any structural problem
pub fn parse_manifest(content: &str, profile: &KindProfile) -> Result<Manifest> {
    let raw: Yaml = serde_yaml::from_str(content)
        .map_err(|e| invalid(format!("Invalid YAML in manifest: {e}")))?;
    let Yaml::Mapping(mut raw) = raw else {
        return Err(invalid("Manifest must be a mapping"));
    };

    for field in REQUIRED_FIELDS {
        if !raw.contains_key(field) {
            return Err(invalid(format!("Missing required field: {field}")));
        }
    }

    let name = raw.get("name").map(yaml_text).unwrap_or_default();
    if name != profile.kind.name() {
        return Err(invalid(format!(
            "Expected {} template, got: {}",
            profile.display_name, name
        )));
    }

    // An empty section (`computed:` with nothing under it) counts as absent.
    for section in ["variables", "computed", "structure", "hooks", "files_source"] {
        if raw.get(section).is_some_and(Yaml::is_null) {
            raw.remove(section);
        }
    }

    validate_variables(raw.get("variables"), profile)?;
    if let Some(structure) = raw.get("structure") {
        validate_structure(structure, profile)?;
    }
    validate_computed(raw.get("computed"), profile)?;
    if let Some(hooks) = raw.get("hooks") {
        validate_hooks(hooks)?;
    }

    serde_yaml::from_value(Yaml::Mapping(raw)).map_err(|e| invalid(format!("Invalid manifest: {e}")))
}

fn validate_variables(variables: Option<&Yaml>, profile: &KindProfile) -> Result<()> {
    let empty = Mapping::new();
    let variables = match variables {
        None => &empty,
        Some(Yaml::Mapping(map)) => map,
        Some(_) => return Err(invalid("Variables must be a mapping")),
    };

    for required in profile.required_variables {
        if !variables.contains_key(*required) {
            return Err(invalid(format!(
                "Missing required {} variable: {}",
                profile.display_name, required
            )));
        }
    }

    for (key, config) in variables {
        let name = key.as_str().ok_or_else(|| invalid("Variable names must be strings"))?;
        let Yaml::Mapping(config) = config else {
            return Err(invalid(format!("Variable '{name}' must be a dictionary")));
        };
        validate_kind_rules(name, config, profile)?;
        validate_variable_definition(name, config)?;
    }

    Ok(())
}

fn validate_variable_definition(name: &str, config: &Mapping) -> Result<()> {
    let var_type = config.get("type").map(yaml_text).unwrap_or_else(|| "string".to_string());
    if !VARIABLE_TYPES.contains(&var_type.as_str()) {
        return Err(invalid(format!("Invalid type '{var_type}' for variable '{name}'")));
    }

    match config.get("choices") {
        None => {}
        Some(Yaml::Sequence(_)) => {}
        Some(_) => return Err(invalid(format!("Variable '{name}' choices must be a list"))),
    }
    if var_type == "choice" {
        let has_choices = matches!(config.get("choices"), Some(Yaml::Sequence(seq)) if !seq.is_empty());
        if !has_choices {
            return Err(invalid(format!(
                "Variable '{name}' with type 'choice' must have 'choices' field"
            )));
        }
    }

    if let Some(validation) = config.get("validation") {
        let pattern = validation
            .as_str()
            .ok_or_else(|| invalid(format!("Validation for variable '{name}' must be a string")))?;
        Regex::new(pattern).map_err(|e| {
            invalid(format!("Invalid validation regex for variable '{name}': {e}"))
        })?;
    }

    Ok(())
}

fn validate_kind_rules(name: &str, config: &Mapping, profile: &KindProfile) -> Result<()> {
    for check in profile.example_checks.iter().filter(|c| c.variable == name) {
        match config.get("validation").and_then(Yaml::as_str) {
            None if check.required => {
                return Err(invalid(format!(
                    "{name} must have validation regex for {} format",
                    check.format
                )));
            }
            None => {}
            Some(pattern) => {
                let accepted = Regex::new(pattern)
                    .map(|re| matches_at_start(&re, check.example))
                    .unwrap_or(false);
                if !accepted {
                    return Err(invalid(format!(
                        "{name} validation regex must accept valid {} names like '{}'",
                        check.format, check.example
                    )));
                }
            }
        }
    }

    for rule in profile.choice_rules.iter().filter(|r| r.variable == name) {
        if config.get("type").and_then(Yaml::as_str) != Some("choice") {
            return Err(invalid(format!("{name} variable must be of type 'choice'")));
        }
        let choices: Vec<String> = match config.get("choices") {
            Some(Yaml::Sequence(seq)) => seq.iter().map(yaml_text).collect(),
            _ => Vec::new(),
        };
        for required in rule.must_include {
            if !choices.iter().any(|c| c == required) {
                return Err(invalid(format!("{name} choices must include '{required}'")));
            }
        }
        if !rule.within.is_empty() {
            if let Some(choice) = choices.iter().find(|c| !rule.within.contains(&c.as_str())) {
                return Err(invalid(format!(
                    "Invalid {name} choice '{choice}'. Must be one of: {}",
                    rule.within.join(", ")
                )));
            }
        }
    }

    for rule in profile.default_rules.iter().filter(|r| r.variable == name) {
        if let Some(default) = config.get("default").filter(|d| !d.is_null()) {
            let default = yaml_text(default);
            if !rule.values.contains(&default.as_str()) {
                return Err(invalid(format!(
                    "{name} default '{default}' must be one of: {}",
                    rule.values.join(", ")
                )));
            }
        }
    }

    Ok(())
}

fn validate_structure(structure: &Yaml, profile: &KindProfile) -> Result<()> {
    let Yaml::Sequence(items) = structure else {
        return Err(invalid("Structure must be a list"));
    };

    let paths: Vec<String> = items
        .iter()
        .filter_map(|item| item.get("path").map(yaml_text))
        .collect();
    for required in profile.required_structure_paths {
        if !paths.iter().any(|path| path.contains(required)) {
            return Err(invalid(format!(
                "{} structure must include: {}",
                profile.display_name, required
            )));
        }
    }

    for (idx, item) in items.iter().enumerate() {
        let Yaml::Mapping(item) = item else {
            return Err(invalid(format!("Structure item {idx} must be a dictionary")));
        };
        let path = item
            .get("path")
            .and_then(Yaml::as_str)
            .ok_or_else(|| invalid(format!("Structure item {idx} missing required 'path' field")))?;
        let item_type = item
            .get("type")
            .ok_or_else(|| invalid(format!("Structure item {idx} missing required 'type' field")))?;
        let item_type = yaml_text(item_type);

        match item_type.as_str() {
            "dir" => {}
            "file" => {
                let source = item.get("source").and_then(Yaml::as_str).ok_or_else(|| {
                    invalid(format!(
                        "File structure item {idx} (path: {path}) must have 'source' field"
                    ))
                })?;
                if profile.check_application_files {
                    validate_application_file(path, source)?;
                }
            }
            other => {
                return Err(invalid(format!("Structure item {idx} has invalid type '{other}'")));
            }
        }
    }

    Ok(())
}

fn validate_application_file(path: &str, source: &str) -> Result<()> {
    if path.contains("Application.")
        && !(path.contains("{{ file_extension }}") || path.ends_with(".java") || path.ends_with(".kt"))
    {
        return Err(invalid(format!("Application file must use dynamic file extension: {path}")));
    }
    if (path.contains("pom.xml") || path.contains("build.gradle")) && source.trim().is_empty() {
        return Err(invalid(format!("Build file must have a template source: {path}")));
    }
    Ok(())
}

fn validate_computed(computed: Option<&Yaml>, profile: &KindProfile) -> Result<()> {
    let empty = Mapping::new();
    let computed = match computed {
        None => &empty,
        Some(Yaml::Mapping(map)) => map,
        Some(_) => return Err(invalid("Computed variables must be a mapping")),
    };

    for required in profile.required_computed {
        if !computed.contains_key(*required) {
            return Err(invalid(format!(
                "Missing required computed variable for {}: {}",
                profile.display_name, required
            )));
        }
    }

    for (key, expression) in computed {
        if !expression.is_string() {
            return Err(invalid(format!(
                "Computed variable '{}' must be a template string",
                yaml_text(key)
            )));
        }
    }

    Ok(())
}

fn validate_hooks(hooks: &Yaml) -> Result<()> {
    let Yaml::Mapping(hooks) = hooks else {
        return Err(invalid("Hooks must be a mapping"));
    };
    for (key, hook) in hooks {
        if hook.get("script").and_then(Yaml::as_str).is_none() {
            return Err(invalid(format!("Hook '{}' must declare a 'script'", yaml_text(key))));
        }
    }
    Ok(())
}

/// Name and description of the template in `template_dir`, if it carries a readable manifest.
pub fn describe_template<P: AsRef<Path>>(template_dir: P) -> Option<(String, String)> {
    let template_dir = template_dir.as_ref();
    let content = ["manifest.yml", "manifest.yaml"]
        .iter()
        .map(|file| template_dir.join(file))
        .find(|path| path.is_file())
        .and_then(|path| fs::read_to_string(path).ok())?;
    let raw: Yaml = serde_yaml::from_str(&content).ok()?;
    let name = raw.get("name").map(yaml_text)?;
    let description = raw
        .get("description")
        .map(yaml_text)
        .unwrap_or_else(|| "No description".to_string());
    Some((name, description))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::TemplateKind;

    #[test]
    fn test_numeric_version_is_accepted() {
        let manifest = parse_manifest(
            "name: generic\ndescription: demo\nversion: 1.0\n",
            TemplateKind::Generic.profile(),
        )
        .unwrap();
        assert_eq!(manifest.version, "1.0");
        assert_eq!(manifest.files_source, DEFAULT_FILES_SOURCE);
    }

    #[test]
    fn test_structure_entry_path() {
        let entry = StructureEntry::File { path: "a/b.txt".into(), source: "b.txt".into() };
        assert_eq!(entry.path(), "a/b.txt");
    }
}
