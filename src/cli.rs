//! Command-line interface implementation for cfs.
//! Provides argument parsing, help text formatting and the collection of
//! template variables from flags and variable files.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{error::ErrorKind, Args as ClapArgs, CommandFactory, Parser, Subcommand};
use serde_yaml::Value as Yaml;

use crate::error::{Error, Result};
use crate::manifest::Manifest;
use crate::variables::{coerce, Value, Variables};

/// Command-line arguments structure for cfs.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "cfs: manifest-driven project structure generator",
    long_about = None
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print the full error chain on failure
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a new project from a template
    Init(InitArgs),
    /// List the templates available in the templates directory
    List {
        /// Directory holding one sub-directory per template
        #[arg(long, value_name = "DIR", default_value = "templates")]
        templates_dir: PathBuf,
    },
}

#[derive(ClapArgs, Debug)]
pub struct InitArgs {
    /// Template to use (springboot, flutter, django, generic)
    #[arg(value_name = "TEMPLATE_NAME")]
    pub template: String,

    /// Directory holding one sub-directory per template
    #[arg(long, value_name = "DIR", default_value = "templates")]
    pub templates_dir: PathBuf,

    /// Directory where the generated project will be created
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Name of the project
    #[arg(short, long)]
    pub project_name: Option<String>,

    /// Base package name (e.g., com.example)
    #[arg(long)]
    pub package_name: Option<String>,

    /// Programming language
    #[arg(short, long)]
    pub language: Option<String>,

    /// API protocol
    #[arg(short, long)]
    pub api_protocol: Option<String>,

    /// Template variable as KEY=VALUE; may be repeated
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub vars: Vec<String>,

    /// YAML or JSON file with template variables
    #[arg(long, value_name = "FILE")]
    pub vars_file: Option<PathBuf>,

    /// Overwrite existing files
    #[arg(short, long)]
    pub force: bool,

    /// Show what would be created without creating it
    #[arg(long)]
    pub dry_run: bool,

    /// Do not check for the template's external toolchain
    #[arg(long)]
    pub skip_toolchain_check: bool,
}

/// Parses command line arguments and returns the Args structure.
///
/// # Exits
/// * With status code 1 if required arguments are missing
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if e.kind() == ErrorKind::MissingRequiredArgument
                || e.kind() == ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            {
                let _ = Args::command()
                    .help_template(
                        r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
                    )
                    .print_help();
                std::process::exit(1);
            } else {
                e.exit();
            }
        }
    }
}

/// Splits a `KEY=VALUE` assignment. The value may itself contain `=`.
pub fn parse_assignment(assignment: &str) -> Result<(String, String)> {
    match assignment.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(Error::InvalidArgumentError(format!(
            "expected KEY=VALUE, got '{assignment}'"
        ))),
    }
}

/// Reads a mapping of scalar values from a YAML or JSON file.
pub fn read_vars_file<P: AsRef<Path>>(path: P) -> Result<Vec<(String, Yaml)>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let raw: Yaml = serde_yaml::from_str(&content).map_err(|e| {
        Error::InvalidArgumentError(format!("cannot parse {}: {e}", path.display()))
    })?;

    match raw {
        Yaml::Null => Ok(Vec::new()),
        Yaml::Mapping(map) => map
            .into_iter()
            .map(|(key, value)| match key {
                Yaml::String(key) => Ok((key, value)),
                other => Err(Error::InvalidArgumentError(format!(
                    "variable names in {} must be strings, got {other:?}",
                    path.display()
                ))),
            })
            .collect(),
        _ => Err(Error::InvalidArgumentError(format!(
            "{} must contain a mapping of variables",
            path.display()
        ))),
    }
}

/// Collects template variables for `init`.
///
/// Later sources win: the variables file, then `--var` assignments, then the
/// dedicated flags. Raw strings are coerced to the type the manifest declares.
pub fn collect_variables(manifest: &Manifest, args: &InitArgs) -> Result<Variables> {
    let mut variables = Variables::new();

    if let Some(vars_file) = &args.vars_file {
        for (name, raw) in read_vars_file(vars_file)? {
            let value = match raw {
                Yaml::String(text) => coerce(manifest.variables.get(&name), &name, &text)?,
                other => Value::from_yaml(&other).ok_or_else(|| {
                    Error::InvalidArgumentError(format!("variable '{name}' must be a scalar"))
                })?,
            };
            variables.insert(name, value);
        }
    }

    for assignment in &args.vars {
        let (name, raw) = parse_assignment(assignment)?;
        let value = coerce(manifest.variables.get(&name), &name, &raw)?;
        variables.insert(name, value);
    }

    let flags = [
        ("project_name", &args.project_name),
        ("package_name", &args.package_name),
        ("language", &args.language),
        ("api_protocol", &args.api_protocol),
    ];
    for (name, flag) in flags {
        if let Some(raw) = flag {
            variables.insert(name.to_string(), Value::String(raw.clone()));
        }
    }

    Ok(variables)
}
