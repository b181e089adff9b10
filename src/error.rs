//! Error handling for cfs.
//! Defines the error taxonomy and result type used throughout the generation engine.

use std::io;
use thiserror::Error;

/// Custom error types for cfs operations.
///
/// Manifest, template and render errors abort a generation immediately.
/// Input validation errors are collected as a batch before anything touches
/// the filesystem.
#[derive(Error, Debug)]
pub enum Error {
    /// Represents errors that occur during file system operations
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    /// A manifest (or another required file) is absent on disk
    #[error("Not found: {0}")]
    NotFound(String),

    /// The manifest is structurally invalid
    #[error("Manifest validation error: {0}")]
    ValidationError(String),

    /// User-supplied values failed the manifest rules
    #[error("Validation errors:\n{}", format_messages(.0))]
    InputValidationError(Vec<String>),

    /// A computed variable could not be evaluated
    #[error("Error computing variable '{name}': {cause}")]
    ComputationError { name: String, cause: String },

    /// Template expansion failed for a path, source name or file body
    #[error("Error rendering '{template}': {cause}")]
    RenderError { template: String, cause: String },

    /// A structure entry references a source template that does not exist
    #[error("Template file not found: {source_name}\nExpected at: {expected}")]
    MissingTemplateError { source_name: String, expected: String },

    /// A hook script exited with a non-zero status
    #[error("Hook '{hook}' failed: {message}")]
    HookError { hook: String, message: String },

    /// A hook script ran longer than its timeout and was killed
    #[error("Hook '{hook}' timed out after {seconds}s")]
    HookTimeoutError { hook: String, seconds: u64 },

    /// `generate()` was called before a manifest was loaded successfully
    #[error("Manifest not loaded. Call load_manifest() first")]
    NotLoadedError,

    /// The project directory already exists and the policy refuses to reuse it
    #[error("Project directory already exists: {output_dir}. Use --force to overwrite")]
    OutputDirectoryExistsError { output_dir: String },

    /// A toolchain required by the template kind is not available
    #[error("{tool} is not installed or not in PATH")]
    ToolchainMissingError { tool: String },

    /// No template kind is registered under the given name
    #[error("Unknown template '{0}'. Supported templates: springboot, flutter, django, generic")]
    UnknownTemplateError(String),

    /// Malformed command-line input
    #[error("Invalid argument: {0}")]
    InvalidArgumentError(String),
}

fn format_messages(messages: &[String]) -> String {
    messages.iter().map(|m| format!("  • {m}")).collect::<Vec<_>>().join("\n")
}

/// Convenience type alias for Results with cfs's Error as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Default error handler that prints the error and exits the program.
///
/// In debug mode the `Debug` form and the chain of sources are printed as well.
pub fn default_error_handler(err: Error, debug: bool) {
    eprintln!("{err}");
    if debug {
        eprintln!("\n{err:?}");
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            eprintln!("caused by: {cause}");
            source = cause.source();
        }
    }
    std::process::exit(1);
}
