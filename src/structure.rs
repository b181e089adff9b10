//! Materializes a manifest's `structure` list on disk.
//!
//! Entries are handled in declaration order. Paths and source names are
//! rendered first, then the entry is created, skipped or only reported,
//! depending on the overwrite policy and the dry-run flag.

use std::fs;
use std::path::{Component, Path, PathBuf};

use log::debug;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::kind::OverwritePolicy;
use crate::manifest::StructureEntry;
use crate::renderer::TemplateRenderer;
use crate::variables::ResolvedVariables;

/// Relative paths touched by one generation, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationResult {
    pub created: Vec<String>,
    pub skipped: Vec<String>,
    pub would_create: Vec<String>,
}

impl GenerationResult {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.skipped.is_empty() && self.would_create.is_empty()
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(Error::IoError)?;
    }
    fs::write(path, content).map_err(Error::IoError)
}

/// Rejects rendered paths that would land outside the output root.
fn check_relative(rendered: &str, template: &str) -> Result<()> {
    let escapes = Path::new(rendered)
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if escapes {
        return Err(Error::RenderError {
            template: template.to_string(),
            cause: format!("path '{rendered}' must stay inside the output directory"),
        });
    }
    Ok(())
}

/// Walks `structure` entries and writes them below an output root.
pub struct StructureWalker<'a> {
    engine: &'a dyn TemplateRenderer,
    files_root: &'a Path,
    output_root: &'a Path,
    policy: OverwritePolicy,
    force: bool,
    dry_run: bool,
}

impl<'a> StructureWalker<'a> {
    pub fn new(
        engine: &'a dyn TemplateRenderer,
        files_root: &'a Path,
        output_root: &'a Path,
        policy: OverwritePolicy,
        force: bool,
        dry_run: bool,
    ) -> Self {
        Self {
            engine,
            files_root,
            output_root,
            policy,
            force,
            dry_run,
        }
    }

    /// Processes every entry in order.
    ///
    /// Not transactional: entries written before a failure stay on disk.
    ///
    /// # Errors
    /// * `Error::RenderError` if a path, source name or file body fails to render
    /// * `Error::MissingTemplateError` if a file's source template does not exist
    /// * `Error::IoError` on filesystem failures
    pub fn apply(
        &self,
        structure: &[StructureEntry],
        variables: &ResolvedVariables,
    ) -> Result<GenerationResult> {
        let context = variables.to_context();
        let mut result = GenerationResult::default();

        for entry in structure {
            let rendered = self.engine.render(entry.path(), &context)?;
            let rendered = rendered.trim();

            // A conditional path that renders to nothing drops the entry.
            if rendered.is_empty() {
                debug!("Skipping '{}' as its rendered path is empty", entry.path());
                continue;
            }
            check_relative(rendered, entry.path())?;
            let target = self.output_root.join(rendered);

            match entry {
                StructureEntry::Dir { .. } => {
                    self.apply_dir(rendered, &target, &mut result)?;
                }
                StructureEntry::File { source, .. } => {
                    let source_path = self.locate_source(source, &context)?;
                    self.apply_file(rendered, &target, &source_path, &context, &mut result)?;
                }
            }
        }

        Ok(result)
    }

    fn apply_dir(&self, rendered: &str, target: &Path, result: &mut GenerationResult) -> Result<()> {
        if self.dry_run {
            result.would_create.push(rendered.to_string());
            return Ok(());
        }

        if target.is_dir() && self.policy == OverwritePolicy::SkipExisting {
            debug!("Directory exists: {}", target.display());
            result.skipped.push(rendered.to_string());
            return Ok(());
        }

        debug!("Creating directory: {}", target.display());
        fs::create_dir_all(target)?;
        result.created.push(rendered.to_string());
        Ok(())
    }

    fn apply_file(
        &self,
        rendered: &str,
        target: &Path,
        source_path: &Path,
        context: &serde_json::Value,
        result: &mut GenerationResult,
    ) -> Result<()> {
        if self.dry_run {
            result.would_create.push(rendered.to_string());
            return Ok(());
        }

        let overwrite = self.force || self.policy == OverwritePolicy::Always;
        if target.exists() && !overwrite {
            debug!("Keeping existing file: {}", target.display());
            result.skipped.push(rendered.to_string());
            return Ok(());
        }

        let content = fs::read_to_string(source_path)?;
        let content = self.engine.render(&content, context).map_err(|e| match e {
            Error::RenderError { cause, .. } => Error::RenderError {
                template: source_path.display().to_string(),
                cause,
            },
            other => other,
        })?;

        debug!("Writing file: {}", target.display());
        write_file(target, &content)?;
        result.created.push(rendered.to_string());
        Ok(())
    }

    fn locate_source(&self, source: &str, context: &serde_json::Value) -> Result<PathBuf> {
        let rendered = self.engine.render(source, context)?;
        let source_path = self.files_root.join(rendered.trim());
        if !source_path.is_file() {
            return Err(Error::MissingTemplateError {
                source_name: rendered.trim().to_string(),
                expected: source_path.display().to_string(),
            });
        }
        Ok(source_path)
    }
}
