//! Per-kind generation entry point.
//!
//! A [`Generator`] owns one template directory. `load_manifest` must succeed
//! before `generate` is accepted.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::constants::{POST_GEN_HOOK, PRE_GEN_HOOK};
use crate::error::{Error, Result};
use crate::hooks::{check_toolchain, run_hook, HookDirs};
use crate::kind::{KindProfile, OverwritePolicy, TemplateKind};
use crate::manifest::{load_manifest, Manifest};
use crate::renderer::MiniJinjaRenderer;
use crate::structure::{GenerationResult, StructureWalker};
use crate::variables::{resolve, validate, ResolvedVariables, Variables};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    Unloaded,
    Loaded,
    Generated,
    Failed,
}

pub struct Generator {
    template_root: PathBuf,
    profile: &'static KindProfile,
    engine: MiniJinjaRenderer,
    state: GeneratorState,
    manifest: Option<Manifest>,
    files_root: Option<PathBuf>,
    toolchain_check: bool,
}

impl Generator {
    pub fn new<P: AsRef<Path>>(template_root: P, kind: TemplateKind) -> Self {
        Self {
            template_root: template_root.as_ref().to_path_buf(),
            profile: kind.profile(),
            engine: MiniJinjaRenderer::new(),
            state: GeneratorState::Unloaded,
            manifest: None,
            files_root: None,
            toolchain_check: true,
        }
    }

    /// Enables or disables the external toolchain check run before generation.
    pub fn with_toolchain_check(mut self, enabled: bool) -> Self {
        self.toolchain_check = enabled;
        self
    }

    pub fn kind(&self) -> TemplateKind {
        self.profile.kind
    }

    pub fn state(&self) -> GeneratorState {
        self.state
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    /// Loads and validates the manifest, creating the files source directory if absent.
    ///
    /// A failure leaves the generator in [`GeneratorState::Failed`].
    pub fn load_manifest(&mut self) -> Result<&Manifest> {
        match self.try_load() {
            Ok((manifest, files_root)) => {
                self.files_root = Some(files_root);
                self.state = GeneratorState::Loaded;
                Ok(self.manifest.insert(manifest))
            }
            Err(e) => {
                self.state = GeneratorState::Failed;
                Err(e)
            }
        }
    }

    fn try_load(&self) -> Result<(Manifest, PathBuf)> {
        let manifest = load_manifest(&self.template_root, self.profile)?;
        let files_root = self.template_root.join(&manifest.files_source);
        if !files_root.exists() {
            debug!("Creating files source directory {}", files_root.display());
            fs::create_dir_all(&files_root)?;
        }
        info!(
            "Loaded {} template '{}' v{}",
            self.profile.display_name, manifest.name, manifest.version
        );
        Ok((manifest, files_root))
    }

    /// Validates `variables`, resolves them and writes the project below `output_dir`.
    ///
    /// Hooks run around the structure walk unless `dry_run` is set. May be
    /// called again; every call starts from scratch.
    ///
    /// # Errors
    /// * `Error::NotLoadedError` if no manifest has been loaded
    /// * `Error::InputValidationError` listing every invalid input
    /// * `Error::OutputDirectoryExistsError` if the kind refuses an existing project
    /// * any error of the resolver, the structure walker or a fatal hook
    pub fn generate<P: AsRef<Path>>(
        &mut self,
        variables: &Variables,
        output_dir: P,
        force: bool,
        dry_run: bool,
    ) -> Result<GenerationResult> {
        let (Some(manifest), Some(files_root)) = (&self.manifest, &self.files_root) else {
            return Err(Error::NotLoadedError);
        };
        if self.state == GeneratorState::Failed {
            return Err(Error::NotLoadedError);
        }
        let output_dir = output_dir.as_ref();
        let profile = self.profile;

        if let (Some(toolchain), true, false) = (&profile.toolchain, self.toolchain_check, dry_run) {
            check_toolchain(toolchain)?;
        }

        let errors = validate(manifest, profile, variables);
        if !errors.is_empty() {
            return Err(Error::InputValidationError(errors));
        }
        let resolved = resolve(manifest, profile, &self.engine, variables)?;

        let dirs = HookDirs {
            template_root: self.template_root.clone(),
            output_dir: output_dir.to_path_buf(),
            project_dir: project_dir(profile, &resolved, output_dir),
        };

        if profile.overwrite == OverwritePolicy::RefuseExistingProject
            && !force
            && !dry_run
            && dirs.project_dir.exists()
        {
            return Err(Error::OutputDirectoryExistsError {
                output_dir: dirs.project_dir.display().to_string(),
            });
        }

        if !dry_run {
            fs::create_dir_all(output_dir)?;
            run_slot(manifest, profile, PRE_GEN_HOOK, &resolved, &dirs)?;
        }

        if manifest.structure.is_empty() {
            warn!("Template '{}' declares no structure entries", manifest.name);
        }
        let walker = StructureWalker::new(
            &self.engine,
            files_root,
            output_dir,
            profile.overwrite,
            force,
            dry_run,
        );
        let result = walker.apply(&manifest.structure, &resolved)?;

        if !dry_run {
            if dirs.project_dir.exists() {
                run_slot(manifest, profile, POST_GEN_HOOK, &resolved, &dirs)?;
            } else {
                debug!(
                    "Skipping {} hook, {} does not exist",
                    POST_GEN_HOOK,
                    dirs.project_dir.display()
                );
            }
        }

        self.state = GeneratorState::Generated;
        Ok(result)
    }
}

/// Runs one hook slot, downgrading failures to warnings when the slot is not fatal.
fn run_slot(
    manifest: &Manifest,
    profile: &KindProfile,
    hook_name: &str,
    variables: &ResolvedVariables,
    dirs: &HookDirs,
) -> Result<()> {
    match run_hook(manifest, profile, hook_name, variables, dirs) {
        Err(e) if !profile.hook_policy(hook_name).fatal => {
            warn!("{}", e);
            Ok(())
        }
        other => other,
    }
}

fn project_dir(profile: &KindProfile, variables: &ResolvedVariables, output_dir: &Path) -> PathBuf {
    let name = variables
        .get("project_name")
        .map(|v| v.to_string())
        .or_else(|| profile.default_project_dir.map(str::to_string));
    match name {
        Some(name) if profile.default_project_dir.is_some() => output_dir.join(name),
        _ => output_dir.to_path_buf(),
    }
}
