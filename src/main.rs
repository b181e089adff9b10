//! cfs application entry point.
//! Parses the command line, drives a generator for `init` and scans the
//! templates directory for `list`.

use std::path::Path;

use cfs::{
    cli::{collect_variables, get_args, Command, InitArgs},
    error::{default_error_handler, Error, Result},
    generator::Generator,
    kind::TemplateKind,
    logger::init_logger,
    manifest::describe_template,
};
use walkdir::WalkDir;

fn main() {
    let args = get_args();
    init_logger(args.verbose);

    let result = match &args.command {
        Command::Init(init) => run_init(init),
        Command::List { templates_dir } => run_list(templates_dir),
    };

    if let Err(err) = result {
        default_error_handler(err, args.debug);
    }
}

/// Generates a project from the named template.
///
/// # Flow
/// 1. Resolves the template kind and its directory
/// 2. Loads and validates the manifest
/// 3. Collects variables from the variables file, `--var` and flags
/// 4. Generates, then prints what was created, skipped or would be created
fn run_init(args: &InitArgs) -> Result<()> {
    let kind: TemplateKind = args.template.parse()?;
    let template_root = args.templates_dir.join(&args.template);
    if !template_root.is_dir() {
        return Err(Error::NotFound(format!(
            "template '{}' not found in {}",
            args.template,
            args.templates_dir.display()
        )));
    }

    let mut generator =
        Generator::new(&template_root, kind).with_toolchain_check(!args.skip_toolchain_check);
    let manifest = generator.load_manifest()?;
    let variables = collect_variables(manifest, args)?;

    println!("Generating {} project:", kind);
    if let Some(project_name) = variables.get("project_name") {
        println!("   Project name: {}", project_name);
    }
    println!("   Output directory: {}", args.output_dir.display());
    if args.dry_run {
        println!("DRY RUN - No files will be created");
    }

    let result = generator.generate(&variables, &args.output_dir, args.force, args.dry_run)?;

    if args.dry_run {
        println!("Would create:");
        for item in &result.would_create {
            println!("   + {}", item);
        }
        return Ok(());
    }

    println!("Created:");
    for item in &result.created {
        println!("   + {}", item);
    }
    if !result.skipped.is_empty() {
        println!("Skipped (already exist):");
        for item in &result.skipped {
            println!("   - {}", item);
        }
    }
    println!("Template generation completed successfully in {}.", args.output_dir.display());
    Ok(())
}

/// Prints every template directory carrying a readable manifest.
fn run_list(templates_dir: &Path) -> Result<()> {
    if !templates_dir.is_dir() {
        return Err(Error::NotFound(format!(
            "templates directory {}",
            templates_dir.display()
        )));
    }

    println!("Available templates:");
    let entries = WalkDir::new(templates_dir).min_depth(1).max_depth(1).sort_by_file_name();
    for entry in entries {
        let entry = entry.map_err(|e| Error::IoError(e.into()))?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let Some((name, description)) = describe_template(entry.path()) else {
            log::debug!("Skipping {}: no readable manifest", entry.path().display());
            continue;
        };
        println!("  - {} ({}): {}", entry.file_name().to_string_lossy(), name, description);
    }
    Ok(())
}
