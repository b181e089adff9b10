use std::fs;
use std::path::{Path, PathBuf};

use cfs::error::Error;
use cfs::generator::{Generator, GeneratorState};
use cfs::kind::TemplateKind;
use cfs::variables::{Value, Variables};
use tempfile::TempDir;

fn vars(pairs: &[(&str, &str)]) -> Variables {
    pairs.iter().map(|(k, v)| (k.to_string(), Value::from(*v))).collect()
}

fn sample_template(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("templates").join(name)
}

/// Writes a generic template with one directory, one file and optional hooks.
fn generic_template(root: &Path, hooks: &str) {
    let manifest = format!(
        r#"name: generic
description: Minimal template
version: 1.0.0
variables:
  name:
    type: string
    validation: "^[a-z]+$"
structure:
  - type: dir
    path: src
  - type: file
    path: src/app.txt
    source: app.txt.tmpl
{hooks}"#
    );
    fs::write(root.join("manifest.yml"), manifest).unwrap();
    fs::create_dir_all(root.join("src_templates")).unwrap();
    fs::write(root.join("src_templates/app.txt.tmpl"), "Hello {{ name }}").unwrap();
}

fn write_hook(root: &Path, name: &str, body: &str) {
    fs::create_dir_all(root.join("hooks")).unwrap();
    fs::write(root.join("hooks").join(name), format!("#!/usr/bin/env bash\n{body}\n")).unwrap();
}

#[test]
fn test_generate_before_load_is_rejected() {
    let template = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    generic_template(template.path(), "");

    let mut generator = Generator::new(template.path(), TemplateKind::Generic);
    assert_eq!(generator.state(), GeneratorState::Unloaded);
    assert!(matches!(
        generator.generate(&vars(&[("name", "world")]), output.path(), false, false),
        Err(Error::NotLoadedError)
    ));
}

#[test]
fn test_failed_load_is_terminal() {
    let template = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    fs::write(template.path().join("manifest.yml"), "name: generic\n").unwrap();

    let mut generator = Generator::new(template.path(), TemplateKind::Generic);
    assert!(matches!(generator.load_manifest(), Err(Error::ValidationError(_))));
    assert_eq!(generator.state(), GeneratorState::Failed);
    assert!(matches!(
        generator.generate(&Variables::new(), output.path(), false, false),
        Err(Error::NotLoadedError)
    ));
}

#[test]
fn test_load_creates_files_source() {
    let template = TempDir::new().unwrap();
    fs::write(
        template.path().join("manifest.yml"),
        "name: generic\ndescription: demo\nversion: 1.0.0\nfiles_source: files\n",
    )
    .unwrap();

    let mut generator = Generator::new(template.path(), TemplateKind::Generic);
    let manifest = generator.load_manifest().unwrap();
    assert_eq!(manifest.files_source, "files");
    assert!(template.path().join("files").is_dir());
    assert_eq!(generator.state(), GeneratorState::Loaded);
}

#[test]
fn test_generate_generic_template() {
    let template = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    generic_template(template.path(), "");

    let mut generator = Generator::new(template.path(), TemplateKind::Generic);
    generator.load_manifest().unwrap();
    let result = generator.generate(&vars(&[("name", "world")]), output.path(), false, false).unwrap();

    assert_eq!(result.created, vec!["src", "src/app.txt"]);
    assert_eq!(fs::read_to_string(output.path().join("src/app.txt")).unwrap(), "Hello world");
    assert_eq!(generator.state(), GeneratorState::Generated);

    // A second call starts from scratch and finds everything in place.
    let again = generator.generate(&vars(&[("name", "world")]), output.path(), false, false).unwrap();
    assert_eq!(again.skipped, vec!["src", "src/app.txt"]);
}

#[test]
fn test_invalid_input_touches_nothing() {
    let template = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    generic_template(template.path(), "");

    let mut generator = Generator::new(template.path(), TemplateKind::Generic);
    generator.load_manifest().unwrap();

    match generator.generate(&vars(&[("name", "World")]), output.path(), false, false) {
        Err(Error::InputValidationError(errors)) => {
            assert_eq!(errors.len(), 1);
            assert!(errors[0].contains("name"));
        }
        other => panic!("Expected input validation error, got {other:?}"),
    }
    assert_eq!(fs::read_dir(output.path()).unwrap().count(), 0);
}

#[test]
fn test_dry_run_skips_hooks_and_writes() {
    let template = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    generic_template(
        template.path(),
        "hooks:\n  pre_gen:\n    script: hooks/pre_gen.sh\n",
    );
    write_hook(template.path(), "pre_gen.sh", "touch pre_gen_ran");

    let mut generator = Generator::new(template.path(), TemplateKind::Generic);
    generator.load_manifest().unwrap();
    let result = generator.generate(&vars(&[("name", "world")]), output.path(), false, true).unwrap();

    assert_eq!(result.would_create, vec!["src", "src/app.txt"]);
    assert_eq!(fs::read_dir(output.path()).unwrap().count(), 0);
}

#[test]
fn test_hooks_run_around_structure() {
    let template = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    generic_template(
        template.path(),
        "hooks:\n  pre_gen:\n    script: hooks/pre_gen.sh\n  post_gen:\n    script: hooks/post_gen.sh\n",
    );
    write_hook(template.path(), "pre_gen.sh", "test ! -e src && touch pre_gen_ran");
    write_hook(template.path(), "post_gen.sh", "test -f src/app.txt && echo \"$CFS_NAME\" > post_gen_ran");

    let mut generator = Generator::new(template.path(), TemplateKind::Generic);
    generator.load_manifest().unwrap();
    generator.generate(&vars(&[("name", "world")]), output.path(), false, false).unwrap();

    assert!(output.path().join("pre_gen_ran").exists());
    assert_eq!(fs::read_to_string(output.path().join("post_gen_ran")).unwrap(), "world\n");
}

#[test]
fn test_fatal_pre_gen_aborts_generation() {
    let template = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    generic_template(template.path(), "hooks:\n  pre_gen:\n    script: hooks/pre_gen.sh\n");
    write_hook(template.path(), "pre_gen.sh", "exit 1");

    let mut generator = Generator::new(template.path(), TemplateKind::Generic);
    generator.load_manifest().unwrap();
    let result = generator.generate(&vars(&[("name", "world")]), output.path(), false, false);

    assert!(matches!(result, Err(Error::HookError { .. })));
    assert!(!output.path().join("src").exists());
}

#[test]
fn test_non_fatal_post_gen_only_warns() {
    let template = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    generic_template(template.path(), "hooks:\n  post_gen:\n    script: hooks/post_gen.sh\n");
    write_hook(template.path(), "post_gen.sh", "exit 1");

    let mut generator = Generator::new(template.path(), TemplateKind::Generic);
    generator.load_manifest().unwrap();
    let result = generator.generate(&vars(&[("name", "world")]), output.path(), false, false).unwrap();

    assert_eq!(result.created, vec!["src", "src/app.txt"]);
}

#[test]
fn test_springboot_sample_template() {
    let output = TempDir::new().unwrap();
    let mut generator = Generator::new(sample_template("springboot"), TemplateKind::SpringBoot);
    generator.load_manifest().unwrap();

    let variables = vars(&[
        ("project_name", "order-service"),
        ("package_name", "com.acme.orders"),
        ("language", "kt"),
    ]);
    let result = generator.generate(&variables, output.path(), false, false).unwrap();

    let project = output.path().join("order-service");
    let main_class = project.join("src/main/kotlin/com/acme/orders/OrderServiceApplication.kt");
    assert!(main_class.is_file());
    let source = fs::read_to_string(&main_class).unwrap();
    assert!(source.starts_with("package com.acme.orders\n"));
    assert!(source.contains("class OrderServiceApplication"));

    let pom = fs::read_to_string(project.join("pom.xml")).unwrap();
    assert!(pom.contains("<groupId>com.acme</groupId>"));
    assert!(pom.contains("<artifactId>order-service</artifactId>"));
    assert!(pom.contains("<version>3.2.0</version>"));
    assert!(pom.contains("spring-boot-starter-web"));

    assert!(project.join("src/main/kotlin/com/acme/orders/controller").is_dir());
    assert!(!project.join("src/main/resources/graphql").exists());
    assert!(project.join("src/test/kotlin/com/acme/orders").is_dir());
    assert!(result.created.contains(&"order-service/README.md".to_string()));
    assert!(result.skipped.is_empty());
}

#[test]
fn test_springboot_rejects_bad_input() {
    let output = TempDir::new().unwrap();
    let mut generator = Generator::new(sample_template("springboot"), TemplateKind::SpringBoot);
    generator.load_manifest().unwrap();

    let variables = vars(&[
        ("project_name", "Order_Service"),
        ("package_name", "Com.Acme"),
        ("language", "scala"),
    ]);
    match generator.generate(&variables, output.path(), false, false) {
        Err(Error::InputValidationError(errors)) => {
            assert!(errors.iter().any(|e| e.contains("Maven artifact ID")));
            assert!(errors.iter().any(|e| e.contains("Java package name")));
            assert!(errors.iter().any(|e| e.contains("Invalid language: scala")));
        }
        other => panic!("Expected input validation error, got {other:?}"),
    }
}

#[test]
fn test_refuse_existing_project_directory() {
    let template = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    fs::write(
        template.path().join("manifest.yaml"),
        r#"name: flutter
description: Flutter app
version: 1.0.0
variables:
  project_name:
    type: string
  package_name:
    type: string
    validation: "^[a-z][a-z0-9]*(\\.[a-z][a-z0-9]*)*$"
computed:
  org_identifier: "{{ package_name }}"
  app_name: "{{ project_name | to_class_name }}"
structure:
  - type: dir
    path: "{{ project_name }}/lib"
"#,
    )
    .unwrap();
    fs::create_dir_all(output.path().join("my_app")).unwrap();

    let mut generator =
        Generator::new(template.path(), TemplateKind::Flutter).with_toolchain_check(false);
    generator.load_manifest().unwrap();
    let variables = vars(&[("project_name", "my_app"), ("package_name", "com.example.app")]);

    assert!(matches!(
        generator.generate(&variables, output.path(), false, false),
        Err(Error::OutputDirectoryExistsError { .. })
    ));

    let result = generator.generate(&variables, output.path(), true, false).unwrap();
    assert_eq!(result.created, vec!["my_app/lib"]);
}

fn django_template(root: &Path) {
    fs::write(
        root.join("manifest.yml"),
        r#"name: django
description: Django backend
version: 1.0.0
variables:
  project_name:
    type: string
  package_name:
    type: string
    validation: "^[a-z][a-z0-9_]*$"
  debug:
    type: boolean
    default: true
computed:
  package_prefix: "{{ package_name }}_"
  django_project_name: "{{ project_name }}"
structure:
  - type: dir
    path: "{{ project_name }}"
  - type: file
    path: "{{ project_name }}/settings.py"
    source: settings.py.j2
hooks:
  pre_gen:
    script: hooks/pre_gen.sh
"#,
    )
    .unwrap();
    fs::create_dir_all(root.join("src_templates")).unwrap();
    fs::write(
        root.join("src_templates/settings.py.j2"),
        "APP = \"{{ package_name }}\"\nDEBUG = {{ 'True' if debug else 'False' }}\n",
    )
    .unwrap();
}

#[test]
fn test_django_rerun_overwrites_every_file() {
    let template = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    django_template(template.path());

    let mut generator =
        Generator::new(template.path(), TemplateKind::Django).with_toolchain_check(false);
    generator.load_manifest().unwrap();

    let initial = vars(&[("project_name", "shop_backend"), ("package_name", "shop")]);
    let first = generator.generate(&initial, output.path(), false, false).unwrap();
    assert_eq!(first.created, vec!["shop_backend", "shop_backend/settings.py"]);

    let mut changed = vars(&[("project_name", "shop_backend"), ("package_name", "orders")]);
    changed.insert("debug".to_string(), Value::Boolean(false));
    let second = generator.generate(&changed, output.path(), false, false).unwrap();

    assert_eq!(second.created, vec!["shop_backend", "shop_backend/settings.py"]);
    assert!(second.skipped.is_empty());
    assert_eq!(
        fs::read_to_string(output.path().join("shop_backend/settings.py")).unwrap(),
        "APP = \"orders\"\nDEBUG = False\n"
    );
}

#[test]
fn test_django_pre_gen_failure_is_fatal() {
    let template = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    django_template(template.path());
    write_hook(template.path(), "pre_gen.sh", "echo 'virtualenv missing' >&2\nexit 1");

    let mut generator =
        Generator::new(template.path(), TemplateKind::Django).with_toolchain_check(false);
    generator.load_manifest().unwrap();
    let result = generator.generate(
        &vars(&[("project_name", "shop_backend"), ("package_name", "shop")]),
        output.path(),
        false,
        false,
    );

    assert!(matches!(result, Err(Error::HookError { ref message, .. }) if message == "virtualenv missing"));
    assert!(!output.path().join("shop_backend").exists());
}
