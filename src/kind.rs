//! Template kinds and their generation profiles.
//!
//! Every supported kind runs through the same engine. What differs between
//! them (required variables, validation rules, overwrite behavior, hook
//! policies, derived variables) lives in a static [`KindProfile`] looked up
//! through [`TemplateKind::profile`].

use std::fmt;
use std::str::FromStr;

use crate::constants::{POST_GEN_HOOK, PRE_GEN_HOOK};
use crate::error::Error;
use crate::renderer::{to_artifact_id, to_class_name, to_package_path, to_snake_case};
use crate::variables::{ResolvedVariables, Value};

/// Registered template kinds. The manifest `name` must equal [`TemplateKind::name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    SpringBoot,
    Flutter,
    Django,
    Generic,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 4] =
        [TemplateKind::SpringBoot, TemplateKind::Flutter, TemplateKind::Django, TemplateKind::Generic];

    /// Identifier used in manifests and on the command line
    pub fn name(&self) -> &'static str {
        match self {
            TemplateKind::SpringBoot => "springboot",
            TemplateKind::Flutter => "flutter",
            TemplateKind::Django => "django",
            TemplateKind::Generic => "generic",
        }
    }

    pub fn profile(&self) -> &'static KindProfile {
        match self {
            TemplateKind::SpringBoot => &SPRING_BOOT,
            TemplateKind::Flutter => &FLUTTER,
            TemplateKind::Django => &DJANGO,
            TemplateKind::Generic => &GENERIC,
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for TemplateKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TemplateKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| Error::UnknownTemplateError(s.to_string()))
    }
}

/// What the structure walker does with entries that already exist on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwritePolicy {
    /// Every file is rewritten and every directory reported as created.
    Always,
    /// Existing files are left alone unless forced; existing directories are skipped.
    SkipExisting,
    /// Generation aborts if the project directory exists and is not forced.
    /// Otherwise behaves like `SkipExisting` for files.
    RefuseExistingProject,
}

/// Directory a hook script is started in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookCwd {
    TemplateRoot,
    OutputDir,
    ProjectDir,
}

/// Per-slot hook behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookPolicy {
    /// A failure or timeout aborts generation instead of being logged
    pub fatal: bool,
    pub timeout_secs: u64,
    pub cwd: HookCwd,
}

/// Input format check applied to one variable's value.
#[derive(Debug)]
pub struct FormatRule {
    pub variable: &'static str,
    pub pattern: &'static str,
    pub label: &'static str,
    pub hint: &'static str,
}

/// Closed set of values for one variable.
#[derive(Debug)]
pub struct AllowedValues {
    pub variable: &'static str,
    pub label: &'static str,
    pub values: &'static [&'static str],
}

/// The manifest's `validation` regex for `variable` must accept `example`.
#[derive(Debug)]
pub struct ExampleCheck {
    pub variable: &'static str,
    pub example: &'static str,
    /// The variable must declare a `validation` regex at all
    pub required: bool,
    pub format: &'static str,
}

/// The variable must be a `choice` whose choices respect both lists.
#[derive(Debug)]
pub struct ChoiceRule {
    pub variable: &'static str,
    pub must_include: &'static [&'static str],
    /// Empty means unrestricted
    pub within: &'static [&'static str],
}

/// Environment entry taken from a variable, with a fallback value.
#[derive(Debug)]
pub struct FixedEnv {
    pub key: &'static str,
    pub variable: &'static str,
    pub fallback: &'static str,
}

/// External program checked before a real generation.
#[derive(Debug)]
pub struct Toolchain {
    pub tool: &'static str,
    pub program: &'static str,
    pub args: &'static [&'static str],
    pub timeout_secs: u64,
}

/// Everything the engine needs to know about one template kind.
#[derive(Debug)]
pub struct KindProfile {
    pub kind: TemplateKind,
    pub display_name: &'static str,
    /// Manifest file names, tried in order
    pub manifest_files: &'static [&'static str],
    pub required_variables: &'static [&'static str],
    pub required_computed: &'static [&'static str],
    pub example_checks: &'static [ExampleCheck],
    pub choice_rules: &'static [ChoiceRule],
    /// Constraints on manifest-declared defaults
    pub default_rules: &'static [AllowedValues],
    pub format_rules: &'static [FormatRule],
    /// Constraints on user-supplied values
    pub allowed_values: &'static [AllowedValues],
    /// Every listed fragment must appear in some structure path
    pub required_structure_paths: &'static [&'static str],
    pub check_application_files: bool,
    pub env_prefix: &'static str,
    pub fixed_env: &'static [FixedEnv],
    pub overwrite: OverwritePolicy,
    pub pre_gen: HookPolicy,
    pub post_gen: HookPolicy,
    pub toolchain: Option<Toolchain>,
    /// Project directory name used when `project_name` is unset.
    /// `None` makes the output directory itself the project directory.
    pub default_project_dir: Option<&'static str>,
    /// Kind-specific post-processing after computed variables are evaluated
    pub derive: fn(&mut ResolvedVariables),
}

impl KindProfile {
    /// Policy of a hook slot. Slots other than `pre_gen` and `post_gen` get a
    /// non-fatal policy with the kind's `post_gen` timeout and working directory.
    pub fn hook_policy(&self, hook_name: &str) -> HookPolicy {
        match hook_name {
            PRE_GEN_HOOK => self.pre_gen,
            POST_GEN_HOOK => self.post_gen,
            _ => HookPolicy { fatal: false, ..self.post_gen },
        }
    }
}

const JAVA_PACKAGE: &str = r"^[a-z][a-z0-9]*(\.[a-z][a-z0-9]*)*$";
const LOWER_IDENT: &str = r"^[a-z][a-z0-9_]*$";

static SPRING_BOOT: KindProfile = KindProfile {
    kind: TemplateKind::SpringBoot,
    display_name: "Spring Boot",
    manifest_files: &["manifest.yml", "manifest.yaml"],
    required_variables: &["project_name", "package_name", "language"],
    required_computed: &["package_path", "main_class_name", "language_dir", "file_extension"],
    example_checks: &[ExampleCheck {
        variable: "package_name",
        example: "com.example.app",
        required: true,
        format: "Java package",
    }],
    choice_rules: &[
        ChoiceRule { variable: "language", must_include: &["java", "kt"], within: &[] },
        ChoiceRule {
            variable: "api_protocol",
            must_include: &[],
            within: &["rest", "graphql", "websocket", "grpc"],
        },
    ],
    default_rules: &[AllowedValues {
        variable: "java_version",
        label: "Java version",
        values: &["8", "11", "17", "21"],
    }],
    format_rules: &[
        FormatRule {
            variable: "package_name",
            pattern: JAVA_PACKAGE,
            label: "Java package name",
            hint: "Must be lowercase, dot-separated identifiers (e.g., com.example.app)",
        },
        FormatRule {
            variable: "project_name",
            pattern: r"^[a-z][a-z0-9-]*$",
            label: "Maven artifact ID",
            hint: "Must be lowercase, use hyphens (e.g., my-spring-app)",
        },
    ],
    allowed_values: &[
        AllowedValues { variable: "language", label: "language", values: &["java", "kt"] },
        AllowedValues {
            variable: "java_version",
            label: "Java version",
            values: &["8", "11", "17", "21"],
        },
    ],
    required_structure_paths: &[
        "src/main/{{ language_dir }}",
        "src/main/resources",
        "src/test/{{ language_dir }}",
    ],
    check_application_files: true,
    env_prefix: "SPRING_",
    fixed_env: &[FixedEnv {
        key: "SPRING_BOOT_VERSION",
        variable: "spring_boot_version",
        fallback: "3.2.0",
    }],
    overwrite: OverwritePolicy::SkipExisting,
    pre_gen: HookPolicy { fatal: false, timeout_secs: 60, cwd: HookCwd::TemplateRoot },
    post_gen: HookPolicy { fatal: false, timeout_secs: 60, cwd: HookCwd::ProjectDir },
    toolchain: None,
    default_project_dir: Some("spring-app"),
    derive: derive_spring_boot,
};

static FLUTTER: KindProfile = KindProfile {
    kind: TemplateKind::Flutter,
    display_name: "Flutter",
    manifest_files: &["manifest.yaml", "manifest.yml"],
    required_variables: &["project_name", "package_name"],
    required_computed: &["org_identifier", "app_name"],
    example_checks: &[
        ExampleCheck {
            variable: "package_name",
            example: "com.example.app",
            required: true,
            format: "package",
        },
        ExampleCheck {
            variable: "project_name",
            example: "my_flutter_app",
            required: false,
            format: "Flutter project",
        },
    ],
    choice_rules: &[ChoiceRule {
        variable: "api_protocol",
        must_include: &[],
        within: &["rest", "graphql", "websocket"],
    }],
    default_rules: &[],
    format_rules: &[
        FormatRule {
            variable: "package_name",
            pattern: JAVA_PACKAGE,
            label: "package name",
            hint: "Must be lowercase, dot-separated identifiers (e.g., com.example.app)",
        },
        FormatRule {
            variable: "project_name",
            pattern: LOWER_IDENT,
            label: "Flutter project name",
            hint: "Must be lowercase, use underscores, start with a letter (e.g., my_flutter_app)",
        },
    ],
    allowed_values: &[AllowedValues {
        variable: "api_protocol",
        label: "API protocol",
        values: &["rest", "graphql", "websocket"],
    }],
    required_structure_paths: &[],
    check_application_files: false,
    env_prefix: "FLUTTER_",
    fixed_env: &[],
    overwrite: OverwritePolicy::RefuseExistingProject,
    pre_gen: HookPolicy { fatal: true, timeout_secs: 300, cwd: HookCwd::OutputDir },
    post_gen: HookPolicy { fatal: false, timeout_secs: 300, cwd: HookCwd::OutputDir },
    toolchain: Some(Toolchain {
        tool: "Flutter",
        program: "flutter",
        args: &["--version"],
        timeout_secs: 20,
    }),
    default_project_dir: Some("flutter_app"),
    derive: derive_flutter,
};

static DJANGO: KindProfile = KindProfile {
    kind: TemplateKind::Django,
    display_name: "Django",
    manifest_files: &["manifest.yml", "manifest.yaml"],
    required_variables: &["project_name", "package_name"],
    required_computed: &["package_prefix", "django_project_name"],
    example_checks: &[
        ExampleCheck {
            variable: "package_name",
            example: "myapp",
            required: true,
            format: "Python package",
        },
        ExampleCheck {
            variable: "project_name",
            example: "django_backend",
            required: false,
            format: "Django project",
        },
    ],
    choice_rules: &[ChoiceRule {
        variable: "database_engine",
        must_include: &[],
        within: &["postgresql", "mysql", "sqlite"],
    }],
    default_rules: &[AllowedValues {
        variable: "python_version",
        label: "Python version",
        values: &["3.9", "3.10", "3.11", "3.12"],
    }],
    format_rules: &[
        FormatRule {
            variable: "package_name",
            pattern: LOWER_IDENT,
            label: "package name",
            hint: "Must be lowercase, use underscores (e.g., myapp)",
        },
        FormatRule {
            variable: "project_name",
            pattern: LOWER_IDENT,
            label: "Django project name",
            hint: "Must be lowercase, use underscores, start with a letter (e.g., django_backend)",
        },
    ],
    allowed_values: &[
        AllowedValues {
            variable: "database_engine",
            label: "database engine",
            values: &["postgresql", "mysql", "sqlite"],
        },
        AllowedValues {
            variable: "python_version",
            label: "Python version",
            values: &["3.9", "3.10", "3.11", "3.12"],
        },
    ],
    required_structure_paths: &[],
    check_application_files: false,
    env_prefix: "DJANGO_",
    fixed_env: &[],
    overwrite: OverwritePolicy::Always,
    pre_gen: HookPolicy { fatal: true, timeout_secs: 600, cwd: HookCwd::OutputDir },
    post_gen: HookPolicy { fatal: false, timeout_secs: 600, cwd: HookCwd::OutputDir },
    toolchain: Some(Toolchain {
        tool: "Python 3",
        program: "python3",
        args: &["--version"],
        timeout_secs: 10,
    }),
    default_project_dir: Some("django_backend"),
    derive: derive_django,
};

static GENERIC: KindProfile = KindProfile {
    kind: TemplateKind::Generic,
    display_name: "Generic",
    manifest_files: &["manifest.yml", "manifest.yaml"],
    required_variables: &[],
    required_computed: &[],
    example_checks: &[],
    choice_rules: &[],
    default_rules: &[],
    format_rules: &[],
    allowed_values: &[],
    required_structure_paths: &[],
    check_application_files: false,
    env_prefix: "CFS_",
    fixed_env: &[],
    overwrite: OverwritePolicy::SkipExisting,
    pre_gen: HookPolicy { fatal: true, timeout_secs: 60, cwd: HookCwd::OutputDir },
    post_gen: HookPolicy { fatal: false, timeout_secs: 60, cwd: HookCwd::OutputDir },
    toolchain: None,
    default_project_dir: None,
    derive: derive_nothing,
};

fn derive_nothing(_: &mut ResolvedVariables) {}

fn derive_spring_boot(vars: &mut ResolvedVariables) {
    if let Some(package_name) = vars.get_string("package_name") {
        vars.insert("package_path", Value::String(to_package_path(&package_name)));

        if !vars.contains_key("group_id") {
            let parts: Vec<&str> = package_name.split('.').collect();
            let group_id = if parts.len() >= 2 { parts[..2].join(".") } else { package_name.clone() };
            vars.insert("group_id", Value::String(group_id));
        }
    }

    if let Some(project_name) = vars.get_string("project_name") {
        let main_class = format!("{}Application", to_class_name(&project_name));
        vars.insert("main_class_name", Value::String(main_class));
        vars.insert("artifact_id", Value::String(to_artifact_id(&project_name)));
    }

    if let Some(language) = vars.get_string("language") {
        let language_dir = if language == "kt" { "kotlin" } else { "java" };
        vars.insert("language_dir", Value::String(language_dir.to_string()));
        vars.insert("file_extension", Value::String(language));
    }
}

fn derive_flutter(vars: &mut ResolvedVariables) {
    if let Some(package_name) = vars.get_string("package_name") {
        vars.insert("package_path", Value::String(to_package_path(&package_name)));
    }
    if let Some(project_name) = vars.get_string("project_name") {
        vars.insert("project_name", Value::String(to_snake_case(&project_name)));
    }
}

fn derive_django(vars: &mut ResolvedVariables) {
    for key in ["project_name", "package_name"] {
        if let Some(value) = vars.get_string(key) {
            vars.insert(key, Value::String(to_snake_case(&value)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_lookup() {
        assert_eq!("springboot".parse::<TemplateKind>().unwrap(), TemplateKind::SpringBoot);
        assert_eq!("django".parse::<TemplateKind>().unwrap().profile().env_prefix, "DJANGO_");
        assert!(matches!(
            "react".parse::<TemplateKind>(),
            Err(Error::UnknownTemplateError(name)) if name == "react"
        ));
    }

    #[test]
    fn test_hook_policy_by_slot() {
        let profile = TemplateKind::Flutter.profile();
        assert!(profile.hook_policy("pre_gen").fatal);
        assert!(!profile.hook_policy("post_gen").fatal);
    }

    #[test]
    fn test_unknown_hook_slot_is_not_fatal() {
        let profile = TemplateKind::Django.profile();
        let policy = profile.hook_policy("pre_deploy");
        assert!(!policy.fatal);
        assert_eq!(policy.timeout_secs, 600);
        assert_eq!(policy.cwd, HookCwd::OutputDir);
    }

    #[test]
    fn test_spring_boot_derivations() {
        let mut vars = ResolvedVariables::default();
        vars.insert("project_name", Value::from("demo-app"));
        vars.insert("package_name", Value::from("com.example.demo"));
        vars.insert("language", Value::from("kt"));

        derive_spring_boot(&mut vars);

        assert_eq!(vars.get_string("package_path").as_deref(), Some("com/example/demo"));
        assert_eq!(vars.get_string("main_class_name").as_deref(), Some("DemoAppApplication"));
        assert_eq!(vars.get_string("artifact_id").as_deref(), Some("demo-app"));
        assert_eq!(vars.get_string("language_dir").as_deref(), Some("kotlin"));
        assert_eq!(vars.get_string("file_extension").as_deref(), Some("kt"));
        assert_eq!(vars.get_string("group_id").as_deref(), Some("com.example"));
    }

    #[test]
    fn test_django_normalizes_names() {
        let mut vars = ResolvedVariables::default();
        vars.insert("project_name", Value::from("My-Backend"));
        derive_django(&mut vars);
        assert_eq!(vars.get_string("project_name").as_deref(), Some("my_backend"));
    }
}
