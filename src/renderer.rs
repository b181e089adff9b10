//! Template rendering for cfs.
//! Expands MiniJinja syntax in structure paths, source template names,
//! computed expressions and file bodies.
use crate::error::{Error, Result};
use cruet::Inflector;
use minijinja::{Environment, UndefinedBehavior};

/// Trait for template rendering engines.
pub trait TemplateRenderer {
    /// Renders a template string with the given context.
    ///
    /// # Arguments
    /// * `template` - Template string to render
    /// * `context` - Context variables for rendering
    ///
    /// # Returns
    /// * `Result<String>` - Rendered template string
    fn render(&self, template: &str, context: &serde_json::Value) -> Result<String>;
}

/// MiniJinja-based template rendering engine.
pub struct MiniJinjaRenderer {
    /// MiniJinja environment instance
    env: Environment<'static>,
}

impl MiniJinjaRenderer {
    /// Creates a renderer with block trimming, trailing newlines kept,
    /// undefined values rejected when printed and the naming filters registered.
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);
        env.set_undefined_behavior(UndefinedBehavior::SemiStrict);

        env.add_filter("to_package_path", |value: String| to_package_path(&value));
        env.add_filter("to_class_name", |value: String| to_class_name(&value));
        env.add_filter("to_artifact_id", |value: String| to_artifact_id(&value));
        env.add_filter("to_snake_case", |value: String| to_snake_case(&value));

        Self { env }
    }
}

impl Default for MiniJinjaRenderer {
    fn default() -> Self {
        MiniJinjaRenderer::new()
    }
}

impl TemplateRenderer for MiniJinjaRenderer {
    /// Renders a template string using MiniJinja.
    ///
    /// # Errors
    /// * `Error::RenderError` on syntax errors or undefined variables
    fn render(&self, template: &str, context: &serde_json::Value) -> Result<String> {
        self.env.render_str(template, context).map_err(|e| Error::RenderError {
            template: template.to_string(),
            cause: e.to_string(),
        })
    }
}

/// `com.example.app` -> `com/example/app`
pub fn to_package_path(package_name: &str) -> String {
    package_name.replace('.', "/")
}

/// `demo-app` -> `DemoApp`
pub fn to_class_name(project_name: &str) -> String {
    project_name.to_pascal_case()
}

/// `My_Service` -> `my-service`
pub fn to_artifact_id(name: &str) -> String {
    name.to_kebab_case()
}

/// `demo-app` -> `demo_app`
pub fn to_snake_case(text: &str) -> String {
    text.to_snake_case()
}
