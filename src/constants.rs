//! Common constants used throughout cfs.

/// Folder (relative to the template root) holding source templates
pub const DEFAULT_FILES_SOURCE: &str = "src_templates";

/// Top-level manifest fields every template must declare
pub const REQUIRED_FIELDS: [&str; 3] = ["name", "description", "version"];

/// Variable types a manifest may declare
pub const VARIABLE_TYPES: [&str; 4] = ["string", "choice", "boolean", "integer"];

/// Hook slot run before the structure is created
pub const PRE_GEN_HOOK: &str = "pre_gen";

/// Hook slot run after the structure is created
pub const POST_GEN_HOOK: &str = "post_gen";
