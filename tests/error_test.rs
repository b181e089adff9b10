use std::io;

use cfs::error::Error;

#[test]
fn test_error_conversion() {
    let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
    let err: Error = io_err.into();

    match err {
        Error::IoError(_) => (),
        _ => panic!("Expected IoError variant"),
    }
}

#[test]
fn test_error_display() {
    let err = Error::ValidationError("Missing required field: version".to_string());
    assert_eq!(err.to_string(), "Manifest validation error: Missing required field: version");

    let err = Error::HookTimeoutError { hook: "pre_gen".to_string(), seconds: 60 };
    assert_eq!(err.to_string(), "Hook 'pre_gen' timed out after 60s");

    let err = Error::ComputationError {
        name: "package_path".to_string(),
        cause: "undefined value".to_string(),
    };
    assert_eq!(err.to_string(), "Error computing variable 'package_path': undefined value");

    assert_eq!(
        Error::NotLoadedError.to_string(),
        "Manifest not loaded. Call load_manifest() first"
    );
}

#[test]
fn test_input_validation_lists_every_message() {
    let err = Error::InputValidationError(vec![
        "Missing required Flutter variable: project_name".to_string(),
        "Invalid API protocol: soap. Must be one of: rest, graphql, websocket".to_string(),
    ]);

    let text = err.to_string();
    assert!(text.starts_with("Validation errors:\n"));
    assert!(text.contains("  • Missing required Flutter variable: project_name"));
    assert!(text.contains("  • Invalid API protocol: soap"));
    assert_eq!(text.lines().count(), 3);
}

#[test]
fn test_missing_template_names_both_paths() {
    let err = Error::MissingTemplateError {
        source_name: "app.txt.tmpl".to_string(),
        expected: "/tpl/src_templates/app.txt.tmpl".to_string(),
    };
    let text = err.to_string();
    assert!(text.contains("app.txt.tmpl"));
    assert!(text.contains("Expected at: /tpl/src_templates/app.txt.tmpl"));
}
