//! cfs is a manifest-driven project structure generator.
//! A template directory carries a YAML manifest describing variables,
//! computed values, a list of directories and files to create and optional
//! hook scripts; one engine, parameterized per template kind, turns it into
//! a project tree.

/// Command-line interface module for the cfs binary
pub mod cli;

/// Shared constants: default files source, required manifest fields, hook slots
pub mod constants;

/// Error types and handling for cfs
pub mod error;

/// Per-kind composition of loading, resolving, walking and hooks
pub mod generator;

/// Pre and post generation hook processing
/// Runs `hooks.pre_gen` and `hooks.post_gen` scripts with bash
pub mod hooks;

/// Template-kind registry and per-kind profiles
pub mod kind;

/// Logger initialization for the binary
pub mod logger;

/// Manifest model and loader
/// Supports manifest.yml and manifest.yaml
pub mod manifest;

/// Template rendering with MiniJinja
pub mod renderer;

/// Structure walker writing directories and files
pub mod structure;

/// Variable values, validation and resolution
pub mod variables;
