//! Generator error types.
#![allow(unused_assignments)]

use std::path::PathBuf;
use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur during generation.
///
/// Every variant is fatal: the run aborts and nothing is flushed to the
/// output directory. Non-fatal conditions (unresolved types outside strict
/// mode, members a system does not model) are logged instead.
#[allow(unused_assignments)]
#[derive(Error, Diagnostic, Debug)]
pub enum GeneratorError {
    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("Failed to access '{}': {message}", path.display())]
    #[diagnostic(code(dartidl::io::access_failed))]
    IoError {
        path: PathBuf,
        message: String,
    },

    // =========================================================================
    // Input Errors
    // =========================================================================
    #[error("Failed to parse database snapshot '{}': {message}", path.display())]
    #[diagnostic(
        code(dartidl::input::database_parse),
        help("Snapshots are JSON objects with optional \"interfaces\", \"dictionaries\" and \"enums\" arrays")
    )]
    DatabaseParse {
        path: PathBuf,
        message: String,
    },

    #[error("Failed to parse configuration '{}': {message}", path.display())]
    #[diagnostic(code(dartidl::input::config_parse))]
    ConfigParse {
        path: PathBuf,
        message: String,
    },

    #[error("Unknown system: {name}")]
    #[diagnostic(
        code(dartidl::input::unknown_system),
        help("Available systems: interface, wrapping, native, js, dummy")
    )]
    UnknownSystem {
        name: String,
    },

    // =========================================================================
    // Database Errors
    // =========================================================================
    #[error("Duplicate interface: {name}")]
    #[diagnostic(code(dartidl::database::duplicate_interface))]
    DuplicateInterface {
        name: String,
    },

    #[error("Interface '{interface}' supplements '{target}', which does not exist")]
    #[diagnostic(
        code(dartidl::database::supplemental_target_missing),
        help("Dropping a supplemental silently would change the public surface of the target")
    )]
    SupplementalTargetMissing {
        interface: String,
        target: String,
    },

    #[error("Cyclic inheritance: {}", cycle.join(" -> "))]
    #[diagnostic(
        code(dartidl::database::inheritance_cycle),
        help("Every interface must be reachable from its parents without revisiting itself")
    )]
    InheritanceCycle {
        cycle: Vec<String>,
    },

    #[error("Cyclic [MergedInto]: {}", cycle.join(" -> "))]
    #[diagnostic(
        code(dartidl::database::merged_into_cycle),
        help("A [MergedInto] chain must end at an interface that is not merged elsewhere")
    )]
    MergedIntoCycle {
        cycle: Vec<String>,
    },

    #[error("Interface '{interface}' declares more than one {accessor} for attribute '{attribute}'")]
    #[diagnostic(code(dartidl::database::duplicate_accessor))]
    DuplicateAccessor {
        interface: String,
        attribute: String,
        accessor: &'static str,
    },

    // =========================================================================
    // Type Errors
    // =========================================================================
    #[error("Unresolved type references: {}", names.join(", "))]
    #[diagnostic(
        code(dartidl::types::unresolved),
        help("Add the types to the database or run without --strict-types to fall back to dynamic")
    )]
    UnresolvedTypes {
        names: Vec<String>,
    },

    // =========================================================================
    // Operation Errors
    // =========================================================================
    #[error("Duplicate operations: {interface}.{operation} has two overloads with the same signature")]
    #[diagnostic(
        code(dartidl::operation::duplicate_overload),
        help("Overloads must differ in argument types at some position")
    )]
    DuplicateOverload {
        interface: String,
        operation: String,
    },

    #[error("Cannot dispatch {interface}.{operation}: no overloads")]
    #[diagnostic(code(dartidl::operation::empty_overload_set))]
    EmptyOverloadSet {
        interface: String,
        operation: String,
    },

    #[error("Overloads of {interface}.{operation} disagree on return type: {}", types.join(", "))]
    #[diagnostic(
        code(dartidl::operation::divergent_return_types),
        help("All overloads in one set must return the same type")
    )]
    DivergentReturnTypes {
        interface: String,
        operation: String,
        types: Vec<String>,
    },

    #[error("Optional parameter precedes required parameter '{parameter}' in {interface}.{operation}")]
    #[diagnostic(code(dartidl::operation::optional_before_required))]
    OptionalBeforeRequired {
        interface: String,
        operation: String,
        parameter: String,
    },

    // =========================================================================
    // Template Errors
    // =========================================================================
    #[error("Missing template: {name}")]
    #[diagnostic(
        code(dartidl::template::missing),
        help("Templates are looked up in the configured template directories, then the built-in set")
    )]
    MissingTemplate {
        name: String,
        searched: Vec<PathBuf>,
    },

    #[error("Template '{template}' references unknown variable '{variable}'")]
    #[diagnostic(code(dartidl::template::unknown_variable))]
    TemplateVariable {
        template: String,
        variable: String,
    },

    // =========================================================================
    // Output Errors
    // =========================================================================
    #[error("Output file written twice: {path}")]
    #[diagnostic(code(dartidl::output::duplicate))]
    DuplicateOutput {
        path: String,
    },
}

impl GeneratorError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::IoError {
            path: path.into(),
            message: message.into(),
        }
    }
}
