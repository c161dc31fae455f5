//! Error types for deadletter using snafu.
//!
//! This module defines structured error types with context selectors for
//! all error conditions in the codebase.

use snafu::prelude::*;
use std::path::PathBuf;

/// Boxed error returned by the remote transport (AWS SDK).
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

// ============ Config Errors ============

/// Errors that can occur while loading the service configuration.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file {}", path.display()))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// File extension is not YAML.
    #[snafu(display("Unsupported configuration format: {} (expected .yml or .yaml)", path.display()))]
    UnsupportedFormat { path: PathBuf },

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML configuration"))]
    YamlParse { source: serde_yaml::Error },
}

// ============ Provider Errors ============

/// Errors raised by the remote infrastructure control API.
///
/// These are propagated verbatim through [`DeadLetterError::Provider`]; they
/// are never retried here.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// UpdateFunctionConfiguration failed.
    #[snafu(display("Failed to update dead-letter config of function '{function_name}'"))]
    UpdateFunction {
        function_name: String,
        source: TransportError,
    },

    /// DescribeStackResource failed.
    #[snafu(display("Failed to describe resource '{logical_id}' in stack '{stack_name}'"))]
    DescribeResource {
        stack_name: String,
        logical_id: String,
        source: TransportError,
    },

    /// The describe call succeeded but carried no resource detail.
    #[snafu(display("Stack '{stack_name}' returned no detail for resource '{logical_id}'"))]
    ResourceNotDescribed {
        stack_name: String,
        logical_id: String,
    },

    /// Remote calls are disabled for this command.
    #[snafu(display("Cannot {operation}: infrastructure queries are disabled"))]
    Offline { operation: &'static str },

    /// A queue physical id did not have the documented URL shape.
    #[snafu(display("Malformed queue URL '{url}'"))]
    MalformedQueueUrl { url: String },
}

// ============ Dead Letter Errors ============

/// Errors raised while resolving or compiling a function's dead-letter target.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DeadLetterError {
    /// None of sqs/sns/targetArn is declared.
    #[snafu(display("Function property {function}.deadLetter is missing one of: sqs/sns/targetArn"))]
    MissingTarget { function: String },

    /// More than one of sqs/sns/targetArn is declared.
    #[snafu(display(
        "Function property {function}.deadLetter: only one of: sqs/sns/targetArn allowed"
    ))]
    AmbiguousTarget { function: String },

    /// The deadLetter block itself is not a mapping.
    #[snafu(display("Function property {function}.deadLetter must be an object, found {kind}"))]
    InvalidDeclaration { function: String, kind: String },

    /// targetArn is neither null, a string nor an object.
    #[snafu(display(
        "Function property {function}.deadLetter.targetArn is an unexpected type ({kind}); must be object or string"
    ))]
    UnexpectedTargetType { function: String, kind: String },

    /// targetArn string is not a valid queue or topic ARN.
    #[snafu(display(
        "Function property {function}.deadLetter.targetArn = '{value}'. This is not a valid sns or sqs arn"
    ))]
    InvalidArn { function: String, value: String },

    /// targetArn object lacks the logical id field.
    #[snafu(display(
        "Function property {function}.deadLetter.targetArn object is missing GetResourceArn property"
    ))]
    MissingLogicalId { function: String },

    /// sqs/sns value has the wrong type.
    #[snafu(display(
        "Function property {function}.deadLetter.{field} is an unexpected type ({kind}); must be {expected}"
    ))]
    InvalidResourceConfig {
        function: String,
        field: &'static str,
        kind: String,
        expected: &'static str,
    },

    /// sqs/sns resolved to an empty resource name.
    #[snafu(display("Function property {function}.deadLetter.{field} name must not be empty"))]
    EmptyResourceName {
        function: String,
        field: &'static str,
    },

    /// alarm is enabled but has no alertingTopic.
    #[snafu(display("Must define {function}.deadLetter.alarm.alertingTopic"))]
    MissingAlertingTopic { function: String },

    /// alarm block has the wrong shape.
    #[snafu(display("Function property {function}.deadLetter.{field} {message}"))]
    InvalidAlarm {
        function: String,
        field: &'static str,
        message: String,
    },

    /// The function is not known to the registry.
    #[snafu(display("Function '{function}' is not defined in the service"))]
    UnknownFunction { function: String },

    /// The referenced stack resource is neither a queue nor a topic.
    #[snafu(display(
        "Function property {function}.deadLetter resolved '{logical_id}' to a resource of type {resource_type}; it must be a queue or topic"
    ))]
    UnsupportedResource {
        function: String,
        logical_id: String,
        resource_type: String,
    },

    /// Remote control API failure.
    #[snafu(transparent)]
    Provider { source: ProviderError },
}

impl DeadLetterError {
    /// True for errors caused by an invalid declaration rather than remote state.
    pub fn is_configuration_error(&self) -> bool {
        !matches!(
            self,
            DeadLetterError::UnsupportedResource { .. } | DeadLetterError::Provider { .. }
        )
    }
}

// ============ Template Errors ============

/// Errors that can occur while reading or writing the compiled template.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TemplateError {
    /// Failed to read template file.
    #[snafu(display("Failed to read template {}", path.display()))]
    ReadTemplate {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Template is not valid JSON.
    #[snafu(display("Failed to parse template {}", path.display()))]
    ParseTemplate {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Failed to serialize template.
    #[snafu(display("Failed to serialize template"))]
    SerializeTemplate { source: serde_json::Error },

    /// Failed to write template file.
    #[snafu(display("Failed to write template {}", path.display()))]
    WriteTemplate {
        path: PathBuf,
        source: std::io::Error,
    },
}

// ============ App Error (top-level) ============

/// Top-level errors that aggregate all error types.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum AppError {
    /// Configuration error.
    #[snafu(display("Configuration error"))]
    Config { source: ConfigError },

    /// Dead-letter resolution or compilation failed.
    #[snafu(display("Dead-letter processing failed"))]
    DeadLetter { source: DeadLetterError },

    /// Template error.
    #[snafu(display("Template error"))]
    Template { source: TemplateError },

    /// Shutdown signal received before the pipeline settled.
    #[snafu(display("Interrupted by shutdown signal"))]
    Interrupted,
}
