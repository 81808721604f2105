//! Error codes and low-level error types.
//!
//! Resolution never fails with a single error: everything is collected into a
//! [`ProblemList`](crate::problem::ProblemList). The types here are the leaves
//! those problems are built from.

use serde::Serialize;
use std::path::PathBuf;

/// Stable codes for programmatic handling of problems.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProblemCode {
    // Construction problems (fatal, loading never starts)
    NonUniqueNames,
    DuplicateProperty,
    DuplicateLoader,
    InvalidName,
    InvalidDefaultValue,
    InvalidValidator,
    UnregisteredForcedValue,
    InitiationLoop,
    AlreadyInitialized,

    // Loader problems
    DuplicatePropertyLoader,
    UnknownProperty,
    ParseFailure,
    SourceNotFound,
    SourceError,

    // Value problems
    InvalidValue,

    // Requirement problems
    RequiredProperty,
    RequiredGroup,
}

/// A raw string could not be converted to a property's value type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("cannot parse '{raw}' as {value_type}: {reason}")]
pub struct ParseError {
    pub value_type: &'static str,
    pub raw: String,
    pub reason: String,
}

impl ParseError {
    pub fn new(value_type: &'static str, raw: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            value_type,
            raw: raw.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors raised while reading a property manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("property {property}: unsupported type '{value_type}'")]
    UnsupportedType { property: String, value_type: String },

    #[error("property {property}: {message}")]
    InvalidDeclaration { property: String, message: String },
}

impl ManifestError {
    pub fn invalid(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDeclaration {
            property: property.into(),
            message: message.into(),
        }
    }
}
