//! Diagnostics raised while reading and querying pipeline options.
//!
//! Fatal conditions are [`ConfigError`] and abort the whole parse. Unknown and
//! duplicate parameters are [`ConfigWarning`]s: reported, then skipped.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::schema::TypeTag;

/// Fatal parse failures. No partial store is returned alongside these.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read parameter file '{path}': {source}")]
    FileUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "Failed to read parameter on line {line_number}: {line}\nExpected format: module.parameter = value"
    )]
    MalformedLine { line_number: usize, line: String },

    #[error(
        "Failed to parse parameter value on line {line_number}: {line}\nExpected data type: {expected} ({reason})"
    )]
    InvalidValue {
        line_number: usize,
        line: String,
        expected: TypeTag,
        reason: String,
    },
}

/// Recoverable anomalies. The responsible line is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    UnknownParameter {
        line_number: usize,
        module: String,
        parameter: String,
        value: String,
    },
    DuplicateParameter {
        line_number: usize,
        module: String,
        parameter: String,
    },
}

impl ConfigWarning {
    pub fn line_number(&self) -> usize {
        match self {
            ConfigWarning::UnknownParameter { line_number, .. }
            | ConfigWarning::DuplicateParameter { line_number, .. } => *line_number,
        }
    }
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::UnknownParameter {
                line_number,
                module,
                parameter,
                value,
            } => write!(
                f,
                "Ignoring unknown parameter on line {line_number}: {module}.{parameter} = {value}"
            ),
            ConfigWarning::DuplicateParameter {
                line_number,
                module,
                parameter,
            } => write!(
                f,
                "Multiple definitions of parameter {module}.{parameter} encountered (line {line_number}); ignoring all additional definitions"
            ),
        }
    }
}

/// A step asked for an option that is missing or has another type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("Missing required parameter {module}.{parameter}")]
    Missing { module: String, parameter: String },

    #[error("Parameter {module}.{parameter} has type {found}, expected {expected}")]
    WrongType {
        module: String,
        parameter: String,
        expected: TypeTag,
        found: TypeTag,
    },
}
