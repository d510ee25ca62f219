//! Error types for schema binding

use std::fmt;

use thiserror::Error;

/// Result type for crate operations
pub type Result<T> = std::result::Result<T, ConfigSchemaError>;

/// Crate-level errors
#[derive(Error, Debug)]
pub enum ConfigSchemaError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid schema descriptor: {0}")]
    Descriptor(String),

    #[error("Unknown schema: {0}")]
    UnknownSchema(String),

    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("{path} is not defined")]
    Undefined { path: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

/// A single problem found while binding a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// The document handed to the root bind was absent
    NullDocument { path: String },

    /// A required child was never bound
    MissingRequired { path: String, parent: String },

    /// A document key matched no declared property or extension
    UnknownProperty { key: String, parent: String },

    /// A value has the wrong shape for the declared type
    TypeMismatch { path: String, found: String, expected: String },

    /// A value has the right shape but its parser rejected it; `reason` is
    /// the parser's message, unmodified
    InvalidValue { path: String, reason: String },
}

impl Violation {
    pub(crate) fn type_mismatch(path: &str, found: impl fmt::Display, expected: &str) -> Self {
        Violation::TypeMismatch {
            path: path.to_string(),
            found: found.to_string(),
            expected: expected.to_string(),
        }
    }

    pub(crate) fn invalid_value(path: &str, reason: impl fmt::Display) -> Self {
        Violation::InvalidValue {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    /// The parser's own message for a rejected value
    pub fn reason(&self) -> Option<&str> {
        match self {
            Violation::InvalidValue { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// Dotted path of the offending node (the key itself for unknown properties)
    pub fn path(&self) -> String {
        match self {
            Violation::NullDocument { path }
            | Violation::MissingRequired { path, .. }
            | Violation::TypeMismatch { path, .. }
            | Violation::InvalidValue { path, .. } => path.clone(),
            Violation::UnknownProperty { key, parent } => crate::document::join_path(parent, key),
        }
    }
}

fn subject(path: &str) -> &str {
    if path.is_empty() {
        "document"
    } else {
        path
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::NullDocument { path } => write!(f, "null config passed ({})", path),
            Violation::MissingRequired { path, parent } if parent.is_empty() => {
                write!(f, "{} is required", path)
            }
            Violation::MissingRequired { path, parent } => {
                write!(f, "{} is required in {}", path, parent)
            }
            Violation::UnknownProperty { key, parent } if parent.is_empty() => {
                write!(f, "{} is not a known property", key)
            }
            Violation::UnknownProperty { key, parent } => {
                write!(f, "{} is not a known property of {}", key, parent)
            }
            Violation::TypeMismatch { path, found, expected } => {
                write!(f, "{} has type {} rather than {}", subject(path), found, expected)
            }
            Violation::InvalidValue { path, reason } => write!(f, "{}: {}", subject(path), reason),
        }
    }
}

/// Every violation found in one bind, in discovery order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    violations: Vec<Violation>,
}

impl ValidationError {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", violation)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
