//! Root entry points
//!
//! Nodes report violations as plain vectors while they recurse; only here,
//! at the root, are they folded into a single [`ValidationError`].

use tracing::debug;

use crate::document::{DocKind, Document};
use crate::error::{Result, ValidationError, Violation};
use crate::node::{BoundStruct, Scope, StructSchema};

/// Bind a whole document against a root schema.
///
/// A missing document (`None`, or a `null` value) fails immediately.
pub fn bind(
    schema: &StructSchema,
    document: Option<&dyn Document>,
) -> std::result::Result<BoundStruct, ValidationError> {
    let Some(document) = document.filter(|d| d.kind() != DocKind::Null) else {
        debug!("bind rejected: no document");
        return Err(ValidationError::new(vec![Violation::NullDocument {
            path: String::new(),
        }]));
    };

    match schema.bind_slice(document, &Scope::root(document)) {
        Ok(bound) => {
            debug!(properties = schema.len(), "bind succeeded");
            Ok(bound)
        }
        Err(violations) => {
            debug!(violations = violations.len(), "bind failed");
            Err(ValidationError::new(violations))
        }
    }
}

/// Bind a schema against the slice an earlier bind captured, e.g. to read a
/// generic section again through a more specific schema
pub fn rebind(
    schema: &StructSchema,
    bound: &BoundStruct,
) -> std::result::Result<BoundStruct, ValidationError> {
    bind(schema, Some(bound.document()))
}

/// Parse JSON text and bind it
pub fn bind_json_str(schema: &StructSchema, text: &str) -> Result<BoundStruct> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    Ok(bind(schema, Some(&value))?)
}

/// Parse TOML text and bind it
pub fn bind_toml_str(schema: &StructSchema, text: &str) -> Result<BoundStruct> {
    let value: toml::Value = toml::from_str(text)?;
    Ok(bind(schema, Some(&value))?)
}

impl StructSchema {
    /// Bind a document against this schema as the root
    pub fn bind(&self, document: &dyn Document) -> std::result::Result<BoundStruct, ValidationError> {
        bind(self, Some(document))
    }
}
