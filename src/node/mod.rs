//! Schema nodes and the `apply` protocol
//!
//! Every node kind (scalar, struct, group, list) implements [`Node`]. A node
//! is purely descriptive: applying it to a document slice never mutates the
//! node, it returns a fresh [`Bound`] value or the complete list of
//! violations found in that slice.

pub mod group;
pub mod list;
pub mod scalar;
pub mod structure;

use std::sync::Arc;

use crate::document::{join_path, Document};
use crate::error::Violation;

pub use group::{BoundGroup, GroupNode};
pub use list::{BoundList, ListNode};
pub use scalar::{ClassRef, ClassRegistry, ScalarNode, ScalarType, ScalarValue};
pub use structure::{BoundStruct, Field, FieldKind, Options, StructSchema};

/// Kind of a schema node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Scalar,
    Struct,
    Group,
    List,
}

impl NodeKind {
    /// Nested kinds own whole subtrees, so `key.*` entries belong to them
    pub fn is_nested(self) -> bool {
        !matches!(self, NodeKind::Scalar)
    }
}

/// The binding contract shared by every node kind
pub trait Node: Send + Sync {
    fn kind(&self) -> NodeKind;

    /// Bind this node against the slice found at `scope`
    fn apply(&self, slice: &dyn Document, scope: &Scope) -> Result<Bound, Vec<Violation>>;

    /// Bind against the parent's own slice. The parent scans for unknown
    /// keys, so an inline node must not.
    fn apply_inline(&self, slice: &dyn Document, scope: &Scope) -> Result<Bound, Vec<Violation>> {
        self.apply(slice, scope)
    }

    /// Value used when the parent slice has no entry for this node
    fn fallback(&self) -> Option<Bound> {
        None
    }

    /// Whether the parent-slice entry reached through `keys` is claimed by
    /// this node when it is registered inline (under an empty key)
    fn accepts(&self, _slice: &dyn Document, _keys: &[String]) -> bool {
        false
    }

    /// Declared property paths below `prefix`, used for suggestions
    fn property_paths(&self, _prefix: &str, _out: &mut Vec<String>) {}
}

/// Where a slice sits in the document being bound.
///
/// Carries the dotted path used in messages and a JSON pointer into one
/// snapshot of the whole document, shared by every struct bound from it.
#[derive(Clone, PartialEq)]
pub struct Scope {
    path: String,
    pointer: String,
    snapshot: Arc<serde_json::Value>,
}

impl Scope {
    /// Scope of a whole document
    pub fn root(document: &dyn Document) -> Self {
        Self {
            path: String::new(),
            pointer: String::new(),
            snapshot: Arc::new(document.to_json()),
        }
    }

    /// Dotted path for messages
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Child reported as `name` and reached by walking the member `keys`
    pub fn child(&self, name: &str, keys: &[String]) -> Self {
        let mut pointer = self.pointer.clone();
        for key in keys {
            pointer.push('/');
            pointer.push_str(&key.replace('~', "~0").replace('/', "~1"));
        }
        Self {
            path: join_path(&self.path, name),
            pointer,
            snapshot: Arc::clone(&self.snapshot),
        }
    }

    /// The slice this scope points at, taken from the shared snapshot
    pub fn document(&self) -> &serde_json::Value {
        static NULL: serde_json::Value = serde_json::Value::Null;
        self.snapshot.pointer(&self.pointer).unwrap_or(&NULL)
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("path", &self.path)
            .field("pointer", &self.pointer)
            .finish()
    }
}

/// Result of a successful bind
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    Scalar(ScalarValue),
    Struct(BoundStruct),
    Group(BoundGroup),
    List(BoundList),
}

impl Bound {
    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match self {
            Bound::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&BoundStruct> {
        match self {
            Bound::Struct(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&BoundGroup> {
        match self {
            Bound::Group(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&BoundList> {
        match self {
            Bound::List(value) => Some(value),
            _ => None,
        }
    }

    /// Typed view of this value
    pub fn get<T: FieldKind>(&self) -> Option<&T> {
        T::project(self)
    }

    /// Render the bound tree as JSON (defaults included, inline structs merged)
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Bound::Scalar(value) => value.to_json(),
            Bound::Struct(value) => value.to_json(),
            Bound::Group(value) => value.to_json(),
            Bound::List(value) => value.to_json(),
        }
    }
}
