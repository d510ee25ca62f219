//! Struct nodes: ordered records of named child nodes
//!
//! A [`StructSchema`] is declared once by registering children; every
//! registration returns a typed [`Field`] handle that reads the child back
//! out of a [`BoundStruct`] after a successful bind.
//!
//! ## Unknown keys
//!
//! Unless the schema was built with [`Options::IgnoreUnknown`], every
//! flattened entry of the bound slice must be claimed by something:
//! - the value a declared scalar child was bound to
//! - anything below the value a struct, group or list child was bound to
//! - an extension, exactly or as `extension.*`
//! - an entry accepted by an inline struct child
//!
//! Entries are walked member by member, so a literal `"db.extra"` key is not
//! mistaken for `extra` inside a `db` child.
//!
//! Extensions are seeded from an inherited base schema (its declared keys
//! and its own extensions) and from [`StructSchema::extend`].

use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::path::PathBuf;

use tracing::trace;
use url::Url;

use super::group::{BoundGroup, GroupNode};
use super::list::{BoundList, ListNode};
use super::scalar::{ClassRef, ClassRegistry, ScalarNode, ScalarType};
use super::{Bound, Node, NodeKind, Scope};
use crate::document::{join_path, same_value, DocKind, Document};
use crate::error::{ConfigSchemaError, Result, Violation};

/// Unknown-key policy of a struct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Options {
    /// Reject keys that nothing declares
    #[default]
    Strict,
    /// Skip the unknown-key scan
    IgnoreUnknown,
}

struct Property {
    key: String,
    node: Box<dyn Node>,
    required: bool,
}

/// Declared shape of a configuration record
#[derive(Default)]
pub struct StructSchema {
    properties: Vec<Property>,
    options: Options,
    extensions: BTreeSet<String>,
}

/// Typed handle to a registered child
pub struct Field<T> {
    index: usize,
    key: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Field<T> {
    fn new(index: usize, key: &str) -> Self {
        Self { index, key: key.to_string(), _marker: PhantomData }
    }

    /// Key the child was registered under (empty for inline structs)
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        Self::new(self.index, &self.key)
    }
}

impl<T> std::fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field").field("index", &self.index).field("key", &self.key).finish()
    }
}

/// Types a [`Field`] can resolve to inside a bound tree
pub trait FieldKind {
    fn project(bound: &Bound) -> Option<&Self>;
}

impl FieldKind for BoundStruct {
    fn project(bound: &Bound) -> Option<&Self> {
        bound.as_struct()
    }
}

impl FieldKind for BoundGroup {
    fn project(bound: &Bound) -> Option<&Self> {
        bound.as_group()
    }
}

impl FieldKind for BoundList {
    fn project(bound: &Bound) -> Option<&Self> {
        bound.as_list()
    }
}

impl StructSchema {
    /// Strict schema with no children
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: Options) -> Self {
        Self { options, ..Self::default() }
    }

    /// Schema that also accepts everything `base` declares or allows
    pub fn inheriting(base: &StructSchema, options: Options) -> Self {
        let mut schema = Self::with_options(options);
        schema.extensions.extend(base.keys().map(str::to_string));
        schema.extensions.extend(base.extensions.iter().cloned());
        schema
    }

    pub fn options(&self) -> Options {
        self.options
    }

    pub fn set_options(&mut self, options: Options) {
        self.options = options;
    }

    /// Allow `prefix` and everything below it
    pub fn extend(&mut self, prefix: impl Into<String>) -> &mut Self {
        self.extensions.insert(prefix.into());
        self
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    /// Declared keys in declaration order, inline children excluded
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties
            .iter()
            .map(|p| p.key.as_str())
            .filter(|k| !k.is_empty())
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Register an arbitrary node. Registering a non-empty key twice panics.
    pub(crate) fn push(&mut self, key: &str, node: Box<dyn Node>, required: bool) -> usize {
        assert!(
            key.is_empty() || !self.properties.iter().any(|p| p.key == key),
            "property '{}' registered twice",
            key
        );
        self.properties.push(Property { key: key.to_string(), node, required });
        self.properties.len() - 1
    }

    pub(crate) fn contains_key(&self, key: &str) -> bool {
        !key.is_empty() && self.properties.iter().any(|p| p.key == key)
    }

    fn add<T, N: Node + 'static>(&mut self, key: &str, node: N, required: bool) -> Field<T> {
        let index = self.push(key, Box::new(node), required);
        Field::new(index, key)
    }

    pub fn scalar<V: ScalarType + FieldKind>(
        &mut self,
        key: &str,
        node: ScalarNode<V>,
        required: bool,
    ) -> Field<V> {
        self.add(key, node, required)
    }

    pub fn string(&mut self, key: &str, required: bool) -> Field<String> {
        self.scalar(key, ScalarNode::new(), required)
    }

    pub fn string_or(&mut self, key: &str, default: impl Into<String>) -> Field<String> {
        self.scalar(key, ScalarNode::new().with_default(default.into()), true)
    }

    pub fn integer(&mut self, key: &str, required: bool) -> Field<i32> {
        self.scalar(key, ScalarNode::new(), required)
    }

    pub fn integer_or(&mut self, key: &str, default: i32) -> Field<i32> {
        self.scalar(key, ScalarNode::new().with_default(default), true)
    }

    pub fn longint(&mut self, key: &str, required: bool) -> Field<i64> {
        self.scalar(key, ScalarNode::new(), required)
    }

    pub fn longint_or(&mut self, key: &str, default: i64) -> Field<i64> {
        self.scalar(key, ScalarNode::new().with_default(default), true)
    }

    pub fn boolean(&mut self, key: &str, required: bool) -> Field<bool> {
        self.scalar(key, ScalarNode::new(), required)
    }

    pub fn boolean_or(&mut self, key: &str, default: bool) -> Field<bool> {
        self.scalar(key, ScalarNode::new().with_default(default), true)
    }

    pub fn url(&mut self, key: &str, required: bool) -> Field<Url> {
        self.scalar(key, ScalarNode::new(), required)
    }

    pub fn url_or(&mut self, key: &str, default: Url) -> Field<Url> {
        self.scalar(key, ScalarNode::new().with_default(default), true)
    }

    pub fn filepath(&mut self, key: &str, required: bool) -> Field<PathBuf> {
        self.scalar(key, ScalarNode::new(), required)
    }

    pub fn filepath_or(&mut self, key: &str, default: impl Into<PathBuf>) -> Field<PathBuf> {
        self.scalar(key, ScalarNode::new().with_default(default.into()), true)
    }

    pub fn class(&mut self, key: &str, registry: &ClassRegistry, required: bool) -> Field<ClassRef> {
        self.scalar(key, registry.node(), required)
    }

    pub fn class_or(&mut self, key: &str, registry: &ClassRegistry, default: ClassRef) -> Field<ClassRef> {
        self.scalar(key, registry.node().with_default(default), true)
    }

    /// Nested record under `key`
    pub fn structure(&mut self, key: &str, schema: StructSchema, required: bool) -> Field<BoundStruct> {
        self.add(key, schema, required)
    }

    /// Record bound against this struct's own slice
    pub fn inline(&mut self, schema: StructSchema, required: bool) -> Field<BoundStruct> {
        self.add("", schema, required)
    }

    pub fn group(&mut self, key: &str, group: GroupNode, required: bool) -> Field<BoundGroup> {
        self.add(key, group, required)
    }

    pub fn list(&mut self, key: &str, list: ListNode, required: bool) -> Field<BoundList> {
        self.add(key, list, required)
    }

    /// Bind this schema against a map slice located at `scope`
    pub(crate) fn bind_slice(
        &self,
        slice: &dyn Document,
        scope: &Scope,
    ) -> std::result::Result<BoundStruct, Vec<Violation>> {
        self.bind_with(slice, scope, self.options == Options::Strict)
    }

    fn bind_with(
        &self,
        slice: &dyn Document,
        scope: &Scope,
        scan_unknown: bool,
    ) -> std::result::Result<BoundStruct, Vec<Violation>> {
        let path = scope.path();
        if slice.kind() != DocKind::Map {
            return Err(vec![Violation::type_mismatch(path, slice.kind(), "object")]);
        }

        let mut violations = Vec::new();
        let mut values = Vec::with_capacity(self.properties.len());

        for property in &self.properties {
            let outcome = if property.key.is_empty() {
                Some(property.node.apply_inline(slice, scope))
            } else {
                slice.locate(&property.key).map(|(keys, doc)| {
                    property.node.apply(doc, &scope.child(&property.key, &keys))
                })
            };

            let bound = match outcome {
                Some(Ok(bound)) => Some(bound),
                Some(Err(found)) => {
                    violations.extend(found);
                    values.push((property.key.clone(), None));
                    continue;
                }
                None => property.node.fallback(),
            };

            if property.required && bound.is_none() {
                violations.push(Violation::MissingRequired {
                    path: join_path(path, &property.key),
                    parent: path.to_string(),
                });
            }
            values.push((property.key.clone(), bound));
        }

        if scan_unknown {
            for (keys, _) in slice.entries() {
                if !self.claims(slice, &keys) {
                    violations.push(Violation::UnknownProperty {
                        key: keys.join("."),
                        parent: path.to_string(),
                    });
                }
            }
        }

        trace!(path, violations = violations.len(), "struct scanned");

        if violations.is_empty() {
            Ok(BoundStruct { scope: scope.clone(), values })
        } else {
            Err(violations)
        }
    }

    /// Whether the entry of `slice` reached through `keys` is bound or
    /// allowed by this struct. A declared child claims an entry only when
    /// walking the entry passes through the value the child was bound to.
    fn claims(&self, slice: &dyn Document, keys: &[String]) -> bool {
        let trail = slice.trail(keys);
        let declared = self.properties.iter().any(|p| {
            if p.key.is_empty() {
                return p.node.accepts(slice, keys);
            }
            let Some(bound) = slice.get_path(&p.key) else {
                return false;
            };
            if p.node.kind().is_nested() {
                trail.iter().any(|step| same_value(*step, bound))
            } else {
                trail.len() == keys.len()
                    && trail.last().is_some_and(|leaf| same_value(*leaf, bound))
            }
        });
        if declared {
            return true;
        }
        let key = keys.join(".");
        self.extensions.iter().any(|e| *e == key || is_below(&key, e))
    }

    /// Declared property paths, nested structs included
    pub fn property_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        Node::property_paths(self, "", &mut out);
        out
    }
}

/// `key` lies strictly below `prefix` in dotted notation
fn is_below(key: &str, prefix: &str) -> bool {
    key.len() > prefix.len() && key.starts_with(prefix) && key.as_bytes()[prefix.len()] == b'.'
}

impl Node for StructSchema {
    fn kind(&self) -> NodeKind {
        NodeKind::Struct
    }

    fn apply(&self, slice: &dyn Document, scope: &Scope) -> std::result::Result<Bound, Vec<Violation>> {
        self.bind_slice(slice, scope).map(Bound::Struct)
    }

    fn apply_inline(&self, slice: &dyn Document, scope: &Scope) -> std::result::Result<Bound, Vec<Violation>> {
        self.bind_with(slice, scope, false).map(Bound::Struct)
    }

    fn accepts(&self, slice: &dyn Document, keys: &[String]) -> bool {
        self.options == Options::IgnoreUnknown || self.claims(slice, keys)
    }

    fn property_paths(&self, prefix: &str, out: &mut Vec<String>) {
        for property in &self.properties {
            let path = join_path(prefix, &property.key);
            if !property.key.is_empty() {
                out.push(path.clone());
            }
            property.node.property_paths(&path, out);
        }
    }
}

/// A struct that bound successfully
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStruct {
    scope: Scope,
    values: Vec<(String, Option<Bound>)>,
}

impl BoundStruct {
    /// Dotted location of this struct in the bound document
    pub fn path(&self) -> &str {
        self.scope.path()
    }

    /// The slice this struct was bound against
    pub fn document(&self) -> &serde_json::Value {
        self.scope.document()
    }

    /// Value of a child, `None` when it is optional and absent
    pub fn get<T: FieldKind>(&self, field: &Field<T>) -> Option<&T> {
        let (key, value) = self.values.get(field.index)?;
        if *key != field.key {
            return None;
        }
        value.as_ref().and_then(T::project)
    }

    /// Value of a child, erroring when it is not defined
    pub fn value<T: FieldKind>(&self, field: &Field<T>) -> Result<&T> {
        self.get(field).ok_or_else(|| ConfigSchemaError::Undefined {
            path: join_path(self.path(), &field.key),
        })
    }

    pub fn is_defined<T: FieldKind>(&self, field: &Field<T>) -> bool {
        self.get(field).is_some()
    }

    /// Untyped lookup by key (inline children are not addressable)
    pub fn lookup(&self, key: &str) -> Option<&Bound> {
        if key.is_empty() {
            return None;
        }
        self.values
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_ref())
    }

    /// Defined children in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bound)> {
        self.values
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k.as_str(), v)))
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (key, value) in self.iter() {
            match (key.is_empty(), value.to_json()) {
                (true, serde_json::Value::Object(inner)) => map.extend(inner),
                (_, json) => {
                    map.insert(key.to_string(), json);
                }
            }
        }
        serde_json::Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn messages(schema: &StructSchema, doc: serde_json::Value) -> Vec<String> {
        match schema.bind(&doc) {
            Ok(_) => Vec::new(),
            Err(err) => err.violations().iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_required_and_defaults() {
        let mut schema = StructSchema::new();
        let name = schema.string("name", true);
        let port = schema.integer_or("port", 8080);
        let debug = schema.boolean("debug", false);

        let bound = schema.bind(&json!({ "name": "svc" })).unwrap();
        assert_eq!(bound.get(&name).map(String::as_str), Some("svc"));
        assert_eq!(bound.get(&port), Some(&8080));
        assert_eq!(bound.get(&debug), None);
        assert!(bound.value(&debug).is_err());
    }

    #[test]
    fn test_missing_required_at_root() {
        let mut schema = StructSchema::new();
        schema.string("name", true);
        assert_eq!(messages(&schema, json!({})), vec!["name is required"]);
    }

    #[test]
    fn test_nested_messages_are_path_qualified() {
        let mut db = StructSchema::new();
        db.url("url", true);
        let mut schema = StructSchema::new();
        schema.structure("db", db, true);

        assert_eq!(
            messages(&schema, json!({ "db": { "pool": 3 } })),
            vec!["db.url is required in db", "pool is not a known property of db"]
        );
    }

    #[test]
    fn test_nested_keys_are_claimed_by_their_struct() {
        let mut db = StructSchema::with_options(Options::IgnoreUnknown);
        db.string("url", false);
        let mut schema = StructSchema::new();
        schema.structure("db", db, false);
        schema.string("name", false);

        assert!(messages(&schema, json!({ "db": { "anything": 1 }, "name": "x" })).is_empty());
        // a scalar does not claim the keys below it
        assert_eq!(
            messages(&schema, json!({ "name": { "first": "x" } })),
            vec![
                "name has type object rather than string",
                "name.first is not a known property"
            ]
        );
    }

    #[test]
    fn test_extensions_match_exact_and_prefix() {
        let mut schema = StructSchema::new();
        schema.extend("plugins");
        assert!(messages(&schema, json!({ "plugins": 1 })).is_empty());
        assert!(messages(&schema, json!({ "plugins": { "a": { "b": 1 } } })).is_empty());
        assert_eq!(
            messages(&schema, json!({ "pluginsx": 1 })),
            vec!["pluginsx is not a known property"]
        );
    }

    #[test]
    fn test_inheriting_copies_keys_and_extensions() {
        let mut base = StructSchema::new();
        base.string("class", true);
        base.extend("extra");

        let mut derived = StructSchema::inheriting(&base, Options::Strict);
        derived.integer("threads", false);

        let doc = json!({ "class": "X", "extra": { "k": 1 }, "threads": 4 });
        assert!(messages(&derived, doc).is_empty());
        assert_eq!(derived.extensions().collect::<Vec<_>>(), vec!["class", "extra"]);
    }

    #[test]
    fn test_inline_struct_binds_parent_slice() {
        let mut common = StructSchema::new();
        let id = common.string("id", true);
        let mut schema = StructSchema::new();
        let inline = schema.inline(common, true);
        let size = schema.integer("size", true);

        let bound = schema.bind(&json!({ "id": "a", "size": 3 })).unwrap();
        assert_eq!(bound.get(&inline).and_then(|c| c.get(&id)).map(String::as_str), Some("a"));
        assert_eq!(bound.get(&size), Some(&3));
        assert_eq!(bound.to_json(), json!({ "id": "a", "size": 3 }));

        assert_eq!(
            messages(&schema, json!({ "size": 3 })),
            vec!["id is required"]
        );
    }

    #[test]
    fn test_non_map_slice_is_a_type_mismatch() {
        let mut inner = StructSchema::new();
        inner.string("a", false);
        let mut schema = StructSchema::new();
        schema.structure("inner", inner, true);
        assert_eq!(
            messages(&schema, json!({ "inner": "flat" })),
            vec!["inner has type string rather than object"]
        );
    }

    #[test]
    fn test_failed_child_is_not_also_reported_missing() {
        let mut schema = StructSchema::new();
        schema.integer("port", true);
        assert_eq!(
            messages(&schema, json!({ "port": "http" })),
            vec!["port: 'http' is not a number (invalid digit found in string)"]
        );
    }

    #[test]
    fn test_dotted_declared_key() {
        let mut schema = StructSchema::new();
        let url = schema.string("db.url", true);
        let bound = schema.bind(&json!({ "db": { "url": "x" } })).unwrap();
        assert_eq!(bound.get(&url).map(String::as_str), Some("x"));
    }

    #[test]
    fn test_literal_dotted_key_is_not_claimed_by_nested_child() {
        let mut db = StructSchema::new();
        db.string("url", true);
        let mut schema = StructSchema::new();
        schema.structure("db", db, true);

        assert_eq!(
            messages(&schema, json!({ "db": { "url": "u" }, "db.bogus": 1 })),
            vec!["db.bogus is not a known property"]
        );
    }

    #[test]
    fn test_declared_dotted_key_matches_literal_member() {
        let mut schema = StructSchema::new();
        let ab = schema.string("a.b", true);
        let bound = schema.bind(&json!({ "a.b": "x" })).unwrap();
        assert_eq!(bound.get(&ab).map(String::as_str), Some("x"));

        // the nested spelling is claimed only when it is the value that was bound
        assert_eq!(
            messages(&schema, json!({ "a.b": "x", "a": { "b": "y" } })),
            vec!["a.b is not a known property"]
        );
    }

    #[test]
    fn test_nested_documents_share_one_snapshot() {
        let mut db = StructSchema::with_options(Options::IgnoreUnknown);
        db.string("url", true);
        let mut schema = StructSchema::new();
        let db_field = schema.structure("db", db, true);

        let doc = json!({ "db": { "url": "u", "pool": 4 } });
        let bound = schema.bind(&doc).unwrap();
        assert_eq!(bound.document(), &doc);
        let nested = bound.get(&db_field).unwrap();
        assert_eq!(nested.document(), &json!({ "url": "u", "pool": 4 }));
        assert_eq!(nested.path(), "db");
    }

    #[test]
    fn test_field_from_other_schema_does_not_resolve() {
        let mut a = StructSchema::new();
        let a_name = a.string("name", false);
        let mut b = StructSchema::new();
        b.string("title", false);
        let bound = b.bind(&json!({ "title": "t" })).unwrap();
        assert!(bound.get(&a_name).is_none());
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn test_duplicate_key_panics() {
        let mut schema = StructSchema::new();
        schema.string("a", true);
        schema.integer("a", true);
    }

    #[test]
    fn test_property_paths() {
        let mut db = StructSchema::new();
        db.string("url", true);
        let mut schema = StructSchema::new();
        schema.string("name", true);
        schema.structure("db", db, true);
        assert_eq!(schema.property_paths(), vec!["name", "db", "db.url"]);
    }
}
