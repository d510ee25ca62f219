//! Group nodes: name-keyed collections sharing one item schema

use super::structure::FieldKind;
use super::{Bound, Node, NodeKind, Scope};
use crate::document::{DocKind, Document};
use crate::error::Violation;

/// Map of arbitrary names to items of one schema
pub struct GroupNode {
    item: Box<dyn Node>,
}

impl GroupNode {
    pub fn new(item: impl Node + 'static) -> Self {
        Self { item: Box::new(item) }
    }

    pub(crate) fn from_boxed(item: Box<dyn Node>) -> Self {
        Self { item }
    }
}

impl Node for GroupNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Group
    }

    fn apply(&self, slice: &dyn Document, scope: &Scope) -> Result<Bound, Vec<Violation>> {
        let path = scope.path();
        if slice.kind() != DocKind::Map {
            return Err(vec![Violation::type_mismatch(path, slice.kind(), "object")]);
        }

        let mut violations = Vec::new();
        let mut items = Vec::new();
        for (name, value) in slice.members() {
            let item_scope = scope.child(&name, std::slice::from_ref(&name));
            match self.item.apply(value, &item_scope) {
                Ok(bound) => items.push((name, bound)),
                Err(found) => violations.extend(found),
            }
        }

        if violations.is_empty() {
            Ok(Bound::Group(BoundGroup { path: path.to_string(), items }))
        } else {
            Err(violations)
        }
    }
}

/// A group that bound successfully
#[derive(Debug, Clone, PartialEq)]
pub struct BoundGroup {
    path: String,
    items: Vec<(String, Bound)>,
}

impl BoundGroup {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<&Bound> {
        self.items.iter().find(|(n, _)| n == name).map(|(_, b)| b)
    }

    /// Typed item lookup, e.g. `group.get_as::<BoundStruct>("primary")`
    pub fn get_as<T: FieldKind>(&self, name: &str) -> Option<&T> {
        self.get(name).and_then(T::project)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bound)> {
        self.items.iter().map(|(n, b)| (n.as_str(), b))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.items
                .iter()
                .map(|(n, b)| (n.clone(), b.to_json()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{BoundStruct, ScalarNode, StructSchema};
    use serde_json::json;

    fn apply_at(node: &dyn Node, doc: &serde_json::Value, path: &str) -> Result<Bound, Vec<Violation>> {
        node.apply(doc, &Scope::root(doc).child(path, &[]))
    }

    fn server() -> StructSchema {
        let mut schema = StructSchema::new();
        schema.string("host", true);
        schema.integer_or("port", 9092);
        schema
    }

    #[test]
    fn test_group_binds_every_member() {
        let group = GroupNode::new(server());
        let doc = json!({ "a": { "host": "h1" }, "b": { "host": "h2", "port": 1 } });
        let bound = apply_at(&group, &doc, "servers").unwrap();
        let bound = bound.as_group().unwrap();

        assert_eq!(bound.names().collect::<Vec<_>>(), vec!["a", "b"]);
        let b = bound.get_as::<BoundStruct>("b").unwrap();
        assert_eq!(b.path(), "servers.b");
        assert_eq!(b.document(), &json!({ "host": "h2", "port": 1 }));
    }

    #[test]
    fn test_member_documents_resolve_awkward_names() {
        let group = GroupNode::new(server());
        let doc = json!({ "eu/west": { "host": "h1" }, "a~b": { "host": "h2" }, "x.y": { "host": "h3" } });
        let bound = apply_at(&group, &doc, "servers").unwrap();
        let bound = bound.as_group().unwrap();
        for (name, host) in [("eu/west", "h1"), ("a~b", "h2"), ("x.y", "h3")] {
            let item = bound.get_as::<BoundStruct>(name).unwrap();
            assert_eq!(item.document()["host"], json!(host));
        }
    }

    #[test]
    fn test_group_accumulates_per_member() {
        let group = GroupNode::new(server());
        let doc = json!({ "a": {}, "b": { "host": "h" }, "c": { "hots": "h" } });
        let messages: Vec<String> = apply_at(&group, &doc, "servers")
            .unwrap_err()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            messages,
            vec![
                "servers.a.host is required in servers.a",
                "servers.c.host is required in servers.c",
                "hots is not a known property of servers.c",
            ]
        );
    }

    #[test]
    fn test_group_of_scalars() {
        let group = GroupNode::new(ScalarNode::<i64>::new());
        let bound = apply_at(&group, &json!({ "x": 1, "y": 2 }), "limits").unwrap();
        assert_eq!(bound.as_group().unwrap().get_as::<i64>("y"), Some(&2));

        let err = apply_at(&group, &json!({ "x": "one" }), "limits").unwrap_err();
        assert_eq!(err[0].path(), "limits.x");
    }

    #[test]
    fn test_group_requires_a_map() {
        let group = GroupNode::new(server());
        let err = apply_at(&group, &json!(["a"]), "servers").unwrap_err();
        assert_eq!(err[0].to_string(), "servers has type list rather than object");
    }
}
