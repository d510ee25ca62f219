//! List nodes: position-indexed sequences sharing one item schema

use super::structure::FieldKind;
use super::{Bound, Node, NodeKind, Scope};
use crate::document::{DocKind, Document};
use crate::error::Violation;

/// Ordered sequence of items of one schema; item `i` lives at `<path>.<i>`
pub struct ListNode {
    item: Box<dyn Node>,
}

impl ListNode {
    pub fn new(item: impl Node + 'static) -> Self {
        Self { item: Box::new(item) }
    }

    pub(crate) fn from_boxed(item: Box<dyn Node>) -> Self {
        Self { item }
    }
}

impl Node for ListNode {
    fn kind(&self) -> NodeKind {
        NodeKind::List
    }

    fn apply(&self, slice: &dyn Document, scope: &Scope) -> Result<Bound, Vec<Violation>> {
        let path = scope.path();
        if slice.kind() != DocKind::List {
            return Err(vec![Violation::type_mismatch(path, slice.kind(), "list")]);
        }

        let mut violations = Vec::new();
        let mut items = Vec::new();
        for (index, element) in slice.elements().into_iter().enumerate() {
            let index = index.to_string();
            let item_scope = scope.child(&index, std::slice::from_ref(&index));
            match self.item.apply(element, &item_scope) {
                Ok(bound) => items.push(bound),
                Err(found) => violations.extend(found),
            }
        }

        if violations.is_empty() {
            Ok(Bound::List(BoundList { path: path.to_string(), items }))
        } else {
            Err(violations)
        }
    }
}

/// A list that bound successfully
#[derive(Debug, Clone, PartialEq)]
pub struct BoundList {
    path: String,
    items: Vec<Bound>,
}

impl BoundList {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn get(&self, index: usize) -> Option<&Bound> {
        self.items.get(index)
    }

    pub fn get_as<T: FieldKind>(&self, index: usize) -> Option<&T> {
        self.get(index).and_then(T::project)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bound> {
        self.items.iter()
    }

    /// Items projected to `T`; items of another kind are skipped
    pub fn iter_as<'a, T: FieldKind + 'a>(&'a self) -> impl Iterator<Item = &'a T> {
        self.items.iter().filter_map(T::project)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.items.iter().map(Bound::to_json).collect())
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

    #[test]
    fn test_list_of_scalars() {
        let list = ListNode::new(ScalarNode::<String>::new());
        let bound = apply_at(&list, &json!(["a", "b"]), "tags").unwrap();
        let tags: Vec<&String> = bound.as_list().unwrap().iter_as::<String>().collect();
        assert_eq!(tags, vec!["a", "b"]);
    }

    #[test]
    fn test_list_items_are_indexed() {
        let mut item = StructSchema::new();
        item.string("topic", true);
        let list = ListNode::new(item);

        let doc = json!([{ "topic": "a" }, { "partitions": 3 }, { "topic": "c" }]);
        let err = apply_at(&list, &doc, "streams").unwrap_err();
        let messages: Vec<String> = err.iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            vec![
                "streams.1.topic is required in streams.1",
                "partitions is not a known property of streams.1",
            ]
        );

        let ok = apply_at(&list, &json!([{ "topic": "a" }, { "topic": "b" }]), "streams").unwrap();
        let second = ok.as_list().unwrap().get_as::<BoundStruct>(1).unwrap();
        assert_eq!(second.path(), "streams.1");
        assert_eq!(second.document(), &json!({ "topic": "b" }));
    }

    #[test]
    fn test_list_requires_a_sequence() {
        let list = ListNode::new(ScalarNode::<String>::new());
        let err = apply_at(&list, &json!("a,b"), "tags").unwrap_err();
        assert_eq!(err[0].to_string(), "tags has type string rather than list");
    }
}
