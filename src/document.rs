//! Document access
//!
//! The binding engine never parses configuration text. It reads an already
//! parsed tree through the [`Document`] trait, which is implemented here for
//! `serde_json::Value` and `toml::Value`. Anything else that can answer
//! "what is under this key" and "enumerate your members" can be bound too.
//!
//! Path semantics:
//! - keys are joined with `.`; `a.b` addresses member `b` of member `a`
//! - a `null` member is treated as absent
//! - flattened entries descend through maps only; lists are leaves

use std::borrow::Cow;
use std::fmt;

/// Coarse shape of a document value, used for type-mismatch messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocKind {
    Null,
    Boolean,
    Number,
    String,
    List,
    Map,
}

impl fmt::Display for DocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocKind::Null => "null",
            DocKind::Boolean => "boolean",
            DocKind::Number => "number",
            DocKind::String => "string",
            DocKind::List => "list",
            DocKind::Map => "object",
        };
        f.write_str(name)
    }
}

/// Scalar view of a leaf value, handed to scalar coercion
#[derive(Debug, Clone, PartialEq)]
pub enum RawScalar<'a> {
    Str(Cow<'a, str>),
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// Read-only, path-addressable view of a parsed configuration tree
pub trait Document {
    fn kind(&self) -> DocKind;

    /// Scalar view, `None` for maps, lists and null
    fn scalar(&self) -> Option<RawScalar<'_>>;

    /// Direct member of a map; `None` when absent, null, or not a map
    fn member(&self, key: &str) -> Option<&dyn Document>;

    /// Direct members of a map in document order, nulls skipped
    fn members(&self) -> Vec<(String, &dyn Document)>;

    /// Elements of a list, empty for anything else
    fn elements(&self) -> Vec<&dyn Document>;

    /// Owned snapshot of this subtree
    fn to_json(&self) -> serde_json::Value;
}

impl<'d> dyn Document + 'd {
    /// Resolve a dotted path below this value
    pub fn get_path(&self, path: &str) -> Option<&dyn Document> {
        self.locate(path).map(|(_, found)| found)
    }

    /// Resolve a dotted path, also returning the member keys walked.
    ///
    /// A member literally named by the remaining path wins over descending
    /// through its segments, so `a.b` finds `{"a.b": 1}` as well as
    /// `{"a": {"b": 1}}`.
    pub fn locate(&self, path: &str) -> Option<(Vec<String>, &dyn Document)> {
        let this: &dyn Document = self;
        if path.is_empty() {
            return Some((Vec::new(), this));
        }
        if let Some(found) = this.member(path) {
            return Some((vec![path.to_string()], found));
        }
        path.match_indices('.').find_map(|(at, _)| {
            let (head, rest) = (&path[..at], &path[at + 1..]);
            let (mut keys, found) = this.member(head)?.locate(rest)?;
            keys.insert(0, head.to_string());
            Some((keys, found))
        })
    }

    pub fn has_path(&self, path: &str) -> bool {
        self.get_path(path).is_some()
    }

    /// Element at a list position
    pub fn get_index(&self, index: usize) -> Option<&dyn Document> {
        self.elements().into_iter().nth(index)
    }

    /// All leaf entries, keyed by the member keys leading to them
    pub fn entries(&self) -> Vec<(Vec<String>, &dyn Document)> {
        let mut out = Vec::new();
        collect_entries(self, &[], &mut out);
        out
    }

    /// Values visited while walking `keys` member by member
    pub fn trail(&self, keys: &[String]) -> Vec<&dyn Document> {
        let mut current: &dyn Document = self;
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            match current.member(key) {
                Some(next) => {
                    out.push(next);
                    current = next;
                }
                None => break,
            }
        }
        out
    }
}

/// Both references point at the same value of one tree
pub fn same_value<'a>(a: &'a dyn Document, b: &'a dyn Document) -> bool {
    std::ptr::eq(
        a as *const (dyn Document + 'a) as *const u8,
        b as *const (dyn Document + 'a) as *const u8,
    )
}

fn collect_entries<'a>(
    doc: &'a dyn Document,
    prefix: &[String],
    out: &mut Vec<(Vec<String>, &'a dyn Document)>,
) {
    for (key, value) in doc.members() {
        let mut keys = prefix.to_vec();
        keys.push(key);
        if value.kind() == DocKind::Map {
            collect_entries(value, &keys, out);
        } else {
            out.push((keys, value));
        }
    }
}

/// Join a parent path and a child key; either side may be empty
pub fn join_path(parent: &str, key: &str) -> String {
    match (parent.is_empty(), key.is_empty()) {
        (true, _) => key.to_string(),
        (false, true) => parent.to_string(),
        (false, false) => format!("{}.{}", parent, key),
    }
}

impl Document for serde_json::Value {
    fn kind(&self) -> DocKind {
        use serde_json::Value;
        match self {
            Value::Null => DocKind::Null,
            Value::Bool(_) => DocKind::Boolean,
            Value::Number(_) => DocKind::Number,
            Value::String(_) => DocKind::String,
            Value::Array(_) => DocKind::List,
            Value::Object(_) => DocKind::Map,
        }
    }

    fn scalar(&self) -> Option<RawScalar<'_>> {
        use serde_json::Value;
        match self {
            Value::Bool(b) => Some(RawScalar::Bool(*b)),
            Value::String(s) => Some(RawScalar::Str(Cow::Borrowed(s))),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(RawScalar::Int(i)),
                None => n.as_f64().map(RawScalar::Float),
            },
            _ => None,
        }
    }

    fn member(&self, key: &str) -> Option<&dyn Document> {
        self.as_object()?
            .get(key)
            .filter(|v| !v.is_null())
            .map(|v| v as &dyn Document)
    }

    fn members(&self) -> Vec<(String, &dyn Document)> {
        match self.as_object() {
            Some(map) => map
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), v as &dyn Document))
                .collect(),
            None => Vec::new(),
        }
    }

    fn elements(&self) -> Vec<&dyn Document> {
        match self.as_array() {
            Some(items) => items.iter().map(|v| v as &dyn Document).collect(),
            None => Vec::new(),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        self.clone()
    }
}

impl Document for toml::Value {
    fn kind(&self) -> DocKind {
        use toml::Value;
        match self {
            Value::Boolean(_) => DocKind::Boolean,
            Value::Integer(_) | Value::Float(_) => DocKind::Number,
            Value::String(_) | Value::Datetime(_) => DocKind::String,
            Value::Array(_) => DocKind::List,
            Value::Table(_) => DocKind::Map,
        }
    }

    fn scalar(&self) -> Option<RawScalar<'_>> {
        use toml::Value;
        match self {
            Value::Boolean(b) => Some(RawScalar::Bool(*b)),
            Value::Integer(i) => Some(RawScalar::Int(*i)),
            Value::Float(f) => Some(RawScalar::Float(*f)),
            Value::String(s) => Some(RawScalar::Str(Cow::Borrowed(s))),
            Value::Datetime(d) => Some(RawScalar::Str(Cow::Owned(d.to_string()))),
            Value::Array(_) | Value::Table(_) => None,
        }
    }

    fn member(&self, key: &str) -> Option<&dyn Document> {
        self.as_table()?.get(key).map(|v| v as &dyn Document)
    }

    fn members(&self) -> Vec<(String, &dyn Document)> {
        match self.as_table() {
            Some(table) => table
                .iter()
                .map(|(k, v)| (k.clone(), v as &dyn Document))
                .collect(),
            None => Vec::new(),
        }
    }

    fn elements(&self) -> Vec<&dyn Document> {
        match self.as_array() {
            Some(items) => items.iter().map(|v| v as &dyn Document).collect(),
            None => Vec::new(),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        use toml::Value;
        match self {
            Value::Boolean(b) => Json::Bool(*b),
            Value::Integer(i) => Json::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
            Value::Datetime(d) => Json::String(d.to_string()),
            Value::Array(items) => Json::Array(items.iter().map(Document::to_json).collect()),
            Value::Table(table) => Json::Object(
                table
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}
