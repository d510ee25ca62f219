//! Scalar leaf nodes

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use url::Url;

use super::{Bound, Node, NodeKind, Scope};
use crate::document::{Document, RawScalar};
use crate::error::Violation;
use crate::node::structure::FieldKind;

/// Why a raw value could not become a scalar
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoerceError {
    /// The raw value is of the wrong kind altogether
    Mismatch,
    /// Right kind, unusable value; carries the parser's message
    Invalid(String),
}

/// A Rust type that a scalar node can produce
pub trait ScalarType: Sized + Clone + Send + Sync + 'static {
    /// Name used in type-mismatch messages
    const TYPE_NAME: &'static str;

    fn coerce(raw: &RawScalar<'_>) -> Result<Self, CoerceError>;

    fn into_value(self) -> ScalarValue;

    fn from_value(value: &ScalarValue) -> Option<&Self>;
}

/// Any bound scalar
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    String(String),
    Integer(i32),
    Long(i64),
    Boolean(bool),
    Url(Url),
    Path(PathBuf),
    Class(ClassRef),
}

impl ScalarValue {
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            ScalarValue::String(s) => Value::String(s.clone()),
            ScalarValue::Integer(i) => Value::from(*i),
            ScalarValue::Long(l) => Value::from(*l),
            ScalarValue::Boolean(b) => Value::Bool(*b),
            ScalarValue::Url(u) => Value::String(u.to_string()),
            ScalarValue::Path(p) => Value::String(p.to_string_lossy().into_owned()),
            ScalarValue::Class(c) => Value::String(c.name().to_string()),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::String(s) => f.write_str(s),
            ScalarValue::Integer(i) => write!(f, "{}", i),
            ScalarValue::Long(l) => write!(f, "{}", l),
            ScalarValue::Boolean(b) => write!(f, "{}", b),
            ScalarValue::Url(u) => write!(f, "{}", u),
            ScalarValue::Path(p) => write!(f, "{}", p.display()),
            ScalarValue::Class(c) => f.write_str(c.name()),
        }
    }
}

type Check<V> = Arc<dyn Fn(&V) -> Result<(), String> + Send + Sync>;

/// Leaf node producing a `V`
pub struct ScalarNode<V: ScalarType> {
    default: Option<V>,
    check: Option<Check<V>>,
}

impl<V: ScalarType> ScalarNode<V> {
    pub fn new() -> Self {
        Self { default: None, check: None }
    }

    pub fn with_default(mut self, default: V) -> Self {
        self.default = Some(default);
        self
    }

    /// Extra constraint run after a successful coercion
    pub fn with_check(
        mut self,
        check: impl Fn(&V) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.check = Some(Arc::new(check));
        self
    }

    pub fn default_value(&self) -> Option<&V> {
        self.default.as_ref()
    }

    /// Parse a raw value into `V`, reporting failures against `path`
    pub fn parse(&self, slice: &dyn Document, path: &str) -> Result<V, Violation> {
        let raw = slice
            .scalar()
            .ok_or_else(|| Violation::type_mismatch(path, slice.kind(), V::TYPE_NAME))?;
        let value = V::coerce(&raw).map_err(|e| match e {
            CoerceError::Mismatch => Violation::type_mismatch(path, slice.kind(), V::TYPE_NAME),
            CoerceError::Invalid(message) => Violation::invalid_value(path, message),
        })?;
        if let Some(check) = &self.check {
            check(&value).map_err(|message| Violation::invalid_value(path, message))?;
        }
        Ok(value)
    }
}

impl<V: ScalarType> Default for ScalarNode<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: ScalarType> Node for ScalarNode<V> {
    fn kind(&self) -> NodeKind {
        NodeKind::Scalar
    }

    fn apply(&self, slice: &dyn Document, scope: &Scope) -> Result<Bound, Vec<Violation>> {
        self.parse(slice, scope.path())
            .map(|value| Bound::Scalar(value.into_value()))
            .map_err(|violation| vec![violation])
    }

    fn fallback(&self) -> Option<Bound> {
        self.default.clone().map(|value| Bound::Scalar(value.into_value()))
    }
}

fn whole_number(raw: &RawScalar<'_>) -> Result<i64, CoerceError> {
    match raw {
        RawScalar::Int(i) => Ok(*i),
        RawScalar::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(*f as i64),
        RawScalar::Float(f) => Err(CoerceError::Invalid(format!("{} is not a whole number", f))),
        RawScalar::Str(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| CoerceError::Invalid(format!("'{}' is not a number ({})", s, e))),
        RawScalar::Bool(_) => Err(CoerceError::Mismatch),
    }
}

macro_rules! field_kind {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FieldKind for $ty {
                fn project(bound: &Bound) -> Option<&Self> {
                    bound.as_scalar().and_then(<$ty as ScalarType>::from_value)
                }
            }
        )*
    };
}

field_kind!(String, i32, i64, bool, Url, PathBuf, ClassRef);

impl ScalarType for String {
    const TYPE_NAME: &'static str = "string";

    fn coerce(raw: &RawScalar<'_>) -> Result<Self, CoerceError> {
        Ok(match raw {
            RawScalar::Str(s) => s.to_string(),
            RawScalar::Int(i) => i.to_string(),
            RawScalar::Float(f) => f.to_string(),
            RawScalar::Bool(b) => b.to_string(),
        })
    }

    fn into_value(self) -> ScalarValue {
        ScalarValue::String(self)
    }

    fn from_value(value: &ScalarValue) -> Option<&Self> {
        match value {
            ScalarValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl ScalarType for i32 {
    const TYPE_NAME: &'static str = "integer";

    fn coerce(raw: &RawScalar<'_>) -> Result<Self, CoerceError> {
        let n = whole_number(raw)?;
        i32::try_from(n)
            .map_err(|_| CoerceError::Invalid(format!("{} is out of range for integer", n)))
    }

    fn into_value(self) -> ScalarValue {
        ScalarValue::Integer(self)
    }

    fn from_value(value: &ScalarValue) -> Option<&Self> {
        match value {
            ScalarValue::Integer(i) => Some(i),
            _ => None,
        }
    }
}

impl ScalarType for i64 {
    const TYPE_NAME: &'static str = "long";

    fn coerce(raw: &RawScalar<'_>) -> Result<Self, CoerceError> {
        whole_number(raw)
    }

    fn into_value(self) -> ScalarValue {
        ScalarValue::Long(self)
    }

    fn from_value(value: &ScalarValue) -> Option<&Self> {
        match value {
            ScalarValue::Long(l) => Some(l),
            _ => None,
        }
    }
}

impl ScalarType for bool {
    const TYPE_NAME: &'static str = "boolean";

    fn coerce(raw: &RawScalar<'_>) -> Result<Self, CoerceError> {
        match raw {
            RawScalar::Bool(b) => Ok(*b),
            RawScalar::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" => Ok(true),
                "false" | "no" | "off" => Ok(false),
                _ => Err(CoerceError::Invalid(format!("'{}' is not a boolean", s))),
            },
            RawScalar::Int(_) | RawScalar::Float(_) => Err(CoerceError::Mismatch),
        }
    }

    fn into_value(self) -> ScalarValue {
        ScalarValue::Boolean(self)
    }

    fn from_value(value: &ScalarValue) -> Option<&Self> {
        match value {
            ScalarValue::Boolean(b) => Some(b),
            _ => None,
        }
    }
}

impl ScalarType for Url {
    const TYPE_NAME: &'static str = "url";

    fn coerce(raw: &RawScalar<'_>) -> Result<Self, CoerceError> {
        match raw {
            RawScalar::Str(s) => Url::parse(s).map_err(|e| CoerceError::Invalid(e.to_string())),
            _ => Err(CoerceError::Mismatch),
        }
    }

    fn into_value(self) -> ScalarValue {
        ScalarValue::Url(self)
    }

    fn from_value(value: &ScalarValue) -> Option<&Self> {
        match value {
            ScalarValue::Url(u) => Some(u),
            _ => None,
        }
    }
}

impl ScalarType for PathBuf {
    const TYPE_NAME: &'static str = "path";

    fn coerce(raw: &RawScalar<'_>) -> Result<Self, CoerceError> {
        match raw {
            RawScalar::Str(s) if s.trim().is_empty() => {
                Err(CoerceError::Invalid("empty path".to_string()))
            }
            RawScalar::Str(s) => Ok(PathBuf::from(s.to_string())),
            _ => Err(CoerceError::Mismatch),
        }
    }

    fn into_value(self) -> ScalarValue {
        ScalarValue::Path(self)
    }

    fn from_value(value: &ScalarValue) -> Option<&Self> {
        match value {
            ScalarValue::Path(p) => Some(p),
            _ => None,
        }
    }
}

fn class_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(::[A-Za-z_][A-Za-z0-9_]*)*$")
            .expect("class name pattern compiles")
    })
}

/// Reference to a named implementation, e.g. `codecs::JsonCodec`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassRef {
    name: String,
}

impl ClassRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last `::` segment
    pub fn simple_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }
}

impl fmt::Display for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl ScalarType for ClassRef {
    const TYPE_NAME: &'static str = "class";

    fn coerce(raw: &RawScalar<'_>) -> Result<Self, CoerceError> {
        match raw {
            RawScalar::Str(s) if class_name_pattern().is_match(s.trim()) => {
                Ok(ClassRef::new(s.trim()))
            }
            RawScalar::Str(s) => Err(CoerceError::Invalid(format!("'{}' is not a valid class name", s))),
            _ => Err(CoerceError::Mismatch),
        }
    }

    fn into_value(self) -> ScalarValue {
        ScalarValue::Class(self)
    }

    fn from_value(value: &ScalarValue) -> Option<&Self> {
        match value {
            ScalarValue::Class(c) => Some(c),
            _ => None,
        }
    }
}

/// Implementations that may be named by a class-reference property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRegistry {
    base: String,
    implementations: BTreeSet<String>,
}

impl ClassRegistry {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into(), implementations: BTreeSet::new() }
    }

    pub fn register(mut self, name: impl Into<String>) -> Self {
        self.implementations.insert(name.into());
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn contains(&self, class: &ClassRef) -> bool {
        self.implementations.contains(class.name())
    }

    pub fn check(&self, class: &ClassRef) -> Result<(), String> {
        if self.contains(class) {
            Ok(())
        } else {
            Err(format!("{} is not a registered implementation of {}", class, self.base))
        }
    }

    /// Scalar node accepting only registered implementations
    pub fn node(&self) -> ScalarNode<ClassRef> {
        let registry = self.clone();
        ScalarNode::new().with_check(move |class| registry.check(class))
    }
}
