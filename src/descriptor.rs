//! Declarative schema descriptors
//!
//! A [`SchemaSet`] describes named struct schemas in JSON or TOML so that a
//! schema can be built without writing Rust, e.g. for the validator CLI.
//!
//! ```toml
//! root = "service"
//!
//! [schemas.base]
//! properties = [
//!     { key = "class", type = "string", required = true },
//! ]
//!
//! [schemas.service]
//! inherits = "base"
//! properties = [
//!     { key = "port", type = "integer", default = 8080 },
//!     { key = "tags", type = "list", item = { type = "string" } },
//! ]
//! ```
//!
//! Inheritance is resolved by building the named base first and handing it
//! to [`StructSchema::inheriting`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{ConfigSchemaError, Result};
use crate::node::scalar::ScalarType;
use crate::node::{
    ClassRef, ClassRegistry, GroupNode, ListNode, Node, Options, ScalarNode, StructSchema,
};

/// A named collection of struct descriptors
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaSet {
    /// Schema used when none is named explicitly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,

    #[serde(default)]
    pub schemas: BTreeMap<String, StructDescriptor>,
}

/// Unknown-key policy as written in descriptors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionsDescriptor {
    #[default]
    Strict,
    IgnoreUnknown,
}

impl From<OptionsDescriptor> for Options {
    fn from(options: OptionsDescriptor) -> Self {
        match options {
            OptionsDescriptor::Strict => Options::Strict,
            OptionsDescriptor::IgnoreUnknown => Options::IgnoreUnknown,
        }
    }
}

/// A struct schema
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructDescriptor {
    #[serde(default)]
    pub options: OptionsDescriptor,

    /// Name of the schema in the same set whose keys this one also accepts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherits: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<String>,

    #[serde(default)]
    pub properties: Vec<PropertyDescriptor>,
}

/// One registered child; an empty key registers an inline struct
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    #[serde(default)]
    pub key: String,

    #[serde(default)]
    pub required: bool,

    #[serde(flatten)]
    pub node: NodeDescriptor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeDescriptor {
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<serde_json::Value>,
    },
    Integer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<serde_json::Value>,
    },
    Long {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<serde_json::Value>,
    },
    Boolean {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<serde_json::Value>,
    },
    Url {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<serde_json::Value>,
    },
    Path {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<serde_json::Value>,
    },
    Class {
        base: String,
        #[serde(default)]
        implementations: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<serde_json::Value>,
    },
    /// Struct defined in place
    Struct(StructDescriptor),
    /// Struct defined elsewhere in the set
    Schema { name: String },
    Group { item: Box<NodeDescriptor> },
    List { item: Box<NodeDescriptor> },
}

impl SchemaSet {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a descriptor file; `.toml` is read as TOML, anything else as JSON
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let set = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content)?,
            _ => Self::from_json_str(&content)?,
        };
        debug!(path = %path.display(), schemas = set.schemas.len(), "loaded schema set");
        Ok(set)
    }

    /// Build the `root` schema, or the only schema of a one-schema set
    pub fn build_root(&self) -> Result<StructSchema> {
        match (&self.root, self.schemas.len()) {
            (Some(name), _) => self.build(name),
            (None, 1) => match self.schemas.keys().next() {
                Some(name) => self.build(name),
                None => Err(ConfigSchemaError::Descriptor("schema set is empty".to_string())),
            },
            (None, 0) => Err(ConfigSchemaError::Descriptor("schema set is empty".to_string())),
            (None, _) => Err(ConfigSchemaError::Descriptor(
                "schema set has several schemas and no root".to_string(),
            )),
        }
    }

    /// Build a named schema
    pub fn build(&self, name: &str) -> Result<StructSchema> {
        self.build_named(name, &mut Vec::new())
    }

    fn build_named(&self, name: &str, stack: &mut Vec<String>) -> Result<StructSchema> {
        if stack.iter().any(|n| n == name) {
            let mut chain = stack.clone();
            chain.push(name.to_string());
            return Err(ConfigSchemaError::Descriptor(format!(
                "schema cycle: {}",
                chain.join(" -> ")
            )));
        }
        let descriptor = self
            .schemas
            .get(name)
            .ok_or_else(|| ConfigSchemaError::UnknownSchema(name.to_string()))?;

        stack.push(name.to_string());
        let schema = self.build_struct(descriptor, stack);
        stack.pop();
        schema
    }

    fn build_struct(&self, descriptor: &StructDescriptor, stack: &mut Vec<String>) -> Result<StructSchema> {
        let options = Options::from(descriptor.options);
        let mut schema = match &descriptor.inherits {
            Some(base) => StructSchema::inheriting(&self.build_named(base, stack)?, options),
            None => StructSchema::with_options(options),
        };
        for extension in &descriptor.extensions {
            schema.extend(extension.clone());
        }
        for property in &descriptor.properties {
            if schema.contains_key(&property.key) {
                return Err(ConfigSchemaError::Descriptor(format!(
                    "property '{}' declared twice",
                    property.key
                )));
            }
            let node = self
                .build_node(&property.node, stack)
                .map_err(|e| in_property(&property.key, e))?;
            schema.push(&property.key, node, property.required);
        }
        Ok(schema)
    }

    fn build_node(&self, descriptor: &NodeDescriptor, stack: &mut Vec<String>) -> Result<Box<dyn Node>> {
        Ok(match descriptor {
            NodeDescriptor::String { default } => scalar::<String>(default)?,
            NodeDescriptor::Integer { default } => scalar::<i32>(default)?,
            NodeDescriptor::Long { default } => scalar::<i64>(default)?,
            NodeDescriptor::Boolean { default } => scalar::<bool>(default)?,
            NodeDescriptor::Url { default } => scalar::<Url>(default)?,
            NodeDescriptor::Path { default } => scalar::<PathBuf>(default)?,
            NodeDescriptor::Class { base, implementations, default } => {
                let registry = implementations
                    .iter()
                    .fold(ClassRegistry::new(base.clone()), |r, name| r.register(name.clone()));
                let mut node = registry.node();
                if let Some(value) = default {
                    let class = coerce_default::<ClassRef>(value)?;
                    registry.check(&class).map_err(ConfigSchemaError::Descriptor)?;
                    node = node.with_default(class);
                }
                Box::new(node)
            }
            NodeDescriptor::Struct(inner) => Box::new(self.build_struct(inner, stack)?),
            NodeDescriptor::Schema { name } => Box::new(self.build_named(name, stack)?),
            NodeDescriptor::Group { item } => {
                Box::new(GroupNode::from_boxed(self.build_node(item, stack)?))
            }
            NodeDescriptor::List { item } => {
                Box::new(ListNode::from_boxed(self.build_node(item, stack)?))
            }
        })
    }
}

fn in_property(key: &str, err: ConfigSchemaError) -> ConfigSchemaError {
    match err {
        ConfigSchemaError::Descriptor(message) => {
            ConfigSchemaError::Descriptor(format!("{}: {}", key, message))
        }
        other => other,
    }
}

fn scalar<V: ScalarType>(default: &Option<serde_json::Value>) -> Result<Box<dyn Node>> {
    let mut node = ScalarNode::<V>::new();
    if let Some(value) = default {
        node = node.with_default(coerce_default::<V>(value)?);
    }
    Ok(Box::new(node))
}

fn coerce_default<V: ScalarType>(value: &serde_json::Value) -> Result<V> {
    ScalarNode::<V>::new()
        .parse(value, "default")
        .map_err(|violation| ConfigSchemaError::Descriptor(violation.to_string()))
}
