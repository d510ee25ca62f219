//! Typed Configuration Schemas
//!
//! Declare the expected shape of a hierarchical configuration document in
//! code, then bind parsed documents against it. A bind yields either a fully
//! typed configuration or every violation in the document at once.
//!
//! ## Features
//!
//! - **Typed Handles**: registering a property returns a `Field<T>` that reads
//!   a `&T` back out of the bound result
//! - **Strict by Default**: unknown keys are rejected unless allowed by an
//!   extension, an inherited base schema, or `Options::IgnoreUnknown`
//! - **Complete Reports**: missing, unknown and mistyped values are all
//!   collected, each qualified by its dotted path
//! - **Stateless Schemas**: a schema tree is never mutated by binding, so one
//!   tree can serve any number of binds
//!
//! ## Example
//!
//! ```
//! use typed_config::{GroupNode, StructSchema};
//! use serde_json::json;
//!
//! let mut broker = StructSchema::new();
//! let host = broker.string("host", true);
//! let port = broker.integer_or("port", 9092);
//!
//! let mut root = StructSchema::new();
//! let brokers = root.group("brokers", GroupNode::new(broker), true);
//!
//! let bound = root.bind(&json!({ "brokers": { "east": { "host": "10.0.0.1" } } })).unwrap();
//! let east = bound.get(&brokers).unwrap().get_as::<typed_config::BoundStruct>("east").unwrap();
//! assert_eq!(east.get(&host).unwrap(), "10.0.0.1");
//! assert_eq!(east.get(&port), Some(&9092));
//!
//! let err = root.bind(&json!({ "brokers": { "west": {} }, "zone": "a" })).unwrap_err();
//! assert_eq!(
//!     err.to_string(),
//!     "brokers.west.host is required in brokers.west\nzone is not a known property"
//! );
//! ```

pub mod binding;
pub mod config;
pub mod descriptor;
pub mod document;
pub mod error;
pub mod node;
pub mod report;

pub use binding::{bind, bind_json_str, bind_toml_str, rebind};
pub use descriptor::SchemaSet;
pub use document::{DocKind, Document, RawScalar};
pub use error::{ConfigSchemaError, Result, ValidationError, Violation};
pub use node::{
    Bound, BoundGroup, BoundList, BoundStruct, ClassRef, ClassRegistry, Field, FieldKind,
    GroupNode, ListNode, Node, NodeKind, Options, ScalarNode, ScalarType, ScalarValue, Scope,
    StructSchema,
};
