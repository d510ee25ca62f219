//! Configuration for the validator tooling, and document loading
//!
//! Validator settings are loaded from:
//! - Default values
//! - Config file (typed-config.toml)
//! - Environment variables (TYPED_CONFIG__*)
//!
//! ## Example config file (typed-config.toml):
//! ```toml
//! [validation]
//! ignore_unknown = false
//! env_prefix = "APP"
//!
//! [report]
//! output_format = "pretty"
//! suggest = true
//! ```
//!
//! Documents to validate are parsed by extension (`.toml`, `.json`) with their
//! keys untouched and deep-merged into one tree; prefixed environment
//! variables are layered on top through the `config` crate.

use std::path::Path;

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::document::Document;
use crate::error::ConfigSchemaError;

/// Main configuration for the validator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Validation settings
    #[serde(default)]
    pub validation: ValidationSettings,

    /// Report settings
    #[serde(default)]
    pub report: ReportSettings,
}

/// Validation settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationSettings {
    /// Skip the unknown-key scan of the root schema
    #[serde(default)]
    pub ignore_unknown: bool,

    /// Merge `<PREFIX>__*` environment variables into validated documents
    #[serde(default)]
    pub env_prefix: Option<String>,
}

/// Report settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSettings {
    /// Output format (pretty, compact or json)
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Suggest declared keys for unknown properties
    #[serde(default = "default_true")]
    pub suggest: bool,
}

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

fn default_true() -> bool {
    true
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Pretty,
            suggest: true,
        }
    }
}

impl ValidatorConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "typed-config.toml",
            ".typed-config.toml",
            "config/typed-config.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "typed-config") {
            let xdg_config = config_dir.config_dir().join("typed-config.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("TYPED_CONFIG")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

/// Merge configuration files (later files win) and, optionally,
/// `<PREFIX>__*` environment variables into one document tree.
///
/// Environment keys arrive lowercased, so they replace the existing key that
/// matches them case-insensitively.
pub fn load_document<P: AsRef<Path>>(
    paths: &[P],
    env_prefix: Option<&str>,
) -> crate::Result<Value> {
    let mut document = Value::Object(Map::new());
    for path in paths {
        let path = path.as_ref();
        debug!(path = %path.display(), "adding document source");
        merge(&mut document, read_document(path)?, false);
    }
    if let Some(prefix) = env_prefix {
        let overrides: Value = Config::builder()
            .add_source(
                Environment::with_prefix(prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        merge(&mut document, overrides, true);
    }
    Ok(document)
}

fn read_document(path: &Path) -> crate::Result<Value> {
    let content = std::fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Ok(toml::from_str::<toml::Value>(&content)?.to_json()),
        Some("json") => Ok(serde_json::from_str(&content)?),
        _ => Err(ConfigSchemaError::UnsupportedFormat(path.display().to_string())),
    }
}

/// Deep-merge `overlay` into `base`; maps merge key by key, anything else is replaced
fn merge(base: &mut Value, overlay: Value, fold_case: bool) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let key = if fold_case {
                    base.keys()
                        .find(|existing| existing.eq_ignore_ascii_case(&key))
                        .cloned()
                        .unwrap_or(key)
                } else {
                    key
                };
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value, fold_case),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::StructSchema;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = ValidatorConfig::default();
        assert!(!config.validation.ignore_unknown);
        assert!(config.report.suggest);
        assert_eq!(config.report.output_format, OutputFormat::Pretty);
    }

    #[test]
    fn test_serialize_config() {
        let config = ValidatorConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[validation]"));
        assert!(toml_str.contains("[report]"));
    }

    #[test]
    fn test_save_and_load_explicit_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let mut config = ValidatorConfig::default();
        config.validation.ignore_unknown = true;
        config.report.output_format = OutputFormat::Json;
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = ValidatorConfig::load_from(path.to_str()).unwrap();
        assert!(loaded.validation.ignore_unknown);
        assert_eq!(loaded.report.output_format, OutputFormat::Json);
    }

    #[test]
    fn test_load_document_merges_files() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("base.toml");
        let local = dir.path().join("local.json");
        fs::write(&base, "name = \"svc\"\n[db]\nurl = \"postgres://db/app\"\npool = 4\n").unwrap();
        fs::write(&local, r#"{ "db": { "pool": 8 } }"#).unwrap();

        let doc = load_document(&[base, local], None).unwrap();
        assert_eq!(doc["name"], json!("svc"));
        assert_eq!(doc["db"]["url"], json!("postgres://db/app"));
        assert_eq!(doc["db"]["pool"], json!(8));
    }

    #[test]
    fn test_load_document_missing_file() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(load_document(&[missing], None).is_err());
    }

    #[test]
    fn test_load_document_keeps_key_case() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.toml");
        fs::write(&path, "[sectionX]\nfieldY = \"v\"\n").unwrap();

        let doc = load_document(&[path], None).unwrap();
        assert_eq!(doc, json!({ "sectionX": { "fieldY": "v" } }));

        let mut section = StructSchema::new();
        let field = section.string("fieldY", true);
        let mut schema = StructSchema::new();
        let section_field = schema.structure("sectionX", section, true);
        let bound = schema.bind(&doc).unwrap();
        let section = bound.get(&section_field).unwrap();
        assert_eq!(section.get(&field).map(String::as_str), Some("v"));
    }

    #[test]
    fn test_load_document_env_overrides_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.toml");
        fs::write(&path, "name = \"svc\"\n[database]\npoolSize = 4\n").unwrap();

        std::env::set_var("TCFG_DOC_TEST__DATABASE__POOLSIZE", "16");
        let doc = load_document(&[path], Some("TCFG_DOC_TEST"));
        std::env::remove_var("TCFG_DOC_TEST__DATABASE__POOLSIZE");

        let doc = doc.unwrap();
        assert_eq!(doc["database"]["poolSize"], json!(16));
        assert_eq!(doc["name"], json!("svc"));
        assert!(doc["database"].get("poolsize").is_none());
    }

    #[test]
    fn test_load_document_rejects_unknown_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.ini");
        fs::write(&path, "a = 1").unwrap();
        assert!(matches!(
            load_document(&[path], None),
            Err(ConfigSchemaError::UnsupportedFormat(_))
        ));
    }
}
