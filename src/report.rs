//! Human and machine readable bind reports

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::Serialize;

use crate::config::OutputFormat;
use crate::error::{ValidationError, Violation};
use crate::node::BoundStruct;

/// Outcome of binding one document
#[derive(Debug)]
pub struct Report<'a> {
    pub source: String,
    pub outcome: Result<&'a BoundStruct, &'a ValidationError>,
}

#[derive(Serialize)]
struct JsonViolation {
    path: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<String>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    source: &'a str,
    valid: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    violations: Vec<JsonViolation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<serde_json::Value>,
}

/// Closest declared path for an unknown key, if any is a plausible match
pub fn suggest(violation: &Violation, candidates: &[String]) -> Option<String> {
    let Violation::UnknownProperty { .. } = violation else {
        return None;
    };
    let unknown = violation.path();
    let matcher = SkimMatcherV2::default();
    candidates
        .iter()
        .filter(|c| **c != unknown)
        .filter_map(|c| {
            let score = matcher
                .fuzzy_match(c, &unknown)
                .max(matcher.fuzzy_match(&unknown, c))?;
            Some((score, c))
        })
        .max_by_key(|(score, _)| *score)
        .map(|(_, c)| c.clone())
}

impl Report<'_> {
    pub fn is_valid(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Render the report; `candidates` enables "did you mean" hints
    pub fn render(&self, format: OutputFormat, candidates: Option<&[String]>) -> crate::Result<String> {
        let hint = |v: &Violation| candidates.and_then(|c| suggest(v, c));
        Ok(match format {
            OutputFormat::Pretty => match self.outcome {
                Ok(_) => format!("✅ {} - valid", self.source),
                Err(err) => {
                    let mut out = format!("❌ {} - {} violation(s)", self.source, err.len());
                    for violation in err.violations() {
                        out.push_str(&format!("\n  - {}", violation));
                        if let Some(s) = hint(violation) {
                            out.push_str(&format!(" (did you mean '{}'?)", s));
                        }
                    }
                    out
                }
            },
            OutputFormat::Compact => match self.outcome {
                Ok(_) => format!("{}: ok", self.source),
                Err(err) => err
                    .violations()
                    .iter()
                    .map(|v| format!("{}: {}", self.source, v))
                    .collect::<Vec<_>>()
                    .join("\n"),
            },
            OutputFormat::Json => {
                let report = JsonReport {
                    source: &self.source,
                    valid: self.is_valid(),
                    violations: match self.outcome {
                        Ok(_) => Vec::new(),
                        Err(err) => err
                            .violations()
                            .iter()
                            .map(|v| JsonViolation {
                                path: v.path(),
                                message: v.to_string(),
                                reason: v.reason().map(str::to_string),
                                suggestion: hint(v),
                            })
                            .collect(),
                    },
                    config: self.outcome.ok().map(BoundStruct::to_json),
                };
                serde_json::to_string_pretty(&report)?
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::StructSchema;
    use serde_json::json;

    fn schema() -> StructSchema {
        let mut schema = StructSchema::new();
        schema.integer("timeout_ms", false);
        schema.string("name", true);
        schema
    }

    #[test]
    fn test_suggest_unknown_property() {
        let candidates = schema().property_paths();
        let violation = Violation::UnknownProperty { key: "timeout".into(), parent: String::new() };
        assert_eq!(suggest(&violation, &candidates), Some("timeout_ms".to_string()));

        let missing = Violation::MissingRequired { path: "name".into(), parent: String::new() };
        assert_eq!(suggest(&missing, &candidates), None);
    }

    #[test]
    fn test_pretty_report() {
        let schema = schema();
        let err = schema.bind(&json!({ "timeout": 5 })).unwrap_err();
        let candidates = schema.property_paths();
        let report = Report { source: "app.toml".into(), outcome: Err(&err) };
        assert_eq!(
            report.render(OutputFormat::Pretty, Some(&candidates)).unwrap(),
            "❌ app.toml - 2 violation(s)\n  - name is required\n  - timeout is not a known property (did you mean 'timeout_ms'?)"
        );
    }

    #[test]
    fn test_json_report_includes_bound_config() {
        let schema = schema();
        let bound = schema.bind(&json!({ "name": "svc" })).unwrap();
        let report = Report { source: "app.toml".into(), outcome: Ok(&bound) };
        let rendered: serde_json::Value =
            serde_json::from_str(&report.render(OutputFormat::Json, None).unwrap()).unwrap();
        assert_eq!(rendered, json!({ "source": "app.toml", "valid": true, "config": { "name": "svc" } }));
    }

    #[test]
    fn test_compact_report() {
        let schema = schema();
        let err = schema.bind(&json!({})).unwrap_err();
        let report = Report { source: "a.json".into(), outcome: Err(&err) };
        assert_eq!(report.render(OutputFormat::Compact, None).unwrap(), "a.json: name is required");
    }

    #[test]
    fn test_json_report_carries_parser_reason() {
        let schema = schema();
        let err = schema.bind(&json!({ "name": "svc", "timeout_ms": "soon" })).unwrap_err();
        let report = Report { source: "app.json".into(), outcome: Err(&err) };
        let rendered: serde_json::Value =
            serde_json::from_str(&report.render(OutputFormat::Json, None).unwrap()).unwrap();
        let expected_reason = "soon".parse::<i64>().unwrap_err().to_string();
        assert_eq!(rendered["valid"], json!(false));
        assert_eq!(rendered["violations"][0]["path"], json!("timeout_ms"));
        assert_eq!(
            rendered["violations"][0]["reason"],
            json!(format!("'soon' is not a number ({})", expected_reason))
        );
    }
}
