//! Structural contract checks for response bodies.
//!
//! Structure (`required`, `type` including nested objects and arrays, `enum`,
//! ...) is checked by the `jsonschema` crate and reported as errors.
//!
//! `format` keywords are **advisory**. They are removed from the schema before
//! it is compiled and checked separately: a `uuid` or `date-time` string that
//! does not parse becomes a warning, never an error, and any other format is
//! reported as "not checked". Test authors should not rely on format checks
//! failing a step. `$ref` targets are not searched for formats.

use crate::error::{Error, Result};
use jsonschema::{CompilationOptions, Draft, JSONSchema};
use serde::Serialize;
use serde_json::Value;
use std::{
    fmt::{self, Debug},
    sync::Arc,
};

const NAMED_SCHEMA_MAPS: [&str; 5] = [
    "properties",
    "patternProperties",
    "definitions",
    "$defs",
    "dependencies",
];

/// Keywords whose values are instance data, not subschemas.
const LITERAL_KEYWORDS: [&str; 4] = ["const", "enum", "default", "examples"];

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SchemaIssue {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<SchemaIssue>,
    pub warnings: Vec<SchemaIssue>,
}

pub struct SchemaValidator;

impl SchemaValidator {
    /// Validates `instance` against `schema`.
    ///
    /// # Returns
    /// The report, or [`Error::SchemaCompile`] when `schema` is not a valid schema.
    pub fn validate(instance: &Value, schema: &Value) -> Result<ValidationReport> {
        Ok(CompiledSchema::compile(schema)?.validate(instance))
    }
}

/// A schema compiled once and reusable across steps and scenarios.
#[derive(Clone)]
pub struct CompiledSchema {
    raw: Arc<Value>,
    validator: Arc<JSONSchema>,
}

impl CompiledSchema {
    pub fn compile(schema: &Value) -> Result<Self> {
        let mut structural = schema.clone();
        strip_formats(&mut structural);

        let mut options = CompilationOptions::default();
        options.with_draft(Draft::Draft7);
        let validator = options
            .compile(&structural)
            .map_err(|e| Error::SchemaCompile(e.to_string()))?;

        Ok(Self {
            raw: Arc::new(schema.clone()),
            validator: Arc::new(validator),
        })
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn validate(&self, instance: &Value) -> ValidationReport {
        let mut errors = match self.validator.validate(instance) {
            Ok(()) => Vec::new(),
            Err(validation_errors) => validation_errors
                .map(|e| SchemaIssue {
                    path: display_path(e.instance_path.to_string()),
                    message: e.to_string(),
                })
                .collect(),
        };
        let mut warnings = Vec::new();
        collect_format_warnings(&self.raw, instance, "", &mut warnings);

        errors.sort();
        errors.dedup();
        warnings.sort();
        warnings.dedup();

        ValidationReport {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

impl Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("raw", &self.raw)
            .finish()
    }
}

fn display_path(pointer: String) -> String {
    if pointer.is_empty() {
        String::from("/")
    } else {
        pointer
    }
}

fn strip_formats(schema: &mut Value) {
    match schema {
        Value::Object(map) => {
            if matches!(map.get("format"), Some(Value::String(_))) {
                map.remove("format");
            }
            for (key, child) in map.iter_mut() {
                if LITERAL_KEYWORDS.contains(&key.as_str()) {
                    continue;
                }
                match child {
                    Value::Object(named) if NAMED_SCHEMA_MAPS.contains(&key.as_str()) => {
                        named.values_mut().for_each(strip_formats);
                    }
                    other => strip_formats(other),
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(strip_formats),
        _ => {}
    }
}

fn collect_format_warnings(
    schema: &Value,
    instance: &Value,
    path: &str,
    warnings: &mut Vec<SchemaIssue>,
) {
    let schema = match schema.as_object() {
        Some(schema) => schema,
        None => return,
    };

    if let (Some(format), Some(text)) = (
        schema.get("format").and_then(Value::as_str),
        instance.as_str(),
    ) {
        if let Some(message) = check_format(format, text) {
            warnings.push(SchemaIssue {
                path: display_path(path.into()),
                message,
            });
        }
    }

    let properties = schema.get("properties").and_then(Value::as_object);
    if let (Some(properties), Some(object)) = (properties, instance.as_object()) {
        for (name, property_schema) in properties {
            if let Some(value) = object.get(name) {
                let child = format!("{}/{}", path, escape_pointer(name));
                collect_format_warnings(property_schema, value, &child, warnings);
            }
        }
    }

    if let (Some(additional), Some(object)) = (
        schema.get("additionalProperties").filter(|s| s.is_object()),
        instance.as_object(),
    ) {
        for (name, value) in object {
            if properties.map_or(true, |p| !p.contains_key(name)) {
                let child = format!("{}/{}", path, escape_pointer(name));
                collect_format_warnings(additional, value, &child, warnings);
            }
        }
    }

    if let Some(elements) = instance.as_array() {
        match schema.get("items") {
            Some(Value::Array(tuple)) => {
                for (index, (item_schema, element)) in tuple.iter().zip(elements).enumerate() {
                    let child = format!("{}/{}", path, index);
                    collect_format_warnings(item_schema, element, &child, warnings);
                }
            }
            Some(item_schema) => {
                for (index, element) in elements.iter().enumerate() {
                    let child = format!("{}/{}", path, index);
                    collect_format_warnings(item_schema, element, &child, warnings);
                }
            }
            None => {}
        }
    }

    for combinator in ["allOf", "anyOf", "oneOf"] {
        if let Some(branches) = schema.get(combinator).and_then(Value::as_array) {
            for branch in branches {
                collect_format_warnings(branch, instance, path, warnings);
            }
        }
    }
}

fn check_format(format: &str, text: &str) -> Option<String> {
    match format {
        "uuid" => uuid::Uuid::parse_str(text)
            .err()
            .map(|e| format!("\"{}\" is not a uuid: {}", text, e)),
        "date-time" => chrono::DateTime::parse_from_rfc3339(text)
            .err()
            .map(|e| format!("\"{}\" is not an RFC 3339 date-time: {}", text, e)),
        "date" => chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .err()
            .map(|e| format!("\"{}\" is not a full-date: {}", text, e)),
        other => Some(format!("format \"{}\" is not checked", other)),
    }
}

fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}
