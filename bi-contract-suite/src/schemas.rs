//! Response shapes shared by the BI platform endpoints.

use contract_harness::{CompiledSchema, Result};
use lazy_static::lazy_static;
use serde_json::{json, Value};

lazy_static! {
    /// 400 responses: `errors` is keyed by field name, `""` for resource level errors.
    pub static ref VALIDATION_ERROR: Value = json!({
        "type": "object",
        "required": ["title", "status", "errors"],
        "properties": {
            "title": { "type": "string" },
            "status": { "type": "integer", "enum": [400] },
            "errors": {
                "type": "object",
                "additionalProperties": {
                    "type": "array",
                    "items": { "type": "string" }
                }
            }
        }
    });

    pub static ref LINK_TYPE: Value = json!({
        "type": "object",
        "required": ["id", "name", "left", "right"],
        "properties": {
            "id": { "type": "string", "format": "uuid" },
            "name": { "type": "string" },
            "left": { "$ref": "#/definitions/linkEnd" },
            "right": { "$ref": "#/definitions/linkEnd" }
        },
        "definitions": {
            "linkEnd": {
                "type": "object",
                "required": ["objectTypeId"],
                "properties": {
                    "objectTypeId": { "type": "string" }
                }
            }
        }
    });

    pub static ref FOLDER: Value = json!({
        "type": "object",
        "required": ["id", "name"],
        "properties": {
            "id": { "type": "string" },
            "name": { "type": "string" },
            "parentId": { "type": ["string", "null"] }
        }
    });

    pub static ref FILE_RESOURCE: Value = json!({
        "type": "object",
        "required": ["id", "name", "parentId"],
        "properties": {
            "id": { "type": "string" },
            "name": { "type": "string" },
            "parentId": { "type": ["string", "null"] },
            "size": { "type": "integer", "minimum": 0 },
            "contentType": { "type": "string" },
            "createdAt": { "type": "string", "format": "date-time" }
        }
    });
}

pub fn validation_error() -> Result<CompiledSchema> {
    CompiledSchema::compile(&VALIDATION_ERROR)
}

pub fn link_type() -> Result<CompiledSchema> {
    CompiledSchema::compile(&LINK_TYPE)
}

pub fn folder() -> Result<CompiledSchema> {
    CompiledSchema::compile(&FOLDER)
}

pub fn file_resource() -> Result<CompiledSchema> {
    CompiledSchema::compile(&FILE_RESOURCE)
}
