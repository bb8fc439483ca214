//! Component manifest validation.
//!
//! Validation is structural first, semantic second. The structural pass runs
//! the JSON Schema below (draft 2020-12) over the envelope and then over each
//! component in key order, so the first violation can be located. The
//! semantic pass checks what the schema cannot express: the format version
//! and that every `components` key equals its manifest's `id`.

use std::sync::OnceLock;

use jsonschema::{validator_for, Validator};
use serde_json::Value;

use crate::manifest::{ComponentManifestMap, SUPPORTED_MANIFEST_VERSION};

/// Envelope of a `ComponentManifestMap`. Components are checked separately.
const MANIFEST_MAP_SCHEMA: &str = r##"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "title": "Component Manifest Map",
  "type": "object",
  "required": ["v", "components"],
  "additionalProperties": false,
  "properties": {
    "v": { "type": "integer", "minimum": 0 },
    "components": {
      "type": "object",
      "additionalProperties": { "type": "object" }
    }
  }
}"##;

const COMPONENT_MANIFEST_SCHEMA: &str = r##"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "title": "Component Manifest",
  "type": "object",
  "required": ["id", "name"],
  "properties": {
    "id": { "type": "string" },
    "name": { "type": "string" },
    "description": { "type": "string" },
    "import": { "type": "string" },
    "summary": { "type": "string" },
    "jsDocTags": { "$ref": "#/$defs/jsDocTags" },
    "stories": {
      "type": "array",
      "items": { "$ref": "#/$defs/story" }
    },
    "props": true
  },
  "$defs": {
    "jsDocTag": {
      "type": "object",
      "required": ["key", "value"],
      "additionalProperties": false,
      "properties": {
        "key": { "type": "string" },
        "value": { "type": ["string", "number", "boolean", "null"] }
      }
    },
    "jsDocTags": {
      "type": "array",
      "items": { "$ref": "#/$defs/jsDocTag" }
    },
    "story": {
      "type": "object",
      "required": ["name", "snippet"],
      "properties": {
        "name": { "type": "string" },
        "description": { "type": "string" },
        "import": { "type": "string" },
        "snippet": { "type": "string" },
        "jsDocTags": { "$ref": "#/$defs/jsDocTags" }
      }
    }
  }
}"##;

#[derive(Debug, thiserror::Error)]
pub enum SchemaValidationError {
    #[error("Manifest parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Schema compile error: {0}")]
    SchemaCompile(String),
    #[error("Invalid manifest at {location}: {message}")]
    Structure { location: String, message: String },
    #[error("Unsupported manifest version {found} (expected {expected})")]
    UnsupportedVersion { found: u64, expected: u64 },
    #[error("Component key {key:?} does not match manifest id {id:?}")]
    IdMismatch { key: String, id: String },
}

impl SchemaValidationError {
    /// JSON pointer to the offending value, when the error has one.
    pub fn location(&self) -> Option<String> {
        match self {
            Self::Structure { location, .. } => Some(location.clone()),
            Self::UnsupportedVersion { .. } => Some("/v".to_string()),
            Self::IdMismatch { key, .. } => Some(format!("/components/{}/id", escape_pointer(key))),
            Self::Parse(_) | Self::SchemaCompile(_) => None,
        }
    }
}

struct ManifestValidators {
    map: Validator,
    component: Validator,
}

fn validators() -> Result<&'static ManifestValidators, SchemaValidationError> {
    static VALIDATORS: OnceLock<ManifestValidators> = OnceLock::new();

    if let Some(v) = VALIDATORS.get() {
        return Ok(v);
    }
    let compiled = ManifestValidators {
        map: compile(MANIFEST_MAP_SCHEMA)?,
        component: compile(COMPONENT_MANIFEST_SCHEMA)?,
    };
    Ok(VALIDATORS.get_or_init(|| compiled))
}

fn compile(schema_str: &str) -> Result<Validator, SchemaValidationError> {
    let schema_json: Value = serde_json::from_str(schema_str)?;
    validator_for(&schema_json).map_err(|e| SchemaValidationError::SchemaCompile(e.to_string()))
}

/// Validate raw manifest data and produce the typed map.
///
/// Fails on the first violation; nothing is coerced or dropped on the way.
pub fn validate(raw: &Value) -> Result<ComponentManifestMap, SchemaValidationError> {
    let validators = validators()?;

    first_violation(&validators.map, raw, String::new())?;

    if let Some(components) = raw.get("components").and_then(Value::as_object) {
        for (key, component) in components {
            let location = format!("/components/{}", escape_pointer(key));
            first_violation(&validators.component, component, location)?;
        }
    }

    let map: ComponentManifestMap = serde_json::from_value(raw.clone())?;

    if map.v != SUPPORTED_MANIFEST_VERSION {
        return Err(SchemaValidationError::UnsupportedVersion {
            found: map.v,
            expected: SUPPORTED_MANIFEST_VERSION,
        });
    }

    for (key, component) in &map.components {
        if key != &component.id {
            return Err(SchemaValidationError::IdMismatch {
                key: key.clone(),
                id: component.id.clone(),
            });
        }
    }

    Ok(map)
}

/// Parse a manifest body and validate it.
pub fn validate_bytes(body: &[u8]) -> Result<ComponentManifestMap, SchemaValidationError> {
    let raw: Value = serde_json::from_slice(body)?;
    validate(&raw)
}

fn first_violation(
    validator: &Validator,
    instance: &Value,
    location: String,
) -> Result<(), SchemaValidationError> {
    match validator.iter_errors(instance).next() {
        None => Ok(()),
        Some(err) => {
            let location = format!("{location}{}", err.instance_path().as_str());
            Err(SchemaValidationError::Structure {
                location: if location.is_empty() { "/".to_string() } else { location },
                message: err.to_string(),
            })
        }
    }
}

/// RFC 6901 escaping for a single reference token.
fn escape_pointer(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}
