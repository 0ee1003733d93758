//! Content item model and attribute validation.
//!
//! Items are keyed by `base_path` and wholly replaced on update: every
//! mutable field comes from the new payload, so fields absent from it do
//! not survive a write.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Content item record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContentItem {
    /// Unique key: URL-safe encoded canonical path.
    pub base_path: String,

    /// Item title.
    pub title: Option<String>,

    /// Short description.
    pub description: Option<String>,

    /// Content format, first component of the publish routing key.
    pub format: String,

    /// Update classification, second component of the publish routing key.
    pub update_type: String,

    /// Application asserting ownership of the base path.
    pub publishing_app: String,

    /// Opaque caller-owned payload (JSONB).
    pub details: serde_json::Value,

    /// When the content last changed from the public's perspective.
    pub public_updated_at: Option<DateTime<Utc>>,

    /// When the item was first stored.
    pub created_at: DateTime<Utc>,

    /// When the item was last written.
    pub updated_at: DateTime<Utc>,
}

/// Per-field validation and registration errors.
///
/// Attached only to in-memory representations of a failed attempt; never
/// persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Create an empty error map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to a field's error list.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    /// True when no errors have been recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(field, messages)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    /// Messages recorded for a field, if any.
    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.0.get(field)
    }
}

/// Validated attributes for a create-or-replace write.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemAttributes {
    pub title: Option<String>,
    pub description: Option<String>,
    pub format: String,
    pub update_type: String,
    pub publishing_app: String,
    pub details: serde_json::Value,
    pub public_updated_at: Option<DateTime<Utc>>,
}

impl ItemAttributes {
    /// Validate a raw update payload.
    ///
    /// Returns the parsed attributes, or the full set of per-field errors
    /// when the payload fails shape validation. A failed attempt must never
    /// reach storage.
    pub fn parse(payload: &serde_json::Value) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();

        let Some(object) = payload.as_object() else {
            errors.add("base", "attributes must be a JSON object");
            return Err(errors);
        };

        let format = required_string(object, "format", &mut errors);
        let update_type = required_string(object, "update_type", &mut errors);
        let publishing_app = required_string(object, "publishing_app", &mut errors);
        let title = optional_string(object, "title", &mut errors);
        let description = optional_string(object, "description", &mut errors);

        let details = match object.get("details") {
            None | Some(serde_json::Value::Null) => serde_json::json!({}),
            Some(value @ serde_json::Value::Object(_)) => value.clone(),
            Some(_) => {
                errors.add("details", "must be a JSON object");
                serde_json::json!({})
            }
        };

        let public_updated_at = match object.get("public_updated_at") {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(raw)) => match DateTime::parse_from_rfc3339(raw) {
                Ok(parsed) => Some(parsed.with_timezone(&Utc)),
                Err(_) => {
                    errors.add("public_updated_at", "must be an RFC 3339 timestamp");
                    None
                }
            },
            Some(_) => {
                errors.add("public_updated_at", "must be an RFC 3339 timestamp");
                None
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self {
            title,
            description,
            format,
            update_type,
            publishing_app,
            details,
            public_updated_at,
        })
    }
}

fn required_string(
    object: &serde_json::Map<String, serde_json::Value>,
    field: &str,
    errors: &mut FieldErrors,
) -> String {
    match object.get(field) {
        Some(serde_json::Value::String(value)) if !value.trim().is_empty() => value.clone(),
        Some(serde_json::Value::String(_)) | None | Some(serde_json::Value::Null) => {
            errors.add(field, "is required");
            String::new()
        }
        Some(_) => {
            errors.add(field, "must be a string");
            String::new()
        }
    }
}

fn optional_string(
    object: &serde_json::Map<String, serde_json::Value>,
    field: &str,
    errors: &mut FieldErrors,
) -> Option<String> {
    match object.get(field) {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(value)) => Some(value.clone()),
        Some(_) => {
            errors.add(field, "must be a string");
            None
        }
    }
}

impl ContentItem {
    /// Build a stored item from validated attributes.
    pub fn from_attributes(
        base_path: &str,
        attributes: ItemAttributes,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            base_path: base_path.to_string(),
            title: attributes.title,
            description: attributes.description,
            format: attributes.format,
            update_type: attributes.update_type,
            publishing_app: attributes.publishing_app,
            details: attributes.details,
            public_updated_at: attributes.public_updated_at,
            created_at,
            updated_at,
        }
    }

    /// Build a never-persisted item from a raw payload.
    ///
    /// Used to render failed attempts back to the caller: whatever fields
    /// parse are carried, the rest default.
    pub fn transient(base_path: &str, payload: &serde_json::Value) -> Self {
        let string_field = |field: &str| {
            payload
                .get(field)
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };
        let now = Utc::now();

        Self {
            base_path: base_path.to_string(),
            title: string_field("title"),
            description: string_field("description"),
            format: string_field("format").unwrap_or_default(),
            update_type: string_field("update_type").unwrap_or_default(),
            publishing_app: string_field("publishing_app").unwrap_or_default(),
            details: payload
                .get("details")
                .filter(|v| v.is_object())
                .cloned()
                .unwrap_or_else(|| serde_json::json!({})),
            public_updated_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}
