//! Shape detection over FROST response documents
//!
//! A FROST server answers a navigation link with one of two shapes:
//!
//! ```text
//! Single:     { "@iot.id": <id>, ... }
//! Collection: { "value": [ { "@iot.id": <id>, ... }, ... ], ... }
//! ```

use crate::error::ResolveError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

pub const IOT_ID: &str = "@iot.id";
pub const VALUE: &str = "value";

/// Ordered identifiers in the order the server returned them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IdentifierList(Vec<String>);

impl IdentifierList {
    pub fn new(ids: Vec<String>) -> Self {
        Self(ids)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Comma-joined form handed to callers that expect a single string
    pub fn joined(&self) -> String {
        self.0.join(",")
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl fmt::Display for IdentifierList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

impl From<Vec<String>> for IdentifierList {
    fn from(ids: Vec<String>) -> Self {
        Self(ids)
    }
}

/// What a response document resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Single(String),
    Multiple(Vec<String>),
    Absent,
}

impl Resolution {
    pub fn into_identifiers(self) -> Option<IdentifierList> {
        match self {
            Resolution::Single(id) => Some(IdentifierList(vec![id])),
            Resolution::Multiple(ids) => Some(IdentifierList(ids)),
            Resolution::Absent => None,
        }
    }
}

/// A parsed response object, tagged with the link it was fetched from
#[derive(Debug, Clone)]
pub struct EntityEnvelope {
    link: String,
    fields: Map<String, Value>,
}

impl EntityEnvelope {
    /// Parse a response body. Anything but a JSON object is rejected.
    pub fn from_slice(link: &str, body: &[u8]) -> Result<Self, ResolveError> {
        let value: Value = serde_json::from_slice(body).map_err(|source| ResolveError::Parse {
            link: link.to_string(),
            source,
        })?;
        Self::from_value(link, value)
    }

    pub fn from_value(link: &str, value: Value) -> Result<Self, ResolveError> {
        match value {
            Value::Object(fields) => Ok(Self {
                link: link.to_string(),
                fields,
            }),
            _ => Err(ResolveError::NotAnObject {
                link: link.to_string(),
            }),
        }
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    /// Detect the shape and collect identifiers.
    ///
    /// `@iot.id` wins over `value` when both are present. Collection entries
    /// without an id are skipped with a warning.
    pub fn detect(&self) -> Resolution {
        if let Some(id) = identifier_of(&self.fields) {
            return Resolution::Single(id);
        }

        let Some(value) = self.fields.get(VALUE) else {
            tracing::debug!(link = %self.link, "response carries neither @iot.id nor value");
            return Resolution::Absent;
        };

        let Some(entries) = value.as_array() else {
            tracing::warn!(link = %self.link, "\"value\" is not an array, ignoring response");
            return Resolution::Absent;
        };

        let ids = entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let id = entry.as_object().and_then(identifier_of);
                if id.is_none() {
                    tracing::warn!(link = %self.link, index, "collection entry without @iot.id skipped");
                }
                id
            })
            .collect();

        Resolution::Multiple(ids)
    }

    /// Strict single-entity reading: a missing `@iot.id` is an error.
    pub fn single_id(&self) -> Result<String, ResolveError> {
        identifier_of(&self.fields).ok_or_else(|| self.missing(IOT_ID))
    }

    /// Strict collection reading: a missing `value` or a member without
    /// `@iot.id` is an error.
    pub fn collection_ids(&self) -> Result<Vec<String>, ResolveError> {
        let entries = self
            .fields
            .get(VALUE)
            .ok_or_else(|| self.missing(VALUE))?
            .as_array()
            .ok_or_else(|| ResolveError::InvalidValue {
                link: self.link.clone(),
            })?;

        entries
            .iter()
            .map(|entry| {
                entry
                    .as_object()
                    .and_then(identifier_of)
                    .ok_or_else(|| self.missing(IOT_ID))
            })
            .collect()
    }

    fn missing(&self, field: &'static str) -> ResolveError {
        ResolveError::MissingField {
            link: self.link.clone(),
            field,
        }
    }
}

/// A non-null `@iot.id` is present
pub fn has_identifier(fields: &Map<String, Value>) -> bool {
    !matches!(fields.get(IOT_ID), None | Some(Value::Null))
}

fn identifier_of(fields: &Map<String, Value>) -> Option<String> {
    match fields.get(IOT_ID) {
        None | Some(Value::Null) => None,
        Some(id) => Some(identifier_text(id)),
    }
}

/// Text form of an identifier. Numeric and string ids render the same.
pub fn identifier_text(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
