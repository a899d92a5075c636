//! Field definitions of the stream-event action and their resolution from a
//! raw analytics event.

use std::{collections::HashMap, fmt};

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use evr_core::{mapping, mapping::Directive, Map, Value};
use serde::Deserialize;
use thiserror::Error;

pub const EVENT_NAME: &str = "eventName";
pub const OCCURRED_AT: &str = "occurredAt";
pub const EMAIL: &str = "email";
pub const USER_ID: &str = "userId";
pub const PROPERTIES: &str = "properties";

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("missing required field {0}")]
    MissingRequired(&'static str),
    #[error("field {field} expects {expected}, got {found}")]
    InvalidType {
        field: &'static str,
        expected: FieldType,
        found: &'static str,
    },
    #[error("field {field} is not a valid datetime: {value}")]
    InvalidDatetime { field: &'static str, value: String },
    #[error("field {field} is not a valid {format}")]
    InvalidFormat {
        field: &'static str,
        format: FieldFormat,
    },
    #[error("can't resolve field {field}, {source}")]
    Mapping {
        field: &'static str,
        source: mapping::Error,
    },
    #[error("mapping refers to unknown field {0}")]
    UnknownField(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Datetime,
    Object,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FieldType::String => "string",
            FieldType::Datetime => "datetime",
            FieldType::Object => "object",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    Email,
}

impl fmt::Display for FieldFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldFormat::Email => f.write_str("email"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldDefinition {
    pub key: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub field_type: FieldType,
    pub required: bool,
    pub format: Option<FieldFormat>,
    pub default: Directive,
}

/// The fields of the stream-event action with their default mappings.
///
/// `occurredAt` is not enforced here even though every tracked event should
/// carry a timestamp: events without one are backfilled with the current time.
pub fn definitions() -> Vec<FieldDefinition> {
    vec![
        FieldDefinition {
            key: EVENT_NAME,
            label: "Event Name",
            description: "Name of the event",
            field_type: FieldType::String,
            required: true,
            format: None,
            default: Directive::path("$.event"),
        },
        FieldDefinition {
            key: OCCURRED_AT,
            label: "Event Timestamp",
            description: "The time when this event occurred. If this isn't set, the current time will be used.",
            field_type: FieldType::Datetime,
            required: false,
            format: None,
            default: Directive::path("$.timestamp"),
        },
        FieldDefinition {
            key: EMAIL,
            label: "Email Address",
            description: "The email of the contact associated with this event.",
            field_type: FieldType::String,
            required: false,
            format: Some(FieldFormat::Email),
            default: Directive::if_exists(
                Directive::path("$.properties.email"),
                Directive::path("$.properties.email"),
                Directive::path("$.context.traits.email"),
            ),
        },
        FieldDefinition {
            key: USER_ID,
            label: "User ID",
            description: "User ID, ideally mappable to external ref of a Rev User.",
            field_type: FieldType::String,
            required: true,
            format: None,
            default: Directive::path("$.properties.userId"),
        },
        FieldDefinition {
            key: PROPERTIES,
            label: "Properties",
            description: "A json object containing additional information about the event.",
            field_type: FieldType::Object,
            required: false,
            format: None,
            default: Directive::path("$.properties"),
        },
    ]
}

/// Per-field directives replacing the defaults of [`definitions`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Mapping(HashMap<String, Directive>);

impl Mapping {
    pub fn set(&mut self, field: impl Into<String>, directive: Directive) -> &mut Self {
        self.0.insert(field.into(), directive);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Directive> {
        self.0.get(field)
    }

    /// Fails if the mapping names a field the action does not declare.
    pub fn check(&self) -> Result<(), Error> {
        let known = definitions();
        match self
            .0
            .keys()
            .find(|key| !known.iter().any(|field| field.key == key.as_str()))
        {
            Some(unknown) => Err(Error::UnknownField(unknown.clone())),
            None => Ok(()),
        }
    }
}

/// A datetime field value, kept as received when it came in as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timestamp {
    Text(String),
    Instant(DateTime<Utc>),
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Text(text) => f.write_str(text),
            Timestamp::Instant(instant) => {
                f.write_str(&instant.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
        }
    }
}

/// Field values after mapping, type checks and required-ness checks.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEventFields {
    pub event_name: String,
    pub occurred_at: Option<Timestamp>,
    pub email: Option<String>,
    pub user_id: String,
    pub properties: Option<Map<String, Value>>,
}

enum FieldValue {
    Text(String),
    Timestamp(Timestamp),
    Object(Map<String, Value>),
}

/// Resolves every field of the action from `event`, applying `mapping`
/// overrides. Empty strings count as unset.
pub fn resolve_fields(event: &Value, mapping: &Mapping) -> Result<ResolvedEventFields, Error> {
    let mut resolved = HashMap::new();
    for field in definitions() {
        let directive = mapping.get(field.key).unwrap_or(&field.default);
        let value = directive
            .resolve(event)
            .map_err(|source| Error::Mapping {
                field: field.key,
                source,
            })?
            .filter(|v| v.as_str() != Some(""));

        match value {
            Some(value) => {
                resolved.insert(field.key, field.coerce(value)?);
            }
            None if field.required => return Err(Error::MissingRequired(field.key)),
            None => {}
        }
    }

    let mut text = |key: &'static str| match resolved.remove(key) {
        Some(FieldValue::Text(text)) => Some(text),
        _ => None,
    };
    let event_name = text(EVENT_NAME).ok_or(Error::MissingRequired(EVENT_NAME))?;
    let user_id = text(USER_ID).ok_or(Error::MissingRequired(USER_ID))?;
    let email = text(EMAIL);

    let occurred_at = match resolved.remove(OCCURRED_AT) {
        Some(FieldValue::Timestamp(timestamp)) => Some(timestamp),
        _ => None,
    };
    let properties = match resolved.remove(PROPERTIES) {
        Some(FieldValue::Object(map)) => Some(map),
        _ => None,
    };

    Ok(ResolvedEventFields {
        event_name,
        occurred_at,
        email,
        user_id,
        properties,
    })
}

impl FieldDefinition {
    fn coerce(&self, value: Value) -> Result<FieldValue, Error> {
        let coerced = match (self.field_type, value) {
            (FieldType::String, Value::String(text)) => FieldValue::Text(text),
            (FieldType::String, value @ (Value::Number(_) | Value::Bool(_))) => {
                FieldValue::Text(value.to_string())
            }
            (FieldType::Datetime, Value::String(text)) => {
                if DateTime::parse_from_rfc3339(&text).is_err() {
                    return Err(Error::InvalidDatetime {
                        field: self.key,
                        value: text,
                    });
                }
                FieldValue::Timestamp(Timestamp::Text(text))
            }
            (FieldType::Datetime, Value::Number(millis)) => {
                let instant = millis
                    .as_i64()
                    .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
                    .ok_or_else(|| Error::InvalidDatetime {
                        field: self.key,
                        value: millis.to_string(),
                    })?;
                FieldValue::Timestamp(Timestamp::Instant(instant))
            }
            (FieldType::Object, Value::Object(map)) => FieldValue::Object(map),
            (expected, other) => {
                return Err(Error::InvalidType {
                    field: self.key,
                    expected,
                    found: type_name(&other),
                })
            }
        };

        if let (Some(FieldFormat::Email), FieldValue::Text(text)) = (self.format, &coerced) {
            if !utils::is_email(text) {
                return Err(Error::InvalidFormat {
                    field: self.key,
                    format: FieldFormat::Email,
                });
            }
        }
        Ok(coerced)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
