//! Record Codec Module
//!
//! JSON envelope for [`Record`]s. Encoding writes every field using the
//! payload's runtime type; decoding is strict about required fields, lenient
//! about optional ones, and matches field names case-insensitively.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::error::{CacheError, Result};
use crate::record::{timespan, BoxedValue, Record, TypeRegistry};

const FIELD_KEY: &str = "Key";
const FIELD_VALUE: &str = "Value";
const FIELD_TYPE_NAME: &str = "TypeName";
const FIELD_SET_DATE: &str = "SetDate";
const FIELD_EXPIRY_DATE: &str = "ExpiryDate";
const FIELD_LIFETIME: &str = "ValueLifeTime";
const ROOT: &str = "$";

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct WireRecord<'a> {
    key: &'a str,
    value: JsonValue,
    type_name: &'a str,
    set_date: String,
    expiry_date: Option<String>,
    #[serde(serialize_with = "timespan::serialize_option")]
    value_life_time: Option<Duration>,
}

// == Record Codec ==
/// Encodes and decodes records, resolving payload types through a
/// [`TypeRegistry`].
#[derive(Debug, Clone)]
pub struct RecordCodec {
    registry: Arc<TypeRegistry>,
}

impl RecordCodec {
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    // == Encode ==
    /// Serializes a record into its wire form.
    pub fn encode(&self, record: &Record) -> Result<Vec<u8>> {
        let value = match record.value() {
            Some(value) => value.to_json().map_err(|e| {
                CacheError::malformed(FIELD_VALUE, format!("could not be serialized: {}", e))
            })?,
            None => JsonValue::Null,
        };

        let wire = WireRecord {
            key: record.key(),
            value,
            type_name: record.type_name(),
            set_date: format_date(record.set_date()),
            expiry_date: record.expiry_date().map(format_date),
            value_life_time: record.lifetime(),
        };

        serde_json::to_vec(&wire)
            .map_err(|e| CacheError::malformed(ROOT, format!("could not be serialized: {}", e)))
    }

    // == Decode ==
    /// Parses a record from its wire form.
    ///
    /// Fails with [`CacheError::MalformedRecord`] naming the offending field
    /// when a required field is missing or any field has the wrong type. A
    /// type tag unknown to the registry yields a record with no value.
    pub fn decode(&self, bytes: &[u8]) -> Result<Record> {
        let json: JsonValue = serde_json::from_slice(bytes)
            .map_err(|e| CacheError::malformed(ROOT, format!("is not valid JSON: {}", e)))?;

        let fields = match json {
            JsonValue::Object(fields) => fields,
            other => {
                return Err(CacheError::malformed(
                    ROOT,
                    format!("must be of type 'Object'. Actual type: '{}'", token_type(&other)),
                ))
            }
        };

        let key = required_string(&fields, FIELD_KEY)?;
        let type_name = required_string(&fields, FIELD_TYPE_NAME)?;
        let value = self.decode_value(&fields, &type_name)?;
        let set_date = date(required(&fields, FIELD_SET_DATE)?, FIELD_SET_DATE)?;
        let expiry_date = optional(&fields, FIELD_EXPIRY_DATE)
            .map(|token| date(token, FIELD_EXPIRY_DATE))
            .transpose()?;
        let lifetime = optional(&fields, FIELD_LIFETIME)
            .map(parse_lifetime)
            .transpose()?;

        Ok(Record::from_parts(
            key,
            value,
            type_name,
            set_date,
            expiry_date,
            lifetime,
        ))
    }

    fn decode_value(
        &self,
        fields: &Map<String, JsonValue>,
        type_name: &str,
    ) -> Result<Option<BoxedValue>> {
        let token = required(fields, FIELD_VALUE)?;
        let is_null = token.is_null();

        match self.registry.resolve(type_name, token.clone()) {
            None => Ok(None),
            Some(Ok(value)) => Ok(Some(value)),
            // A null payload stays absent for types that cannot represent it
            Some(Err(_)) if is_null => Ok(None),
            Some(Err(e)) => Err(CacheError::malformed(
                FIELD_VALUE,
                format!("does not match type '{}': {}", type_name, e),
            )),
        }
    }
}

// == Field Helpers ==
fn find<'a>(fields: &'a Map<String, JsonValue>, name: &str) -> Option<&'a JsonValue> {
    fields.get(name).or_else(|| {
        fields
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, token)| token)
    })
}

fn required<'a>(fields: &'a Map<String, JsonValue>, name: &'static str) -> Result<&'a JsonValue> {
    find(fields, name).ok_or_else(|| CacheError::malformed(name, "is required but missing"))
}

/// Looks up an optional field; explicit `null` counts as absent.
fn optional<'a>(fields: &'a Map<String, JsonValue>, name: &str) -> Option<&'a JsonValue> {
    find(fields, name).filter(|token| !token.is_null())
}

fn required_string(fields: &Map<String, JsonValue>, name: &'static str) -> Result<String> {
    match required(fields, name)? {
        JsonValue::String(text) if text.trim().is_empty() => {
            Err(CacheError::malformed(name, "is required but empty"))
        }
        JsonValue::String(text) => Ok(text.clone()),
        other => Err(type_mismatch(name, "String", other)),
    }
}

fn date(token: &JsonValue, name: &'static str) -> Result<DateTime<Utc>> {
    token
        .as_str()
        .and_then(parse_date)
        .ok_or_else(|| type_mismatch(name, "Date", token))
}

fn parse_lifetime(token: &JsonValue) -> Result<Duration> {
    let text = token
        .as_str()
        .ok_or_else(|| type_mismatch(FIELD_LIFETIME, "TimeSpan", token))?;
    timespan::parse(text).map_err(|e| CacheError::malformed(FIELD_LIFETIME, e))
}

fn type_mismatch(name: &'static str, expected: &str, actual: &JsonValue) -> CacheError {
    CacheError::malformed(
        name,
        format!(
            "must be of type '{}'. Actual type: '{}'",
            expected,
            token_type(actual)
        ),
    )
}

fn token_type(token: &JsonValue) -> &'static str {
    match token {
        JsonValue::Null => "Null",
        JsonValue::Bool(_) => "Boolean",
        JsonValue::Number(n) if n.is_f64() => "Float",
        JsonValue::Number(_) => "Integer",
        JsonValue::String(_) => "String",
        JsonValue::Array(_) => "Array",
        JsonValue::Object(_) => "Object",
    }
}

// == Dates ==
fn format_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Accepts RFC 3339 with any offset, or a bare local timestamp read as UTC.
fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|date| date.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| Utc.from_utc_datetime(&naive))
        })
}
