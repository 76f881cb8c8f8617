use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::ID_FIELD_NAME;

/// One stored publication, as it travels on the wire: a schemaless JSON
/// object. The five kinds carry different field sets and older records use
/// legacy field names, so typed structs only appear at the display layer.
pub type RawRecord = Map<String, Value>;

/// Wire format for date-time fields.
pub const WIRE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Read a field as a non-empty trimmed string.
pub fn string_field<'a>(record: &'a RawRecord, name: &str) -> Option<&'a str> {
    match record.get(name) {
        Some(Value::String(value)) => {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then_some(trimmed)
        }
        _ => None,
    }
}

/// Read a field as a flag; anything but `true` counts as unset.
pub fn bool_field(record: &RawRecord, name: &str) -> bool {
    matches!(record.get(name), Some(Value::Bool(true)))
}

/// Read a field as a list of non-empty trimmed strings. Accepts a JSON
/// array; anything else is treated as absent.
pub fn string_list_field(record: &RawRecord, name: &str) -> Vec<String> {
    match record.get(name) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(value) => {
                    let trimmed = value.trim();
                    (!trimmed.is_empty()).then(|| trimmed.to_string())
                }
                Value::Number(value) => Some(value.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Parse a timestamp field in any of the shapes seen in stored records.
pub fn timestamp_field(record: &RawRecord, name: &str) -> Option<DateTime<Utc>> {
    record.get(name).and_then(parse_timestamp)
}

/// Timestamps arrive as RFC 3339, `yyyy-MM-dd HH:mm:ss`, bare `yyyy-MM-dd`
/// or epoch milliseconds, depending on the age of the record and which
/// backend produced it.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => parse_timestamp_text(text.trim()),
        Value::Number(number) => {
            let millis = number.as_i64()?;
            Utc.timestamp_millis_opt(millis).single()
        }
        _ => None,
    }
}

fn parse_timestamp_text(text: &str) -> Option<DateTime<Utc>> {
    if text.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, WIRE_DATETIME_FORMAT) {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}

/// Render a timestamp in the wire format.
pub fn format_wire(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(WIRE_DATETIME_FORMAT).to_string()
}

/// Record id coerced to a string. Ids are strings on recent records and
/// numbers on some legacy ones.
pub fn record_id(record: &RawRecord) -> Option<String> {
    match record.get(ID_FIELD_NAME) {
        Some(Value::String(id)) => {
            let trimmed = id.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    }
}

/// Loose id comparison against either id shape.
pub fn record_id_matches(record: &RawRecord, id: &str) -> bool {
    record_id(record).is_some_and(|own| own == id)
}
