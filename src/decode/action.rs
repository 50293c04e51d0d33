use crate::decode::value::Value;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Top-level field whose struct value carries the action payload.
pub const PAYLOAD_FIELD: &str = "payload";

#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("payload field {0:?} is missing")]
    Missing(&'static str),

    #[error("payload field {field:?} is {found}, expected {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}

/// The typed application record materialized from a `"payload"` struct.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRecord {
    pub user_id: String,
    pub action: String,
    pub rule_version: String,
    pub points: f64,
    pub created: DateTime<Utc>,
    pub hash: i64,
    pub data: String,
    pub date: DateTime<Utc>,
}

impl ActionRecord {
    /// Build a record by name-matching the fields of a decoded payload
    /// struct. Field names follow the wire schema (`UserId`, `Action`, ...).
    pub fn from_struct(fields: &[(String, Value)]) -> Result<Self, SchemaError> {
        Ok(Self {
            user_id: get_string(fields, "UserId")?,
            action: get_string(fields, "Action")?,
            rule_version: get_string(fields, "RuleVersion")?,
            points: get_float(fields, "Points")?,
            created: get_timestamp(fields, "Created")?,
            hash: get_int(fields, "Hash")?,
            data: get_string(fields, "Data")?,
            date: get_timestamp(fields, "Date")?,
        })
    }
}

/// Find the `"payload"` struct among a record's top-level fields and attempt
/// extraction. `None` when the record carries no payload struct.
pub fn extract_action(fields: &[(String, Value)]) -> Option<Result<ActionRecord, SchemaError>> {
    fields.iter().find_map(|(name, value)| match value {
        Value::Struct(inner) if name == PAYLOAD_FIELD => Some(ActionRecord::from_struct(inner)),
        _ => None,
    })
}

fn find<'a>(fields: &'a [(String, Value)], name: &'static str) -> Result<&'a Value, SchemaError> {
    fields
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v)
        .ok_or(SchemaError::Missing(name))
}

fn get_string(fields: &[(String, Value)], name: &'static str) -> Result<String, SchemaError> {
    match find(fields, name)? {
        Value::String(s) => Ok(s.clone()),
        other => Err(SchemaError::WrongType {
            field: name,
            expected: "string",
            found: other.type_name(),
        }),
    }
}

fn get_float(fields: &[(String, Value)], name: &'static str) -> Result<f64, SchemaError> {
    match find(fields, name)? {
        Value::Float(f) => Ok(*f),
        other => Err(SchemaError::WrongType {
            field: name,
            expected: "float",
            found: other.type_name(),
        }),
    }
}

fn get_int(fields: &[(String, Value)], name: &'static str) -> Result<i64, SchemaError> {
    match find(fields, name)? {
        Value::Int(i) => Ok(*i),
        other => Err(SchemaError::WrongType {
            field: name,
            expected: "int",
            found: other.type_name(),
        }),
    }
}

fn get_timestamp(
    fields: &[(String, Value)],
    name: &'static str,
) -> Result<DateTime<Utc>, SchemaError> {
    match find(fields, name)? {
        Value::Timestamp(ts) => Ok(*ts),
        other => Err(SchemaError::WrongType {
            field: name,
            expected: "timestamp",
            found: other.type_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn payload_fields() -> Vec<(String, Value)> {
        let created = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let date = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        vec![
            ("UserId".to_string(), Value::String("u1".to_string())),
            ("Action".to_string(), Value::String("buy".to_string())),
            ("RuleVersion".to_string(), Value::String("v1".to_string())),
            ("Points".to_string(), Value::Float(3.5)),
            ("Created".to_string(), Value::Timestamp(created)),
            ("Hash".to_string(), Value::Int(42)),
            ("Data".to_string(), Value::String("d".to_string())),
            ("Date".to_string(), Value::Timestamp(date)),
        ]
    }

    #[test]
    fn test_from_struct_maps_all_fields() {
        let record = ActionRecord::from_struct(&payload_fields()).unwrap();
        assert_eq!(record.user_id, "u1");
        assert_eq!(record.action, "buy");
        assert_eq!(record.rule_version, "v1");
        assert_eq!(record.points, 3.5);
        assert_eq!(record.hash, 42);
        assert_eq!(record.data, "d");
    }

    #[test]
    fn test_missing_field() {
        let mut fields = payload_fields();
        fields.retain(|(n, _)| n != "Points");
        assert_eq!(
            ActionRecord::from_struct(&fields),
            Err(SchemaError::Missing("Points"))
        );
    }

    #[test]
    fn test_wrong_type() {
        let mut fields = payload_fields();
        for (name, value) in &mut fields {
            if name == "Hash" {
                *value = Value::String("42".to_string());
            }
        }
        assert_eq!(
            ActionRecord::from_struct(&fields),
            Err(SchemaError::WrongType {
                field: "Hash",
                expected: "int",
                found: "string",
            })
        );
    }

    #[test]
    fn test_extract_action_ignores_other_structs() {
        let fields = vec![
            (
                "metadata".to_string(),
                Value::Struct(vec![("id".to_string(), Value::Int(1))]),
            ),
            ("payload".to_string(), Value::Struct(payload_fields())),
        ];
        let record = extract_action(&fields).unwrap().unwrap();
        assert_eq!(record.user_id, "u1");
    }

    #[test]
    fn test_extract_action_none_without_payload() {
        let fields = vec![("other".to_string(), Value::Bool(true))];
        assert!(extract_action(&fields).is_none());
    }

    #[test]
    fn test_extract_action_requires_struct_payload() {
        // A scalar field named "payload" is not a payload struct.
        let fields = vec![("payload".to_string(), Value::String("x".to_string()))];
        assert!(extract_action(&fields).is_none());
    }
}
