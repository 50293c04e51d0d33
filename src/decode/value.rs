use chrono::{DateTime, Utc};
use std::fmt;

/// Wire type tags. Anything outside this set decodes as [`Value::Unknown`].
pub mod tag {
    pub const BOOL: u8 = 0x01;
    pub const INT: u8 = 0x02;
    pub const FLOAT: u8 = 0x03;
    pub const STRING: u8 = 0x04;
    pub const TIMESTAMP: u8 = 0x05;
    pub const STRUCT: u8 = 0x06;
    pub const LIST: u8 = 0x07;
}

/// One decoded position in a self-describing record tree.
///
/// The enum is closed on purpose: adding a wire tag forces every match over
/// `Value` to be revisited at compile time.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    /// Named fields in encoded order.
    Struct(Vec<(String, Value)>),
    List(Vec<Value>),
    /// Unrecognized wire tag; the payload was skipped by length.
    Unknown(u8),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Timestamp(_) => "timestamp",
            Value::Struct(_) => "struct",
            Value::List(_) => "list",
            Value::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            Value::Struct(fields) => write!(f, "struct({} fields)", fields.len()),
            Value::List(items) => write!(f, "list({} items)", items.len()),
            Value::Unknown(t) => write!(f, "unknown(tag {:#04x})", t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_scalars() {
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Int(-7).to_string(), "-7");
        assert_eq!(Value::String("abc".to_string()).to_string(), "abc");
        assert_eq!(Value::Unknown(0x1f).to_string(), "unknown(tag 0x1f)");
    }

    #[test]
    fn test_display_containers_summarize() {
        let s = Value::Struct(vec![("a".to_string(), Value::Int(1))]);
        assert_eq!(s.to_string(), "struct(1 fields)");
        assert_eq!(Value::List(vec![]).to_string(), "list(0 items)");
    }
}
