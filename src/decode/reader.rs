use crate::decode::value::{tag, Value};
use byteorder::{BigEndian, ReadBytesExt};
use chrono::{TimeZone, Utc};
use std::io::{Cursor, Read};
use thiserror::Error;
use tracing::warn;

/// Containers nested deeper than this abort the record. The encoding is a
/// tree, so the cap only guards against pathological input.
pub const MAX_DEPTH: usize = 64;

/// Record-level failures: malformed container framing. These abandon the
/// whole record and are never retried.
#[derive(Debug, Error)]
pub enum RecordDecodeError {
    #[error("truncated record framing: {0}")]
    Truncated(#[from] std::io::Error),

    #[error("declared payload of {declared} bytes overruns container ({available} bytes left)")]
    PayloadOverrun { declared: u64, available: u64 },

    #[error("container nesting exceeds depth cap of {0}")]
    DepthExceeded(usize),
}

/// Field-level failures: isolated to the one field being read. Logged by the
/// walk and skipped; never propagated.
#[derive(Debug, Error)]
enum FieldError {
    #[error("invalid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("expected {expected}-byte payload, found {found}")]
    PayloadLength { expected: u64, found: u64 },

    #[error("invalid bool byte {0:#04x}")]
    BoolByte(u8),

    #[error("timestamp out of range: {0} ms")]
    TimestampRange(i64),

    #[error("short read: {0}")]
    Io(#[from] std::io::Error),
}

/// Decode one raw record into its top-level struct fields, in encoded order.
///
/// A record whose top-level value is not a struct is skipped: `Ok` with no
/// fields, no error. Undecodable individual fields are logged and dropped;
/// the walk always continues to the next field.
pub fn decode_record(raw: &[u8]) -> Result<Vec<(String, Value)>, RecordDecodeError> {
    let mut cur = Cursor::new(raw);
    let top_tag = cur.read_u8()?;
    let len = u64::from(cur.read_u32::<BigEndian>()?);

    let available = raw.len() as u64 - cur.position();
    if len > available {
        return Err(RecordDecodeError::PayloadOverrun {
            declared: len,
            available,
        });
    }

    if top_tag != tag::STRUCT {
        return Ok(Vec::new());
    }

    let end = cur.position() + len;
    read_struct_fields(&mut cur, end, 1)
}

/// Walk the fields of a struct payload ending at `end`.
fn read_struct_fields(
    cur: &mut Cursor<&[u8]>,
    end: u64,
    depth: usize,
) -> Result<Vec<(String, Value)>, RecordDecodeError> {
    if depth > MAX_DEPTH {
        return Err(RecordDecodeError::DepthExceeded(MAX_DEPTH));
    }

    let mut fields = Vec::new();

    while cur.position() < end {
        // Field name: u16 length prefix + UTF-8 bytes.
        let name_len = u64::from(cur.read_u16::<BigEndian>()?);
        if cur.position() + name_len > end {
            return Err(RecordDecodeError::PayloadOverrun {
                declared: name_len,
                available: end - cur.position(),
            });
        }
        let mut name_buf = vec![0u8; name_len as usize];
        cur.read_exact(&mut name_buf)?;
        let name = match String::from_utf8(name_buf) {
            Ok(name) => Some(name),
            Err(e) => {
                warn!(error = %e, "skipping field with undecodable name");
                None
            }
        };

        // Value header: tag + u32 payload length.
        let value_tag = cur.read_u8()?;
        let value_len = u64::from(cur.read_u32::<BigEndian>()?);
        let value_end = cur.position() + value_len;
        if value_end > end {
            return Err(RecordDecodeError::PayloadOverrun {
                declared: value_len,
                available: end - cur.position(),
            });
        }

        let value = read_value(cur, value_tag, value_len, value_end, depth)?;

        // Realign past the payload whether or not the value decoded; the
        // length prefix is what keeps bad fields from poisoning their
        // siblings.
        cur.set_position(value_end);

        if let (Some(name), Some(value)) = (name, value) {
            fields.push((name, value));
        }
    }

    Ok(fields)
}

/// Decode one value. `Ok(None)` means a field-local failure that was logged
/// and should be skipped; `Err` means broken framing.
fn read_value(
    cur: &mut Cursor<&[u8]>,
    value_tag: u8,
    value_len: u64,
    value_end: u64,
    depth: usize,
) -> Result<Option<Value>, RecordDecodeError> {
    let scalar = match value_tag {
        tag::STRUCT => {
            return read_struct_fields(cur, value_end, depth + 1).map(|f| Some(Value::Struct(f)));
        }
        tag::LIST => {
            return read_list_items(cur, value_end, depth + 1).map(|v| Some(Value::List(v)));
        }
        tag::BOOL => read_bool(cur, value_len),
        tag::INT => read_int(cur, value_len),
        tag::FLOAT => read_float(cur, value_len),
        tag::STRING => read_string(cur, value_len),
        tag::TIMESTAMP => read_timestamp(cur, value_len),
        other => return Ok(Some(Value::Unknown(other))),
    };

    match scalar {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(tag = value_tag, error = %e, "skipping undecodable field value");
            Ok(None)
        }
    }
}

fn read_list_items(
    cur: &mut Cursor<&[u8]>,
    end: u64,
    depth: usize,
) -> Result<Vec<Value>, RecordDecodeError> {
    if depth > MAX_DEPTH {
        return Err(RecordDecodeError::DepthExceeded(MAX_DEPTH));
    }

    let mut items = Vec::new();

    while cur.position() < end {
        let value_tag = cur.read_u8()?;
        let value_len = u64::from(cur.read_u32::<BigEndian>()?);
        let value_end = cur.position() + value_len;
        if value_end > end {
            return Err(RecordDecodeError::PayloadOverrun {
                declared: value_len,
                available: end - cur.position(),
            });
        }

        let value = read_value(cur, value_tag, value_len, value_end, depth)?;
        cur.set_position(value_end);

        if let Some(value) = value {
            items.push(value);
        }
    }

    Ok(items)
}

fn expect_len(expected: u64, found: u64) -> Result<(), FieldError> {
    if expected != found {
        return Err(FieldError::PayloadLength { expected, found });
    }
    Ok(())
}

fn read_bool(cur: &mut Cursor<&[u8]>, len: u64) -> Result<Value, FieldError> {
    expect_len(1, len)?;
    match cur.read_u8()? {
        0 => Ok(Value::Bool(false)),
        1 => Ok(Value::Bool(true)),
        other => Err(FieldError::BoolByte(other)),
    }
}

fn read_int(cur: &mut Cursor<&[u8]>, len: u64) -> Result<Value, FieldError> {
    expect_len(8, len)?;
    Ok(Value::Int(cur.read_i64::<BigEndian>()?))
}

fn read_float(cur: &mut Cursor<&[u8]>, len: u64) -> Result<Value, FieldError> {
    expect_len(8, len)?;
    Ok(Value::Float(cur.read_f64::<BigEndian>()?))
}

fn read_string(cur: &mut Cursor<&[u8]>, len: u64) -> Result<Value, FieldError> {
    let mut buf = vec![0u8; len as usize];
    cur.read_exact(&mut buf)?;
    Ok(Value::String(String::from_utf8(buf)?))
}

fn read_timestamp(cur: &mut Cursor<&[u8]>, len: u64) -> Result<Value, FieldError> {
    expect_len(8, len)?;
    let millis = cur.read_i64::<BigEndian>()?;
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(Value::Timestamp)
        .ok_or(FieldError::TimestampRange(millis))
}
