use crate::decode::{ActionRecord, Value};
use std::sync::{Arc, Mutex};

/// Destination for the decoder's observable output: one call per discovered
/// field, one call per materialized action record.
pub trait RecordSink: Send + Sync {
    fn field(&mut self, name: &str, value: &Value);
    fn action(&mut self, record: &ActionRecord);
}

/// Walk a decoded field list depth-first, in encoded order, surfacing every
/// field (including the fields of nested structs) through the sink.
pub fn emit_fields(sink: &mut dyn RecordSink, fields: &[(String, Value)]) {
    for (name, value) in fields {
        sink.field(name, value);
        if let Value::Struct(inner) = value {
            emit_fields(sink, inner);
        }
    }
}

/// Writes one line per field to stdout.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl RecordSink for StdoutSink {
    fn field(&mut self, name: &str, value: &Value) {
        println!("field {} ({}): {}", name, value.type_name(), value);
    }

    fn action(&mut self, record: &ActionRecord) {
        println!(
            "action user_id={} action={} rule_version={} points={} hash={} data={} created={} date={}",
            record.user_id,
            record.action,
            record.rule_version,
            record.points,
            record.hash,
            record.data,
            record.created.to_rfc3339(),
            record.date.to_rfc3339(),
        );
    }
}

/// Collects emissions in memory. Clones share the same buffers, so a test
/// can keep a handle while the consumer owns the sink.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<MemorySinkInner>>,
}

#[derive(Debug, Default)]
struct MemorySinkInner {
    fields: Vec<(String, Value)>,
    actions: Vec<ActionRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> Vec<(String, Value)> {
        self.inner.lock().unwrap().fields.clone()
    }

    pub fn actions(&self) -> Vec<ActionRecord> {
        self.inner.lock().unwrap().actions.clone()
    }
}

impl RecordSink for MemorySink {
    fn field(&mut self, name: &str, value: &Value) {
        self.inner
            .lock()
            .unwrap()
            .fields
            .push((name.to_string(), value.clone()));
    }

    fn action(&mut self, record: &ActionRecord) {
        self.inner.lock().unwrap().actions.push(record.clone());
    }
}
