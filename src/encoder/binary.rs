use super::varint::{write_uvarint, write_zigzag};
use super::{format_rfc3339_nanos, Encoder};
use crate::field::{Field, FieldValue};
use crate::record::Record;
use std::time::SystemTime;

const MAGIC: [u8; 2] = [0x52, 0x49];
const VERSION: u8 = 0x01;

const TYPE_STRING: u8 = 0x01;
const TYPE_INT64: u8 = 0x02;
const TYPE_UINT64: u8 = 0x03;
const TYPE_FLOAT64: u8 = 0x04;
const TYPE_BOOL: u8 = 0x05;
const TYPE_DURATION_NS: u8 = 0x06;
const TYPE_TIME_UNIX_NS: u8 = 0x07;
const TYPE_BYTES: u8 = 0x08;
const TYPE_ERROR: u8 = 0x09;
const TYPE_STRINGER: u8 = 0x0A;
const TYPE_OBJECT: u8 = 0x0B;
const TYPE_SECRET: u8 = 0x0C;

/// How the binary encoder frames its timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampFraming {
    #[default]
    UnixNanosVarint,
    Rfc3339String,
}

/// Byte-exact binary encoder (spec §4.6, "Binary encoder"). Framing:
/// `MAGIC(2) | VERSION(1) | TIMESTAMP | LEVEL(1) | OPT_STRING(logger) |
/// OPT_STRING(msg) | OPT_STRING(caller) | OPT_STRING(stack) |
/// FIELD_COUNT(varint) | FIELD...`, forward-incompatible across major
/// versions.
#[derive(Default)]
pub struct BinaryEncoder {
    pub timestamp_framing: TimestampFraming,
}

fn write_opt_string(out: &mut Vec<u8>, s: Option<&str>) {
    match s {
        None => write_uvarint(out, 0),
        Some(s) if s.is_empty() => write_uvarint(out, 0),
        Some(s) => {
            write_uvarint(out, s.len() as u64);
            out.extend_from_slice(s.as_bytes());
        }
    }
}

fn write_field(out: &mut Vec<u8>, field: &Field) {
    let type_code = match &field.value {
        FieldValue::Str(_) => TYPE_STRING,
        FieldValue::I64(..) => TYPE_INT64,
        FieldValue::U64(..) => TYPE_UINT64,
        FieldValue::F64(_) => TYPE_FLOAT64,
        FieldValue::Bool(_) => TYPE_BOOL,
        FieldValue::DurationNs(_) => TYPE_DURATION_NS,
        FieldValue::TimeUnixNs(_) => TYPE_TIME_UNIX_NS,
        FieldValue::Bytes(_) => TYPE_BYTES,
        FieldValue::Error(_) => TYPE_ERROR,
        FieldValue::Stringer(_) => TYPE_STRINGER,
        FieldValue::Object(_) => TYPE_OBJECT,
        FieldValue::Secret(_) => TYPE_SECRET,
    };
    out.push(type_code);
    write_opt_string(out, Some(&field.key));

    match &field.value {
        FieldValue::Str(s) => write_opt_string(out, Some(s)),
        FieldValue::I64(v, _) => write_zigzag(out, *v),
        FieldValue::U64(v, _) => write_uvarint(out, *v),
        FieldValue::F64(v) => out.extend_from_slice(&v.to_le_bytes()),
        FieldValue::Bool(v) => out.push(u8::from(*v)),
        FieldValue::DurationNs(v) => write_zigzag(out, *v),
        FieldValue::TimeUnixNs(v) => write_zigzag(out, *v),
        FieldValue::Bytes(b) => {
            write_uvarint(out, b.len() as u64);
            out.extend_from_slice(b);
        }
        FieldValue::Error(s) | FieldValue::Stringer(s) => write_opt_string(out, Some(s)),
        FieldValue::Object(obj) => {
            let mut formatted = String::new();
            let ok = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                obj.format(&mut formatted);
            }))
            .is_ok();
            if ok && !formatted.is_empty() {
                write_opt_string(out, Some(&formatted));
            } else {
                write_opt_string(out, Some(crate::field::OBJECT_PLACEHOLDER));
            }
        }
        // Secrets always encode the literal string, regardless of payload.
        FieldValue::Secret(_) => write_opt_string(out, Some("[REDACTED]")),
    }
}

impl Encoder for BinaryEncoder {
    fn encode(&self, record: &Record, now: SystemTime, out: &mut Vec<u8>) {
        out.extend_from_slice(&MAGIC);
        out.push(VERSION);

        match self.timestamp_framing {
            TimestampFraming::UnixNanosVarint => {
                let nanos = now
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_nanos() as u64)
                    .unwrap_or(0);
                write_uvarint(out, nanos);
            }
            TimestampFraming::Rfc3339String => {
                let mut s = String::new();
                format_rfc3339_nanos(now, &mut s);
                write_opt_string(out, Some(&s));
            }
        }

        out.push(record.level as u8);
        write_opt_string(out, if record.logger.is_empty() { None } else { Some(&record.logger) });
        write_opt_string(out, if record.message.is_empty() { None } else { Some(&record.message) });
        write_opt_string(out, record.caller.as_deref());
        write_opt_string(out, record.stack.as_deref());

        write_uvarint(out, record.field_count() as u64);
        for field in record.fields() {
            write_field(out, field);
        }
    }

    fn estimated_size(&self, record: &Record) -> usize {
        let mut size = 16 + record.message.len();
        if let Some(c) = &record.caller {
            size += c.len() + 2;
        }
        if let Some(s) = &record.stack {
            size += s.len() + 2;
        }
        for field in record.fields() {
            size += field.key.len() + 3;
            size += match &field.value {
                FieldValue::Str(s) | FieldValue::Error(s) | FieldValue::Stringer(s) => {
                    s.len() + 2
                }
                FieldValue::Bytes(b) => b.len() + 2,
                FieldValue::Secret(_) => "[REDACTED]".len() + 2,
                _ => 9,
            };
        }
        size
    }
}
