use super::{format_rfc3339_nanos, Encoder};
use crate::field::{Field, FieldValue};
use crate::record::Record;
use std::fmt::Write as _;
use std::time::SystemTime;

/// How the JSON encoder renders its timestamp field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampFormat {
    #[default]
    Rfc3339Nano,
    UnixNanos,
}

/// Newline-delimited JSON encoder (spec §4.6, "JSON encoder").
pub struct JsonEncoder {
    pub ts_key: String,
    pub timestamp_format: TimestampFormat,
}

impl Default for JsonEncoder {
    fn default() -> Self {
        Self {
            ts_key: "ts".to_string(),
            timestamp_format: TimestampFormat::default(),
        }
    }
}

/// Appends `s` as a JSON string literal, including the surrounding quotes.
fn write_json_string(out: &mut Vec<u8>, s: &str) {
    out.push(b'"');
    for c in s.chars() {
        match c {
            '"' => out.extend_from_slice(b"\\\""),
            '\\' => out.extend_from_slice(b"\\\\"),
            '\n' => out.extend_from_slice(b"\\n"),
            '\r' => out.extend_from_slice(b"\\r"),
            '\t' => out.extend_from_slice(b"\\t"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                let _ = write!(
                    UnsafeVecWriter(out),
                    "\\u{:04x}",
                    c as u32
                );
            }
            c => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    out.push(b'"');
}

/// Adapts `Vec<u8>` to `fmt::Write` for the `\uXXXX` escape path, which is
/// rare enough on the hot path that a tiny indirection here is fine.
struct UnsafeVecWriter<'a>(&'a mut Vec<u8>);
impl std::fmt::Write for UnsafeVecWriter<'_> {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.0.extend_from_slice(s.as_bytes());
        Ok(())
    }
}

fn write_f64(out: &mut Vec<u8>, v: f64) {
    if v.is_nan() {
        out.extend_from_slice(b"\"NaN\"");
    } else if v.is_infinite() {
        out.extend_from_slice(if v > 0.0 { b"\"+Inf\"" } else { b"\"-Inf\"" });
    } else {
        let mut buf = ryu_like(v);
        out.append(&mut buf);
    }
}

/// Shortest round-trip `f64` formatting via the standard library's
/// `Display`, which already produces the shortest representation that
/// round-trips losslessly (Grisu/Ryu-equivalent since Rust 1.x's
/// `f64::to_string` rewrite) — no extra crate required.
fn ryu_like(v: f64) -> Vec<u8> {
    let mut s = v.to_string();
    if !s.contains('.') && !s.contains('e') && !s.contains('E') {
        s.push_str(".0");
    }
    s.into_bytes()
}

fn write_field_value(out: &mut Vec<u8>, value: &FieldValue) {
    match value {
        FieldValue::Str(s) => write_json_string(out, s),
        FieldValue::I64(v, _) => {
            let _ = write!(UnsafeVecWriter(out), "{v}");
        }
        FieldValue::U64(v, _) => {
            if *v > i64::MAX as u64 {
                write_json_string(out, &v.to_string());
            } else {
                let _ = write!(UnsafeVecWriter(out), "{v}");
            }
        }
        FieldValue::F64(v) => write_f64(out, *v),
        FieldValue::Bool(v) => out.extend_from_slice(if *v { b"true" } else { b"false" }),
        FieldValue::DurationNs(v) => {
            let _ = write!(UnsafeVecWriter(out), "{v}");
        }
        FieldValue::TimeUnixNs(nanos) => {
            let t = if *nanos >= 0 {
                std::time::UNIX_EPOCH + std::time::Duration::from_nanos(*nanos as u64)
            } else {
                std::time::UNIX_EPOCH - std::time::Duration::from_nanos((-*nanos) as u64)
            };
            let mut s = String::new();
            format_rfc3339_nanos(t, &mut s);
            write_json_string(out, &s);
        }
        FieldValue::Bytes(b) => {
            out.push(b'[');
            for (i, byte) in b.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                let _ = write!(UnsafeVecWriter(out), "{byte}");
            }
            out.push(b']');
        }
        FieldValue::Error(s) | FieldValue::Stringer(s) => write_json_string(out, s),
        FieldValue::Object(obj) => {
            let mut formatted = String::new();
            let ok = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                obj.format(&mut formatted);
            }))
            .is_ok();
            if ok && !formatted.is_empty() {
                write_json_string(out, &formatted);
            } else {
                write_json_string(out, crate::field::OBJECT_PLACEHOLDER);
            }
        }
        FieldValue::Secret(_) => out.extend_from_slice(b"\"[REDACTED]\""),
    }
}

impl Encoder for JsonEncoder {
    fn encode(&self, record: &Record, now: SystemTime, out: &mut Vec<u8>) {
        out.push(b'{');
        out.push(b'"');
        out.extend_from_slice(self.ts_key.as_bytes());
        out.extend_from_slice(b"\":");
        match self.timestamp_format {
            TimestampFormat::Rfc3339Nano => {
                let mut s = String::new();
                format_rfc3339_nanos(now, &mut s);
                write_json_string(out, &s);
            }
            TimestampFormat::UnixNanos => {
                let nanos = now
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_nanos() as i128)
                    .unwrap_or(0);
                let _ = write!(UnsafeVecWriter(out), "{nanos}");
            }
        }

        out.extend_from_slice(b",\"level\":");
        write_json_string(out, record.level.name());

        if !record.logger.is_empty() {
            out.extend_from_slice(b",\"logger\":");
            write_json_string(out, &record.logger);
        }

        if !record.message.is_empty() {
            out.extend_from_slice(b",\"msg\":");
            write_json_string(out, &record.message);
        }

        if let Some(caller) = &record.caller {
            out.extend_from_slice(b",\"caller\":");
            write_json_string(out, caller);
        }

        if let Some(stack) = &record.stack {
            out.extend_from_slice(b",\"stack\":");
            write_json_string(out, stack);
        }

        for field in record.fields() {
            out.push(b',');
            write_json_string(out, &field.key);
            out.push(b':');
            write_field_value(out, &field.value);
        }

        out.extend_from_slice(b"}\n");
    }

    fn estimated_size(&self, record: &Record) -> usize {
        let mut size = 64 + record.message.len();
        if let Some(c) = &record.caller {
            size += c.len() + 12;
        }
        if let Some(s) = &record.stack {
            size += s.len() + 12;
        }
        for field in record.fields() {
            size += field.key.len() + 4;
            size += match &field.value {
                FieldValue::Str(s) | FieldValue::Error(s) | FieldValue::Stringer(s) => {
                    s.len() + 2
                }
                FieldValue::Bytes(b) => b.len() * 4,
                FieldValue::Secret(_) => "[REDACTED]".len() + 2,
                _ => 24,
            };
        }
        size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;

    fn encode(record: &Record) -> String {
        let encoder = JsonEncoder::default();
        let mut buf = Vec::new();
        encoder.encode(record, std::time::UNIX_EPOCH, &mut buf);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn simple_record_shape() {
        let mut r = Record::new(Level::Info, "hello");
        r.add_field(Field::str("k", "v"));
        let out = encode(&r);
        assert_eq!(
            out,
            "{\"ts\":\"1970-01-01T00:00:00.000000000Z\",\"level\":\"info\",\"msg\":\"hello\",\"k\":\"v\"}\n"
        );
    }

    #[test]
    fn secret_field_is_redacted() {
        let mut r = Record::new(Level::Info, "login");
        r.add_field(Field::secret("password", "s3cr3t"));
        let out = encode(&r);
        assert!(out.contains("\"password\":\"[REDACTED]\""));
        assert!(!out.contains("s3cr3t"));
    }

    #[test]
    fn empty_message_is_omitted() {
        let r = Record::new(Level::Info, "");
        let out = encode(&r);
        assert!(!out.contains("\"msg\""));
    }

    #[test]
    fn u64_over_i64_max_becomes_string() {
        let mut r = Record::new(Level::Info, "x");
        r.add_field(Field::u64("big", u64::MAX));
        let out = encode(&r);
        assert!(out.contains(&format!("\"big\":\"{}\"", u64::MAX)));
    }

    #[test]
    fn nan_and_infinities_encode_as_strings() {
        let mut r = Record::new(Level::Info, "x");
        r.add_field(Field::f64("nan", f64::NAN));
        r.add_field(Field::f64("pinf", f64::INFINITY));
        r.add_field(Field::f64("ninf", f64::NEG_INFINITY));
        let out = encode(&r);
        assert!(out.contains("\"nan\":\"NaN\""));
        assert!(out.contains("\"pinf\":\"+Inf\""));
        assert!(out.contains("\"ninf\":\"-Inf\""));
    }

    #[test]
    fn control_characters_are_escaped() {
        let mut r = Record::new(Level::Info, "x");
        r.add_field(Field::str("k", "a\u{0001}b"));
        let out = encode(&r);
        assert!(out.contains("a\\u0001b"));
    }

    #[test]
    fn bytes_encode_as_number_array() {
        let mut r = Record::new(Level::Info, "x");
        r.add_field(Field::bytes("payload", vec![1u8, 2, 255]));
        let out = encode(&r);
        assert!(out.contains("\"payload\":[1,2,255]"));
    }
}
