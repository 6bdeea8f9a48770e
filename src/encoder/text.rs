use super::{format_rfc3339_nanos, Encoder};
use crate::field::{Field, FieldValue};
use crate::level::Level;
use crate::record::Record;
use std::fmt::Write as _;
use std::time::SystemTime;

/// Line-oriented `key=value` console encoder (spec §4.6, "Console/Text
/// encoder").
#[derive(Default)]
pub struct TextEncoder {
    /// ANSI color codes wrapped around the level token only; never applied
    /// to any payload. `None` disables coloring.
    pub color: bool,
}

fn level_color_codes(level: Level) -> (&'static str, &'static str) {
    let code = match level {
        Level::Debug => "\x1b[36m",
        Level::Info => "\x1b[32m",
        Level::Warn => "\x1b[33m",
        Level::Error | Level::DPanic => "\x1b[31m",
        Level::Panic | Level::Fatal => "\x1b[1;31m",
    };
    (code, "\x1b[0m")
}

fn needs_quoting(s: &str) -> bool {
    s.is_empty()
        || s.bytes().any(|b| {
            b == b' '
                || b == b'\t'
                || b == b'"'
                || b == b'\\'
                || b == b'='
                || b < 0x20
                || b == 0x7f
        })
}

fn write_value_str(out: &mut Vec<u8>, s: &str) {
    if needs_quoting(s) {
        out.push(b'"');
        for c in s.chars() {
            match c {
                '"' => out.extend_from_slice(b"\\\""),
                '\\' => out.extend_from_slice(b"\\\\"),
                '\n' => out.extend_from_slice(b"\\n"),
                '\t' => out.extend_from_slice(b"\\t"),
                '\r' => out.extend_from_slice(b"\\r"),
                c => {
                    let mut buf = [0u8; 4];
                    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                }
            }
        }
        out.push(b'"');
    } else {
        out.extend_from_slice(s.as_bytes());
    }
}

/// Sanitizes a field key to `[A-Za-z0-9_.-]`, falling back to
/// `invalid_key` when nothing survives.
fn is_valid_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-'
}

fn sanitize_key(key: &str, out: &mut String) {
    out.clear();
    if key.is_empty() || !key.chars().any(is_valid_key_char) {
        out.push_str("invalid_key");
        return;
    }
    for c in key.chars() {
        out.push(if is_valid_key_char(c) { c } else { '_' });
    }
}

fn write_field_value(out: &mut Vec<u8>, value: &FieldValue) {
    match value {
        FieldValue::Str(s) => write_value_str(out, s),
        FieldValue::I64(v, _) => {
            let _ = write!(Writer(out), "{v}");
        }
        FieldValue::U64(v, _) => {
            let _ = write!(Writer(out), "{v}");
        }
        FieldValue::F64(v) => {
            if v.is_nan() {
                out.extend_from_slice(b"NaN");
            } else if v.is_infinite() {
                out.extend_from_slice(if *v > 0.0 { b"+Inf" } else { b"-Inf" });
            } else {
                let _ = write!(Writer(out), "{v}");
            }
        }
        FieldValue::Bool(v) => out.extend_from_slice(if *v { b"true" } else { b"false" }),
        FieldValue::DurationNs(v) => {
            let _ = write!(Writer(out), "{v}ns");
        }
        FieldValue::TimeUnixNs(nanos) => {
            let t = if *nanos >= 0 {
                std::time::UNIX_EPOCH + std::time::Duration::from_nanos(*nanos as u64)
            } else {
                std::time::UNIX_EPOCH - std::time::Duration::from_nanos((-*nanos) as u64)
            };
            let mut s = String::new();
            format_rfc3339_nanos(t, &mut s);
            write_value_str(out, &s);
        }
        FieldValue::Bytes(b) => {
            let _ = write!(Writer(out), "{}bytes", b.len());
        }
        FieldValue::Error(s) | FieldValue::Stringer(s) => write_value_str(out, s),
        FieldValue::Object(obj) => {
            let mut formatted = String::new();
            let ok = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                obj.format(&mut formatted);
            }))
            .is_ok();
            if ok && !formatted.is_empty() {
                write_value_str(out, &formatted);
            } else {
                write_value_str(out, crate::field::OBJECT_PLACEHOLDER);
            }
        }
        FieldValue::Secret(_) => out.extend_from_slice(b"\"[REDACTED]\""),
    }
}

struct Writer<'a>(&'a mut Vec<u8>);
impl std::fmt::Write for Writer<'_> {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.0.extend_from_slice(s.as_bytes());
        Ok(())
    }
}

impl Encoder for TextEncoder {
    fn encode(&self, record: &Record, now: SystemTime, out: &mut Vec<u8>) {
        out.extend_from_slice(b"time=");
        let mut ts = String::new();
        format_rfc3339_nanos(now, &mut ts);
        write_value_str(out, &ts);

        out.extend_from_slice(b" level=");
        if self.color {
            let (prefix, suffix) = level_color_codes(record.level);
            out.extend_from_slice(prefix.as_bytes());
            out.extend_from_slice(record.level.name().as_bytes());
            out.extend_from_slice(suffix.as_bytes());
        } else {
            out.extend_from_slice(record.level.name().as_bytes());
        }

        if !record.message.is_empty() {
            out.extend_from_slice(b" msg=");
            write_value_str(out, &record.message);
        }

        if !record.logger.is_empty() {
            out.extend_from_slice(b" logger=");
            write_value_str(out, &record.logger);
        }

        if let Some(caller) = &record.caller {
            out.extend_from_slice(b" caller=");
            write_value_str(out, caller);
        }

        let mut key_buf = String::new();
        for field in record.fields() {
            out.push(b' ');
            sanitize_key(&field.key, &mut key_buf);
            out.extend_from_slice(key_buf.as_bytes());
            out.push(b'=');
            write_field_value(out, &field.value);
        }

        out.push(b'\n');

        if let Some(stack) = &record.stack {
            for line in stack.split('\n') {
                out.extend_from_slice(b"  ");
                out.extend_from_slice(line.as_bytes());
                out.push(b'\n');
            }
        }
    }

    fn estimated_size(&self, record: &Record) -> usize {
        let mut size = 48 + record.message.len();
        if let Some(c) = &record.caller {
            size += c.len() + 8;
        }
        if let Some(s) = &record.stack {
            size += s.len() + s.lines().count() * 2;
        }
        for field in record.fields() {
            size += field.key.len() + 2;
            size += match &field.value {
                FieldValue::Str(s) | FieldValue::Error(s) | FieldValue::Stringer(s) => {
                    s.len() + 2
                }
                FieldValue::Secret(_) => "\"[REDACTED]\"".len(),
                _ => 16,
            };
        }
        size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(record: &Record) -> String {
        let encoder = TextEncoder::default();
        let mut buf = Vec::new();
        encoder.encode(record, std::time::UNIX_EPOCH, &mut buf);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn simple_shape() {
        let mut r = Record::new(Level::Info, "hello");
        r.add_field(Field::str("k", "v"));
        let out = encode(&r);
        assert_eq!(
            out,
            "time=1970-01-01T00:00:00.000000000Z level=info msg=hello k=v\n"
        );
    }

    #[test]
    fn values_with_spaces_are_quoted() {
        let mut r = Record::new(Level::Info, "hi there");
        let out = encode(&r);
        assert!(out.contains("msg=\"hi there\""));
    }

    #[test]
    fn invalid_keys_are_sanitized() {
        let mut r = Record::new(Level::Info, "x");
        r.add_field(Field::str("weird key!", "v"));
        let out = encode(&r);
        assert!(out.contains("weird_key_=v"));
    }

    #[test]
    fn fully_invalid_key_falls_back() {
        let mut r = Record::new(Level::Info, "x");
        r.add_field(Field::str("!!!", "v"));
        let out = encode(&r);
        assert!(out.contains("invalid_key=v"));
    }

    #[test]
    fn secret_renders_redacted() {
        let mut r = Record::new(Level::Info, "x");
        r.add_field(Field::secret("password", "s3cr3t"));
        let out = encode(&r);
        assert!(out.contains("password=\"[REDACTED]\""));
        assert!(!out.contains("s3cr3t"));
    }

    #[test]
    fn stack_lines_are_indented() {
        let mut r = Record::new(Level::Error, "boom");
        r.stack = Some("frame0\nframe1".to_string());
        let out = encode(&r);
        assert!(out.contains("\n  frame0\n  frame1\n"));
    }
}
