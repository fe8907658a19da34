//! Record encoders
//!
//! Both encoders share one [`EncoderConfig`] so console and JSON output carry
//! the same metadata under the same names. Every record is encoded into a
//! single buffer ending in a newline, which the sinks write in one call.

use crate::{caller::Caller, field::Field, level::Level};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::io::Write;

/// ISO-8601 with milliseconds and numeric offset
pub const ISO8601_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Metadata of one record, independent of its fields
#[derive(Debug, Clone)]
pub struct Entry<'a> {
    pub level: Level,
    pub time: DateTime<Local>,
    pub logger_name: Option<&'a str>,
    pub caller: Option<Caller>,
    pub message: &'a str,
}

/// Key names and time layout shared by the encoders
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    pub time_key: &'static str,
    pub level_key: &'static str,
    pub name_key: &'static str,
    pub caller_key: &'static str,
    pub message_key: &'static str,
    pub time_format: &'static str,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            time_key: "@timestamp",
            level_key: "level",
            name_key: "logger",
            caller_key: "caller",
            message_key: "msg",
            time_format: ISO8601_FORMAT,
        }
    }
}

/// Turns an entry and its fields into bytes
pub trait Encoder: Send + Sync {
    /// Append one newline-terminated record to `buf`
    ///
    /// `context` holds fields accumulated on the logger, `fields` the ones
    /// passed at the call site.
    fn encode(&self, entry: &Entry<'_>, context: &[Field], fields: &[Field], buf: &mut Vec<u8>);
}

/// One JSON object per line
#[derive(Debug, Clone, Default)]
pub struct JsonEncoder {
    config: EncoderConfig,
}

impl JsonEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }
}

impl Encoder for JsonEncoder {
    fn encode(&self, entry: &Entry<'_>, context: &[Field], fields: &[Field], buf: &mut Vec<u8>) {
        let mut object = ObjectWriter::new(buf);

        object.entry(self.config.level_key, entry.level.as_str());
        object.entry(
            self.config.time_key,
            &entry.time.format(self.config.time_format).to_string(),
        );
        if let Some(name) = entry.logger_name {
            object.entry(self.config.name_key, name);
        }
        if let Some(caller) = entry.caller {
            object.entry(self.config.caller_key, &caller.short());
        }
        object.entry(self.config.message_key, entry.message);

        for field in context.iter().chain(fields) {
            object.entry(&field.key, &field.value);
        }

        object.finish();
        buf.push(b'\n');
    }
}

/// Tab-separated text for humans, trailing fields as a JSON object
#[derive(Debug, Clone, Default)]
pub struct ConsoleEncoder {
    config: EncoderConfig,
}

impl ConsoleEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }
}

impl Encoder for ConsoleEncoder {
    fn encode(&self, entry: &Entry<'_>, context: &[Field], fields: &[Field], buf: &mut Vec<u8>) {
        let _ = write!(buf, "{}", entry.time.format(self.config.time_format));
        buf.push(b'\t');
        buf.extend_from_slice(entry.level.as_str().as_bytes());

        if let Some(name) = entry.logger_name {
            buf.push(b'\t');
            buf.extend_from_slice(name.as_bytes());
        }
        if let Some(caller) = entry.caller {
            let _ = write!(buf, "\t{}", caller);
        }

        buf.push(b'\t');
        buf.extend_from_slice(entry.message.as_bytes());

        if !context.is_empty() || !fields.is_empty() {
            buf.push(b'\t');
            let mut object = ObjectWriter::new(buf);
            for field in context.iter().chain(fields) {
                object.entry(&field.key, &field.value);
            }
            object.finish();
        }

        buf.push(b'\n');
    }
}

/// Writes a JSON object key by key, keeping insertion order
struct ObjectWriter<'a> {
    buf: &'a mut Vec<u8>,
    first: bool,
}

impl<'a> ObjectWriter<'a> {
    fn new(buf: &'a mut Vec<u8>) -> Self {
        buf.push(b'{');
        Self { buf, first: true }
    }

    fn entry<V: Serialize + ?Sized>(&mut self, key: &str, value: &V) {
        if !self.first {
            self.buf.push(b',');
        }
        self.first = false;
        write_json(self.buf, key);
        self.buf.push(b':');
        write_json(self.buf, value);
    }

    fn finish(self) {
        self.buf.push(b'}');
    }
}

fn write_json<V: Serialize + ?Sized>(buf: &mut Vec<u8>, value: &V) {
    let mark = buf.len();
    if serde_json::to_writer(&mut *buf, value).is_err() {
        buf.truncate(mark);
        buf.extend_from_slice(b"null");
    }
}
