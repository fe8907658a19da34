//! Concrete logger: level filter, caller attribution, encoder and sink

use crate::{
    caller::CallSite,
    config::Config,
    encoder::{ConsoleEncoder, Encoder, Entry, JsonEncoder},
    field::Field,
    level::{Disposition, Level},
    sink::Sink,
    sugar,
};
use chrono::Local;
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::io;
use std::sync::Arc;

/// A configured logger
///
/// Cheap to clone; clones share the encoder and sink. Records below the
/// logger's level are dropped before they are encoded.
#[derive(Clone)]
pub struct Logger {
    encoder: Arc<dyn Encoder>,
    sink: Arc<dyn Sink>,
    level: Level,
    add_caller: bool,
    caller_skip: usize,
    name: Option<String>,
    context: Vec<Field>,
}

impl Logger {
    /// Assemble a logger from a configuration and an already opened destination
    pub fn build(config: &Config, sink: Arc<dyn Sink>) -> Self {
        let encoder: Arc<dyn Encoder> = if config.encode_as_json {
            Arc::new(JsonEncoder::default())
        } else {
            Arc::new(ConsoleEncoder::default())
        };

        Self::new(encoder, sink, config.level).with_caller(config.add_caller, config.caller_skip)
    }

    pub fn new(encoder: Arc<dyn Encoder>, sink: Arc<dyn Sink>, level: Level) -> Self {
        Self {
            encoder,
            sink,
            level,
            add_caller: false,
            caller_skip: 0,
            name: None,
            context: Vec::new(),
        }
    }

    /// Enable or disable caller attribution and set how many frames to skip
    pub fn with_caller(mut self, add_caller: bool, caller_skip: usize) -> Self {
        self.add_caller = add_caller;
        self.caller_skip = caller_skip;
        self
    }

    /// A child logger whose name is appended to this one's with a dot
    pub fn named(&self, name: &str) -> Self {
        let mut child = self.clone();
        child.name = Some(match &self.name {
            Some(parent) if !name.is_empty() => format!("{}.{}", parent, name),
            Some(parent) => parent.clone(),
            None => name.to_string(),
        });
        child
    }

    /// A child logger that adds `fields` to every record
    pub fn with(&self, fields: &[Field]) -> Self {
        let mut child = self.clone();
        child.context.extend_from_slice(fields);
        child
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level
    }

    /// Flush the underlying sinks
    pub fn sync(&self) -> io::Result<()> {
        self.sink.sync()
    }

    /// Write one record and report what the caller must do next
    ///
    /// Records that end execution are flushed before returning, so the
    /// caller can unwind or exit right away.
    pub fn emit(&self, level: Level, message: &str, fields: &[Field], site: CallSite) -> Disposition {
        if self.enabled(level) {
            let entry = Entry {
                level,
                time: Local::now(),
                logger_name: self.name.as_deref(),
                caller: self.add_caller.then(|| site.resolve(self.caller_skip)),
                message,
            };

            let mut buf = Vec::with_capacity(256);
            self.encoder.encode(&entry, &self.context, fields, &mut buf);
            if let Err(e) = self.sink.write_record(&buf) {
                report_write_error(&e);
            }
        }

        let disposition = level.disposition();
        if disposition != Disposition::Continue {
            if let Err(e) = self.sink.sync() {
                report_write_error(&e);
            }
        }
        disposition
    }

    /// Like [`emit`](Self::emit) with alternating key/value pairs
    ///
    /// Pairs that cannot become fields are reported in separate error records
    /// written before the main one.
    pub fn emit_sweetened(
        &self,
        level: Level,
        message: &str,
        keys_and_values: &[Value],
        site: CallSite,
    ) -> Disposition {
        if !self.enabled(level) && level.disposition() == Disposition::Continue {
            return Disposition::Continue;
        }

        let sweetened = sugar::sweeten(keys_and_values);
        for problem in &sweetened.problems {
            self.emit(Level::Error, problem.message, &problem.fields, site);
        }
        self.emit(level, message, &sweetened.fields, site)
    }

    #[track_caller]
    pub fn debug(&self, message: &str, fields: &[Field]) {
        self.emit(Level::Debug, message, fields, CallSite::here());
    }

    #[track_caller]
    pub fn info(&self, message: &str, fields: &[Field]) {
        self.emit(Level::Info, message, fields, CallSite::here());
    }

    #[track_caller]
    pub fn warn(&self, message: &str, fields: &[Field]) {
        self.emit(Level::Warn, message, fields, CallSite::here());
    }

    #[track_caller]
    pub fn error(&self, message: &str, fields: &[Field]) {
        self.emit(Level::Error, message, fields, CallSite::here());
    }

    /// Logs at panic level, then panics even if the record was filtered
    #[track_caller]
    pub fn panic(&self, message: &str, fields: &[Field]) -> ! {
        self.emit(Level::Panic, message, fields, CallSite::here());
        panic!("{}", message)
    }

    /// Logs at fatal level, then exits the process with status 1
    #[track_caller]
    pub fn fatal(&self, message: &str, fields: &[Field]) -> ! {
        self.emit(Level::Fatal, message, fields, CallSite::here());
        std::process::exit(1)
    }

    /// Log at any level, honoring the level's control flow
    #[track_caller]
    pub fn log(&self, level: Level, message: &str, fields: &[Field]) {
        let disposition = self.emit(level, message, fields, CallSite::here());
        conclude(disposition, message);
    }

    /// Log a formatted message; formatting is skipped for filtered records
    #[track_caller]
    pub fn logf(&self, level: Level, args: fmt::Arguments<'_>) {
        if !self.enabled(level) && level.disposition() == Disposition::Continue {
            return;
        }
        let message = format_message(args);
        let disposition = self.emit(level, &message, &[], CallSite::here());
        conclude(disposition, &message);
    }

    /// Log with alternating key/value pairs
    #[track_caller]
    pub fn logw(&self, level: Level, message: &str, keys_and_values: &[Value]) {
        let disposition = self.emit_sweetened(level, message, keys_and_values, CallSite::here());
        conclude(disposition, message);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level)
            .field("name", &self.name)
            .field("add_caller", &self.add_caller)
            .field("caller_skip", &self.caller_skip)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Act on a disposition returned by [`Logger::emit`]
#[track_caller]
pub fn conclude(disposition: Disposition, message: &str) {
    match disposition {
        Disposition::Continue => {}
        Disposition::Unwind => panic!("{}", message),
        Disposition::Terminate => std::process::exit(1),
    }
}

pub(crate) fn format_message(args: fmt::Arguments<'_>) -> Cow<'static, str> {
    match args.as_str() {
        Some(s) => Cow::Borrowed(s),
        None => Cow::Owned(args.to_string()),
    }
}

pub(crate) fn report_write_error(err: &io::Error) {
    eprintln!(
        "{} rotalog write error: {}",
        Local::now().format(crate::encoder::ISO8601_FORMAT),
        err
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use serde_json::json;

    fn json_logger(level: Level) -> (Logger, MemorySink) {
        let memory = MemorySink::new();
        let config = Config {
            level,
            encode_as_json: true,
            ..Config::default()
        };
        (Logger::build(&config, Arc::new(memory.clone())), memory)
    }

    fn records(memory: &MemorySink) -> Vec<Value> {
        memory
            .lines()
            .iter()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_level_filtering() {
        let (logger, memory) = json_logger(Level::Warn);

        logger.debug("dropped", &[]);
        logger.info("dropped", &[]);
        logger.warn("kept", &[]);
        logger.error("kept", &[]);

        let records = records(&memory);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["level"], json!("warn"));
        assert_eq!(records[1]["level"], json!("error"));
    }

    #[test]
    fn test_caller_points_at_call_site() {
        let (logger, memory) = json_logger(Level::Debug);

        let line = line!() + 1;
        logger.info("here", &[]);

        let caller = records(&memory)[0]["caller"].as_str().unwrap().to_string();
        assert_eq!(caller, format!("src/logger.rs:{}", line));
    }

    #[test]
    fn test_caller_disabled() {
        let memory = MemorySink::new();
        let config = Config {
            encode_as_json: true,
            add_caller: false,
            ..Config::default()
        };
        let logger = Logger::build(&config, Arc::new(memory.clone()));
        logger.info("anonymous", &[]);

        assert!(records(&memory)[0].get("caller").is_none());
    }

    #[test]
    fn test_named_and_context_fields() {
        let (logger, memory) = json_logger(Level::Info);
        let child = logger
            .named("db")
            .named("pool")
            .with(&[Field::str("region", "eu-west")]);

        child.info("connected", &[Field::int("connections", 4)]);
        logger.info("parent untouched", &[]);

        let records = records(&memory);
        assert_eq!(records[0]["logger"], json!("db.pool"));
        assert_eq!(records[0]["region"], json!("eu-west"));
        assert_eq!(records[0]["connections"], json!(4));
        assert!(records[1].get("logger").is_none());
        assert!(records[1].get("region").is_none());
    }

    #[test]
    fn test_logf_formats_message() {
        let (logger, memory) = json_logger(Level::Info);
        logger.logf(Level::Info, format_args!("{} of {} done", 3, 5));
        logger.logf(Level::Debug, format_args!("{}", "filtered"));

        let records = records(&memory);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["msg"], json!("3 of 5 done"));
    }

    #[test]
    fn test_logw_reports_dangling_key() {
        let (logger, memory) = json_logger(Level::Info);
        logger.logw(
            Level::Info,
            "request",
            &["method".into(), "GET".into(), "status".into()],
        );

        let records = records(&memory);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["level"], json!("error"));
        assert_eq!(records[0]["msg"], json!("Ignored key without a value."));
        assert_eq!(records[0]["ignored"], json!("status"));
        assert_eq!(records[1]["method"], json!("GET"));
        assert!(records[1].get("status").is_none());
    }

    #[test]
    fn test_panic_unwinds_after_writing() {
        let (logger, memory) = json_logger(Level::Info);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            logger.panic("invariant broken", &[Field::int("shard", 7)]);
        }));

        let payload = result.unwrap_err();
        assert_eq!(payload.downcast_ref::<String>().unwrap(), "invariant broken");
        let records = records(&memory);
        assert_eq!(records[0]["level"], json!("panic"));
        assert_eq!(records[0]["shard"], json!(7));
    }

    #[test]
    fn test_panic_unwinds_when_filtered() {
        let (logger, memory) = json_logger(Level::Fatal);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            logger.log(Level::Panic, "filtered but fatal to the thread", &[]);
        }));

        assert!(result.is_err());
        assert!(memory.contents().is_empty());
    }

    #[test]
    fn test_emit_returns_disposition() {
        let (logger, _memory) = json_logger(Level::Info);
        let site = CallSite::here();
        assert_eq!(logger.emit(Level::Info, "ok", &[], site), Disposition::Continue);
        assert_eq!(logger.emit(Level::Panic, "boom", &[], site), Disposition::Unwind);
        assert_eq!(logger.emit(Level::Fatal, "bye", &[], site), Disposition::Terminate);
    }
}
