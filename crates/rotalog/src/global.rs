//! Process-wide logger and the free functions that forward to it
//!
//! A default logger (info level, console output, caller attribution) is
//! available from the first call. [`Config::init`](crate::Config::init) or
//! [`replace_logger`] swaps it atomically; calls in flight keep using the
//! logger they loaded.
//!
//! Every severity comes in three forms:
//!
//! - `info(msg, &[Field])` with typed fields
//! - `infof(format_args!(..))`, usually through the `infof!` macro
//! - `infow(msg, &[k1, v1, k2, v2])` with alternating keys and values

use crate::{
    caller::{CallSite, Caller},
    config::Config,
    field::Field,
    level::{Disposition, Level},
    logger::{format_message, report_write_error, Logger},
    sink::StdoutSink,
};
use arc_swap::ArcSwap;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, LazyLock};

static ACTIVE: LazyLock<ArcSwap<Logger>> = LazyLock::new(|| {
    ArcSwap::from_pointee(Logger::build(&Config::default(), Arc::new(StdoutSink)))
});

/// The currently installed logger
pub fn logger() -> Arc<Logger> {
    ACTIVE.load_full()
}

/// Install `logger` process-wide and return the one it replaced
pub fn replace_logger(logger: impl Into<Arc<Logger>>) -> Arc<Logger> {
    ACTIVE.swap(logger.into())
}

/// Flush the installed logger's sinks
///
/// Failures are reported on stderr like failed writes.
pub fn sync() {
    if let Err(e) = ACTIVE.load().sync() {
        report_write_error(&e);
    }
}

// The forwarding helpers are not `#[track_caller]`, so `Caller::here()` inside
// them is the facade's own frame. A caller skip of 0 lands there.

fn forward(level: Level, message: &str, fields: &[Field], site: CallSite) -> Disposition {
    ACTIVE
        .load()
        .emit(level, message, fields, site.through(Caller::here()))
}

fn forward_f(level: Level, args: fmt::Arguments<'_>, site: CallSite) -> Disposition {
    let logger = ACTIVE.load();
    if !logger.enabled(level) && level.disposition() == Disposition::Continue {
        return Disposition::Continue;
    }
    let message = format_message(args);
    logger.emit(level, &message, &[], site.through(Caller::here()))
}

fn forward_w(level: Level, message: &str, keys_and_values: &[Value], site: CallSite) -> Disposition {
    ACTIVE
        .load()
        .emit_sweetened(level, message, keys_and_values, site.through(Caller::here()))
}

/// Logs a message at debug level with structured fields.
#[track_caller]
pub fn debug(message: &str, fields: &[Field]) {
    forward(Level::Debug, message, fields, CallSite::here());
}

/// Logs a formatted message at debug level.
#[track_caller]
pub fn debugf(args: fmt::Arguments<'_>) {
    forward_f(Level::Debug, args, CallSite::here());
}

/// Logs a message at debug level with alternating keys and values.
#[track_caller]
pub fn debugw(message: &str, keys_and_values: &[Value]) {
    forward_w(Level::Debug, message, keys_and_values, CallSite::here());
}

/// Logs a message at info level with structured fields.
#[track_caller]
pub fn info(message: &str, fields: &[Field]) {
    forward(Level::Info, message, fields, CallSite::here());
}

/// Logs a formatted message at info level.
#[track_caller]
pub fn infof(args: fmt::Arguments<'_>) {
    forward_f(Level::Info, args, CallSite::here());
}

/// Logs a message at info level with alternating keys and values.
#[track_caller]
pub fn infow(message: &str, keys_and_values: &[Value]) {
    forward_w(Level::Info, message, keys_and_values, CallSite::here());
}

/// Logs a message at warn level with structured fields.
#[track_caller]
pub fn warn(message: &str, fields: &[Field]) {
    forward(Level::Warn, message, fields, CallSite::here());
}

/// Logs a formatted message at warn level.
#[track_caller]
pub fn warnf(args: fmt::Arguments<'_>) {
    forward_f(Level::Warn, args, CallSite::here());
}

/// Logs a message at warn level with alternating keys and values.
#[track_caller]
pub fn warnw(message: &str, keys_and_values: &[Value]) {
    forward_w(Level::Warn, message, keys_and_values, CallSite::here());
}

/// Logs a message at error level with structured fields.
#[track_caller]
pub fn error(message: &str, fields: &[Field]) {
    forward(Level::Error, message, fields, CallSite::here());
}

/// Logs a formatted message at error level.
#[track_caller]
pub fn errorf(args: fmt::Arguments<'_>) {
    forward_f(Level::Error, args, CallSite::here());
}

/// Logs a message at error level with alternating keys and values.
#[track_caller]
pub fn errorw(message: &str, keys_and_values: &[Value]) {
    forward_w(Level::Error, message, keys_and_values, CallSite::here());
}

/// Logs a message at panic level, then panics.
///
/// The panic happens even when the record itself is filtered out.
#[track_caller]
pub fn panic(message: &str, fields: &[Field]) -> ! {
    forward(Level::Panic, message, fields, CallSite::here());
    panic!("{}", message)
}

/// Logs a formatted message at panic level, then panics.
#[track_caller]
pub fn panicf(args: fmt::Arguments<'_>) -> ! {
    let message = format_message(args);
    forward(Level::Panic, &message, &[], CallSite::here());
    panic!("{}", message)
}

/// Logs a message with alternating keys and values at panic level, then panics.
#[track_caller]
pub fn panicw(message: &str, keys_and_values: &[Value]) -> ! {
    forward_w(Level::Panic, message, keys_and_values, CallSite::here());
    panic!("{}", message)
}

/// Logs a message at fatal level, then exits the process with status 1.
///
/// The exit happens even when the record itself is filtered out. No
/// destructors run.
#[track_caller]
pub fn fatal(message: &str, fields: &[Field]) -> ! {
    forward(Level::Fatal, message, fields, CallSite::here());
    std::process::exit(1)
}

/// Logs a formatted message at fatal level, then exits with status 1.
#[track_caller]
pub fn fatalf(args: fmt::Arguments<'_>) -> ! {
    forward_f(Level::Fatal, args, CallSite::here());
    std::process::exit(1)
}

/// Logs a message with alternating keys and values at fatal level, then exits
/// with status 1.
#[track_caller]
pub fn fatalw(message: &str, keys_and_values: &[Value]) -> ! {
    forward_w(Level::Fatal, message, keys_and_values, CallSite::here());
    std::process::exit(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use serde_json::json;
    use serial_test::serial;

    fn capture(config: Config) -> MemorySink {
        let memory = MemorySink::new();
        replace_logger(Logger::build(&config, Arc::new(memory.clone())));
        memory
    }

    fn records(memory: &MemorySink) -> Vec<Value> {
        memory
            .lines()
            .iter()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    fn json_config(level: Level) -> Config {
        Config {
            level,
            encode_as_json: true,
            ..Config::default()
        }
    }

    #[test]
    #[serial]
    fn test_facade_attributes_logical_caller() {
        let memory = capture(json_config(Level::Debug));

        let line = line!() + 1;
        info("from the test", &[]);

        let caller = records(&memory)[0]["caller"].as_str().unwrap().to_string();
        assert_eq!(caller, format!("src/global.rs:{}", line));
    }

    #[test]
    #[serial]
    fn test_caller_skip_zero_blames_facade() {
        let memory = capture(Config {
            caller_skip: 0,
            ..json_config(Level::Debug)
        });

        let line = line!() + 1;
        info("from the test", &[]);

        let caller = records(&memory)[0]["caller"].as_str().unwrap().to_string();
        assert!(caller.starts_with("src/global.rs:"));
        assert_ne!(caller, format!("src/global.rs:{}", line));
    }

    #[test]
    #[serial]
    fn test_large_skip_stops_at_tracked_wrapper_caller() {
        #[track_caller]
        fn audit(message: &str) {
            warn(message, &[]);
        }

        let memory = capture(Config {
            caller_skip: 2,
            ..json_config(Level::Debug)
        });

        let line = line!() + 1;
        audit("through a wrapper");

        let caller = records(&memory)[0]["caller"].as_str().unwrap().to_string();
        assert_eq!(caller, format!("src/global.rs:{}", line));
    }

    #[test]
    #[serial]
    fn test_every_variant_forwards() {
        let memory = capture(json_config(Level::Debug));

        debug("d", &[Field::int("n", 1)]);
        debugf(format_args!("d{}", 2));
        debugw("d", &["n".into(), 3.into()]);
        info("i", &[]);
        infof(format_args!("i{}", 2));
        infow("i", &[]);
        warn("w", &[]);
        warnf(format_args!("w{}", 2));
        warnw("w", &[]);
        error("e", &[]);
        errorf(format_args!("e{}", 2));
        errorw("e", &[]);

        let records = records(&memory);
        let levels: Vec<&str> = records.iter().map(|r| r["level"].as_str().unwrap()).collect();
        assert_eq!(
            levels,
            vec![
                "debug", "debug", "debug", "info", "info", "info", "warn", "warn", "warn", "error",
                "error", "error"
            ]
        );
        assert_eq!(records[1]["msg"], json!("d2"));
        assert_eq!(records[2]["n"], json!(3));
    }

    #[test]
    #[serial]
    fn test_panic_variants_unwind() {
        let memory = capture(json_config(Level::Info));

        let plain = std::panic::catch_unwind(|| panic("plain", &[]));
        let formatted = std::panic::catch_unwind(|| panicf(format_args!("formatted {}", 1)));
        let keyed = std::panic::catch_unwind(|| panicw("keyed", &["k".into(), "v".into()]));

        assert!(plain.is_err() && formatted.is_err() && keyed.is_err());
        let messages: Vec<String> = records(&memory)
            .iter()
            .map(|r| r["msg"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(messages, vec!["plain", "formatted 1", "keyed"]);
    }

    #[test]
    #[serial]
    fn test_panic_variants_unwind_when_filtered() {
        let memory = capture(json_config(Level::Fatal));

        let plain = std::panic::catch_unwind(|| panic("plain", &[]));
        let formatted = std::panic::catch_unwind(|| panicf(format_args!("formatted {}", 1)));
        let keyed = std::panic::catch_unwind(|| panicw("keyed", &["k".into(), "v".into()]));

        assert!(plain.is_err() && formatted.is_err() && keyed.is_err());
        assert!(memory.contents().is_empty());
    }

    #[test]
    #[serial]
    fn test_sync_failure_does_not_surface() {
        struct UnflushableSink;

        impl crate::sink::Sink for UnflushableSink {
            fn write_record(&self, _record: &[u8]) -> std::io::Result<()> {
                Ok(())
            }

            fn sync(&self) -> std::io::Result<()> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "device gone"))
            }
        }

        replace_logger(Logger::build(&json_config(Level::Info), Arc::new(UnflushableSink)));
        sync();
        info("still usable", &[]);
    }

    #[test]
    #[serial]
    fn test_replace_returns_previous() {
        let first = capture(json_config(Level::Info));
        let previous = replace_logger(Logger::build(
            &json_config(Level::Error),
            Arc::new(MemorySink::new()),
        ));
        assert_eq!(previous.level(), Level::Info);
        assert_eq!(logger().level(), Level::Error);

        info("goes nowhere", &[]);
        assert!(first.contents().is_empty());
    }
}
