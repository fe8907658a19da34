//! Basic logging example
//!
//! Run with: cargo run --example basic_usage

use rotalog::{Config, Field, Level};
use std::time::Duration;

fn main() {
    // Debug level prints every severity; records go to the console only
    let config = Config {
        level: Level::Debug,
        encode_as_json: false,
        file_output_enabled: false,
        std_output_disabled: false,
        max_size_mb: 100_000,
        max_backups: 3,
        max_age_days: 7,
        add_caller: true,
        caller_skip: 1,
        directory: "./out/".into(),
        filename: "core.log".to_string(),
        ..Config::default()
    };

    config.init();

    // Libraries logging through `tracing` end up in the same output
    if let Err(e) = rotalog::redirect_tracing() {
        rotalog::warn("tracing bridge unavailable", &[Field::error(&e)]);
    }
    tracing::info!(component = "scheduler", "started through tracing");

    rotalog::debug("[TestDebugMode] HelloWorld!", &[]);

    rotalog::info(
        "request served",
        &[
            Field::str("path", "/health"),
            Field::uint("status", 200),
            Field::duration("elapsed", Duration::from_micros(850)),
        ],
    );
    rotalog::warnf!("{} retries left", 2);
    rotalog::errorw("upstream failed", &["host".into(), "db-1".into(), "attempt".into(), 3.into()]);

    let db = rotalog::logger().named("db").with(&[Field::str("pool", "primary")]);
    db.info("connected", &[]);

    rotalog::sync();
}
