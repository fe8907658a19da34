//! # Rotalog
//!
//! Process-wide structured logging facade with console and rotating-file output.
//!
//! ## Features
//!
//! - **Global Logger**: one active logger, replaced atomically by [`Config::init`]
//! - **Encodings**: tab-separated console text or one JSON object per line
//! - **File Rotation**: size-based rotation with backup count and age limits
//! - **Caller Attribution**: `dir/file.rs:line` of the logical call site
//! - **Severity Control Flow**: `panic*` functions unwind, `fatal*` functions exit
//! - **Tracing Bridge**: route `tracing` events through the active logger
//!
//! ## Quick Start
//!
//! ```no_run
//! use rotalog::{Config, Field, Level};
//!
//! let config = Config {
//!     level: Level::Debug,
//!     file_output_enabled: true,
//!     directory: "./out".into(),
//!     filename: "core.log".to_string(),
//!     max_backups: 3,
//!     max_age_days: 7,
//!     ..Config::default()
//! };
//! config.init();
//!
//! rotalog::debug("hello", &[]);
//! rotalog::info("user signed in", &[Field::str("user", "alice")]);
//! rotalog::infof!("{} jobs queued", 3);
//! rotalog::infow("cache miss", &["key".into(), "session:42".into()]);
//! ```

pub mod bridge;
pub mod caller;
pub mod config;
pub mod encoder;
pub mod field;
pub mod global;
pub mod level;
pub mod logger;
pub mod rotation;
pub mod sink;

mod macros;
mod sugar;

pub use bridge::{redirect_tracing, FacadeLayer};
pub use caller::{CallSite, Caller};
pub use config::Config;
pub use encoder::{ConsoleEncoder, Encoder, EncoderConfig, JsonEncoder};
pub use field::Field;
pub use global::*;
pub use level::{Disposition, Level};
pub use logger::Logger;
pub use rotation::{RotatingFile, RotationPolicy};
pub use sink::{Discard, FanOut, LockedWriter, MemorySink, Sink, StdoutSink};

pub use serde_json::Value;

/// Result type for logging setup operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while assembling a logger
///
/// Emitting records never returns these; they only come out of configuration
/// and sink construction.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    #[error("Config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Config serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Tracing bridge error: {message}")]
    Bridge { message: String },
}
