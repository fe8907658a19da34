//! Logging configuration and installation of the process-wide logger

use crate::{
    field::Field,
    global,
    level::Level,
    logger::Logger,
    rotation::{RotatingFile, RotationPolicy, DEFAULT_MAX_SIZE_MB},
    sink::{FanOut, Sink, StdoutSink},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything needed to build the process-wide logger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Minimum severity that is written
    pub level: Level,

    /// JSON records instead of tab-separated console text
    pub encode_as_json: bool,

    /// Suppress the console sink
    pub std_output_disabled: bool,

    /// Enable the rotating file sink
    pub file_output_enabled: bool,

    /// Directory of the log file, created on init
    pub directory: PathBuf,

    /// Log file name relative to `directory`, may include subdirectories;
    /// empty means `<executable>.log`
    pub filename: String,

    /// Rotate once the file would exceed this many megabytes (0 means 100)
    pub max_size_mb: u64,

    /// Rotated files to keep (0 keeps all)
    pub max_backups: usize,

    /// Delete rotated files older than this many days (0 disables)
    pub max_age_days: u64,

    /// Attribute records to their call site
    pub add_caller: bool,

    /// Frames skipped when attributing, counted from the innermost frame
    ///
    /// 0 reports the facade function, 1 the code that called it. Larger values
    /// stop at the code that called the facade; wrappers that should be skipped
    /// need `#[track_caller]` so the location passes through them.
    pub caller_skip: usize,

    /// Gzip rotated files
    pub compress: bool,

    /// Use local time in rotated file names
    pub local_time: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: Level::Info,
            encode_as_json: false,
            std_output_disabled: false,
            file_output_enabled: false,
            directory: PathBuf::from("logs"),
            filename: String::new(),
            max_size_mb: DEFAULT_MAX_SIZE_MB,
            max_backups: 0,
            max_age_days: 0,
            add_caller: true,
            caller_skip: 1,
            compress: false,
            local_time: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then apply environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.load_env_overrides();
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load environment variable overrides
    pub fn load_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("ROTALOG_LEVEL") {
            self.level = level.parse().unwrap_or(self.level);
        }

        if let Ok(format) = std::env::var("ROTALOG_FORMAT") {
            self.encode_as_json = match format.to_lowercase().as_str() {
                "json" => true,
                "console" | "text" => false,
                _ => self.encode_as_json,
            };
        }

        if let Ok(enabled) = std::env::var("ROTALOG_STDOUT") {
            self.std_output_disabled = enabled
                .parse::<bool>()
                .map(|enabled| !enabled)
                .unwrap_or(self.std_output_disabled);
        }

        if let Ok(enabled) = std::env::var("ROTALOG_FILE_OUTPUT") {
            self.file_output_enabled = enabled.parse().unwrap_or(self.file_output_enabled);
        }

        if let Ok(dir) = std::env::var("ROTALOG_DIR") {
            self.directory = PathBuf::from(dir);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.file_output_enabled && !self.filename.is_empty() {
            let names_a_file = !self.filename.ends_with(['/', '\\'])
                && Path::new(&self.filename)
                    .file_name()
                    .is_some_and(|name| name.to_str().is_some());
            if !names_a_file {
                return Err(Error::Config {
                    message: format!("filename '{}' does not name a file", self.filename),
                });
            }
        }

        Ok(())
    }

    pub fn rotation_policy(&self) -> RotationPolicy {
        RotationPolicy::new(self.max_size_mb, self.max_age_days, self.max_backups)
            .with_compression(self.compress)
            .with_local_time(self.local_time)
    }

    /// Open every enabled sink and combine them into one destination
    pub fn build_sink(&self) -> Result<Arc<dyn Sink>> {
        let mut sinks: Vec<Arc<dyn Sink>> = Vec::new();

        if !self.std_output_disabled {
            sinks.push(Arc::new(StdoutSink));
        }

        if self.file_output_enabled {
            let file = RotatingFile::open(&self.directory, &self.filename, self.rotation_policy())?;
            sinks.push(Arc::new(file));
        }

        Ok(FanOut::new(sinks).into_sink())
    }

    /// Build a logger for this configuration without installing it
    pub fn build_logger(&self) -> Result<Logger> {
        self.validate()?;
        Ok(Logger::build(self, self.build_sink()?))
    }

    /// Install a logger built from this configuration as the process-wide logger
    ///
    /// On failure the previous logger stays installed and the error is returned.
    pub fn try_init(&self) -> Result<()> {
        let logger = Arc::new(self.build_logger()?);
        global::replace_logger(Arc::clone(&logger));

        logger.info("logging configured", &self.summary_fields());
        Ok(())
    }

    /// Install a logger built from this configuration as the process-wide logger
    ///
    /// Aborts the process when the sinks cannot be opened, after reporting the
    /// failure through the logger that is still installed.
    pub fn init(&self) {
        if let Err(e) = self.try_init() {
            let previous = global::logger();
            previous.error(
                "failed to initialize logging",
                &[
                    Field::error(&e),
                    Field::display("path", self.directory.display()),
                ],
            );
            let _ = previous.sync();
            std::process::abort();
        }
    }

    /// Every setting, as fields of the summary record
    pub fn summary_fields(&self) -> Vec<Field> {
        vec![
            Field::str("level", self.level.as_str()),
            Field::bool("std_output", !self.std_output_disabled),
            Field::bool("file_output", self.file_output_enabled),
            Field::bool("json_output", self.encode_as_json),
            Field::display("log_directory", self.directory.display()),
            Field::str("file_name", self.filename.clone()),
            Field::uint("max_size_mb", self.max_size_mb),
            Field::uint("max_backups", self.max_backups as u64),
            Field::uint("max_age_days", self.max_age_days),
            Field::bool("add_caller", self.add_caller),
            Field::uint("caller_skip", self.caller_skip as u64),
            Field::bool("compress", self.compress),
            Field::bool("local_time", self.local_time),
        ]
    }
}
