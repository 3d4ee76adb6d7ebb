//! Configuration for refract hosts: a `.refract.toml` in the project root plus `tracing` setup.

use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use refract_frontend::{FrontendError, JsonCompilationDatabase, SourceKinds};
use refract_scheduler::SchedulerConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;

/// Name of the configuration file looked up in the project root.
pub const CONFIG_FILE_NAME: &str = ".refract.toml";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefractConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    #[serde(default)]
    pub project: ProjectConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// A simple level (`info`, `debug`, ...) or `EnvFilter` directives.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,

    #[serde(default = "LoggingConfig::default_stderr")]
    pub stderr: bool,

    /// Append logs to this file. If it cannot be opened the other sinks stay active.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    fn default_stderr() -> bool {
        true
    }

    pub(crate) fn normalize_level_directives(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default_level();
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "trace" => "trace".to_owned(),
            "debug" => "debug".to_owned(),
            "info" => "info".to_owned(),
            "warn" | "warning" => "warn".to_owned(),
            "error" => "error".to_owned(),
            _ => trimmed.to_owned(),
        }
    }

    fn config_env_filter(&self) -> tracing_subscriber::EnvFilter {
        let directives = Self::normalize_level_directives(&self.level);
        tracing_subscriber::EnvFilter::try_new(directives).unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::default()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        })
    }

    /// The configured level, merged with `RUST_LOG` when that is set.
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        let env_directives = std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        match env_directives {
            Some(env_directives) => {
                let combined = format!(
                    "{},{env_directives}",
                    Self::normalize_level_directives(&self.level)
                );
                tracing_subscriber::EnvFilter::try_new(combined)
                    .or_else(|_| tracing_subscriber::EnvFilter::try_new(env_directives))
                    .unwrap_or_else(|_| self.config_env_filter())
            }
            None => self.config_env_filter(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
            stderr: Self::default_stderr(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerSettings {
    #[serde(default = "SchedulerSettings::default_worker_thread_name")]
    pub worker_thread_name: String,

    /// How long a blocking refactoring sleeps on the event queue between checks.
    #[serde(default = "SchedulerSettings::default_blocking_poll_interval_ms")]
    pub blocking_poll_interval_ms: u64,
}

impl SchedulerSettings {
    fn default_worker_thread_name() -> String {
        SchedulerConfig::default().worker_thread_name
    }

    fn default_blocking_poll_interval_ms() -> u64 {
        SchedulerConfig::default().blocking_poll_interval.as_millis() as u64
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            worker_thread_name: Self::default_worker_thread_name(),
            blocking_poll_interval_ms: Self::default_blocking_poll_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Directory holding `compile_commands.json`, relative to the project root.
    #[serde(default)]
    pub build_dir: Option<PathBuf>,

    #[serde(default = "ProjectConfig::default_header_extensions")]
    pub header_extensions: Vec<String>,

    #[serde(default = "ProjectConfig::default_source_extensions")]
    pub source_extensions: Vec<String>,
}

impl ProjectConfig {
    fn default_header_extensions() -> Vec<String> {
        SourceKinds::default().header_extensions
    }

    fn default_source_extensions() -> Vec<String> {
        SourceKinds::default().source_extensions
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            build_dir: None,
            header_extensions: Self::default_header_extensions(),
            source_extensions: Self::default_source_extensions(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Toml(err.message().to_owned())
    }
}

impl RefractConfig {
    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    /// Loads `root/.refract.toml`, or the defaults if there is none.
    ///
    /// Returns the path of the file that was read, if any.
    pub fn load_for_project(root: &Path) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let path = root.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            tracing::debug!(
                target: "refract.config",
                root = %root.display(),
                "no config file; using defaults"
            );
            return Ok((Self::default(), None));
        }
        let config = Self::load_from_path(&path)?;
        tracing::debug!(target: "refract.config", path = %path.display(), "loaded config");
        Ok((config, Some(path)))
    }

    pub fn source_kinds(&self) -> SourceKinds {
        SourceKinds {
            header_extensions: self.project.header_extensions.clone(),
            source_extensions: self.project.source_extensions.clone(),
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            worker_thread_name: self.scheduler.worker_thread_name.clone(),
            blocking_poll_interval: Duration::from_millis(self.scheduler.blocking_poll_interval_ms),
            source_kinds: self.source_kinds(),
        }
    }

    /// Where `compile_commands.json` lives; the project root unless `build_dir` says otherwise.
    pub fn build_dir(&self, root: &Path) -> PathBuf {
        match &self.project.build_dir {
            Some(dir) => root.join(dir),
            None => root.to_path_buf(),
        }
    }

    pub fn compilation_database(&self, root: &Path) -> Result<JsonCompilationDatabase, FrontendError> {
        JsonCompilationDatabase::load_from_directory(&self.build_dir(root))
    }
}

struct MutexFileMakeWriter {
    file: Arc<Mutex<std::fs::File>>,
}

impl<'a> MakeWriter<'a> for MutexFileMakeWriter {
    type Writer = MutexFileWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        MutexFileWriter {
            guard: self.file.lock().unwrap_or_else(|err| err.into_inner()),
        }
    }
}

struct MutexFileWriter<'a> {
    guard: std::sync::MutexGuard<'a, std::fs::File>,
}

impl Write for MutexFileWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.guard.flush()
    }
}

static TRACING_INIT: Once = Once::new();

/// Installs the global `tracing` subscriber. Only the first call has an effect.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let filter = config.env_filter();

        let file = config.file.as_ref().and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });
        let file_open_failed = config.file.is_some() && file.is_none();

        let mut make_writer: Option<BoxMakeWriter> = None;
        if config.stderr {
            make_writer = Some(if cfg!(debug_assertions) {
                BoxMakeWriter::new(tracing_subscriber::fmt::writer::TestWriter::with_stderr)
            } else {
                BoxMakeWriter::new(io::stderr)
            });
        }
        if let Some(file) = file {
            let file_writer = MutexFileMakeWriter {
                file: Arc::new(Mutex::new(file)),
            };
            make_writer = Some(match make_writer {
                Some(writer) => BoxMakeWriter::new(writer.and(file_writer)),
                None => BoxMakeWriter::new(file_writer),
            });
        }
        let make_writer = make_writer.unwrap_or_else(|| BoxMakeWriter::new(io::sink));

        let layer: Box<dyn tracing_subscriber::Layer<_> + Send + Sync> = if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(make_writer)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(make_writer)
                .with_ansi(false)
                .boxed()
        };

        let subscriber = tracing_subscriber::registry().with(filter).with(layer);
        if tracing::subscriber::set_global_default(subscriber).is_ok() && file_open_failed {
            if let Some(path) = config.file.as_ref() {
                tracing::warn!(
                    target: "refract.config",
                    path = %path.display(),
                    "failed to open log file; file logging disabled"
                );
            }
        }
    });
}
