//! Run-time configuration for spandoc.
//!
//! [`SpandocConfig`] holds the knobs that are *not* part of the user's
//! settings file: where to look for settings, which binary name to search for,
//! and whether to echo commands loudly. It is passed explicitly into the
//! resolver and the orchestrator, so two hosts in one process can run with
//! different configurations.

use crate::error::SpandocError;
use crate::pipeline::invoke::{ConverterRunner, ProcessRunner};
use crate::status::{NoopStatusReporter, Reporter};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default name of the per-project settings file.
pub const DEFAULT_SETTINGS_FILE_NAME: &str = "spandoc.json";

/// Platform-appropriate converter binary name.
pub fn default_converter_binary() -> &'static str {
    #[cfg(windows)]
    {
        "pandoc.exe"
    }
    #[cfg(not(windows))]
    {
        "pandoc"
    }
}

/// Configuration for settings resolution and converter invocation.
///
/// Built via [`SpandocConfig::builder()`] or using
/// [`SpandocConfig::default()`].
///
/// # Example
/// ```rust
/// use spandoc::SpandocConfig;
///
/// let config = SpandocConfig::builder()
///     .settings_file_name("pandoc-config.json")
///     .debug(true)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct SpandocConfig {
    /// File name of the project-level settings file. Default: `spandoc.json`.
    pub settings_file_name: String,

    /// Optional user settings file layered over the bundled defaults.
    ///
    /// Same shape as the bundled file: a `user` object is merged over
    /// `default`, and a top-level `default` object replaces the bundled one.
    pub user_settings: Option<PathBuf>,

    /// Walk every project folder's subtree when the settings file is not in
    /// the document's directory. Default: true.
    pub search_project_folders: bool,

    /// Binary name searched on `PATH` when `pandoc-path` is not configured.
    /// Default: `pandoc` (`pandoc.exe` on Windows).
    pub converter_binary: String,

    /// Echo resolved settings sources and built commands at `info` level
    /// instead of `debug`. Default: false.
    pub debug: bool,

    /// Runs the converter. If None, spawns a child process ([`ProcessRunner`]).
    pub runner: Option<Arc<dyn ConverterRunner>>,

    /// Receives user-facing messages. If None, messages are dropped.
    pub reporter: Option<Reporter>,
}

impl Default for SpandocConfig {
    fn default() -> Self {
        Self {
            settings_file_name: DEFAULT_SETTINGS_FILE_NAME.to_string(),
            user_settings: None,
            search_project_folders: true,
            converter_binary: default_converter_binary().to_string(),
            debug: false,
            runner: None,
            reporter: None,
        }
    }
}

impl fmt::Debug for SpandocConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpandocConfig")
            .field("settings_file_name", &self.settings_file_name)
            .field("user_settings", &self.user_settings)
            .field("search_project_folders", &self.search_project_folders)
            .field("converter_binary", &self.converter_binary)
            .field("debug", &self.debug)
            .field("runner", &self.runner.as_ref().map(|_| "<dyn ConverterRunner>"))
            .field("reporter", &self.reporter.as_ref().map(|_| "<dyn StatusReporter>"))
            .finish()
    }
}

impl SpandocConfig {
    /// Create a new builder for `SpandocConfig`.
    pub fn builder() -> SpandocConfigBuilder {
        SpandocConfigBuilder {
            config: Self::default(),
        }
    }

    pub(crate) fn runner(&self) -> Arc<dyn ConverterRunner> {
        self.runner
            .clone()
            .unwrap_or_else(|| Arc::new(ProcessRunner))
    }

    pub(crate) fn reporter(&self) -> Reporter {
        self.reporter
            .clone()
            .unwrap_or_else(|| Arc::new(NoopStatusReporter))
    }
}

/// Builder for [`SpandocConfig`].
#[derive(Debug)]
pub struct SpandocConfigBuilder {
    config: SpandocConfig,
}

impl SpandocConfigBuilder {
    pub fn settings_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.settings_file_name = name.into();
        self
    }

    pub fn user_settings(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.user_settings = Some(path.into());
        self
    }

    pub fn search_project_folders(mut self, v: bool) -> Self {
        self.config.search_project_folders = v;
        self
    }

    pub fn converter_binary(mut self, name: impl Into<String>) -> Self {
        self.config.converter_binary = name.into();
        self
    }

    pub fn debug(mut self, v: bool) -> Self {
        self.config.debug = v;
        self
    }

    pub fn runner(mut self, runner: Arc<dyn ConverterRunner>) -> Self {
        self.config.runner = Some(runner);
        self
    }

    pub fn reporter(mut self, reporter: Reporter) -> Self {
        self.config.reporter = Some(reporter);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SpandocConfig, SpandocError> {
        let c = &self.config;
        validate_bare_name("settings file name", &c.settings_file_name)?;
        validate_bare_name("converter binary", &c.converter_binary)?;
        Ok(self.config)
    }
}

fn validate_bare_name(what: &str, name: &str) -> Result<(), SpandocError> {
    if name.trim().is_empty() {
        return Err(SpandocError::InvalidConfig(format!("{what} must not be empty")));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(SpandocError::InvalidConfig(format!(
            "{what} must be a bare name, got '{name}'"
        )));
    }
    Ok(())
}
