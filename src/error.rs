//! Error types for the spandoc library.
//!
//! Every variant is fatal to the *current* conversion attempt only. None of
//! them touch settings that were already resolved, and nothing is retried
//! automatically: the host reports the error and the user re-triggers the
//! command.
//!
//! A missing project settings file is deliberately absent from this enum. It
//! is the normal case and resolves to the bundled defaults; the caller can
//! see which source won via [`crate::output::SettingsSource`].

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the spandoc library.
#[derive(Debug, Error)]
pub enum SpandocError {
    // ── Settings errors ──────────────────────────────────────────────────
    /// A settings file exists but could not be read.
    #[error("Error: {path:?} exists, but could not be read: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A settings file was read but is not valid JSON (after comment stripping)
    /// or does not match the settings schema.
    #[error("JSON Error: cannot parse {path:?}: {detail}")]
    ConfigParse { path: PathBuf, detail: String },

    /// The resolved settings contain no `transformations` at all.
    #[error("No transformations configured. Add a \"transformations\" object to your settings.")]
    NoTransformationsConfigured,

    // ── Ranking / selection errors ───────────────────────────────────────
    /// No configured transformation has a scope selector matching the document.
    #[error("No transformations configured for the syntax '{syntax}'")]
    NoMatchingTransformation { syntax: String },

    /// The caller asked for a transformation name that is not configured.
    #[error("Unknown transformation '{name}'")]
    UnknownTransformation { name: String },

    /// The picked transformation has no scope selector matching the document,
    /// so no `-f` input format can be chosen.
    #[error("Transformation '{name}' has no scope matching this document; cannot pick an input format")]
    NoInputFormat { name: String },

    // ── Converter errors ─────────────────────────────────────────────────
    /// The converter binary could not be located.
    #[error("{}", converter_not_found_message(.binary, .configured))]
    ConverterNotFound {
        binary: String,
        configured: Option<PathBuf>,
    },

    /// The converter process could not be started at all.
    #[error("Failed to start '{command}': {source}")]
    ConverterSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The converter wrote to its error stream. Carries the full command line
    /// and the error text verbatim.
    #[error("Error when running:\n\n{command}\n\n{stderr}")]
    ConverterExecution { command: String, stderr: String },

    // ── I/O errors ───────────────────────────────────────────────────────
    /// A temporary output path could not be allocated.
    #[error("Failed to allocate a temporary output file: {source}")]
    TempFileFailed {
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write an output file.
    #[error("Failed to write '{}': {source}", path.display())]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ────────────────────────────────────────────────────
    /// Builder validation failed, or an operation got unusable input.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn converter_not_found_message(binary: &str, configured: &Option<PathBuf>) -> String {
    match configured {
        Some(path) => format!("Configured path for {binary} {} not found.", path.display()),
        None => format!(
            "Could not find {binary} executable on PATH. Set \"pandoc-path\" in your settings."
        ),
    }
}
