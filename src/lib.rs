//! # spandoc
//!
//! Run [pandoc](https://pandoc.org) transformations against editor documents.
//!
//! ## What this crate does
//!
//! An editor host triggers a conversion of the current document. The crate
//! figures out which settings apply (a project settings file, or the bundled
//! defaults with the user's overrides), ranks the configured transformations
//! by how well they fit the document's syntax, builds the pandoc command line,
//! runs pandoc off the interactive thread and hands the result back: either
//! text that replaces the document, or a file pandoc wrote itself.
//!
//! ## Pipeline Overview
//!
//! ```text
//! document
//!  │
//!  ├─ 1. Resolve  project spandoc.json, else defaults + user overrides
//!  ├─ 2. Rank     transformations by best scope-selector score
//!  ├─ 3. Build    pandoc -f <input> <args...> [-o <path>]
//!  ├─ 4. Invoke   document text on stdin (spawn_blocking)
//!  └─ 5. Deliver  stdout replaces the document, or pandoc wrote the file
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use spandoc::{convert, DottedScopeMatcher, MemoryDocument, MemoryHost, SpandocConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SpandocConfig::default();
//!     let mut host = MemoryHost::new(MemoryDocument::new("# Title").with_path("notes.md"));
//!     let matcher = DottedScopeMatcher::new("text.html.markdown");
//!
//!     convert(&config, "Pandoc: HTML", &mut host, &matcher, &[]).await?;
//!     println!("{}", host.active_document().text);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `spandoc` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when embedding the library in a host:
//! ```toml
//! spandoc = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod settings;
pub mod status;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{SpandocConfig, SpandocConfigBuilder};
pub use convert::{
    convert, convert_sync, deliver, init_project_settings, prepare, run, transformations_for,
};
pub use document::{
    Document, DocumentHost, DottedScopeMatcher, MemoryDocument, MemoryHost, ScopeMatcher,
};
pub use error::SpandocError;
pub use output::{
    BuiltCommand, ConversionOutcome, ConverterOutput, RankedTransformation, ResolvedSettings,
    SettingsSource,
};
pub use pipeline::args::ArgVector;
pub use pipeline::invoke::{ConverterRunner, ProcessRunner};
pub use settings::{Settings, Transformation};
pub use status::{NoopStatusReporter, Reporter, StatusReporter};
