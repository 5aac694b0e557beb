//! User-facing messaging capability.
//!
//! Inject an [`Arc<dyn StatusReporter>`] into the conversion entry points to
//! receive the events a host shows to its user: the ranked choice list, the
//! command about to run, blocking errors, and the transient status line.
//!
//! # Example
//!
//! ```rust
//! use spandoc::StatusReporter;
//! use std::sync::{Arc, Mutex};
//!
//! struct StatusLine {
//!     last: Mutex<Option<String>>,
//! }
//!
//! impl StatusReporter for StatusLine {
//!     fn status(&self, message: &str) {
//!         *self.last.lock().unwrap() = Some(message.to_string());
//!     }
//! }
//!
//! let reporter: Arc<dyn StatusReporter> = Arc::new(StatusLine { last: Mutex::new(None) });
//! reporter.status("Pandoc DONE");
//! ```

use std::sync::Arc;

use crate::error::SpandocError;
use crate::output::RankedTransformation;

/// Receives user-visible events from the pipeline.
///
/// Implementations must be `Send + Sync`: the converter runs on a blocking
/// worker thread and completion is reported from there. All methods have
/// no-op defaults so hosts only override what they display.
pub trait StatusReporter: Send + Sync {
    /// Present the ranked transformations and return the index picked, or
    /// `None` when the user dismissed the list.
    fn choose(&self, ranked: &[RankedTransformation]) -> Option<usize> {
        let _ = ranked;
        None
    }

    /// Called with the display form of the command just before it runs.
    fn on_command(&self, command: &str) {
        let _ = command;
    }

    /// Report a blocking error.
    fn error(&self, error: &SpandocError) {
        let _ = error;
    }

    /// Report an informational message that does not need acknowledging,
    /// e.g. no transformation matches the current syntax.
    fn info(&self, message: &str) {
        let _ = message;
    }

    /// Show a transient status-line message.
    fn status(&self, message: &str) {
        let _ = message;
    }
}

/// A reporter that ignores every event.
///
/// This is the default when no reporter is configured.
pub struct NoopStatusReporter;

impl StatusReporter for NoopStatusReporter {}

/// Convenience alias for the shared reporter handle.
pub type Reporter = Arc<dyn StatusReporter>;
