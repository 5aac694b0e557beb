//! Pipeline stages for running one pandoc transformation.
//!
//! Each submodule implements exactly one step, so each can be tested with
//! plain values and no editor attached.
//!
//! ## Data Flow
//!
//! ```text
//! resolve ──▶ rank ──▶ command ──▶ invoke ──▶ postprocess
//! (settings)  (scope)   (argv)    (pandoc)   (line endings)
//! ```
//!
//! 1. [`resolve`] — pick project settings or defaults + user overrides;
//!    settings files are JSON with comments, read through [`jsonc`]
//! 2. [`rank`]    — order transformations by how well their scope selectors
//!    match the active document
//! 3. [`command`] — build the converter argv from a transformation, using the
//!    [`args`] model to read and strip flags
//! 4. [`invoke`]  — run the converter in `spawn_blocking`; the only stage that
//!    blocks
//! 5. [`postprocess`] — decode output and normalise line endings

pub mod args;
pub mod command;
pub mod invoke;
pub mod jsonc;
pub mod postprocess;
pub mod rank;
pub mod resolve;
