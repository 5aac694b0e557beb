//! Command building: transformation + document → converter argv.
//!
//! ## Steps
//!
//! 1. pick the input format from the best-scoring scope selector (`-f`)
//! 2. read the output format from the configured arguments (`-t`/`--to=`)
//! 3. strip a `pdf` output format: pandoc has no `pdf` writer and picks PDF
//!    output from the `-o` file extension instead
//!    (<https://github.com/jgm/pandoc/issues/571>)
//! 4. for formats that must go to a file, make sure an `-o` path is present,
//!    deriving one next to the source file or in the temp directory

use crate::document::ScopeMatcher;
use crate::error::SpandocError;
use crate::output::BuiltCommand;
use crate::pipeline::args::ArgVector;
use crate::pipeline::rank::best_selector;
use crate::settings::{Settings, Transformation};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const OUTPUT_FORMAT_SHORT: &[&str] = &["t", "w"];
pub const OUTPUT_FORMAT_LONG: &[&str] = &["to", "write"];
pub const OUTPUT_PATH_SHORT: &[&str] = &["o"];
pub const OUTPUT_PATH_LONG: &[&str] = &["output"];

const PDF: &str = "pdf";

/// How a temp-directory output path is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempOutput {
    /// Create and keep the file so the path stays unique until the converter
    /// writes it.
    Reserve,
    /// Only name it, for commands that are shown but never run.
    Preview,
}

/// Find the converter binary.
///
/// A configured `pandoc-path` must exist. Without one, `binary` is looked up
/// on `PATH`.
pub fn locate_converter(settings: &Settings, binary: &str) -> Result<PathBuf, SpandocError> {
    let configured = settings
        .pandoc_path
        .as_ref()
        .filter(|p| !p.as_os_str().is_empty());

    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.clone());
        }
        return Err(SpandocError::ConverterNotFound {
            binary: binary.to_string(),
            configured: Some(path.clone()),
        });
    }

    which::which(binary).map_err(|e| {
        debug!("PATH lookup for {} failed: {}", binary, e);
        SpandocError::ConverterNotFound {
            binary: binary.to_string(),
            configured: None,
        }
    })
}

/// Build the full converter command for one transformation.
///
/// # Arguments
/// * `name` — transformation name, for error messages
/// * `converter` — path returned by [`locate_converter`]
/// * `source_base_name` — file stem of the saved document, if any
/// * `temp` — whether a temp-directory output file is created or only named
pub fn build_command(
    name: &str,
    transformation: &Transformation,
    matcher: &dyn ScopeMatcher,
    converter: &Path,
    settings: &Settings,
    source_base_name: Option<&str>,
    temp: TempOutput,
) -> Result<BuiltCommand, SpandocError> {
    // ── Step 1: input format ─────────────────────────────────────────────
    let input_format = best_selector(transformation, matcher)
        .and_then(|(selector, _)| transformation.scope.get(selector))
        .cloned()
        .ok_or_else(|| SpandocError::NoInputFormat {
            name: name.to_string(),
        })?;

    // ── Step 2–3: output format ──────────────────────────────────────────
    let mut args = ArgVector::from(transformation.pandoc_arguments.as_slice());
    let output_format = args
        .get(OUTPUT_FORMAT_SHORT, OUTPUT_FORMAT_LONG)
        .map(str::to_string);

    if output_format.as_deref() == Some(PDF) {
        args = args.remove(OUTPUT_FORMAT_SHORT, OUTPUT_FORMAT_LONG, Some(&[PDF][..]));
    }

    // ── Step 4: output path ──────────────────────────────────────────────
    let mut output_path = None;
    let mut temp_output = false;
    if let Some(format) = output_format.as_deref().filter(|f| settings.writes_to_file(f)) {
        let existing = args.get(OUTPUT_PATH_SHORT, OUTPUT_PATH_LONG).map(PathBuf::from);
        output_path = match existing {
            Some(path) => Some(path),
            None => {
                let ext = transformation
                    .out_ext
                    .as_deref()
                    .filter(|e| !e.is_empty())
                    .unwrap_or(format);
                let path = match source_base_name.filter(|_| transformation.out_local()) {
                    Some(base) => PathBuf::from(format!("{base}.{ext}")),
                    None => {
                        temp_output = temp == TempOutput::Reserve;
                        match temp {
                            TempOutput::Reserve => allocate_temp_output(ext)?,
                            TempOutput::Preview => preview_temp_output(ext),
                        }
                    }
                };
                args.push("-o");
                args.push(path.to_string_lossy());
                Some(path)
            }
        };
    }

    let mut argv = vec![
        converter.to_string_lossy().into_owned(),
        "-f".to_string(),
        input_format.clone(),
    ];
    argv.extend(args.into_vec());

    Ok(BuiltCommand {
        argv,
        input_format,
        output_format,
        output_path,
        temp_output,
    })
}

/// Reserve a fresh file in the temp directory ending in `.ext`.
///
/// The empty file is kept so repeated calls never hand out the same path;
/// the converter overwrites it.
pub fn allocate_temp_output(ext: &str) -> Result<PathBuf, SpandocError> {
    let file = tempfile::Builder::new()
        .prefix("spandoc-")
        .suffix(&format!(".{ext}"))
        .tempfile()
        .map_err(|e| SpandocError::TempFileFailed { source: e })?;
    let (_, path) = file
        .keep()
        .map_err(|e| SpandocError::TempFileFailed { source: e.error })?;
    Ok(path)
}

/// The shape of a reserved temp output path, without touching the disk.
fn preview_temp_output(ext: &str) -> PathBuf {
    std::env::temp_dir().join(format!("spandoc-XXXXXX.{ext}"))
}

/// Delete a reserved temp output file the converter never wrote.
pub fn discard_temp_output(command: &BuiltCommand) {
    let Some(path) = command.output_path.as_deref().filter(|_| command.temp_output) else {
        return;
    };
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed unused output file {}", path.display()),
        Err(e) => debug!("Could not remove {}: {}", path.display(), e),
    }
}
