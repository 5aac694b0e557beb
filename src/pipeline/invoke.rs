//! Converter invocation.
//!
//! ## Why spawn_blocking?
//!
//! Running the converter blocks on process I/O until it exits. The call is
//! moved onto tokio's blocking pool so the caller's executor (the host's
//! interactive loop) keeps running; the result comes back as a single
//! awaited value.
//!
//! No timeout is applied: the converter runs to completion.

use crate::error::SpandocError;
use crate::output::{BuiltCommand, ConversionOutcome, ConverterOutput};
use crate::pipeline::postprocess::{clean_output, clean_stderr};
use crate::settings::Transformation;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use tracing::{debug, info};

/// Runs a converter argv to completion.
///
/// Implementations block; [`invoke`] calls them from the blocking pool.
pub trait ConverterRunner: Send + Sync {
    fn run(
        &self,
        argv: &[String],
        stdin: &[u8],
        cwd: Option<&Path>,
    ) -> Result<ConverterOutput, SpandocError>;
}

/// Spawns the converter as a child process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ConverterRunner for ProcessRunner {
    fn run(
        &self,
        argv: &[String],
        stdin: &[u8],
        cwd: Option<&Path>,
    ) -> Result<ConverterOutput, SpandocError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| SpandocError::Internal("empty converter command".into()))?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let spawn_err = |source| SpandocError::ConverterSpawn {
            command: crate::output::display_argv(argv),
            source,
        };
        let mut child = cmd.spawn().map_err(spawn_err)?;

        // Feed stdin from a separate thread: a converter that fills its
        // stdout pipe before reading all input would otherwise deadlock.
        let writer = child.stdin.take().map(|mut pipe| {
            let input = stdin.to_vec();
            std::thread::spawn(move || pipe.write_all(&input))
        });

        let output = child.wait_with_output().map_err(spawn_err)?;

        if let Some(handle) = writer {
            match handle.join() {
                Ok(Err(e)) => debug!("Converter closed stdin early: {}", e),
                Err(_) => return Err(SpandocError::Internal("stdin writer panicked".into())),
                Ok(Ok(())) => {}
            }
        }

        Ok(ConverterOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            status: output.status.code(),
        })
    }
}

/// Run `command` with `input` on stdin and wait for it off the calling task.
///
/// # Errors
/// * [`SpandocError::ConverterSpawn`] if the process cannot start
/// * [`SpandocError::ConverterExecution`] if anything was written to stderr,
///   whatever the exit code
pub async fn invoke(
    runner: Arc<dyn ConverterRunner>,
    command: &BuiltCommand,
    cwd: Option<&Path>,
    input: Vec<u8>,
) -> Result<ConverterOutput, SpandocError> {
    let argv = command.argv.clone();
    let dir: Option<PathBuf> = cwd.map(Path::to_path_buf);

    info!("Running converter: {}", command.program());
    let output = tokio::task::spawn_blocking(move || runner.run(&argv, &input, dir.as_deref()))
        .await
        .map_err(|e| SpandocError::Internal(format!("Converter task panicked: {}", e)))??;

    debug!(
        "Converter exited with {:?}: {} bytes stdout, {} bytes stderr",
        output.status,
        output.stdout.len(),
        output.stderr.len()
    );

    if !output.stderr.is_empty() {
        return Err(SpandocError::ConverterExecution {
            command: command.display(),
            stderr: clean_stderr(&output.stderr),
        });
    }
    Ok(output)
}

/// Classify a successful converter run.
///
/// Non-empty stdout becomes inline text; empty stdout means the converter
/// wrote `command.output_path` itself.
pub fn interpret(
    command: &BuiltCommand,
    transformation: &Transformation,
    output: &ConverterOutput,
) -> ConversionOutcome {
    if output.stdout.is_empty() {
        return ConversionOutcome::WrittenToFile {
            path: command.output_path.clone(),
        };
    }
    ConversionOutcome::Inline {
        text: clean_output(&output.stdout),
        new_buffer: transformation.new_buffer(),
        syntax_file: transformation.syntax_file.clone(),
    }
}
