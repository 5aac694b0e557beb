//! Values produced by the pipeline stages.
//!
//! All of these are transient: built for one conversion and dropped once the
//! converter has returned and the result has been delivered.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::PathBuf;

use crate::settings::Settings;

/// Where the effective settings came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SettingsSource {
    /// A project-level settings file.
    Project(PathBuf),
    /// Bundled defaults with a user settings file merged over them.
    User(PathBuf),
    /// Bundled defaults only.
    Defaults,
}

/// Settings plus their provenance.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub settings: Settings,
    pub source: SettingsSource,
}

/// One entry of the ranked choice list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedTransformation {
    pub name: String,
    /// Best selector score of this transformation (always > 0).
    pub score: u32,
}

/// A fully built converter invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltCommand {
    /// `[converter, "-f", input_format, args...]`
    pub argv: Vec<String>,
    pub input_format: String,
    /// Value of `-t`/`-w`/`--to=`/`--write=` in the configured arguments.
    pub output_format: Option<String>,
    /// Set when the output format is written to a file.
    pub output_path: Option<PathBuf>,
    /// `output_path` is a file reserved in the temp directory.
    #[serde(skip)]
    pub temp_output: bool,
}

impl BuiltCommand {
    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }

    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }

    /// Shell-like rendering for logs and error messages.
    pub fn display(&self) -> String {
        display_argv(&self.argv)
    }
}

/// Raw result of running the converter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConverterOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Exit code, `None` when terminated by a signal.
    pub status: Option<i32>,
}

/// Successful outcome of one conversion.
///
/// Failures (non-empty stderr) are `Err(SpandocError::ConverterExecution)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ConversionOutcome {
    /// The converter returned text to put into a document.
    Inline {
        text: String,
        new_buffer: bool,
        syntax_file: Option<String>,
    },
    /// The converter produced no output stream; it wrote to `path` itself.
    WrittenToFile { path: Option<PathBuf> },
}

static RE_SHELL_SAFE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_@%+=:,./-]+$").expect("valid regex"));

/// Join tokens with spaces, single-quoting the ones a shell would split.
pub fn display_argv(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| {
            if RE_SHELL_SAFE.is_match(arg) {
                arg.clone()
            } else {
                format!("'{}'", arg.replace('\'', r"'\''"))
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn display_plain_tokens() {
        assert_eq!(
            display_argv(&argv(&["pandoc", "-f", "markdown", "--to=html5"])),
            "pandoc -f markdown --to=html5"
        );
    }

    #[test]
    fn display_quotes_spaces_and_quotes() {
        assert_eq!(
            display_argv(&argv(&["pandoc", "-V", "title=My Notes", "it's"])),
            r"pandoc -V 'title=My Notes' 'it'\''s'"
        );
    }

    #[test]
    fn display_quotes_empty_token() {
        assert_eq!(display_argv(&argv(&["pandoc", ""])), "pandoc ''");
    }

    #[test]
    fn program_and_args() {
        let cmd = BuiltCommand {
            argv: argv(&["/usr/bin/pandoc", "-f", "markdown"]),
            input_format: "markdown".into(),
            output_format: None,
            output_path: None,
            temp_output: false,
        };
        assert_eq!(cmd.program(), "/usr/bin/pandoc");
        assert_eq!(cmd.args(), argv(&["-f", "markdown"]).as_slice());
    }
}
