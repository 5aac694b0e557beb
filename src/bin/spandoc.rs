//! CLI binary for spandoc.
//!
//! Stands in for an editor host: the FILE argument is the active document,
//! its extension (or `--scope`) gives the syntax, and inline results go to
//! stdout or back into the file.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use spandoc::{
    init_project_settings, prepare, run, transformations_for, ConversionOutcome,
    DocumentHost, DottedScopeMatcher, MemoryDocument, MemoryHost, RankedTransformation, ScopeMatcher,
    SpandocConfig, SpandocError, StatusReporter,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI reporter using indicatif ─────────────────────────────────────────────

/// Terminal reporter: picks the requested transformation and shows a
/// spinner while pandoc runs.
struct CliReporter {
    bar: ProgressBar,
    /// Transformation requested with `-t`; the best-ranked one otherwise.
    wanted: Option<String>,
    quiet: bool,
}

impl CliReporter {
    fn new(wanted: Option<String>, show_progress: bool, quiet: bool) -> Arc<Self> {
        let bar = if show_progress {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
            );
            bar
        } else {
            ProgressBar::hidden()
        };
        Arc::new(Self { bar, wanted, quiet })
    }
}

impl StatusReporter for CliReporter {
    fn choose(&self, ranked: &[RankedTransformation]) -> Option<usize> {
        match &self.wanted {
            Some(name) => ranked.iter().position(|r| &r.name == name),
            None => (!ranked.is_empty()).then_some(0),
        }
    }

    fn on_command(&self, command: &str) {
        self.bar.set_prefix("Running");
        self.bar.set_message(dim(command));
        self.bar.enable_steady_tick(Duration::from_millis(80));
    }

    fn error(&self, _error: &SpandocError) {
        // printed by main with its context chain
        self.bar.finish_and_clear();
    }

    fn info(&self, message: &str) {
        self.bar.finish_and_clear();
        eprintln!("{message}");
    }

    fn status(&self, message: &str) {
        self.bar.finish_and_clear();
        if let Some(line) = status_line(message, self.quiet) {
            eprintln!("{line}");
        }
    }
}

/// Terminal status line; shown in every mode except `--quiet`.
fn status_line(message: &str, quiet: bool) -> Option<String> {
    if quiet {
        return None;
    }
    let mark = if message == spandoc::convert::STATUS_DONE {
        green("✔")
    } else {
        red("✘")
    };
    Some(format!("{mark} {message}"))
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Markdown to HTML on stdout (best-ranked transformation)
  spandoc notes.md

  # List the transformations that apply, best first
  spandoc --list notes.md

  # Pick one by name and show the pandoc command without running it
  spandoc -t "Pandoc: Microsoft Word" --dry-run notes.md

  # Rewrite the file with the result
  spandoc -t "Pandoc: Markdown" --in-place page.html

  # Explicit syntax scope for unknown extensions
  spandoc --scope text.html.markdown README.txt

  # Create spandoc.json next to the file, from your user settings if set
  spandoc --init notes.md

SETTINGS:
  1. <FILE dir>/spandoc.json
  2. spandoc.json anywhere below a --project-folder (shallowest wins)
  3. bundled defaults, with --user-settings merged over them

  Settings files are JSON with // and /* */ comments. A project file is used
  as is; it is not merged with the defaults.

ENVIRONMENT VARIABLES:
  SPANDOC_USER_SETTINGS   User settings file
  SPANDOC_SETTINGS_FILE   Project settings file name (default spandoc.json)
  SPANDOC_CONVERTER       Converter binary looked up on PATH (default pandoc)
  RUST_LOG                Log filter, overrides -v / -q
"#;

/// Run pandoc transformations configured for a document's syntax.
#[derive(Parser, Debug)]
#[command(
    name = "spandoc",
    version,
    about = "Run pandoc transformations configured for a document's syntax",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Document to transform.
    file: PathBuf,

    /// Transformation name. Default: the best-ranked one.
    #[arg(short = 't', long = "transformation")]
    transformation: Option<String>,

    /// Syntax scope of the document, e.g. text.html.markdown.
    /// Default: inferred from the file extension.
    #[arg(long)]
    scope: Option<String>,

    /// Print the ranked transformations and exit.
    #[arg(long)]
    list: bool,

    /// Print the pandoc command without running it.
    #[arg(long)]
    dry_run: bool,

    /// Write inline results back into FILE instead of stdout.
    #[arg(long)]
    in_place: bool,

    /// Project folder searched for a settings file (repeatable).
    #[arg(long = "project-folder", value_name = "DIR")]
    project_folders: Vec<PathBuf>,

    /// User settings file merged over the bundled defaults.
    #[arg(long, env = "SPANDOC_USER_SETTINGS")]
    user_settings: Option<PathBuf>,

    /// Project settings file name.
    #[arg(long, env = "SPANDOC_SETTINGS_FILE", default_value = "spandoc.json")]
    settings_file: String,

    /// Converter binary name looked up on PATH when pandoc-path is unset.
    #[arg(long, env = "SPANDOC_CONVERTER")]
    converter: Option<String>,

    /// Only search the document's own directory for project settings.
    #[arg(long)]
    no_project_search: bool,

    /// Create a project settings file next to FILE and exit.
    #[arg(long)]
    init: bool,

    /// Output --list / --dry-run as JSON.
    #[arg(long)]
    json: bool,

    /// Echo settings sources and commands at INFO level.
    #[arg(long, env = "SPANDOC_DEBUG")]
    debug: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers what INFO logs would say; keep them out of its way.
    let show_progress = !cli.quiet && !cli.verbose && !cli.dry_run && !cli.list;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let reporter = CliReporter::new(cli.transformation.clone(), show_progress, cli.quiet);
    let config = build_config(&cli, reporter.clone())?;

    // ── Init mode ────────────────────────────────────────────────────────
    if cli.init {
        let path = init_project_settings(&config, Some(cli.file.as_path()))
            .context("Failed to create project settings")?;
        println!("{}", path.display());
        return Ok(());
    }

    // ── Load the document ────────────────────────────────────────────────
    let text = tokio::fs::read_to_string(&cli.file)
        .await
        .with_context(|| format!("Failed to read {:?}", cli.file))?;
    let matcher = scope_matcher(&cli)?;
    let mut host = MemoryHost::new(MemoryDocument::new(text).with_path(&cli.file));

    // ── List / dry-run modes ─────────────────────────────────────────────
    if cli.list {
        let ranked = transformations_for(&config, host.active(), &matcher, &cli.project_folders)?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&ranked)?);
        } else {
            for r in &ranked {
                println!("{:>3}  {}", r.score, r.name);
            }
        }
        return Ok(());
    }

    if cli.dry_run {
        let ranked = transformations_for(&config, host.active(), &matcher, &cli.project_folders)?;
        let name = match (&cli.transformation, ranked.first()) {
            (Some(name), _) => name.clone(),
            (None, Some(best)) => best.name.clone(),
            (None, None) => bail!("no transformation applies"),
        };
        let built = prepare(&config, &name, host.active(), &matcher, &cli.project_folders)?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&built)?);
        } else {
            println!("{}", built.display());
        }
        return Ok(());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let outcome = match run(&config, &mut host, &matcher, &cli.project_folders).await {
        Ok(Some(outcome)) => outcome,
        Ok(None) => bail!(
            "transformation {:?} does not apply to {}",
            cli.transformation.as_deref().unwrap_or_default(),
            matcher.describe()
        ),
        // Nothing applies: already reported as information.
        Err(SpandocError::NoMatchingTransformation { .. }) => return Ok(()),
        Err(e) => return Err(anyhow::Error::new(e).context("Conversion failed")),
    };

    match outcome {
        ConversionOutcome::Inline { new_buffer, .. } => {
            let text = &host.active_document().text;
            if cli.in_place && !new_buffer {
                write_in_place(&cli.file, text).await?;
                if !cli.quiet {
                    eprintln!("   {}", bold(&cli.file.display().to_string()));
                }
            } else {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle
                    .write_all(text.as_bytes())
                    .context("Failed to write to stdout")?;
                if !text.ends_with('\n') {
                    handle.write_all(b"\n").ok();
                }
            }
        }
        ConversionOutcome::WrittenToFile { path } => {
            // relative paths are relative to the document's directory
            if let Some(path) = path.filter(|_| !cli.quiet) {
                let shown = match cli.file.parent() {
                    Some(dir) if path.is_relative() => dir.join(&path),
                    _ => path,
                };
                eprintln!("   →  {}", bold(&shown.display().to_string()));
            }
        }
    }

    Ok(())
}

/// Map CLI args to `SpandocConfig`.
fn build_config(cli: &Cli, reporter: Arc<CliReporter>) -> Result<SpandocConfig> {
    let mut builder = SpandocConfig::builder()
        .settings_file_name(&cli.settings_file)
        .search_project_folders(!cli.no_project_search)
        .debug(cli.debug)
        .reporter(reporter);
    if let Some(ref path) = cli.user_settings {
        builder = builder.user_settings(path);
    }
    if let Some(ref binary) = cli.converter {
        builder = builder.converter_binary(binary);
    }
    builder.build().context("Invalid configuration")
}

fn scope_matcher(cli: &Cli) -> Result<DottedScopeMatcher> {
    if let Some(ref scope) = cli.scope {
        return Ok(DottedScopeMatcher::new(scope));
    }
    let ext = cli
        .file
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    DottedScopeMatcher::from_extension(ext)
        .with_context(|| format!("Cannot infer a scope for {:?}; pass --scope", cli.file))
}

/// Replace the file's contents through a sibling temp file and a rename.
async fn write_in_place(path: &Path, text: &str) -> Result<()> {
    let tmp_path = path.with_extension("spandoc.tmp");
    tokio::fs::write(&tmp_path, text)
        .await
        .with_context(|| format!("Failed to write {:?}", tmp_path))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("Failed to replace {:?}", path))?;
    Ok(())
}
