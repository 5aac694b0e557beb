//! Conversion entry points.
//!
//! [`run`] is the whole user-triggered command: rank the transformations for
//! the active document, let the host pick one, then [`convert`] it. Hosts
//! with their own picker call [`transformations_for`] and [`convert`]
//! directly.
//!
//! Every failure aborts the current conversion only. It is reported through
//! the configured [`StatusReporter`](crate::StatusReporter) and returned; the
//! document is left untouched.

use crate::config::SpandocConfig;
use crate::document::{Document, DocumentHost, ScopeMatcher};
use crate::error::SpandocError;
use crate::output::{BuiltCommand, ConversionOutcome, RankedTransformation, ResolvedSettings};
use crate::pipeline::command::{self, TempOutput};
use crate::pipeline::{invoke, rank, resolve};
use crate::settings::{Settings, DEFAULT_SETTINGS_JSON};
use crate::status::StatusReporter;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Status line shown after a successful conversion.
pub const STATUS_DONE: &str = "Pandoc DONE";
/// Status line shown after a failed conversion.
pub const STATUS_FAILED: &str = "Pandoc FAILED";

/// Rank the configured transformations for the active document.
///
/// # Errors
/// [`SpandocError::NoMatchingTransformation`] when no transformation applies
/// to the document's syntax, plus any settings error.
pub fn transformations_for(
    config: &SpandocConfig,
    document: &dyn Document,
    matcher: &dyn ScopeMatcher,
    project_folders: &[PathBuf],
) -> Result<Vec<RankedTransformation>, SpandocError> {
    let resolved = resolve_for(config, document, project_folders)?;
    rank::rank_transformations(&resolved.settings.transformations, matcher)
}

/// Build the converter command for `name` without running it.
///
/// Nothing is created on disk: a temp-directory output path is only named,
/// so the shown path differs from the one a real run would use.
pub fn prepare(
    config: &SpandocConfig,
    name: &str,
    document: &dyn Document,
    matcher: &dyn ScopeMatcher,
    project_folders: &[PathBuf],
) -> Result<BuiltCommand, SpandocError> {
    let resolved = resolve_for(config, document, project_folders)?;
    build_for(
        config,
        &resolved.settings,
        name,
        document,
        matcher,
        TempOutput::Preview,
    )
}

fn build_for(
    config: &SpandocConfig,
    settings: &Settings,
    name: &str,
    document: &dyn Document,
    matcher: &dyn ScopeMatcher,
    temp: TempOutput,
) -> Result<BuiltCommand, SpandocError> {
    let transformation = settings.transformation(name)?;
    let converter = command::locate_converter(settings, &config.converter_binary)?;
    let base_name = source_base_name(document.file_path());
    command::build_command(
        name,
        transformation,
        matcher,
        &converter,
        settings,
        base_name.as_deref(),
        temp,
    )
}

/// Run the transformation `name` on the host's active document.
///
/// The converter runs on tokio's blocking pool; the document is only
/// touched after it has finished, and only on success.
///
/// # Returns
/// What happened to the result: delivered inline, or written to a file by
/// the converter itself.
pub async fn convert(
    config: &SpandocConfig,
    name: &str,
    host: &mut dyn DocumentHost,
    matcher: &dyn ScopeMatcher,
    project_folders: &[PathBuf],
) -> Result<ConversionOutcome, SpandocError> {
    let reporter = config.reporter();
    match convert_inner(config, name, host, matcher, project_folders).await {
        Ok(outcome) => {
            reporter.status(STATUS_DONE);
            Ok(outcome)
        }
        Err(e) => {
            report_failure(reporter.as_ref(), &e);
            reporter.status(STATUS_FAILED);
            Err(e)
        }
    }
}

async fn convert_inner(
    config: &SpandocConfig,
    name: &str,
    host: &mut dyn DocumentHost,
    matcher: &dyn ScopeMatcher,
    project_folders: &[PathBuf],
) -> Result<ConversionOutcome, SpandocError> {
    let start = Instant::now();
    info!("Starting transformation: {}", name);

    // ── Step 1: Build the command from the active document ───────────────
    let document = host.active();
    let resolved = resolve_for(config, document, project_folders)?;
    let transformation = resolved.settings.transformation(name)?;
    let built = build_for(
        config,
        &resolved.settings,
        name,
        document,
        matcher,
        TempOutput::Reserve,
    )?;
    let working_dir = document_dir(document.file_path());
    let input = document.text().into_bytes();

    // ── Step 2: Echo ─────────────────────────────────────────────────────
    let command_line = built.display();
    if config.debug {
        info!("Command: {}", command_line);
    } else {
        debug!("Command: {}", command_line);
    }
    config.reporter().on_command(&command_line);

    // ── Step 3: Run ──────────────────────────────────────────────────────
    let output =
        match invoke::invoke(config.runner(), &built, working_dir.as_deref(), input).await {
            Ok(output) => output,
            Err(e) => {
                command::discard_temp_output(&built);
                return Err(e);
            }
        };

    // ── Step 4: Deliver ──────────────────────────────────────────────────
    let outcome = invoke::interpret(&built, transformation, &output);
    deliver(&outcome, host);

    info!(
        "Transformation '{}' finished in {}ms",
        name,
        start.elapsed().as_millis()
    );
    Ok(outcome)
}

/// The whole user-triggered command: rank, let the host choose, convert.
///
/// Returns `Ok(None)` when the host dismissed the choice list.
pub async fn run(
    config: &SpandocConfig,
    host: &mut dyn DocumentHost,
    matcher: &dyn ScopeMatcher,
    project_folders: &[PathBuf],
) -> Result<Option<ConversionOutcome>, SpandocError> {
    let reporter = config.reporter();
    let ranked = match transformations_for(config, host.active(), matcher, project_folders) {
        Ok(ranked) => ranked,
        Err(e) => {
            report_failure(reporter.as_ref(), &e);
            return Err(e);
        }
    };

    let Some(picked) = reporter.choose(&ranked).and_then(|i| ranked.get(i)) else {
        debug!("Transformation choice dismissed");
        return Ok(None);
    };
    convert(config, &picked.name, host, matcher, project_folders)
        .await
        .map(Some)
}

/// Blocking wrapper around [`convert`] for hosts without an async runtime.
///
/// Creates a private tokio runtime; do not call from inside one.
pub fn convert_sync(
    config: &SpandocConfig,
    name: &str,
    host: &mut dyn DocumentHost,
    matcher: &dyn ScopeMatcher,
    project_folders: &[PathBuf],
) -> Result<ConversionOutcome, SpandocError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SpandocError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(config, name, host, matcher, project_folders))
}

/// Apply a conversion outcome to the host's documents.
///
/// Inline text replaces the whole active document, or fills a newly opened
/// one when the transformation asked for a new buffer. File output leaves
/// every document alone.
pub fn deliver(outcome: &ConversionOutcome, host: &mut dyn DocumentHost) {
    match outcome {
        ConversionOutcome::Inline {
            text,
            new_buffer,
            syntax_file,
        } => {
            let target = if *new_buffer {
                host.open_new()
            } else {
                host.active()
            };
            let len = target.len();
            target.replace(0..len, text);
            if let Some(syntax) = syntax_file {
                target.set_syntax(syntax);
            }
        }
        ConversionOutcome::WrittenToFile { path } => match path {
            Some(p) => info!("Converter wrote {}", p.display()),
            None => info!("Converter produced no output"),
        },
    }
}

/// Create a project settings file next to a saved document.
///
/// An existing file is left as it is. Otherwise the file receives the
/// settings a document without project settings would get: the bundled
/// defaults (comments included) when no user settings file is present, else
/// the defaults with the user overrides merged in, under a `default` key.
///
/// # Returns
/// The path of the project settings file, for the host to open.
pub fn init_project_settings(
    config: &SpandocConfig,
    document_path: Option<&Path>,
) -> Result<PathBuf, SpandocError> {
    let dir = document_dir(document_path).ok_or_else(|| {
        SpandocError::InvalidConfig("save the document before creating project settings".into())
    })?;
    let target = dir.join(&config.settings_file_name);

    if target.exists() {
        info!("Project settings already exist: {}", target.display());
        return Ok(target);
    }

    let write_err = |source| SpandocError::OutputWriteFailed {
        path: target.clone(),
        source,
    };
    match resolve::merged_default_document(config)? {
        (merged, Some(user)) => {
            let document = serde_json::json!({ "default": merged });
            let text = serde_json::to_string_pretty(&document)
                .map_err(|e| SpandocError::Internal(format!("settings: {e}")))?;
            std::fs::write(&target, text + "\n").map_err(write_err)?;
            info!(
                "Wrote default settings merged with {} to {}",
                user.display(),
                target.display()
            );
        }
        (_, None) => {
            std::fs::write(&target, DEFAULT_SETTINGS_JSON).map_err(write_err)?;
            info!("Wrote default settings to {}", target.display());
        }
    }
    Ok(target)
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn resolve_for(
    config: &SpandocConfig,
    document: &dyn Document,
    project_folders: &[PathBuf],
) -> Result<ResolvedSettings, SpandocError> {
    let dir = document_dir(document.file_path());
    resolve::resolve_settings(config, dir.as_deref(), project_folders)
}

fn document_dir(path: Option<&Path>) -> Option<PathBuf> {
    path.and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

fn source_base_name(path: Option<&Path>) -> Option<String> {
    path.and_then(Path::file_stem)
        .map(|s| s.to_string_lossy().into_owned())
}

/// Nothing-to-do conditions are informational; everything else is an error.
fn report_failure(reporter: &dyn StatusReporter, error: &SpandocError) {
    match error {
        SpandocError::NoMatchingTransformation { .. } => reporter.info(&error.to_string()),
        _ => reporter.error(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{MemoryDocument, MemoryHost};
    use crate::output::ConverterOutput;
    use crate::pipeline::invoke::ConverterRunner;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    struct FakeRunner {
        stdout: &'static str,
        stderr: &'static str,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl ConverterRunner for FakeRunner {
        fn run(
            &self,
            argv: &[String],
            _stdin: &[u8],
            _cwd: Option<&Path>,
        ) -> Result<ConverterOutput, SpandocError> {
            self.calls.lock().unwrap().push(argv.to_vec());
            Ok(ConverterOutput {
                stdout: self.stdout.as_bytes().to_vec(),
                stderr: self.stderr.as_bytes().to_vec(),
                status: Some(0),
            })
        }
    }

    #[derive(Default)]
    struct Recorder {
        pick: Option<usize>,
        events: Mutex<Vec<String>>,
    }

    impl StatusReporter for Recorder {
        fn choose(&self, ranked: &[RankedTransformation]) -> Option<usize> {
            let names: Vec<&str> = ranked.iter().map(|r| r.name.as_str()).collect();
            self.events.lock().unwrap().push(format!("choose {}", names.join(",")));
            self.pick
        }
        fn on_command(&self, command: &str) {
            self.events.lock().unwrap().push(format!("command {command}"));
        }
        fn error(&self, error: &SpandocError) {
            self.events.lock().unwrap().push(format!("error {error}"));
        }
        fn info(&self, message: &str) {
            self.events.lock().unwrap().push(format!("info {message}"));
        }
        fn status(&self, message: &str) {
            self.events.lock().unwrap().push(format!("status {message}"));
        }
    }

    /// A project directory whose settings point `pandoc-path` at a real file.
    fn project(transformations: serde_json::Value) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let converter = dir.path().join("fake-pandoc");
        std::fs::write(&converter, "").unwrap();
        let settings = serde_json::json!({
            "default": {
                "pandoc-path": converter,
                "pandoc-format-file": ["docx"],
                "transformations": transformations,
            }
        });
        std::fs::write(dir.path().join("spandoc.json"), settings.to_string()).unwrap();
        (dir, converter)
    }

    fn to_html() -> serde_json::Value {
        serde_json::json!({
            "to-html": {"scope": {"text.plain": "markdown"}, "pandoc-arguments": ["-t", "html"]}
        })
    }

    fn config(runner: Arc<FakeRunner>, reporter: Arc<Recorder>) -> SpandocConfig {
        SpandocConfig::builder()
            .runner(runner)
            .reporter(reporter)
            .build()
            .unwrap()
    }

    fn runner(stdout: &'static str, stderr: &'static str) -> Arc<FakeRunner> {
        Arc::new(FakeRunner {
            stdout,
            stderr,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn plain(s: &str) -> u32 {
        u32::from(s == "text.plain")
    }

    #[tokio::test]
    async fn inline_result_replaces_document() {
        let (dir, converter) = project(to_html());
        let runner = runner("<p>hi</p>\r\n", "");
        let reporter = Arc::new(Recorder::default());
        let cfg = config(runner.clone(), reporter.clone());
        let mut host = MemoryHost::new(MemoryDocument::new("hi").with_path(dir.path().join("notes.txt")));

        let outcome = convert(&cfg, "to-html", &mut host, &plain, &[]).await.unwrap();

        assert!(matches!(outcome, ConversionOutcome::Inline { .. }));
        assert_eq!(host.active_document().text, "<p>hi</p>\n");
        let calls = runner.calls.lock().unwrap();
        assert_eq!(
            calls[0],
            vec![converter.to_string_lossy().into_owned(), "-f".into(), "markdown".into(), "-t".into(), "html".into()]
        );
        let events = reporter.events.lock().unwrap();
        assert!(events[0].starts_with("command "));
        assert_eq!(events.last().unwrap(), "status Pandoc DONE");
    }

    #[tokio::test]
    async fn stderr_leaves_document_untouched() {
        let (dir, _) = project(to_html());
        let reporter = Arc::new(Recorder::default());
        let cfg = config(runner("", "pandoc: file not found"), reporter.clone());
        let mut host = MemoryHost::new(MemoryDocument::new("keep me").with_path(dir.path().join("a.txt")));

        let err = convert(&cfg, "to-html", &mut host, &plain, &[]).await.unwrap_err();

        assert!(matches!(err, SpandocError::ConverterExecution { .. }));
        assert_eq!(host.active_document().text, "keep me");
        let events = reporter.events.lock().unwrap();
        let error = events.iter().find(|e| e.starts_with("error ")).unwrap();
        assert!(error.contains("Error when running:"));
        assert!(error.contains("pandoc: file not found"));
        assert_eq!(events.last().unwrap(), "status Pandoc FAILED");
    }

    #[tokio::test]
    async fn failed_run_removes_reserved_output() {
        let (dir, _) = project(serde_json::json!({
            "to-docx": {"scope": {"text.plain": "markdown"}, "pandoc-arguments": ["-t", "docx"]}
        }));
        let runner = runner("", "pandoc: cannot write");
        let cfg = config(runner.clone(), Arc::new(Recorder::default()));
        let mut host = MemoryHost::new(MemoryDocument::new("x").with_path(dir.path().join("a.txt")));

        convert(&cfg, "to-docx", &mut host, &plain, &[]).await.unwrap_err();

        let calls = runner.calls.lock().unwrap();
        let reserved = calls[0].last().unwrap();
        assert!(reserved.ends_with(".docx"), "{reserved}");
        assert!(!Path::new(reserved).exists());
    }

    #[test]
    fn prepare_does_not_create_temp_output() {
        let (dir, _) = project(serde_json::json!({
            "to-docx": {"scope": {"text.plain": "markdown"}, "pandoc-arguments": ["-t", "docx"]}
        }));
        let doc = MemoryDocument::new("x").with_path(dir.path().join("a.txt"));

        let built = prepare(&SpandocConfig::default(), "to-docx", &doc, &plain, &[]).unwrap();

        let path = built.output_path.unwrap();
        assert!(path.starts_with(std::env::temp_dir()), "{path:?}");
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn empty_transformations_is_a_configuration_error() {
        let (dir, _) = project(serde_json::json!({}));
        let reporter = Arc::new(Recorder::default());
        let cfg = config(runner("out", ""), reporter.clone());
        let mut host = MemoryHost::new(MemoryDocument::new("in").with_path(dir.path().join("a.txt")));

        let err = run(&cfg, &mut host, &plain, &[]).await.unwrap_err();

        assert!(matches!(err, SpandocError::NoTransformationsConfigured), "got {err:?}");
        let events = reporter.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].starts_with("error No transformations configured."));
    }

    #[tokio::test]
    async fn new_buffer_and_syntax_file() {
        let (dir, _) = project(serde_json::json!({
            "to-html": {
                "scope": {"text.plain": "markdown"},
                "pandoc-arguments": ["-t", "html"],
                "new-buffer": true,
                "syntax_file": "Packages/HTML/HTML.sublime-syntax"
            }
        }));
        let cfg = config(runner("<p>x</p>", ""), Arc::new(Recorder::default()));
        let mut host = MemoryHost::new(MemoryDocument::new("x").with_path(dir.path().join("a.txt")));

        convert(&cfg, "to-html", &mut host, &plain, &[]).await.unwrap();

        assert_eq!(host.documents.len(), 2);
        assert_eq!(host.documents[0].text, "x");
        assert_eq!(host.documents[1].text, "<p>x</p>");
        assert_eq!(
            host.documents[1].syntax.as_deref(),
            Some("Packages/HTML/HTML.sublime-syntax")
        );
    }

    #[tokio::test]
    async fn file_output_does_not_touch_document() {
        let (dir, _) = project(serde_json::json!({
            "to-docx": {
                "scope": {"text.plain": "markdown"},
                "pandoc-arguments": ["-t", "docx"],
                "out-local": true
            }
        }));
        let runner = runner("", "");
        let cfg = config(runner.clone(), Arc::new(Recorder::default()));
        let mut host = MemoryHost::new(MemoryDocument::new("body").with_path(dir.path().join("notes.txt")));

        let outcome = convert(&cfg, "to-docx", &mut host, &plain, &[]).await.unwrap();

        assert_eq!(
            outcome,
            ConversionOutcome::WrittenToFile {
                path: Some(PathBuf::from("notes.docx"))
            }
        );
        assert_eq!(host.active_document().text, "body");
        let calls = runner.calls.lock().unwrap();
        assert!(calls[0].ends_with(&["-o".to_string(), "notes.docx".to_string()]));
    }

    #[tokio::test]
    async fn run_asks_host_to_choose() {
        let (dir, _) = project(to_html());
        let reporter = Arc::new(Recorder {
            pick: Some(0),
            ..Recorder::default()
        });
        let cfg = config(runner("out", ""), reporter.clone());
        let mut host = MemoryHost::new(MemoryDocument::new("in").with_path(dir.path().join("a.txt")));

        let outcome = run(&cfg, &mut host, &plain, &[]).await.unwrap();

        assert!(outcome.is_some());
        assert_eq!(reporter.events.lock().unwrap()[0], "choose to-html");
        assert_eq!(host.active_document().text, "out");
    }

    #[tokio::test]
    async fn run_dismissed_does_nothing() {
        let (dir, _) = project(to_html());
        let runner = runner("out", "");
        let cfg = config(runner.clone(), Arc::new(Recorder::default()));
        let mut host = MemoryHost::new(MemoryDocument::new("in").with_path(dir.path().join("a.txt")));

        assert_eq!(run(&cfg, &mut host, &plain, &[]).await.unwrap(), None);
        assert!(runner.calls.lock().unwrap().is_empty());
        assert_eq!(host.active_document().text, "in");
    }

    #[tokio::test]
    async fn run_without_match_is_informational() {
        let (dir, _) = project(to_html());
        let reporter = Arc::new(Recorder::default());
        let cfg = config(runner("out", ""), reporter.clone());
        let mut host = MemoryHost::new(MemoryDocument::new("in").with_path(dir.path().join("a.txt")));
        let rust = |_: &str| 0u32;

        let err = run(&cfg, &mut host, &rust, &[]).await.unwrap_err();

        assert!(matches!(err, SpandocError::NoMatchingTransformation { .. }));
        let events = reporter.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].starts_with("info No transformations configured"));
    }

    #[test]
    fn convert_sync_works_without_runtime() {
        let (dir, _) = project(to_html());
        let cfg = config(runner("ok", ""), Arc::new(Recorder::default()));
        let mut host = MemoryHost::new(MemoryDocument::new("in").with_path(dir.path().join("a.txt")));
        convert_sync(&cfg, "to-html", &mut host, &plain, &[]).unwrap();
        assert_eq!(host.active_document().text, "ok");
    }

    #[test]
    fn prepare_reports_unknown_name() {
        let (dir, _) = project(to_html());
        let doc = MemoryDocument::new("x").with_path(dir.path().join("a.txt"));
        let err = prepare(&SpandocConfig::default(), "nope", &doc, &plain, &[]).unwrap_err();
        assert!(matches!(err, SpandocError::UnknownTransformation { .. }));
    }

    #[test]
    fn init_writes_defaults_then_keeps_existing() {
        let dir = TempDir::new().unwrap();
        let doc = dir.path().join("notes.md");
        let cfg = SpandocConfig::default();

        let path = init_project_settings(&cfg, Some(doc.as_path())).unwrap();
        assert_eq!(path, dir.path().join("spandoc.json"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_SETTINGS_JSON);

        std::fs::write(&path, "{}").unwrap();
        init_project_settings(&cfg, Some(doc.as_path())).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn init_writes_merged_user_settings() {
        let dir = TempDir::new().unwrap();
        let converter = dir.path().join("fake-pandoc");
        std::fs::write(&converter, "").unwrap();
        let user = dir.path().join("user.json");
        let user_doc = serde_json::json!({"user": {"pandoc-path": converter}});
        std::fs::write(&user, user_doc.to_string()).unwrap();
        let project_dir = dir.path().join("proj");
        std::fs::create_dir(&project_dir).unwrap();
        let doc_path = project_dir.join("a.md");
        let cfg = SpandocConfig::builder().user_settings(&user).build().unwrap();

        let path = init_project_settings(&cfg, Some(doc_path.as_path())).unwrap();

        // the scaffold is now the project file, and resolves like the user setup did
        let settings = resolve::load_project_settings(&path).unwrap();
        assert_eq!(settings.pandoc_path.as_deref(), Some(converter.as_path()));
        assert_eq!(
            settings.transformations.len(),
            Settings::bundled().unwrap().transformations.len()
        );

        let doc = MemoryDocument::new("# x").with_path(&doc_path);
        let matcher = crate::document::DottedScopeMatcher::new("text.html.markdown");
        let ranked = transformations_for(&cfg, &doc, &matcher, &[]).unwrap();
        assert!(!ranked.is_empty());
        assert!(prepare(&cfg, &ranked[0].name, &doc, &matcher, &[]).is_ok());
    }

    #[test]
    fn init_needs_saved_document() {
        let err = init_project_settings(&SpandocConfig::default(), None).unwrap_err();
        assert!(matches!(err, SpandocError::InvalidConfig(_)));
    }
}
