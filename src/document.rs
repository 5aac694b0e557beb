//! Editor-side capabilities the pipeline depends on.
//!
//! spandoc never talks to an editor directly. The host supplies:
//!
//! * a [`ScopeMatcher`] that scores scope selectors against the active
//!   document's syntax,
//! * a [`DocumentHost`] exposing the active [`Document`] and the ability to
//!   open a new one.
//!
//! [`DottedScopeMatcher`] and [`MemoryHost`] are small concrete versions used
//! by the command-line host and the tests.

use std::ops::Range;
use std::path::{Path, PathBuf};

// ── Scope matching ───────────────────────────────────────────────────────

/// Scores a scope selector against the active document.
///
/// `0` means "no match"; larger is a better match. Scores are only compared
/// with each other, never interpreted.
pub trait ScopeMatcher {
    fn score(&self, selector: &str) -> u32;

    /// Human-readable name of the document syntax, for error messages.
    fn describe(&self) -> String {
        "the current syntax".to_string()
    }
}

impl<F> ScopeMatcher for F
where
    F: Fn(&str) -> u32,
{
    fn score(&self, selector: &str) -> u32 {
        self(selector)
    }
}

/// Matches selectors against a whitespace-separated scope stack such as
/// `"text.html.markdown meta.paragraph"`.
///
/// A selector is a comma-separated list of alternatives. Each alternative is
/// a whitespace-separated list of dotted atoms that must match scopes of the
/// stack in order; an atom matches a scope when its components are a prefix
/// of the scope's components. The score of an alternative is the number of
/// components matched, and the selector scores its best alternative.
///
/// Exclusions (`-`) and grouping are not supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DottedScopeMatcher {
    stack: Vec<String>,
}

impl DottedScopeMatcher {
    pub fn new(scope: impl AsRef<str>) -> Self {
        Self {
            stack: scope
                .as_ref()
                .split_whitespace()
                .map(str::to_string)
                .collect(),
        }
    }

    /// Infer a base scope from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let scope = match ext.to_ascii_lowercase().as_str() {
            "md" | "markdown" | "mdown" | "mkd" => "text.html.markdown",
            "txt" | "text" => "text.plain",
            "html" | "htm" | "xhtml" => "text.html.basic",
            "tex" | "latex" | "ltx" => "text.tex.latex",
            "rst" => "text.restructuredtext",
            "textile" => "text.html.textile",
            "org" => "text.orgmode",
            _ => return None,
        };
        Some(Self::new(scope))
    }

    fn score_alternative(&self, alternative: &str) -> u32 {
        let mut total = 0;
        let mut stack = self.stack.iter();
        for atom in alternative.split_whitespace() {
            let matched = stack.by_ref().find_map(|scope| prefix_components(atom, scope));
            match matched {
                Some(n) => total += n,
                None => return 0,
            }
        }
        total
    }
}

impl ScopeMatcher for DottedScopeMatcher {
    fn score(&self, selector: &str) -> u32 {
        selector
            .split(',')
            .map(|alt| self.score_alternative(alt))
            .max()
            .unwrap_or(0)
    }

    fn describe(&self) -> String {
        self.stack.join(" ")
    }
}

/// Number of components of `atom` when it is a component-wise prefix of
/// `scope`.
fn prefix_components(atom: &str, scope: &str) -> Option<u32> {
    let mut scope_parts = scope.split('.');
    let mut n = 0;
    for part in atom.split('.') {
        if scope_parts.next() != Some(part) {
            return None;
        }
        n += 1;
    }
    (n > 0).then_some(n)
}

// ── Documents ────────────────────────────────────────────────────────────

/// A document whose text the pipeline can read and replace.
pub trait Document {
    /// Full text of the document.
    fn text(&self) -> String;

    /// Length in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace a byte range with `text`.
    fn replace(&mut self, range: Range<usize>, text: &str);

    /// Apply a syntax-highlighting identifier.
    fn set_syntax(&mut self, syntax: &str);

    /// Path of the file backing the document, if it has been saved.
    fn file_path(&self) -> Option<&Path>;
}

/// The editor window: the active document plus the ability to open new ones.
pub trait DocumentHost {
    fn active(&mut self) -> &mut dyn Document;

    /// Open an empty document, make it active, and return it.
    fn open_new(&mut self) -> &mut dyn Document;
}

/// In-memory document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryDocument {
    pub text: String,
    pub syntax: Option<String>,
    pub path: Option<PathBuf>,
}

impl MemoryDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl Document for MemoryDocument {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn len(&self) -> usize {
        self.text.len()
    }

    fn replace(&mut self, range: Range<usize>, text: &str) {
        let end = range.end.min(self.text.len());
        let start = range.start.min(end);
        self.text.replace_range(start..end, text);
    }

    fn set_syntax(&mut self, syntax: &str) {
        self.syntax = Some(syntax.to_string());
    }

    fn file_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// In-memory window holding a list of documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryHost {
    pub documents: Vec<MemoryDocument>,
    pub active: usize,
}

impl MemoryHost {
    pub fn new(document: MemoryDocument) -> Self {
        Self {
            documents: vec![document],
            active: 0,
        }
    }

    pub fn active_document(&self) -> &MemoryDocument {
        &self.documents[self.active]
    }
}

impl DocumentHost for MemoryHost {
    fn active(&mut self) -> &mut dyn Document {
        &mut self.documents[self.active]
    }

    fn open_new(&mut self) -> &mut dyn Document {
        self.documents.push(MemoryDocument::default());
        self.active = self.documents.len() - 1;
        &mut self.documents[self.active]
    }
}
