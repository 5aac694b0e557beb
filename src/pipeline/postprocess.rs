//! Post-processing: turn raw converter streams into editor text.
//!
//! pandoc writes bytes; the editor wants a `String` with one line-ending
//! convention. The rules are tiny and run in a fixed order:
//!
//! 1. Decode UTF-8, replacing invalid sequences with U+FFFD
//! 2. Strip a leading byte-order mark
//! 3. Normalise line endings (CRLF and lone CR → LF)

/// Convert converter stdout into document text.
pub fn clean_output(raw: &[u8]) -> String {
    let s = decode(raw);
    let s = strip_bom(&s);
    normalise_line_endings(s)
}

/// Convert converter stderr into a message fit for an error dialog.
pub fn clean_stderr(raw: &[u8]) -> String {
    normalise_line_endings(&decode(raw)).trim().to_string()
}

// ── Rule 1: Decode ───────────────────────────────────────────────────────────

fn decode(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

// ── Rule 2: Byte-order mark ──────────────────────────────────────────────────

fn strip_bom(input: &str) -> &str {
    input.strip_prefix('\u{FEFF}').unwrap_or(input)
}

// ── Rule 3: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}
