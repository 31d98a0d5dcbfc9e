//! Text normalisation: one deterministic cleanup pass per page.
//!
//! Text layers and OCR output disagree on line endings, leave column padding
//! as long runs of spaces, and scatter blank lines between form rows. The
//! field patterns are written against a single canonical shape, so every page
//! passes through [`normalize_text`] exactly once before extraction.
//!
//! ## Rule Order
//!
//! Invisible characters go first so they cannot split a whitespace run.
//! Carriage returns become newlines before blank-line collapsing so that
//! `\r\n\r\n` is recognised as a blank line. Trimming runs last.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all normalisation rules to raw page text.
///
/// Rules (applied in order):
/// 1. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 2. Carriage returns → newlines
/// 3. Runs of 2+ spaces/tabs → one space
/// 4. Runs of blank (or whitespace-only) lines → a single newline
/// 5. Trim surrounding whitespace
pub fn normalize_text(input: &str) -> String {
    let s = remove_invisible_chars(input);
    let s = normalise_line_endings(&s);
    let s = collapse_horizontal_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

// ── Rule 1: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FFFE}',
        ],
        "",
    )
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace('\r', "\n")
}

// ── Rule 3: Collapse horizontal whitespace ──────────────────────────────────

static RE_HSPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").unwrap());

fn collapse_horizontal_whitespace(input: &str) -> String {
    RE_HSPACE.replace_all(input, " ").into_owned()
}

// ── Rule 4: Collapse blank lines ─────────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n(?:[ \t]*\n)+").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n").into_owned()
}

// ── Tests ────────────────────────────────────────────────────────────────────
