//! Utility functions for the bundler.
//!
//! - Synthetic entry and output path construction
//! - Lexical path normalization for overlay lookups
//! - Per-widget module ids
//! - JS / HTML string escaping (injection-safe)
//! - Output post-processing

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use path_absolutize::Absolutize;

use crate::ScriptDialect;

// ---------------------------------------------------------------------------
// Well-known file names
// ---------------------------------------------------------------------------

/// File stem of synthesized entries and of bundled outputs.
pub const ENTRY_STEM: &str = "entry";

/// File stem of author entry scripts.
pub const INDEX_STEM: &str = "index";

/// Optional per-widget stylesheet.
pub const STYLESHEET_FILE: &str = "index.css";

/// Debug copy of the assembled HTML, written next to the widget's sources.
pub const DEBUG_HTML_FILE: &str = "index.debug.html";

// ---------------------------------------------------------------------------
// Synthetic paths
// ---------------------------------------------------------------------------

/// Overlay key of a widget's synthesized entry:
/// `<widgets-root>/<directory_name>/entry.<ext>`.
///
/// The file never exists on disk; only the overlay knows its content.
pub fn synthetic_entry_path(
    widgets_root: &Path,
    directory_name: &str,
    dialect: ScriptDialect,
) -> PathBuf {
    normalize_path(
        &widgets_root
            .join(directory_name)
            .join(format!("{ENTRY_STEM}.{}", dialect.extension())),
    )
}

/// Bundler input name for a widget. Rolldown's default `[name].js` pattern
/// turns this into `<directory_name>/entry.js` under the output base.
pub fn entry_input_name(directory_name: &str) -> String {
    format!("{directory_name}/{ENTRY_STEM}")
}

/// Where the bundle of a widget is expected:
/// `<staging-root>/<directory_name>/entry.js`.
pub fn expected_output_path(staging_root: &Path, directory_name: &str) -> PathBuf {
    normalize_path(
        &staging_root
            .join(directory_name)
            .join(format!("{ENTRY_STEM}.js")),
    )
}

// ---------------------------------------------------------------------------
// Per-widget module ids
// ---------------------------------------------------------------------------

/// Prefix of module ids scoped to one widget.
pub const WIDGET_SCOPE_PREFIX: &str = "\0widget-scope:";

/// Module id of an on-disk file as imported by one widget:
/// `\0widget-scope:<widget_index>:<path>`.
///
/// Two widgets importing the same file get two distinct modules, so every
/// entry chunk carries its own copy and nothing is split into a common
/// chunk. The path stays last so its extension still selects the module type.
pub fn scoped_module_id(widget_index: usize, path: &str) -> String {
    format!("{WIDGET_SCOPE_PREFIX}{widget_index}:{path}")
}

/// Split a scoped module id into widget index and on-disk path.
pub fn parse_scoped_module_id(id: &str) -> Option<(usize, &str)> {
    let rest = id.strip_prefix(WIDGET_SCOPE_PREFIX)?;
    let (index, path) = rest.split_once(':')?;
    Some((index.parse().ok()?, path))
}

/// Lexically normalize a path: make it absolute against the current
/// directory and fold `.` / `..` components. Never touches the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    match path.absolutize() {
        Ok(normalized) => normalized.into_owned(),
        Err(_) => path.to_path_buf(),
    }
}

/// Resolve `specifier` against `base` unless it is already absolute.
pub fn resolve_against(base: &Path, specifier: &str) -> PathBuf {
    let specifier = Path::new(specifier);
    if specifier.is_absolute() {
        return normalize_path(specifier);
    }
    match specifier.absolutize_from(base) {
        Ok(resolved) => resolved.into_owned(),
        Err(_) => base.join(specifier),
    }
}

/// Whether a specifier is relative (`./x`, `../x`).
pub fn is_relative_specifier(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../") || specifier == "." || specifier == ".."
}

/// Whether a bare specifier is covered by one of the configured externals,
/// either exactly or as a subpath (`react` covers `react/jsx-runtime`).
pub fn is_external(specifier: &str, externals: &[String]) -> bool {
    externals.iter().any(|external| {
        specifier == external
            || specifier
                .strip_prefix(external.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// Render a path relative to the current directory when it lives below it.
pub fn display_path(path: &Path) -> String {
    let relative = std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(Path::to_path_buf));
    match relative {
        Some(rel) if !rel.as_os_str().is_empty() => rel.display().to_string(),
        _ => path.display().to_string(),
    }
}

// ---------------------------------------------------------------------------
// String Escaping
// ---------------------------------------------------------------------------

/// Escape a string for safe embedding inside a single- or double-quoted JS
/// string literal.
pub fn escape_js_string(s: &str) -> Cow<'_, str> {
    if !s.contains(['\'', '"', '\\', '\n', '\r', '\t']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Escape a string for use inside a double-quoted HTML attribute value.
pub fn escape_html_attr(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '"', '<', '>']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

// ---------------------------------------------------------------------------
// Output post-processing
// ---------------------------------------------------------------------------

/// Drop Rolldown's standalone `//#region <id>` / `//#endregion` marker lines
/// (the ids embed absolute paths). Every other line is kept byte for byte,
/// line endings included.
pub fn strip_region_comments(code: &str) -> String {
    code.split_inclusive('\n')
        .filter(|line| !is_region_marker(line))
        .collect()
}

fn is_region_marker(line: &str) -> bool {
    let line = line.trim_end_matches(['\n', '\r']);
    line == "//#endregion" || line.starts_with("//#region ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
