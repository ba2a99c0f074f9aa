//! Artifact assembly.
//!
//! Turns a bundled widget into one self-contained HTML fragment:
//!
//! ```html
//! <div id="widget-root-<name>"></div><style>…</style><script type="module">…</script>
//! ```
//!
//! The `<style>` block only appears when the widget ships a non-empty
//! `index.css`. Bundle and stylesheet text are inserted verbatim.

use std::path::Path;

use log::{info, warn};

use crate::entry::root_element_id;
use crate::utils::{self, DEBUG_HTML_FILE};
use crate::{AssembledArtifact, BundleOutput, Diagnostic, WidgetSource};

/// Compose the HTML fragment for one widget.
pub fn compose_html(widget_name: &str, stylesheet: Option<&str>, script: &str) -> String {
    let root_id = root_element_id(widget_name);
    let root_id = utils::escape_html_attr(&root_id);
    let stylesheet = stylesheet.filter(|css| !css.is_empty());

    let mut html = String::with_capacity(
        root_id.len() + script.len() + stylesheet.map_or(0, str::len) + 64,
    );
    html.push_str(&format!(r#"<div id="{root_id}"></div>"#));
    if let Some(css) = stylesheet {
        html.push_str("<style>");
        html.push_str(css);
        html.push_str("</style>");
    }
    html.push_str(r#"<script type="module">"#);
    html.push_str(script);
    html.push_str("</script>");
    html
}

/// Find a widget's bundle.
///
/// Matches on the bundler input name first, so a file name the bundler
/// sanitized (`a+b/` emitted as `a_b/entry.js`) still pairs. Falls back to
/// the `<staging-root>/<directory_name>/entry.js` convention, compared as
/// normalized `PathBuf`s.
pub fn find_output<'a>(
    outputs: &'a [BundleOutput],
    staging_root: &Path,
    directory_name: &str,
) -> Option<&'a BundleOutput> {
    let entry_name = utils::entry_input_name(directory_name);
    if let Some(output) = outputs.iter().find(|output| output.entry_name == entry_name) {
        return Some(output);
    }

    let expected = utils::expected_output_path(staging_root, directory_name);
    outputs
        .iter()
        .find(|output| utils::normalize_path(&output.output_path) == expected)
}

/// Assemble every widget, in discovery order.
///
/// A widget whose bundle cannot be found gets an empty script and a warning;
/// the others are unaffected. With `debug`, each fragment is also written to
/// `<widget-dir>/index.debug.html`; a failed write is only reported.
pub async fn assemble_all(
    sources: &[WidgetSource],
    outputs: &[BundleOutput],
    staging_root: &Path,
    debug: bool,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<AssembledArtifact> {
    let mut artifacts = Vec::with_capacity(sources.len());

    for source in sources {
        let script = match find_output(outputs, staging_root, &source.directory_name) {
            Some(output) => output.text.as_str(),
            None => {
                let expected = utils::expected_output_path(staging_root, &source.directory_name);
                warn!(
                    "no bundle output for widget `{}` (expected {}); assembling with an empty script",
                    source.name(),
                    expected.display()
                );
                diagnostics.push(Diagnostic::warning(
                    format!("Missing bundle output for widget `{}`", source.name()),
                    Some(format!("expected {}", expected.display())),
                ));
                ""
            }
        };

        let html = compose_html(source.name(), source.stylesheet_text.as_deref(), script);

        if debug {
            let debug_path = source.directory.join(DEBUG_HTML_FILE);
            if let Err(e) = tokio::fs::write(&debug_path, &html).await {
                warn!("failed to write {}: {e}", debug_path.display());
                diagnostics.push(Diagnostic::warning(
                    format!("Failed to write debug HTML for widget `{}`", source.name()),
                    Some(e.to_string()),
                ));
            }
        }

        info!("- {}", source.name());
        artifacts.push(AssembledArtifact {
            widget_name: source.name().to_string(),
            directory_name: source.directory_name.clone(),
            html,
        });
    }

    artifacts
}
