//! Entry synthesis.
//!
//! A widget's `index.jsx`/`index.tsx` only defines its root component. The
//! synthesized entry appends a mount snippet that renders that component into
//! the widget's root element, turning the file into a self-executing module.
//! This is plain text concatenation; nothing is parsed here.

use crate::utils::escape_js_string;

/// Module the mount snippet imports `createRoot` from.
pub const DEFAULT_RUNTIME_MODULE: &str = "@chatgpt.js/react";

/// Component rendered when a description does not name one.
pub const DEFAULT_ROOT_COMPONENT: &str = "Widget";

/// Prefix of every widget root element id.
pub const ROOT_ID_PREFIX: &str = "widget-root-";

/// Derive the DOM id of a widget's root element.
///
/// Distinct names always yield distinct ids.
pub fn root_element_id(widget_name: &str) -> String {
    format!("{ROOT_ID_PREFIX}{widget_name}")
}

/// Generate the mount snippet for a widget.
pub fn mount_snippet(widget_name: &str, root_component: &str, runtime_module: &str) -> String {
    format!(
        "import React, {{ createRoot }} from '{}';\n\ncreateRoot(document.getElementById('{}')).render(<{} />);\n",
        escape_js_string(runtime_module),
        escape_js_string(&root_element_id(widget_name)),
        root_component
    )
}

/// Append the mount snippet to a widget's raw entry script.
pub fn synthesize_entry(
    script: &str,
    widget_name: &str,
    root_component: &str,
    runtime_module: &str,
) -> String {
    let snippet = mount_snippet(widget_name, root_component, runtime_module);
    let mut entry = String::with_capacity(script.len() + snippet.len() + 1);
    entry.push_str(script);
    if !script.is_empty() && !script.ends_with('\n') {
        entry.push('\n');
    }
    entry.push_str(&snippet);
    entry
}
