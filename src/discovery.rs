//! Widget discovery.
//!
//! Every immediate subdirectory of the widgets root (except the staging
//! directory) that contains at least one file is a widget and must provide:
//!
//! - `data.json` or `data.toml`: the widget description (first match wins)
//! - `index.jsx` or `index.tsx`: the entry script (first match wins)
//! - `index.css`: optional stylesheet
//!
//! Descriptions are declarative data parsed with serde; nothing in a widget
//! directory is executed. Their contents are still trusted: names and domains
//! flow into generated script and HTML.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::entry::synthesize_entry;
use crate::utils::{INDEX_STEM, STYLESHEET_FILE};
use crate::{ScriptDialect, Widget, WidgetBuildOptions, WidgetError, WidgetSource};

// ---------------------------------------------------------------------------
// Description formats
// ---------------------------------------------------------------------------

/// Recognized description file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionFormat {
    Json,
    Toml,
}

impl DescriptionFormat {
    /// Lookup order when a widget directory holds more than one description.
    pub const PRECEDENCE: [DescriptionFormat; 2] = [DescriptionFormat::Json, DescriptionFormat::Toml];

    pub fn extension(self) -> &'static str {
        match self {
            DescriptionFormat::Json => "json",
            DescriptionFormat::Toml => "toml",
        }
    }

    pub fn file_name(self) -> String {
        format!("data.{}", self.extension())
    }
}

/// Parse a description file. The description may be the top-level object or
/// wrapped as `{ "default": { ... } }`.
pub fn parse_description(
    source: &str,
    format: DescriptionFormat,
    path: &Path,
) -> Result<Widget, WidgetError> {
    let value: serde_json::Value = match format {
        DescriptionFormat::Json => {
            serde_json::from_str(source).map_err(|e| WidgetError::invalid_description(path, e))?
        }
        DescriptionFormat::Toml => {
            let table: toml::Table =
                toml::from_str(source).map_err(|e| WidgetError::invalid_description(path, e))?;
            serde_json::to_value(table).map_err(|e| WidgetError::invalid_description(path, e))?
        }
    };

    let value = match value {
        serde_json::Value::Object(mut map) if map.len() == 1 && map.contains_key("default") => {
            map.remove("default").unwrap_or_default()
        }
        other => other,
    };

    if !value.is_object() {
        return Err(WidgetError::invalid_description(
            path,
            "expected a widget description object",
        ));
    }

    let widget: Widget =
        serde_json::from_value(value).map_err(|e| WidgetError::invalid_description(path, e))?;
    widget
        .validate()
        .map_err(|reason| WidgetError::invalid_description(path, reason))?;
    Ok(widget)
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Discover every widget under the configured widgets root, in file-name
/// order, and synthesize its entry module.
///
/// Declared names must be unique across the run: the root element id and
/// resource URI are derived from them.
pub fn discover_widgets(opts: &WidgetBuildOptions) -> Result<Vec<WidgetSource>, WidgetError> {
    let root = opts.widgets_root()?;
    if !root.is_dir() {
        return Err(WidgetError::MissingWidgetsDir(root));
    }

    let mut directories = Vec::new();
    for entry in fs::read_dir(&root)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        // Follows symlinks: a linked widget directory is still a widget
        if name == opts.staging_dir || !entry.path().is_dir() {
            continue;
        }
        directories.push((name, entry.path()));
    }
    directories.sort_by(|a, b| a.0.cmp(&b.0));

    let mut sources: Vec<WidgetSource> = Vec::with_capacity(directories.len());
    let mut declared: HashMap<String, usize> = HashMap::new();
    for (name, path) in directories {
        let Some(source) = load_widget(&name, &path, opts)? else {
            continue;
        };
        if let Some(&first) = declared.get(source.name()) {
            return Err(WidgetError::DuplicateWidget {
                name: source.name().to_string(),
                first: sources[first].description_path.clone(),
                second: source.description_path,
            });
        }
        declared.insert(source.name().to_string(), sources.len());
        sources.push(source);
    }

    Ok(sources)
}

/// Load one widget directory. Returns `Ok(None)` for directories holding no
/// files (organizational folders).
pub fn load_widget(
    directory_name: &str,
    directory: &Path,
    opts: &WidgetBuildOptions,
) -> Result<Option<WidgetSource>, WidgetError> {
    if !contains_files(directory)? {
        debug!("skipping {directory_name}: no files");
        return Ok(None);
    }

    let (format, data_path) = first_existing(
        directory,
        DescriptionFormat::PRECEDENCE
            .iter()
            .map(|format| (*format, format.file_name())),
    )?;
    let widget = parse_description(&fs::read_to_string(&data_path)?, format, &data_path)?;

    let (dialect, script_path) = first_existing(
        directory,
        ScriptDialect::PRECEDENCE
            .iter()
            .map(|dialect| (*dialect, format!("{INDEX_STEM}.{}", dialect.extension()))),
    )?;
    let script = fs::read_to_string(&script_path)?;
    if script.trim().is_empty() {
        return Err(WidgetError::EmptyEntry(script_path));
    }

    let stylesheet_path = directory.join(STYLESHEET_FILE);
    let stylesheet_text = if stylesheet_path.is_file() {
        Some(fs::read_to_string(&stylesheet_path)?)
    } else {
        None
    };

    let root_component_name = widget.root_component().to_string();
    let entry_script_text = synthesize_entry(
        &script,
        &widget.name,
        &root_component_name,
        &opts.runtime_module,
    );

    debug!(
        "discovered widget `{}` in {directory_name} ({}, stylesheet: {})",
        widget.name,
        dialect.extension(),
        stylesheet_text.is_some()
    );

    Ok(Some(WidgetSource {
        directory_name: directory_name.to_string(),
        directory: directory.to_path_buf(),
        description_path: data_path,
        root_component_name,
        entry_script_text,
        stylesheet_text,
        script_dialect: dialect,
        widget,
    }))
}

fn contains_files(directory: &Path) -> Result<bool, WidgetError> {
    for entry in fs::read_dir(directory)? {
        if !entry?.path().is_dir() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Pick the first candidate file that exists. When none does, the error names
/// the first two candidates.
fn first_existing<T, I>(directory: &Path, candidates: I) -> Result<(T, PathBuf), WidgetError>
where
    I: IntoIterator<Item = (T, String)>,
{
    let mut tried = Vec::new();
    for (tag, file_name) in candidates {
        let path = directory.join(file_name);
        if path.is_file() {
            return Ok((tag, path));
        }
        tried.push(path);
    }
    let mut tried = tried.into_iter();
    let primary = tried.next().unwrap_or_else(|| directory.to_path_buf());
    let secondary = tried.next().unwrap_or_else(|| primary.clone());
    Err(WidgetError::MissingFile { primary, secondary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_json(source: &str) -> Result<Widget, WidgetError> {
        parse_description(source, DescriptionFormat::Json, Path::new("data.json"))
    }

    #[test]
    fn parses_direct_object() {
        let widget = parse_json(r#"{ "name": "greeting" }"#).unwrap();
        assert_eq!(widget, Widget::new("greeting"));
    }

    #[test]
    fn parses_default_export_wrapper() {
        let widget = parse_json(r#"{ "default": { "name": "greeting", "enableBorder": true } }"#)
            .unwrap();
        assert_eq!(widget, Widget::new("greeting").with_border());
    }

    #[test]
    fn parses_toml() {
        let source = r#"
name = "weather"
description = "Current conditions"

[csp]
connectDomains = ["https://api.weather.test"]
"#;
        let widget =
            parse_description(source, DescriptionFormat::Toml, Path::new("data.toml")).unwrap();
        assert_eq!(
            widget,
            Widget::new("weather")
                .with_description("Current conditions")
                .add_connect_domains(["https://api.weather.test"])
        );
    }

    #[test]
    fn parses_toml_default_table() {
        let source = "[default]\nname = \"weather\"\n";
        let widget =
            parse_description(source, DescriptionFormat::Toml, Path::new("data.toml")).unwrap();
        assert_eq!(widget.name, "weather");
    }

    #[test]
    fn rejects_non_object() {
        let err = parse_json(r#"["greeting"]"#).unwrap_err();
        assert!(matches!(err, WidgetError::InvalidDescription { .. }));
        assert!(err.to_string().contains("does not export a valid widget description"));
    }

    #[test]
    fn rejects_default_wrapping_non_object() {
        let err = parse_json(r#"{ "default": 42 }"#).unwrap_err();
        assert!(matches!(err, WidgetError::InvalidDescription { .. }));
    }

    #[test]
    fn rejects_wrong_field_type() {
        let err = parse_json(r#"{ "name": "greeting", "enableBorder": "yes" }"#).unwrap_err();
        assert!(matches!(err, WidgetError::InvalidDescription { .. }));
    }

    #[test]
    fn rejects_blank_name() {
        let err = parse_json(r#"{ "name": "" }"#).unwrap_err();
        assert!(err.to_string().contains("name must be a non-empty string"));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = parse_json("{ name: ").unwrap_err();
        assert!(matches!(err, WidgetError::InvalidDescription { .. }));
    }
}
