//! # Widget Bundler
//!
//! Packages a directory of UI widgets into self-contained HTML fragments that
//! can be registered as resources on a remote procedure server.
//!
//! One run walks the widgets root, synthesizes a mounting entry module per
//! widget, bundles every entry in a single Rolldown build (the synthesized
//! entries live only in an in-memory overlay), inlines each bundle together
//! with its optional stylesheet, and hands the result to a registry.

pub mod assemble;
pub mod bundle;
pub mod bundler;
pub mod discovery;
pub mod entry;
pub mod plugin;
pub mod registry;
pub mod utils;
pub mod widget;

use std::path::{Path, PathBuf};

use path_absolutize::Absolutize;
use rolldown_common::ModuleType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use registry::{InMemoryRegistry, ResourceContents, ResourceReader, WidgetRegistry};
pub use widget::{Widget, WidgetCsp, WidgetResource};

// ---------------------------------------------------------------------------
// Script Dialect
// ---------------------------------------------------------------------------

/// The markup-capable script dialect of a widget entry file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptDialect {
    Jsx,
    Tsx,
}

impl ScriptDialect {
    /// Lookup order when a widget directory holds more than one entry file.
    pub const PRECEDENCE: [ScriptDialect; 2] = [ScriptDialect::Jsx, ScriptDialect::Tsx];

    pub fn extension(self) -> &'static str {
        match self {
            ScriptDialect::Jsx => "jsx",
            ScriptDialect::Tsx => "tsx",
        }
    }

    /// The Rolldown module type used to parse overlay content of this dialect.
    pub fn module_type(self) -> ModuleType {
        match self {
            ScriptDialect::Jsx => ModuleType::Jsx,
            ScriptDialect::Tsx => ModuleType::Tsx,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline records
// ---------------------------------------------------------------------------

/// A discovered widget, ready to be bundled.
///
/// Immutable once discovery returns it; owned by the run that found it.
#[derive(Debug, Clone)]
pub struct WidgetSource {
    /// Name of the widget's directory under the widgets root.
    pub directory_name: String,
    /// Absolute path of the widget's directory.
    pub directory: PathBuf,
    /// The description file the widget was declared in.
    pub description_path: PathBuf,
    /// Component rendered into the root element by the synthesized entry.
    pub root_component_name: String,
    /// The synthesized entry module (author script + mount snippet).
    pub entry_script_text: String,
    /// Contents of `index.css`, if present.
    pub stylesheet_text: Option<String>,
    pub script_dialect: ScriptDialect,
    /// The parsed description file.
    pub widget: Widget,
}

impl WidgetSource {
    /// The declared widget name (not the directory name).
    pub fn name(&self) -> &str {
        &self.widget.name
    }
}

/// One in-memory bundler output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleOutput {
    /// Bundler input name the chunk was emitted for, `<directory_name>/entry`.
    pub entry_name: String,
    /// `<staging-root>/<directory_name>/entry.js` unless the bundler
    /// sanitized the file name.
    pub output_path: PathBuf,
    pub text: String,
}

/// Final inlined HTML for one widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledArtifact {
    pub widget_name: String,
    pub directory_name: String,
    pub html: String,
}

/// A widget description paired with its assembled artifact.
#[derive(Debug, Clone)]
pub struct BuiltWidget {
    pub widget: Widget,
    pub artifact: AssembledArtifact,
}

/// The result of one pipeline run, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct WidgetBuild {
    pub widgets: Vec<BuiltWidget>,
    /// Diagnostics collected during the run.
    pub diagnostics: Vec<Diagnostic>,
}

impl WidgetBuild {
    pub fn artifacts(&self) -> impl Iterator<Item = &AssembledArtifact> {
        self.widgets.iter().map(|built| &built.artifact)
    }

    pub fn get(&self, widget_name: &str) -> Option<&BuiltWidget> {
        self.widgets
            .iter()
            .find(|built| built.artifact.widget_name == widget_name)
    }
}

// ---------------------------------------------------------------------------
// Diagnostic
// ---------------------------------------------------------------------------

/// A structured diagnostic emitted during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    pub context: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    Error,
    Warning,
    Info,
}

impl Diagnostic {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Info,
            message: message.into(),
            context: None,
        }
    }

    pub fn warning(message: impl Into<String>, context: Option<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            message: message.into(),
            context,
        }
    }
}

// ---------------------------------------------------------------------------
// WidgetBuildOptions
// ---------------------------------------------------------------------------

/// Describes WHERE the widgets live and HOW to bundle them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetBuildOptions {
    /// Widgets root. Relative paths are resolved against the current directory.
    pub widgets_dir: PathBuf,
    /// Reserved subdirectory name used as the bundler's output base.
    /// Never treated as a widget.
    pub staging_dir: String,
    /// Write `index.debug.html` next to each widget's sources.
    pub debug: bool,
    /// Module the synthesized entry imports `createRoot` from.
    pub runtime_module: String,
    /// Bare specifiers left unbundled (exact match or subpath).
    pub external: Vec<String>,
    /// Minify bundled output.
    pub minify: bool,
}

impl Default for WidgetBuildOptions {
    fn default() -> Self {
        Self {
            widgets_dir: PathBuf::from("widgets"),
            staging_dir: "dist".into(),
            debug: false,
            runtime_module: entry::DEFAULT_RUNTIME_MODULE.into(),
            external: Vec::new(),
            minify: false,
        }
    }
}

impl WidgetBuildOptions {
    pub fn new(widgets_dir: impl Into<PathBuf>) -> Self {
        Self {
            widgets_dir: widgets_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_external<I, S>(mut self, specifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.external.extend(specifiers.into_iter().map(Into::into));
        self
    }

    /// Absolute widgets root.
    pub fn widgets_root(&self) -> Result<PathBuf, WidgetError> {
        Ok(self.widgets_dir.absolutize()?.into_owned())
    }

    /// Absolute bundler output base, `<widgets-root>/<staging_dir>`.
    pub fn staging_root(&self) -> Result<PathBuf, WidgetError> {
        Ok(self.widgets_root()?.join(&self.staging_dir))
    }
}

// ---------------------------------------------------------------------------
// WidgetError
// ---------------------------------------------------------------------------

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("widgets directory {} does not exist", utils::display_path(.0))]
    MissingWidgetsDir(PathBuf),

    #[error("{} or {} does not exist", utils::display_path(.primary), utils::display_path(.secondary))]
    MissingFile { primary: PathBuf, secondary: PathBuf },

    #[error("{} does not exist or is empty", utils::display_path(.0))]
    EmptyEntry(PathBuf),

    #[error("{} does not export a valid widget description: {reason}", utils::display_path(.path))]
    InvalidDescription { path: PathBuf, reason: String },

    #[error(
        "widget name `{name}` is declared by both {} and {}",
        utils::display_path(.first),
        utils::display_path(.second)
    )]
    DuplicateWidget {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Build failed: {0}")]
    BuildError(String),

    #[error("Bundle is not self-contained: chunk `{0}` was split out of the widget entries")]
    SharedChunk(String),

    #[error("Registration failed: {0}")]
    RegistrationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl WidgetError {
    pub(crate) fn invalid_description(path: &Path, reason: impl ToString) -> Self {
        WidgetError::InvalidDescription {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Discover, bundle and assemble every widget under `opts.widgets_dir`.
///
/// Configuration errors and bundler errors abort the run before any artifact
/// (or debug file) is produced. A widget whose bundle output cannot be paired
/// degrades to an empty script and a warning diagnostic.
pub async fn build_widgets(opts: &WidgetBuildOptions) -> Result<WidgetBuild, WidgetError> {
    bundle::execute_build(opts).await
}

/// Build every widget and register each one with `registry`.
pub async fn register_widgets<R>(
    opts: &WidgetBuildOptions,
    registry: &R,
) -> Result<WidgetBuild, WidgetError>
where
    R: WidgetRegistry + ?Sized,
{
    let build = build_widgets(opts).await?;
    for built in &build.widgets {
        registry::register_artifact(registry, &built.widget, &built.artifact)?;
    }
    Ok(build)
}
