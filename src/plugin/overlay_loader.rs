//! Overlay Loader: Rolldown plugin that serves synthesized widget entries
//! from the [`VirtualOverlay`] and keeps every widget's module graph apart.
//!
//! Implements the Rolldown `Plugin` trait with:
//! - `resolve_id`: claim specifiers that land on an overlay path, mark
//!   configured bare specifiers external, and scope everything a widget
//!   imports from disk to that widget
//! - `load`: hand overlay content and its module type to the parser, read
//!   scoped modules from disk
//!
//! **Invariants:**
//! - Interception is exact-path: siblings of a synthesized entry (helpers,
//!   assets) are found by Rolldown's own resolver, never by the overlay
//! - Overlay content is never read from or written to disk
//! - A module imported by two widgets is two modules, one per widget, so
//!   each entry chunk is self-contained

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arcstr::ArcStr;
use dashmap::DashSet;
use log::debug;
use rolldown_common::ResolvedExternal;
use rolldown_plugin::{
    HookLoadArgs, HookLoadOutput, HookResolveIdArgs, HookResolveIdOutput, HookUsage, Plugin,
    PluginContextResolveOptions, SharedLoadPluginContext,
};

use crate::plugin::overlay::VirtualOverlay;
use crate::utils;

/// Outcome of consulting the overlay for one resolve request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The specifier names an overlay record.
    Overlay(PathBuf),
    /// The specifier is a configured external and stays a bare import.
    External(String),
    /// No decision; Rolldown's resolver takes over.
    Defer,
}

/// The widget an importer belongs to and where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImporterScope {
    pub widget_index: usize,
    /// Path the importer's own relative imports are resolved from.
    pub path: PathBuf,
}

/// The overlay Rolldown plugin.
pub struct OverlayLoader {
    overlay: VirtualOverlay,
    /// Fallback base for relative specifiers without an importer.
    widgets_root: PathBuf,
    external: Arc<Vec<String>>,
    /// Overlay paths claimed in `resolve_id`.
    claimed: Arc<DashSet<PathBuf>>,
    /// Overlay paths served through `load` during the build.
    loaded: Arc<DashSet<PathBuf>>,
}

impl fmt::Debug for OverlayLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayLoader")
            .field("records", &self.overlay.len())
            .field("widgets_root", &self.widgets_root)
            .field("external", &self.external)
            .finish()
    }
}

impl OverlayLoader {
    pub fn new(overlay: VirtualOverlay, widgets_root: impl Into<PathBuf>) -> Self {
        Self {
            overlay,
            widgets_root: widgets_root.into(),
            external: Arc::new(Vec::new()),
            claimed: Arc::new(DashSet::new()),
            loaded: Arc::new(DashSet::new()),
        }
    }

    pub fn with_external(mut self, external: Vec<String>) -> Self {
        self.external = Arc::new(external);
        self
    }

    /// Overlay paths that were served through `load`.
    pub fn loaded_paths(&self) -> Arc<DashSet<PathBuf>> {
        Arc::clone(&self.loaded)
    }

    /// Decide how a specifier raised by `importer` resolves.
    ///
    /// Absolute specifiers are looked up as-is; anything else is joined onto
    /// the importer's recorded base directory (overlay importers), the
    /// importer's parent directory (on-disk importers), or the widgets root.
    pub fn resolve_specifier(&self, specifier: &str, importer: Option<&str>) -> Resolution {
        let is_bare = !Path::new(specifier).is_absolute() && !utils::is_relative_specifier(specifier);
        if is_bare && utils::is_external(specifier, &self.external) {
            return Resolution::External(specifier.to_string());
        }

        let importer = importer.map(|id| utils::parse_scoped_module_id(id).map_or(id, |(_, path)| path));
        let base = self.importer_base(importer);
        let candidate = utils::resolve_against(&base, specifier);

        if self.overlay.contains(&candidate) {
            Resolution::Overlay(candidate)
        } else {
            Resolution::Defer
        }
    }

    fn importer_base(&self, importer: Option<&str>) -> PathBuf {
        let Some(importer) = importer else {
            return self.widgets_root.clone();
        };
        let importer = Path::new(importer);
        if let Some(base) = self.overlay.base_directory(importer) {
            return base;
        }
        importer
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.widgets_root.clone())
    }

    /// Which widget an importer id belongs to: a synthesized entry or a
    /// module already scoped to a widget. Anything else has no scope.
    pub fn importer_scope(&self, importer: &str) -> Option<ImporterScope> {
        if let Some((widget_index, path)) = utils::parse_scoped_module_id(importer) {
            return Some(ImporterScope {
                widget_index,
                path: PathBuf::from(path),
            });
        }
        self.overlay
            .get(Path::new(importer))
            .map(|record| ImporterScope {
                widget_index: record.widget_index,
                path: record.absolute_path,
            })
    }

    /// Content for a module id, or `None` when the id is not served here.
    ///
    /// Fails when an overlay path claimed during resolution is no longer in
    /// the overlay, or when a scoped module cannot be read.
    pub fn load_module(&self, id: &str) -> rolldown_plugin::HookLoadReturn {
        if let Some((_, path)) = utils::parse_scoped_module_id(id) {
            let code = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("Failed to read '{}': {}", path, e))?;
            // Module type comes from the id's extension
            return Ok(Some(HookLoadOutput {
                code: ArcStr::from(code),
                ..Default::default()
            }));
        }

        let path = utils::normalize_path(Path::new(id));
        let Some(record) = self.overlay.get(&path) else {
            if self.claimed.contains(&path) {
                return Err(anyhow::anyhow!(
                    "Overlay entry '{}' was removed before load",
                    path.display()
                ));
            }
            return Ok(None);
        };

        self.loaded.insert(record.absolute_path.clone());

        Ok(Some(HookLoadOutput {
            code: ArcStr::from(record.content),
            module_type: Some(record.dialect.module_type()),
            ..Default::default()
        }))
    }
}

/// Scope a module id found by Rolldown's resolver to one widget. Ids that
/// are not file paths (virtual modules) are left shared.
pub fn scope_resolved_id(widget_index: usize, resolved_id: &str) -> Option<String> {
    if !Path::new(resolved_id).is_absolute() {
        return None;
    }
    Some(utils::scoped_module_id(widget_index, resolved_id))
}

// ---------------------------------------------------------------------------
// Rolldown Plugin Trait Implementation
// ---------------------------------------------------------------------------

impl Plugin for OverlayLoader {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("widget-overlay")
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId | HookUsage::Load
    }

    /// Claim overlay paths and configured externals; scope the rest.
    fn resolve_id(
        &self,
        ctx: &rolldown_plugin::PluginContext,
        args: &HookResolveIdArgs<'_>,
    ) -> impl std::future::Future<Output = rolldown_plugin::HookResolveIdReturn> + Send {
        let resolution = self.resolve_specifier(args.specifier, args.importer);
        let scope = args.importer.and_then(|importer| self.importer_scope(importer));
        let specifier = args.specifier.to_string();
        let kind = args.kind;
        let claimed = Arc::clone(&self.claimed);

        async move {
            match resolution {
                Resolution::Overlay(path) => {
                    debug!("overlay resolve: {}", path.display());
                    claimed.insert(path.clone());
                    Ok(Some(HookResolveIdOutput {
                        id: ArcStr::from(path.to_string_lossy().as_ref()),
                        external: Some(ResolvedExternal::Bool(false)),
                        ..Default::default()
                    }))
                }
                Resolution::External(specifier) => Ok(Some(HookResolveIdOutput {
                    id: ArcStr::from(specifier),
                    external: Some(ResolvedExternal::Bool(true)),
                    ..Default::default()
                })),
                Resolution::Defer => {
                    let Some(scope) = scope else {
                        return Ok(None);
                    };

                    // Resolve from the importer's real location, then scope
                    let importer = scope.path.to_string_lossy().into_owned();
                    let resolved = ctx
                        .resolve(
                            &specifier,
                            Some(&importer),
                            Some(PluginContextResolveOptions {
                                import_kind: kind,
                                skip_self: true,
                                ..Default::default()
                            }),
                        )
                        .await?;
                    let Ok(resolved) = resolved else {
                        return Ok(None);
                    };

                    Ok(scope_resolved_id(scope.widget_index, &resolved.id).map(|id| {
                        HookResolveIdOutput {
                            id: ArcStr::from(id),
                            external: Some(ResolvedExternal::Bool(false)),
                            ..Default::default()
                        }
                    }))
                }
            }
        }
    }

    /// Serve overlay content and scoped modules.
    fn load(
        &self,
        _ctx: SharedLoadPluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = rolldown_plugin::HookLoadReturn> + Send {
        let result = self.load_module(args.id);
        async move { result }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
