//! Batch bundler.
//!
//! Runs one Rolldown build for the whole widget set: one input per widget,
//! every input pointing at its synthesized entry in the overlay. Output stays
//! in memory and is returned as one [`BundleOutput`] per entry chunk.
//!
//! The overlay loader scopes every module to the widget importing it, so
//! code shared between widgets is duplicated into each entry chunk rather
//! than split out.

use std::path::Path;
use std::sync::Arc;

use log::debug;
use rolldown::{Bundler, BundlerBuilder, BundlerOptions, InputItem};
use rolldown_common::{OutputFormat, Platform, RawMinifyOptions};

use crate::plugin::{OverlayLoader, VirtualOverlay};
use crate::utils;
use crate::{BundleOutput, WidgetBuildOptions, WidgetError, WidgetSource};

/// Create a configured Rolldown bundler for a widget set.
///
/// Input `i` is named `<directory_name>/entry`, so with Rolldown's default
/// `[name].js` entry pattern its chunk lands at
/// `<staging-root>/<directory_name>/entry.js`.
pub fn create_widget_bundler(
    sources: &[WidgetSource],
    loader: OverlayLoader,
    widgets_root: &Path,
    staging_root: &Path,
    opts: &WidgetBuildOptions,
) -> Result<Bundler, WidgetError> {
    let input = sources
        .iter()
        .map(|source| InputItem {
            name: Some(utils::entry_input_name(&source.directory_name).into()),
            import: utils::synthetic_entry_path(
                widgets_root,
                &source.directory_name,
                source.script_dialect,
            )
            .to_string_lossy()
            .into_owned()
            .into(),
        })
        .collect();

    let options = BundlerOptions {
        input: Some(input),
        cwd: Some(widgets_root.to_path_buf()),
        dir: Some(staging_root.to_string_lossy().into_owned()),
        format: Some(OutputFormat::Esm),
        platform: Some(Platform::Browser),
        minify: Some(RawMinifyOptions::Bool(opts.minify)),
        ..Default::default()
    };

    BundlerBuilder::default()
        .with_options(options)
        .with_plugins(vec![Arc::new(loader)])
        .build()
        .map_err(|e| WidgetError::BuildError(format!("Rolldown init failed: {:?}", e)))
}

/// Bundle every widget in a single build.
///
/// All-or-nothing: any fatal bundler error fails the whole batch. A
/// non-entry chunk (a dynamic `import()` split off) also fails the batch,
/// since the entry importing it would not be self-contained once inlined.
pub async fn batch_bundle(
    sources: &[WidgetSource],
    widgets_root: &Path,
    staging_root: &Path,
    opts: &WidgetBuildOptions,
) -> Result<Vec<BundleOutput>, WidgetError> {
    if sources.is_empty() {
        return Ok(Vec::new());
    }

    let overlay = VirtualOverlay::for_widgets(widgets_root, sources);
    let loader =
        OverlayLoader::new(overlay.clone(), widgets_root).with_external(opts.external.clone());
    let loaded = loader.loaded_paths();

    let mut bundler = create_widget_bundler(sources, loader, widgets_root, staging_root, opts)?;

    // Run the bundling pass (in memory; `generate` never writes)
    let bundle_output = bundler
        .generate()
        .await
        .map_err(|e| WidgetError::BuildError(format!("Rolldown build failed: {:?}", e)))?;

    bundler
        .close()
        .await
        .map_err(|e| WidgetError::BuildError(format!("Rolldown close failed: {:?}", e)))?;

    debug!(
        "overlay served {} of {} synthesized entries",
        loaded.len(),
        overlay.len()
    );
    overlay.clear();

    let mut outputs = Vec::with_capacity(sources.len());
    for asset in bundle_output.assets.iter() {
        match asset {
            rolldown_common::Output::Chunk(chunk) => {
                if !chunk.is_entry {
                    return Err(WidgetError::SharedChunk(chunk.filename.to_string()));
                }
                outputs.push(BundleOutput {
                    entry_name: chunk.name.to_string(),
                    output_path: utils::normalize_path(&staging_root.join(chunk.filename.as_str())),
                    text: utils::strip_region_comments(&chunk.code),
                });
            }
            rolldown_common::Output::Asset(asset) => {
                debug!("ignoring emitted asset {}", asset.filename);
            }
        }
    }

    Ok(outputs)
}
