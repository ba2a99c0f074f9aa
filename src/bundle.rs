//! Core pipeline.
//!
//! This module orchestrates one full run:
//! 1. Discover widgets and synthesize their entries
//! 2. Bundle every entry in a single Rolldown build through the overlay
//! 3. Assemble one HTML fragment per widget
//! 4. Return the sealed `WidgetBuild`
//!
//! Nothing is produced until the batch build succeeds: a configuration or
//! compilation error returns before any artifact or debug file exists.

use std::time::Instant;

use log::info;

use crate::assemble;
use crate::bundler;
use crate::discovery;
use crate::{BuiltWidget, Diagnostic, WidgetBuild, WidgetBuildOptions, WidgetError};

/// Execute the widget pipeline.
pub async fn execute_build(opts: &WidgetBuildOptions) -> Result<WidgetBuild, WidgetError> {
    let mut diagnostics: Vec<Diagnostic> = Vec::new();

    let widgets_root = opts.widgets_root()?;
    let staging_root = opts.staging_root()?;

    let sources = discovery::discover_widgets(opts)?;

    info!("Building {} widgets...", sources.len());
    diagnostics.push(Diagnostic::info(format!(
        "Build started for {} widgets in {}",
        sources.len(),
        widgets_root.display()
    )));

    let start = Instant::now();

    let outputs = bundler::batch_bundle(&sources, &widgets_root, &staging_root, opts).await?;

    let artifacts =
        assemble::assemble_all(&sources, &outputs, &staging_root, opts.debug, &mut diagnostics)
            .await;

    let elapsed = start.elapsed().as_millis();
    info!("Done in {elapsed}ms");
    diagnostics.push(Diagnostic::info(format!(
        "Build complete: {} widgets, {} bundle outputs, {elapsed}ms",
        artifacts.len(),
        outputs.len()
    )));

    let widgets = sources
        .into_iter()
        .zip(artifacts)
        .map(|(source, artifact)| BuiltWidget {
            widget: source.widget,
            artifact,
        })
        .collect();

    Ok(WidgetBuild {
        widgets,
        diagnostics,
    })
}
