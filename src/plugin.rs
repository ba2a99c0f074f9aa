//! Rolldown plugin layer.
//!
//! The synthesized entry of every widget lives only in memory. The
//! [`VirtualOverlay`] holds those modules keyed by a synthetic path inside the
//! widget's own directory, and the [`OverlayLoader`] plugin puts the overlay in
//! front of Rolldown's filesystem resolver:
//!
//! 1. `resolve_id` claims requests that normalize to an overlay path
//! 2. `load` serves the recorded content with the matching module type
//! 3. everything else is found by Rolldown's resolver and scoped to the
//!    importing widget, so sibling files resolve from disk and no module is
//!    shared between two widgets' chunks

pub mod overlay;
pub mod overlay_loader;

pub use overlay::{OverlayRecord, VirtualOverlay};
pub use overlay_loader::{scope_resolved_id, ImporterScope, OverlayLoader, Resolution};
