//! UI components for the diagram panel.
//!
//! This module contains rendering functions for overlays drawn on top of
//! the graph widget.

mod overlays;

pub use overlays::{draw_footprints, draw_overview, draw_sidebar_toggle, CanvasTransform};
