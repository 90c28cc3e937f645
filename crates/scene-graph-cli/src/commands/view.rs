//! Native egui viewer command.
//!
//! Launches a native desktop window, optionally with an image preselected.

use std::path::Path;

use anyhow::{Context, Result};
use scene_graph_client::Config;
use scene_graph_core::SelectedImage;
use scene_graph_viz::ViewerOptions;

/// Execute the view command.
pub fn execute(config: &Config, image: Option<&Path>) -> Result<()> {
    let image = image
        .map(|path| {
            SelectedImage::from_path(path)
                .with_context(|| format!("Cannot open {}", path.display()))
        })
        .transpose()?;

    println!("🖼️  Launching viewer (endpoint: {})", config.endpoint);

    scene_graph_viz::run_native(ViewerOptions::from_config(config), image)
        .map_err(|e| anyhow::anyhow!("Viewer error: {}", e))
}
