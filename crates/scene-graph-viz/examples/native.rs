//! Native desktop runner for scene-graph-viz development.
//!
//! Run with: cargo run --example native --features native -- [IMAGE]

use std::path::PathBuf;

use scene_graph_client::Config;
use scene_graph_core::SelectedImage;
use scene_graph_viz::ViewerOptions;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> eframe::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("scene_graph_viz=debug")),
        )
        .init();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: {}; using defaults", e);
        Config::default()
    });

    let image = std::env::args().nth(1).map(PathBuf::from).and_then(|path| {
        SelectedImage::from_path(&path)
            .map_err(|e| eprintln!("Warning: {}", e))
            .ok()
    });

    scene_graph_viz::run_native(ViewerOptions::from_config(&config), image)
}
