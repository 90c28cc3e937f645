//! Analyze command implementation.
//!
//! Uploads one image to the analysis service and prints the result.

use std::path::Path;

use anyhow::{Context, Result};
use humansize::{format_size, DECIMAL};
use tracing::info;

use scene_graph_client::{AnalysisClient, Config, Controller, SubmitOutcome};
use scene_graph_core::{render, AnalysisResult, SelectedImage};

use super::diagram::diagram_text;

/// Output format for analysis results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => anyhow::bail!("Unknown format: {}. Use 'text' or 'json'", s),
        }
    }
}

/// Execute the analyze command.
pub async fn execute(
    config: &Config,
    image_path: &Path,
    format: OutputFormat,
    save_image: Option<&Path>,
) -> Result<()> {
    let image = SelectedImage::from_path(image_path)
        .with_context(|| format!("Cannot analyze {}", image_path.display()))?;

    info!(
        file = %image.name(),
        media_type = %image.media_type(),
        size = %format_size(image.len(), DECIMAL),
        endpoint = %config.endpoint,
        "Analyzing image"
    );

    let client =
        AnalysisClient::from_config(config).context("Failed to create analysis client")?;
    let controller = Controller::new(client);
    controller.intake(image);

    let result = match controller.submit().await {
        SubmitOutcome::Completed(result) => result,
        SubmitOutcome::Failed(e) => {
            return Err(e).context(format!("Analysis failed at {}", config.endpoint));
        }
        other => anyhow::bail!("Analysis did not run ({})", other.label()),
    };

    if let Some(path) = save_image {
        std::fs::write(path, result.processed_image())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Saved processed image");
    }

    match format {
        OutputFormat::Text => println!("{}", result_text(&result, config.show_overview)),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result.to_response())
                .context("Failed to serialize analysis result")?;
            println!("{}", json);
        }
    }

    Ok(())
}

fn result_text(result: &AnalysisResult, show_overview: bool) -> String {
    let scene = result.scene_graph();
    let mut out = String::new();

    out.push_str("Description:\n");
    if result.description().is_empty() {
        out.push_str("  (none)\n");
    } else {
        out.push_str(&format!("  {}\n", result.description()));
    }

    out.push_str(&format!(
        "Processed image: {}\n",
        format_size(result.processed_image().len(), DECIMAL)
    ));

    out.push_str(&format!("Objects ({}):\n", scene.object_count()));
    for object in &scene.objects {
        out.push_str(&format!("  • {}\n", object.id));
    }

    out.push_str(&format!("Relationships ({}):\n", scene.relationship_count()));
    for relationship in &scene.relationships {
        out.push_str(&format!("  • {}\n", relationship));
    }

    out.push_str(&diagram_text(&render(scene, show_overview)));
    out
}
