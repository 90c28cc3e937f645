//! Diagram command implementation.
//!
//! Derives the node/edge diagram from a saved analysis response.

use std::path::Path;

use anyhow::{Context, Result};
use petgraph::dot::{Config as DotConfig, Dot};
use petgraph::visit::EdgeRef;
use serde::Serialize;

use scene_graph_core::{
    render, AnalysisResponse, AnalysisResult, DiagramModel, OverviewPane, RenderedDiagram,
};

/// Output format for diagrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Dot,
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "dot" | "graphviz" => Ok(Self::Dot),
            _ => anyhow::bail!("Unknown format: {}. Use 'text', 'json' or 'dot'", s),
        }
    }
}

#[derive(Serialize)]
struct DiagramJson<'a> {
    #[serde(flatten)]
    model: &'a DiagramModel,
    #[serde(skip_serializing_if = "Option::is_none")]
    overview: Option<&'a OverviewPane>,
}

/// Load and validate a saved analysis response.
pub fn load_result(path: &Path) -> Result<AnalysisResult> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let response = AnalysisResponse::from_json(&json)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    AnalysisResult::try_from(response)
        .with_context(|| format!("Invalid analysis result in {}", path.display()))
}

/// Execute the diagram command.
pub fn execute(path: &Path, format: OutputFormat, overview: bool) -> Result<()> {
    let result = load_result(path)?;
    let rendered = render(result.scene_graph(), overview);
    println!("{}", format_diagram(&rendered, format)?);
    Ok(())
}

pub fn format_diagram(rendered: &RenderedDiagram, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(diagram_text(rendered)),
        OutputFormat::Json => {
            let json = DiagramJson {
                model: &rendered.model,
                overview: rendered.overview.as_ref(),
            };
            serde_json::to_string_pretty(&json).context("Failed to serialize diagram")
        }
        OutputFormat::Dot => Ok(diagram_dot(&rendered.model)),
    }
}

/// Graphviz rendering; edges with an unknown endpoint are left out.
fn diagram_dot(model: &DiagramModel) -> String {
    let (graph, _) = model.to_petgraph();
    let dot = Dot::with_attr_getters(
        &graph,
        &[DotConfig::NodeNoLabel, DotConfig::EdgeNoLabel],
        &|_, edge| format!("label = {:?}", edge.weight().label),
        &|_, (_, node)| format!("label = {:?} shape = box", node.label),
    );
    format!("{:?}", dot)
}

pub fn diagram_text(rendered: &RenderedDiagram) -> String {
    let model = &rendered.model;
    let mut out = String::new();

    out.push_str(&format!(
        "Diagram: {} nodes, {} edges\n",
        model.node_count(),
        model.edge_count()
    ));
    for node in &model.nodes {
        out.push_str(&format!(
            "  [{}] at ({:.1}, {:.1}) size {:.1}x{:.1}\n",
            node.id, node.position.x, node.position.y, node.size.width, node.size.height
        ));
    }
    for edge in &model.edges {
        out.push_str(&format!(
            "  {}: {} --{}--> {}\n",
            edge.id, edge.source, edge.label, edge.target
        ));
    }

    if !model.issues.is_empty() {
        out.push_str(&format!("Issues ({}):\n", model.issues.len()));
        for issue in &model.issues {
            out.push_str(&format!("  ⚠ {}\n", issue));
        }
    }

    if let Some(pane) = &rendered.overview {
        out.push_str(&format!(
            "Overview: {:.0}x{:.0} at scale {:.3}\n",
            pane.size.width, pane.size.height, pane.scale
        ));
    }

    out.trim_end().to_string()
}
