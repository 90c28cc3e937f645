//! Scene graph to node/edge diagram transformation.
//!
//! The diagram is always recomputed from scratch from a [`SceneGraph`]; it
//! is never patched incrementally. User edits live in
//! [`LiveDiagram`](crate::LiveDiagram).

use std::collections::{HashMap, HashSet};

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::model::SceneGraph;
use crate::overview::OverviewPane;

/// A point on the diagram canvas (image-space units).
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Width and height of a node footprint.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned box enclosing a set of node footprints.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    /// Bounds of a single footprint.
    pub fn from_footprint(position: Point, size: Size) -> Self {
        Self {
            min: position,
            max: Point::new(position.x + size.width, position.y + size.height),
        }
    }

    /// Smallest bounds containing both.
    pub fn union(self, other: Bounds) -> Self {
        Self {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Whether `other` lies entirely inside these bounds.
    pub fn contains(&self, other: &Bounds) -> bool {
        other.min.x >= self.min.x
            && other.min.y >= self.min.y
            && other.max.x <= self.max.x
            && other.max.y <= self.max.y
    }
}

/// A relationship string split into its parts.
///
/// `"A is next to B"` parses to source `A`, predicate `is next to`, target `B`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship<'a> {
    pub source: &'a str,
    pub predicate: String,
    pub target: &'a str,
}

impl<'a> Relationship<'a> {
    /// Split on whitespace. Needs at least two tokens.
    pub fn parse(text: &'a str) -> Option<Self> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let (&source, rest) = tokens.split_first()?;
        let (&target, middle) = rest.split_last()?;
        Some(Self {
            source,
            predicate: middle.join(" "),
            target,
        })
    }
}

/// Diagram node for one detected object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramNode {
    /// Object id; also the node key.
    pub id: String,
    /// Top-left corner of the footprint.
    pub position: Point,
    pub size: Size,
    pub label: String,
}

impl DiagramNode {
    pub fn bounds(&self) -> Bounds {
        Bounds::from_footprint(self.position, self.size)
    }
}

/// Where a diagram edge came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EdgeOrigin {
    /// Seeded from the relationship at this ordinal.
    Relationship { index: usize },
    /// Connected by hand in the live diagram.
    User,
}

/// Diagram edge for one relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramEdge {
    /// `e<ordinal>` for seeded edges.
    pub id: String,
    pub source: String,
    pub target: String,
    /// Predicate words, possibly empty.
    pub label: String,
    pub origin: EdgeOrigin,
}

/// Non-fatal problems found while building a diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagramIssue {
    /// Fewer than two tokens; no edge was created.
    MalformedRelationship { index: usize, text: String },
    /// The edge was kept but an endpoint names no object.
    DanglingEndpoint { edge_id: String, missing: String },
    /// A second object reused an id; only the first is addressable.
    DuplicateNode { id: String },
}

impl std::fmt::Display for DiagramIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagramIssue::MalformedRelationship { index, text } => {
                write!(f, "relationship #{} is malformed: {:?}", index, text)
            }
            DiagramIssue::DanglingEndpoint { edge_id, missing } => {
                write!(f, "edge {} refers to unknown object '{}'", edge_id, missing)
            }
            DiagramIssue::DuplicateNode { id } => write!(f, "duplicate object id '{}'", id),
        }
    }
}

/// Node/edge model derived from a scene graph.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramModel {
    pub nodes: Vec<DiagramNode>,
    pub edges: Vec<DiagramEdge>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagramIssue>,
}

impl DiagramModel {
    /// Build the diagram for a scene graph.
    pub fn from_scene_graph(scene: &SceneGraph) -> Self {
        let mut nodes = Vec::with_capacity(scene.objects.len());
        let mut issues = Vec::new();
        let mut ids = HashSet::with_capacity(scene.objects.len());

        for object in &scene.objects {
            if !ids.insert(object.id.as_str()) {
                issues.push(DiagramIssue::DuplicateNode {
                    id: object.id.clone(),
                });
            }
            nodes.push(DiagramNode {
                id: object.id.clone(),
                position: Point::new(object.x, object.y),
                size: Size::new(object.width, object.height),
                label: object.id.clone(),
            });
        }

        let mut edges = Vec::with_capacity(scene.relationships.len());
        for (index, parsed) in scene.parsed_relationships() {
            let Some(rel) = parsed else {
                warn!(index, text = %scene.relationships[index], "Skipping malformed relationship");
                issues.push(DiagramIssue::MalformedRelationship {
                    index,
                    text: scene.relationships[index].clone(),
                });
                continue;
            };

            let edge_id = format!("e{}", index);
            for endpoint in [rel.source, rel.target] {
                if !ids.contains(endpoint) {
                    issues.push(DiagramIssue::DanglingEndpoint {
                        edge_id: edge_id.clone(),
                        missing: endpoint.to_string(),
                    });
                }
            }

            edges.push(DiagramEdge {
                id: edge_id,
                source: rel.source.to_string(),
                target: rel.target.to_string(),
                label: rel.predicate,
                origin: EdgeOrigin::Relationship { index },
            });
        }

        debug!(
            nodes = nodes.len(),
            edges = edges.len(),
            issues = issues.len(),
            "Built diagram from scene graph"
        );

        Self {
            nodes,
            edges,
            issues,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Find a node by id (first match).
    pub fn node(&self, id: &str) -> Option<&DiagramNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Find an edge by id.
    pub fn edge(&self, id: &str) -> Option<&DiagramEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Bounds of all node footprints, `None` when there are no nodes.
    pub fn bounds(&self) -> Option<Bounds> {
        footprint_bounds(&self.nodes)
    }

    /// Convert to a petgraph StableDiGraph for layout and export.
    ///
    /// Edges with a dangling endpoint are left out. Returns the graph and a
    /// mapping from node id to NodeIndex.
    pub fn to_petgraph(
        &self,
    ) -> (
        StableDiGraph<DiagramNode, DiagramEdge>,
        HashMap<String, NodeIndex>,
    ) {
        to_petgraph(&self.nodes, &self.edges)
    }
}

pub(crate) fn footprint_bounds(nodes: &[DiagramNode]) -> Option<Bounds> {
    nodes
        .iter()
        .map(DiagramNode::bounds)
        .reduce(Bounds::union)
}

pub(crate) fn to_petgraph(
    nodes: &[DiagramNode],
    edges: &[DiagramEdge],
) -> (
    StableDiGraph<DiagramNode, DiagramEdge>,
    HashMap<String, NodeIndex>,
) {
    let mut graph = StableDiGraph::new();
    let mut id_to_index = HashMap::new();

    for node in nodes {
        if id_to_index.contains_key(&node.id) {
            continue;
        }
        let idx = graph.add_node(node.clone());
        id_to_index.insert(node.id.clone(), idx);
    }

    for edge in edges {
        if let (Some(&from_idx), Some(&to_idx)) =
            (id_to_index.get(&edge.source), id_to_index.get(&edge.target))
        {
            graph.add_edge(from_idx, to_idx, edge.clone());
        }
    }

    (graph, id_to_index)
}

/// A diagram ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDiagram {
    pub model: DiagramModel,
    /// Present only when the overview pane was requested.
    pub overview: Option<OverviewPane>,
}

/// Derive the diagram for a scene graph and, if asked, its overview pane.
///
/// The overview flag affects nothing but `overview`.
pub fn render(scene: &SceneGraph, show_overview: bool) -> RenderedDiagram {
    let model = DiagramModel::from_scene_graph(scene);
    let overview = show_overview.then(|| OverviewPane::for_nodes(&model.nodes));
    RenderedDiagram { model, overview }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DetectedObject;

    fn scene(relationships: &[&str]) -> SceneGraph {
        SceneGraph {
            objects: vec![
                DetectedObject::new("A", 0.0, 0.0, 10.0, 10.0),
                DetectedObject::new("B", 20.0, 0.0, 10.0, 10.0),
            ],
            relationships: relationships.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn single_word_predicate() {
        let model = DiagramModel::from_scene_graph(&scene(&["A holds B"]));

        assert_eq!(model.node_count(), 2);
        assert_eq!(model.nodes[0].id, "A");
        assert_eq!(model.nodes[1].id, "B");
        assert_eq!(model.nodes[1].position, Point::new(20.0, 0.0));
        assert_eq!(model.nodes[1].size, Size::new(10.0, 10.0));
        assert_eq!(model.nodes[0].label, "A");

        assert_eq!(model.edge_count(), 1);
        let edge = &model.edges[0];
        assert_eq!(edge.id, "e0");
        assert_eq!(edge.source, "A");
        assert_eq!(edge.target, "B");
        assert_eq!(edge.label, "holds");
        assert!(model.issues.is_empty());
    }

    #[test]
    fn multi_word_predicate() {
        let model = DiagramModel::from_scene_graph(&scene(&["A is next to B"]));
        let edge = &model.edges[0];
        assert_eq!(edge.source, "A");
        assert_eq!(edge.target, "B");
        assert_eq!(edge.label, "is next to");
    }

    #[test]
    fn two_tokens_give_empty_label() {
        let model = DiagramModel::from_scene_graph(&scene(&["A B"]));
        let edge = &model.edges[0];
        assert_eq!(edge.source, "A");
        assert_eq!(edge.target, "B");
        assert_eq!(edge.label, "");
    }

    #[test]
    fn extra_whitespace_is_collapsed() {
        let model = DiagramModel::from_scene_graph(&scene(&["  A   left  of\tB "]));
        assert_eq!(model.edges[0].label, "left of");
        assert_eq!(model.edges[0].target, "B");
    }

    #[test]
    fn malformed_relationships_are_skipped_and_reported() {
        let model = DiagramModel::from_scene_graph(&scene(&["A on B", "A", "", "B under A"]));

        let ids: Vec<_> = model.edges.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e0", "e3"]);
        assert_eq!(
            model.issues,
            vec![
                DiagramIssue::MalformedRelationship {
                    index: 1,
                    text: "A".into()
                },
                DiagramIssue::MalformedRelationship {
                    index: 2,
                    text: String::new()
                },
            ]
        );
    }

    #[test]
    fn dangling_endpoints_are_kept_but_reported() {
        let model = DiagramModel::from_scene_graph(&scene(&["A near C"]));
        assert_eq!(model.edge_count(), 1);
        assert_eq!(
            model.issues,
            vec![DiagramIssue::DanglingEndpoint {
                edge_id: "e0".into(),
                missing: "C".into()
            }]
        );

        let (graph, ids) = model.to_petgraph();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 0);
        assert!(ids.contains_key("A"));
    }

    #[test]
    fn petgraph_keeps_matched_edges() {
        let model = DiagramModel::from_scene_graph(&scene(&["A holds B", "B on A"]));
        let (graph, ids) = model.to_petgraph();
        assert_eq!(graph.edge_count(), 2);
        let edge = graph.find_edge(ids["A"], ids["B"]).unwrap();
        assert_eq!(graph[edge].label, "holds");
    }

    #[test]
    fn overview_toggle_only_changes_overview() {
        let graph = scene(&["A holds B"]);
        let with = render(&graph, true);
        let without = render(&graph, false);

        assert_eq!(with.model, without.model);
        assert!(with.overview.is_some());
        assert!(without.overview.is_none());
    }

    #[test]
    fn render_does_not_mutate_input() {
        let graph = scene(&["A holds B", "broken"]);
        let before = graph.clone();
        let _ = render(&graph, true);
        assert_eq!(graph, before);
    }

    #[test]
    fn bounds_cover_all_footprints() {
        let model = DiagramModel::from_scene_graph(&scene(&[]));
        let bounds = model.bounds().unwrap();
        assert_eq!(bounds.min, Point::new(0.0, 0.0));
        assert_eq!(bounds.max, Point::new(30.0, 10.0));
        assert!(DiagramModel::default().bounds().is_none());
    }
}
