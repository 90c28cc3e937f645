//! Bridge between a [`LiveDiagram`] and the egui_graphs widget state.
//!
//! Node locations in the widget are footprint centers in image space; the
//! live diagram stores footprint origins. Widget positions are written back
//! into the live diagram by [`DiagramView::sync_positions`].

use std::collections::HashMap;

use egui::{Pos2, Rect, Vec2};
use egui_graphs::Graph;
use petgraph::stable_graph::{EdgeIndex, NodeIndex};
use tracing::debug;

use scene_graph_core::{DiagramEdge, DiagramModel, DiagramNode, LiveDiagram, Point};

/// Widget graph carrying the diagram payloads.
pub type DiagramGraph = Graph<DiagramNode, DiagramEdge>;

/// Movement below this many canvas units is float noise, not a drag.
const MOVE_EPSILON: f32 = 0.01;

pub fn node_center(node: &DiagramNode) -> Pos2 {
    Pos2::new(
        (node.position.x + node.size.width / 2.0) as f32,
        (node.position.y + node.size.height / 2.0) as f32,
    )
}

/// Canvas rectangle of a node footprint centered on `center`.
pub fn footprint_rect(center: Pos2, node: &DiagramNode) -> Rect {
    Rect::from_center_size(
        center,
        Vec2::new(node.size.width as f32, node.size.height as f32),
    )
}

fn origin_for_center(center: Pos2, node: &DiagramNode) -> Point {
    Point::new(
        center.x as f64 - node.size.width / 2.0,
        center.y as f64 - node.size.height / 2.0,
    )
}

pub struct DiagramView {
    g: DiagramGraph,
    seed: DiagramModel,
    live: LiveDiagram,
    node_index: HashMap<String, NodeIndex>,
    edge_index: HashMap<String, EdgeIndex>,
}

impl DiagramView {
    pub fn new(seed: DiagramModel, revision: u64) -> Self {
        let live = LiveDiagram::from_seed(&seed, revision);
        let (g, node_index, edge_index) = build_graph(&live);
        Self {
            g,
            seed,
            live,
            node_index,
            edge_index,
        }
    }

    pub fn graph(&self) -> &DiagramGraph {
        &self.g
    }

    pub fn graph_mut(&mut self) -> &mut DiagramGraph {
        &mut self.g
    }

    pub fn seed(&self) -> &DiagramModel {
        &self.seed
    }

    pub fn live(&self) -> &LiveDiagram {
        &self.live
    }

    pub fn seed_revision(&self) -> u64 {
        self.live.seed_revision()
    }

    /// Current widget location of a node.
    pub fn location(&self, id: &str) -> Option<Pos2> {
        let idx = self.node_index.get(id)?;
        self.g.node(*idx).map(|n| n.location())
    }

    /// Live nodes with positions taken from the widget (follows drags
    /// that have not been synced yet).
    pub fn current_nodes(&self) -> Vec<DiagramNode> {
        self.live
            .nodes()
            .iter()
            .map(|node| {
                let mut node = node.clone();
                if let Some(center) = self.location(&node.id) {
                    node.position = origin_for_center(center, &node);
                }
                node
            })
            .collect()
    }

    /// Canvas footprint rectangles at current widget positions.
    pub fn footprints(&self) -> Vec<(String, Rect)> {
        self.live
            .nodes()
            .iter()
            .filter_map(|node| {
                let center = self.location(&node.id)?;
                Some((node.id.clone(), footprint_rect(center, node)))
            })
            .collect()
    }

    /// Write widget positions back into the live diagram.
    ///
    /// Returns how many nodes moved.
    pub fn sync_positions(&mut self) -> usize {
        let mut moved = 0;
        for node in self.live.nodes().to_vec() {
            let Some(current) = self.location(&node.id) else {
                continue;
            };
            if (current - node_center(&node)).length() <= MOVE_EPSILON {
                continue;
            }
            if self.live.move_node(&node.id, origin_for_center(current, &node)) {
                moved += 1;
            }
        }
        if moved > 0 {
            debug!(moved, "Synced dragged nodes");
        }
        moved
    }

    /// Connect two nodes by id. Returns the new edge id.
    pub fn connect(&mut self, source: &str, target: &str) -> Option<String> {
        let (&from, &to) = (self.node_index.get(source)?, self.node_index.get(target)?);
        let id = self.live.connect(source, target)?;
        let edge = self.live.edge(&id)?.clone();
        let label = edge.label.clone();
        let idx = self.g.add_edge(from, to, edge);
        if let Some(e) = self.g.edge_mut(idx) {
            e.set_label(label);
        }
        self.edge_index.insert(id.clone(), idx);
        Some(id)
    }

    /// Connect the first two selected nodes, in selection order.
    pub fn connect_selected(&mut self) -> Option<String> {
        let selected = self.g.selected_nodes().to_vec();
        let [first, second, ..] = selected.as_slice() else {
            return None;
        };
        let source = self.g.node(*first)?.payload().id.clone();
        let target = self.g.node(*second)?.payload().id.clone();
        self.connect(&source, &target)
    }

    /// Remove an edge by id.
    pub fn remove_edge(&mut self, id: &str) -> bool {
        if let Some(idx) = self.edge_index.remove(id) {
            self.g.remove_edge(idx);
        }
        self.live.remove_edge(id).is_some()
    }

    /// Remove every selected edge. Returns how many were removed.
    pub fn remove_selected_edges(&mut self) -> usize {
        let ids: Vec<String> = self
            .g
            .selected_edges()
            .iter()
            .filter_map(|idx| self.g.edge(*idx).map(|e| e.payload().id.clone()))
            .collect();
        ids.iter().filter(|id| self.remove_edge(id)).count()
    }

    pub fn selected_node_count(&self) -> usize {
        self.g.selected_nodes().len()
    }

    pub fn selected_edge_count(&self) -> usize {
        self.g.selected_edges().len()
    }

    /// Throw away user edits and go back to the seeded layout.
    pub fn reset(&mut self) -> usize {
        let revision = self.live.seed_revision();
        let discarded = self.live.reseed(&self.seed, revision);
        let (g, node_index, edge_index) = build_graph(&self.live);
        self.g = g;
        self.node_index = node_index;
        self.edge_index = edge_index;
        discarded
    }
}

type GraphParts = (
    DiagramGraph,
    HashMap<String, NodeIndex>,
    HashMap<String, EdgeIndex>,
);

/// Index maps stay valid because the conversion keeps petgraph indices.
fn build_graph(live: &LiveDiagram) -> GraphParts {
    let (petgraph, node_index) = live.to_petgraph();
    let edge_index: HashMap<String, EdgeIndex> = petgraph
        .edge_indices()
        .map(|idx| (petgraph[idx].id.clone(), idx))
        .collect();
    let mut g = Graph::from(&petgraph);

    for &idx in node_index.values() {
        if let Some(node) = g.node_mut(idx) {
            let payload = node.payload().clone();
            node.set_location(node_center(&payload));
            node.set_label(payload.label);
        }
    }

    for &idx in edge_index.values() {
        if let Some(edge) = g.edge_mut(idx) {
            let label = edge.payload().label.clone();
            edge.set_label(label);
        }
    }

    (g, node_index, edge_index)
}
