//! The interactive copy of a diagram.
//!
//! A [`LiveDiagram`] starts as a copy of a seeded [`DiagramModel`] and then
//! absorbs user edits: dragged nodes, hand-drawn connections, removed edges.
//! Edits never flow back into the scene graph. Reseeding from a new model
//! drops them and reports how many were lost.

use std::collections::HashMap;

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use tracing::{debug, info};

use crate::diagram::{
    footprint_bounds, to_petgraph, Bounds, DiagramEdge, DiagramModel, DiagramNode, EdgeOrigin,
    Point,
};
use crate::overview::OverviewPane;

#[derive(Debug, Clone, Default)]
pub struct LiveDiagram {
    nodes: Vec<DiagramNode>,
    edges: Vec<DiagramEdge>,
    seed_revision: u64,
    user_edits: usize,
    next_user_edge: u64,
}

impl LiveDiagram {
    /// Start a live copy of `seed`.
    pub fn from_seed(seed: &DiagramModel, revision: u64) -> Self {
        Self {
            nodes: seed.nodes.clone(),
            edges: seed.edges.clone(),
            seed_revision: revision,
            user_edits: 0,
            next_user_edge: 0,
        }
    }

    /// Replace the live state with a fresh copy of `seed`.
    ///
    /// Returns the number of user edits that were discarded.
    pub fn reseed(&mut self, seed: &DiagramModel, revision: u64) -> usize {
        let discarded = self.user_edits;
        if discarded > 0 {
            info!(
                discarded,
                from_revision = self.seed_revision,
                to_revision = revision,
                "Discarding live diagram edits"
            );
        }
        *self = Self::from_seed(seed, revision);
        discarded
    }

    pub fn nodes(&self) -> &[DiagramNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[DiagramEdge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&DiagramNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&DiagramEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Revision of the seed this copy was made from.
    pub fn seed_revision(&self) -> u64 {
        self.seed_revision
    }

    /// Number of edits since the last (re)seed.
    pub fn user_edits(&self) -> usize {
        self.user_edits
    }

    pub fn is_pristine(&self) -> bool {
        self.user_edits == 0
    }

    /// Move a node. Returns false if the node is unknown or did not move.
    pub fn move_node(&mut self, id: &str, position: Point) -> bool {
        let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        if node.position == position {
            return false;
        }
        node.position = position;
        self.user_edits += 1;
        true
    }

    /// Connect two nodes with an unlabeled edge.
    ///
    /// Refused (returns `None`) when either node is missing or an edge with
    /// the same source and target already exists.
    pub fn connect(&mut self, source: &str, target: &str) -> Option<String> {
        if self.node(source).is_none() || self.node(target).is_none() {
            return None;
        }
        if self
            .edges
            .iter()
            .any(|e| e.source == source && e.target == target)
        {
            debug!(source, target, "Connection already exists");
            return None;
        }

        let id = format!("user-e{}", self.next_user_edge);
        self.next_user_edge += 1;
        self.edges.push(DiagramEdge {
            id: id.clone(),
            source: source.to_string(),
            target: target.to_string(),
            label: String::new(),
            origin: EdgeOrigin::User,
        });
        self.user_edits += 1;
        Some(id)
    }

    /// Remove an edge by id, seeded or not.
    pub fn remove_edge(&mut self, id: &str) -> Option<DiagramEdge> {
        let pos = self.edges.iter().position(|e| e.id == id)?;
        self.user_edits += 1;
        Some(self.edges.remove(pos))
    }

    pub fn bounds(&self) -> Option<Bounds> {
        footprint_bounds(&self.nodes)
    }

    /// Overview of the current (possibly edited) layout.
    pub fn overview(&self) -> OverviewPane {
        OverviewPane::for_nodes(&self.nodes)
    }

    /// Convert the live state to a petgraph StableDiGraph.
    pub fn to_petgraph(
        &self,
    ) -> (
        StableDiGraph<DiagramNode, DiagramEdge>,
        HashMap<String, NodeIndex>,
    ) {
        to_petgraph(&self.nodes, &self.edges)
    }
}
