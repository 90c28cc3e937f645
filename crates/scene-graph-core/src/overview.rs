//! Overview pane (minimap) geometry.

use serde::{Deserialize, Serialize};

use crate::diagram::{footprint_bounds, Bounds, DiagramNode, Point, Size};

/// Default size of the overview pane in screen points.
pub const OVERVIEW_SIZE: Size = Size {
    width: 200.0,
    height: 150.0,
};

/// Margin kept between the diagram and the pane border.
const OVERVIEW_PADDING: f64 = 8.0;

/// Reduced-scale view of the whole diagram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverviewPane {
    /// Diagram bounds being shown.
    pub bounds: Bounds,
    /// Pane size.
    pub size: Size,
    /// Canvas units to pane units.
    pub scale: f64,
}

impl OverviewPane {
    /// Fit `bounds` into a pane of `size`, preserving aspect ratio.
    pub fn fit(bounds: Bounds, size: Size) -> Self {
        let inner_w = (size.width - 2.0 * OVERVIEW_PADDING).max(1.0);
        let inner_h = (size.height - 2.0 * OVERVIEW_PADDING).max(1.0);

        let scale = match (bounds.width() > 0.0, bounds.height() > 0.0) {
            (true, true) => (inner_w / bounds.width()).min(inner_h / bounds.height()),
            (true, false) => inner_w / bounds.width(),
            (false, true) => inner_h / bounds.height(),
            (false, false) => 1.0,
        };

        Self {
            bounds,
            size,
            scale,
        }
    }

    /// Overview of a set of nodes in the default pane size.
    ///
    /// An empty node set yields an empty pane anchored at the origin.
    pub fn for_nodes(nodes: &[DiagramNode]) -> Self {
        let bounds = footprint_bounds(nodes).unwrap_or_default();
        Self::fit(bounds, OVERVIEW_SIZE)
    }

    /// Map a canvas point into pane-local coordinates.
    pub fn project(&self, point: Point) -> Point {
        Point::new(
            OVERVIEW_PADDING + (point.x - self.bounds.min.x) * self.scale,
            OVERVIEW_PADDING + (point.y - self.bounds.min.y) * self.scale,
        )
    }

    /// Map a node footprint into pane-local coordinates.
    pub fn project_node(&self, node: &DiagramNode) -> Bounds {
        let min = self.project(node.position);
        Bounds {
            min,
            max: Point::new(
                min.x + node.size.width * self.scale,
                min.y + node.size.height * self.scale,
            ),
        }
    }

    /// Map a pane-local point back to canvas coordinates.
    pub fn unproject(&self, point: Point) -> Point {
        Point::new(
            self.bounds.min.x + (point.x - OVERVIEW_PADDING) / self.scale,
            self.bounds.min.y + (point.y - OVERVIEW_PADDING) / self.scale,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, x: f64, y: f64, w: f64, h: f64) -> DiagramNode {
        DiagramNode {
            id: id.into(),
            position: Point::new(x, y),
            size: Size::new(w, h),
            label: id.into(),
        }
    }

    #[test]
    fn projected_nodes_stay_inside_the_pane() {
        let nodes = vec![
            node("a", 100.0, 50.0, 200.0, 100.0),
            node("b", 900.0, 600.0, 120.0, 300.0),
        ];
        let pane = OverviewPane::for_nodes(&nodes);
        let frame = Bounds {
            min: Point::new(0.0, 0.0),
            max: Point::new(pane.size.width, pane.size.height),
        };

        for n in &nodes {
            assert!(pane.bounds.contains(&n.bounds()));
            let projected = pane.project_node(n);
            assert!(frame.contains(&projected), "{:?} not in {:?}", projected, frame);
        }
    }

    #[test]
    fn unproject_inverts_project() {
        let nodes = vec![node("a", 10.0, 20.0, 30.0, 40.0), node("b", 300.0, 10.0, 5.0, 5.0)];
        let pane = OverviewPane::for_nodes(&nodes);
        let p = Point::new(123.0, 45.0);
        let back = pane.unproject(pane.project(p));
        assert!((back.x - p.x).abs() < 1e-9);
        assert!((back.y - p.y).abs() < 1e-9);
    }

    #[test]
    fn empty_diagram_has_unit_scale() {
        let pane = OverviewPane::for_nodes(&[]);
        assert_eq!(pane.scale, 1.0);
        assert_eq!(pane.bounds, Bounds::default());
    }
}
