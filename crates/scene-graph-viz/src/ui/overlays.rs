//! Overlay rendering for footprints, the overview pane and panel toggles.

use egui::{Color32, Pos2, Rect, Stroke};
use egui_graphs::MetadataFrame;

use scene_graph_core::{DiagramEdge, DiagramNode, OverviewPane, Point};

use crate::diagram_view::node_center;

/// Maps canvas coordinates of the graph widget to screen coordinates.
pub struct CanvasTransform {
    meta: MetadataFrame,
    graph_rect: Rect,
}

impl CanvasTransform {
    /// Read the widget's zoom/pan for the frame just drawn.
    pub fn load(ui: &egui::Ui, graph_rect: Rect) -> Self {
        Self {
            meta: MetadataFrame::new(None).load(ui),
            graph_rect,
        }
    }

    pub fn graph_rect(&self) -> Rect {
        self.graph_rect
    }

    pub fn to_screen(&self, canvas: Pos2) -> Pos2 {
        let widget_relative = self.meta.canvas_to_screen_pos(canvas);
        egui::pos2(
            widget_relative.x + self.graph_rect.min.x,
            widget_relative.y + self.graph_rect.min.y,
        )
    }

    pub fn to_canvas(&self, screen: Pos2) -> Pos2 {
        let widget_relative = egui::pos2(
            screen.x - self.graph_rect.min.x,
            screen.y - self.graph_rect.min.y,
        );
        self.meta.screen_to_canvas_pos(widget_relative)
    }

    pub fn rect_to_screen(&self, canvas: Rect) -> Rect {
        Rect::from_two_pos(self.to_screen(canvas.min), self.to_screen(canvas.max))
    }

    /// Canvas area currently visible in the widget.
    pub fn visible_canvas(&self) -> Rect {
        Rect::from_two_pos(
            self.to_canvas(self.graph_rect.min),
            self.to_canvas(self.graph_rect.max),
        )
    }
}

fn footprint_color(dark_mode: bool) -> Color32 {
    if dark_mode {
        Color32::from_rgb(100, 140, 180)
    } else {
        Color32::from_rgb(60, 100, 140)
    }
}

/// Draw object bounding boxes around their nodes.
pub fn draw_footprints(
    painter: &egui::Painter,
    transform: &CanvasTransform,
    footprints: &[(String, Rect)],
    dark_mode: bool,
) {
    let color = footprint_color(dark_mode);
    let fill = color.linear_multiply(0.08);
    let stroke = Stroke::new(1.0, color);

    for (_, canvas_rect) in footprints {
        let rect = transform.rect_to_screen(*canvas_rect);
        if !transform.graph_rect().intersects(rect) {
            continue;
        }
        painter.rect_filled(rect, 2.0, fill);
        painter.rect_stroke(rect, 2.0, stroke, egui::StrokeKind::Inside);
    }
}

fn to_pos(p: Point) -> Pos2 {
    egui::pos2(p.x as f32, p.y as f32)
}

fn to_point(p: Pos2) -> Point {
    Point::new(p.x as f64, p.y as f64)
}

/// Draw the overview pane in the bottom-left corner of the graph area.
pub fn draw_overview(
    ui: &mut egui::Ui,
    pane: &OverviewPane,
    nodes: &[DiagramNode],
    edges: &[DiagramEdge],
    visible_canvas: Option<Rect>,
    dark_mode: bool,
) {
    let g_rect = ui.max_rect();
    let size = egui::vec2(pane.size.width as f32, pane.size.height as f32);
    let margin = 10.0;
    let pane_pos = egui::pos2(
        g_rect.left() + margin,
        g_rect.bottom() - margin - size.y,
    );

    let (bg, node_fill, edge_color, view_color) = if dark_mode {
        (
            Color32::from_rgba_unmultiplied(20, 20, 28, 220),
            Color32::from_rgb(100, 140, 180),
            Color32::from_rgba_unmultiplied(160, 160, 180, 120),
            Color32::from_rgb(0, 212, 255),
        )
    } else {
        (
            Color32::from_rgba_unmultiplied(245, 245, 250, 230),
            Color32::from_rgb(60, 100, 140),
            Color32::from_rgba_unmultiplied(100, 100, 120, 140),
            Color32::from_rgb(0, 150, 200),
        )
    };

    egui::Area::new(egui::Id::new("overview_pane"))
        .order(egui::Order::Foreground)
        .fixed_pos(pane_pos)
        .movable(false)
        .interactable(false)
        .show(ui.ctx(), |ui_area| {
            let (frame, _) = ui_area.allocate_exact_size(size, egui::Sense::hover());
            let painter = ui_area.painter_at(frame);
            let local = |p: Point| frame.min + to_pos(p).to_vec2();

            painter.rect_filled(frame, 4.0, bg);
            painter.rect_stroke(
                frame,
                4.0,
                Stroke::new(1.0, edge_color),
                egui::StrokeKind::Inside,
            );

            for edge in edges {
                let endpoints = nodes
                    .iter()
                    .find(|n| n.id == edge.source)
                    .zip(nodes.iter().find(|n| n.id == edge.target));
                if let Some((source, target)) = endpoints {
                    let a = local(pane.project(to_point(node_center(source))));
                    let b = local(pane.project(to_point(node_center(target))));
                    painter.line_segment([a, b], Stroke::new(1.0, edge_color));
                }
            }

            for node in nodes {
                let projected = pane.project_node(node);
                let rect = Rect::from_min_max(local(projected.min), local(projected.max));
                painter.rect_filled(rect, 1.0, node_fill);
            }

            if let Some(visible) = visible_canvas {
                let min = local(pane.project(to_point(visible.min)));
                let max = local(pane.project(to_point(visible.max)));
                let view = Rect::from_two_pos(min, max).intersect(frame);
                if view.is_positive() {
                    painter.rect_stroke(
                        view,
                        0.0,
                        Stroke::new(1.5, view_color),
                        egui::StrokeKind::Inside,
                    );
                }
            }
        });
}

/// Draw the sidebar toggle button in the bottom-right corner.
pub fn draw_sidebar_toggle(ui: &mut egui::Ui, show_sidebar: &mut bool) {
    let g_rect = ui.max_rect();
    let btn_size = egui::vec2(32.0, 32.0);
    let right_margin = 10.0;
    let bottom_margin = 10.0;

    let toggle_pos = egui::pos2(
        g_rect.right() - right_margin - btn_size.x,
        g_rect.bottom() - bottom_margin - btn_size.y,
    );

    let (arrow, tip) = if *show_sidebar {
        ("▶", "Hide diagram settings")
    } else {
        ("◀", "Show diagram settings")
    };

    egui::Area::new(egui::Id::new("sidebar_toggle_btn"))
        .order(egui::Order::Foreground)
        .fixed_pos(toggle_pos)
        .movable(false)
        .show(ui.ctx(), |ui_area| {
            ui_area.set_clip_rect(g_rect);
            let arrow_text = egui::RichText::new(arrow).size(18.0);
            let response = ui_area.add_sized(btn_size, egui::Button::new(arrow_text));
            if response.on_hover_text(tip).clicked() {
                *show_sidebar = !*show_sidebar;
            }
        });
}
