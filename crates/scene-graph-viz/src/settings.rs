//! Settings structures for the visualization UI.

/// Interaction-related toggles.
#[derive(Debug, Clone)]
pub struct SettingsInteraction {
    pub dragging_enabled: bool,
    pub hover_enabled: bool,
    pub node_clicking_enabled: bool,
    pub node_selection_enabled: bool,
    pub node_selection_multi_enabled: bool,
    pub edge_clicking_enabled: bool,
    pub edge_selection_enabled: bool,
    pub edge_selection_multi_enabled: bool,
}

impl Default for SettingsInteraction {
    fn default() -> Self {
        // Selection is on so two nodes can be connected and edges removed.
        Self {
            dragging_enabled: true,
            hover_enabled: true,
            node_clicking_enabled: true,
            node_selection_enabled: true,
            node_selection_multi_enabled: true,
            edge_clicking_enabled: true,
            edge_selection_enabled: true,
            edge_selection_multi_enabled: true,
        }
    }
}

impl SettingsInteraction {
    pub fn to_egui_graphs(&self) -> egui_graphs::SettingsInteraction {
        egui_graphs::SettingsInteraction::new()
            .with_dragging_enabled(self.dragging_enabled)
            .with_hover_enabled(self.hover_enabled)
            .with_node_clicking_enabled(self.node_clicking_enabled)
            .with_node_selection_enabled(self.node_selection_enabled)
            .with_node_selection_multi_enabled(self.node_selection_multi_enabled)
            .with_edge_clicking_enabled(self.edge_clicking_enabled)
            .with_edge_selection_enabled(self.edge_selection_enabled)
            .with_edge_selection_multi_enabled(self.edge_selection_multi_enabled)
    }
}

#[derive(Debug, Clone)]
pub struct SettingsStyle {
    /// Always show node and edge labels (vs hover-only).
    pub labels_always: bool,
    /// Draw each object's bounding box around its node.
    pub show_footprints: bool,
    /// Show the overview pane (minimap).
    pub show_overview: bool,
}

impl Default for SettingsStyle {
    fn default() -> Self {
        Self {
            labels_always: true,
            show_footprints: true,
            show_overview: true,
        }
    }
}

/// Navigation & viewport parameters.
#[derive(Debug, Clone)]
pub struct SettingsNavigation {
    pub fit_to_screen_enabled: bool,
    pub zoom_and_pan_enabled: bool,
    pub zoom_speed: f32,
    pub fit_to_screen_padding: f32,
}

impl Default for SettingsNavigation {
    fn default() -> Self {
        Self {
            // Mutually exclusive: only one should be true
            fit_to_screen_enabled: true,
            zoom_and_pan_enabled: false,
            zoom_speed: 0.02,
            fit_to_screen_padding: 0.1,
        }
    }
}

impl SettingsNavigation {
    pub fn to_egui_graphs(&self) -> egui_graphs::SettingsNavigation {
        egui_graphs::SettingsNavigation::new()
            .with_fit_to_screen_enabled(self.fit_to_screen_enabled)
            .with_zoom_and_pan_enabled(self.zoom_and_pan_enabled)
            .with_zoom_speed(self.zoom_speed)
            .with_fit_to_screen_padding(self.fit_to_screen_padding)
    }
}
