//! Main application state and rendering logic.

use std::sync::Arc;

use eframe::{App, CreationContext};
use egui::{CollapsingHeader, Context, RichText, ScrollArea};
use egui_graphs::{
    FruchtermanReingoldWithCenterGravity, FruchtermanReingoldWithCenterGravityState, GraphView,
    LayoutForceDirected,
};
use file_format::FileFormat;
use tracing::{debug, info, warn};

use scene_graph_core::{
    AnalysisResult, Completion, DiagramModel, OverviewPane, SelectedImage, UploadSession,
};

use crate::diagram_view::DiagramView;
use crate::jobs::{AnalysisJobs, Finished, ViewerOptions};
use crate::picker::{image_from_picked, ImagePicker};
use crate::settings::{SettingsInteraction, SettingsNavigation, SettingsStyle};
use crate::ui::{draw_footprints, draw_overview, draw_sidebar_toggle, CanvasTransform};

// Type aliases for Force-Directed layout with Center Gravity
type ForceLayout = LayoutForceDirected<FruchtermanReingoldWithCenterGravity>;
type ForceState = FruchtermanReingoldWithCenterGravityState;

/// Image bytes registered with egui under a `bytes://` URI.
struct LoadedImage {
    uri: String,
    bytes: Arc<[u8]>,
}

impl LoadedImage {
    fn widget(&self) -> egui::Image<'static> {
        egui::Image::from_bytes(self.uri.clone(), egui::load::Bytes::Shared(self.bytes.clone()))
    }
}

/// The scene graph viewer.
pub struct SceneGraphApp {
    /// Upload state machine
    session: UploadSession,
    /// Background analysis runner (None if it failed to start)
    jobs: Option<AnalysisJobs>,
    /// File dialog behind the drop zone and the Browse button
    picker: ImagePicker,
    /// Endpoint and defaults the app was started with
    options: ViewerOptions,
    /// Diagram for the current result
    diagram: Option<DiagramView>,
    /// Session result revision the diagram was derived from
    diagram_revision: u64,
    /// Processed image of the current result
    processed: Option<LoadedImage>,
    /// Last intake or analysis error shown in the input panel
    last_error: Option<String>,
    /// Interaction settings
    settings_interaction: SettingsInteraction,
    /// Navigation settings
    settings_navigation: SettingsNavigation,
    /// Style settings
    settings_style: SettingsStyle,
    /// Whether to show the diagram settings sidebar
    show_sidebar: bool,
    /// Current dark mode state
    dark_mode: bool,
    /// Pause the force layout on the next frame (keeps seeded positions)
    pause_layout_pending: bool,
    /// Copy widget positions into the live diagram on the next frame
    sync_pending: bool,
}

impl SceneGraphApp {
    pub fn new(cc: &CreationContext<'_>, options: ViewerOptions) -> Self {
        egui_extras::install_image_loaders(&cc.egui_ctx);

        let (jobs, last_error) = match AnalysisJobs::new(&options) {
            Ok(jobs) => (Some(jobs), None),
            Err(e) => {
                warn!(error = %e, "Analysis unavailable");
                (None, Some(e))
            }
        };

        let settings_style = SettingsStyle {
            show_overview: options.show_overview,
            ..SettingsStyle::default()
        };

        Self {
            session: UploadSession::new(),
            jobs,
            picker: ImagePicker::new(),
            options,
            diagram: None,
            diagram_revision: 0,
            processed: None,
            last_error,
            settings_interaction: SettingsInteraction::default(),
            settings_navigation: SettingsNavigation::default(),
            settings_style,
            show_sidebar: true,
            dark_mode: cc.egui_ctx.style().visuals.dark_mode,
            pause_layout_pending: false,
            sync_pending: false,
        }
    }

    /// Start with an image already selected.
    pub fn with_image(mut self, image: SelectedImage) -> Self {
        self.session.intake(image);
        self
    }

    /// Replace the selected image.
    pub fn select_image(&mut self, ctx: &Context, image: SelectedImage) {
        if let Some(jobs) = &mut self.jobs {
            jobs.abort();
        }
        if let Some(old) = self.session.intake(image) {
            ctx.forget_image(old.uri());
        }
        self.last_error = None;
    }

    fn submit(&mut self, ctx: &Context) {
        let ticket = match self.session.begin_submit() {
            Ok(ticket) => ticket,
            Err(reason) => {
                debug!(%reason, "Analyze ignored");
                return;
            }
        };
        self.last_error = None;
        match &mut self.jobs {
            Some(jobs) => jobs.spawn(ticket, ctx),
            None => {
                let message = "Analysis is unavailable".to_string();
                self.session.fail(ticket, &message);
                self.last_error = Some(message);
            }
        }
    }

    fn clear(&mut self, ctx: &Context) {
        if let Some(jobs) = &mut self.jobs {
            jobs.abort();
        }
        if let Some(preview) = self.session.clear() {
            ctx.forget_image(preview.uri());
        }
        self.last_error = None;
    }

    fn apply_finished(&mut self, finished: Finished) {
        let Finished { ticket, outcome } = finished;
        match outcome {
            Ok(result) => {
                if self.session.complete(ticket, result) == Completion::Applied {
                    self.last_error = None;
                }
            }
            Err(message) => {
                if self.session.fail(ticket, &message) == Completion::Applied {
                    self.last_error = Some(message);
                }
            }
        }
    }

    fn handle_dropped_files(&mut self, ctx: &Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        let Some((first, rest)) = dropped.split_first() else {
            return;
        };
        if !rest.is_empty() {
            info!(ignored = rest.len(), "Only the first dropped file is used");
        }

        match image_from_dropped(first) {
            Ok(image) => self.select_image(ctx, image),
            Err(message) => {
                warn!(error = %message, "Rejected dropped file");
                self.last_error = Some(message);
            }
        }
    }

    fn handle_picked_file(&mut self, ctx: &Context) {
        match self.picker.poll() {
            Some(Ok(image)) => self.select_image(ctx, image),
            Some(Err(message)) => {
                warn!(error = %message, "Rejected selected file");
                self.last_error = Some(message);
            }
            None => {}
        }
    }

    /// Rebuild diagram and processed image when the session's result changed.
    fn sync_result(&mut self, ctx: &Context) {
        let revision = self.session.result_revision();
        if revision == self.diagram_revision {
            return;
        }
        self.diagram_revision = revision;

        if let Some(old) = self.diagram.take() {
            if !old.live().is_pristine() {
                info!(
                    discarded = old.live().user_edits(),
                    "Diagram replaced; user edits discarded"
                );
            }
        }
        if let Some(old) = self.processed.take() {
            ctx.forget_image(&old.uri);
        }

        if let Some(result) = self.session.last_result().cloned() {
            let model = DiagramModel::from_scene_graph(result.scene_graph());
            self.diagram = Some(DiagramView::new(model, revision));
            self.processed = Some(processed_image(revision, &result));
            self.pause_layout_pending = true;
        }
    }

    fn preview(&self) -> Option<LoadedImage> {
        let preview = self.session.preview()?;
        let file = self.session.selected_file()?;
        Some(LoadedImage {
            uri: preview.uri().to_string(),
            bytes: file.shared_bytes(),
        })
    }
}

fn image_from_dropped(file: &egui::DroppedFile) -> Result<SelectedImage, String> {
    if let Some(bytes) = &file.bytes {
        return image_from_picked(file.name.clone(), bytes.to_vec());
    }
    if let Some(path) = &file.path {
        return SelectedImage::from_path(path).map_err(|e| e.to_string());
    }
    Err(format!("Dropped file {} has no readable data", file.name))
}

fn processed_image(revision: u64, result: &AnalysisResult) -> LoadedImage {
    let bytes: Arc<[u8]> = result.processed_image().into();
    let format = FileFormat::from_bytes(&bytes);
    let extension = format.extension();
    LoadedImage {
        uri: format!("bytes://processed/{}.{}", revision, extension),
        bytes,
    }
}

// =============================================================================
// Input & Results Panel UI
// =============================================================================

impl SceneGraphApp {
    /// Returns true when the zone was clicked.
    fn ui_drop_zone(&self, ui: &mut egui::Ui, hovering: bool) -> bool {
        let stroke_color = if hovering {
            if self.dark_mode {
                egui::Color32::from_rgb(0, 212, 255)
            } else {
                egui::Color32::from_rgb(0, 150, 200)
            }
        } else {
            egui::Color32::GRAY
        };

        let zone = egui::Frame::new()
            .stroke(egui::Stroke::new(if hovering { 2.0 } else { 1.0 }, stroke_color))
            .corner_radius(6.0)
            .inner_margin(egui::Margin::same(12))
            .show(ui, |ui| {
                ui.set_min_size(egui::vec2(ui.available_width(), 160.0));
                ui.vertical_centered(|ui| match self.preview() {
                    Some(preview) => {
                        ui.add(preview.widget().max_height(240.0));
                    }
                    None => {
                        ui.add_space(50.0);
                        let hint = if hovering {
                            "Drop the image here"
                        } else {
                            "Drag 'n' drop an image here, or click to select one"
                        };
                        ui.label(RichText::new(hint).color(egui::Color32::GRAY));
                    }
                });
            })
            .response
            .interact(egui::Sense::click())
            .on_hover_cursor(egui::CursorIcon::PointingHand);

        if let Some(file) = self.session.selected_file() {
            ui.label(
                RichText::new(format!("{} ({})", file.name(), file.media_type()))
                    .small()
                    .color(egui::Color32::GRAY),
            );
        }
        zone.clicked()
    }

    fn ui_input(&mut self, ui: &mut egui::Ui, ctx: &Context, hovering: bool) {
        let mut browse = self.ui_drop_zone(ui, hovering);
        ui.add_space(8.0);

        let loading = self.session.is_loading();
        let can_analyze = self.session.selected_file().is_some() && !loading;
        ui.horizontal(|ui| {
            let label = if loading { "Analyzing..." } else { "Analyze Image" };
            if ui.add_enabled(can_analyze, egui::Button::new(label)).clicked() {
                self.submit(ctx);
            }
            if ui.button("Clear").clicked() {
                self.clear(ctx);
            }
            browse |= ui.button("Browse...").clicked();
        });
        if browse {
            self.picker.open(ctx);
        }

        let endpoint = self
            .jobs
            .as_ref()
            .map(|j| j.endpoint().to_string())
            .unwrap_or_else(|| self.options.endpoint.clone());
        ui.label(
            RichText::new(format!("Endpoint: {}", endpoint))
                .small()
                .color(egui::Color32::GRAY),
        );

        if loading {
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Analyzing image...");
            });
        }

        if let Some(error) = &self.last_error {
            ui.add_space(8.0);
            ui.label(RichText::new(error).color(egui::Color32::from_rgb(255, 100, 100)));
        }
    }

    fn ui_results(&self, ui: &mut egui::Ui) {
        let Some(result) = self.session.last_result() else {
            return;
        };
        let scene = result.scene_graph();

        if let Some(processed) = &self.processed {
            CollapsingHeader::new("Processed Image")
                .default_open(true)
                .show(ui, |ui| {
                    ui.add(processed.widget().max_width(ui.available_width()));
                });
        }

        CollapsingHeader::new("Description")
            .default_open(true)
            .show(ui, |ui| {
                if result.description().is_empty() {
                    ui.label(RichText::new("No description").color(egui::Color32::GRAY));
                } else {
                    ui.label(result.description());
                }
            });

        CollapsingHeader::new(format!("Objects ({})", scene.object_count()))
            .default_open(true)
            .show(ui, |ui| {
                for object in &scene.objects {
                    ui.label(format!("• {}", object.id));
                }
            });

        CollapsingHeader::new(format!("Relationships ({})", scene.relationship_count()))
            .default_open(true)
            .show(ui, |ui| {
                for relationship in &scene.relationships {
                    ui.label(format!("• {}", relationship));
                }
            });

        if let Some(diagram) = &self.diagram {
            let issues = &diagram.seed().issues;
            if !issues.is_empty() {
                CollapsingHeader::new(format!("Diagram Issues ({})", issues.len()))
                    .default_open(false)
                    .show(ui, |ui| {
                        for issue in issues {
                            ui.label(
                                RichText::new(format!("⚠ {}", issue))
                                    .small()
                                    .color(egui::Color32::from_rgb(255, 200, 50)),
                            );
                        }
                    });
            }
        }
    }
}

// =============================================================================
// Diagram Sidebar UI
// =============================================================================

impl SceneGraphApp {
    fn info_icon(ui: &mut egui::Ui, tip: &str) {
        ui.add_space(4.0);
        ui.small_button("ℹ").on_hover_text(tip);
    }

    fn ui_info(&self, ui: &mut egui::Ui) {
        let Some(diagram) = &self.diagram else {
            return;
        };
        CollapsingHeader::new("Diagram Info")
            .default_open(true)
            .show(ui, |ui| {
                ui.label(format!("Nodes: {}", diagram.graph().node_count()));
                ui.label(format!("Edges: {}", diagram.graph().edge_count()));
                ui.label(format!("User edits: {}", diagram.live().user_edits()));
                ui.label(format!(
                    "Selected: {} nodes | {} edges",
                    diagram.selected_node_count(),
                    diagram.selected_edge_count()
                ));
            });
    }

    fn ui_edit(&mut self, ui: &mut egui::Ui) {
        let Some(diagram) = &mut self.diagram else {
            return;
        };
        let mut reset = false;
        CollapsingHeader::new("Edit")
            .default_open(true)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    let can_connect = diagram.selected_node_count() >= 2;
                    if ui
                        .add_enabled(can_connect, egui::Button::new("Connect"))
                        .on_hover_text("Connect the first two selected nodes")
                        .clicked()
                    {
                        match diagram.connect_selected() {
                            Some(id) => debug!(edge = %id, "Connected nodes"),
                            None => debug!("Connection refused"),
                        }
                    }

                    let can_remove = diagram.selected_edge_count() > 0;
                    if ui
                        .add_enabled(can_remove, egui::Button::new("Remove edges"))
                        .on_hover_text("Remove selected edges (Delete)")
                        .clicked()
                    {
                        diagram.remove_selected_edges();
                    }
                });

                if ui
                    .button("⟲ Reset layout")
                    .on_hover_text("Discard edits and restore the analyzed layout")
                    .clicked()
                {
                    let discarded = diagram.reset();
                    info!(discarded, "Diagram reset to seed");
                    reset = true;
                }
            });
        if reset {
            self.pause_layout_pending = true;
        }
    }

    fn ui_navigation(&mut self, ui: &mut egui::Ui) {
        CollapsingHeader::new("Navigation")
            .default_open(true)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    if ui
                        .checkbox(
                            &mut self.settings_navigation.fit_to_screen_enabled,
                            "fit_to_screen",
                        )
                        .clicked()
                    {
                        self.settings_navigation.zoom_and_pan_enabled =
                            !self.settings_navigation.zoom_and_pan_enabled;
                    }
                    Self::info_icon(ui, "Auto-fit diagram to viewport");
                });

                ui.add_enabled_ui(self.settings_navigation.fit_to_screen_enabled, |ui| {
                    ui.add(
                        egui::Slider::new(
                            &mut self.settings_navigation.fit_to_screen_padding,
                            0.0..=1.0,
                        )
                        .text("padding"),
                    );
                });

                ui.horizontal(|ui| {
                    if ui
                        .checkbox(
                            &mut self.settings_navigation.zoom_and_pan_enabled,
                            "zoom_and_pan",
                        )
                        .clicked()
                    {
                        self.settings_navigation.fit_to_screen_enabled =
                            !self.settings_navigation.fit_to_screen_enabled;
                    }
                    Self::info_icon(ui, "Manual zoom and pan");
                });

                ui.add_enabled_ui(self.settings_navigation.zoom_and_pan_enabled, |ui| {
                    ui.add(
                        egui::Slider::new(&mut self.settings_navigation.zoom_speed, 0.01..=2.0)
                            .text("zoom_speed"),
                    );
                });
            });
    }

    fn ui_layout(&mut self, ui: &mut egui::Ui) {
        CollapsingHeader::new("Layout").show(ui, |ui| {
            let mut state = egui_graphs::get_layout_state::<ForceState>(ui, None);

            ui.horizontal(|ui| {
                if ui.checkbox(&mut state.base.is_running, "physics").changed()
                    && !state.base.is_running
                {
                    self.sync_pending = true;
                }
                Self::info_icon(ui, "Force layout; off keeps image positions");
            });

            ui.add_enabled_ui(state.base.is_running, |ui| {
                ui.add(egui::Slider::new(&mut state.base.dt, 0.001..=0.2).text("dt"));
                ui.add(egui::Slider::new(&mut state.base.damping, 0.0..=1.0).text("damping"));
                ui.add(egui::Slider::new(&mut state.base.k_scale, 0.2..=3.0).text("k_scale"));
                ui.add(
                    egui::Slider::new(&mut state.base.c_repulse, 0.1..=3.0).text("c_repulse"),
                );
                ui.checkbox(&mut state.extras.0.enabled, "center gravity");
            });

            egui_graphs::set_layout_state::<ForceState>(ui, state, None);
        });
    }

    fn ui_interaction(&mut self, ui: &mut egui::Ui) {
        CollapsingHeader::new("Interaction").show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.checkbox(
                    &mut self.settings_interaction.dragging_enabled,
                    "dragging_enabled",
                );
                Self::info_icon(ui, "Drag nodes to reposition");
            });

            ui.horizontal(|ui| {
                if ui
                    .checkbox(
                        &mut self.settings_interaction.node_selection_enabled,
                        "node_selection",
                    )
                    .clicked()
                    && self.settings_interaction.node_selection_enabled
                {
                    self.settings_interaction.node_clicking_enabled = true;
                    self.settings_interaction.hover_enabled = true;
                }
            });

            ui.horizontal(|ui| {
                ui.checkbox(
                    &mut self.settings_interaction.edge_selection_enabled,
                    "edge_selection",
                );
            });
        });
    }

    fn ui_style(&mut self, ui: &mut egui::Ui) {
        CollapsingHeader::new("Style").show(ui, |ui| {
            ui.horizontal(|ui| {
                let mut dark = ui.ctx().style().visuals.dark_mode;
                if ui.checkbox(&mut dark, "dark mode").changed() {
                    if dark {
                        ui.ctx().set_visuals(egui::Visuals::dark());
                    } else {
                        ui.ctx().set_visuals(egui::Visuals::light());
                    }
                    self.dark_mode = dark;
                }
            });

            ui.checkbox(&mut self.settings_style.labels_always, "Always show labels");
            ui.checkbox(&mut self.settings_style.show_footprints, "Bounding boxes");
            ui.checkbox(&mut self.settings_style.show_overview, "MiniMap");
        });
    }

    fn ui_diagram(&mut self, ui: &mut egui::Ui) {
        let minimap_label = if self.settings_style.show_overview {
            "Hide MiniMap"
        } else {
            "Show MiniMap"
        };
        if ui.button(minimap_label).clicked() {
            self.settings_style.show_overview = !self.settings_style.show_overview;
        }

        let dark_mode = self.dark_mode;
        let show_footprints = self.settings_style.show_footprints;
        let show_overview = self.settings_style.show_overview;
        let settings_interaction = self.settings_interaction.to_egui_graphs();
        let settings_navigation = self.settings_navigation.to_egui_graphs();
        let settings_style = egui_graphs::SettingsStyle::new()
            .with_labels_always(self.settings_style.labels_always)
            .with_node_stroke_hook(move |selected, dragged, _color, _stroke, _style| {
                if selected {
                    let color = if dark_mode {
                        egui::Color32::from_rgb(0, 255, 255)
                    } else {
                        egui::Color32::from_rgb(0, 150, 200)
                    };
                    egui::Stroke::new(3.0, color)
                } else if dragged {
                    egui::Stroke::new(2.0, egui::Color32::from_rgb(255, 200, 0))
                } else {
                    egui::Stroke::NONE
                }
            })
            .with_edge_stroke_hook(move |selected, _order, stroke, _style| {
                if selected {
                    let color = if dark_mode {
                        egui::Color32::from_rgb(255, 100, 255)
                    } else {
                        egui::Color32::from_rgb(200, 50, 200)
                    };
                    egui::Stroke::new(3.0, color)
                } else {
                    stroke
                }
            });

        if self.pause_layout_pending {
            let mut state = egui_graphs::get_layout_state::<ForceState>(ui, None);
            state.base.is_running = false;
            egui_graphs::set_layout_state::<ForceState>(ui, state, None);
            self.pause_layout_pending = false;
        }

        let Some(diagram) = &mut self.diagram else {
            return;
        };

        let graph_response = ui.add(
            &mut GraphView::<_, _, _, _, _, _, ForceState, ForceLayout>::new(
                diagram.graph_mut(),
            )
            .with_interactions(&settings_interaction)
            .with_navigations(&settings_navigation)
            .with_styles(&settings_style),
        );

        let transform = CanvasTransform::load(ui, graph_response.rect);

        if show_footprints {
            draw_footprints(ui.painter(), &transform, &diagram.footprints(), dark_mode);
        }

        if self.sync_pending || ui.input(|i| i.pointer.any_released()) {
            diagram.sync_positions();
            self.sync_pending = false;
        }

        if show_overview {
            let nodes = diagram.current_nodes();
            let pane = OverviewPane::for_nodes(&nodes);
            draw_overview(
                ui,
                &pane,
                &nodes,
                diagram.live().edges(),
                Some(transform.visible_canvas()),
                dark_mode,
            );
        }

        draw_sidebar_toggle(ui, &mut self.show_sidebar);
    }
}

// =============================================================================
// Main Update Loop
// =============================================================================

impl App for SceneGraphApp {
    fn update(&mut self, ctx: &Context, _: &mut eframe::Frame) {
        if let Some(finished) = self.jobs.as_mut().and_then(|jobs| jobs.poll()) {
            self.apply_finished(finished);
        }

        self.handle_dropped_files(ctx);
        self.handle_picked_file(ctx);
        self.sync_result(ctx);

        let hovering = ctx.input(|i| !i.raw.hovered_files.is_empty());

        // Handle keyboard shortcuts
        ctx.input(|i| {
            if i.key_pressed(egui::Key::Tab) {
                self.show_sidebar = !self.show_sidebar;
            }
            if i.key_pressed(egui::Key::Delete) {
                if let Some(diagram) = &mut self.diagram {
                    diagram.remove_selected_edges();
                }
            }
        });

        // Left panel: input and results
        egui::SidePanel::left("input_panel")
            .default_width(340.0)
            .show(ctx, |ui| {
                ScrollArea::vertical().show(ui, |ui| {
                    ui.heading("Scene Graph");
                    ui.separator();

                    self.ui_input(ui, ctx, hovering);
                    ui.separator();

                    self.ui_results(ui);
                });
            });

        // Right sidebar with diagram controls
        if self.show_sidebar && self.diagram.is_some() {
            egui::SidePanel::right("right_panel")
                .default_width(260.0)
                .show(ctx, |ui| {
                    ScrollArea::vertical().show(ui, |ui| {
                        self.ui_info(ui);
                        ui.separator();

                        self.ui_edit(ui);
                        ui.separator();

                        self.ui_navigation(ui);
                        ui.separator();

                        self.ui_layout(ui);
                        ui.separator();

                        self.ui_interaction(ui);
                        ui.separator();

                        self.ui_style(ui);
                    });
                });
        }

        // Central panel with the diagram
        egui::CentralPanel::default().show(ctx, |ui| {
            if self.diagram.is_some() {
                self.ui_diagram(ui);
            } else {
                ui.centered_and_justified(|ui| {
                    let hint = if self.session.is_loading() {
                        "Analyzing image..."
                    } else {
                        "Analyze an image to see its scene graph"
                    };
                    ui.label(RichText::new(hint).color(egui::Color32::GRAY));
                });
            }
        });
    }
}
