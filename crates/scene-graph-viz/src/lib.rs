//! WASM-compatible egui viewer for scene graph analysis.
//!
//! This crate provides an egui-based front-end that can run:
//! - Natively (via eframe), posting to the analysis service through
//!   `scene-graph-client`
//! - In the browser (via WASM), posting with `gloo-net`

mod app;
mod diagram_view;
mod jobs;
mod picker;
mod settings;
mod ui;

pub use app::SceneGraphApp;
pub use diagram_view::DiagramView;
pub use jobs::ViewerOptions;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Open the viewer in a native window.
#[cfg(all(feature = "native", not(target_arch = "wasm32")))]
pub fn run_native(
    options: ViewerOptions,
    image: Option<scene_graph_core::SelectedImage>,
) -> eframe::Result<()> {
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_title("Scene Graph"),
        ..Default::default()
    };

    eframe::run_native(
        "Scene Graph",
        native_options,
        Box::new(move |cc| {
            let mut app = SceneGraphApp::new(cc, options);
            if let Some(image) = image {
                app = app.with_image(image);
            }
            Ok(Box::new(app))
        }),
    )
}

/// Endpoint set by the hosting page as `window.SCENE_GRAPH_ENDPOINT`.
#[cfg(target_arch = "wasm32")]
fn page_endpoint() -> Option<String> {
    let window = web_sys::window()?;
    js_sys::Reflect::get(&window, &JsValue::from_str("SCENE_GRAPH_ENDPOINT"))
        .ok()?
        .as_string()
}

/// Start the viewer in WASM context.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    // Better panic messages in the browser console
    console_error_panic_hook::set_once();

    let web_options = eframe::WebOptions::default();
    let mut options = ViewerOptions::default();
    if let Some(endpoint) = page_endpoint() {
        options.endpoint = endpoint;
    }

    wasm_bindgen_futures::spawn_local(async move {
        let started = eframe::WebRunner::new()
            .start(
                "scene-graph-canvas",
                web_options,
                Box::new(move |cc| Ok(Box::new(SceneGraphApp::new(cc, options)))),
            )
            .await;
        if let Err(e) = started {
            web_sys::console::error_1(&format!("Failed to start eframe: {:?}", e).into());
        }
    });
}
