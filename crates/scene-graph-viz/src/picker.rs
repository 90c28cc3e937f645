//! Click-to-browse image selection.
//!
//! Natively the system dialog blocks the frame it was opened from, which is
//! how eframe apps usually do it. In the browser the dialog is async and the
//! picked file lands in a shared slot that the app polls once per frame.

use std::cell::RefCell;
use std::rc::Rc;

use egui::Context;
use scene_graph_core::SelectedImage;
use tracing::debug;

/// Extensions offered by the dialog filter. Content is still sniffed on intake.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

type Picked = Result<SelectedImage, String>;

/// Opens the file dialog and hands back the chosen image.
#[derive(Default)]
pub struct ImagePicker {
    slot: Rc<RefCell<Option<Picked>>>,
}

impl ImagePicker {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn open(&mut self, _ctx: &Context) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("images", IMAGE_EXTENSIONS)
            .pick_file()
        else {
            debug!("Image dialog cancelled");
            return;
        };
        debug!(path = %path.display(), "Image picked");
        let picked = SelectedImage::from_path(&path).map_err(|e| e.to_string());
        *self.slot.borrow_mut() = Some(picked);
    }

    #[cfg(target_arch = "wasm32")]
    pub fn open(&mut self, ctx: &Context) {
        let slot = Rc::clone(&self.slot);
        let ctx = ctx.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let Some(handle) = rfd::AsyncFileDialog::new()
                .add_filter("images", IMAGE_EXTENSIONS)
                .pick_file()
                .await
            else {
                debug!("Image dialog cancelled");
                return;
            };
            let name = handle.file_name();
            let bytes = handle.read().await;
            debug!(%name, bytes = bytes.len(), "Image picked");
            *slot.borrow_mut() = Some(image_from_picked(name, bytes));
            ctx.request_repaint();
        });
    }

    /// The file picked since the last poll, if any.
    pub fn poll(&mut self) -> Option<Picked> {
        self.slot.borrow_mut().take()
    }
}

/// Accept picked bytes the same way a dropped file is accepted.
pub fn image_from_picked(name: String, bytes: Vec<u8>) -> Picked {
    let name = if name.is_empty() {
        "image".to_string()
    } else {
        name
    };
    SelectedImage::from_bytes(name, bytes).map_err(|e| e.to_string())
}
