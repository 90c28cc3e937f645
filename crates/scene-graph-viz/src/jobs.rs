//! Background analysis jobs.
//!
//! Natively a small tokio runtime owned by the app runs the request through
//! [`scene_graph_client::AnalysisClient`] and reports back over a channel.
//! In the browser the request runs on `spawn_local` and lands in a shared
//! slot. Either way the app polls once per frame.

use scene_graph_core::{AnalysisResult, SubmitTicket};

/// A settled analysis, tagged with the ticket it was started with.
pub struct Finished {
    pub ticket: SubmitTicket,
    pub outcome: Result<AnalysisResult, String>,
}

/// Where and how to reach the analysis service.
#[derive(Debug, Clone)]
pub struct ViewerOptions {
    pub endpoint: String,
    pub timeout_secs: u64,
    pub show_overview: bool,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: 120,
            show_overview: true,
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn default_endpoint() -> String {
    scene_graph_client::Config::default().endpoint
}

/// Same-origin endpoint when served next to the analysis service.
#[cfg(target_arch = "wasm32")]
fn default_endpoint() -> String {
    "/predict".to_string()
}

#[cfg(not(target_arch = "wasm32"))]
impl ViewerOptions {
    pub fn from_config(config: &scene_graph_client::Config) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            timeout_secs: config.timeout_secs,
            show_overview: config.show_overview,
        }
    }
}

// =============================================================================
// Native
// =============================================================================

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::time::Duration;

    use scene_graph_client::{AnalysisClient, Analyzer};
    use scene_graph_core::SubmitTicket;
    use tokio::runtime::Runtime;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
    use tokio::task::JoinHandle;
    use tracing::debug;

    use super::{Finished, ViewerOptions};

    /// The running request and the session generation it was started for.
    struct InFlight {
        generation: u64,
        handle: JoinHandle<()>,
    }

    pub struct AnalysisJobs {
        runtime: Runtime,
        client: AnalysisClient,
        tx: UnboundedSender<Finished>,
        rx: UnboundedReceiver<Finished>,
        in_flight: Option<InFlight>,
    }

    impl AnalysisJobs {
        pub fn new(options: &ViewerOptions) -> Result<Self, String> {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .thread_name("scene-graph-analysis")
                .enable_all()
                .build()
                .map_err(|e| format!("Failed to start analysis runtime: {}", e))?;
            let client = AnalysisClient::new(
                options.endpoint.clone(),
                Duration::from_secs(options.timeout_secs),
            )
            .map_err(|e| e.to_string())?;
            let (tx, rx) = unbounded_channel();

            Ok(Self {
                runtime,
                client,
                tx,
                rx,
                in_flight: None,
            })
        }

        pub fn endpoint(&self) -> &str {
            self.client.endpoint()
        }

        pub fn spawn(&mut self, ticket: SubmitTicket, ctx: &egui::Context) {
            let generation = ticket.generation();
            let client = self.client.clone();
            let tx = self.tx.clone();
            let ctx = ctx.clone();

            let handle = self.runtime.spawn(async move {
                let outcome = client
                    .analyze(ticket.image())
                    .await
                    .map_err(|e| e.to_string());
                // The receiver lives as long as the app.
                let _ = tx.send(Finished { ticket, outcome });
                ctx.request_repaint();
            });
            self.in_flight = Some(InFlight { generation, handle });
        }

        /// Drop the in-flight request, if any.
        pub fn abort(&mut self) {
            if let Some(InFlight { generation, handle }) = self.in_flight.take() {
                if !handle.is_finished() {
                    debug!(generation, "Aborting in-flight analysis");
                }
                handle.abort();
            }
        }

        /// Next settled request. A late result from an older request
        /// leaves the handle of the current one in place.
        pub fn poll(&mut self) -> Option<Finished> {
            let finished = self.rx.try_recv().ok()?;
            let settled = finished.ticket.generation();
            if self
                .in_flight
                .as_ref()
                .is_some_and(|job| job.generation == settled)
            {
                self.in_flight = None;
            }
            Some(finished)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use scene_graph_core::{SelectedImage, UploadSession};

        const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR\
            \x00\x00\x00\x01\x00\x00\x00\x01\x08\x02\x00\x00\x00\x90\x77\x53\xde";

        fn image(name: &str) -> SelectedImage {
            SelectedImage::from_bytes(name, PNG.to_vec()).unwrap()
        }

        fn jobs() -> AnalysisJobs {
            let options = ViewerOptions {
                endpoint: "http://127.0.0.1:1/predict".to_string(),
                ..ViewerOptions::default()
            };
            AnalysisJobs::new(&options).unwrap()
        }

        fn is_running(jobs: &AnalysisJobs) -> bool {
            jobs.in_flight
                .as_ref()
                .is_some_and(|job| !job.handle.is_finished())
        }

        /// Stand-in for a request that never settles on its own.
        fn hold(jobs: &mut AnalysisJobs, generation: u64) {
            let handle = jobs.runtime.spawn(std::future::pending::<()>());
            jobs.in_flight = Some(InFlight { generation, handle });
        }

        #[test]
        fn late_result_keeps_current_request_abortable() {
            let mut jobs = jobs();
            let mut session = UploadSession::new();

            session.intake(image("first.png"));
            let first = session.begin_submit().unwrap();
            session.intake(image("second.png"));
            let second = session.begin_submit().unwrap();
            assert_ne!(first.generation(), second.generation());

            hold(&mut jobs, second.generation());
            jobs.tx
                .send(Finished {
                    ticket: first,
                    outcome: Err("late".to_string()),
                })
                .unwrap();

            let late = jobs.poll().unwrap();
            assert_eq!(late.outcome.unwrap_err(), "late");
            assert!(is_running(&jobs));

            jobs.abort();
            assert!(!is_running(&jobs));
            assert!(jobs.in_flight.is_none());
        }

        #[test]
        fn own_result_releases_handle() {
            let mut jobs = jobs();
            let mut session = UploadSession::new();

            session.intake(image("photo.png"));
            let ticket = session.begin_submit().unwrap();
            hold(&mut jobs, ticket.generation());
            jobs.tx
                .send(Finished {
                    ticket,
                    outcome: Err("boom".to_string()),
                })
                .unwrap();

            assert!(jobs.poll().is_some());
            assert!(jobs.in_flight.is_none());
            assert!(jobs.poll().is_none());
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::AnalysisJobs;

// =============================================================================
// WASM
// =============================================================================

#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::RefCell;
    use std::rc::Rc;

    use gloo_net::http::Request;
    use scene_graph_core::{AnalysisResponse, AnalysisResult, SelectedImage, SubmitTicket};
    use wasm_bindgen::JsValue;
    use web_sys::{Blob, BlobPropertyBag, FormData};

    use super::{Finished, ViewerOptions};

    /// Shared slot for async results.
    type SharedResult = Rc<RefCell<Option<Finished>>>;

    pub struct AnalysisJobs {
        endpoint: String,
        slot: SharedResult,
    }

    impl AnalysisJobs {
        pub fn new(options: &ViewerOptions) -> Result<Self, String> {
            Ok(Self {
                endpoint: options.endpoint.clone(),
                slot: Rc::new(RefCell::new(None)),
            })
        }

        pub fn endpoint(&self) -> &str {
            &self.endpoint
        }

        pub fn spawn(&mut self, ticket: SubmitTicket, ctx: &egui::Context) {
            let endpoint = self.endpoint.clone();
            let slot = self.slot.clone();
            let ctx = ctx.clone();

            wasm_bindgen_futures::spawn_local(async move {
                let outcome = post_image(&endpoint, ticket.image()).await;
                *slot.borrow_mut() = Some(Finished { ticket, outcome });
                ctx.request_repaint();
            });
        }

        /// Requests cannot be cancelled here; stale results are dropped by
        /// the session when they land.
        pub fn abort(&mut self) {}

        pub fn poll(&mut self) -> Option<Finished> {
            self.slot.borrow_mut().take()
        }
    }

    fn js_err(e: JsValue) -> String {
        format!("{:?}", e)
    }

    async fn post_image(endpoint: &str, image: &SelectedImage) -> Result<AnalysisResult, String> {
        let bytes = js_sys::Uint8Array::from(image.bytes());
        let parts = js_sys::Array::of1(&bytes);
        let options = BlobPropertyBag::new();
        options.set_type(image.media_type());
        let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options).map_err(js_err)?;

        let form = FormData::new().map_err(js_err)?;
        form.append_with_blob_and_filename("file", &blob, image.name())
            .map_err(js_err)?;

        let resp = Request::post(endpoint)
            .body(form)
            .map_err(|e| format!("Request error: {}", e))?
            .send()
            .await
            .map_err(|e| format!("Network error: {}", e))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| format!("Network error: {}", e))?;

        if !resp.ok() {
            return Err(format!("Analysis service returned {}: {}", status, body));
        }

        let response: AnalysisResponse = serde_json::from_str(&body)
            .map_err(|e| format!("Failed to decode analysis response: {}", e))?;
        AnalysisResult::try_from(response).map_err(|e| format!("Invalid analysis payload: {}", e))
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::AnalysisJobs;
