//! Analysis client for the scene graph viewer.
//!
//! Posts a selected image to the analysis service and drives the
//! [`UploadSession`](scene_graph_core::UploadSession) around the call.
//!
//! ```rust,no_run
//! use scene_graph_client::{AnalysisClient, Config, Controller, SubmitOutcome};
//! use scene_graph_core::SelectedImage;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let controller = Controller::new(AnalysisClient::from_config(&config)?);
//!
//! controller.intake(SelectedImage::from_path("street.jpg".as_ref())?);
//! if let SubmitOutcome::Completed(result) = controller.submit().await {
//!     println!("{}", result.description());
//! }
//! # Ok(())
//! # }
//! ```

mod analyzer;
mod config;
mod controller;
mod error;

pub use analyzer::{AnalysisClient, Analyzer, UPLOAD_FIELD};
pub use config::{
    Config, CONFIG_KEYS, CONFIG_PATH_ENV, ENDPOINT_ENV, SHOW_OVERVIEW_ENV, TIMEOUT_ENV,
};
pub use controller::{Controller, SubmitOutcome};
pub use error::{AnalysisCallResult, AnalysisError, ConfigError, ConfigResult};
