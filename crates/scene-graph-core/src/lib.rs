//! Core domain types for the scene graph viewer.
//!
//! - **Payloads**: [`AnalysisResponse`] as it arrives over the wire and the
//!   validated [`AnalysisResult`] built from it
//! - **Diagram**: [`render`] turns a [`SceneGraph`] into a [`DiagramModel`]
//!   plus an optional [`OverviewPane`]; [`LiveDiagram`] holds user edits
//! - **Session**: [`UploadSession`] is the upload state machine shared by
//!   every front-end
//!
//! ```rust
//! use scene_graph_core::{render, DetectedObject, SceneGraph};
//!
//! let scene = SceneGraph {
//!     objects: vec![
//!         DetectedObject::new("person_1", 10.0, 20.0, 50.0, 120.0),
//!         DetectedObject::new("dog_1", 80.0, 90.0, 40.0, 30.0),
//!     ],
//!     relationships: vec!["person_1 is near dog_1".into()],
//! };
//!
//! let rendered = render(&scene, true);
//! assert_eq!(rendered.model.edges[0].label, "is near");
//! assert!(rendered.overview.is_some());
//! ```

mod diagram;
mod error;
mod live;
mod media;
mod model;
mod overview;
mod session;

pub use diagram::{
    render, Bounds, DiagramEdge, DiagramIssue, DiagramModel, DiagramNode, EdgeOrigin, Point,
    Relationship, RenderedDiagram, Size,
};
pub use error::{SceneGraphError, SceneGraphResult};
pub use live::LiveDiagram;
pub use media::{is_image_media_type, SelectedImage};
pub use model::{AnalysisResponse, AnalysisResult, DetectedObject, SceneGraph};
pub use overview::{OverviewPane, OVERVIEW_SIZE};
pub use session::{
    Completion, Phase, PreviewHandle, SkipReason, SubmitTicket, UploadSession, UploadState,
};
