//! Upload session state machine.
//!
//! The session owns the only mutable state of the workflow: the selected
//! file, its preview handle, the loading flag and the last result. Phases:
//!
//! - `Idle`: nothing selected
//! - `Ready`: file selected, no result
//! - `Loading`: an analysis is in flight
//! - `Done`: a result is present
//!
//! Every intake and clear starts a new generation. Analysis completions
//! carry the generation they were started in and are ignored once it is
//! stale, so a response that lands after a clear never resurrects state.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::media::SelectedImage;
use crate::model::AnalysisResult;

/// Locally derived display reference for the selected image.
///
/// The view registers image bytes under this URI and must release it when
/// the session hands it back as superseded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewHandle(String);

impl PreviewHandle {
    fn for_image(generation: u64, image: &SelectedImage) -> Self {
        let stem: String = image
            .name()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let has_ext = stem
            .rsplit_once('.')
            .map(|(_, ext)| ext.eq_ignore_ascii_case(image.extension()))
            .unwrap_or(false);
        let file = if has_ext || image.extension().is_empty() {
            stem
        } else {
            format!("{}.{}", stem, image.extension())
        };
        Self(format!("bytes://preview/{}/{}", generation, file))
    }

    pub fn uri(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Coarse workflow phase derived from [`UploadState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Ready,
    Loading,
    Done,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Ready => "ready",
            Phase::Loading => "loading",
            Phase::Done => "done",
        }
    }
}

/// Snapshot of the session's fields.
#[derive(Debug, Clone, Default)]
pub struct UploadState {
    pub selected_file: Option<SelectedImage>,
    pub preview: Option<PreviewHandle>,
    pub is_loading: bool,
    pub last_result: Option<Arc<AnalysisResult>>,
}

/// Why a submit did not start a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoFile,
    InFlight,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoFile => f.write_str("no file selected"),
            SkipReason::InFlight => f.write_str("an analysis is already in flight"),
        }
    }
}

/// Permission to run one analysis for the file selected at submit time.
#[derive(Debug, Clone)]
pub struct SubmitTicket {
    generation: u64,
    image: SelectedImage,
}

impl SubmitTicket {
    /// The image to send.
    pub fn image(&self) -> &SelectedImage {
        &self.image
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What happened to a completion handed back to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// State was updated.
    Applied,
    /// The ticket predates a clear or new intake; nothing changed.
    Stale,
}

#[derive(Debug, Default)]
pub struct UploadSession {
    state: UploadState,
    generation: u64,
    in_flight: Option<u64>,
    result_revision: u64,
}

impl UploadSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        if self.state.is_loading {
            Phase::Loading
        } else if self.state.last_result.is_some() {
            Phase::Done
        } else if self.state.selected_file.is_some() {
            Phase::Ready
        } else {
            Phase::Idle
        }
    }

    pub fn selected_file(&self) -> Option<&SelectedImage> {
        self.state.selected_file.as_ref()
    }

    pub fn preview(&self) -> Option<&PreviewHandle> {
        self.state.preview.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading
    }

    pub fn last_result(&self) -> Option<&Arc<AnalysisResult>> {
        self.state.last_result.as_ref()
    }

    /// Bumped whenever `last_result` changes (set or cleared).
    pub fn result_revision(&self) -> u64 {
        self.result_revision
    }

    /// Current generation; changes on every intake and clear.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Select a new image, dropping any previous selection and result.
    ///
    /// Returns the superseded preview handle so the caller can release it.
    pub fn intake(&mut self, image: SelectedImage) -> Option<PreviewHandle> {
        self.generation += 1;
        if self.in_flight.take().is_some() {
            debug!("Intake while loading; in-flight analysis will be ignored");
        }

        let preview = PreviewHandle::for_image(self.generation, &image);
        info!(
            name = image.name(),
            media_type = image.media_type(),
            bytes = image.len(),
            preview = %preview,
            "Selected image"
        );

        let superseded = self.state.preview.replace(preview);
        self.state.selected_file = Some(image);
        self.state.is_loading = false;
        if self.state.last_result.take().is_some() {
            self.result_revision += 1;
        }
        superseded
    }

    /// Start an analysis if a file is selected and none is running.
    pub fn begin_submit(&mut self) -> Result<SubmitTicket, SkipReason> {
        if self.state.is_loading {
            debug!("Submit ignored: analysis in flight");
            return Err(SkipReason::InFlight);
        }
        let Some(image) = self.state.selected_file.clone() else {
            debug!("Submit ignored: no file selected");
            return Err(SkipReason::NoFile);
        };

        self.state.is_loading = true;
        self.in_flight = Some(self.generation);
        info!(name = image.name(), generation = self.generation, "Submitting image for analysis");

        Ok(SubmitTicket {
            generation: self.generation,
            image,
        })
    }

    /// Store a successful analysis.
    pub fn complete(&mut self, ticket: SubmitTicket, result: AnalysisResult) -> Completion {
        if !self.settle(&ticket) {
            return Completion::Stale;
        }
        info!(
            objects = result.scene_graph().object_count(),
            relationships = result.scene_graph().relationship_count(),
            "Analysis completed"
        );
        self.state.last_result = Some(Arc::new(result));
        self.result_revision += 1;
        Completion::Applied
    }

    /// Record a failed analysis. The previous result is kept.
    pub fn fail(&mut self, ticket: SubmitTicket, error: &dyn fmt::Display) -> Completion {
        if !self.settle(&ticket) {
            return Completion::Stale;
        }
        warn!(error = %error, "Error analyzing image");
        Completion::Applied
    }

    /// Reset to Idle. Returns the released preview handle, if any.
    pub fn clear(&mut self) -> Option<PreviewHandle> {
        self.generation += 1;
        if self.in_flight.take().is_some() {
            debug!("Cleared while loading; in-flight analysis will be ignored");
        }
        self.state.selected_file = None;
        self.state.is_loading = false;
        if self.state.last_result.take().is_some() {
            self.result_revision += 1;
        }
        self.state.preview.take()
    }

    fn settle(&mut self, ticket: &SubmitTicket) -> bool {
        if self.in_flight != Some(ticket.generation) {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "Ignoring stale analysis completion"
            );
            return false;
        }
        self.in_flight = None;
        self.state.is_loading = false;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::fixtures::PNG_BYTES;
    use crate::model::{DetectedObject, SceneGraph};

    fn image(name: &str) -> SelectedImage {
        SelectedImage::from_bytes(name, PNG_BYTES.to_vec()).unwrap()
    }

    fn result(description: &str) -> AnalysisResult {
        AnalysisResult::new(
            vec![1, 2, 3],
            description,
            SceneGraph {
                objects: vec![DetectedObject::new("A", 0.0, 0.0, 1.0, 1.0)],
                relationships: vec![],
            },
        )
        .unwrap()
    }

    fn assert_preview_matches_file(session: &UploadSession) {
        assert_eq!(
            session.selected_file().is_some(),
            session.preview().is_some()
        );
    }

    #[test]
    fn starts_idle() {
        let session = UploadSession::new();
        assert_eq!(session.phase(), Phase::Idle);
        assert!(!session.is_loading());
        assert_preview_matches_file(&session);
    }

    #[test]
    fn intake_moves_to_ready_with_preview() {
        let mut session = UploadSession::new();
        assert_eq!(session.intake(image("cat.png")), None);

        assert_eq!(session.phase(), Phase::Ready);
        assert_preview_matches_file(&session);
        assert_eq!(session.preview().unwrap().uri(), "bytes://preview/1/cat.png");
    }

    #[test]
    fn preview_uri_gets_extension_and_safe_characters() {
        let mut session = UploadSession::new();
        session.intake(image("my photo"));
        assert_eq!(session.preview().unwrap().uri(), "bytes://preview/1/my_photo.png");
    }

    #[test]
    fn submit_without_file_changes_nothing() {
        let mut session = UploadSession::new();
        assert_eq!(session.begin_submit().unwrap_err(), SkipReason::NoFile);
        assert_eq!(session.phase(), Phase::Idle);
        assert!(!session.is_loading());
        assert_eq!(session.generation(), 0);
    }

    #[test]
    fn second_submit_while_loading_is_refused() {
        let mut session = UploadSession::new();
        session.intake(image("a.png"));
        let ticket = session.begin_submit().unwrap();
        assert_eq!(session.phase(), Phase::Loading);

        assert_eq!(session.begin_submit().unwrap_err(), SkipReason::InFlight);

        assert_eq!(session.complete(ticket, result("ok")), Completion::Applied);
        assert_eq!(session.phase(), Phase::Done);
    }

    #[test]
    fn success_stores_result_once() {
        let mut session = UploadSession::new();
        session.intake(image("a.png"));
        let ticket = session.begin_submit().unwrap();
        let revision = session.result_revision();

        session.complete(ticket, result("first"));

        assert!(!session.is_loading());
        assert_eq!(session.last_result().unwrap().description(), "first");
        assert_eq!(session.result_revision(), revision + 1);

        let ticket = session.begin_submit().unwrap();
        session.complete(ticket, result("second"));
        assert_eq!(session.last_result().unwrap().description(), "second");
    }

    #[test]
    fn failure_keeps_previous_result_and_clears_loading() {
        let mut session = UploadSession::new();
        session.intake(image("a.png"));
        let ticket = session.begin_submit().unwrap();
        session.complete(ticket, result("kept"));

        let ticket = session.begin_submit().unwrap();
        let revision = session.result_revision();
        assert_eq!(session.fail(ticket, &"boom"), Completion::Applied);

        assert!(!session.is_loading());
        assert_eq!(session.last_result().unwrap().description(), "kept");
        assert_eq!(session.result_revision(), revision);
    }

    #[test]
    fn failure_from_ready_returns_to_ready() {
        let mut session = UploadSession::new();
        session.intake(image("a.png"));
        let ticket = session.begin_submit().unwrap();
        session.fail(ticket, &"network down");
        assert_eq!(session.phase(), Phase::Ready);
    }

    #[test]
    fn new_intake_discards_result_and_returns_old_preview() {
        let mut session = UploadSession::new();
        session.intake(image("a.png"));
        let first_preview = session.preview().cloned();
        let ticket = session.begin_submit().unwrap();
        session.complete(ticket, result("old"));

        let superseded = session.intake(image("b.png"));

        assert_eq!(superseded, first_preview);
        assert_eq!(session.phase(), Phase::Ready);
        assert!(session.last_result().is_none());
        assert_ne!(session.preview(), first_preview.as_ref());
    }

    #[test]
    fn clear_from_every_phase_yields_idle() {
        let setups: Vec<fn(&mut UploadSession)> = vec![
            |_| {},
            |s| {
                s.intake(image("a.png"));
            },
            |s| {
                s.intake(image("a.png"));
                s.begin_submit().unwrap();
            },
            |s| {
                s.intake(image("a.png"));
                let t = s.begin_submit().unwrap();
                s.complete(t, result("done"));
            },
        ];

        for setup in setups {
            let mut session = UploadSession::new();
            setup(&mut session);
            session.clear();

            assert_eq!(session.phase(), Phase::Idle);
            assert!(session.selected_file().is_none());
            assert!(session.preview().is_none());
            assert!(session.last_result().is_none());
            assert!(!session.is_loading());
        }
    }

    #[test]
    fn response_after_clear_is_ignored() {
        let mut session = UploadSession::new();
        session.intake(image("a.png"));
        let ticket = session.begin_submit().unwrap();

        let released = session.clear();
        assert!(released.is_some());

        assert_eq!(session.complete(ticket, result("late")), Completion::Stale);
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.last_result().is_none());
    }

    #[test]
    fn response_for_replaced_file_is_ignored() {
        let mut session = UploadSession::new();
        session.intake(image("a.png"));
        let old = session.begin_submit().unwrap();

        session.intake(image("b.png"));
        let current = session.begin_submit().unwrap();

        assert_eq!(session.complete(old, result("for a")), Completion::Stale);
        assert!(session.is_loading());
        assert_eq!(session.complete(current, result("for b")), Completion::Applied);
        assert_eq!(session.last_result().unwrap().description(), "for b");
    }

    #[test]
    fn ticket_carries_the_selected_image() {
        let mut session = UploadSession::new();
        session.intake(image("a.png"));
        let ticket = session.begin_submit().unwrap();
        assert_eq!(ticket.image().name(), "a.png");
        assert_eq!(ticket.generation(), session.generation());
    }
}
