//! Async driver for the upload session.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::warn;

use scene_graph_core::{
    render, AnalysisResult, Completion, Phase, PreviewHandle, RenderedDiagram, SelectedImage,
    SkipReason, UploadSession, UploadState,
};

use crate::analyzer::Analyzer;
use crate::error::AnalysisError;

/// What a call to [`Controller::submit`] did.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// No request was made.
    Skipped(SkipReason),
    /// The analysis was stored as the current result.
    Completed(Arc<AnalysisResult>),
    /// The request failed; the previous result is untouched.
    Failed(AnalysisError),
    /// The session moved on (clear or new intake) before the call settled.
    Superseded,
}

impl SubmitOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SubmitOutcome::Completed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            SubmitOutcome::Skipped(_) => "skipped",
            SubmitOutcome::Completed(_) => "completed",
            SubmitOutcome::Failed(_) => "failed",
            SubmitOutcome::Superseded => "superseded",
        }
    }
}

/// Interaction controller.
///
/// Methods take `&self` so one controller can be shared between the task
/// awaiting an analysis and whoever clears or replaces the file meanwhile.
pub struct Controller<A> {
    analyzer: A,
    session: Mutex<UploadSession>,
}

impl<A: Analyzer> Controller<A> {
    pub fn new(analyzer: A) -> Self {
        Self {
            analyzer,
            session: Mutex::new(UploadSession::new()),
        }
    }

    pub fn analyzer(&self) -> &A {
        &self.analyzer
    }

    /// Select a new image. Returns the preview handle it replaced.
    pub fn intake(&self, image: SelectedImage) -> Option<PreviewHandle> {
        self.session().intake(image)
    }

    /// Analyze the selected image.
    pub async fn submit(&self) -> SubmitOutcome {
        let ticket = match self.session().begin_submit() {
            Ok(ticket) => ticket,
            Err(reason) => return SubmitOutcome::Skipped(reason),
        };

        let outcome = self.analyzer.analyze(ticket.image()).await;

        let mut session = self.session();
        match outcome {
            Ok(result) => match session.complete(ticket, result) {
                Completion::Applied => match session.last_result() {
                    Some(result) => SubmitOutcome::Completed(Arc::clone(result)),
                    None => SubmitOutcome::Superseded,
                },
                Completion::Stale => SubmitOutcome::Superseded,
            },
            Err(error) => match session.fail(ticket, &error) {
                Completion::Applied => SubmitOutcome::Failed(error),
                Completion::Stale => {
                    warn!(error = %error, "Analysis failed after the session moved on");
                    SubmitOutcome::Superseded
                }
            },
        }
    }

    /// Reset everything. Returns the released preview handle.
    pub fn clear(&self) -> Option<PreviewHandle> {
        self.session().clear()
    }

    pub fn phase(&self) -> Phase {
        self.session().phase()
    }

    pub fn is_loading(&self) -> bool {
        self.session().is_loading()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> UploadState {
        self.session().state().clone()
    }

    pub fn last_result(&self) -> Option<Arc<AnalysisResult>> {
        self.session().last_result().cloned()
    }

    /// Diagram of the current result, if any.
    pub fn render(&self, show_overview: bool) -> Option<RenderedDiagram> {
        self.last_result()
            .map(|result| render(result.scene_graph(), show_overview))
    }

    fn session(&self) -> MutexGuard<'_, UploadSession> {
        // Session updates cannot panic midway; a poisoned lock holds consistent state.
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use scene_graph_core::{DetectedObject, SceneGraph};

    use crate::error::AnalysisCallResult;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR\
        \x00\x00\x00\x01\x00\x00\x00\x01\x08\x02\x00\x00\x00\x90\x77\x53\xde";

    /// Succeeds while the flag is set.
    struct Fixed(AtomicBool);

    #[async_trait]
    impl Analyzer for Fixed {
        async fn analyze(&self, image: &SelectedImage) -> AnalysisCallResult<AnalysisResult> {
            if !self.0.load(Ordering::SeqCst) {
                return Err(AnalysisError::Status {
                    status: 503,
                    body: "busy".into(),
                });
            }
            Ok(AnalysisResult::new(
                image.bytes().to_vec(),
                format!("analyzed {}", image.name()),
                SceneGraph {
                    objects: vec![
                        DetectedObject::new("cup_1", 0.0, 0.0, 4.0, 4.0),
                        DetectedObject::new("table_1", 0.0, 4.0, 20.0, 2.0),
                    ],
                    relationships: vec!["cup_1 on table_1".into()],
                },
            )?)
        }
    }

    fn image() -> SelectedImage {
        SelectedImage::from_bytes("kitchen.png", PNG.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn submit_without_file_is_skipped() {
        let controller = Controller::new(Fixed(AtomicBool::new(true)));
        let outcome = controller.submit().await;
        assert!(matches!(outcome, SubmitOutcome::Skipped(SkipReason::NoFile)));
        assert_eq!(controller.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn successful_submit_renders() {
        let controller = Controller::new(Fixed(AtomicBool::new(true)));
        controller.intake(image());

        let outcome = controller.submit().await;
        assert!(outcome.is_completed());
        assert_eq!(controller.phase(), Phase::Done);

        let rendered = controller.render(false).unwrap();
        assert_eq!(rendered.model.edges[0].label, "on");
        assert!(rendered.overview.is_none());
    }

    #[tokio::test]
    async fn failed_submit_keeps_previous_result() {
        let controller = Controller::new(Fixed(AtomicBool::new(true)));
        controller.intake(image());
        controller.submit().await;
        let before = controller.last_result().unwrap();

        controller.analyzer().0.store(false, Ordering::SeqCst);
        let outcome = controller.submit().await;

        assert!(matches!(outcome, SubmitOutcome::Failed(ref e) if e.status() == Some(503)));
        assert!(!controller.is_loading());
        assert_eq!(controller.phase(), Phase::Done);
        assert!(Arc::ptr_eq(&controller.last_result().unwrap(), &before));
    }

    #[tokio::test]
    async fn clear_releases_preview() {
        let controller = Controller::new(Fixed(AtomicBool::new(true)));
        controller.intake(image());
        let preview = controller.snapshot().preview;
        assert_eq!(controller.clear(), preview);
        assert_eq!(controller.phase(), Phase::Idle);
        assert_eq!(controller.clear(), None);
    }
}
