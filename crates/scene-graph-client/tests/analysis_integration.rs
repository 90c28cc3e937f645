//! Integration tests for the analysis client and controller.
//!
//! Each test starts a local `/predict` endpoint on an ephemeral port.
//!
//! Run with: `cargo test --package scene-graph-client --test analysis_integration`

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::json;
use tokio::sync::Notify;

use scene_graph_client::{AnalysisClient, AnalysisError, Analyzer, Controller, SubmitOutcome};
use scene_graph_core::{Phase, SelectedImage, SkipReason};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR\
    \x00\x00\x00\x01\x00\x00\x00\x01\x08\x02\x00\x00\x00\x90\x77\x53\xde";
const PROCESSED: &[u8] = b"processed image bytes";

#[derive(Debug, Clone, Copy)]
enum Mode {
    Ok,
    ServerError,
    BadBase64,
    NotJson,
    /// Wait for `release` before answering.
    Hold,
}

#[derive(Debug, Clone)]
struct Upload {
    field: String,
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

#[derive(Clone)]
struct Fake {
    mode: Mode,
    uploads: Arc<Mutex<Vec<Upload>>>,
    release: Arc<Notify>,
}

impl Fake {
    fn new(mode: Mode) -> Self {
        Self {
            mode,
            uploads: Arc::default(),
            release: Arc::new(Notify::new()),
        }
    }

    fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().unwrap().clone()
    }
}

fn analysis_body(processed_image: &str) -> serde_json::Value {
    json!({
        "scene_graph": {
            "objects": [
                {"id": "person_1", "x": 10, "y": 20, "width": 50, "height": 120},
                {"id": "dog_1", "x": 80, "y": 90, "width": 40, "height": 30}
            ],
            "relationships": ["person_1 is near dog_1", "dog_1"]
        },
        "description": "Detected objects: person_1, dog_1. person_1 is near dog_1.",
        "processed_image": processed_image
    })
}

async fn predict(State(fake): State<Fake>, mut multipart: Multipart) -> Response {
    while let Ok(Some(field)) = multipart.next_field().await {
        let upload = Upload {
            field: field.name().unwrap_or_default().to_string(),
            file_name: field.file_name().map(str::to_string),
            content_type: field.content_type().map(str::to_string),
            bytes: field.bytes().await.map(|b| b.to_vec()).unwrap_or_default(),
        };
        fake.uploads.lock().unwrap().push(upload);
    }

    if !fake.uploads().iter().any(|u| u.field == "file") {
        return (StatusCode::UNPROCESSABLE_ENTITY, "missing file field").into_response();
    }

    match fake.mode {
        Mode::Ok => Json(analysis_body(&BASE64.encode(PROCESSED))).into_response(),
        Mode::ServerError => (StatusCode::INTERNAL_SERVER_ERROR, "model crashed").into_response(),
        Mode::BadBase64 => Json(analysis_body("%%% not base64 %%%")).into_response(),
        Mode::NotJson => "<html>oops</html>".into_response(),
        Mode::Hold => {
            fake.release.notified().await;
            Json(analysis_body(&BASE64.encode(PROCESSED))).into_response()
        }
    }
}

/// Serve `fake` on an ephemeral port and return the endpoint URL.
async fn serve(fake: Fake) -> String {
    let app = Router::new()
        .route("/predict", post(predict))
        .with_state(fake);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/predict", addr)
}

fn client(endpoint: String) -> AnalysisClient {
    AnalysisClient::new(endpoint, Duration::from_secs(10)).unwrap()
}

fn image() -> SelectedImage {
    SelectedImage::from_bytes("street.png", PNG.to_vec()).unwrap()
}

#[tokio::test]
async fn uploads_file_part_and_decodes_result() {
    let fake = Fake::new(Mode::Ok);
    let client = client(serve(fake.clone()).await);

    let result = client.analyze(&image()).await.unwrap();

    let uploads = fake.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].field, "file");
    assert_eq!(uploads[0].file_name.as_deref(), Some("street.png"));
    assert_eq!(uploads[0].content_type.as_deref(), Some("image/png"));
    assert_eq!(uploads[0].bytes, PNG);

    assert_eq!(result.processed_image(), PROCESSED);
    assert!(result.description().starts_with("Detected objects"));
    assert_eq!(result.scene_graph().object_count(), 2);
}

#[tokio::test]
async fn controller_completes_and_renders() {
    let controller = Controller::new(client(serve(Fake::new(Mode::Ok)).await));
    controller.intake(image());

    let outcome = controller.submit().await;
    let SubmitOutcome::Completed(result) = outcome else {
        panic!("expected completion, got {:?}", outcome);
    };
    assert_eq!(result.scene_graph().relationship_count(), 2);
    assert_eq!(controller.phase(), Phase::Done);

    let rendered = controller.render(true).unwrap();
    assert_eq!(rendered.model.node_count(), 2);
    assert_eq!(rendered.model.edge_count(), 1);
    assert_eq!(rendered.model.edges[0].label, "is near");
    assert_eq!(rendered.model.issues.len(), 1);
    assert!(rendered.overview.is_some());
}

#[tokio::test]
async fn server_error_is_a_failed_outcome() {
    let controller = Controller::new(client(serve(Fake::new(Mode::ServerError)).await));
    controller.intake(image());

    match controller.submit().await {
        SubmitOutcome::Failed(AnalysisError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "model crashed");
        }
        other => panic!("expected status failure, got {:?}", other),
    }
    assert_eq!(controller.phase(), Phase::Ready);
    assert!(controller.last_result().is_none());
}

#[tokio::test]
async fn invalid_payloads_are_rejected() {
    let client_bad_image = client(serve(Fake::new(Mode::BadBase64)).await);
    let err = client_bad_image.analyze(&image()).await.unwrap_err();
    assert!(matches!(err, AnalysisError::Payload(_)), "{:?}", err);

    let client_not_json = client(serve(Fake::new(Mode::NotJson)).await);
    let err = client_not_json.analyze(&image()).await.unwrap_err();
    assert!(matches!(err, AnalysisError::Decode(_)), "{:?}", err);
}

#[tokio::test]
async fn unreachable_endpoint_is_a_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(format!("http://{}/predict", addr))
        .analyze(&image())
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::Network { .. }), "{:?}", err);
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn submit_while_loading_and_clear_mid_flight() {
    let fake = Fake::new(Mode::Hold);
    let controller = Arc::new(Controller::new(client(serve(fake.clone()).await)));
    controller.intake(image());

    let pending = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.submit().await }
    });

    // Wait until the request has reached the server.
    for _ in 0..200 {
        if !fake.uploads().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(fake.uploads().len(), 1);
    assert!(controller.is_loading());

    assert!(matches!(
        controller.submit().await,
        SubmitOutcome::Skipped(SkipReason::InFlight)
    ));

    assert!(controller.clear().is_some());
    fake.release.notify_one();

    let outcome = pending.await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Superseded), "{:?}", outcome);
    assert_eq!(controller.phase(), Phase::Idle);
    assert!(controller.last_result().is_none());
    assert_eq!(fake.uploads().len(), 1);
}
