use lotcore::model::FileHandle;
use lotcore::sync::UpdateOrigin;
use lotcore::{
    ClientConfig, CongestionLevel, HttpBackend, Session, SessionPhase, SubmitError, SubmitMode,
    UploadGate,
};
use serde_json::{json, Value};
use std::io::Write;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::NamedTempFile;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::{Filter, Reply};

const WAIT: Duration = Duration::from_secs(5);

/// Fake analysis backend. `/parking_spaces` walks through `statuses`, repeating
/// the last entry; a `null` entry answers 503.
struct FakeServer {
    addr: SocketAddr,
    uploads: Arc<Mutex<Vec<Bytes>>>,
    polls: Arc<AtomicUsize>,
}

fn serve(analyze_status: StatusCode, analyze_body: Value, statuses: Vec<Value>) -> FakeServer {
    let uploads = Arc::new(Mutex::new(Vec::new()));
    let polls = Arc::new(AtomicUsize::new(0));

    let uploads_for_route = uploads.clone();
    let analyze = warp::path("analyze")
        .and(warp::post())
        .and(warp::body::bytes())
        .map(move |body: Bytes| {
            uploads_for_route.lock().unwrap().push(body);
            warp::reply::with_status(warp::reply::json(&analyze_body), analyze_status)
                .into_response()
        });

    let polls_for_route = polls.clone();
    let status = warp::path("parking_spaces").and(warp::get()).map(move || {
        let index = polls_for_route.fetch_add(1, Ordering::SeqCst);
        let body = statuses
            .get(index)
            .or_else(|| statuses.last())
            .cloned()
            .unwrap_or(Value::Null);
        match body {
            Value::Null => StatusCode::SERVICE_UNAVAILABLE.into_response(),
            Value::String(raw) => raw.into_response(),
            body => warp::reply::json(&body).into_response(),
        }
    });

    let (addr, server) = warp::serve(analyze.or(status)).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);

    FakeServer {
        addr,
        uploads,
        polls,
    }
}

fn session(server: &FakeServer, mode: SubmitMode) -> Session<HttpBackend> {
    let config = ClientConfig {
        base_url: format!("http://{}", server.addr),
        poll_interval_ms: 50,
        request_timeout_ms: 2000,
        submit_mode: mode,
    };
    Session::new(config.clone(), HttpBackend::new(config).unwrap())
}

fn media_file(contents: &[u8]) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".mp4").tempfile().unwrap();
    file.write_all(contents).unwrap();
    file
}

async fn wait_for<F>(session: &Session<HttpBackend>, mut done: F)
where
    F: FnMut(&Session<HttpBackend>) -> bool,
{
    tokio::time::timeout(WAIT, async {
        while !done(session) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn acknowledged_upload_then_live_polling() {
    let server = serve(
        StatusCode::OK,
        json!({"message": "영상 업로드 완료", "file": "current.mp4"}),
        vec![json!({
            "vehicles": [{"type": "car", "count": 7}],
            "spaces": [
                {"id": 1, "occupied": 1},
                {"id": 2, "occupied": 0},
                {"id": 3, "occupied": 1},
                {"id": 4, "occupied": 1},
                {"id": 5, "occupied": 1}
            ]
        })],
    );
    let session = session(&server, SubmitMode::Acknowledge);
    let media = media_file(b"fake video bytes");

    let mut gate = UploadGate::new();
    gate.select_file(Some(FileHandle::from_path(media.path()).with_mime("video/mp4")));
    let upload = gate.request_upload().unwrap();

    let outcome = session.submit(&upload).await.unwrap();
    assert_eq!(outcome.acknowledgement.as_deref(), Some("영상 업로드 완료"));
    assert_eq!(outcome.state.snapshot.total_slots(), 0);
    assert_eq!(outcome.stream_url, format!("http://{}/stream", server.addr));

    wait_for(&session, |s| s.display().origin == UpdateOrigin::Poll).await;
    let state = session.display();
    assert_eq!(state.snapshot.vehicle_count(), 7);
    assert_eq!(state.snapshot.empty_slot_ids(), &[2]);
    assert_eq!(state.congestion, CongestionLevel::Critical);

    let uploads = server.uploads.lock().unwrap().clone();
    assert_eq!(uploads.len(), 1);
    let body = String::from_utf8_lossy(&uploads[0]);
    assert!(body.contains("name=\"file\""));
    assert!(body.contains(&upload.name));
    assert!(body.contains("fake video bytes"));

    session.close();
}

#[tokio::test]
async fn immediate_result_populates_before_first_poll() {
    let server = serve(
        StatusCode::OK,
        json!({
            "message": "분석 완료",
            "result": {
                "spaces": {"1": false, "2": true},
                "vehicles": {"car": 1},
                "slots": {"1": [[0, 0], [5, 0], [5, 9]], "2": [[6, 0], [11, 0], [11, 9]]}
            }
        }),
        vec![Value::Null],
    );
    let session = session(&server, SubmitMode::ImmediateResult);
    let media = media_file(b"frame");
    let mut gate = UploadGate::new();
    gate.select_file(Some(FileHandle::from_path(media.path())));

    let outcome = session.submit(&gate.request_upload().unwrap()).await.unwrap();
    let snapshot = &outcome.state.snapshot;
    assert_eq!(snapshot.total_slots(), 2);
    assert_eq!(snapshot.empty_slot_ids(), &[1]);
    assert_eq!(snapshot.vehicle_count(), 1);
    assert_eq!(outcome.state.congestion, CongestionLevel::Congested);
    assert_eq!(snapshot.slots()[0].geometry.points().map(|p| p.len()), Some(3));

    // Status endpoint only answers 503: the submitted snapshot must survive.
    wait_for(&session, |s| s.metrics().polls_failed >= 2).await;
    assert_eq!(session.display(), outcome.state);
    session.close();
}

#[tokio::test]
async fn server_error_is_a_submit_error() {
    let server = serve(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"detail": "업로드 실패"}),
        vec![json!({})],
    );
    let session = session(&server, SubmitMode::Acknowledge);
    let media = media_file(b"x");
    let mut gate = UploadGate::new();
    gate.select_file(Some(FileHandle::from_path(media.path())));

    let err = session
        .submit(&gate.request_upload().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, SubmitError::Status { status: 500, ref body } if body.contains("업로드 실패")));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(session.phase(), SessionPhase::Idle);
    assert!(session.stream_url().is_none());
    assert_eq!(server.polls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unreadable_media_never_reaches_the_backend() {
    let server = serve(StatusCode::OK, json!({"ok": true}), vec![json!({})]);
    let session = session(&server, SubmitMode::Acknowledge);
    let mut gate = UploadGate::new();
    gate.select_file(Some(FileHandle::from_path("/nonexistent/lot.mp4")));

    let err = session
        .submit(&gate.request_upload().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, SubmitError::Media { .. }));
    assert!(server.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_and_failed_polls_keep_last_good_state() {
    let server = serve(
        StatusCode::OK,
        json!({"ok": true}),
        vec![
            json!({"vehicles": [{"count": 2}], "spaces": [{"id": 10, "occupied": 0}, {"id": 20, "occupied": 1}]}),
            Value::String("{not json".into()),
            Value::Null,
            json!({"error": "DB 연결 실패"}),
            json!({"vehicles": [{"count": 0}], "spaces": [{"id": 10, "occupied": 0}, {"id": 20, "occupied": 0}]}),
        ],
    );
    let session = session(&server, SubmitMode::Acknowledge);
    let media = media_file(b"x");
    let mut gate = UploadGate::new();
    gate.select_file(Some(FileHandle::from_path(media.path())));
    session.submit(&gate.request_upload().unwrap()).await.unwrap();

    wait_for(&session, |s| s.display().origin == UpdateOrigin::Poll).await;
    let first = session.display();
    assert_eq!(first.snapshot.empty_slot_ids(), &[10]);

    wait_for(&session, |s| s.display().revision > first.revision).await;
    let recovered = session.display();
    assert_eq!(recovered.snapshot.empty_slot_ids(), &[10, 20]);
    assert_eq!(recovered.congestion, CongestionLevel::Clear);
    assert_eq!(session.metrics().polls_failed, 3);
    session.close();
}

#[tokio::test]
async fn large_recording_is_uploaded_intact() {
    let server = serve(StatusCode::OK, json!({"ok": true}), vec![json!({})]);
    let session = session(&server, SubmitMode::Acknowledge);
    let contents: Vec<u8> = (0..3 * 1024 * 1024u32).map(|i| (i % 251) as u8).collect();
    let media = media_file(&contents);

    let mut gate = UploadGate::new();
    gate.select_file(Some(FileHandle::from_path(media.path())));
    session.submit(&gate.request_upload().unwrap()).await.unwrap();
    session.close();

    let uploads = server.uploads.lock().unwrap().clone();
    assert_eq!(uploads.len(), 1);
    let body = &uploads[0];
    let start = body
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("part headers")
        + 4;
    assert_eq!(&body[start..start + contents.len()], contents.as_slice());
    assert!(body[start + contents.len()..].starts_with(b"\r\n--"));
}
