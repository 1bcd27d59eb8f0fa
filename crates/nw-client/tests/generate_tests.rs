//! End-to-end generation against a mocked API and bucket.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nw_client::{
    ApiClient, ClientConfig, ClientError, DocumentGenerator, GenerationBackend, GenerationFailure,
    GenerationState, Notification, Notifier, PollPolicy, QuotaStatus,
};

const KEY: &str = "videos/1700000000000_tutorial.mov";
const STEM: &str = "1700000000000_tutorial";

#[derive(Default)]
struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    fn messages(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.message.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().unwrap().push(notification);
    }
}

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig {
        api_url: server.uri(),
        request_timeout: Duration::from_secs(5),
        upload_timeout: Duration::from_secs(5),
        poll: PollPolicy {
            interval: Duration::from_millis(20),
            max_attempts: 36,
        },
    }
}

fn generator(server: &MockServer, notifier: Arc<RecordingNotifier>) -> DocumentGenerator {
    let client = ApiClient::new(&config(server)).unwrap();
    let poll = config(server).poll;
    DocumentGenerator::new(Arc::new(client), notifier, poll)
}

async fn mount_quota(server: &MockServer, status: u16) {
    let body = if status == 200 {
        json!({"message": "Feature used successfully. Attempt #1", "count": 1})
    } else {
        json!({"message": "Usage limit reached. Please sign up to continue."})
    };
    Mock::given(method("POST"))
        .and(path("/api/use-feature"))
        .respond_with(
            ResponseTemplate::new(status)
                .insert_header(
                    "set-cookie",
                    "sessionId=3f2b8c1e-9d4a-4e7b-8a1c-2b3d4e5f6a7b; Path=/; HttpOnly",
                )
                .set_body_json(body),
        )
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_capability(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/api/get-presigned-url"))
        .and(body_json(json!({"fileName": "tutorial.mov", "fileType": "video/quicktime"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uploadURL": format!("{}/bucket/{}", server.uri(), KEY),
            "key": KEY,
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_end_to_end_success_on_fourth_poll() {
    let server = MockServer::start().await;
    mount_quota(&server, 200).await;
    mount_capability(&server, 1).await;

    Mock::given(method("PUT"))
        .and(path(format!("/bucket/{}", KEY)))
        .and(header("content-type", "video/quicktime"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    // Polls 1-3 find nothing, poll 4 gets a URL
    Mock::given(method("POST"))
        .and(path("/api/get-generated-markdown-url"))
        .and(body_json(json!({"fileName": STEM})))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"message": "Markdown not ready yet."})),
        )
        .up_to_n_times(3)
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/get-generated-markdown-url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "markdownURL": format!("{}/documents/{}.md", server.uri(), STEM),
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/documents/{}.md", STEM)))
        .respond_with(ResponseTemplate::new(200).set_body_string("# Tutorial\n..."))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = Arc::new(RecordingNotifier::default());
    let generator = generator(&server, notifier.clone());
    generator
        .select_bytes("tutorial.mov", None, b"fake recording".to_vec())
        .await;

    let state = generator.generate().await;

    assert_eq!(state, GenerationState::Succeeded);
    assert_eq!(generator.document().await, "# Tutorial\n...");
    assert_eq!(
        notifier.messages(),
        vec![
            "Video uploaded successfully! Video is being processed...",
            "Documentation generated successfully!",
        ]
    );
    // Expectations (no 5th poll) are verified when the server drops
}

#[tokio::test]
async fn test_end_to_end_quota_exceeded() {
    let server = MockServer::start().await;
    mount_quota(&server, 403).await;
    mount_capability(&server, 0).await;

    let notifier = Arc::new(RecordingNotifier::default());
    let generator = generator(&server, notifier.clone());
    generator
        .select_bytes("tutorial.mov", None, b"fake recording".to_vec())
        .await;

    let state = generator.generate().await;

    assert_eq!(state, GenerationState::Failed(GenerationFailure::QuotaExceeded));
    assert_eq!(
        notifier.messages(),
        vec!["You have used the free limit. Please sign up!"]
    );
}

#[tokio::test]
async fn test_capability_error_uses_server_message() {
    let server = MockServer::start().await;
    mount_quota(&server, 200).await;
    Mock::given(method("POST"))
        .and(path("/api/get-presigned-url"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "Missing required fields: fileName or fileType",
            "code": "bad_request",
        })))
        .mount(&server)
        .await;

    let notifier = Arc::new(RecordingNotifier::default());
    let generator = generator(&server, notifier.clone());
    generator
        .select_bytes("tutorial.mov", None, b"x".to_vec())
        .await;

    let state = generator.generate().await;

    assert_eq!(state, GenerationState::Failed(GenerationFailure::CapabilityError));
    assert_eq!(
        notifier.messages(),
        vec!["Missing required fields: fileName or fileType"]
    );
}

#[tokio::test]
async fn test_malformed_capability_is_terminal() {
    let server = MockServer::start().await;
    mount_quota(&server, 200).await;
    Mock::given(method("POST"))
        .and(path("/api/get-presigned-url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"key": KEY})))
        .mount(&server)
        .await;

    let notifier = Arc::new(RecordingNotifier::default());
    let generator = generator(&server, notifier.clone());
    generator
        .select_bytes("tutorial.mov", None, b"x".to_vec())
        .await;

    let state = generator.generate().await;

    assert_eq!(state, GenerationState::Failed(GenerationFailure::CapabilityError));
    assert_eq!(notifier.messages(), vec!["Invalid response from server."]);
}

#[tokio::test]
async fn test_capability_outside_videos_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/get-presigned-url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uploadURL": format!("{}/bucket/documents/x.md", server.uri()),
            "key": "documents/x.md",
        })))
        .mount(&server)
        .await;

    let client = ApiClient::new(&config(&server)).unwrap();
    let err = client
        .acquire_upload("tutorial.mov", "video/quicktime")
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_session_cookie_is_replayed() {
    let server = MockServer::start().await;
    mount_quota(&server, 200).await;
    Mock::given(method("POST"))
        .and(path("/api/get-generated-markdown-url"))
        .and(header(
            "cookie",
            "sessionId=3f2b8c1e-9d4a-4e7b-8a1c-2b3d4e5f6a7b",
        ))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&config(&server)).unwrap();

    assert_eq!(
        client.check_quota().await.unwrap(),
        QuotaStatus::Granted { count: Some(1) }
    );
    assert_eq!(client.acquire_read(STEM).await.unwrap(), None);
}

#[tokio::test]
async fn test_upload_forbidden_status() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/bucket/expired"))
        .respond_with(ResponseTemplate::new(403).set_body_string("<Error>AccessDenied</Error>"))
        .mount(&server)
        .await;

    let client = ApiClient::new(&config(&server)).unwrap();
    let err = client
        .upload(
            &format!("{}/bucket/expired", server.uri()),
            "video/mp4",
            b"x".to_vec(),
        )
        .await
        .unwrap_err();

    assert!(err.is_forbidden());
}

#[tokio::test]
async fn test_fetch_document_failure_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/documents/missing.md"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = ApiClient::new(&config(&server)).unwrap();
    let err = client
        .fetch_document(&format!("{}/documents/missing.md", server.uri()))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(404));
}
