//! End-to-end tests for the client surface through an in-memory transport
//!
//! These tests drive the public operations exactly as an embedder would,
//! substituting the network with a scripted transport that records every
//! call it receives.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use candid::Encode;
use serde_json::json;
use tokio::sync::Mutex;

use taggr_client::codec::{Attachment, PurchaseReply, SubmitReply};
use taggr_client::config::DEFAULT_BUCKET_URL_TEMPLATE;
use taggr_client::transport::{
    CallStatus, QueryResponse, RequestId, Result as TransportResult, Transport,
};
use taggr_client::{
    CaptureSubmission, EndpointConfig, PollConfig, TaggrClient, TaggrError, TextPost,
};

/// Scripted transport: replies are popped in order, every call is recorded.
struct MockTransport {
    calls: Mutex<Vec<String>>,
    query_responses: Mutex<VecDeque<QueryResponse>>,
    statuses: Mutex<VecDeque<CallStatus>>,
    submitted: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MockTransport {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            query_responses: Mutex::new(VecDeque::new()),
            statuses: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Transport whose next query replies with the given JSON value.
    fn replying_json(value: serde_json::Value) -> Self {
        let transport = Self::new();
        transport
            .query_responses
            .try_lock()
            .unwrap()
            .push_back(QueryResponse::Replied {
                arg: value.to_string().into_bytes(),
            });
        transport
    }

    /// Transport whose next update finalizes with the given reply bytes.
    fn finalizing(reply: Vec<u8>) -> Self {
        let transport = Self::new();
        transport
            .statuses
            .try_lock()
            .unwrap()
            .push_back(CallStatus::Replied { arg: reply });
        transport
    }

    async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    async fn submitted_args(&self) -> Vec<(String, Vec<u8>)> {
        self.submitted.lock().await.clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn query(&self, method: &str, _arg: &[u8]) -> TransportResult<QueryResponse> {
        self.calls.lock().await.push(format!("query:{method}"));
        Ok(self
            .query_responses
            .lock()
            .await
            .pop_front()
            .expect("unexpected query"))
    }

    async fn submit(&self, method: &str, arg: &[u8]) -> TransportResult<RequestId> {
        self.calls.lock().await.push(format!("submit:{method}"));
        self.submitted
            .lock()
            .await
            .push((method.to_string(), arg.to_vec()));
        Ok(RequestId([0xAB; 32]))
    }

    async fn request_status(&self, _request_id: &RequestId) -> TransportResult<CallStatus> {
        self.calls.lock().await.push("read_state".to_string());
        Ok(self
            .statuses
            .lock()
            .await
            .pop_front()
            .unwrap_or(CallStatus::Processing))
    }

    async fn bootstrap_trust(&self) -> TransportResult<()> {
        self.calls.lock().await.push("bootstrap".to_string());
        Ok(())
    }
}

fn endpoint_config() -> EndpointConfig {
    EndpointConfig::new("https://icp0.io", "aaaaa-aa", DEFAULT_BUCKET_URL_TEMPLATE)
}

fn fallback_config() -> EndpointConfig {
    EndpointConfig {
        fallback_mode: true,
        ..endpoint_config()
    }
}

fn client_with(transport: &Arc<MockTransport>, config: EndpointConfig) -> TaggrClient {
    TaggrClient::with_transport(config, Arc::clone(transport) as Arc<dyn Transport>)
        .with_poll_config(PollConfig {
            interval: Duration::from_millis(1),
            timeout: Duration::from_secs(1),
        })
}

fn sample_entry() -> serde_json::Value {
    json!([
        {
            "id": 12,
            "body": "Captured URL: https://e.example/a",
            "user": 3,
            "tags": ["gyotaku"],
            "realm": null,
            "files": { "capture@bucketA": [10, 200], "other@bucketB": [0, 5] }
        },
        {
            "author_name": "stalwart",
            "author_filters": { "age_days": 1, "safe": true, "balance": 2, "num_followers": 3 },
            "viewer_blocked": false,
            "realm_color": null,
            "nsfw": false,
            "max_downvotes_reached": false
        }
    ])
}

// ==================== Read operations ====================

#[tokio::test]
async fn test_personal_feed_validates_entries() {
    let transport = Arc::new(MockTransport::replying_json(json!([sample_entry()])));
    let client = client_with(&transport, endpoint_config());

    let feed = client.personal_feed("taggr", 0, 0).await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].0.id, 12);
    assert_eq!(feed[0].1.author_name, "stalwart");
    assert_eq!(transport.calls.lock().await[0], "query:personal_feed");
}

#[tokio::test]
async fn test_query_rejection_propagates() {
    let transport = Arc::new(MockTransport::new());
    transport
        .query_responses
        .lock()
        .await
        .push_back(QueryResponse::Rejected {
            code: 3,
            message: "canister stopped".to_string(),
        });
    let client = client_with(&transport, endpoint_config());

    match client.thread(9).await {
        Err(TaggrError::Protocol { method, message }) => {
            assert_eq!(method, "thread");
            assert_eq!(message, "canister stopped");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_reply_is_a_protocol_error() {
    let transport = Arc::new(MockTransport::new());
    transport
        .query_responses
        .lock()
        .await
        .push_back(QueryResponse::Replied {
            arg: b"not json at all".to_vec(),
        });
    let client = client_with(&transport, endpoint_config());

    match client.thread(9).await {
        Err(TaggrError::Protocol { message, .. }) => assert_eq!(message, "malformed reply"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_user_profile_null_means_no_such_user() {
    let transport = Arc::new(MockTransport::replying_json(json!(null)));
    let client = client_with(&transport, endpoint_config());

    assert!(client.user_profile("taggr", Some("ghost")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_post_summary_takes_first_entry_or_none() {
    let transport = Arc::new(MockTransport::replying_json(json!([sample_entry()])));
    let client = client_with(&transport, endpoint_config());
    let summary = client.post_summary(12).await.unwrap().unwrap();
    assert_eq!(summary.0.id, 12);

    let transport = Arc::new(MockTransport::replying_json(json!([])));
    let client = client_with(&transport, endpoint_config());
    assert!(client.post_summary(12).await.unwrap().is_none());
}

#[tokio::test]
async fn test_invalid_entry_fails_the_read() {
    let transport = Arc::new(MockTransport::replying_json(json!([[{ "id": "12" }, {}]])));
    let client = client_with(&transport, endpoint_config());

    match client.personal_feed("taggr", 0, 0).await {
        Err(TaggrError::Validation(e)) => assert_eq!(e.field, "post.id"),
        other => panic!("unexpected result: {other:?}"),
    }
}

// ==================== Mutating operations ====================

#[tokio::test]
async fn test_text_post_decodes_ok_reply() {
    let transport = Arc::new(MockTransport::finalizing(
        Encode!(&SubmitReply::Ok(42)).unwrap(),
    ));
    let client = client_with(&transport, endpoint_config());

    let result = client
        .submit_text_post(TextPost {
            body: "hello".to_string(),
            ..Default::default()
        })
        .await;
    assert!(result.success);
    assert_eq!(result.post_id, Some(42));
    assert!(!result.mocked);
    assert_eq!(
        transport.submitted_args().await[0].0,
        "add_post".to_string()
    );
}

#[tokio::test]
async fn test_text_post_decodes_err_reply() {
    let transport = Arc::new(MockTransport::finalizing(
        Encode!(&SubmitReply::Err("blocked".to_string())).unwrap(),
    ));
    let client = client_with(&transport, endpoint_config());

    let result = client
        .submit_text_post(TextPost {
            body: "hello".to_string(),
            ..Default::default()
        })
        .await;
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("blocked"));
}

#[tokio::test]
async fn test_empty_body_rejected_before_any_call() {
    let transport = Arc::new(MockTransport::new());
    let client = client_with(&transport, endpoint_config());

    let result = client.submit_text_post(TextPost::default()).await;
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("body empty"));
    assert_eq!(transport.call_count().await, 0);
}

#[tokio::test]
async fn test_fallback_mode_mocks_capture_submission() {
    let transport = Arc::new(MockTransport::new());
    let client = client_with(&transport, fallback_config());

    let result = client
        .submit_capture(CaptureSubmission {
            url: "https://e.example/a".to_string(),
            html: "<p>x</p>".to_string(),
            ..Default::default()
        })
        .await;
    assert!(result.success);
    assert_eq!(result.post_id, None);
    assert!(result.mocked);
    assert_eq!(transport.call_count().await, 0);
}

#[tokio::test]
async fn test_empty_html_rejected_before_encoding() {
    let transport = Arc::new(MockTransport::new());
    let client = client_with(&transport, endpoint_config());

    let result = client
        .submit_capture(CaptureSubmission {
            url: "https://e.example/a".to_string(),
            html: String::new(),
            ..Default::default()
        })
        .await;
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("content empty"));
    assert_eq!(transport.call_count().await, 0);
}

#[tokio::test]
async fn test_capture_submission_encodes_attachment_and_body() {
    let transport = Arc::new(MockTransport::finalizing(
        Encode!(&SubmitReply::Ok(7)).unwrap(),
    ));
    let client = client_with(&transport, endpoint_config());

    let result = client
        .submit_capture(CaptureSubmission {
            url: "https://e.example/a".to_string(),
            html: "<p>x</p>".to_string(),
            notes: Some("mirrored".to_string()),
            realm: Some("gyotaku".to_string()),
            ..Default::default()
        })
        .await;
    assert!(result.success);
    assert_eq!(result.post_id, Some(7));

    let submitted = transport.submitted_args().await;
    let (body, attachments, parent, realm, extension) = candid::decode_args::<(
        String,
        Vec<Attachment>,
        Option<u64>,
        Option<String>,
        Option<Vec<u8>>,
    )>(&submitted[0].1)
    .unwrap();
    assert!(body.starts_with("Captured URL: https://e.example/a"));
    assert!(body.contains("Notes: mirrored"));
    assert_eq!(attachments, vec![("capture".to_string(), b"<p>x</p>".to_vec())]);
    assert_eq!(parent, None);
    assert_eq!(realm.as_deref(), Some("gyotaku"));
    assert_eq!(extension, None);
}

#[tokio::test]
async fn test_paid_capture_carries_access_extension() {
    let transport = Arc::new(MockTransport::finalizing(
        Encode!(&SubmitReply::Ok(7)).unwrap(),
    ));
    let client = client_with(&transport, endpoint_config());

    client
        .submit_capture(CaptureSubmission {
            url: "https://e.example/a".to_string(),
            html: "<p>x</p>".to_string(),
            visibility: Some(taggr_client::Visibility::Paid),
            price: Some(25),
            ..Default::default()
        })
        .await;

    let submitted = transport.submitted_args().await;
    let (_, _, _, _, extension) = candid::decode_args::<(
        String,
        Vec<Attachment>,
        Option<u64>,
        Option<String>,
        Option<Vec<u8>>,
    )>(&submitted[0].1)
    .unwrap();
    let access: serde_json::Value = serde_json::from_slice(&extension.unwrap()).unwrap();
    assert_eq!(access["visibility"], "paid");
    assert_eq!(access["price"], 25);
}

#[tokio::test]
async fn test_zero_length_reply_is_success_with_unknown_id() {
    let transport = Arc::new(MockTransport::new());
    transport.statuses.lock().await.push_back(CallStatus::Done);
    let client = client_with(&transport, endpoint_config());

    let result = client
        .submit_text_post(TextPost {
            body: "hello".to_string(),
            ..Default::default()
        })
        .await;
    assert!(result.success);
    assert_eq!(result.post_id, None);
}

#[tokio::test]
async fn test_update_rejection_becomes_uniform_failure() {
    let transport = Arc::new(MockTransport::new());
    transport
        .statuses
        .lock()
        .await
        .push_back(CallStatus::Rejected {
            code: 4,
            message: "rate limited".to_string(),
        });
    let client = client_with(&transport, endpoint_config());

    let result = client
        .submit_text_post(TextPost {
            body: "hello".to_string(),
            ..Default::default()
        })
        .await;
    assert!(!result.success);
    assert!(result.error.unwrap().contains("rate limited"));
}

#[tokio::test]
async fn test_polling_timeout_surfaces_as_failure() {
    // The mock never finalizes; a zero timeout exhausts the loop without
    // sleeping.
    let transport = Arc::new(MockTransport::new());
    let client = TaggrClient::with_transport(
        endpoint_config(),
        Arc::clone(&transport) as Arc<dyn Transport>,
    )
    .with_poll_config(PollConfig {
        interval: Duration::from_millis(1),
        timeout: Duration::ZERO,
    });

    let result = client
        .submit_text_post(TextPost {
            body: "hello".to_string(),
            ..Default::default()
        })
        .await;
    assert!(!result.success);
    assert!(result.error.unwrap().contains("polling timeout"));
}

#[tokio::test]
async fn test_purchase_refused_in_fallback_mode() {
    let transport = Arc::new(MockTransport::new());
    let client = client_with(&transport, fallback_config());

    let result = client.purchase_post(42).await;
    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("purchases unavailable without a configured endpoint")
    );
    assert!(result.mocked);
    assert_eq!(transport.call_count().await, 0);
}

#[tokio::test]
async fn test_purchase_decodes_unit_ok() {
    let transport = Arc::new(MockTransport::finalizing(Encode!(&PurchaseReply::Ok).unwrap()));
    let client = client_with(&transport, endpoint_config());

    let result = client.purchase_post(42).await;
    assert!(result.success);
    assert_eq!(result.post_id, Some(42));
    assert_eq!(
        transport.submitted_args().await[0].0,
        "purchase_post".to_string()
    );
}

// ==================== Capture content ====================

#[tokio::test]
async fn test_capture_content_falls_back_without_descriptor() {
    let transport = Arc::new(MockTransport::replying_json(json!(null)));
    let client = client_with(&transport, endpoint_config());

    let content = client.capture_content(9000u64).await;
    assert!(content.mocked);
    assert!(content.html.contains("#9000"));
    assert_eq!(transport.calls.lock().await[0], "query:capture_descriptor");
}

#[tokio::test]
async fn test_capture_content_from_post_without_capture_file() {
    let transport = Arc::new(MockTransport::replying_json(json!([sample_entry()])));
    let client = client_with(&transport, endpoint_config());

    let mut summary = client.post_summary(12).await.unwrap().unwrap();
    summary.0.files.clear();

    let content = client.capture_content(&summary.0).await;
    assert!(content.mocked);
    assert!(content.html.contains("#12"));
    // Resolving from the post itself makes no descriptor query.
    assert_eq!(transport.call_count().await, 1);
}
