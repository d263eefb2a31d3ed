//! Client behaviour against a local stand-in server.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use studio_core::retry::{PollPolicy, RetryPolicy};
use studio_providers::{
    ChatRequest, ClipCraftClient, DashScopeChatClient, DashScopeImageClient,
    DashScopeSpeechClient, ImageGenerator, ObjectStore, ProviderError, RenderJobStatus,
    SpeechGenerator, SupabaseStorageClient, TextGenerator, VideoRenderer, VideoSynthesizer,
    WanClient, WanRequest, WanTaskStatus,
};

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
}

fn fast_poll(max: u32) -> PollPolicy {
    PollPolicy {
        interval: Duration::from_millis(5),
        max_attempts: Some(max),
    }
}

// -- image --

#[derive(Clone, Default)]
struct ImageServer {
    submits: Arc<AtomicU32>,
    polls: Arc<AtomicU32>,
}

fn image_app(server: ImageServer, final_status: &'static str) -> Router {
    Router::new()
        .route(
            "/services/aigc/text2image/image-synthesis",
            post(
                |State(s): State<ImageServer>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    assert_eq!(headers["x-dashscope-async"], "enable");
                    assert_eq!(body["model"], "qwen-image-plus");
                    assert_eq!(body["parameters"]["size"], "928*1664");
                    let n = s.submits.fetch_add(1, Ordering::SeqCst);
                    Json(json!({"output": {"task_id": format!("task-{n}")}}))
                },
            ),
        )
        .route(
            "/tasks/{id}",
            get(move |State(s): State<ImageServer>, Path(_id): Path<String>| async move {
                let n = s.polls.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Json(json!({"output": {"task_status": "RUNNING"}}))
                } else {
                    Json(json!({"output": {
                        "task_status": final_status,
                        "results": [{"url": "https://cdn/img.png"}]
                    }}))
                }
            }),
        )
        .with_state(server)
}

#[tokio::test]
async fn image_submit_then_poll_until_succeeded() {
    let server = ImageServer::default();
    let base = spawn(image_app(server.clone(), "SUCCEEDED")).await;
    let client = DashScopeImageClient::new(base, "key").with_poll_policy(fast_poll(5));

    let url = client.generate_image("A lighthouse", "anime").await.unwrap();

    assert_eq!(url, "https://cdn/img.png");
    assert_eq!(server.submits.load(Ordering::SeqCst), 1);
    assert_eq!(server.polls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failed_image_task_is_retried_with_a_fresh_submission() {
    let server = ImageServer::default();
    let base = spawn(image_app(server.clone(), "FAILED")).await;
    let client = DashScopeImageClient::new(base, "key")
        .with_poll_policy(fast_poll(5))
        .with_retry_policy(RetryPolicy {
            max_attempts: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
            multiplier: 1.0,
        });

    let err = client.generate_image("A lighthouse", "anime").await.unwrap_err();

    assert_matches!(err, ProviderError::GenerationFailed(msg) if msg == "Image generation task failed");
    assert_eq!(server.submits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn image_poll_budget_is_enforced() {
    let app = Router::new()
        .route(
            "/services/aigc/text2image/image-synthesis",
            post(|| async { Json(json!({"output": {"task_id": "t"}})) }),
        )
        .route(
            "/tasks/{id}",
            get(|| async { Json(json!({"output": {"task_status": "PENDING"}})) }),
        );
    let base = spawn(app).await;
    let client = DashScopeImageClient::new(base, "key")
        .with_poll_policy(fast_poll(3))
        .with_retry_policy(RetryPolicy::once());

    let err = client.generate_image("p", "anime").await.unwrap_err();
    assert_matches!(err, ProviderError::GenerationTimeout { attempts: 3 });
}

// -- chat --

#[tokio::test]
async fn chat_http_errors_keep_status_and_body() {
    let app = Router::new().route(
        "/chat/completions",
        post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
    );
    let base = spawn(app).await;
    let client = DashScopeChatClient::new(base, "key");

    let err = client.chat(ChatRequest::new("sys", "user")).await.unwrap_err();
    assert_matches!(err, ProviderError::Http { status: 429, body } if body == "slow down");
}

#[tokio::test]
async fn chat_sends_bearer_and_returns_content() {
    let app = Router::new().route(
        "/chat/completions",
        post(|headers: HeaderMap, Json(body): Json<Value>| async move {
            assert_eq!(headers["authorization"], "Bearer key");
            assert_eq!(body["messages"][0]["role"], "system");
            Json(json!({
                "choices": [{"message": {"content": "hello"}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4}
            }))
        }),
    );
    let base = spawn(app).await;
    let client = DashScopeChatClient::new(base, "key");

    let completion = client.chat(ChatRequest::new("sys", "user")).await.unwrap();
    assert_eq!(completion.content, "hello");
    assert_eq!(completion.usage.map(|u| u.total_tokens), Some(4));
}

// -- speech --

#[tokio::test]
async fn speech_returns_audio_url() {
    let app = Router::new().route(
        "/services/aigc/multimodal-generation/generation",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["parameters"]["voice"], "Lucia");
            assert_eq!(body["input"]["text"], "Hola");
            Json(json!({"output": {"audio": {"url": "https://cdn/a.mp3"}}}))
        }),
    );
    let base = spawn(app).await;
    let client = DashScopeSpeechClient::new(base, "key");

    assert_eq!(client.generate_audio("Hola").await.unwrap(), "https://cdn/a.mp3");
}

// -- wan --

#[tokio::test]
async fn wan_submit_and_status() {
    let app = Router::new()
        .route(
            "/services/aigc/video-generation/video-synthesis",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["input"]["audio_url"], "https://cdn/a.mp3");
                Json(json!({"output": {"task_id": "wan-1", "task_status": "PENDING"}}))
            }),
        )
        .route(
            "/tasks/{id}",
            get(|Path(id): Path<String>| async move {
                assert_eq!(id, "wan-1");
                Json(json!({"output": {"task_status": "SUCCEEDED", "video_url": "https://cdn/v.mp4"}}))
            }),
        );
    let base = spawn(app).await;
    let client = WanClient::new(base, "key");

    let request = WanRequest::new("storm").audio_url(Some("https://cdn/a.mp3".to_string()));
    let task_id = client.submit(&request).await.unwrap();
    assert_eq!(task_id, "wan-1");
    assert_eq!(
        client.task_status(&task_id).await.unwrap(),
        WanTaskStatus::Completed {
            video_url: "https://cdn/v.mp4".to_string()
        }
    );
}

// -- clipcraft --

#[tokio::test]
async fn clipcraft_status_and_relative_download() {
    let app = Router::new()
        .route(
            "/status/{job}",
            get(|| async {
                Json(json!({"status": "completed", "progress": 100, "output_url": "/files/out.mp4"}))
            }),
        )
        .route("/files/out.mp4", get(|| async { vec![1u8, 2, 3] }));
    let base = spawn(app).await;
    let client = ClipCraftClient::new(base);

    let status = client.status("job-9").await.unwrap();
    assert_eq!(status.status, RenderJobStatus::Completed);
    let bytes = client
        .download(status.output_url.as_deref().unwrap())
        .await
        .unwrap();
    assert_eq!(bytes, vec![1, 2, 3]);
}

#[tokio::test]
async fn clipcraft_submit_requires_job_id() {
    let app = Router::new().route("/generate", post(|| async { Json(json!({})) }));
    let base = spawn(app).await;
    let client = ClipCraftClient::new(base);

    assert_matches!(
        client.submit(&[]).await,
        Err(ProviderError::MalformedResponse(_))
    );
}

// -- storage --

#[tokio::test]
async fn storage_upload_and_remove_prefix() {
    let app = Router::new()
        .route(
            "/storage/v1/object/{bucket}/{*key}",
            post(|headers: HeaderMap, Path((bucket, key)): Path<(String, String)>| async move {
                assert_eq!(headers["x-upsert"], "true");
                assert_eq!(headers["content-type"], "image/png");
                assert_eq!(bucket, "story-images");
                assert_eq!(key, "5/segment_0_1.png");
                Json(json!({"Key": "ok"}))
            }),
        )
        .route(
            "/storage/v1/object/list/{bucket}",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["prefix"], "5/");
                Json(json!([{"name": "a.png"}, {"name": "b.png"}]))
            }),
        )
        .route(
            "/storage/v1/object/{bucket}",
            axum::routing::delete(|Json(body): Json<Value>| async move {
                assert_eq!(body["prefixes"], json!(["5/a.png", "5/b.png"]));
                Json(json!([]))
            }),
        );
    let base = spawn(app).await;
    let client = SupabaseStorageClient::new(base.clone(), "service");

    let url = client
        .upload("story-images", "5/segment_0_1.png", vec![0u8; 4], "image/png")
        .await
        .unwrap();
    assert_eq!(
        url,
        format!("{base}/storage/v1/object/public/story-images/5/segment_0_1.png")
    );

    assert_eq!(client.remove_prefix("story-images", "5/").await.unwrap(), 2);
}
