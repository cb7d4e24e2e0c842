use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use shared::domain::ThreadId;
use tokio::{
    net::TcpListener,
    sync::{oneshot, Mutex},
};

use super::*;

#[derive(Debug, Clone)]
struct ReceivedUpload {
    field_name: String,
    filename: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

#[derive(Clone)]
struct ServerState {
    uploads: Arc<Mutex<Option<oneshot::Sender<ReceivedUpload>>>>,
    chats: Arc<Mutex<Option<oneshot::Sender<ChatRequest>>>>,
}

async fn handle_list() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "documents": [
            {"id": "d1", "filename": "invoice.pdf", "size": 2048, "updated_at": 1700000000},
            "legacy notes.txt",
            {"filename": "missing-id.pdf"},
            {"id": "d3", "filename": "readme.md", "preview_text": "# Readme", "url": "/files/d3"}
        ]
    }))
}

async fn handle_upload(
    State(state): State<ServerState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let Ok(Some(field)) = multipart.next_field().await else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"detail": "missing file"})),
        );
    };
    let received = ReceivedUpload {
        field_name: field.name().unwrap_or_default().to_string(),
        filename: field.file_name().unwrap_or_default().to_string(),
        content_type: field.content_type().map(str::to_string),
        bytes: field.bytes().await.map(|b| b.to_vec()).unwrap_or_default(),
    };
    let filename = received.filename.clone();
    let size = received.bytes.len();
    if let Some(tx) = state.uploads.lock().await.take() {
        let _ = tx.send(received);
    }
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "id": "d9",
            "filename": filename,
            "size": size,
            "updated_at": 1700000000
        })),
    )
}

async fn handle_chat(
    State(state): State<ServerState>,
    Json(request): Json<ChatRequest>,
) -> Json<serde_json::Value> {
    let reply = if request.message == "silent" {
        serde_json::json!({})
    } else {
        serde_json::json!({"answer": format!("answer to {}", request.message)})
    };
    if let Some(tx) = state.chats.lock().await.take() {
        let _ = tx.send(request);
    }
    Json(reply)
}

async fn handle_metadata(Path(id): Path<String>) -> impl IntoResponse {
    if id == "d1" {
        (
            StatusCode::OK,
            Json(serde_json::json!({"filename": "invoice.pdf"})),
        )
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"detail": "Document not found"})),
        )
    }
}

async fn spawn_document_server() -> Result<(
    String,
    oneshot::Receiver<ReceivedUpload>,
    oneshot::Receiver<ChatRequest>,
)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (upload_tx, upload_rx) = oneshot::channel();
    let (chat_tx, chat_rx) = oneshot::channel();
    let state = ServerState {
        uploads: Arc::new(Mutex::new(Some(upload_tx))),
        chats: Arc::new(Mutex::new(Some(chat_tx))),
    };
    let app = Router::new()
        .route("/documents", get(handle_list))
        .route("/documents/:id", get(handle_metadata))
        .route("/upload", post(handle_upload))
        .route("/chat", post(handle_chat))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), upload_rx, chat_rx))
}

async fn spawn_failing_server(status: StatusCode, body: &'static str) -> Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new()
        .route("/upload", post(move || async move { (status, body) }))
        .route("/documents", get(move || async move { (status, body) }));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

fn service(server_url: &str) -> HttpDocumentService {
    HttpDocumentService::new(server_url, Duration::from_secs(5)).expect("service")
}

#[tokio::test]
async fn list_documents_keeps_valid_entries_in_order() {
    let (server_url, _uploads, _chats) = spawn_document_server().await.expect("spawn server");
    let docs = service(&server_url)
        .list_documents()
        .await
        .expect("list documents");

    let ids: Vec<&str> = docs.iter().map(|doc| doc.id.as_str()).collect();
    assert_eq!(ids, vec!["d1", "legacy notes.txt", "d3"]);

    assert_eq!(docs[0].size_bytes, 2048);
    assert_eq!(docs[0].updated_at.timestamp(), 1_700_000_000);
    assert_eq!(docs[0].locator, format!("{server_url}/data/invoice.pdf"));
    assert_eq!(
        docs[1].locator,
        format!("{server_url}/data/legacy%20notes.txt")
    );
    assert_eq!(docs[2].preview_text.as_deref(), Some("# Readme"));
    assert_eq!(docs[2].locator, format!("{server_url}/files/d3"));
}

#[tokio::test]
async fn upload_sends_single_multipart_file_field() {
    let (server_url, upload_rx, _chats) = spawn_document_server().await.expect("spawn server");
    let doc = service(&server_url)
        .upload_document(UploadFile {
            filename: "invoice.pdf".to_string(),
            content_type: Some("application/pdf".to_string()),
            bytes: b"%PDF-1.7".to_vec(),
        })
        .await
        .expect("upload");

    let received = upload_rx.await.expect("upload received");
    assert_eq!(received.field_name, "file");
    assert_eq!(received.filename, "invoice.pdf");
    assert_eq!(received.content_type.as_deref(), Some("application/pdf"));
    assert_eq!(received.bytes, b"%PDF-1.7");

    assert_eq!(doc.id.as_str(), "d9");
    assert_eq!(doc.size_bytes, 8);
    // The server omitted the suffix; callers derive it.
    assert!(doc.suffix.is_empty());
    assert_eq!(doc.normalized().suffix, ".pdf");
}

#[tokio::test]
async fn upload_failure_surfaces_server_detail() {
    let server_url = spawn_failing_server(
        StatusCode::UNPROCESSABLE_ENTITY,
        r#"{"detail":"Only PDF files are supported"}"#,
    )
    .await
    .expect("spawn server");

    let err = service(&server_url)
        .upload_document(UploadFile {
            filename: "notes.exe".to_string(),
            content_type: None,
            bytes: vec![1, 2, 3],
        })
        .await
        .expect_err("must fail");
    assert_eq!(err.status(), Some(422));
    assert_eq!(err.user_message(), "Only PDF files are supported");
}

#[tokio::test]
async fn failure_without_detail_reports_http_status() {
    let server_url = spawn_failing_server(StatusCode::BAD_GATEWAY, "upstream down")
        .await
        .expect("spawn server");

    let err = service(&server_url)
        .list_documents()
        .await
        .expect_err("must fail");
    assert_eq!(err.user_message(), "HTTP 502");
}

#[tokio::test]
async fn chat_posts_thread_document_and_message() {
    let (server_url, _uploads, chat_rx) = spawn_document_server().await.expect("spawn server");
    let answer = service(&server_url)
        .send_chat(ChatRequest {
            thread_id: ThreadId::new("doc:d1"),
            document_id: Some(DocumentId::new("d1")),
            message: "total?".to_string(),
        })
        .await
        .expect("chat");

    assert_eq!(answer.as_deref(), Some("answer to total?"));
    let received = chat_rx.await.expect("chat received");
    assert_eq!(received.thread_id.as_str(), "doc:d1");
    assert_eq!(
        received.document_id.as_ref().map(DocumentId::as_str),
        Some("d1")
    );
}

#[tokio::test]
async fn chat_without_answer_field_is_not_an_error() {
    let (server_url, _uploads, _chats) = spawn_document_server().await.expect("spawn server");
    let answer = service(&server_url)
        .send_chat(ChatRequest {
            thread_id: ThreadId::new("4f2a"),
            document_id: None,
            message: "silent".to_string(),
        })
        .await
        .expect("chat");
    assert!(answer.is_none());
}

#[tokio::test]
async fn metadata_lookup_returns_filename_or_detail() {
    let (server_url, _uploads, _chats) = spawn_document_server().await.expect("spawn server");
    let service = service(&server_url);

    let filename = service
        .document_metadata(&DocumentId::new("d1"))
        .await
        .expect("metadata");
    assert_eq!(filename, "invoice.pdf");

    let err = service
        .document_metadata(&DocumentId::new("nope"))
        .await
        .expect_err("unknown id");
    assert_eq!(err.user_message(), "Document not found");
}

#[test]
fn base_url_keeps_path_prefix() {
    let service = service("http://127.0.0.1:9000/api");
    assert_eq!(
        service.document_locator("a b.pdf"),
        "http://127.0.0.1:9000/api/data/a%20b.pdf"
    );
    assert_eq!(service.base_url().as_str(), "http://127.0.0.1:9000/api/");
}

#[test]
fn rejects_unusable_server_url() {
    assert!(matches!(
        HttpDocumentService::new("not a url", Duration::from_secs(1)),
        Err(TransportError::InvalidUrl(_))
    ));
    assert!(matches!(
        HttpDocumentService::new("mailto:someone@example.com", Duration::from_secs(1)),
        Err(TransportError::InvalidUrl(_))
    ));
}

#[test]
fn unreadable_listing_is_empty() {
    assert!(parse_document_list(b"<html>oops</html>").is_empty());
    assert!(parse_document_list(br#"{"status":"ok"}"#).is_empty());
    assert_eq!(parse_document_list(br#"["a.pdf", 42, "b.pdf"]"#).len(), 2);
}
