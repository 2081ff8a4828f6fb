//! HttpTaskClient 集成测试
//!
//! 在进程内启动一个 axum 假后端，覆盖信封归一化、鉴权与轮询全流程

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wecrm::application::ports::{
    NoopProgressSink, PollOutcome, PollTicket, StopAck, SubmitOutcome, SubmitRequest,
    TaskApiError, TaskApiPort, TaskPollerPort, ViewRefreshPort,
};
use wecrm::domain::feature::{ClearScope, TaskFeature, WecomCredentials};
use wecrm::domain::task::{TaskId, TaskOutcome, TaskStatus};
use wecrm::infrastructure::{
    HttpTaskClient, HttpTaskClientConfig, InMemorySurfaceRegistry, TaskPoller, TaskPollerConfig,
};

const TOKEN: &str = "test-token";

#[derive(Default)]
struct Backend {
    status_calls: AtomicU32,
    last_body: Mutex<Option<Value>>,
    stops: Mutex<Vec<String>>,
    upload: Mutex<Option<Upload>>,
}

#[derive(Debug, Clone)]
struct Upload {
    file_name: String,
    size: usize,
    incremental: Option<String>,
    authorization: Option<String>,
}

type Shared = Arc<Backend>;

#[derive(Deserialize)]
struct TokenQuery {
    api_token: Option<String>,
}

#[derive(Deserialize)]
struct ImportQuery {
    incremental: Option<String>,
}

fn check_token(query: &TokenQuery) -> Result<(), Response> {
    if query.api_token.as_deref() == Some(TOKEN) {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, Json(json!({"detail": "Invalid token"}))).into_response())
    }
}

async fn sync_customers(
    State(backend): State<Shared>,
    Query(query): Query<TokenQuery>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = check_token(&query) {
        return resp;
    }
    *backend.last_body.lock().unwrap() = Some(body);
    Json(json!({
        "success": true,
        "message": "同步任务已启动 (增量同步)",
        "task_id": "t1",
        "task_type": "incremental"
    }))
    .into_response()
}

async fn customer_status(
    State(backend): State<Shared>,
    Path(task_id): Path<String>,
    Query(query): Query<TokenQuery>,
) -> Response {
    if let Err(resp) = check_token(&query) {
        return resp;
    }

    let body = match task_id.as_str() {
        "t1" => {
            let n = backend.status_calls.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                json!({"success": true, "data": {
                    "task_id": "t1", "status": "running", "progress": 40.0,
                    "total_count": 30, "processed_count": 12, "added_count": 2,
                    "updated_count": 10, "failed_count": 0, "error_message": null,
                    "duration": 3.1
                }})
            } else {
                json!({"success": true, "data": {
                    "task_id": "t1", "status": "completed", "progress": 100,
                    "total_count": 30, "processed_count": 30, "added_count": 5,
                    "updated_count": 25, "failed_count": 0, "error_message": null,
                    "duration": 12.4
                }})
            }
        }
        "legacy" => json!({"success": true, "data": {
            "task_id": "legacy", "status": "failed", "progress": 55,
            "processed_count": 40, "added_count": 3, "updated_count": 12,
            "error_message": "用户手动停止"
        }}),
        _ => json!({"success": false, "message": "任务不存在"}),
    };
    Json(body).into_response()
}

async fn group_tag_status(Path(_task_id): Path<String>) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"detail": "任务不存在"}))).into_response()
}

async fn cancel_customer_groups(
    State(backend): State<Shared>,
    Path(task_id): Path<String>,
) -> Response {
    backend.stops.lock().unwrap().push(task_id);
    Json(json!({"success": true, "message": "任务已取消"})).into_response()
}

async fn sync_employees() -> Response {
    Json(json!({"success": true, "message": "同步了 12 名员工"})).into_response()
}

async fn import_excel(
    State(backend): State<Shared>,
    Path(_source): Path<String>,
    Query(query): Query<ImportQuery>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let mut upload = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.unwrap_or_default();
            upload = Some(Upload {
                file_name,
                size: bytes.len(),
                incremental: query.incremental.clone(),
                authorization: headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string),
            });
        }
    }
    *backend.upload.lock().unwrap() = upload;
    Json(json!({"code": 0, "message": "导入成功：新增 3 条"})).into_response()
}

async fn batch_clear(State(backend): State<Shared>, Json(body): Json<Value>) -> Response {
    *backend.last_body.lock().unwrap() = Some(body);
    Json(json!({"code": 1, "message": "数据源不存在"})).into_response()
}

async fn list_customers() -> Response {
    Json(json!({"success": true, "data": {"total": 42, "list": []}})).into_response()
}

async fn spawn_backend() -> (String, Shared) {
    let backend: Shared = Arc::new(Backend::default());

    let app = Router::new()
        .route("/api/sync/customers", post(sync_customers))
        .route("/api/sync/status/:task_id", get(customer_status))
        .route("/api/sync/group-tags/status/:task_id", get(group_tag_status))
        .route(
            "/api/sync/customer-groups/cancel/:task_id",
            post(cancel_customer_groups),
        )
        .route("/api/sync/employees", post(sync_employees))
        .route("/api/data-source/:source/import-excel", post(import_excel))
        .route("/api/data-source/:source/batch-clear", post(batch_clear))
        .route("/api/customers", get(list_customers))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), backend)
}

fn client(base_url: &str) -> HttpTaskClient {
    HttpTaskClient::new(
        HttpTaskClientConfig::new(base_url)
            .with_timeout(5)
            .with_api_token(TOKEN)
            .with_session_token("jwt-session"),
    )
    .unwrap()
}

fn customers() -> TaskFeature {
    TaskFeature::CustomerSync { full: false }
}

fn id(s: &str) -> TaskId {
    TaskId::new(s).unwrap()
}

#[tokio::test]
async fn submit_customer_sync_returns_task_and_sends_credentials() {
    let (url, backend) = spawn_backend().await;
    let credentials = WecomCredentials {
        corpid: "ww-test".to_string(),
        contact_secret: "secret".to_string(),
        ..Default::default()
    };

    let outcome = client(&url)
        .submit(
            &TaskFeature::CustomerSync { full: true },
            &SubmitRequest {
                credentials: Some(credentials),
            },
        )
        .await
        .unwrap();

    match outcome {
        SubmitOutcome::Accepted { task_id, .. } => assert_eq!(task_id, id("t1")),
        other => panic!("unexpected outcome: {:?}", other),
    }
    let body = backend.last_body.lock().unwrap().clone().unwrap();
    assert_eq!(body["force"], json!(true));
    assert_eq!(body["config"]["corpid"], json!("ww-test"));
}

#[tokio::test]
async fn wrong_token_is_http_error() {
    let (url, _) = spawn_backend().await;
    let client = HttpTaskClient::new(HttpTaskClientConfig::new(&url).with_api_token("nope")).unwrap();

    let result = client.submit(&customers(), &SubmitRequest::default()).await;
    match result {
        Err(TaskApiError::Http { status, body }) => {
            assert_eq!(status, 401);
            assert_eq!(body, "Invalid token");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn poller_follows_task_to_completion() {
    let (url, _) = spawn_backend().await;
    let api = Arc::new(client(&url));
    let registry = Arc::new(InMemorySurfaceRegistry::new());
    let poller = TaskPoller::new(
        TaskPollerConfig {
            interval: Duration::from_millis(20),
            max_duration: Some(Duration::from_secs(5)),
            max_consecutive_failures: 0,
        },
        api,
        Arc::new(NoopProgressSink),
    );

    let ticket = PollTicket::attach(registry, "customers", id("t1"));
    let report = poller.watch(&customers(), ticket).await;

    assert_eq!(report.outcome, PollOutcome::Finished(TaskOutcome::Completed));
    assert_eq!(report.summary(), "同步完成：新增5个，更新25个，耗时12秒");
    assert!(report.last_snapshot.unwrap().counters.is_balanced());
}

#[tokio::test]
async fn legacy_stop_is_normalized() {
    let (url, _) = spawn_backend().await;
    let snapshot = client(&url)
        .fetch_status(&customers(), &id("legacy"))
        .await
        .unwrap();

    assert_eq!(snapshot.status, TaskStatus::Stopped);
    assert_eq!(snapshot.counters.processed_count, 40);
}

#[tokio::test]
async fn unknown_task_is_rejected() {
    let (url, _) = spawn_backend().await;
    let result = client(&url).fetch_status(&customers(), &id("gone")).await;
    assert!(matches!(result, Err(TaskApiError::Rejected(ref m)) if m == "任务不存在"));
}

#[tokio::test]
async fn group_tag_status_404_is_transient() {
    let (url, _) = spawn_backend().await;
    let result = client(&url)
        .fetch_status(&TaskFeature::GroupTagSync, &id("sync_group_tags_1"))
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, TaskApiError::Http { status: 404, .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn customer_group_stop_uses_cancel_endpoint() {
    let (url, backend) = spawn_backend().await;
    let ack = client(&url)
        .request_stop(&TaskFeature::CustomerGroupSync, &id("g1"))
        .await
        .unwrap();

    assert_eq!(
        ack,
        StopAck {
            message: Some("任务已取消".to_string())
        }
    );
    assert_eq!(*backend.stops.lock().unwrap(), vec!["g1".to_string()]);
}

#[tokio::test]
async fn inline_job_finishes_immediately() {
    let (url, _) = spawn_backend().await;
    let outcome = client(&url)
        .submit(&TaskFeature::EmployeeSync, &SubmitRequest::default())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        SubmitOutcome::Finished {
            message: Some("同步了 12 名员工".to_string())
        }
    );
}

#[tokio::test]
async fn excel_import_uploads_multipart_with_bearer() {
    let (url, backend) = spawn_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("customers.xlsx");
    std::fs::write(&file, b"fake-xlsx-bytes").unwrap();

    let outcome = client(&url)
        .submit(
            &TaskFeature::ExcelImport {
                source_id: "7".to_string(),
                file,
                incremental: true,
            },
            &SubmitRequest::default(),
        )
        .await
        .unwrap();

    assert_eq!(
        outcome,
        SubmitOutcome::Finished {
            message: Some("导入成功：新增 3 条".to_string())
        }
    );
    let upload = backend.upload.lock().unwrap().clone().unwrap();
    assert_eq!(upload.file_name, "customers.xlsx");
    assert_eq!(upload.size, 15);
    assert_eq!(upload.incremental.as_deref(), Some("true"));
    assert_eq!(upload.authorization.as_deref(), Some("Bearer jwt-session"));
}

#[tokio::test]
async fn excel_import_missing_file_is_invalid_input() {
    let (url, backend) = spawn_backend().await;
    let dir = tempfile::tempdir().unwrap();

    let result = client(&url)
        .submit(
            &TaskFeature::ExcelImport {
                source_id: "7".to_string(),
                file: dir.path().join("missing.xlsx"),
                incremental: false,
            },
            &SubmitRequest::default(),
        )
        .await;

    assert!(matches!(result, Err(TaskApiError::InvalidInput(ref m)) if m.contains("missing.xlsx")));
    assert!(backend.upload.lock().unwrap().is_none());
}

#[tokio::test]
async fn batch_clear_rejection_carries_message() {
    let (url, backend) = spawn_backend().await;
    let result = client(&url)
        .submit(
            &TaskFeature::BatchClear {
                source_id: "7".to_string(),
                scope: ClearScope::OlderThanDays(30),
            },
            &SubmitRequest::default(),
        )
        .await;

    assert!(matches!(result, Err(TaskApiError::Rejected(ref m)) if m == "数据源不存在"));
    let body = backend.last_body.lock().unwrap().clone().unwrap();
    assert_eq!(body, json!({"clear_type": "by_time", "days": 30}));
}

#[tokio::test]
async fn refresh_reads_total() {
    let (url, _) = spawn_backend().await;
    let refreshed = client(&url).refresh(&customers()).await.unwrap();
    assert_eq!(refreshed.total, Some(42));
}
