use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{Json, Router, extract::State, http::HeaderMap, http::StatusCode, routing::post};
use company_profile_sync::model::CompanyProfile;
use company_profile_sync::{ChangeNotifier, HttpChangeNotifier, SyncError};
use serde_json::Value;

#[derive(Clone, Default)]
struct Received {
    calls: Arc<Mutex<Vec<(Option<String>, Option<String>, Value)>>>,
}

async fn accept(
    State(received): State<Received>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    received
        .calls
        .lock()
        .unwrap()
        .push((header("x-api-key"), header("x-request-id"), body));
    StatusCode::OK
}

async fn reject() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server should run");
    });
    format!("http://{addr}/private/resource-changed")
}

#[tokio::test]
async fn posts_changed_and_deleted_events() {
    let received = Received::default();
    let url = serve(
        Router::new()
            .route("/private/resource-changed", post(accept))
            .with_state(received.clone()),
    )
    .await;

    let notifier =
        HttpChangeNotifier::new(url, Some("secret".to_string()), Duration::from_secs(5)).unwrap();

    notifier.notify_changed("ctx-1", "00006400").await.unwrap();
    let mut last_known = CompanyProfile::shell("00006400");
    last_known.company_name = Some("ACME LTD".to_string());
    notifier
        .notify_deleted("ctx-2", "00006400", &last_known)
        .await
        .unwrap();

    let calls = received.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);

    let (api_key, request_id, changed) = &calls[0];
    assert_eq!(api_key.as_deref(), Some("secret"));
    assert_eq!(request_id.as_deref(), Some("ctx-1"));
    assert_eq!(changed["resource_uri"], "/company/00006400");
    assert_eq!(changed["resource_kind"], "company-profile");
    assert_eq!(changed["event"]["type"], "changed");

    let (_, _, deleted) = &calls[1];
    assert_eq!(deleted["event"]["type"], "deleted");
    assert_eq!(deleted["context_id"], "ctx-2");
    assert_eq!(deleted["deleted_data"]["company_name"], "ACME LTD");
}

#[tokio::test]
async fn non_success_status_is_notification_error() {
    let url = serve(Router::new().route("/private/resource-changed", post(reject))).await;
    let notifier = HttpChangeNotifier::new(url, None, Duration::from_secs(5)).unwrap();

    let err = notifier.notify_changed("ctx", "00006400").await.unwrap_err();
    assert!(matches!(err, SyncError::Notification(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn unreachable_endpoint_is_notification_error() {
    let notifier = HttpChangeNotifier::new(
        "http://127.0.0.1:9/private/resource-changed",
        None,
        Duration::from_millis(500),
    )
    .unwrap();

    let err = notifier.notify_changed("ctx", "00006400").await.unwrap_err();
    assert!(matches!(err, SyncError::Notification(_)));
}
