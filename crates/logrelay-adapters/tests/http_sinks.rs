use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use logrelay_adapters::{Adapter, LogstashAdapter, RollbarAdapter};
use logrelay_bus::{Bus, MemoryBus};
use logrelay_core::subject::ADAPTER_PATTERNS;
use logrelay_core::{LogRecord, LogstashConfig, RollbarConfig};
use logrelay_security::{Redactor, SecretDirectory, StaticSecretSource};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Local HTTP endpoint recording every JSON body posted to it.
async fn capture_server() -> (u16, mpsc::UnboundedReceiver<Value>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let app = Router::new()
        .route("/", post(capture))
        .route("/api/1/item/", post(capture))
        .with_state(tx);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (port, rx)
}

async fn capture(
    State(tx): State<mpsc::UnboundedSender<Value>>,
    Json(body): Json<Value>,
) -> StatusCode {
    let _ = tx.send(body);
    StatusCode::OK
}

fn redactor() -> Redactor {
    let source = Arc::new(StaticSecretSource::new(vec![]));
    Redactor::new(Arc::new(SecretDirectory::new(source)))
}

async fn next_body(rx: &mut mpsc::UnboundedReceiver<Value>) -> Value {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no request received")
        .expect("capture server stopped")
}

#[tokio::test]
async fn test_logstash_probe_and_delivery() {
    let (port, mut bodies) = capture_server().await;
    let bus = MemoryBus::new();
    let mut adapter = LogstashAdapter::new(LogstashConfig {
        hostname: "127.0.0.1".to_string(),
        port,
        timeout: 0,
    })
    .unwrap();

    adapter
        .manage(Arc::new(bus.clone()), &ADAPTER_PATTERNS, redactor())
        .await
        .unwrap();
    assert_eq!(next_body(&mut bodies).await, serde_json::json!({"service": "initial"}));

    bus.publish("service.create", br#"{"secret":"s3cr3t"}"#.to_vec())
        .await
        .unwrap();
    let shipped = next_body(&mut bodies).await;
    assert_eq!(shipped["subject"], "service.create");
    assert_eq!(shipped["message"], r#"{"secret":"[OBFUSCATED]"}"#);

    adapter.stop().await;
    assert_eq!(bus.subscription_count(), 0);
}

#[tokio::test]
async fn test_logstash_unreachable_is_not_fatal() {
    // Bind then drop to get a port nothing listens on
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let bus = MemoryBus::new();
    let mut adapter = LogstashAdapter::new(LogstashConfig {
        hostname: "127.0.0.1".to_string(),
        port,
        timeout: 1,
    })
    .unwrap();

    adapter
        .manage(Arc::new(bus.clone()), &ADAPTER_PATTERNS, redactor())
        .await
        .unwrap();
    bus.publish("service.create", b"{}".to_vec()).await.unwrap();
    adapter.stop().await;
}

#[tokio::test]
async fn test_rollbar_reports_with_subject_level() {
    let (port, mut bodies) = capture_server().await;
    let bus = MemoryBus::new();
    let mut adapter = RollbarAdapter::new(RollbarConfig {
        token: "tok".to_string(),
        environment: "test".to_string(),
        endpoint: Some(format!("http://127.0.0.1:{port}/api/1/item/")),
    })
    .unwrap();

    adapter
        .manage(Arc::new(bus.clone()), &ADAPTER_PATTERNS, redactor())
        .await
        .unwrap();

    bus.publish("service.create.aws.error", b"boom".to_vec())
        .await
        .unwrap();
    let item = next_body(&mut bodies).await;
    assert_eq!(item["access_token"], "tok");
    assert_eq!(item["data"]["level"], "error");
    assert_eq!(
        item["data"]["body"]["message"]["body"],
        "service.create.aws.error : 'boom'"
    );

    adapter
        .log(&LogRecord {
            subject: "service.create".to_string(),
            message: "done".to_string(),
            level: "info".to_string(),
            user: "alice".to_string(),
        })
        .await;
    let item = next_body(&mut bodies).await;
    assert_eq!(item["data"]["level"], "info");
    assert_eq!(item["data"]["body"]["message"]["body"], "service.create : 'done'");

    adapter.stop().await;
}
