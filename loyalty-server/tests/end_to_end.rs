//! Full server against a scripted accrual service
//!
//! Upload an order over HTTP and watch the reconciler credit it.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use loyalty_server::{Config, Server};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::timeout;

/// 12345678903 answers PROCESSING for the first two polls, then PROCESSED 500
async fn accrual(Path(number): Path<String>, State(polls): State<Arc<AtomicUsize>>) -> Response {
    let n = polls.fetch_add(1, Ordering::SeqCst);
    match number.as_str() {
        "12345678903" if n < 2 => Json(json!({"order": number, "status": "PROCESSING"})).into_response(),
        "12345678903" => {
            Json(json!({"order": number, "status": "PROCESSED", "accrual": 500})).into_response()
        }
        "79927398713" => Json(json!({"order": number, "status": "INVALID"})).into_response(),
        _ => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn spawn_accrual() -> String {
    let app = Router::new()
        .route("/api/orders/{number}", get(accrual))
        .with_state(Arc::new(AtomicUsize::new(0)));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn order_is_credited_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config {
        database_uri: dir.path().join("e2e.db").to_str().unwrap().to_string(),
        accrual_address: spawn_accrual().await,
        secret_token: Some("e2e-secret".into()),
        ..Config::default()
    };
    config.reconciler.interval = Duration::from_millis(20);
    config.reconciler.retry_interval = Duration::from_millis(10);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(Server::new(config).serve(listener, async move {
        let _ = stop_rx.await;
    }));

    let client = reqwest::Client::new();

    // Connections queue in the backlog until startup finishes
    let register = client
        .post(format!("{base}/api/user/register"))
        .json(&json!({"login": "alice", "password": "pw"}))
        .send()
        .await
        .unwrap();
    assert_eq!(register.status(), reqwest::StatusCode::OK);
    let auth = register
        .headers()
        .get(reqwest::header::AUTHORIZATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    for number in ["12345678903", "79927398713"] {
        let response = client
            .post(format!("{base}/api/user/orders"))
            .header(reqwest::header::AUTHORIZATION, &auth)
            .body(number)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);
    }

    let balance = timeout(Duration::from_secs(10), async {
        loop {
            let balance: Value = client
                .get(format!("{base}/api/user/balance"))
                .header(reqwest::header::AUTHORIZATION, &auth)
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            if balance["current"].as_f64() == Some(500.0) {
                break balance;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(balance["withdrawn"].as_f64(), Some(0.0));

    let orders: Value = client
        .get(format!("{base}/api/user/orders"))
        .header(reqwest::header::AUTHORIZATION, &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let status_of = |number: &str| {
        orders
            .as_array()
            .unwrap()
            .iter()
            .find(|o| o["number"] == number)
            .map(|o| o["status"].clone())
            .unwrap()
    };
    assert_eq!(status_of("12345678903"), "PROCESSED");
    // Resolved in the same cycle or the next one
    let invalid = timeout(Duration::from_secs(5), async {
        loop {
            let orders: Value = client
                .get(format!("{base}/api/user/orders"))
                .header(reqwest::header::AUTHORIZATION, &auth)
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            let found = orders
                .as_array()
                .unwrap()
                .iter()
                .find(|o| o["number"] == "79927398713")
                .map(|o| o["status"].clone())
                .unwrap();
            if found == "INVALID" {
                break found;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(invalid, "INVALID");

    stop_tx.send(()).unwrap();
    timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
