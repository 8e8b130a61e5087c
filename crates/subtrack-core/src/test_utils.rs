//! Test utilities for subtrack-core
//!
//! A mock transactional email API, an in-process recording transport and
//! fixture helpers shared by the core, server and CLI tests.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::alerts::{AlertTransport, EmailMessage, TransportError, TransportReceipt};
use crate::db::Database;
use crate::models::{BillingCycle, NewSubscription, NewUser, SubscriptionStatus};

/// A request received by [`MockEmailApi`]
#[derive(Debug, Clone)]
pub struct ReceivedEmail {
    pub authorization: Option<String>,
    pub idempotency_key: Option<String>,
    pub body: Value,
}

#[derive(Default)]
struct MockState {
    received: Mutex<Vec<ReceivedEmail>>,
    /// Status to answer with; 0 means 200
    status: AtomicU16,
    counter: AtomicUsize,
}

/// Mock email API server for integration tests
pub struct MockEmailApi {
    addr: SocketAddr,
    state: Arc<MockState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockEmailApi {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/emails", post(handle_send))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// URL of the send endpoint
    pub fn url(&self) -> String {
        format!("http://{}/emails", self.addr)
    }

    /// Answer every later request with `status`
    pub fn respond_with(&self, status: u16) {
        self.state.status.store(status, Ordering::SeqCst);
    }

    pub fn received(&self) -> Vec<ReceivedEmail> {
        self.state.received.lock().unwrap().clone()
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockEmailApi {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_send(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    state.received.lock().unwrap().push(ReceivedEmail {
        authorization: header("authorization"),
        idempotency_key: header("idempotency-key"),
        body,
    });

    let status = match state.status.load(Ordering::SeqCst) {
        0 => StatusCode::OK,
        code => StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
    };
    if !status.is_success() {
        return (status, Json(json!({ "message": "mock failure" })));
    }

    let n = state.counter.fetch_add(1, Ordering::SeqCst) + 1;
    (status, Json(json!({ "id": format!("mock-{}", n) })))
}

/// Transport that keeps every message in memory
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<EmailMessage>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sends to `recipient` fail
    pub fn fail_for(&self, recipient: &str) {
        self.failing.lock().unwrap().insert(recipient.to_string());
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertTransport for RecordingTransport {
    async fn send(
        &self,
        message: &EmailMessage,
    ) -> std::result::Result<TransportReceipt, TransportError> {
        if self.failing.lock().unwrap().contains(&message.to) {
            return Err(TransportError::SendFailed("injected failure".to_string()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(message.clone());
        Ok(TransportReceipt {
            message_id: Some(format!("rec-{}", sent.len())),
        })
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Create a user with alerts on and USD everywhere
pub fn seed_user(db: &Database, email: &str) -> i64 {
    db.upsert_user(&NewUser {
        email: email.to_string(),
        name: Some("Test User".to_string()),
        email_alerts: true,
        currency: "USD".to_string(),
        display_currency: "USD".to_string(),
    })
    .unwrap()
}

/// Active subscription with the default 3-day lead
pub fn subscription(
    name: &str,
    amount: f64,
    cycle: BillingCycle,
    next_billing_date: NaiveDate,
) -> NewSubscription {
    NewSubscription {
        name: name.to_string(),
        category: None,
        amount,
        currency: "USD".to_string(),
        billing_cycle: cycle,
        next_billing_date,
        status: SubscriptionStatus::Active,
        alert_enabled: true,
        alert_days: 3,
    }
}

pub fn seed_subscription(db: &Database, user_id: i64, sub: &NewSubscription) -> i64 {
    db.create_subscription(user_id, sub).unwrap()
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}
