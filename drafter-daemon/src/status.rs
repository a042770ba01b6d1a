//! Read-only HTTP view of the latest cycle.
//!
//! `GET /` and `GET /status` return the last published [`CycleRecord`], or
//! `{"status":"idle"}` before the first cycle. Every other path is a 404.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use drafter_cycle::CycleRecord;

use crate::error::{io_err, DaemonError};

/// Latest cycle record, replaced wholesale on every publish.
#[derive(Debug, Clone, Default)]
pub struct StatusStore(Arc<Mutex<Option<CycleRecord>>>);

impl StatusStore {
    pub fn publish(&self, record: CycleRecord) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(record);
    }

    pub fn latest(&self) -> Option<CycleRecord> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// JSON body served by the endpoint.
    pub fn payload(&self) -> Value {
        self.latest()
            .and_then(|record| serde_json::to_value(record).ok())
            .unwrap_or_else(|| json!({ "status": "idle" }))
    }
}

pub fn router(store: StatusStore) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/status", get(status))
        .fallback(not_found)
        .with_state(store)
}

async fn status(State(store): State<StatusStore>) -> Json<Value> {
    Json(store.payload())
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Bind the loopback listener; port 0 picks a free port.
pub async fn bind(port: u16) -> Result<TcpListener, DaemonError> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    TcpListener::bind(addr)
        .await
        .map_err(|e| io_err(format!("tcp://{addr}"), e))
}

/// Serve until the shutdown broadcast fires.
pub async fn serve(
    listener: TcpListener,
    store: StatusStore,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let addr = listener
        .local_addr()
        .map_err(|e| io_err("status listener", e))?;
    tracing::info!(url = %format!("http://{addr}/status"), "status endpoint listening");

    axum::serve(listener, router(store))
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await
        .map_err(|e| io_err(format!("tcp://{addr}"), e))
}
