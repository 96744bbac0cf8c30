//! Local HTTP control surface.
//!
//! `GET /status` returns the current session snapshot; `POST /pause`,
//! `/resume`, `/skip` and `/end` forward a command to the session.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::session::Command;
use crate::status::SessionSnapshot;

#[derive(Clone)]
pub struct ControlState {
    pub commands: mpsc::Sender<Command>,
    pub snapshot: watch::Receiver<SessionSnapshot>,
}

#[derive(Debug, Serialize, PartialEq)]
struct SimpleResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl SimpleResponse {
    fn ok(status: &str) -> Self {
        Self {
            status: status.into(),
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            status: "error".into(),
            error: Some(message.into()),
        }
    }
}

pub fn router(state: ControlState) -> Router {
    Router::new()
        .route("/status", get(handle_status))
        .route("/pause", post(handle_pause))
        .route("/resume", post(handle_resume))
        .route("/skip", post(handle_skip))
        .route("/end", post(handle_end))
        .with_state(state)
}

/// Start the control API as a background tokio task.
pub async fn start_control_api(state: ControlState, port: u16) {
    let app = router(state);
    let addr = format!("127.0.0.1:{port}");
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            warn!("Failed to bind control API on {addr}: {e}");
            return;
        }
    };
    info!("Control API listening on {addr}");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!("Control API server error: {e}");
        }
    });
}

// --- Handlers ---

async fn handle_status(State(state): State<ControlState>) -> Json<SessionSnapshot> {
    Json(state.snapshot.borrow().clone())
}

async fn handle_pause(State(state): State<ControlState>) -> Json<SimpleResponse> {
    forward(&state, Command::Pause, "pausing").await
}

async fn handle_resume(State(state): State<ControlState>) -> Json<SimpleResponse> {
    forward(&state, Command::Resume, "resuming").await
}

async fn handle_skip(State(state): State<ControlState>) -> Json<SimpleResponse> {
    forward(&state, Command::Skip, "skipping").await
}

async fn handle_end(State(state): State<ControlState>) -> Json<SimpleResponse> {
    forward(&state, Command::End, "ending").await
}

async fn forward(state: &ControlState, command: Command, status: &str) -> Json<SimpleResponse> {
    info!("HTTP {command:?}");
    match state.commands.send(command).await {
        Ok(()) => Json(SimpleResponse::ok(status)),
        Err(_) => Json(SimpleResponse::err("session is not running")),
    }
}
