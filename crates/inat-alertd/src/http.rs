//! HTTP control endpoints
//!
//! - `POST /update`: replace the filter set, JSON in and out
//! - `GET /unsubscribe`: disarm the periodic job, HTML out
//!
//! Handlers only translate between HTTP and [`ControlSurface`].

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use inat_alert_core::{ControlSurface, UnsubscribeOutcome};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::error;

/// State shared with the handlers
#[derive(Clone)]
pub struct AppState {
    pub control: Arc<ControlSurface>,
}

/// Build the axum router for the control endpoints
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/update", post(handle_update))
        .route("/unsubscribe", get(handle_unsubscribe))
        .with_state(state)
}

async fn handle_update(State(state): State<AppState>, body: Bytes) -> (StatusCode, Json<Value>) {
    let body: Value = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("Invalid JSON body: {}", e) })),
            );
        }
    };

    match state.control.update(&body).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "success" }))),
        Err(e) if e.is_validation() => {
            (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() })))
        }
        Err(e) => {
            error!("Update failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}

async fn handle_unsubscribe(State(state): State<AppState>) -> (StatusCode, Html<&'static str>) {
    match state.control.unsubscribe().await {
        Ok(UnsubscribeOutcome::Unsubscribed) => (
            StatusCode::OK,
            Html("<p>You have successfully unsubscribed from daily updates.</p>"),
        ),
        Ok(UnsubscribeOutcome::AlreadyUnsubscribed) => {
            (StatusCode::OK, Html("<p>You are already unsubscribed.</p>"))
        }
        Err(e) => {
            error!("Unsubscribe failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html("<p>Could not unsubscribe, please try again later.</p>"),
            )
        }
    }
}
