use crate::error::DirectoryError;
use crate::notifications::validate_topic;
use crate::server::router::DirectoryState;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::post,
};
use serde::Deserialize;
use tracing::info;

pub fn router() -> Router<DirectoryState> {
    Router::new()
        .route("/notifications/subscribe", post(subscribe))
        .route("/notifications/unsubscribe", post(unsubscribe))
}

#[derive(Debug, Deserialize)]
pub struct TopicRequest {
    pub token: String,
    pub topic: String,
}

/// POST /notifications/subscribe
pub(super) async fn subscribe(
    State(state): State<DirectoryState>,
    payload: Result<Json<TopicRequest>, JsonRejection>,
) -> Result<StatusCode, DirectoryError> {
    let Json(req) = payload?;
    validate_topic(&req.topic)?;
    state.services.push.subscribe(&req.token, &req.topic).await?;
    info!(topic = %req.topic, "Device subscribed");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /notifications/unsubscribe
pub(super) async fn unsubscribe(
    State(state): State<DirectoryState>,
    payload: Result<Json<TopicRequest>, JsonRejection>,
) -> Result<StatusCode, DirectoryError> {
    let Json(req) = payload?;
    validate_topic(&req.topic)?;
    state.services.push.unsubscribe(&req.token, &req.topic).await?;
    info!(topic = %req.topic, "Device unsubscribed");
    Ok(StatusCode::NO_CONTENT)
}
