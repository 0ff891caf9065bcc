//! Operator endpoints. Every route here sits behind `RequireAdminKey`.

use crate::error::DirectoryError;
use crate::pwa::view::PwaDetail;
use crate::server::router::DirectoryState;
use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

pub fn router() -> Router<DirectoryState> {
    Router::new()
        .route("/admin/cache:flush", post(flush_cache))
        .route("/admin/tasks", get(pending_tasks))
        .route("/admin/tasks:enqueue-all", post(enqueue_all))
        .route("/admin/search:reindex", post(reindex))
        .route("/admin/pwas/{target}", post(pwa_action).delete(delete_pwa))
}

#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    pub visible: bool,
}

/// Custom methods addressed as `/admin/pwas/{id}:{action}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PwaAction {
    Refresh,
    Visibility,
}

fn parse_target(target: &str) -> Result<(i64, Option<PwaAction>), DirectoryError> {
    let (id, action) = match target.split_once(':') {
        Some((id, "refresh")) => (id, Some(PwaAction::Refresh)),
        Some((id, "visibility")) => (id, Some(PwaAction::Visibility)),
        Some((_, other)) => {
            return Err(DirectoryError::not_found(format!("action {other:?}")));
        }
        None => (target, None),
    };
    let id = id
        .parse::<i64>()
        .map_err(|_| DirectoryError::InvalidRequest(format!("invalid PWA id {id:?}")))?;
    Ok((id, action))
}

/// POST /admin/cache:flush
pub(super) async fn flush_cache(State(state): State<DirectoryState>) -> StatusCode {
    state.services.cache.invalidate_all();
    info!("Page cache flushed");
    StatusCode::NO_CONTENT
}

/// GET /admin/tasks
pub(super) async fn pending_tasks(
    State(state): State<DirectoryState>,
) -> Result<Response, DirectoryError> {
    let pending = state.services.tasks.len().await?;
    Ok(Json(json!({ "pending": pending })).into_response())
}

/// POST /admin/tasks:enqueue-all
pub(super) async fn enqueue_all(
    State(state): State<DirectoryState>,
) -> Result<Response, DirectoryError> {
    let queued = state.services.tasks.enqueue_all().await?;
    info!(queued, "All PWAs queued for re-validation");
    Ok((StatusCode::ACCEPTED, Json(json!({ "queued": queued }))).into_response())
}

/// POST /admin/search:reindex
pub(super) async fn reindex(State(state): State<DirectoryState>) -> Result<Response, DirectoryError> {
    let indexed = state.services.search.reindex().await?;
    Ok(Json(json!({ "indexed": indexed })).into_response())
}

/// POST /admin/pwas/{id}:refresh and POST /admin/pwas/{id}:visibility
pub(super) async fn pwa_action(
    State(state): State<DirectoryState>,
    target: Result<Path<String>, PathRejection>,
    payload: Result<Json<VisibilityRequest>, JsonRejection>,
) -> Result<Response, DirectoryError> {
    let Path(target) = target?;
    let (id, action) = parse_target(&target)?;

    match action {
        Some(PwaAction::Refresh) => {
            state.services.tasks.push(id).await?;
            info!(pwa_id = id, "PWA queued for refresh");
            Ok((StatusCode::ACCEPTED, Json(json!({ "queued": id }))).into_response())
        }
        Some(PwaAction::Visibility) => {
            let Json(req) = payload?;
            let pwa = state.services.pwa.set_visibility(id, req.visible).await?;
            Ok(Json(PwaDetail::new(&pwa, None)).into_response())
        }
        None => Err(DirectoryError::not_found(format!(
            "POST /admin/pwas/{target}"
        ))),
    }
}

/// DELETE /admin/pwas/{id}
pub(super) async fn delete_pwa(
    State(state): State<DirectoryState>,
    target: Result<Path<String>, PathRejection>,
) -> Result<StatusCode, DirectoryError> {
    let Path(target) = target?;
    match parse_target(&target)? {
        (id, None) => {
            state.services.pwa.delete(id).await?;
            Ok(StatusCode::NO_CONTENT)
        }
        _ => Err(DirectoryError::not_found(format!(
            "DELETE /admin/pwas/{target}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_split_into_id_and_action() {
        assert_eq!(parse_target("42").unwrap(), (42, None));
        assert_eq!(
            parse_target("7:refresh").unwrap(),
            (7, Some(PwaAction::Refresh))
        );
        assert_eq!(
            parse_target("7:visibility").unwrap(),
            (7, Some(PwaAction::Visibility))
        );
    }

    #[test]
    fn bad_targets_are_rejected() {
        assert!(matches!(
            parse_target("7:explode"),
            Err(DirectoryError::NotFound(_))
        ));
        assert!(matches!(
            parse_target("abc:refresh"),
            Err(DirectoryError::InvalidRequest(_))
        ));
        assert!(matches!(
            parse_target("abc"),
            Err(DirectoryError::InvalidRequest(_))
        ));
    }
}
