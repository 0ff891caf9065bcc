use crate::error::DirectoryError;
use crate::pwa::view::PwaSummary;
use crate::server::guards::user::RequireUser;
use crate::server::router::DirectoryState;
use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
};
use serde::Deserialize;

pub fn router() -> Router<DirectoryState> {
    Router::new()
        .route("/favorites", get(list).post(add))
        .route("/favorites/{id}", delete(remove))
}

#[derive(Debug, Deserialize)]
pub struct FavoriteRequest {
    #[serde(alias = "pwaId")]
    pub pwa_id: i64,
}

/// GET /favorites
pub(super) async fn list(
    State(state): State<DirectoryState>,
    RequireUser(user): RequireUser,
) -> Result<Response, DirectoryError> {
    let pwas = state.services.favorites.list(&user).await?;
    let items: Vec<PwaSummary> = pwas.iter().map(PwaSummary::from).collect();
    Ok(Json(items).into_response())
}

/// POST /favorites
pub(super) async fn add(
    State(state): State<DirectoryState>,
    RequireUser(user): RequireUser,
    payload: Result<Json<FavoriteRequest>, JsonRejection>,
) -> Result<StatusCode, DirectoryError> {
    let Json(req) = payload?;
    state.services.favorites.add(&user, req.pwa_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /favorites/{id}
pub(super) async fn remove(
    State(state): State<DirectoryState>,
    RequireUser(user): RequireUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, DirectoryError> {
    let Path(id) = id?;
    if state.services.favorites.remove(&user, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(DirectoryError::not_found(format!("favorite {id}")))
    }
}
