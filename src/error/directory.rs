use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pwadir_manifest::{ManifestError, ManifestIssue};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error as ThisError;

use super::IsRetryable;

#[derive(Debug, ThisError)]
pub enum DirectoryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid JSON body: {0}")]
    InvalidJson(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Manifest failed validation ({} issues)", issues.len())]
    ManifestInvalid { issues: Vec<ManifestIssue> },

    #[error("Manifest could not be parsed: {0}")]
    ManifestParse(#[from] ManifestError),

    #[error("Manifest unavailable, upstream status: {0}")]
    ManifestUnavailable(StatusCode),

    #[error("Manifest body exceeds {limit} bytes")]
    ManifestTooLarge { limit: usize },

    #[error("Upstream error with status: {0}")]
    UpstreamStatus(StatusCode),

    #[error("Lighthouse audits are disabled")]
    LighthouseDisabled,

    #[error("Lighthouse report unusable: {0}")]
    LighthouseReport(String),

    #[error("Push notifications are disabled")]
    NotificationsDisabled,

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Unexpected error: {0}")]
    UnexpectedError(String),

    #[error("Ractor error: {0}")]
    RactorError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl DirectoryError {
    pub fn not_found(what: impl Into<String>) -> Self {
        DirectoryError::NotFound(what.into())
    }

    /// HTTP status and public error body for this error.
    fn public_parts(&self) -> (StatusCode, ApiErrorObject) {
        let (status, code, message, details) = match self {
            DirectoryError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{what} not found."),
                None,
            ),
            DirectoryError::DatabaseError(sqlx::Error::RowNotFound) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "Resource not found.".to_string(),
                None,
            ),
            DirectoryError::InvalidRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "INVALID_REQUEST",
                msg.clone(),
                None,
            ),
            DirectoryError::InvalidJson(_) => (
                StatusCode::BAD_REQUEST,
                "INVALID_JSON",
                "invalid JSON".to_string(),
                None,
            ),
            DirectoryError::Unauthorized(reason) => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                reason.clone(),
                None,
            ),
            DirectoryError::ManifestInvalid { issues } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "MANIFEST_INVALID",
                "The manifest failed validation.".to_string(),
                serde_json::to_value(issues).ok(),
            ),
            DirectoryError::ManifestParse(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "MANIFEST_UNPARSABLE",
                e.to_string(),
                None,
            ),
            DirectoryError::ManifestUnavailable(status) => (
                StatusCode::BAD_GATEWAY,
                "MANIFEST_UNAVAILABLE",
                format!("Fetching the manifest returned {status}."),
                None,
            ),
            DirectoryError::ManifestTooLarge { limit } => (
                StatusCode::BAD_GATEWAY,
                "MANIFEST_TOO_LARGE",
                format!("The manifest exceeds {limit} bytes."),
                None,
            ),
            DirectoryError::NotificationsDisabled => (
                StatusCode::SERVICE_UNAVAILABLE,
                "NOTIFICATIONS_DISABLED",
                "Push notifications are not configured.".to_string(),
                None,
            ),
            DirectoryError::LighthouseDisabled => (
                StatusCode::SERVICE_UNAVAILABLE,
                "LIGHTHOUSE_DISABLED",
                "Lighthouse audits are not configured.".to_string(),
                None,
            ),
            DirectoryError::ReqwestError(_)
            | DirectoryError::UpstreamStatus(_)
            | DirectoryError::LighthouseReport(_) => (
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
                "Upstream service error.".to_string(),
                None,
            ),
            DirectoryError::JsonError(_)
            | DirectoryError::UrlError(_)
            | DirectoryError::CsvError(_)
            | DirectoryError::UnexpectedError(_)
            | DirectoryError::RactorError(_)
            | DirectoryError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal server error occurred.".to_string(),
                None,
            ),
        };

        (
            status,
            ApiErrorObject {
                code: code.to_string(),
                message,
                details,
            },
        )
    }
}

impl IntoResponse for DirectoryError {
    fn into_response(self) -> Response {
        let (status, body) = self.public_parts();

        if status.is_server_error() {
            tracing::error!(status = %status, code = %body.code, error = %self, "Request failed");
        } else {
            tracing::warn!(status = %status, code = %body.code, error = %self, "Request rejected");
        }

        (status, Json(ApiErrorBody { inner: body })).into_response()
    }
}

impl From<JsonRejection> for DirectoryError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonSyntaxError(e) => DirectoryError::InvalidJson(e.body_text()),
            JsonRejection::BytesRejection(e) => {
                DirectoryError::UnexpectedError(format!("Failed to read request body: {e}"))
            }
            other => DirectoryError::InvalidRequest(other.body_text()),
        }
    }
}

impl From<QueryRejection> for DirectoryError {
    fn from(rejection: QueryRejection) -> Self {
        DirectoryError::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for DirectoryError {
    fn from(rejection: PathRejection) -> Self {
        DirectoryError::InvalidRequest(rejection.body_text())
    }
}

/// Standardized API error response payload.
#[derive(Debug, Serialize)]
pub struct ApiErrorObject {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    #[serde(rename = "error")]
    pub inner: ApiErrorObject,
}

impl IsRetryable for DirectoryError {
    fn is_retryable(&self) -> bool {
        match self {
            DirectoryError::ReqwestError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            DirectoryError::UpstreamStatus(status) => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            DirectoryError::ManifestUnavailable(status) => status.is_server_error(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pwadir_manifest::IssueCode;

    #[test]
    fn invalid_manifest_maps_to_422_with_issue_details() {
        let err = DirectoryError::ManifestInvalid {
            issues: vec![ManifestIssue::new(IssueCode::NoName, "no name")],
        };
        let (status, body) = err.public_parts();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.code, "MANIFEST_INVALID");
        assert_eq!(body.details.unwrap()[0]["code"], "NO_NAME");
    }

    #[test]
    fn row_not_found_is_a_404() {
        let (status, _) = DirectoryError::DatabaseError(sqlx::Error::RowNotFound).public_parts();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_errors_hide_details() {
        let (status, body) = DirectoryError::RactorError("mailbox closed".into()).public_parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.message.contains("mailbox"));
    }

    #[test]
    fn server_side_upstream_statuses_are_retryable() {
        assert!(DirectoryError::UpstreamStatus(StatusCode::BAD_GATEWAY).is_retryable());
        assert!(DirectoryError::UpstreamStatus(StatusCode::TOO_MANY_REQUESTS).is_retryable());
        assert!(!DirectoryError::UpstreamStatus(StatusCode::NOT_FOUND).is_retryable());
        assert!(!DirectoryError::ManifestUnavailable(StatusCode::GONE).is_retryable());
    }
}
