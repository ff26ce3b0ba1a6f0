use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use leptos::logging::{error, log};
use serde_json::{json, Value};
use thiserror::Error;

use crate::app::DbPool;
use crate::model::{Submission, SubmissionRecord};
use crate::{get_event_submissions, validate_admin_token};

pub const ADMIN_COOKIE: &str = "admin_token";

/// Reads a single cookie out of the request headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie_str = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    cookie_str.split(';').find_map(|cookie| {
        let (key, value) = cookie.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

/// `Set-Cookie` value for a fresh admin session, or for clearing it when `token` is `None`.
pub fn admin_cookie(token: Option<&str>) -> String {
    match token {
        Some(token) => format!(
            "{}={}; Max-Age=86400; Path=/; HttpOnly; SameSite=Strict",
            ADMIN_COOKIE, token
        ),
        None => format!("{}=; Max-Age=0; Path=/; HttpOnly; SameSite=Strict", ADMIN_COOKIE),
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// The success body: the display records plus the stored rows under `raw`.
pub fn websites_body(event_code: &str, rows: Vec<Submission>) -> Value {
    let records: Vec<SubmissionRecord> =
        rows.iter().cloned().map(SubmissionRecord::from).collect();
    json!({
        "records": records,
        "raw": {
            "eventCode": event_code,
            "count": rows.len(),
            "submissions": rows,
        },
    })
}

/// `GET /api/websites/{event_code}`. Admin only.
pub async fn websites_handler(
    Extension(pool): Extension<DbPool>,
    Path(event_code): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let token = cookie_value(&headers, ADMIN_COOKIE);
    let code = event_code.clone();

    let rows = tokio::task::spawn_blocking(move || -> Result<Vec<Submission>, ApiError> {
        let mut conn = pool.get().map_err(|e| ApiError::Internal(e.to_string()))?;
        let authorized = match token {
            Some(t) => validate_admin_token(&mut conn, &t)
                .map_err(|e| ApiError::Internal(e.to_string()))?,
            None => false,
        };
        if !authorized {
            return Err(ApiError::Unauthorized);
        }
        get_event_submissions(&mut conn, &code).map_err(|e| ApiError::Internal(e.to_string()))
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?
    .inspect_err(|e| {
        if let ApiError::Internal(message) = e {
            error!("Failed to load submissions for {}: {}", event_code, message);
        }
    })?;

    log!("Serving {} submissions for {}", rows.len(), event_code);
    Ok(Json(websites_body(&event_code, rows)))
}
