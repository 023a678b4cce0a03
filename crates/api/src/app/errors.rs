use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use storefront_auth::{AuthError, AuthzError};
use storefront_core::DomainError;

/// Uniform 401. The failure reason is never part of the body.
pub fn unauthorized() -> axum::response::Response {
    (
        StatusCode::UNAUTHORIZED,
        axum::Json(json!({ "error": "unauthorized" })),
    )
        .into_response()
}

pub fn authz_error_to_response(err: AuthzError) -> axum::response::Response {
    match err {
        AuthzError::AccessDenied => forbidden(),
    }
}

fn forbidden() -> axum::response::Response {
    (
        StatusCode::FORBIDDEN,
        axum::Json(json!({ "error": "forbidden" })),
    )
        .into_response()
}

pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    match err {
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED.into_response(),
        AuthError::DuplicateUsername | AuthError::DuplicateEmail => {
            StatusCode::CONFLICT.into_response()
        }
        AuthError::InvalidRegistration(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        AuthError::Token(e) => {
            tracing::error!(error = %e, "token minting failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
        AuthError::Backend(msg) => {
            tracing::error!(error = %msg, "identity backend failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::Unavailable => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_unavailable",
            "store unavailable",
        ),
    }
}

pub fn not_found() -> axum::response::Response {
    domain_error_to_response(DomainError::NotFound)
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Parse a path id, or produce the 400 response for it.
pub fn parse_id<T>(raw: &str, what: &'static str) -> Result<T, axum::response::Response>
where
    T: core::str::FromStr,
{
    raw.parse::<T>().map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "invalid_id",
            format!("invalid {what} id"),
        )
    })
}
