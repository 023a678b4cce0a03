use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    match services
        .gateway
        .login(&body.username, &body.password, Utc::now())
        .await
    {
        Ok(session) => (StatusCode::OK, Json(dto::AuthResponse::from(session))).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterRequest>,
) -> axum::response::Response {
    match services.gateway.register(body.into(), Utc::now()).await {
        Ok(session) => {
            (StatusCode::CREATED, Json(dto::AuthResponse::from(session))).into_response()
        }
        Err(e) => errors::auth_error_to_response(e),
    }
}
