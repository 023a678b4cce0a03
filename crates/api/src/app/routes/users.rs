use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use storefront_auth::Role;
use storefront_core::UserId;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub async fn list_users(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(services.identities.list())
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: UserId = match errors::parse_id(&id, "user") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.identities.get(id) {
        Some(user) => Json(user).into_response(),
        None => errors::not_found(),
    }
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateUserRequest>,
) -> axum::response::Response {
    let id: UserId = match errors::parse_id(&id, "user") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.identities.update_profile(id, body.into()) {
        Ok(user) => Json(user).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: UserId = match errors::parse_id(&id, "user") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.identities.delete(id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// Grants take effect on the user's next login; issued tokens keep their roles.
pub async fn grant_role(
    Extension(services): Extension<Arc<AppServices>>,
    Path((username, role)): Path<(String, String)>,
) -> axum::response::Response {
    let role = match parse_role(&role) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match services.identities.add_role(&username, role) {
        Ok(user) => {
            tracing::info!(%username, roles = ?user.roles, "role granted");
            Json(user).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn revoke_role(
    Extension(services): Extension<Arc<AppServices>>,
    Path((username, role)): Path<(String, String)>,
) -> axum::response::Response {
    let role = match parse_role(&role) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match services.identities.remove_role(&username, &role) {
        Ok(user) => {
            tracing::info!(%username, roles = ?user.roles, "role revoked");
            Json(user).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

fn parse_role(raw: &str) -> Result<Role, axum::response::Response> {
    Role::parse(raw).ok_or_else(|| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_role",
            "role names are ASCII letters, digits and underscores",
        )
    })
}
