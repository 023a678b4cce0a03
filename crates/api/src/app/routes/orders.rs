use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use storefront_core::{OrderId, UserId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub async fn list_orders(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(services.orders.list_orders())
}

/// The caller always becomes the owner of the new order.
pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Option<Json<dto::CreateOrderRequest>>,
) -> axum::response::Response {
    let body = body.map(|Json(b)| b).unwrap_or_default();

    // The token can outlive the account it was issued to.
    let Some(owner) = services.identities.find_by_username(principal.subject()) else {
        return errors::unauthorized();
    };

    match services.orders.create_order(owner.id, body.shipping_address) {
        Ok(order) => {
            tracing::info!(order_id = %order.id, owner = %owner.username, "order created");
            (StatusCode::CREATED, Json(order)).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OrderId = match errors::parse_id(&id, "order") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.orders.get_order(id) {
        Some(order) => Json(order).into_response(),
        None => errors::not_found(),
    }
}

pub async fn orders_for_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(user_id): Path<String>,
) -> axum::response::Response {
    let user_id: UserId = match errors::parse_id(&user_id, "user") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    Json(services.orders.orders_for_user(user_id)).into_response()
}

pub async fn update_status(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateOrderStatusRequest>,
) -> axum::response::Response {
    let id: OrderId = match errors::parse_id(&id, "order") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.orders.update_status(id, body.status) {
        Ok(order) => Json(order).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateOrderRequest>,
) -> axum::response::Response {
    let id: OrderId = match errors::parse_id(&id, "order") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services
        .orders
        .update_order(id, body.shipping_address, body.status)
    {
        Ok(order) => Json(order).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OrderId = match errors::parse_id(&id, "order") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.orders.delete_order(id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
