use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use storefront_core::{OrderId, OrderItemId, ProductId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn list_items(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(services.orders.list_items())
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateOrderItemRequest>,
) -> axum::response::Response {
    match services.orders.add_item(
        body.order_id,
        body.product_id,
        body.quantity,
        body.unit_price_cents,
    ) {
        Ok(item) => (StatusCode::CREATED, Json(item)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OrderItemId = match errors::parse_id(&id, "order item") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.orders.get_item(id) {
        Some(item) => Json(item).into_response(),
        None => errors::not_found(),
    }
}

pub async fn items_for_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(order_id): Path<String>,
) -> axum::response::Response {
    let order_id: OrderId = match errors::parse_id(&order_id, "order") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if services.orders.get_order(order_id).is_none() {
        return errors::not_found();
    }
    Json(services.orders.items_for_order(order_id)).into_response()
}

pub async fn items_for_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(product_id): Path<String>,
) -> axum::response::Response {
    let product_id: ProductId = match errors::parse_id(&product_id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    Json(services.orders.items_for_product(product_id)).into_response()
}

/// The parent order's total follows the new line amount.
pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateOrderItemRequest>,
) -> axum::response::Response {
    let id: OrderItemId = match errors::parse_id(&id, "order item") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services
        .orders
        .update_item(id, body.quantity, body.unit_price_cents)
    {
        Ok(item) => Json(item).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OrderItemId = match errors::parse_id(&id, "order item") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.orders.delete_item(id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
