use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};
use storefront_auth::{AccessRule, ResourceKind};

use crate::app::services::AppServices;
use crate::authz::guarded;

pub mod auth;
pub mod order_items;
pub mod orders;
pub mod products;
pub mod system;
pub mod users;

/// Endpoints reachable without a token.
pub fn public() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/register", post(auth::register))
        .route("/api/products", get(products::list_products))
        .route("/api/products/:id", get(products::get_product))
}

/// Endpoints behind the bearer middleware, each with its access rule.
pub fn protected(services: &AppServices) -> Router {
    let p = || services.policy.clone();
    let admin = AccessRule::admin;

    Router::new()
        .route(
            "/whoami",
            guarded(get(system::whoami), p(), AccessRule::Authenticated),
        )
        // users
        .route("/api/users", guarded(get(users::list_users), p(), admin()))
        .route(
            "/api/users/:id",
            guarded(
                get(users::get_user),
                p(),
                AccessRule::admin_or_owner(ResourceKind::User, "id"),
            )
            .merge(guarded(
                put(users::update_user),
                p(),
                AccessRule::admin_or_owner(ResourceKind::User, "id"),
            ))
            .merge(guarded(delete(users::delete_user), p(), admin())),
        )
        // The first segment is a username here; the router requires one
        // parameter name per position.
        .route(
            "/api/users/:id/roles/:role",
            guarded(
                post(users::grant_role).delete(users::revoke_role),
                p(),
                admin(),
            ),
        )
        // orders
        .route(
            "/api/orders",
            guarded(get(orders::list_orders), p(), admin()).merge(guarded(
                post(orders::create_order),
                p(),
                AccessRule::Authenticated,
            )),
        )
        .route(
            "/api/orders/:id",
            guarded(
                get(orders::get_order),
                p(),
                AccessRule::admin_or_owner(ResourceKind::Order, "id"),
            )
            .merge(guarded(
                put(orders::update_order).delete(orders::delete_order),
                p(),
                admin(),
            )),
        )
        .route(
            "/api/orders/:id/status",
            guarded(patch(orders::update_status), p(), admin()),
        )
        .route(
            "/api/orders/user/:user_id",
            guarded(
                get(orders::orders_for_user),
                p(),
                AccessRule::admin_or_owner(ResourceKind::User, "user_id"),
            ),
        )
        // order items
        .route(
            "/api/order-items",
            guarded(
                get(order_items::list_items).post(order_items::create_item),
                p(),
                admin(),
            ),
        )
        .route(
            "/api/order-items/:id",
            guarded(
                get(order_items::get_item),
                p(),
                AccessRule::admin_or_owner(ResourceKind::OrderItem, "id"),
            )
            .merge(guarded(
                put(order_items::update_item).delete(order_items::delete_item),
                p(),
                admin(),
            )),
        )
        .route(
            "/api/order-items/order/:order_id",
            guarded(
                get(order_items::items_for_order),
                p(),
                AccessRule::admin_or_owner(ResourceKind::Order, "order_id"),
            ),
        )
        .route(
            "/api/order-items/product/:product_id",
            guarded(get(order_items::items_for_product), p(), admin()),
        )
        // products; reads are public
        .route("/api/products", guarded(post(products::create_product), p(), admin()))
        .route(
            "/api/products/:id",
            guarded(
                put(products::update_product).delete(products::delete_product),
                p(),
                admin(),
            ),
        )
        .route(
            "/api/products/:id/activate",
            guarded(patch(products::activate_product), p(), admin()),
        )
        .route(
            "/api/products/:id/deactivate",
            guarded(patch(products::deactivate_product), p(), admin()),
        )
}
