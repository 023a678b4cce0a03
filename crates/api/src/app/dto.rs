use serde::{Deserialize, Serialize};

use storefront_auth::{AuthSession, Registration};
use storefront_core::{OrderId, ProductId, UserId};
use storefront_infra::{NewProduct, OrderStatus, ProductUpdate, ProfileUpdate};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Self-service registration. Unknown fields (e.g. requested roles) are
/// ignored; new accounts always start as plain users.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl From<RegisterRequest> for Registration {
    fn from(value: RegisterRequest) -> Self {
        Registration {
            username: value.username,
            password: value.password,
            email: value.email,
            first_name: value.first_name,
            last_name: value.last_name,
        }
    }
}

/// Profile edit. Username, password and roles are not editable here.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl From<UpdateUserRequest> for ProfileUpdate {
    fn from(value: UpdateUserRequest) -> Self {
        ProfileUpdate {
            email: value.email,
            first_name: value.first_name,
            last_name: value.last_name,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub shipping_address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    #[serde(default)]
    pub shipping_address: Option<String>,
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderItemRequest {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub price_cents: i64,
}

impl From<CreateProductRequest> for NewProduct {
    fn from(value: CreateProductRequest) -> Self {
        NewProduct {
            name: value.name,
            description: value.description,
            category: value.category,
            price_cents: value.price_cents,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderItemRequest {
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub unit_price_cents: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price_cents: Option<i64>,
}

impl From<UpdateProductRequest> for ProductUpdate {
    fn from(value: UpdateProductRequest) -> Self {
        ProductUpdate {
            name: value.name,
            description: value.description,
            category: value.category,
            price_cents: value.price_cents,
        }
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub username: String,
    pub user_id: UserId,
    pub email: String,
}

impl From<AuthSession> for AuthResponse {
    fn from(value: AuthSession) -> Self {
        AuthResponse {
            token: value.token,
            username: value.identity.username,
            user_id: value.identity.user_id,
            email: value.identity.email,
        }
    }
}
