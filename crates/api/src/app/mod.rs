//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: token codec, in-memory stores, gateway and policy engine
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use crate::config::AppConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::{AppServices, ServiceError};

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(config: &AppConfig) -> Result<Router, ServiceError> {
    let services = Arc::new(AppServices::in_memory(config)?);
    Ok(build_router(services))
}

/// Router over already-wired services. Tests use this to seed stores first.
pub fn build_router(services: Arc<AppServices>) -> Router {
    let auth_state = middleware::AuthState {
        codec: services.codec.clone(),
    };

    // Protected routes: bearer token required, then the per-route guard.
    let protected = routes::protected(&services).layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .merge(routes::public())
        .merge(protected)
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
