use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use storefront_auth::TokenCodec;

use crate::app::errors;
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub codec: Arc<TokenCodec>,
}

/// Require a valid bearer token and attach the verified principal.
///
/// Every failure gets the same 401 body; the reason is only logged.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer(req.headers()) else {
        return errors::unauthorized();
    };

    let principal = match state.codec.verify(token, Utc::now(), None) {
        Ok(principal) => principal,
        Err(e) => {
            let claimed = TokenCodec::decode_subject(token).ok();
            tracing::debug!(reason = %e, claimed_subject = ?claimed, "bearer token rejected");
            return errors::unauthorized();
        }
    };

    req.extensions_mut().insert(PrincipalContext::new(principal));
    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}
