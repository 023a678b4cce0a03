//! Per-route access guards.
//!
//! Each protected route is built with the [`AccessRule`] that governs it. The
//! guard runs after routing (so path parameters are bound) and after the
//! bearer middleware (so the principal is known), and only lets the request
//! reach its handler when the policy engine grants access.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Request, State},
    middleware::Next,
    response::Response,
    routing::MethodRouter,
};

use storefront_auth::{AccessRule, ResourceId};

use crate::app::errors;
use crate::app::services::Policy;
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct RouteGuard {
    rule: Arc<AccessRule>,
    policy: Arc<Policy>,
}

/// Attach `rule` to every method of `route`.
pub fn guarded(route: MethodRouter, policy: Arc<Policy>, rule: AccessRule) -> MethodRouter {
    let guard = RouteGuard {
        rule: Arc::new(rule),
        policy,
    };
    route.route_layer(axum::middleware::from_fn_with_state(guard, enforce))
}

async fn enforce(
    State(guard): State<RouteGuard>,
    principal: Option<Extension<PrincipalContext>>,
    params: Option<Path<HashMap<String, String>>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(Extension(principal)) = principal else {
        return errors::unauthorized();
    };

    // An absent or unparseable id leaves ownership unprovable; the engine
    // denies unless a non-ownership predicate grants.
    let resource_id = guard.rule.id_param().and_then(|name| {
        params
            .as_ref()
            .and_then(|Path(values)| values.get(name))
            .and_then(|raw| raw.parse::<ResourceId>().ok())
    });

    let decision = guard
        .policy
        .decide(principal.principal(), &guard.rule, resource_id)
        .await;

    match decision.into_result() {
        Ok(by) => {
            tracing::debug!(
                subject = principal.subject(),
                method = %req.method(),
                path = %req.uri().path(),
                granted_by = %by,
                "access granted"
            );
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(
                subject = principal.subject(),
                method = %req.method(),
                path = %req.uri().path(),
                rule = %guard.rule,
                "access denied"
            );
            errors::authz_error_to_response(e)
        }
    }
}
