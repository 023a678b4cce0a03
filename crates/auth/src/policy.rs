//! Access rules and their evaluation.
//!
//! A rule is plain data attached to a route when the router is built. The
//! engine evaluates it against the request's [`Principal`] and the target
//! resource id, asking the [`OwnershipResolver`] only when an ownership
//! predicate actually has to be decided.

use std::borrow::Cow;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use storefront_core::{OrderId, OrderItemId, UserId};

use crate::{Principal, Role};

/// Kind of resource an ownership predicate refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Owned by itself: the user's own username.
    User,
    /// Owned by the user who placed it.
    Order,
    /// Owned by the owner of the order it belongs to.
    OrderItem,
}

impl core::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            ResourceKind::User => "user",
            ResourceKind::Order => "order",
            ResourceKind::OrderItem => "order_item",
        })
    }
}

/// Identifier of the resource a request targets.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ResourceId(Uuid);

impl ResourceId {
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl core::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ResourceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

impl From<Uuid> for ResourceId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<UserId> for ResourceId {
    fn from(value: UserId) -> Self {
        Self(value.into())
    }
}

impl From<OrderId> for ResourceId {
    fn from(value: OrderId) -> Self {
        Self(value.into())
    }
}

impl From<OrderItemId> for ResourceId {
    fn from(value: OrderItemId) -> Self {
        Self(value.into())
    }
}

/// Who owns a resource, as resolved on demand. Never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipFact {
    pub resource_id: ResourceId,
    pub owner_subject: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OwnershipError {
    #[error("resource not found")]
    NotFound,

    #[error("ownership lookup unavailable: {0}")]
    Unavailable(String),
}

/// Read-only lookup of resource owners in an externally owned store.
#[async_trait]
pub trait OwnershipResolver: Send + Sync {
    async fn resolve_owner(
        &self,
        kind: ResourceKind,
        id: ResourceId,
    ) -> Result<OwnershipFact, OwnershipError>;
}

#[async_trait]
impl<T> OwnershipResolver for Arc<T>
where
    T: OwnershipResolver + ?Sized,
{
    async fn resolve_owner(
        &self,
        kind: ResourceKind,
        id: ResourceId,
    ) -> Result<OwnershipFact, OwnershipError> {
        (**self).resolve_owner(kind, id).await
    }
}

/// Declarative access rule guarding one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessRule {
    /// Any verified principal.
    Authenticated,

    /// Principal holds the role (exact, case-sensitive match).
    HasRole(Role),

    /// Principal owns the resource whose id is bound to the route parameter
    /// `id_param`. [`Role::ADMIN`] always satisfies this.
    OwnsResource {
        kind: ResourceKind,
        id_param: Cow<'static, str>,
    },

    /// Any of the sub-rules.
    Or(Vec<AccessRule>),
}

impl AccessRule {
    pub fn has_role(role: Role) -> Self {
        Self::HasRole(role)
    }

    pub fn owns(kind: ResourceKind, id_param: impl Into<Cow<'static, str>>) -> Self {
        Self::OwnsResource {
            kind,
            id_param: id_param.into(),
        }
    }

    pub fn admin() -> Self {
        Self::HasRole(Role::ADMIN)
    }

    /// `HasRole(ADMIN) OR OwnsResource(kind, id_param)`.
    pub fn admin_or_owner(kind: ResourceKind, id_param: impl Into<Cow<'static, str>>) -> Self {
        Self::admin().or(Self::owns(kind, id_param))
    }

    /// Disjunction, flattened so nested `Or`s never build up.
    pub fn or(self, other: AccessRule) -> Self {
        let mut rules = match self {
            AccessRule::Or(rules) => rules,
            rule => vec![rule],
        };
        match other {
            AccessRule::Or(more) => rules.extend(more),
            rule => rules.push(rule),
        }
        AccessRule::Or(rules)
    }

    /// Route parameter the first ownership predicate reads its id from.
    pub fn id_param(&self) -> Option<&str> {
        self.predicates().into_iter().find_map(|p| match p {
            AccessRule::OwnsResource { id_param, .. } => Some(id_param.as_ref()),
            _ => None,
        })
    }

    fn needs_lookup(&self) -> bool {
        matches!(self, AccessRule::OwnsResource { .. })
    }

    /// Leaf predicates in left-to-right order.
    fn predicates(&self) -> Vec<&AccessRule> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(rule) = stack.pop() {
            match rule {
                AccessRule::Or(rules) => stack.extend(rules.iter().rev()),
                leaf => out.push(leaf),
            }
        }
        out
    }
}

impl core::fmt::Display for AccessRule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AccessRule::Authenticated => f.write_str("Authenticated"),
            AccessRule::HasRole(role) => write!(f, "HasRole({role})"),
            AccessRule::OwnsResource { kind, id_param } => {
                write!(f, "OwnsResource({kind}, {id_param})")
            }
            AccessRule::Or(rules) => {
                if rules.is_empty() {
                    return f.write_str("Deny");
                }
                for (i, rule) in rules.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" OR ")?;
                    }
                    write!(f, "{rule}")?;
                }
                Ok(())
            }
        }
    }
}

/// Outcome of evaluating a rule, naming the predicate that granted access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AccessDecision {
    Granted { by: String },
    Denied,
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::Granted { .. })
    }

    /// The granting predicate, or [`AuthzError::AccessDenied`] for `?` at the
    /// boundary.
    pub fn into_result(self) -> Result<String, AuthzError> {
        match self {
            AccessDecision::Granted { by } => Ok(by),
            AccessDecision::Denied => Err(AuthzError::AccessDenied),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("access denied")]
    AccessDenied,
}

/// Evaluates access rules.
///
/// Never errors: every failure to establish access, including a missing
/// resource or an unavailable lookup, resolves to deny.
pub struct PolicyEngine<R> {
    resolver: R,
}

impl<R> PolicyEngine<R>
where
    R: OwnershipResolver,
{
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }

    pub async fn evaluate(
        &self,
        principal: &Principal,
        rule: &AccessRule,
        resource_id: Option<ResourceId>,
    ) -> bool {
        self.decide(principal, rule, resource_id).await.is_granted()
    }

    /// Evaluate `rule`, short-circuiting on the first satisfied predicate.
    ///
    /// Predicates that need no lookup run first, in rule order; ownership
    /// predicates follow, also in rule order.
    pub async fn decide(
        &self,
        principal: &Principal,
        rule: &AccessRule,
        resource_id: Option<ResourceId>,
    ) -> AccessDecision {
        let predicates = rule.predicates();

        for predicate in predicates.iter().filter(|p| !p.needs_lookup()) {
            let satisfied = match predicate {
                AccessRule::Authenticated => true,
                AccessRule::HasRole(role) => principal.has_role(role),
                _ => false,
            };
            if satisfied {
                return self.granted(principal, predicate);
            }
        }

        for predicate in predicates.iter().filter(|p| p.needs_lookup()) {
            if let AccessRule::OwnsResource { kind, .. } = predicate {
                if self.owns(principal, *kind, resource_id).await {
                    return self.granted(principal, predicate);
                }
            }
        }

        tracing::debug!(subject = principal.subject(), %rule, "access denied");
        AccessDecision::Denied
    }

    fn granted(&self, principal: &Principal, predicate: &AccessRule) -> AccessDecision {
        let by = predicate.to_string();
        tracing::debug!(subject = principal.subject(), by = %by, "access granted");
        AccessDecision::Granted { by }
    }

    async fn owns(
        &self,
        principal: &Principal,
        kind: ResourceKind,
        resource_id: Option<ResourceId>,
    ) -> bool {
        if principal.is_admin() {
            return true;
        }
        let Some(id) = resource_id else {
            tracing::debug!(%kind, "ownership check without a resource id");
            return false;
        };

        match self.resolver.resolve_owner(kind, id).await {
            Ok(fact) => fact.owner_subject == principal.subject(),
            Err(OwnershipError::NotFound) => {
                tracing::debug!(%kind, %id, "ownership target not found");
                false
            }
            Err(OwnershipError::Unavailable(reason)) => {
                tracing::warn!(%kind, %id, %reason, "ownership lookup failed; denying");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct FakeOwners {
        owners: HashMap<(ResourceKind, ResourceId), String>,
        lookups: AtomicUsize,
        unavailable: bool,
    }

    impl FakeOwners {
        fn with(mut self, kind: ResourceKind, id: ResourceId, owner: &str) -> Self {
            self.owners.insert((kind, id), owner.to_string());
            self
        }
    }

    #[async_trait]
    impl OwnershipResolver for FakeOwners {
        async fn resolve_owner(
            &self,
            kind: ResourceKind,
            id: ResourceId,
        ) -> Result<OwnershipFact, OwnershipError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.unavailable {
                return Err(OwnershipError::Unavailable("timeout".into()));
            }
            self.owners
                .get(&(kind, id))
                .map(|owner| OwnershipFact {
                    resource_id: id,
                    owner_subject: owner.clone(),
                })
                .ok_or(OwnershipError::NotFound)
        }
    }

    fn order_rule() -> AccessRule {
        AccessRule::owns(ResourceKind::Order, "id")
    }

    fn setup() -> (PolicyEngine<Arc<FakeOwners>>, Arc<FakeOwners>, ResourceId) {
        let order: ResourceId = OrderId::new().into();
        let owners = Arc::new(FakeOwners::default().with(ResourceKind::Order, order, "alice"));
        (PolicyEngine::new(owners.clone()), owners, order)
    }

    #[tokio::test]
    async fn ownership_decision_table() {
        let (engine, _, order) = setup();
        let alice = Principal::new("alice", []);
        let bob = Principal::new("bob", []);
        let bob_admin = Principal::new("bob", [Role::ADMIN]);

        assert!(engine.evaluate(&alice, &order_rule(), Some(order)).await);
        assert!(!engine.evaluate(&bob, &order_rule(), Some(order)).await);
        assert!(
            engine
                .evaluate(
                    &bob_admin,
                    &AccessRule::admin().or(order_rule()),
                    Some(order)
                )
                .await
        );
    }

    #[tokio::test]
    async fn missing_resource_denies() {
        let (engine, _, _) = setup();
        let missing: ResourceId = OrderId::new().into();
        for principal in [Principal::new("alice", []), Principal::new("bob", [Role::USER])] {
            assert!(!engine.evaluate(&principal, &order_rule(), Some(missing)).await);
        }
        assert!(!engine.evaluate(&Principal::new("alice", []), &order_rule(), None).await);
    }

    #[tokio::test]
    async fn unavailable_lookup_fails_closed() {
        let order: ResourceId = OrderId::new().into();
        let owners = FakeOwners {
            unavailable: true,
            ..FakeOwners::default()
        }
        .with(ResourceKind::Order, order, "alice");
        let engine = PolicyEngine::new(owners);

        assert!(!engine.evaluate(&Principal::new("alice", []), &order_rule(), Some(order)).await);
    }

    #[tokio::test]
    async fn role_predicates_run_before_lookups() {
        let (engine, owners, order) = setup();
        let admin = Principal::new("root", [Role::ADMIN]);

        // Ownership listed first, but the role check wins without a lookup.
        let rule = order_rule().or(AccessRule::admin());
        let decision = engine.decide(&admin, &rule, Some(order)).await;
        assert_eq!(
            decision,
            AccessDecision::Granted {
                by: "HasRole(ADMIN)".into()
            }
        );
        assert_eq!(owners.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn admin_overrides_ownership_without_lookup() {
        let (engine, owners, _) = setup();
        let admin = Principal::new("root", [Role::ADMIN]);
        let unknown: ResourceId = OrderId::new().into();

        assert!(engine.evaluate(&admin, &order_rule(), Some(unknown)).await);
        assert_eq!(owners.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn role_match_is_exact() {
        let (engine, _, _) = setup();
        let p = Principal::new("carol", [Role::new("admin")]);
        assert!(!engine.evaluate(&p, &AccessRule::admin(), None).await);
        assert_eq!(
            engine.decide(&p, &AccessRule::admin(), None).await.into_result(),
            Err(AuthzError::AccessDenied)
        );

        let admin = Principal::new("root", [Role::ADMIN]);
        assert_eq!(
            engine.decide(&admin, &AccessRule::admin(), None).await.into_result(),
            Ok("HasRole(ADMIN)".to_string())
        );
    }

    #[tokio::test]
    async fn empty_disjunction_denies_and_authenticated_allows() {
        let (engine, _, _) = setup();
        let p = Principal::new("carol", []);
        assert!(!engine.evaluate(&p, &AccessRule::Or(vec![]), None).await);
        assert!(engine.evaluate(&p, &AccessRule::Authenticated, None).await);
    }

    #[test]
    fn or_flattens_and_displays() {
        let rule = AccessRule::admin()
            .or(AccessRule::has_role(Role::new("SUPPORT")))
            .or(AccessRule::owns(ResourceKind::OrderItem, "id"));
        let AccessRule::Or(parts) = &rule else {
            panic!("expected a disjunction");
        };
        assert_eq!(parts.len(), 3);
        assert_eq!(
            rule.to_string(),
            "HasRole(ADMIN) OR HasRole(SUPPORT) OR OwnsResource(order_item, id)"
        );
        assert_eq!(rule.id_param(), Some("id"));
        assert_eq!(AccessRule::admin().id_param(), None);
    }
}
