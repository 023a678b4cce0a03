//! Ownership resolution over the in-memory stores.
//!
//! - order: the order's user, by username
//! - order item: the owning order's user (one hop)
//! - user: the user's own username

use std::sync::Arc;

use async_trait::async_trait;

use storefront_auth::{OwnershipError, OwnershipFact, OwnershipResolver, ResourceId, ResourceKind};
use storefront_core::{OrderId, OrderItemId, UserId};

use crate::identity::InMemoryIdentityStore;
use crate::orders::InMemoryOrderStore;

pub struct StoreOwnershipResolver {
    identities: Arc<InMemoryIdentityStore>,
    orders: Arc<InMemoryOrderStore>,
}

impl StoreOwnershipResolver {
    pub fn new(identities: Arc<InMemoryIdentityStore>, orders: Arc<InMemoryOrderStore>) -> Self {
        Self { identities, orders }
    }

    fn owner_of_order(&self, id: OrderId) -> Option<String> {
        let order = self.orders.get_order(id)?;
        self.identities.username_of(order.user_id)
    }
}

#[async_trait]
impl OwnershipResolver for StoreOwnershipResolver {
    async fn resolve_owner(
        &self,
        kind: ResourceKind,
        id: ResourceId,
    ) -> Result<OwnershipFact, OwnershipError> {
        let uuid = *id.as_uuid();
        let owner = match kind {
            ResourceKind::User => self.identities.username_of(UserId::from_uuid(uuid)),
            ResourceKind::Order => self.owner_of_order(OrderId::from_uuid(uuid)),
            ResourceKind::OrderItem => self
                .orders
                .get_item(OrderItemId::from_uuid(uuid))
                .and_then(|item| self.owner_of_order(item.order_id)),
        };

        match owner {
            Some(owner_subject) => Ok(OwnershipFact {
                resource_id: id,
                owner_subject,
            }),
            None => {
                tracing::debug!(%kind, %id, "no owner on record");
                Err(OwnershipError::NotFound)
            }
        }
    }
}
