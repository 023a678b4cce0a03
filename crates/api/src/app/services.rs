//! Service wiring: token codec, stores, gateway and policy engine.

use std::sync::Arc;

use thiserror::Error;

use storefront_auth::{
    AuthenticationGateway, IdentityStoreError, PolicyEngine, Role, TokenCodec, TokenError,
};
use storefront_infra::{
    InMemoryCatalog, InMemoryIdentityStore, InMemoryOrderStore, StoreOwnershipResolver,
};

use crate::config::AppConfig;

pub type Gateway = AuthenticationGateway<Arc<InMemoryIdentityStore>, Arc<InMemoryIdentityStore>>;
pub type Policy = PolicyEngine<StoreOwnershipResolver>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("token codec: {0}")]
    Token(#[from] TokenError),

    #[error("bootstrap admin: {0}")]
    Bootstrap(#[from] IdentityStoreError),
}

/// Everything a request handler may touch. Shared as `Arc<AppServices>`.
pub struct AppServices {
    pub identities: Arc<InMemoryIdentityStore>,
    pub orders: Arc<InMemoryOrderStore>,
    pub catalog: Arc<InMemoryCatalog>,
    pub codec: Arc<TokenCodec>,
    pub gateway: Gateway,
    pub policy: Arc<Policy>,
}

impl AppServices {
    /// In-memory wiring (dev/test).
    pub fn in_memory(config: &AppConfig) -> Result<Self, ServiceError> {
        let codec = Arc::new(TokenCodec::new(&config.auth.secret, &config.auth.issuer)?);

        let identities = Arc::new(InMemoryIdentityStore::new());
        let orders = Arc::new(InMemoryOrderStore::new());
        let catalog = Arc::new(InMemoryCatalog::new());

        if let Some(admin) = &config.bootstrap_admin {
            let seeded = identities.seed(
                &admin.username,
                &admin.email,
                &admin.password,
                [Role::ADMIN, Role::USER],
            )?;
            tracing::info!(username = %seeded.username, "seeded bootstrap admin");
        }

        let gateway = AuthenticationGateway::new(
            codec.clone(),
            config.auth.ttl,
            identities.clone(),
            identities.clone(),
        );
        let policy = Arc::new(PolicyEngine::new(StoreOwnershipResolver::new(
            identities.clone(),
            orders.clone(),
        )));

        Ok(Self {
            identities,
            orders,
            catalog,
            codec,
            gateway,
            policy,
        })
    }
}
