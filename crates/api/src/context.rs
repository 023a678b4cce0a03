use storefront_auth::{Principal, Role};

/// Principal context for a request (verified subject + roles).
///
/// Inserted into request extensions by the auth middleware and handed to
/// handlers and guards as an explicit value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn subject(&self) -> &str {
        self.principal.subject()
    }

    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.principal.roles().iter()
    }
}
