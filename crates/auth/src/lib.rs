//! `storefront-auth`: token issuance/verification and access-rule evaluation.
//!
//! Decoupled from HTTP and storage: persistence, password hashing and
//! ownership data are reached only through the collaborator traits below.

pub mod claims;
pub mod gateway;
pub mod policy;
pub mod principal;
pub mod roles;
pub mod token;

pub use claims::{TokenClaims, TokenHeader};
pub use gateway::{
    AuthError, AuthSession, AuthenticationGateway, CredentialError, CredentialVerifier, Identity,
    IdentityStore, IdentityStoreError, NewIdentity, Registration,
};
pub use policy::{
    AccessDecision, AccessRule, AuthzError, OwnershipError, OwnershipFact, OwnershipResolver,
    PolicyEngine, ResourceId, ResourceKind,
};
pub use principal::Principal;
pub use roles::Role;
pub use token::{TokenCodec, TokenError};
