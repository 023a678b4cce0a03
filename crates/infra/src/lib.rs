//! In-memory implementations of the collaborators the auth core depends on.
//!
//! These back the API in dev and tests; a database-backed deployment swaps
//! them for its own implementations of the `storefront-auth` traits.

pub mod catalog;
pub mod identity;
pub mod orders;
pub mod ownership;
pub mod password;

pub use catalog::{InMemoryCatalog, NewProduct, Product, ProductUpdate};
pub use identity::{InMemoryIdentityStore, ProfileUpdate, UserView};
pub use orders::{InMemoryOrderStore, Order, OrderItem, OrderStatus};
pub use ownership::StoreOwnershipResolver;
