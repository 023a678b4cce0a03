//! `storefront-core`: identifiers and error model shared by every crate.
//!
//! This crate has no infrastructure concerns.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{OrderId, OrderItemId, ProductId, UserId};
