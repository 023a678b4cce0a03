//! In-memory product catalog.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::Serialize;

use storefront_core::{DomainError, DomainResult, ProductId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price_cents: i64,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price_cents: i64,
}

/// Partial edit of a product. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price_cents: Option<i64>,
}

#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    inner: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, new: NewProduct) -> DomainResult<Product> {
        if new.name.trim().is_empty() {
            return Err(DomainError::validation("product name is required"));
        }
        if new.price_cents < 0 {
            return Err(DomainError::validation("price must not be negative"));
        }
        let product = Product {
            id: ProductId::new(),
            name: new.name,
            description: new.description,
            category: new.category,
            price_cents: new.price_cents,
            active: true,
        };
        let mut map = self.inner.write().map_err(|_| DomainError::Unavailable)?;
        map.insert(product.id, product.clone());
        Ok(product)
    }

    pub fn get(&self, id: ProductId) -> Option<Product> {
        let map = self.inner.read().ok()?;
        map.get(&id).cloned()
    }

    /// All products, or only active ones.
    pub fn list(&self, active_only: bool) -> Vec<Product> {
        let Ok(map) = self.inner.read() else {
            return vec![];
        };
        let mut out: Vec<Product> = map
            .values()
            .filter(|p| !active_only || p.active)
            .cloned()
            .collect();
        out.sort_by_key(|p| p.id);
        out
    }

    pub fn set_active(&self, id: ProductId, active: bool) -> DomainResult<Product> {
        let mut map = self.inner.write().map_err(|_| DomainError::Unavailable)?;
        let product = map.get_mut(&id).ok_or(DomainError::NotFound)?;
        product.active = active;
        Ok(product.clone())
    }

    pub fn update(&self, id: ProductId, update: ProductUpdate) -> DomainResult<Product> {
        if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(DomainError::validation("product name is required"));
        }
        if update.price_cents.is_some_and(|p| p < 0) {
            return Err(DomainError::validation("price must not be negative"));
        }
        let mut map = self.inner.write().map_err(|_| DomainError::Unavailable)?;
        let product = map.get_mut(&id).ok_or(DomainError::NotFound)?;
        if let Some(name) = update.name {
            product.name = name;
        }
        if let Some(description) = update.description {
            product.description = Some(description);
        }
        if let Some(category) = update.category {
            product.category = Some(category);
        }
        if let Some(price) = update.price_cents {
            product.price_cents = price;
        }
        Ok(product.clone())
    }

    pub fn delete(&self, id: ProductId) -> DomainResult<()> {
        let mut map = self.inner.write().map_err(|_| DomainError::Unavailable)?;
        map.remove(&id).map(|_| ()).ok_or(DomainError::NotFound)
    }
}
