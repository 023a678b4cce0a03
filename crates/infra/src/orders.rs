//! In-memory orders and order items.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, OrderId, OrderItemId, ProductId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub shipping_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Debug, Default)]
struct Tables {
    orders: HashMap<OrderId, Order>,
    items: HashMap<OrderItemId, OrderItem>,
}

#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    inner: RwLock<Tables>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_order(&self, user_id: UserId, shipping_address: Option<String>) -> DomainResult<Order> {
        let order = Order {
            id: OrderId::new(),
            user_id,
            status: OrderStatus::Pending,
            total_cents: 0,
            shipping_address,
            created_at: Utc::now(),
        };
        let mut t = self.inner.write().map_err(|_| DomainError::Unavailable)?;
        t.orders.insert(order.id, order.clone());
        Ok(order)
    }

    pub fn get_order(&self, id: OrderId) -> Option<Order> {
        let t = self.inner.read().ok()?;
        t.orders.get(&id).cloned()
    }

    pub fn list_orders(&self) -> Vec<Order> {
        let Ok(t) = self.inner.read() else {
            return vec![];
        };
        let mut out: Vec<Order> = t.orders.values().cloned().collect();
        out.sort_by_key(|o| o.id);
        out
    }

    pub fn orders_for_user(&self, user_id: UserId) -> Vec<Order> {
        let mut out = self.list_orders();
        out.retain(|o| o.user_id == user_id);
        out
    }

    pub fn update_status(&self, id: OrderId, status: OrderStatus) -> DomainResult<Order> {
        let mut t = self.inner.write().map_err(|_| DomainError::Unavailable)?;
        let order = t.orders.get_mut(&id).ok_or(DomainError::NotFound)?;
        if order.status == OrderStatus::Cancelled && status != OrderStatus::Cancelled {
            return Err(DomainError::conflict("order is cancelled"));
        }
        order.status = status;
        Ok(order.clone())
    }

    /// Change the shipping address and/or status. `None` keeps the value.
    pub fn update_order(
        &self,
        id: OrderId,
        shipping_address: Option<String>,
        status: Option<OrderStatus>,
    ) -> DomainResult<Order> {
        let mut t = self.inner.write().map_err(|_| DomainError::Unavailable)?;
        let order = t.orders.get_mut(&id).ok_or(DomainError::NotFound)?;
        if order.status == OrderStatus::Cancelled {
            return Err(DomainError::conflict("order is cancelled"));
        }
        if let Some(address) = shipping_address {
            order.shipping_address = Some(address);
        }
        if let Some(status) = status {
            order.status = status;
        }
        Ok(order.clone())
    }

    /// Delete an order together with its items.
    pub fn delete_order(&self, id: OrderId) -> DomainResult<()> {
        let mut t = self.inner.write().map_err(|_| DomainError::Unavailable)?;
        t.orders.remove(&id).ok_or(DomainError::NotFound)?;
        t.items.retain(|_, item| item.order_id != id);
        Ok(())
    }

    pub fn add_item(
        &self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: u32,
        unit_price_cents: i64,
    ) -> DomainResult<OrderItem> {
        let line_total = line_total(quantity, unit_price_cents)?;

        let mut t = self.inner.write().map_err(|_| DomainError::Unavailable)?;
        let order = t.orders.get_mut(&order_id).ok_or(DomainError::NotFound)?;
        order.total_cents = order
            .total_cents
            .checked_add(line_total)
            .ok_or_else(|| DomainError::validation("order total overflows"))?;

        let item = OrderItem {
            id: OrderItemId::new(),
            order_id,
            product_id,
            quantity,
            unit_price_cents,
        };
        t.items.insert(item.id, item.clone());
        Ok(item)
    }

    /// Change quantity and/or unit price, keeping the order total in step.
    pub fn update_item(
        &self,
        id: OrderItemId,
        quantity: Option<u32>,
        unit_price_cents: Option<i64>,
    ) -> DomainResult<OrderItem> {
        let mut t = self.inner.write().map_err(|_| DomainError::Unavailable)?;
        let current = t.items.get(&id).cloned().ok_or(DomainError::NotFound)?;

        let quantity = quantity.unwrap_or(current.quantity);
        let unit_price_cents = unit_price_cents.unwrap_or(current.unit_price_cents);
        let new_line = line_total(quantity, unit_price_cents)?;
        let old_line = i64::from(current.quantity) * current.unit_price_cents;

        let order = t
            .orders
            .get_mut(&current.order_id)
            .ok_or(DomainError::NotFound)?;
        order.total_cents = (order.total_cents - old_line)
            .checked_add(new_line)
            .ok_or_else(|| DomainError::validation("order total overflows"))?;

        let item = OrderItem {
            quantity,
            unit_price_cents,
            ..current
        };
        t.items.insert(id, item.clone());
        Ok(item)
    }

    /// Remove one item and take its line off the order total.
    pub fn delete_item(&self, id: OrderItemId) -> DomainResult<()> {
        let mut t = self.inner.write().map_err(|_| DomainError::Unavailable)?;
        let item = t.items.remove(&id).ok_or(DomainError::NotFound)?;
        if let Some(order) = t.orders.get_mut(&item.order_id) {
            order.total_cents -= i64::from(item.quantity) * item.unit_price_cents;
        }
        Ok(())
    }

    pub fn list_items(&self) -> Vec<OrderItem> {
        let Ok(t) = self.inner.read() else {
            return vec![];
        };
        let mut out: Vec<OrderItem> = t.items.values().cloned().collect();
        out.sort_by_key(|i| i.id);
        out
    }

    pub fn items_for_product(&self, product_id: ProductId) -> Vec<OrderItem> {
        let mut out = self.list_items();
        out.retain(|i| i.product_id == product_id);
        out
    }

    pub fn get_item(&self, id: OrderItemId) -> Option<OrderItem> {
        let t = self.inner.read().ok()?;
        t.items.get(&id).cloned()
    }

    pub fn items_for_order(&self, order_id: OrderId) -> Vec<OrderItem> {
        let Ok(t) = self.inner.read() else {
            return vec![];
        };
        let mut out: Vec<OrderItem> = t
            .items
            .values()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect();
        out.sort_by_key(|i| i.id);
        out
    }
}

fn line_total(quantity: u32, unit_price_cents: i64) -> DomainResult<i64> {
    if quantity == 0 {
        return Err(DomainError::validation("quantity must be positive"));
    }
    if unit_price_cents < 0 {
        return Err(DomainError::validation("unit price must not be negative"));
    }
    i64::from(quantity)
        .checked_mul(unit_price_cents)
        .ok_or_else(|| DomainError::validation("line total overflows"))
}
