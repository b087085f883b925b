// core/src/memory.rs

//! In-process store used by the tests and by the server when no database is
//! configured. Each operation takes the lock once, so conditional transitions
//! and stock decrements are atomic with respect to each other.

use crate::error::{CommerceError, CommerceResult};
use crate::models::{
  DeliveryStatus, Order, OrderFilter, OrderPage, OtpChannel, OtpRecord, PageRequest, PaymentStatus, Product,
  Transition, TransitionGuard,
};
use crate::ports::{Clock, OrderStore, OtpStore, ProductStore, SystemClock};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

pub struct InMemoryStore {
  orders: RwLock<HashMap<Uuid, Order>>,
  products: RwLock<HashMap<Uuid, Product>>,
  otps: RwLock<Vec<OtpRecord>>,
  clock: Arc<dyn Clock>,
}

impl Default for InMemoryStore {
  fn default() -> Self {
    Self {
      orders: RwLock::default(),
      products: RwLock::default(),
      otps: RwLock::default(),
      clock: Arc::new(SystemClock),
    }
  }
}

impl fmt::Debug for InMemoryStore {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("InMemoryStore")
      .field("orders", &self.orders.read().len())
      .field("products", &self.products.read().len())
      .field("otps", &self.otps.read().len())
      .finish_non_exhaustive()
  }
}

impl InMemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Stamps `updated_at` and evaluates date filters against `clock`.
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
    let store = Self::new();
    {
      let mut guard = store.products.write();
      for product in products {
        guard.insert(product.id, product);
      }
    }
    store
  }

  pub fn put_product(&self, product: Product) {
    self.products.write().insert(product.id, product);
  }

  pub fn stock_of(&self, product_id: Uuid) -> Option<i64> {
    self.products.read().get(&product_id).map(|p| p.stock)
  }

  pub fn otp_count(&self) -> usize {
    self.otps.read().len()
  }

  fn update_order(&self, id: Uuid, f: impl FnOnce(&mut Order)) -> Option<Order> {
    let mut orders = self.orders.write();
    let order = orders.get_mut(&id)?;
    f(order);
    order.updated_at = self.clock.now();
    Some(order.clone())
  }
}

#[async_trait]
impl OrderStore for InMemoryStore {
  async fn insert(&self, order: Order) -> CommerceResult<Order> {
    let mut orders = self.orders.write();
    if orders.contains_key(&order.id) {
      return Err(CommerceError::Store(format!("order {} already exists", order.id)));
    }
    orders.insert(order.id, order.clone());
    Ok(order)
  }

  async fn get(&self, id: Uuid) -> CommerceResult<Option<Order>> {
    Ok(self.orders.read().get(&id).cloned())
  }

  async fn list(&self, filter: &OrderFilter, page: PageRequest) -> CommerceResult<OrderPage> {
    let now = self.clock.now();
    let mut matching: Vec<Order> = self
      .orders
      .read()
      .values()
      .filter(|o| filter.matches(o, now))
      .cloned()
      .collect();
    matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let total_items = matching.len() as u64;
    let orders = matching
      .into_iter()
      .skip(page.offset() as usize)
      .take(page.page_size as usize)
      .collect();
    Ok(OrderPage::new(orders, page, total_items))
  }

  async fn transition(&self, id: Uuid, guard: &TransitionGuard, to: Transition) -> CommerceResult<Option<Order>> {
    let mut orders = self.orders.write();
    let Some(order) = orders.get_mut(&id) else {
      return Ok(None);
    };
    if !guard.matches(order) {
      return Ok(None);
    }
    order.payment_status = to.payment_status;
    order.status = to.status;
    if let Some(method) = to.payment_method {
      order.payment_method = method;
    }
    order.updated_at = self.clock.now();
    Ok(Some(order.clone()))
  }

  async fn set_payment_status(&self, id: Uuid, status: PaymentStatus) -> CommerceResult<Option<Order>> {
    Ok(self.update_order(id, |o| o.payment_status = status))
  }

  async fn set_delivery_status(&self, id: Uuid, status: DeliveryStatus) -> CommerceResult<Option<Order>> {
    Ok(self.update_order(id, |o| o.status = status))
  }

  async fn set_gateway_order(&self, id: Uuid, gateway_order_id: &str) -> CommerceResult<Option<Order>> {
    Ok(self.update_order(id, |o| o.gateway_order_id = Some(gateway_order_id.to_string())))
  }

  async fn delete(&self, id: Uuid) -> CommerceResult<bool> {
    Ok(self.orders.write().remove(&id).is_some())
  }
}

#[async_trait]
impl ProductStore for InMemoryStore {
  async fn get(&self, id: Uuid) -> CommerceResult<Option<Product>> {
    Ok(self.products.read().get(&id).cloned())
  }

  async fn decrement_stock(&self, id: Uuid, quantity: u32) -> CommerceResult<()> {
    let mut products = self.products.write();
    let product = products
      .get_mut(&id)
      .ok_or_else(|| CommerceError::not_found(format!("Product {}", id)))?;
    product.stock -= i64::from(quantity);
    Ok(())
  }
}

#[async_trait]
impl OtpStore for InMemoryStore {
  async fn insert(&self, record: OtpRecord) -> CommerceResult<()> {
    self.otps.write().push(record);
    Ok(())
  }

  async fn latest(&self, channel: &OtpChannel) -> CommerceResult<Option<OtpRecord>> {
    Ok(
      self
        .otps
        .read()
        .iter()
        .filter(|r| &r.channel == channel)
        .max_by_key(|r| r.created_at)
        .cloned(),
    )
  }

  async fn count_since(&self, channel: &OtpChannel, since: DateTime<Utc>) -> CommerceResult<u64> {
    Ok(
      self
        .otps
        .read()
        .iter()
        .filter(|r| &r.channel == channel && r.created_at > since)
        .count() as u64,
    )
  }

  async fn consume(&self, id: Uuid, at: DateTime<Utc>) -> CommerceResult<bool> {
    let mut otps = self.otps.write();
    match otps.iter_mut().find(|r| r.id == id) {
      Some(record) if record.consumed_at.is_none() => {
        record.consumed_at = Some(at);
        Ok(true)
      }
      _ => Ok(false),
    }
  }

  async fn record_attempt(&self, id: Uuid) -> CommerceResult<Option<u32>> {
    let mut otps = self.otps.write();
    Ok(otps.iter_mut().find(|r| r.id == id).map(|record| {
      record.attempts += 1;
      record.attempts
    }))
  }
}
