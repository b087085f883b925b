// core/src/ports.rs

//! Seams to everything outside the domain: persistence, the payment gateway,
//! SMS/email delivery and the clock. Adapters live in `crate::memory`,
//! `crate::services` (test doubles) and the server crate (Postgres, Razorpay).

use crate::error::CommerceResult;
use crate::models::{
  DeliveryStatus, Order, OrderFilter, OrderPage, OtpChannel, OtpRecord, PageRequest, PaymentStatus, Product,
  Transition, TransitionGuard,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[async_trait]
pub trait OrderStore: Send + Sync {
  async fn insert(&self, order: Order) -> CommerceResult<Order>;

  async fn get(&self, id: Uuid) -> CommerceResult<Option<Order>>;

  /// Newest first. `total_items` in the returned page counts the filtered set.
  async fn list(&self, filter: &OrderFilter, page: PageRequest) -> CommerceResult<OrderPage>;

  /// Applies `to` only if the stored order still satisfies `guard`, in one
  /// atomic step. Returns `None` when the order is missing or the guard failed.
  async fn transition(&self, id: Uuid, guard: &TransitionGuard, to: Transition) -> CommerceResult<Option<Order>>;

  async fn set_payment_status(&self, id: Uuid, status: PaymentStatus) -> CommerceResult<Option<Order>>;

  async fn set_delivery_status(&self, id: Uuid, status: DeliveryStatus) -> CommerceResult<Option<Order>>;

  async fn set_gateway_order(&self, id: Uuid, gateway_order_id: &str) -> CommerceResult<Option<Order>>;

  /// Returns `false` when nothing was deleted.
  async fn delete(&self, id: Uuid) -> CommerceResult<bool>;
}

#[async_trait]
pub trait ProductStore: Send + Sync {
  async fn get(&self, id: Uuid) -> CommerceResult<Option<Product>>;

  /// Atomically subtracts `quantity` from the product's stock.
  /// Fails with `CommerceError::NotFound` for an unknown product.
  async fn decrement_stock(&self, id: Uuid, quantity: u32) -> CommerceResult<()>;
}

#[async_trait]
pub trait OtpStore: Send + Sync {
  async fn insert(&self, record: OtpRecord) -> CommerceResult<()>;

  /// Most recently created record for the channel, consumed or not.
  async fn latest(&self, channel: &OtpChannel) -> CommerceResult<Option<OtpRecord>>;

  async fn count_since(&self, channel: &OtpChannel, since: DateTime<Utc>) -> CommerceResult<u64>;

  /// Marks the record consumed. Returns `false` if it was already consumed.
  async fn consume(&self, id: Uuid, at: DateTime<Utc>) -> CommerceResult<bool>;

  /// Atomically counts one more verification attempt and returns the new
  /// total, or `None` for an unknown record.
  async fn record_attempt(&self, id: Uuid) -> CommerceResult<Option<u32>>;
}

#[derive(Debug, Clone, Serialize)]
pub struct GatewayOrderRequest {
  /// Minor currency units (paise).
  pub amount: i64,
  pub currency: String,
  pub receipt: String,
  pub notes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrder {
  pub id: String,
  pub amount: i64,
  pub currency: String,
  #[serde(default)]
  pub receipt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPayment {
  pub id: String,
  pub status: String,
  /// Minor currency units (paise).
  #[serde(default)]
  pub amount: i64,
  #[serde(default)]
  pub order_id: Option<String>,
  #[serde(default)]
  pub error_reason: Option<String>,
  #[serde(default)]
  pub error_description: Option<String>,
}

impl GatewayPayment {
  pub fn is_captured(&self) -> bool {
    self.status == "captured"
  }

  pub fn failure_reason(&self) -> String {
    self
      .error_reason
      .clone()
      .or_else(|| self.error_description.clone())
      .unwrap_or_else(|| "Payment not captured".to_string())
  }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  /// Public key id handed to the checkout widget.
  fn key_id(&self) -> &str;

  async fn create_order(&self, request: GatewayOrderRequest) -> CommerceResult<GatewayOrder>;

  async fn fetch_payment(&self, payment_id: &str) -> CommerceResult<GatewayPayment>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
  async fn send_otp(&self, channel: &OtpChannel, code: &str, valid_for_minutes: i64) -> CommerceResult<()>;

  async fn send_order_confirmation(&self, channel: &OtpChannel, order: &Order) -> CommerceResult<()>;
}

pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock(parking_lot::RwLock<DateTime<Utc>>);

impl ManualClock {
  pub fn new(start: DateTime<Utc>) -> Self {
    Self(parking_lot::RwLock::new(start))
  }

  pub fn advance(&self, by: chrono::Duration) {
    *self.0.write() += by;
  }

  pub fn set(&self, to: DateTime<Utc>) {
    *self.0.write() = to;
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    *self.0.read()
  }
}
