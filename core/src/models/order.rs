// core/src/models/order.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
  Online,
  Cod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
  Pending,
  Paid,
  Failed,
}

/// Fulfilment state of an order (`status` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryStatus {
  Pending,
  Processing,
  Shipped,
  Delivered,
}

/// Error for status strings that match no known variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
  pub kind: &'static str,
  pub value: String,
}

impl fmt::Display for UnknownVariant {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "unknown {} '{}'", self.kind, self.value)
  }
}

impl std::error::Error for UnknownVariant {}

// Parsing is case-insensitive: query strings arrive as "cod", "Cod" or "COD".
macro_rules! string_enum {
  ($ty:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
    impl $ty {
      pub fn as_str(&self) -> &'static str {
        match self {
          $($ty::$variant => $text,)+
        }
      }
    }

    impl fmt::Display for $ty {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
      }
    }

    impl FromStr for $ty {
      type Err = UnknownVariant;

      fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        $(
          if trimmed.eq_ignore_ascii_case($text) {
            return Ok($ty::$variant);
          }
        )+
        Err(UnknownVariant { kind: $kind, value: s.to_string() })
      }
    }
  };
}

string_enum!(PaymentMethod, "payment method", { Online => "Online", Cod => "Cod" });
string_enum!(PaymentStatus, "payment status", { Pending => "Pending", Paid => "Paid", Failed => "Failed" });
string_enum!(DeliveryStatus, "order status", {
  Pending => "Pending",
  Processing => "Processing",
  Shipped => "Shipped",
  Delivered => "Delivered",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
  pub product_id: Uuid,
  pub name: String,
  pub price: Decimal,
  pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingInfo {
  pub address: String,
  pub city: String,
  pub state: String,
  pub country: String,
  pub pin_code: String,
  #[serde(default)]
  pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  #[serde(rename = "_id")]
  pub id: Uuid,
  pub user_id: Uuid,
  pub order_items: Vec<OrderItem>,
  pub shipping_info: ShippingInfo,
  pub sub_total: Decimal,
  pub tax: Decimal,
  pub discount: Decimal,
  pub shipping_charges: Decimal,
  pub total: Decimal,
  pub payment_method: PaymentMethod,
  pub payment_status: PaymentStatus,
  pub status: DeliveryStatus,
  /// Gateway order most recently opened for this order; callbacks must name it.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub gateway_order_id: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  /// Gateway amount in minor units (paise): `round(total * 100)`.
  pub fn amount_minor_units(&self) -> i64 {
    to_minor_units(self.total)
  }
}

pub fn to_minor_units(amount: Decimal) -> i64 {
  use rust_decimal::prelude::ToPrimitive;
  (amount * Decimal::ONE_HUNDRED)
    .round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
    .to_i64()
    .unwrap_or(i64::MAX)
}

/// Checkout payload as submitted by the client. Every field is optional so
/// that validation can report all missing fields at once.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
  pub order_items: Option<Vec<OrderItem>>,
  pub shipping_info: Option<ShippingInfo>,
  #[serde(default)]
  pub sub_total: Decimal,
  #[serde(default)]
  pub tax: Decimal,
  #[serde(default)]
  pub discount: Decimal,
  #[serde(default)]
  pub shipping_charges: Decimal,
  #[serde(default)]
  pub total: Decimal,
  pub payment_method: Option<String>,
}

/// Expected current state for a conditional status update.
#[derive(Debug, Clone)]
pub struct TransitionGuard {
  pub payment_in: Vec<PaymentStatus>,
  pub status_in: Vec<DeliveryStatus>,
}

/// Target state for a conditional status update.
#[derive(Debug, Clone, Copy)]
pub struct Transition {
  pub payment_status: PaymentStatus,
  pub status: DeliveryStatus,
  pub payment_method: Option<PaymentMethod>,
}

impl TransitionGuard {
  pub fn matches(&self, order: &Order) -> bool {
    self.payment_in.contains(&order.payment_status) && self.status_in.contains(&order.status)
  }
}
