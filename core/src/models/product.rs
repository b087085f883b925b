// core/src/models/product.rs

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// The slice of a catalogue product the order flows touch: its stock counter.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: Uuid,
  pub name: String,
  pub price: Decimal,
  pub stock: i64,
}
