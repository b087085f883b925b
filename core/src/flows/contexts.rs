// core/src/flows/contexts.rs

//! Data each flow runs on. Handlers receive these wrapped in `ContextData`;
//! callers read the outputs back once the flow has completed.

use crate::models::{Order, OtpChannel, OtpRecord};
use crate::ports::{GatewayOrder, GatewayPayment};
use crate::services::CommerceServices;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Clone)]
pub struct GatewayOrderCtx {
  pub services: CommerceServices,
  pub order_id: Uuid,
  /// Amount the client believes it is paying, in rupees.
  pub requested_amount: Option<Decimal>,
  pub receipt: Option<String>,

  pub order: Option<Order>,
  pub amount_minor: i64,
  pub gateway_order: Option<GatewayOrder>,
}

impl GatewayOrderCtx {
  pub fn new(services: CommerceServices, order_id: Uuid, requested_amount: Option<Decimal>, receipt: Option<String>) -> Self {
    Self {
      services,
      order_id,
      requested_amount,
      receipt,
      order: None,
      amount_minor: 0,
      gateway_order: None,
    }
  }
}

#[derive(Clone)]
pub struct PaymentVerificationCtx {
  pub services: CommerceServices,
  pub order_id: Uuid,
  pub gateway_order_id: String,
  pub payment_id: String,
  pub signature: String,

  pub order: Option<Order>,
  pub payment: Option<GatewayPayment>,
  pub updated_order: Option<Order>,
}

impl PaymentVerificationCtx {
  pub fn new(
    services: CommerceServices,
    order_id: Uuid,
    gateway_order_id: String,
    payment_id: String,
    signature: String,
  ) -> Self {
    Self {
      services,
      order_id,
      gateway_order_id,
      payment_id,
      signature,
      order: None,
      payment: None,
      updated_order: None,
    }
  }
}

#[derive(Clone)]
pub struct OtpDispatchCtx {
  pub services: CommerceServices,
  pub channel: OtpChannel,
  pub user_id: Option<Uuid>,

  pub requested_at: Option<DateTime<Utc>>,
  /// Plaintext code; cleared once delivered.
  pub code: Option<String>,
  pub code_hash: Option<String>,
  pub record: Option<OtpRecord>,
}

impl OtpDispatchCtx {
  pub fn new(services: CommerceServices, channel: OtpChannel, user_id: Option<Uuid>) -> Self {
    Self {
      services,
      channel,
      user_id,
      requested_at: None,
      code: None,
      code_hash: None,
      record: None,
    }
  }
}

#[derive(Clone)]
pub struct CodVerificationCtx {
  pub services: CommerceServices,
  pub channel: OtpChannel,
  pub code: String,
  pub order_id: Uuid,

  pub record: Option<OtpRecord>,
  pub updated_order: Option<Order>,
  pub confirmation_sent: bool,
}

impl CodVerificationCtx {
  pub fn new(services: CommerceServices, channel: OtpChannel, code: String, order_id: Uuid) -> Self {
    Self {
      services,
      channel,
      code,
      order_id,
      record: None,
      updated_order: None,
      confirmation_sent: false,
    }
  }
}
