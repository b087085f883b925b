// core/src/services/gateway_mock.rs

//! In-process stand-in for the Razorpay API. Orders it creates and payments
//! registered through `capture`/`decline` are kept in memory so tests and
//! local runs can drive the verification flow end to end.

use super::signature::compute_signature;
use crate::error::{CommerceError, CommerceResult};
use crate::ports::{GatewayOrder, GatewayOrderRequest, GatewayPayment, PaymentGateway};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Callback values the checkout widget would hand back to the client.
#[derive(Debug, Clone)]
pub struct CheckoutCallback {
  pub gateway_order_id: String,
  pub payment_id: String,
  pub signature: String,
}

#[derive(Debug)]
pub struct MockGateway {
  key_id: String,
  key_secret: String,
  created: RwLock<Vec<GatewayOrderRequest>>,
  amounts: RwLock<HashMap<String, i64>>,
  payments: RwLock<HashMap<String, GatewayPayment>>,
  create_failure: RwLock<Option<String>>,
}

impl MockGateway {
  pub fn new(key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
    Self {
      key_id: key_id.into(),
      key_secret: key_secret.into(),
      created: RwLock::new(Vec::new()),
      amounts: RwLock::new(HashMap::new()),
      payments: RwLock::new(HashMap::new()),
      create_failure: RwLock::new(None),
    }
  }

  /// Makes every following `create_order` fail with `message` (or succeed again with `None`).
  pub fn fail_order_creation(&self, message: Option<&str>) {
    *self.create_failure.write() = message.map(str::to_string);
  }

  pub fn created_orders(&self) -> Vec<GatewayOrderRequest> {
    self.created.read().clone()
  }

  /// Registers a captured payment of the full gateway order amount and signs it.
  pub fn capture(&self, gateway_order_id: &str) -> CommerceResult<CheckoutCallback> {
    let amount = self.amounts.read().get(gateway_order_id).copied().unwrap_or_default();
    self.register_payment(gateway_order_id, amount, "captured", None)
  }

  /// Registers a captured payment of `amount` paise regardless of what the order asked for.
  pub fn capture_amount(&self, gateway_order_id: &str, amount: i64) -> CommerceResult<CheckoutCallback> {
    self.register_payment(gateway_order_id, amount, "captured", None)
  }

  /// Registers a payment that never reached `captured`.
  pub fn decline(&self, gateway_order_id: &str, reason: &str) -> CommerceResult<CheckoutCallback> {
    let amount = self.amounts.read().get(gateway_order_id).copied().unwrap_or_default();
    self.register_payment(gateway_order_id, amount, "failed", Some(reason))
  }

  fn register_payment(
    &self,
    gateway_order_id: &str,
    amount: i64,
    status: &str,
    reason: Option<&str>,
  ) -> CommerceResult<CheckoutCallback> {
    let payment_id = format!("pay_{}", Uuid::new_v4().simple());
    let signature = compute_signature(&self.key_secret, gateway_order_id, &payment_id)?;
    self.payments.write().insert(
      payment_id.clone(),
      GatewayPayment {
        id: payment_id.clone(),
        status: status.to_string(),
        amount,
        order_id: Some(gateway_order_id.to_string()),
        error_reason: reason.map(str::to_string),
        error_description: None,
      },
    );
    Ok(CheckoutCallback {
      gateway_order_id: gateway_order_id.to_string(),
      payment_id,
      signature,
    })
  }
}

#[async_trait]
impl PaymentGateway for MockGateway {
  fn key_id(&self) -> &str {
    &self.key_id
  }

  #[instrument(name = "mock_gateway::create_order", skip(self, request), fields(amount = request.amount))]
  async fn create_order(&self, request: GatewayOrderRequest) -> CommerceResult<GatewayOrder> {
    if let Some(message) = self.create_failure.read().clone() {
      warn!(%message, "Simulated gateway order failure.");
      return Err(CommerceError::Gateway(message));
    }
    let order = GatewayOrder {
      id: format!("order_{}", Uuid::new_v4().simple()),
      amount: request.amount,
      currency: request.currency.clone(),
      receipt: Some(request.receipt.clone()),
    };
    self.amounts.write().insert(order.id.clone(), order.amount);
    self.created.write().push(request);
    info!(gateway_order_id = %order.id, "Mock gateway order created.");
    Ok(order)
  }

  async fn fetch_payment(&self, payment_id: &str) -> CommerceResult<GatewayPayment> {
    self
      .payments
      .read()
      .get(payment_id)
      .cloned()
      .ok_or_else(|| CommerceError::Gateway(format!("Payment fetch failed: no payment {}", payment_id)))
  }
}
