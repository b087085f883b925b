// core/src/services/lifecycle.rs

//! `OrderLifecycle`: the only code that moves an order's payment and delivery
//! status, and the only caller of stock reduction.
//!
//! Status changes that reduce stock go through `OrderStore::transition`, a
//! conditional update. Two concurrent confirmations of the same order race on
//! that update and exactly one of them reduces stock.

use crate::error::{CommerceError, CommerceResult};
use crate::models::{
  DeliveryStatus, NewOrder, Order, OrderFilter, OrderItem, OrderPage, PageRequest, PaymentMethod, PaymentStatus,
  Transition, TransitionGuard,
};
use crate::ports::{Clock, OrderStore, ProductStore};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct OrderLifecycle {
  orders: Arc<dyn OrderStore>,
  products: Arc<dyn ProductStore>,
  clock: Arc<dyn Clock>,
}

/// States from which an order may still be confirmed (paid online or COD-verified).
fn awaiting_confirmation() -> TransitionGuard {
  TransitionGuard {
    payment_in: vec![PaymentStatus::Pending, PaymentStatus::Failed],
    status_in: vec![DeliveryStatus::Pending],
  }
}

impl OrderLifecycle {
  pub fn new(orders: Arc<dyn OrderStore>, products: Arc<dyn ProductStore>, clock: Arc<dyn Clock>) -> Self {
    Self { orders, products, clock }
  }

  /// Validates a checkout payload and stores it as `(Pending, Pending)`.
  /// Stock is left untouched.
  #[instrument(name = "lifecycle::create_pending_order", skip(self, new_order), fields(%user_id), err(Display))]
  pub async fn create_pending_order(&self, user_id: Uuid, new_order: NewOrder) -> CommerceResult<Order> {
    let mut missing = Vec::new();
    let items = new_order.order_items.filter(|items| !items.is_empty());
    if new_order.shipping_info.is_none() {
      missing.push("shippingInfo is required");
    }
    if items.is_none() {
      missing.push("orderItems is required");
    }
    let method_raw = new_order
      .payment_method
      .as_deref()
      .map(str::trim)
      .filter(|m| !m.is_empty());
    if method_raw.is_none() {
      missing.push("paymentMethod is required");
    }
    if !missing.is_empty() {
      return Err(CommerceError::Validation(format!(
        "Order validation failed: {}",
        missing.join(", ")
      )));
    }

    let payment_method: PaymentMethod = method_raw
      .unwrap_or_default()
      .parse()
      .map_err(|e| CommerceError::Validation(format!("Order validation failed: {}", e)))?;
    let order_items = items.unwrap_or_default();
    if let Some(bad) = order_items.iter().find(|item| item.quantity == 0) {
      return Err(CommerceError::Validation(format!(
        "Order validation failed: quantity for '{}' must be at least 1",
        bad.name
      )));
    }
    let Some(shipping_info) = new_order.shipping_info else {
      return Err(CommerceError::Validation("Order validation failed: shippingInfo is required".to_string()));
    };

    let now = self.clock.now();
    let order = Order {
      id: Uuid::new_v4(),
      user_id,
      order_items,
      shipping_info,
      sub_total: new_order.sub_total,
      tax: new_order.tax,
      discount: new_order.discount,
      shipping_charges: new_order.shipping_charges,
      total: new_order.total,
      payment_method,
      payment_status: PaymentStatus::Pending,
      status: DeliveryStatus::Pending,
      gateway_order_id: None,
      created_at: now,
      updated_at: now,
    };
    let order = self.orders.insert(order).await?;
    info!(order_id = %order.id, method = %order.payment_method, total = %order.total, "Pending order created.");
    Ok(order)
  }

  pub async fn get(&self, order_id: Uuid) -> CommerceResult<Order> {
    self
      .orders
      .get(order_id)
      .await?
      .ok_or_else(|| CommerceError::not_found("Order"))
  }

  pub async fn list(&self, filter: &OrderFilter, page: PageRequest) -> CommerceResult<OrderPage> {
    self.orders.list(filter, page).await
  }

  /// Online payment captured: `(Paid, Processing)` and stock reduced, once.
  #[instrument(name = "lifecycle::mark_paid", skip(self), err(Display))]
  pub async fn mark_paid(&self, order_id: Uuid) -> CommerceResult<Order> {
    let to = Transition {
      payment_status: PaymentStatus::Paid,
      status: DeliveryStatus::Processing,
      payment_method: None,
    };
    self.confirm(order_id, to).await
  }

  /// COD verified: `(Pending, Processing)` since cash is collected on
  /// delivery. The method is pinned to `Cod` and stock is reduced, once.
  #[instrument(name = "lifecycle::confirm_cod_order", skip(self), err(Display))]
  pub async fn confirm_cod_order(&self, order_id: Uuid) -> CommerceResult<Order> {
    let to = Transition {
      payment_status: PaymentStatus::Pending,
      status: DeliveryStatus::Processing,
      payment_method: Some(PaymentMethod::Cod),
    };
    self.confirm(order_id, to).await
  }

  async fn confirm(&self, order_id: Uuid, to: Transition) -> CommerceResult<Order> {
    match self.orders.transition(order_id, &awaiting_confirmation(), to).await? {
      Some(order) => {
        info!(%order_id, payment_status = %order.payment_status, status = %order.status, "Order confirmed; reducing stock.");
        self.reduce_stock(&order.order_items).await?;
        Ok(order)
      }
      None => {
        // Lost the race or already confirmed: report the current state, leave stock alone.
        let current = self.get(order_id).await?;
        info!(%order_id, payment_status = %current.payment_status, status = %current.status, "Order already past confirmation; no stock change.");
        Ok(current)
      }
    }
  }

  /// Payment or verification failed: `payment_status = Failed`, delivery
  /// status stays `Pending`. No-op for failed, paid or in-fulfilment orders.
  #[instrument(name = "lifecycle::mark_failed", skip(self), err(Display))]
  pub async fn mark_failed(&self, order_id: Uuid) -> CommerceResult<Order> {
    let guard = TransitionGuard {
      payment_in: vec![PaymentStatus::Pending],
      status_in: vec![DeliveryStatus::Pending],
    };
    let to = Transition {
      payment_status: PaymentStatus::Failed,
      status: DeliveryStatus::Pending,
      payment_method: None,
    };
    match self.orders.transition(order_id, &guard, to).await? {
      Some(order) => {
        warn!(%order_id, "Order payment marked failed.");
        Ok(order)
      }
      None => self.get(order_id).await,
    }
  }

  /// Decrements each product in order. A failure part-way leaves earlier
  /// decrements in place.
  pub async fn reduce_stock(&self, items: &[OrderItem]) -> CommerceResult<()> {
    for item in items {
      self.products.decrement_stock(item.product_id, item.quantity).await?;
    }
    Ok(())
  }

  /// Binds the order to the gateway order opened for it. A later gateway
  /// order replaces the binding.
  #[instrument(name = "lifecycle::bind_gateway_order", skip(self), err(Display))]
  pub async fn bind_gateway_order(&self, order_id: Uuid, gateway_order_id: &str) -> CommerceResult<Order> {
    self
      .orders
      .set_gateway_order(order_id, gateway_order_id)
      .await?
      .ok_or_else(|| CommerceError::not_found("Order"))
  }

  #[instrument(name = "lifecycle::set_delivery_status", skip(self), err(Display))]
  pub async fn set_delivery_status(&self, order_id: Uuid, status: DeliveryStatus) -> CommerceResult<Order> {
    self
      .orders
      .set_delivery_status(order_id, status)
      .await?
      .ok_or_else(|| CommerceError::not_found("Order"))
  }

  #[instrument(name = "lifecycle::set_payment_status", skip(self), err(Display))]
  pub async fn set_payment_status(&self, order_id: Uuid, status: PaymentStatus) -> CommerceResult<Order> {
    self
      .orders
      .set_payment_status(order_id, status)
      .await?
      .ok_or_else(|| CommerceError::not_found("Order"))
  }

  #[instrument(name = "lifecycle::delete_order", skip(self), err(Display))]
  pub async fn delete_order(&self, order_id: Uuid) -> CommerceResult<()> {
    if self.orders.delete(order_id).await? {
      info!(%order_id, "Order deleted.");
      Ok(())
    } else {
      Err(CommerceError::not_found("Order"))
    }
  }
}
