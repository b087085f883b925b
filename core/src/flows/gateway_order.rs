// core/src/flows/gateway_order.rs
use crate::error::CommerceError;
use crate::flows::contexts::GatewayOrderCtx;
use crate::models::order::to_minor_units;
use crate::pipeline::{ContextData, Pipeline, PipelineControl};
use crate::ports::GatewayOrderRequest;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Smallest amount the gateway accepts, in paise.
const MIN_AMOUNT_MINOR: i64 = 100;

pub fn gateway_order_flow() -> Pipeline<GatewayOrderCtx, CommerceError> {
  let mut p = Pipeline::<GatewayOrderCtx, CommerceError>::new(
    "gateway_order",
    &[
      ("load_order", false, None),
      ("resolve_amount", false, None),
      ("create_gateway_order", false, None),
    ],
  );

  p.on_step("load_order", |ctx: ContextData<GatewayOrderCtx>| async move {
    let (lifecycle, order_id) = ctx.snapshot(|c| (c.services.lifecycle.clone(), c.order_id));
    let order = lifecycle.get(order_id).await?;
    ctx.write().order = Some(order);
    Ok::<_, CommerceError>(PipelineControl::Continue)
  });

  p.on_step("resolve_amount", |ctx: ContextData<GatewayOrderCtx>| async move {
    let mut guard = ctx.write();
    let (total, minor) = match &guard.order {
      Some(order) => (order.total, order.amount_minor_units()),
      None => return Err(CommerceError::not_found("Order")),
    };
    if let Some(requested) = guard.requested_amount {
      if to_minor_units(requested) != minor {
        warn!(order_id = %guard.order_id, %requested, %total, "Client amount differs from order total.");
        return Err(CommerceError::Validation(format!(
          "Amount ₹{} does not match order total ₹{}",
          requested, total
        )));
      }
    }
    if minor < MIN_AMOUNT_MINOR {
      return Err(CommerceError::Validation(format!(
        "Amount must be at least ₹1. Got ₹{}.",
        total
      )));
    }
    guard.amount_minor = minor;
    Ok::<_, CommerceError>(PipelineControl::Continue)
  });

  p.on_step("create_gateway_order", |ctx: ContextData<GatewayOrderCtx>| async move {
    let (services, request) = ctx.snapshot(|c| {
      let receipt = c
        .receipt
        .clone()
        .unwrap_or_else(|| format!("rcpt_{}", c.services.clock.now().timestamp_millis()));
      let mut notes = BTreeMap::new();
      notes.insert("orderId".to_string(), c.order_id.to_string());
      let request = GatewayOrderRequest {
        amount: c.amount_minor,
        currency: c.services.settings.currency.clone(),
        receipt,
        notes,
      };
      (c.services.clone(), request)
    });
    let order_id = ctx.snapshot(|c| c.order_id);

    let gateway_order = match services.gateway.create_order(request).await {
      Ok(created) => created,
      Err(e) => {
        warn!(%order_id, error = %e, "Gateway order creation failed; marking order failed.");
        services.lifecycle.mark_failed(order_id).await?;
        return Err(e);
      }
    };
    info!(%order_id, gateway_order_id = %gateway_order.id, amount = gateway_order.amount, "Gateway order created.");
    let order = services.lifecycle.bind_gateway_order(order_id, &gateway_order.id).await?;
    let mut guard = ctx.write();
    guard.order = Some(order);
    guard.gateway_order = Some(gateway_order);
    Ok::<_, CommerceError>(PipelineControl::Continue)
  });

  p
}
