// core/src/flows/payment_verification.rs

//! Checkout callback handling. Every failure after the order is located marks
//! it `Failed` before the error is returned, so the client always observes a
//! settled order state.
//!
//! A callback only pays for the order it was opened for: the gateway order it
//! names must be the one bound to the order, the fetched payment must belong
//! to that gateway order and the captured amount must equal the order total.

use crate::error::CommerceError;
use crate::flows::contexts::PaymentVerificationCtx;
use crate::pipeline::{ContextData, Pipeline, PipelineControl};
use crate::services::signature::verify_signature;
use tracing::{info, warn};
use uuid::Uuid;

async fn fail_order(ctx: &ContextData<PaymentVerificationCtx>, order_id: Uuid, err: CommerceError) -> CommerceError {
  let lifecycle = ctx.snapshot(|c| c.services.lifecycle.clone());
  warn!(%order_id, error = %err, "Payment verification failed; marking order failed.");
  match lifecycle.mark_failed(order_id).await {
    Ok(_) => err,
    Err(mark_err) => mark_err,
  }
}

pub fn payment_verification_flow() -> Pipeline<PaymentVerificationCtx, CommerceError> {
  let mut p = Pipeline::<PaymentVerificationCtx, CommerceError>::new(
    "payment_verification",
    &[
      ("load_order", false, None),
      ("verify_signature", false, None),
      ("match_gateway_order", false, None),
      ("fetch_payment", false, None),
      ("mark_paid", false, None),
    ],
  );

  p.on_step("load_order", |ctx: ContextData<PaymentVerificationCtx>| async move {
    let (lifecycle, order_id) = ctx.snapshot(|c| (c.services.lifecycle.clone(), c.order_id));
    let order = lifecycle.get(order_id).await?;
    ctx.write().order = Some(order);
    Ok::<_, CommerceError>(PipelineControl::Continue)
  });

  p.on_step("verify_signature", |ctx: ContextData<PaymentVerificationCtx>| async move {
    let (order_id, checked) = ctx.snapshot(|c| {
      (
        c.order_id,
        verify_signature(
          &c.services.settings.gateway_key_secret,
          &c.gateway_order_id,
          &c.payment_id,
          &c.signature,
        ),
      )
    });
    if let Err(e) = checked {
      return Err(fail_order(&ctx, order_id, e).await);
    }
    Ok::<_, CommerceError>(PipelineControl::Continue)
  });

  p.on_step("match_gateway_order", |ctx: ContextData<PaymentVerificationCtx>| async move {
    let (order_id, claimed, bound) = ctx.snapshot(|c| {
      (
        c.order_id,
        c.gateway_order_id.clone(),
        c.order.as_ref().and_then(|o| o.gateway_order_id.clone()),
      )
    });
    if bound.as_deref() != Some(claimed.as_str()) {
      warn!(%order_id, %claimed, bound = ?bound, "Callback names a gateway order not opened for this order.");
      let err = CommerceError::PaymentMismatch("gateway order was not opened for this order".to_string());
      return Err(fail_order(&ctx, order_id, err).await);
    }
    Ok::<_, CommerceError>(PipelineControl::Continue)
  });

  p.on_step("fetch_payment", |ctx: ContextData<PaymentVerificationCtx>| async move {
    let (gateway, order_id, payment_id, gateway_order_id, expected_amount) = ctx.snapshot(|c| {
      (
        c.services.gateway.clone(),
        c.order_id,
        c.payment_id.clone(),
        c.gateway_order_id.clone(),
        c.order.as_ref().map(|o| o.amount_minor_units()),
      )
    });
    let payment = match gateway.fetch_payment(&payment_id).await {
      Ok(payment) => payment,
      Err(e) => return Err(fail_order(&ctx, order_id, e).await),
    };
    if payment.order_id.as_deref() != Some(gateway_order_id.as_str()) {
      warn!(%order_id, %payment_id, paid_for = ?payment.order_id, "Payment belongs to another gateway order.");
      let err = CommerceError::PaymentMismatch("payment was made against another gateway order".to_string());
      return Err(fail_order(&ctx, order_id, err).await);
    }
    if !payment.is_captured() {
      let reason = payment.failure_reason();
      info!(%order_id, %payment_id, status = %payment.status, "Payment not captured.");
      return Err(fail_order(&ctx, order_id, CommerceError::PaymentNotCaptured(reason)).await);
    }
    if Some(payment.amount) != expected_amount {
      warn!(%order_id, %payment_id, captured = payment.amount, expected = ?expected_amount, "Captured amount differs from order total.");
      let err = CommerceError::PaymentMismatch(format!("captured {} paise", payment.amount));
      return Err(fail_order(&ctx, order_id, err).await);
    }
    ctx.write().payment = Some(payment);
    Ok::<_, CommerceError>(PipelineControl::Continue)
  });

  p.on_step("mark_paid", |ctx: ContextData<PaymentVerificationCtx>| async move {
    let (lifecycle, order_id) = ctx.snapshot(|c| (c.services.lifecycle.clone(), c.order_id));
    let order = lifecycle.mark_paid(order_id).await?;
    info!(%order_id, "Payment successful.");
    ctx.write().updated_order = Some(order);
    Ok::<_, CommerceError>(PipelineControl::Continue)
  });

  p
}
