// core/src/flows/cod_verification.rs
use crate::error::CommerceError;
use crate::flows::contexts::CodVerificationCtx;
use crate::pipeline::{ContextData, Pipeline, PipelineControl};
use crate::services::otp_codes::verify_code_blocking;
use tracing::{info, warn};
use uuid::Uuid;

async fn fail_order(ctx: &ContextData<CodVerificationCtx>, order_id: Uuid, err: CommerceError) -> CommerceError {
  let lifecycle = ctx.snapshot(|c| c.services.lifecycle.clone());
  warn!(%order_id, error = %err, "COD verification failed; marking order failed.");
  match lifecycle.mark_failed(order_id).await {
    Ok(_) => err,
    Err(mark_err) => mark_err,
  }
}

pub fn cod_verification_flow() -> Pipeline<CodVerificationCtx, CommerceError> {
  let mut p = Pipeline::<CodVerificationCtx, CommerceError>::new(
    "cod_verification",
    &[
      ("load_order", false, None),
      ("load_latest_code", false, None),
      ("check_code", false, None),
      ("confirm_order", false, None),
      ("send_confirmation", true, None),
    ],
  );

  p.on_step("load_order", |ctx: ContextData<CodVerificationCtx>| async move {
    let (lifecycle, order_id) = ctx.snapshot(|c| (c.services.lifecycle.clone(), c.order_id));
    lifecycle.get(order_id).await?;
    Ok::<_, CommerceError>(PipelineControl::Continue)
  });

  p.on_step("load_latest_code", |ctx: ContextData<CodVerificationCtx>| async move {
    let (otps, channel, order_id) = ctx.snapshot(|c| (c.services.otps.clone(), c.channel.clone(), c.order_id));
    match otps.latest(&channel).await? {
      Some(record) => {
        ctx.write().record = Some(record);
        Ok::<_, CommerceError>(PipelineControl::Continue)
      }
      None => Err(fail_order(&ctx, order_id, CommerceError::not_found("OTP")).await),
    }
  });

  p.on_step("check_code", |ctx: ContextData<CodVerificationCtx>| async move {
    let (services, record, code, order_id) =
      ctx.snapshot(|c| (c.services.clone(), c.record.clone(), c.code.clone(), c.order_id));
    let Some(record) = record else {
      return Err(CommerceError::not_found("OTP"));
    };
    let now = services.clock.now();

    if record.is_consumed() || record.is_expired(now) {
      info!(%order_id, channel = %record.channel, consumed = record.is_consumed(), "OTP rejected.");
      return Err(fail_order(&ctx, order_id, CommerceError::InvalidOtp).await);
    }

    // Counted before the hash check so concurrent guesses share one budget.
    let max_attempts = services.settings.otp.max_verify_attempts;
    let attempts = services.otps.record_attempt(record.id).await?.unwrap_or(u32::MAX);
    if attempts > max_attempts {
      warn!(%order_id, channel = %record.channel, attempts, "OTP attempt limit exceeded.");
      return Err(fail_order(&ctx, order_id, CommerceError::InvalidOtp).await);
    }
    if !verify_code_blocking(record.code_hash.clone(), code).await? {
      info!(%order_id, channel = %record.channel, attempts, "OTP mismatch.");
      return Err(fail_order(&ctx, order_id, CommerceError::InvalidOtp).await);
    }

    // Another request consumed the same record first; it owns the confirmation.
    if !services.otps.consume(record.id, now).await? {
      return Err(CommerceError::InvalidOtp);
    }
    Ok::<_, CommerceError>(PipelineControl::Continue)
  });

  p.on_step("confirm_order", |ctx: ContextData<CodVerificationCtx>| async move {
    let (lifecycle, order_id) = ctx.snapshot(|c| (c.services.lifecycle.clone(), c.order_id));
    let order = lifecycle.confirm_cod_order(order_id).await?;
    info!(%order_id, "COD confirmed successfully.");
    ctx.write().updated_order = Some(order);
    Ok::<_, CommerceError>(PipelineControl::Continue)
  });

  p.on_step("send_confirmation", |ctx: ContextData<CodVerificationCtx>| async move {
    let (notifier, channel, order) =
      ctx.snapshot(|c| (c.services.notifier.clone(), c.channel.clone(), c.updated_order.clone()));
    let Some(order) = order else {
      return Ok::<_, CommerceError>(PipelineControl::Continue);
    };
    match notifier.send_order_confirmation(&channel, &order).await {
      Ok(()) => {
        ctx.write().confirmation_sent = true;
      }
      Err(e) => warn!(order_id = %order.id, error = %e, "Order confirmation message not delivered."),
    }
    Ok::<_, CommerceError>(PipelineControl::Continue)
  });

  p
}
