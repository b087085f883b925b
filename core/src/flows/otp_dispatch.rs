// core/src/flows/otp_dispatch.rs

//! Issuing a COD one-time password: limits first, then generate, deliver and
//! only then persist, so a failed delivery leaves no record behind and does
//! not start the cooldown.

use crate::error::CommerceError;
use crate::flows::contexts::OtpDispatchCtx;
use crate::models::OtpRecord;
use crate::pipeline::{ContextData, Pipeline, PipelineControl};
use crate::services::otp_codes::{generate_code, hash_code_blocking};
use tracing::{info, warn};
use uuid::Uuid;

pub fn otp_dispatch_flow() -> Pipeline<OtpDispatchCtx, CommerceError> {
  let mut p = Pipeline::<OtpDispatchCtx, CommerceError>::new(
    "otp_dispatch",
    &[
      ("enforce_send_limits", false, None),
      ("generate_code", false, None),
      ("deliver_code", false, None),
      ("persist_record", false, None),
    ],
  );

  p.on_step("enforce_send_limits", |ctx: ContextData<OtpDispatchCtx>| async move {
    let (services, channel) = ctx.snapshot(|c| (c.services.clone(), c.channel.clone()));
    let policy = &services.settings.otp;
    let now = services.clock.now();

    let recent = services.otps.count_since(&channel, now - policy.window).await?;
    if recent >= u64::from(policy.max_sends_per_window) {
      warn!(%channel, recent, "OTP send limit reached.");
      return Err(CommerceError::RateLimited {
        max_sends: policy.max_sends_per_window,
        window_hours: policy.window.num_hours(),
      });
    }

    if let Some(latest) = services.otps.latest(&channel).await? {
      let resend_at = latest.created_at + policy.resend_cooldown;
      if now < resend_at {
        let remaining_ms = (resend_at - now).num_milliseconds();
        let retry_after_secs = (remaining_ms + 999) / 1000;
        info!(%channel, retry_after_secs, "OTP resend requested during cooldown.");
        return Err(CommerceError::CooldownActive { retry_after_secs });
      }
    }

    ctx.write().requested_at = Some(now);
    Ok::<_, CommerceError>(PipelineControl::Continue)
  });

  p.on_step("generate_code", |ctx: ContextData<OtpDispatchCtx>| async move {
    let length = ctx.snapshot(|c| c.services.settings.otp.code_length);
    let code = generate_code(length);
    let code_hash = hash_code_blocking(code.clone()).await?;
    let mut guard = ctx.write();
    guard.code = Some(code);
    guard.code_hash = Some(code_hash);
    Ok::<_, CommerceError>(PipelineControl::Continue)
  });

  p.on_step("deliver_code", |ctx: ContextData<OtpDispatchCtx>| async move {
    let (notifier, channel, code, ttl_minutes) = ctx.snapshot(|c| {
      (
        c.services.notifier.clone(),
        c.channel.clone(),
        c.code.clone().unwrap_or_default(),
        c.services.settings.otp.ttl.num_minutes(),
      )
    });
    notifier.send_otp(&channel, &code, ttl_minutes).await.map_err(|e| match e {
      CommerceError::Notification(_) => e,
      other => CommerceError::Notification(other.to_string()),
    })?;
    ctx.write().code = None;
    info!(%channel, "OTP delivered.");
    Ok::<_, CommerceError>(PipelineControl::Continue)
  });

  p.on_step("persist_record", |ctx: ContextData<OtpDispatchCtx>| async move {
    let (services, record) = ctx.snapshot(|c| {
      let created_at = c.requested_at.unwrap_or_else(|| c.services.clock.now());
      let record = OtpRecord {
        id: Uuid::new_v4(),
        channel: c.channel.clone(),
        code_hash: c.code_hash.clone().unwrap_or_default(),
        user_id: c.user_id,
        created_at,
        expires_at: created_at + c.services.settings.otp.ttl,
        consumed_at: None,
        attempts: 0,
      };
      (c.services.clone(), record)
    });
    if record.code_hash.is_empty() {
      return Err(CommerceError::Store("OTP hash missing before persist".to_string()));
    }
    services.otps.insert(record.clone()).await?;
    ctx.write().record = Some(record);
    Ok::<_, CommerceError>(PipelineControl::Continue)
  });

  p
}
