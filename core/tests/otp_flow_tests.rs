// tests/otp_flow_tests.rs
mod common;

use chrono::Duration;
use common::*;
use storefront_core::models::{DeliveryStatus, OtpChannel, PaymentMethod, PaymentStatus};
use storefront_core::{CodVerificationCtx, CommerceError, ContextData, OtpDispatchCtx};
use uuid::Uuid;

fn phone() -> OtpChannel {
  OtpChannel::Phone("9876543210".to_string())
}

async fn send(h: &Harness, channel: &OtpChannel) -> Result<(), CommerceError> {
  let ctx = ContextData::new(OtpDispatchCtx::new(h.services.clone(), channel.clone(), None));
  h.flows.run(ctx).await.map(|_| ())
}

async fn verify(h: &Harness, channel: &OtpChannel, code: &str, order_id: Uuid) -> Result<ContextData<CodVerificationCtx>, CommerceError> {
  let ctx = ContextData::new(CodVerificationCtx::new(
    h.services.clone(),
    channel.clone(),
    code.to_string(),
    order_id,
  ));
  h.flows.run(ctx.clone()).await?;
  Ok(ctx)
}

fn wrong_code(code: &str) -> String {
  code
    .chars()
    .map(|c| if c == '9' { '0' } else { char::from(c as u8 + 1) })
    .collect()
}

#[tokio::test]
async fn sent_code_is_six_digits_and_stored_hashed() {
  let h = Harness::new();
  let ctx = ContextData::new(OtpDispatchCtx::new(h.services.clone(), phone(), Some(Uuid::new_v4())));
  h.flows.run(ctx.clone()).await.unwrap();

  let code = h.notifier.last_code_for(&phone()).unwrap();
  assert_eq!(code.len(), 6);
  assert!(code.chars().all(|c| c.is_ascii_digit()));
  assert_eq!(h.notifier.sent_otps()[0].valid_for_minutes, 5);

  let guard = ctx.read();
  let record = guard.record.as_ref().unwrap();
  assert!(guard.code.is_none());
  assert_ne!(record.code_hash, code);
  assert!(record.code_hash.starts_with("$argon2"));
  assert_eq!(record.expires_at - record.created_at, Duration::minutes(5));
}

#[tokio::test]
async fn resend_inside_cooldown_is_rejected_then_allowed() {
  let h = Harness::new();
  send(&h, &phone()).await.unwrap();

  h.clock.advance(Duration::seconds(20));
  match send(&h, &phone()).await.unwrap_err() {
    CommerceError::CooldownActive { retry_after_secs } => assert_eq!(retry_after_secs, 40),
    other => panic!("unexpected error: {other}"),
  }
  assert_eq!(h.store.otp_count(), 1);

  h.clock.advance(Duration::seconds(40));
  send(&h, &phone()).await.unwrap();
  assert_eq!(h.store.otp_count(), 2);

  // The successful resend restarts the cooldown.
  h.clock.advance(Duration::seconds(1));
  assert!(matches!(send(&h, &phone()).await, Err(CommerceError::CooldownActive { .. })));
}

#[tokio::test]
async fn fourth_send_in_a_day_is_rate_limited_without_a_record() {
  let h = Harness::new();
  for _ in 0..3 {
    send(&h, &phone()).await.unwrap();
    h.clock.advance(Duration::minutes(2));
  }
  assert_eq!(h.store.otp_count(), 3);

  let err = send(&h, &phone()).await.unwrap_err();
  assert!(matches!(err, CommerceError::RateLimited { max_sends: 3, window_hours: 24 }));
  assert_eq!(h.store.otp_count(), 3);
  assert_eq!(h.notifier.sent_otps().len(), 3);

  // Other channels are counted separately.
  send(&h, &OtpChannel::Email("buyer@example.com".to_string())).await.unwrap();

  // The window is rolling.
  h.clock.advance(Duration::hours(24));
  send(&h, &phone()).await.unwrap();
}

#[tokio::test]
async fn failed_delivery_leaves_no_record_and_no_cooldown() {
  let h = Harness::new();
  h.notifier.fail_otp_delivery(true);
  assert!(matches!(send(&h, &phone()).await, Err(CommerceError::Notification(_))));
  assert_eq!(h.store.otp_count(), 0);

  h.notifier.fail_otp_delivery(false);
  send(&h, &phone()).await.unwrap();
  assert_eq!(h.store.otp_count(), 1);
}

#[tokio::test]
async fn matching_code_confirms_cod_order() {
  let h = Harness::new();
  let order = h.place_order("Cod").await;
  send(&h, &phone()).await.unwrap();
  let code = h.notifier.last_code_for(&phone()).unwrap();

  let ctx = verify(&h, &phone(), &code, order.id).await.unwrap();

  let guard = ctx.read();
  let updated = guard.updated_order.as_ref().unwrap();
  assert_eq!(updated.payment_method, PaymentMethod::Cod);
  assert_eq!(updated.payment_status, PaymentStatus::Pending);
  assert_eq!(updated.status, DeliveryStatus::Processing);
  assert!(guard.confirmation_sent);
  assert_eq!(h.notifier.confirmed_orders(), vec![order.id]);
  assert_eq!(h.stock(&h.kettle), 8);
  assert_eq!(h.stock(&h.mug), 39);
}

#[tokio::test]
async fn mismatching_code_marks_order_failed() {
  let h = Harness::new();
  let order = h.place_order("Cod").await;
  send(&h, &phone()).await.unwrap();
  let code = h.notifier.last_code_for(&phone()).unwrap();

  assert!(matches!(
    verify(&h, &phone(), &wrong_code(&code), order.id).await,
    Err(CommerceError::InvalidOtp)
  ));

  let stored = h.services.lifecycle.get(order.id).await.unwrap();
  assert_eq!(stored.payment_status, PaymentStatus::Failed);
  assert_eq!(stored.status, DeliveryStatus::Pending);
  assert_eq!(h.stock(&h.kettle), 10);
}

#[tokio::test]
async fn only_the_latest_code_counts() {
  let h = Harness::new();
  let order = h.place_order("Cod").await;
  send(&h, &phone()).await.unwrap();
  let first = h.notifier.last_code_for(&phone()).unwrap();
  h.clock.advance(Duration::seconds(61));
  send(&h, &phone()).await.unwrap();
  let second = h.notifier.last_code_for(&phone()).unwrap();

  if first != second {
    assert!(matches!(
      verify(&h, &phone(), &first, order.id).await,
      Err(CommerceError::InvalidOtp)
    ));
  }
  verify(&h, &phone(), &second, order.id).await.unwrap();
  let stored = h.services.lifecycle.get(order.id).await.unwrap();
  assert_eq!(stored.status, DeliveryStatus::Processing);
}

#[tokio::test]
async fn expired_code_is_rejected() {
  let h = Harness::new();
  let order = h.place_order("Cod").await;
  send(&h, &phone()).await.unwrap();
  let code = h.notifier.last_code_for(&phone()).unwrap();

  h.clock.advance(Duration::minutes(5));
  assert!(matches!(
    verify(&h, &phone(), &code, order.id).await,
    Err(CommerceError::InvalidOtp)
  ));
  let stored = h.services.lifecycle.get(order.id).await.unwrap();
  assert_eq!(stored.payment_status, PaymentStatus::Failed);
}

#[tokio::test]
async fn code_cannot_be_used_twice() {
  let h = Harness::new();
  let order = h.place_order("Cod").await;
  send(&h, &phone()).await.unwrap();
  let code = h.notifier.last_code_for(&phone()).unwrap();

  verify(&h, &phone(), &code, order.id).await.unwrap();
  assert!(matches!(
    verify(&h, &phone(), &code, order.id).await,
    Err(CommerceError::InvalidOtp)
  ));

  // The confirmed order is not downgraded and stock moved once.
  let stored = h.services.lifecycle.get(order.id).await.unwrap();
  assert_eq!(stored.payment_status, PaymentStatus::Pending);
  assert_eq!(stored.status, DeliveryStatus::Processing);
  assert_eq!(h.stock(&h.kettle), 8);
}

#[tokio::test]
async fn no_code_sent_is_not_found_and_fails_order() {
  let h = Harness::new();
  let order = h.place_order("Cod").await;

  assert!(matches!(
    verify(&h, &phone(), "123456", order.id).await,
    Err(CommerceError::NotFound(_))
  ));
  let stored = h.services.lifecycle.get(order.id).await.unwrap();
  assert_eq!(stored.payment_status, PaymentStatus::Failed);
}

#[tokio::test]
async fn unknown_order_is_not_found() {
  let h = Harness::new();
  send(&h, &phone()).await.unwrap();
  let code = h.notifier.last_code_for(&phone()).unwrap();

  assert!(matches!(
    verify(&h, &phone(), &code, Uuid::new_v4()).await,
    Err(CommerceError::NotFound(_))
  ));
  // The code was not spent on the bad request.
  let order = h.place_order("Cod").await;
  verify(&h, &phone(), &code, order.id).await.unwrap();
}

#[tokio::test]
async fn confirmation_delivery_failure_does_not_fail_verification() {
  let h = Harness::new();
  let order = h.place_order("Cod").await;
  send(&h, &phone()).await.unwrap();
  let code = h.notifier.last_code_for(&phone()).unwrap();
  h.notifier.fail_confirmation_delivery(true);

  let ctx = verify(&h, &phone(), &code, order.id).await.unwrap();
  assert!(!ctx.read().confirmation_sent);
  let stored = h.services.lifecycle.get(order.id).await.unwrap();
  assert_eq!(stored.status, DeliveryStatus::Processing);
}

#[tokio::test]
async fn correct_code_within_the_attempt_budget_still_confirms() {
  let h = Harness::new();
  let order = h.place_order("Cod").await;
  send(&h, &phone()).await.unwrap();
  let code = h.notifier.last_code_for(&phone()).unwrap();

  let allowed = h.services.settings.otp.max_verify_attempts;
  for _ in 1..allowed {
    assert!(matches!(
      verify(&h, &phone(), &wrong_code(&code), order.id).await,
      Err(CommerceError::InvalidOtp)
    ));
  }
  verify(&h, &phone(), &code, order.id).await.unwrap();
  let stored = h.services.lifecycle.get(order.id).await.unwrap();
  assert_eq!(stored.status, DeliveryStatus::Processing);
  assert_eq!(h.stock(&h.kettle), 8);
}

#[tokio::test]
async fn code_is_dead_once_the_attempt_budget_is_spent() {
  let h = Harness::new();
  let order = h.place_order("Cod").await;
  send(&h, &phone()).await.unwrap();
  let code = h.notifier.last_code_for(&phone()).unwrap();

  for _ in 0..h.services.settings.otp.max_verify_attempts {
    assert!(matches!(
      verify(&h, &phone(), &wrong_code(&code), order.id).await,
      Err(CommerceError::InvalidOtp)
    ));
  }
  assert!(matches!(
    verify(&h, &phone(), &code, order.id).await,
    Err(CommerceError::InvalidOtp)
  ));

  let stored = h.services.lifecycle.get(order.id).await.unwrap();
  assert_eq!(stored.payment_status, PaymentStatus::Failed);
  assert_eq!(stored.status, DeliveryStatus::Pending);
  assert_eq!(h.stock(&h.kettle), 10);

  // A fresh code after the cooldown starts a new budget.
  h.clock.advance(Duration::seconds(61));
  send(&h, &phone()).await.unwrap();
  let fresh = h.notifier.last_code_for(&phone()).unwrap();
  verify(&h, &phone(), &fresh, order.id).await.unwrap();
  assert_eq!(h.stock(&h.kettle), 8);
}
