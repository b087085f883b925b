// core/src/services/notifier_mock.rs
use crate::error::{CommerceError, CommerceResult};
use crate::models::{Order, OtpChannel};
use crate::ports::Notifier;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SentOtp {
  pub channel: OtpChannel,
  pub code: String,
  pub valid_for_minutes: i64,
}

/// Keeps every message in memory instead of delivering it.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
  otps: RwLock<Vec<SentOtp>>,
  confirmations: RwLock<Vec<(OtpChannel, Uuid)>>,
  fail_otps: AtomicBool,
  fail_confirmations: AtomicBool,
}

impl RecordingNotifier {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn fail_otp_delivery(&self, fail: bool) {
    self.fail_otps.store(fail, Ordering::SeqCst);
  }

  pub fn fail_confirmation_delivery(&self, fail: bool) {
    self.fail_confirmations.store(fail, Ordering::SeqCst);
  }

  pub fn last_code_for(&self, channel: &OtpChannel) -> Option<String> {
    self
      .otps
      .read()
      .iter()
      .rev()
      .find(|sent| &sent.channel == channel)
      .map(|sent| sent.code.clone())
  }

  pub fn sent_otps(&self) -> Vec<SentOtp> {
    self.otps.read().clone()
  }

  pub fn confirmed_orders(&self) -> Vec<Uuid> {
    self.confirmations.read().iter().map(|(_, id)| *id).collect()
  }
}

#[async_trait]
impl Notifier for RecordingNotifier {
  async fn send_otp(&self, channel: &OtpChannel, code: &str, valid_for_minutes: i64) -> CommerceResult<()> {
    if self.fail_otps.load(Ordering::SeqCst) {
      warn!(%channel, "Simulated OTP delivery failure.");
      return Err(CommerceError::Notification("Failed to send OTP".to_string()));
    }
    info!(%channel, "Recorded OTP message.");
    self.otps.write().push(SentOtp {
      channel: channel.clone(),
      code: code.to_string(),
      valid_for_minutes,
    });
    Ok(())
  }

  async fn send_order_confirmation(&self, channel: &OtpChannel, order: &Order) -> CommerceResult<()> {
    if self.fail_confirmations.load(Ordering::SeqCst) {
      return Err(CommerceError::Notification("Failed to send confirmation".to_string()));
    }
    self.confirmations.write().push((channel.clone(), order.id));
    Ok(())
  }
}
