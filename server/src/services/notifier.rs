// server/src/services/notifier.rs

//! `Notifier` adapters. `LogNotifier` simulates email delivery by logging;
//! `TwoFactorNotifier` sends SMS through 2Factor and hands email channels to
//! a `LogNotifier`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use storefront_core::models::{Order, OtpChannel};
use storefront_core::ports::Notifier;
use storefront_core::{CommerceError, CommerceResult};
use tracing::{info, instrument, warn};

/// Builds the COD confirmation text: items with prices, then the total.
pub fn confirmation_message(order: &Order) -> String {
  let items = order
    .order_items
    .iter()
    .map(|item| format!("{} - ₹{}", item.name, item.price))
    .collect::<Vec<_>>()
    .join(", ");
  format!(
    "Your order #{} placed successfully via COD! Items: {}. Total: ₹{}. Thank you!",
    order.id, items, order.total
  )
}

#[derive(Debug, Clone)]
pub struct LogNotifier {
  sender: String,
}

impl LogNotifier {
  pub fn new(sender: impl Into<String>) -> Self {
    Self { sender: sender.into() }
  }

  async fn deliver(&self, channel: &OtpChannel, subject: &str, body: &str) -> CommerceResult<()> {
    info!(
      "Simulating message delivery: To='{}', From='{}', Subject='{}'",
      channel, self.sender, subject
    );
    tokio::time::sleep(Duration::from_millis(20)).await;
    let preview = body.chars().take(50).collect::<String>();
    info!(%preview, message_id = %format!("mock_msg_{}", uuid::Uuid::new_v4()), "Simulated message sent.");
    Ok(())
  }
}

#[async_trait]
impl Notifier for LogNotifier {
  async fn send_otp(&self, channel: &OtpChannel, code: &str, valid_for_minutes: i64) -> CommerceResult<()> {
    let body = format!(
      "Your verification code is {}. It is valid for {} minutes.",
      code, valid_for_minutes
    );
    self.deliver(channel, "Your order verification code", &body).await
  }

  async fn send_order_confirmation(&self, channel: &OtpChannel, order: &Order) -> CommerceResult<()> {
    self.deliver(channel, "Order confirmed", &confirmation_message(order)).await
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TwoFactorResponse {
  status: String,
  #[serde(default)]
  details: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct TransactionalSms<'a> {
  from: &'a str,
  to: &'a str,
  msg: &'a str,
  send_at: &'a str,
}

/// Indian numbers without a country code get `+91`.
fn international(phone: &str) -> String {
  if phone.starts_with('+') {
    phone.to_string()
  } else {
    format!("+91{}", phone)
  }
}

#[derive(Clone)]
pub struct TwoFactorNotifier {
  client: Client,
  base_url: String,
  api_key: String,
  sender_id: String,
  email: LogNotifier,
}

impl std::fmt::Debug for TwoFactorNotifier {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TwoFactorNotifier")
      .field("base_url", &self.base_url)
      .field("sender_id", &self.sender_id)
      .finish_non_exhaustive()
  }
}

impl TwoFactorNotifier {
  pub fn new(base_url: &str, api_key: &str, sender_id: &str, email: LogNotifier) -> CommerceResult<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(10))
      .build()
      .map_err(|e| CommerceError::Notification(format!("HTTP client setup failed: {}", e)))?;
    Ok(Self {
      client,
      base_url: base_url.trim_end_matches('/').to_string(),
      api_key: api_key.to_string(),
      sender_id: sender_id.to_string(),
      email,
    })
  }

  async fn check(response: reqwest::Response, action: &str) -> CommerceResult<()> {
    let body: TwoFactorResponse = response
      .json()
      .await
      .map_err(|e| CommerceError::Notification(format!("{}: unreadable response: {}", action, e)))?;
    if body.status != "Success" {
      warn!(status = %body.status, details = ?body.details, action, "2Factor rejected the request.");
      return Err(CommerceError::Notification(format!("Failed to {}", action)));
    }
    Ok(())
  }
}

#[async_trait]
impl Notifier for TwoFactorNotifier {
  #[instrument(name = "two_factor::send_otp", skip(self, code), fields(channel = %channel), err(Display))]
  async fn send_otp(&self, channel: &OtpChannel, code: &str, valid_for_minutes: i64) -> CommerceResult<()> {
    let phone = match channel {
      OtpChannel::Phone(phone) => international(phone),
      OtpChannel::Email(_) => return self.email.send_otp(channel, code, valid_for_minutes).await,
    };
    let url = format!("{}/API/V1/{}/SMS/{}/{}", self.base_url, self.api_key, phone, code);
    let response = self
      .client
      .get(url)
      .send()
      .await
      .map_err(|e| CommerceError::Notification(format!("Failed to send OTP via SMS: {}", e)))?;
    Self::check(response, "send OTP via SMS").await
  }

  #[instrument(name = "two_factor::send_order_confirmation", skip(self, order), fields(channel = %channel, order_id = %order.id), err(Display))]
  async fn send_order_confirmation(&self, channel: &OtpChannel, order: &Order) -> CommerceResult<()> {
    let phone = match channel {
      OtpChannel::Phone(phone) => international(phone),
      OtpChannel::Email(_) => return self.email.send_order_confirmation(channel, order).await,
    };
    let message = confirmation_message(order);
    let payload = TransactionalSms {
      from: &self.sender_id,
      to: &phone,
      msg: &message,
      send_at: "",
    };
    let response = self
      .client
      .post(format!("{}/API/V1/{}/ADDON_SERVICES/SEND/TSMS", self.base_url, self.api_key))
      .json(&payload)
      .send()
      .await
      .map_err(|e| CommerceError::Notification(format!("Failed to send confirmation SMS: {}", e)))?;
    Self::check(response, "send confirmation SMS").await
  }
}
