// core/src/models/otp.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Where a one-time password is delivered and what it proves ownership of.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum OtpChannel {
  Phone(String),
  Email(String),
}

impl OtpChannel {
  /// Builds a channel from the `phone`/`email` request fields; phone wins when both are set.
  pub fn from_parts(phone: Option<&str>, email: Option<&str>) -> Option<Self> {
    let phone = phone.map(str::trim).filter(|p| !p.is_empty());
    let email = email.map(str::trim).filter(|e| !e.is_empty());
    match (phone, email) {
      (Some(p), _) => Some(OtpChannel::Phone(p.to_string())),
      (None, Some(e)) => Some(OtpChannel::Email(e.to_ascii_lowercase())),
      (None, None) => None,
    }
  }

  pub fn kind(&self) -> &'static str {
    match self {
      OtpChannel::Phone(_) => "phone",
      OtpChannel::Email(_) => "email",
    }
  }

  pub fn value(&self) -> &str {
    match self {
      OtpChannel::Phone(v) | OtpChannel::Email(v) => v,
    }
  }
}

impl fmt::Display for OtpChannel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.kind(), self.value())
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpRecord {
  pub id: Uuid,
  pub channel: OtpChannel,
  #[serde(skip_serializing)]
  pub code_hash: String,
  pub user_id: Option<Uuid>,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
  pub consumed_at: Option<DateTime<Utc>>,
  /// Verification attempts made against this code so far.
  #[serde(skip_serializing)]
  pub attempts: u32,
}

impl OtpRecord {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    now >= self.expires_at
  }

  pub fn is_consumed(&self) -> bool {
    self.consumed_at.is_some()
  }
}
