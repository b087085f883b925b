// server/src/config.rs

use crate::errors::{AppError, Result};
use chrono::Duration;
use dotenvy::dotenv;
use std::env;
use std::fmt;
use std::str::FromStr;
use storefront_core::OtpPolicy;

#[derive(Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// `None` runs the server on the in-memory store.
  pub database_url: Option<String>,
  pub run_migrations: bool,

  pub razorpay_key_id: String,
  pub razorpay_key_secret: String,
  pub razorpay_api_base: String,
  pub currency: String,

  /// HMAC key for session tokens.
  pub session_secret: String,

  /// SMS delivery is disabled (messages are only logged) without a key.
  pub two_factor_api_key: Option<String>,
  pub two_factor_api_base: String,
  pub two_factor_sender_id: String,
  pub email_sender: String,

  pub otp: OtpPolicy,
}

impl fmt::Debug for AppConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AppConfig")
      .field("server_host", &self.server_host)
      .field("server_port", &self.server_port)
      .field("database", &self.database_url.as_ref().map(|_| "[REDACTED]"))
      .field("run_migrations", &self.run_migrations)
      .field("razorpay_key_id", &self.razorpay_key_id)
      .field("razorpay_api_base", &self.razorpay_api_base)
      .field("currency", &self.currency)
      .field("sms_enabled", &self.two_factor_api_key.is_some())
      .field("two_factor_sender_id", &self.two_factor_sender_id)
      .field("email_sender", &self.email_sender)
      .field("otp", &self.otp)
      .finish()
  }
}

fn optional_env(var_name: &str) -> Option<String> {
  env::var(var_name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn required_env(var_name: &str) -> Result<String> {
  optional_env(var_name).ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", var_name)))
}

fn parsed_env<T>(var_name: &str, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: fmt::Display,
{
  match optional_env(var_name) {
    Some(raw) => raw
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {}: {}", var_name, e))),
    None => Ok(default),
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let defaults = OtpPolicy::default();
    let otp = OtpPolicy {
      code_length: defaults.code_length,
      ttl: Duration::seconds(parsed_env("OTP_TTL_SECS", defaults.ttl.num_seconds())?),
      resend_cooldown: Duration::seconds(parsed_env("OTP_COOLDOWN_SECS", defaults.resend_cooldown.num_seconds())?),
      max_sends_per_window: parsed_env("OTP_MAX_SENDS", defaults.max_sends_per_window)?,
      window: Duration::seconds(parsed_env("OTP_WINDOW_SECS", defaults.window.num_seconds())?),
      max_verify_attempts: parsed_env("OTP_MAX_ATTEMPTS", defaults.max_verify_attempts)?,
    };
    if otp.max_sends_per_window == 0 {
      return Err(AppError::Config("OTP_MAX_SENDS must be at least 1".to_string()));
    }
    if otp.max_verify_attempts == 0 {
      return Err(AppError::Config("OTP_MAX_ATTEMPTS must be at least 1".to_string()));
    }

    let config = Self {
      server_host: optional_env("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
      server_port: parsed_env("SERVER_PORT", 8080u16)?,
      database_url: optional_env("DATABASE_URL"),
      run_migrations: parsed_env("RUN_MIGRATIONS", true)?,
      razorpay_key_id: required_env("RAZORPAY_KEY_ID")?,
      razorpay_key_secret: required_env("RAZORPAY_KEY_SECRET")?,
      razorpay_api_base: optional_env("RAZORPAY_API_BASE").unwrap_or_else(|| "https://api.razorpay.com".to_string()),
      currency: optional_env("CURRENCY").unwrap_or_else(|| "INR".to_string()),
      session_secret: required_env("SESSION_SECRET")?,
      two_factor_api_key: optional_env("TWO_FACTOR_API_KEY"),
      two_factor_api_base: optional_env("TWO_FACTOR_API_BASE").unwrap_or_else(|| "https://2factor.in".to_string()),
      two_factor_sender_id: optional_env("TWO_FACTOR_SENDER_ID").unwrap_or_else(|| "STRFNT".to_string()),
      email_sender: optional_env("EMAIL_SENDER").unwrap_or_else(|| "orders@storefront.local".to_string()),
      otp,
    };

    tracing::info!(config = ?config, "Application configuration loaded successfully.");
    Ok(config)
  }
}
