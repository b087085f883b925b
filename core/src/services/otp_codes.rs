// core/src/services/otp_codes.rs

//! Generation, hashing and verification of numeric one-time passwords.
//! Codes are stored only as Argon2 PHC strings.

use crate::error::{CommerceError, CommerceResult};
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use chrono::Duration;
use rand::Rng;
use tracing::{debug, error, instrument};

/// Limits applied when issuing and checking codes.
#[derive(Debug, Clone)]
pub struct OtpPolicy {
  pub code_length: usize,
  pub ttl: Duration,
  pub resend_cooldown: Duration,
  pub max_sends_per_window: u32,
  pub window: Duration,
  /// Verification attempts allowed per code, correct or not.
  pub max_verify_attempts: u32,
}

impl Default for OtpPolicy {
  fn default() -> Self {
    Self {
      code_length: 6,
      ttl: Duration::minutes(5),
      resend_cooldown: Duration::seconds(60),
      max_sends_per_window: 3,
      window: Duration::hours(24),
      max_verify_attempts: 5,
    }
  }
}

/// Uniform numeric code; leading zeros are kept.
pub fn generate_code(length: usize) -> String {
  let mut rng = rand::thread_rng();
  (0..length.max(1))
    .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
    .collect()
}

#[instrument(name = "otp_codes::hash", skip(code), err(Display))]
pub fn hash_code(code: &str) -> CommerceResult<String> {
  if code.is_empty() {
    return Err(CommerceError::Validation("OTP cannot be empty".to_string()));
  }
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(code.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| {
      error!(error = %e, "Argon2 hashing failed.");
      CommerceError::Store(format!("OTP hashing failed: {}", e))
    })
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash is unreadable.
#[instrument(name = "otp_codes::verify", skip(stored_hash, provided), err(Display))]
pub fn verify_code(stored_hash: &str, provided: &str) -> CommerceResult<bool> {
  let provided = provided.trim();
  if provided.is_empty() {
    return Ok(false);
  }
  let parsed = PasswordHash::new(stored_hash).map_err(|e| {
    error!(error = %e, "Stored OTP hash is malformed.");
    CommerceError::Store(format!("malformed OTP hash: {}", e))
  })?;
  match Argon2::default().verify_password(provided.as_bytes(), &parsed) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("OTP mismatch.");
      Ok(false)
    }
    Err(e) => Err(CommerceError::Store(format!("OTP verification failed: {}", e))),
  }
}

fn join_failed(e: tokio::task::JoinError) -> CommerceError {
  error!(error = %e, "OTP hashing task did not complete.");
  CommerceError::Store(format!("OTP hashing task failed: {}", e))
}

/// `hash_code` on the blocking pool; Argon2 is too slow for an async worker.
pub async fn hash_code_blocking(code: String) -> CommerceResult<String> {
  tokio::task::spawn_blocking(move || hash_code(&code))
    .await
    .map_err(join_failed)?
}

/// `verify_code` on the blocking pool.
pub async fn verify_code_blocking(stored_hash: String, provided: String) -> CommerceResult<bool> {
  tokio::task::spawn_blocking(move || verify_code(&stored_hash, &provided))
    .await
    .map_err(join_failed)?
}
