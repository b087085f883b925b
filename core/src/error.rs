// core/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Failures raised by the step pipeline engine itself, as opposed to the
/// business handlers it runs.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Step not found: {step_name}")]
  StepNotFound { step_name: String },

  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("No flow registered for context type {context_type}")]
  NotRegistered { context_type: String },

  #[error("Context type mismatch while dispatching flow (expected {expected_type})")]
  TypeMismatch { expected_type: String },

  #[error("Handler failed. Source: {source}")]
  Handler {
    #[source]
    source: AnyhowError,
  },
}

impl From<AnyhowError> for FlowError {
  fn from(err: AnyhowError) -> Self {
    FlowError::Handler { source: err }
  }
}

/// Domain errors produced by the order lifecycle, the payment gateway path and
/// the COD one-time-password flows.
#[derive(Debug, Error)]
pub enum CommerceError {
  #[error("Validation failed: {0}")]
  Validation(String),

  #[error("{0} not found")]
  NotFound(String),

  #[error("Invalid payment signature")]
  InvalidSignature,

  #[error("Invalid or expired OTP")]
  InvalidOtp,

  #[error("Payment failed: {0}")]
  PaymentNotCaptured(String),

  #[error("Payment does not match order: {0}")]
  PaymentMismatch(String),

  #[error("Payment gateway error: {0}")]
  Gateway(String),

  #[error("Notification delivery failed: {0}")]
  Notification(String),

  #[error("OTP send limit reached: at most {max_sends} codes per {window_hours} hours")]
  RateLimited { max_sends: u32, window_hours: i64 },

  #[error("Please wait {retry_after_secs} seconds before requesting another OTP")]
  CooldownActive { retry_after_secs: i64 },

  #[error("Storage error: {0}")]
  Store(String),

  #[error("Flow error: {source}")]
  Flow {
    #[from]
    source: FlowError,
  },
}

impl CommerceError {
  pub fn not_found(what: impl Into<String>) -> Self {
    CommerceError::NotFound(what.into())
  }

  pub fn store(err: impl std::fmt::Display) -> Self {
    CommerceError::Store(err.to_string())
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
pub type CommerceResult<T, E = CommerceError> = std::result::Result<T, E>;
