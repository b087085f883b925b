// server/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use storefront_core::{CommerceError, FlowError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("{0}")]
  Validation(String),

  #[error("{0}")]
  Auth(String),

  #[error("{0}")]
  Forbidden(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error(transparent)]
  Commerce(#[from] CommerceError),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<FlowError> for AppError {
  fn from(err: FlowError) -> Self {
    AppError::Commerce(CommerceError::from(err))
  }
}

impl AppError {
  /// Client-facing message; internal details stay in the logs.
  fn public_message(&self) -> String {
    match self {
      AppError::Validation(m) | AppError::Auth(m) | AppError::Forbidden(m) => m.clone(),
      AppError::Commerce(inner) => match inner {
        CommerceError::Store(_) | CommerceError::Flow { .. } => "An internal error occurred".to_string(),
        other => other.to_string(),
      },
      AppError::Config(_) | AppError::Internal(_) => "An internal error occurred".to_string(),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
      AppError::Commerce(inner) => match inner {
        CommerceError::Validation(_)
        | CommerceError::InvalidSignature
        | CommerceError::InvalidOtp
        | CommerceError::PaymentNotCaptured(_)
        | CommerceError::PaymentMismatch(_)
        | CommerceError::Gateway(_)
        | CommerceError::Notification(_) => StatusCode::BAD_REQUEST,
        CommerceError::NotFound(_) => StatusCode::NOT_FOUND,
        CommerceError::RateLimited { .. } | CommerceError::CooldownActive { .. } => StatusCode::TOO_MANY_REQUESTS,
        CommerceError::Store(_) | CommerceError::Flow { .. } => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, status = status.as_u16(), "Responding with error");
    }

    let mut body = json!({ "success": false, "message": self.public_message() });
    if let AppError::Commerce(CommerceError::CooldownActive { retry_after_secs }) = self {
      body["retryAfter"] = json!(retry_after_secs);
    }
    HttpResponse::build(status).json(body)
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
