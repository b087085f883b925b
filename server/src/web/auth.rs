// server/src/web/auth.rs

//! Session verification. Tokens are issued by the account service and look
//! like `{user_id}.{role}.{hex hmac}`, where the MAC is HMAC-SHA256 over
//! `{user_id}.{role}` keyed with `SESSION_SECRET`. They arrive either as a
//! bearer token or in the `token` cookie.

use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
  User,
  Admin,
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Role::User => "user",
      Role::Admin => "admin",
    })
  }
}

impl FromStr for Role {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "user" => Ok(Role::User),
      "admin" => Ok(Role::Admin),
      _ => Err(AppError::Auth("Invalid session token".to_string())),
    }
  }
}

#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
  pub role: Role,
}

impl AuthenticatedUser {
  pub fn is_admin(&self) -> bool {
    self.role == Role::Admin
  }

  pub fn require_admin(&self) -> Result<(), AppError> {
    if self.is_admin() {
      Ok(())
    } else {
      warn!(user_id = %self.user_id, "Admin route refused for non-admin user.");
      Err(AppError::Forbidden("Admin access required".to_string()))
    }
  }
}

fn mac_for(secret: &str, payload: &str) -> Result<HmacSha256, AppError> {
  let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
    .map_err(|e| AppError::Config(format!("Invalid session secret: {}", e)))?;
  mac.update(payload.as_bytes());
  Ok(mac)
}

/// Signs a session token for `user_id` with `role`.
pub fn issue_token(secret: &str, user_id: Uuid, role: Role) -> Result<String, AppError> {
  let payload = format!("{}.{}", user_id, role);
  let tag = mac_for(secret, &payload)?.finalize().into_bytes();
  Ok(format!("{}.{}", payload, hex::encode(tag)))
}

pub fn verify_token(secret: &str, token: &str) -> Result<AuthenticatedUser, AppError> {
  let invalid = || AppError::Auth("Invalid session token".to_string());

  let (payload, tag_hex) = token.rsplit_once('.').ok_or_else(invalid)?;
  let (user_part, role_part) = payload.split_once('.').ok_or_else(invalid)?;
  let tag = hex::decode(tag_hex).map_err(|_| invalid())?;
  mac_for(secret, payload)?.verify_slice(&tag).map_err(|_| invalid())?;

  Ok(AuthenticatedUser {
    user_id: Uuid::parse_str(user_part).map_err(|_| invalid())?,
    role: role_part.parse()?,
  })
}

fn token_from_request(req: &HttpRequest) -> Option<String> {
  let bearer = req
    .headers()
    .get(AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(|t| t.trim().to_string());
  bearer.or_else(|| req.cookie(SESSION_COOKIE).map(|c| c.value().to_string()))
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    let Some(state) = req.app_data::<web::Data<AppState>>() else {
      return ready(Err(AppError::Internal("Application state not configured".to_string())));
    };
    let Some(token) = token_from_request(req) else {
      warn!("Request without a session token.");
      return ready(Err(AppError::Auth("Please login to access this resource".to_string())));
    };
    ready(verify_token(&state.config.session_secret, &token))
  }
}
