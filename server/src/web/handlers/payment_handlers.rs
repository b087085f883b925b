// server/src/web/handlers/payment_handlers.rs

use actix_web::{web, HttpResponse};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use storefront_core::models::OtpChannel;
use storefront_core::{CodVerificationCtx, ContextData, GatewayOrderCtx, OtpDispatchCtx, PaymentVerificationCtx};
use tracing::{info, instrument, warn};

use super::{load_accessible_order, parse_order_id, run_flow};
use crate::errors::AppError;
use crate::state::AppState;
use crate::web::auth::AuthenticatedUser;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGatewayOrderPayload {
  /// Rupees, as shown to the buyer. Must match the stored order total when given.
  pub amount: Option<Decimal>,
  pub order_id: Option<String>,
  pub receipt: Option<String>,
}

/// Fields posted back by the checkout widget, plus our order id.
#[derive(Debug, Deserialize)]
pub struct VerifyPaymentPayload {
  pub razorpay_order_id: Option<String>,
  pub razorpay_payment_id: Option<String>,
  pub razorpay_signature: Option<String>,
  #[serde(rename = "orderId")]
  pub order_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendOtpPayload {
  pub phone: Option<String>,
  pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCodPayload {
  pub otp: Option<String>,
  pub order_id: Option<String>,
  pub phone: Option<String>,
  pub email: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
  value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[instrument(name = "handler::create_gateway_order", skip(app_state, payload, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn create_gateway_order_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<CreateGatewayOrderPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let payload = payload.into_inner();
  let raw_id = non_empty(&payload.order_id).ok_or_else(|| AppError::Validation("orderId is required".to_string()))?;
  let order_id = parse_order_id(raw_id)?;
  load_accessible_order(&app_state, &auth_user, order_id).await?;

  let ctx = ContextData::new(GatewayOrderCtx::new(
    app_state.services.clone(),
    order_id,
    payload.amount,
    payload.receipt.filter(|r| !r.trim().is_empty()),
  ));
  run_flow(&app_state, ctx.clone()).await?;

  let gateway_order = ctx
    .snapshot(|c| c.gateway_order.clone())
    .ok_or_else(|| AppError::Internal("Gateway order was not recorded.".to_string()))?;
  info!(%order_id, gateway_order_id = %gateway_order.id, "Gateway order ready for checkout.");
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "key": app_state.services.gateway.key_id(),
    "orderId": gateway_order.id,
    "amount": gateway_order.amount,
    "currency": gateway_order.currency,
  })))
}

#[instrument(name = "handler::verify_payment", skip(app_state, payload, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn verify_payment_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<VerifyPaymentPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let (Some(gateway_order_id), Some(payment_id), Some(signature), Some(raw_id)) = (
    non_empty(&payload.razorpay_order_id),
    non_empty(&payload.razorpay_payment_id),
    non_empty(&payload.razorpay_signature),
    non_empty(&payload.order_id),
  ) else {
    return Err(AppError::Validation("Missing required payment fields".to_string()));
  };
  let order_id = parse_order_id(raw_id)?;
  load_accessible_order(&app_state, &auth_user, order_id).await?;

  let ctx = ContextData::new(PaymentVerificationCtx::new(
    app_state.services.clone(),
    order_id,
    gateway_order_id.to_string(),
    payment_id.to_string(),
    signature.to_string(),
  ));
  run_flow(&app_state, ctx.clone()).await?;

  let order = ctx
    .snapshot(|c| c.updated_order.clone())
    .ok_or_else(|| AppError::Internal("Verified order was not recorded.".to_string()))?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Payment successful",
    "order": order,
  })))
}

#[instrument(name = "handler::send_cod_otp", skip(app_state, payload, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn send_cod_otp_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<SendOtpPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let channel = OtpChannel::from_parts(payload.phone.as_deref(), payload.email.as_deref())
    .ok_or_else(|| AppError::Validation("Phone number or email is required".to_string()))?;

  let ctx = ContextData::new(OtpDispatchCtx::new(
    app_state.services.clone(),
    channel,
    Some(auth_user.user_id),
  ));
  run_flow(&app_state, ctx.clone()).await?;

  let record = ctx
    .snapshot(|c| c.record.clone())
    .ok_or_else(|| AppError::Internal("OTP record was not stored.".to_string()))?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "OTP sent successfully",
    "expiresAt": record.expires_at,
    "resendAfter": app_state.services.settings.otp.resend_cooldown.num_seconds(),
  })))
}

#[instrument(name = "handler::verify_cod_otp", skip(app_state, payload, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn verify_cod_otp_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<VerifyCodPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let raw_id = non_empty(&payload.order_id)
    .ok_or_else(|| AppError::Validation("Order ID required for COD verification".to_string()))?;
  let order_id = parse_order_id(raw_id)?;
  load_accessible_order(&app_state, &auth_user, order_id).await?;

  let channel = OtpChannel::from_parts(payload.phone.as_deref(), payload.email.as_deref());
  let (Some(channel), Some(code)) = (channel, non_empty(&payload.otp)) else {
    return Err(AppError::Validation("All fields are required".to_string()));
  };

  let ctx = ContextData::new(CodVerificationCtx::new(
    app_state.services.clone(),
    channel,
    code.to_string(),
    order_id,
  ));
  run_flow(&app_state, ctx.clone()).await?;

  let (order, confirmation_sent) = ctx.snapshot(|c| (c.updated_order.clone(), c.confirmation_sent));
  let order = order.ok_or_else(|| AppError::Internal("Confirmed order was not recorded.".to_string()))?;
  if !confirmation_sent {
    warn!(%order_id, "COD confirmed without a confirmation notice.");
  }
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "COD confirmed successfully",
    "order": order,
  })))
}
