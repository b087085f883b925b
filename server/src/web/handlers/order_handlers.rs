// server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use storefront_core::models::{DeliveryStatus, NewOrder, OrderFilter, PageRequest, PaymentMethod, PaymentStatus};
use tracing::{info, instrument};

use super::{load_accessible_order, parse_order_id};
use crate::errors::AppError;
use crate::state::AppState;
use crate::web::auth::AuthenticatedUser;

/// Listing query string: `currentPage`, `pageSize`, `month`, `year`,
/// `paymentStatus`, `paymentMethod`, `status`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersQuery {
  pub current_page: Option<u32>,
  pub page_size: Option<u32>,
  pub month: Option<u32>,
  pub year: Option<i32>,
  pub payment_status: Option<String>,
  pub payment_method: Option<String>,
  pub status: Option<String>,
}

fn parse_opt<T>(raw: Option<&str>) -> Result<Option<T>, AppError>
where
  T: std::str::FromStr,
  T::Err: std::fmt::Display,
{
  match raw.map(str::trim).filter(|s| !s.is_empty()) {
    Some(s) => s.parse().map(Some).map_err(|e: T::Err| AppError::Validation(e.to_string())),
    None => Ok(None),
  }
}

impl ListOrdersQuery {
  fn into_parts(self) -> Result<(OrderFilter, PageRequest), AppError> {
    if let Some(month) = self.month {
      if !(1..=12).contains(&month) {
        return Err(AppError::Validation(format!("Invalid month {}", month)));
      }
    }
    let filter = OrderFilter {
      user_id: None,
      month: self.month,
      year: self.year,
      payment_status: parse_opt::<PaymentStatus>(self.payment_status.as_deref())?,
      payment_method: parse_opt::<PaymentMethod>(self.payment_method.as_deref())?,
      status: parse_opt::<DeliveryStatus>(self.status.as_deref())?,
    };
    Ok((filter, PageRequest::new(self.current_page, self.page_size)))
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdatePayload {
  pub order_id: Option<String>,
  pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusPayload {
  pub payment_status: Option<String>,
}

fn required_status<T>(raw: Option<&str>, field: &str) -> Result<T, AppError>
where
  T: std::str::FromStr,
  T::Err: std::fmt::Display,
{
  parse_opt::<T>(raw)?.ok_or_else(|| AppError::Validation(format!("{} is required", field)))
}

#[instrument(name = "handler::new_order", skip(app_state, payload, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn new_order_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<NewOrder>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order = app_state
    .services
    .lifecycle
    .create_pending_order(auth_user.user_id, payload.into_inner())
    .await?;
  info!(order_id = %order.id, "Order placed.");
  Ok(HttpResponse::Created().json(json!({
    "success": true,
    "message": "Order placed successfully",
    "orderId": order.id,
    "order": order,
  })))
}

#[instrument(name = "handler::my_orders", skip(app_state, query, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn my_orders_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ListOrdersQuery>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let (mut filter, page) = query.into_inner().into_parts()?;
  filter.user_id = Some(auth_user.user_id);
  let result = app_state.services.lifecycle.list(&filter, page).await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "orders": result.orders,
    "pagination": result.pagination,
  })))
}

#[instrument(name = "handler::all_orders", skip(app_state, query, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn all_orders_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ListOrdersQuery>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  auth_user.require_admin()?;
  let (filter, page) = query.into_inner().into_parts()?;
  let result = app_state.services.lifecycle.list(&filter, page).await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "orders": result.orders,
    "pagination": result.pagination,
  })))
}

#[instrument(name = "handler::get_order", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order_id = parse_order_id(&path)?;
  let order = load_accessible_order(&app_state, &auth_user, order_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "order": order })))
}

/// `PUT /orders/{id}` with `{ status }`.
#[instrument(name = "handler::update_status", skip(app_state, payload, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn update_status_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  payload: web::Json<StatusUpdatePayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  auth_user.require_admin()?;
  let order_id = parse_order_id(&path)?;
  let status = required_status::<DeliveryStatus>(payload.status.as_deref(), "status")?;
  let order = app_state.services.lifecycle.set_delivery_status(order_id, status).await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Order status updated successfully",
    "order": order,
  })))
}

/// `PUT /orders/update-status` with `{ orderId, status }`.
#[instrument(name = "handler::update_status_by_body", skip(app_state, payload, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn update_status_by_body_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<StatusUpdatePayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  auth_user.require_admin()?;
  let raw_id = payload
    .order_id
    .as_deref()
    .ok_or_else(|| AppError::Validation("orderId is required".to_string()))?;
  let order_id = parse_order_id(raw_id)?;
  let status = required_status::<DeliveryStatus>(payload.status.as_deref(), "status")?;
  app_state.services.lifecycle.set_delivery_status(order_id, status).await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Order status updated successfully",
  })))
}

#[instrument(name = "handler::update_payment_status", skip(app_state, payload, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn update_payment_status_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  payload: web::Json<PaymentStatusPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  auth_user.require_admin()?;
  let order_id = parse_order_id(&path)?;
  let status = required_status::<PaymentStatus>(payload.payment_status.as_deref(), "paymentStatus")?;
  let order = app_state.services.lifecycle.set_payment_status(order_id, status).await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Order's payment status updated successfully.",
    "order": order,
  })))
}

#[instrument(name = "handler::delete_order", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn delete_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  auth_user.require_admin()?;
  let order_id = parse_order_id(&path)?;
  app_state.services.lifecycle.delete_order(order_id).await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Order deleted successfully",
  })))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn list_query_parses_statuses_case_insensitively() {
    let query = ListOrdersQuery {
      payment_method: Some("cod".into()),
      status: Some("SHIPPED".into()),
      page_size: Some(500),
      ..Default::default()
    };
    let (filter, page) = query.into_parts().unwrap();
    assert_eq!(filter.payment_method, Some(PaymentMethod::Cod));
    assert_eq!(filter.status, Some(DeliveryStatus::Shipped));
    assert_eq!(page.page_size, 100);
  }

  #[test]
  fn unknown_status_is_a_validation_error() {
    let query = ListOrdersQuery {
      payment_status: Some("refunded".into()),
      ..Default::default()
    };
    assert!(matches!(query.into_parts(), Err(AppError::Validation(_))));
  }
}
