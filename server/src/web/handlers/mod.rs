// server/src/web/handlers/mod.rs

pub mod order_handlers;
pub mod payment_handlers;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::auth::AuthenticatedUser;
use storefront_core::models::Order;
use storefront_core::{ContextData, PipelineResult};
use tracing::warn;
use uuid::Uuid;

pub(crate) fn parse_order_id(raw: &str) -> Result<Uuid, AppError> {
  Uuid::parse_str(raw.trim()).map_err(|_| AppError::Validation(format!("Invalid order id '{}'", raw)))
}

/// Loads the order and checks the caller may act on it: owners and admins only.
pub(crate) async fn load_accessible_order(
  app_state: &AppState,
  auth_user: &AuthenticatedUser,
  order_id: Uuid,
) -> Result<Order, AppError> {
  let order = app_state.services.lifecycle.get(order_id).await?;
  if order.user_id != auth_user.user_id && !auth_user.is_admin() {
    warn!(%order_id, user_id = %auth_user.user_id, "Order access refused for non-owner.");
    return Err(AppError::Forbidden("You do not have access to this order".to_string()));
  }
  Ok(order)
}

/// Runs the flow registered for `T`; a flow that stops early is a server fault.
pub(crate) async fn run_flow<T>(app_state: &AppState, ctx: ContextData<T>) -> Result<(), AppError>
where
  T: Send + Sync + 'static,
{
  match app_state.flows.run(ctx).await? {
    PipelineResult::Completed => Ok(()),
    PipelineResult::Stopped => {
      warn!(context_type = std::any::type_name::<T>(), "Flow stopped before completion.");
      Err(AppError::Internal("Request processing halted unexpectedly.".to_string()))
    }
  }
}
