// server/src/state.rs
use crate::config::AppConfig;
use crate::errors::AppError;
use std::sync::Arc;
use storefront_core::{CommerceServices, FlowRegistry};

#[derive(Clone)]
pub struct AppState {
  pub services: CommerceServices,
  pub flows: Arc<FlowRegistry<AppError>>,
  pub config: Arc<AppConfig>,
}

impl AppState {
  /// Builds the state and installs every commerce flow in a fresh registry.
  pub fn new(services: CommerceServices, config: Arc<AppConfig>) -> Self {
    let flows = FlowRegistry::<AppError>::new();
    storefront_core::register_all_flows(&flows);
    Self {
      services,
      flows: Arc::new(flows),
      config,
    }
  }
}
