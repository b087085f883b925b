// server/tests/common/mod.rs
#![allow(dead_code)]

use actix_web::body::BoxBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{web, App};
use chrono::{TimeZone, Utc};
use once_cell::sync::Lazy;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::sync::Arc;
use storefront_core::models::Product;
use storefront_core::ports::ManualClock;
use storefront_core::services::gateway_mock::MockGateway;
use storefront_core::services::notifier_mock::RecordingNotifier;
use storefront_core::{CommerceServices, CommerceSettings, InMemoryStore, OtpPolicy};
use storefront_server::web::auth::{issue_token, Role};
use storefront_server::web::configure_app_routes;
use storefront_server::{AppConfig, AppState};
use tracing::Level;
use uuid::Uuid;

pub const KEY_ID: &str = "rzp_test_key";
pub const KEY_SECRET: &str = "rzp_test_secret";
pub const SESSION_SECRET: &str = "test-session-secret";

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn test_config() -> AppConfig {
  AppConfig {
    server_host: "127.0.0.1".to_string(),
    server_port: 0,
    database_url: None,
    run_migrations: false,
    razorpay_key_id: KEY_ID.to_string(),
    razorpay_key_secret: KEY_SECRET.to_string(),
    razorpay_api_base: "http://razorpay.invalid".to_string(),
    currency: "INR".to_string(),
    session_secret: SESSION_SECRET.to_string(),
    two_factor_api_key: None,
    two_factor_api_base: "http://2factor.invalid".to_string(),
    two_factor_sender_id: "STRFNT".to_string(),
    email_sender: "orders@test.local".to_string(),
    otp: OtpPolicy::default(),
  }
}

/// Server state over the in-memory store, the mock gateway and a recording notifier.
pub struct TestApp {
  pub store: Arc<InMemoryStore>,
  pub gateway: Arc<MockGateway>,
  pub notifier: Arc<RecordingNotifier>,
  pub clock: Arc<ManualClock>,
  pub state: AppState,
  pub kettle: Product,
  pub buyer: Uuid,
  pub admin: Uuid,
}

impl TestApp {
  pub fn new() -> Self {
    Lazy::force(&TRACING_INIT);
    let kettle = Product {
      id: Uuid::new_v4(),
      name: "Brass Kettle".to_string(),
      price: dec!(150.00),
      stock: 10,
    };
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 14, 10, 0, 0).unwrap()));
    let store = Arc::new(InMemoryStore::with_products([kettle.clone()]).with_clock(clock.clone()));
    let gateway = Arc::new(MockGateway::new(KEY_ID, KEY_SECRET));
    let notifier = Arc::new(RecordingNotifier::new());
    let services = CommerceServices::in_memory(
      store.clone(),
      gateway.clone(),
      notifier.clone(),
      clock.clone(),
      CommerceSettings::new(KEY_SECRET),
    );
    let state = AppState::new(services, Arc::new(test_config()));
    Self {
      store,
      gateway,
      notifier,
      clock,
      state,
      kettle,
      buyer: Uuid::new_v4(),
      admin: Uuid::new_v4(),
    }
  }

  pub fn app(
    &self,
  ) -> App<
    impl ServiceFactory<
      ServiceRequest,
      Config = (),
      Response = ServiceResponse<BoxBody>,
      Error = actix_web::Error,
      InitError = (),
    >,
  > {
    App::new()
      .app_data(web::Data::new(self.state.clone()))
      .configure(configure_app_routes)
  }

  pub fn bearer(&self, user_id: Uuid, role: Role) -> (&'static str, String) {
    let token = issue_token(SESSION_SECRET, user_id, role).unwrap();
    ("Authorization", format!("Bearer {}", token))
  }

  pub fn buyer_auth(&self) -> (&'static str, String) {
    self.bearer(self.buyer, Role::User)
  }

  pub fn admin_auth(&self) -> (&'static str, String) {
    self.bearer(self.admin, Role::Admin)
  }

  /// Two kettles, ₹300 total.
  pub fn new_order_body(&self, method: &str) -> Value {
    json!({
      "orderItems": [{
        "productId": self.kettle.id,
        "name": self.kettle.name,
        "price": 150,
        "quantity": 2
      }],
      "shippingInfo": {
        "address": "12 MG Road",
        "city": "Jaipur",
        "state": "Rajasthan",
        "country": "India",
        "pinCode": "302001",
        "phone": "9876543210"
      },
      "subTotal": 300,
      "tax": 0,
      "discount": 0,
      "shippingCharges": 0,
      "total": 300,
      "paymentMethod": method
    })
  }

  pub fn stock(&self) -> i64 {
    self.store.stock_of(self.kettle.id).unwrap()
  }
}
