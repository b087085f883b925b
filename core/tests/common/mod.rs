// tests/common/mod.rs
#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use storefront_core::models::{NewOrder, Order, OrderItem, Product, ShippingInfo};
use storefront_core::ports::ManualClock;
use storefront_core::services::gateway_mock::MockGateway;
use storefront_core::services::notifier_mock::RecordingNotifier;
use storefront_core::{register_all_flows, CommerceError, CommerceServices, CommerceSettings, FlowRegistry, InMemoryStore};
use tracing::Level;
use uuid::Uuid;

pub const KEY_ID: &str = "rzp_test_key";
pub const KEY_SECRET: &str = "rzp_test_secret";

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

/// Everything a flow test needs, wired around one in-memory store.
pub struct Harness {
  pub store: Arc<InMemoryStore>,
  pub gateway: Arc<MockGateway>,
  pub notifier: Arc<RecordingNotifier>,
  pub clock: Arc<ManualClock>,
  pub services: CommerceServices,
  pub flows: FlowRegistry<CommerceError>,
  pub kettle: Product,
  pub mug: Product,
}

impl Harness {
  pub fn new() -> Self {
    setup_tracing();
    let kettle = Product {
      id: Uuid::new_v4(),
      name: "Brass Kettle".to_string(),
      price: dec!(150.00),
      stock: 10,
    };
    let mug = Product {
      id: Uuid::new_v4(),
      name: "Clay Mug".to_string(),
      price: dec!(25.00),
      stock: 40,
    };
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 14, 10, 0, 0).unwrap()));
    let store = Arc::new(InMemoryStore::with_products([kettle.clone(), mug.clone()]).with_clock(clock.clone()));
    let gateway = Arc::new(MockGateway::new(KEY_ID, KEY_SECRET));
    let notifier = Arc::new(RecordingNotifier::new());
    let services = CommerceServices::in_memory(
      store.clone(),
      gateway.clone(),
      notifier.clone(),
      clock.clone(),
      CommerceSettings::new(KEY_SECRET),
    );
    let flows = FlowRegistry::<CommerceError>::new();
    register_all_flows(&flows);
    Self {
      store,
      gateway,
      notifier,
      clock,
      services,
      flows,
      kettle,
      mug,
    }
  }

  /// Two kettles and one mug, total ₹325 plus ₹0 extras.
  pub fn checkout(&self, method: &str) -> NewOrder {
    checkout_for(&[(&self.kettle, 2), (&self.mug, 1)], method, dec!(325.00))
  }

  pub async fn place_order(&self, method: &str) -> Order {
    self
      .services
      .lifecycle
      .create_pending_order(Uuid::new_v4(), self.checkout(method))
      .await
      .expect("order should be created")
  }

  pub fn stock(&self, product: &Product) -> i64 {
    self.store.stock_of(product.id).expect("product exists")
  }
}

pub fn shipping() -> ShippingInfo {
  ShippingInfo {
    address: "12 MG Road".to_string(),
    city: "Jaipur".to_string(),
    state: "Rajasthan".to_string(),
    country: "India".to_string(),
    pin_code: "302001".to_string(),
    phone: Some("9876543210".to_string()),
  }
}

pub fn checkout_for(items: &[(&Product, u32)], method: &str, total: Decimal) -> NewOrder {
  NewOrder {
    order_items: Some(
      items
        .iter()
        .map(|(product, quantity)| OrderItem {
          product_id: product.id,
          name: product.name.clone(),
          price: product.price,
          quantity: *quantity,
        })
        .collect(),
    ),
    shipping_info: Some(shipping()),
    sub_total: total,
    tax: Decimal::ZERO,
    discount: Decimal::ZERO,
    shipping_charges: Decimal::ZERO,
    total,
    payment_method: Some(method.to_string()),
  }
}
