// core/src/services/mod.rs

//! Business services and the `CommerceServices` bundle handed to every flow
//! context. Nothing here is global: the server builds one bundle at startup,
//! tests build their own around `InMemoryStore` and the mocks.

pub mod gateway_mock;
pub mod lifecycle;
pub mod notifier_mock;
pub mod otp_codes;
pub mod signature;

use crate::memory::InMemoryStore;
use crate::ports::{Clock, Notifier, OrderStore, OtpStore, PaymentGateway, ProductStore};
pub use lifecycle::OrderLifecycle;
pub use otp_codes::OtpPolicy;
use std::fmt;
use std::sync::Arc;

/// Static knobs shared by the flows.
#[derive(Clone)]
pub struct CommerceSettings {
  /// Secret used to check checkout signatures.
  pub gateway_key_secret: String,
  pub currency: String,
  pub otp: OtpPolicy,
}

impl CommerceSettings {
  pub fn new(gateway_key_secret: impl Into<String>) -> Self {
    Self {
      gateway_key_secret: gateway_key_secret.into(),
      currency: "INR".to_string(),
      otp: OtpPolicy::default(),
    }
  }
}

impl fmt::Debug for CommerceSettings {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CommerceSettings")
      .field("gateway_key_secret", &"<redacted>")
      .field("currency", &self.currency)
      .field("otp", &self.otp)
      .finish()
  }
}

#[derive(Clone)]
pub struct CommerceServices {
  pub orders: Arc<dyn OrderStore>,
  pub products: Arc<dyn ProductStore>,
  pub otps: Arc<dyn OtpStore>,
  pub gateway: Arc<dyn PaymentGateway>,
  pub notifier: Arc<dyn Notifier>,
  pub clock: Arc<dyn Clock>,
  pub settings: Arc<CommerceSettings>,
  pub lifecycle: OrderLifecycle,
}

impl CommerceServices {
  pub fn new(
    orders: Arc<dyn OrderStore>,
    products: Arc<dyn ProductStore>,
    otps: Arc<dyn OtpStore>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    settings: CommerceSettings,
  ) -> Self {
    let lifecycle = OrderLifecycle::new(orders.clone(), products.clone(), clock.clone());
    Self {
      orders,
      products,
      otps,
      gateway,
      notifier,
      clock,
      settings: Arc::new(settings),
      lifecycle,
    }
  }

  /// One `InMemoryStore` serving orders, products and OTP records.
  pub fn in_memory(
    store: Arc<InMemoryStore>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    settings: CommerceSettings,
  ) -> Self {
    Self::new(store.clone(), store.clone(), store, gateway, notifier, clock, settings)
  }
}
