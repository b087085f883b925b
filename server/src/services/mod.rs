// server/src/services/mod.rs

pub mod notifier;
pub mod razorpay;

pub use notifier::{LogNotifier, TwoFactorNotifier};
pub use razorpay::RazorpayClient;
